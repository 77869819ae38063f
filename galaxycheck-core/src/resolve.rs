//! Resolving generators from type descriptions.
//!
//! A type describes its own shape through [`Describe`]. [`GenFactory`] turns
//! that description into a generator by trying a fixed chain of strategies in
//! order:
//!
//! 1. a generator registered for the exact type,
//! 2. nullable wrapping (`Option<T>`),
//! 3. a list of elements (`Vec<T>`),
//! 4. the constructor taking the most parameters,
//! 5. a default value plus one setter per member.
//!
//! Members are addressed by path strings: `$` is the root, `$.name` a member
//! and `$[*]` the elements of a list. A generator overridden for a path wins
//! over every strategy.

use crate::gen::Gen;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// A generated value of a type only known at runtime.
pub type DynValue = Rc<dyn Any>;

type DynGen = Gen<DynValue>;
type BuildFn = Rc<dyn Fn(&[DynValue]) -> Option<DynValue>>;
type SetFn = Rc<dyn Fn(&mut dyn Any, &DynValue) -> bool>;

const ROOT_PATH: &str = "$";
const FACTORY_GEN_NAME: &str = "FactoryGen";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("could not resolve type '{type_name}'{}", path_suffix(.path))]
    CannotResolve { type_name: String, path: String },

    #[error("detected circular reference on type '{type_name}' at path '{path}'")]
    CircularReference { type_name: String, path: String },

    #[error("generator overridden at path '{path}' produces '{found}', but '{expected}' is required")]
    OverrideMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

fn path_suffix(path: &str) -> String {
    if path == ROOT_PATH {
        String::new()
    } else {
        format!(" at path '{path}'")
    }
}

/// The runtime description of a type.
#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    id: TypeId,
    shape: TypeShape,
}

impl TypeDescriptor {
    pub fn of<T: 'static>(shape: TypeShape) -> Self {
        TypeDescriptor {
            name: short_type_name(type_name::<T>()),
            id: TypeId::of::<T>(),
            shape,
        }
    }

    /// The type's name without module paths, e.g. `Vec<Option<Point>>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// How values of a type are put together.
#[derive(Clone)]
pub enum TypeShape {
    /// Nothing is known about the structure; only a registered generator can
    /// produce values.
    Opaque,
    List {
        element: fn() -> TypeDescriptor,
        build: Rc<dyn Fn(Vec<DynValue>) -> Option<DynValue>>,
    },
    Nullable {
        inner: fn() -> TypeDescriptor,
        build: Rc<dyn Fn(Option<DynValue>) -> Option<DynValue>>,
    },
    Constructors(Vec<Constructor>),
    Settable(Settable),
}

/// A named member whose type is described lazily, so types can refer to
/// themselves.
#[derive(Clone, Copy)]
pub struct Member {
    pub name: &'static str,
    pub ty: fn() -> TypeDescriptor,
}

impl Member {
    pub fn of<M: Describe>(name: &'static str) -> Self {
        Member {
            name,
            ty: M::describe,
        }
    }
}

#[derive(Clone)]
pub struct Constructor {
    params: Vec<Member>,
    build: BuildFn,
}

impl Constructor {
    /// `build` receives one value per parameter, in order. Use [`arg`] to
    /// read them back.
    pub fn new<T, F>(params: Vec<Member>, build: F) -> Self
    where
        T: 'static,
        F: Fn(&[DynValue]) -> Option<T> + 'static,
    {
        Constructor {
            params,
            build: Rc::new(move |args: &[DynValue]| -> Option<DynValue> {
                build(args).map(|value| Rc::new(value) as DynValue)
            }),
        }
    }

    pub fn params(&self) -> &[Member] {
        &self.params
    }
}

/// A default value that members are written into one at a time.
#[derive(Clone)]
pub struct Settable {
    create: Rc<dyn Fn() -> Box<dyn Any>>,
    setters: Vec<(Member, SetFn)>,
}

impl Settable {
    pub fn new<T: Default + 'static>() -> Self {
        Settable {
            create: Rc::new(|| -> Box<dyn Any> { Box::new(T::default()) }),
            setters: Vec::new(),
        }
    }

    pub fn with_member<T, M>(mut self, name: &'static str, set: fn(&mut T, M)) -> Self
    where
        T: 'static,
        M: Describe,
    {
        let setter: SetFn = Rc::new(move |target: &mut dyn Any, value: &DynValue| -> bool {
            match (target.downcast_mut::<T>(), value.downcast_ref::<M>()) {
                (Some(target), Some(value)) => {
                    set(target, value.clone());
                    true
                }
                _ => false,
            }
        });
        self.setters.push((Member::of::<M>(name), setter));
        self
    }

    fn assemble(&self, values: &[DynValue]) -> Option<DynValue> {
        let mut target = (self.create)();
        for ((_, set), value) in self.setters.iter().zip(values) {
            if !set(target.as_mut(), value) {
                return None;
            }
        }
        Some(Rc::from(target))
    }
}

/// Read constructor argument `index` as a `T`.
pub fn arg<T: Clone + 'static>(args: &[DynValue], index: usize) -> Option<T> {
    args.get(index)?.downcast_ref::<T>().cloned()
}

/// Types that can describe their own shape.
pub trait Describe: Clone + 'static {
    fn describe() -> TypeDescriptor;
}

macro_rules! describe_opaque {
    ($($t:ty),*) => {
        $(
            impl Describe for $t {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::of::<$t>(TypeShape::Opaque)
                }
            }
        )*
    };
}

describe_opaque!(bool, i8, i16, i32, i64, u8, u16, u32);

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Vec<T>>(TypeShape::List {
            element: T::describe,
            build: Rc::new(|values: Vec<DynValue>| -> Option<DynValue> {
                let values = values
                    .iter()
                    .map(|value| value.downcast_ref::<T>().cloned())
                    .collect::<Option<Vec<T>>>()?;
                Some(Rc::new(values) as DynValue)
            }),
        })
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Option<T>>(TypeShape::Nullable {
            inner: T::describe,
            build: Rc::new(|value: Option<DynValue>| -> Option<DynValue> {
                match value {
                    None => Some(Rc::new(None::<T>) as DynValue),
                    Some(value) => {
                        let value = value.downcast_ref::<T>().cloned()?;
                        Some(Rc::new(Some(value)) as DynValue)
                    }
                }
            }),
        })
    }
}

struct Registration {
    name: String,
    gen: DynGen,
}

/// Builds generators for described types.
pub struct GenFactory {
    registered: HashMap<TypeId, Registration>,
    overrides: HashMap<String, (TypeId, Registration)>,
}

impl Default for GenFactory {
    /// A factory knowing the primitive generators.
    fn default() -> Self {
        GenFactory::new()
            .register(Gen::boolean())
            .register(Gen::<i8>::integer().build())
            .register(Gen::<i16>::integer().build())
            .register(Gen::<i32>::integer().build())
            .register(Gen::<i64>::integer().build())
            .register(Gen::<u8>::integer().build())
            .register(Gen::<u16>::integer().build())
            .register(Gen::<u32>::integer().build())
    }
}

impl GenFactory {
    /// A factory with nothing registered.
    pub fn new() -> Self {
        GenFactory {
            registered: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Use `gen` wherever a `T` is needed. Replaces an earlier registration.
    pub fn register<T: Clone + 'static>(mut self, gen: Gen<T>) -> Self {
        self.registered.insert(TypeId::of::<T>(), registration(gen));
        self
    }

    /// Use `gen` for the member at `path`, e.g. `$.address.street`.
    pub fn override_member<T: Clone + 'static>(mut self, path: impl Into<String>, gen: Gen<T>) -> Self {
        self.overrides
            .insert(path.into(), (TypeId::of::<T>(), registration(gen)));
        self
    }

    /// Resolve a type-erased generator for `descriptor`.
    pub fn resolve(&self, descriptor: &TypeDescriptor) -> Result<Gen<DynValue>, ResolveError> {
        Resolver {
            factory: self,
            stack: Vec::new(),
        }
        .resolve(descriptor, ROOT_PATH)
    }

    /// A generator for `T`. Resolution failures surface as a generator error
    /// when the generator runs.
    pub fn create<T: Describe>(&self) -> Gen<T> {
        match self.resolve(&T::describe()) {
            Ok(gen) => gen.filter_map(|value| value.downcast_ref::<T>().cloned()),
            Err(error) => Gen::error(FACTORY_GEN_NAME, error.to_string()),
        }
    }
}

fn registration<T: Clone + 'static>(gen: Gen<T>) -> Registration {
    Registration {
        name: short_type_name(type_name::<T>()),
        gen: gen.map(|value| Rc::new(value.clone()) as DynValue),
    }
}

struct Resolver<'a> {
    factory: &'a GenFactory,
    /// Composite types currently being resolved, outermost first.
    stack: Vec<TypeId>,
}

impl Resolver<'_> {
    fn resolve(&mut self, descriptor: &TypeDescriptor, path: &str) -> Result<DynGen, ResolveError> {
        if let Some((id, overridden)) = self.factory.overrides.get(path) {
            if *id != descriptor.id {
                return Err(ResolveError::OverrideMismatch {
                    path: path.to_string(),
                    expected: descriptor.name.clone(),
                    found: overridden.name.clone(),
                });
            }
            return Ok(overridden.gen.clone());
        }

        if self.stack.contains(&descriptor.id) {
            return Err(ResolveError::CircularReference {
                type_name: descriptor.name.clone(),
                path: path.to_string(),
            });
        }

        for handler in HANDLERS {
            if handler.can_handle(descriptor, self.factory) {
                tracing::trace!(type_name = %descriptor.name, path, handler = handler.name(), "resolving");
                return handler.create(descriptor, path, self);
            }
        }

        Err(ResolveError::CannotResolve {
            type_name: descriptor.name.clone(),
            path: path.to_string(),
        })
    }

    /// Resolve every member of a composite type into one generator of the
    /// member values, in order.
    fn resolve_members(
        &mut self,
        descriptor: &TypeDescriptor,
        members: &[Member],
        path: &str,
    ) -> Result<Gen<Vec<DynValue>>, ResolveError> {
        self.stack.push(descriptor.id);
        let gens = members
            .iter()
            .map(|member| {
                let member_path = format!("{path}.{}", member.name);
                // Each member draws from its own fork of the composite's
                // waypoint, so one member's consumption never shifts another.
                self.resolve(&(member.ty)(), &member_path)
                    .map(|gen| gen.reference_rng_waypoint(|rng| rng.fork()))
            })
            .collect::<Result<Vec<_>, _>>();
        self.stack.pop();

        Ok(gens?
            .into_iter()
            .fold(Gen::constant(Vec::new()), |values, gen| {
                values.zip(&gen).map(|(values, value)| {
                    let mut values = values.clone();
                    values.push(value.clone());
                    values
                })
            }))
    }
}

trait TypeHandler: Sync {
    fn name(&self) -> &'static str;
    fn can_handle(&self, descriptor: &TypeDescriptor, factory: &GenFactory) -> bool;
    fn create(&self, descriptor: &TypeDescriptor, path: &str, resolver: &mut Resolver<'_>) -> Result<DynGen, ResolveError>;
}

static HANDLERS: [&dyn TypeHandler; 5] = [
    &RegisteredHandler,
    &NullableHandler,
    &ListHandler,
    &ConstructorHandler,
    &SettableHandler,
];

struct RegisteredHandler;

impl TypeHandler for RegisteredHandler {
    fn name(&self) -> &'static str {
        "registered"
    }

    fn can_handle(&self, descriptor: &TypeDescriptor, factory: &GenFactory) -> bool {
        factory.registered.contains_key(&descriptor.id)
    }

    fn create(&self, descriptor: &TypeDescriptor, path: &str, resolver: &mut Resolver<'_>) -> Result<DynGen, ResolveError> {
        resolver
            .factory
            .registered
            .get(&descriptor.id)
            .map(|registration| registration.gen.clone())
            .ok_or_else(|| ResolveError::CannotResolve {
                type_name: descriptor.name.clone(),
                path: path.to_string(),
            })
    }
}

struct NullableHandler;

impl TypeHandler for NullableHandler {
    fn name(&self) -> &'static str {
        "nullable"
    }

    fn can_handle(&self, descriptor: &TypeDescriptor, _factory: &GenFactory) -> bool {
        matches!(descriptor.shape, TypeShape::Nullable { .. })
    }

    fn create(&self, descriptor: &TypeDescriptor, path: &str, resolver: &mut Resolver<'_>) -> Result<DynGen, ResolveError> {
        let TypeShape::Nullable { inner, build } = &descriptor.shape else {
            return Err(unresolvable(descriptor, path));
        };
        let inner = resolver.resolve(&inner(), path)?;
        let build = build.clone();
        Ok(inner.option().filter_map(move |value| build(value.clone())))
    }
}

struct ListHandler;

impl TypeHandler for ListHandler {
    fn name(&self) -> &'static str {
        "list"
    }

    fn can_handle(&self, descriptor: &TypeDescriptor, _factory: &GenFactory) -> bool {
        matches!(descriptor.shape, TypeShape::List { .. })
    }

    fn create(&self, descriptor: &TypeDescriptor, path: &str, resolver: &mut Resolver<'_>) -> Result<DynGen, ResolveError> {
        let TypeShape::List { element, build } = &descriptor.shape else {
            return Err(unresolvable(descriptor, path));
        };
        let element = resolver.resolve(&element(), &format!("{path}[*]"))?;
        let build = build.clone();
        Ok(element.list().build().filter_map(move |values| build(values.clone())))
    }
}

struct ConstructorHandler;

impl ConstructorHandler {
    /// The first of the constructors with the most parameters.
    fn choose(constructors: &[Constructor]) -> Option<&Constructor> {
        constructors.iter().fold(None, |best: Option<&Constructor>, candidate| match best {
            Some(best) if best.params.len() >= candidate.params.len() => Some(best),
            _ => Some(candidate),
        })
    }
}

impl TypeHandler for ConstructorHandler {
    fn name(&self) -> &'static str {
        "constructor"
    }

    fn can_handle(&self, descriptor: &TypeDescriptor, _factory: &GenFactory) -> bool {
        matches!(&descriptor.shape, TypeShape::Constructors(constructors) if !constructors.is_empty())
    }

    fn create(&self, descriptor: &TypeDescriptor, path: &str, resolver: &mut Resolver<'_>) -> Result<DynGen, ResolveError> {
        let constructor = match &descriptor.shape {
            TypeShape::Constructors(constructors) => ConstructorHandler::choose(constructors),
            _ => None,
        }
        .ok_or_else(|| unresolvable(descriptor, path))?;

        let args = resolver.resolve_members(descriptor, &constructor.params, path)?;
        let build = constructor.build.clone();
        Ok(args.filter_map(move |args| build(args.as_slice())).set_rng_waypoint())
    }
}

struct SettableHandler;

impl TypeHandler for SettableHandler {
    fn name(&self) -> &'static str {
        "settable"
    }

    fn can_handle(&self, descriptor: &TypeDescriptor, _factory: &GenFactory) -> bool {
        matches!(descriptor.shape, TypeShape::Settable(_))
    }

    fn create(&self, descriptor: &TypeDescriptor, path: &str, resolver: &mut Resolver<'_>) -> Result<DynGen, ResolveError> {
        let TypeShape::Settable(settable) = &descriptor.shape else {
            return Err(unresolvable(descriptor, path));
        };
        let members: Vec<Member> = settable.setters.iter().map(|(member, _)| *member).collect();
        let values = resolver.resolve_members(descriptor, &members, path)?;
        let settable = settable.clone();
        Ok(values
            .filter_map(move |values| settable.assemble(values))
            .set_rng_waypoint())
    }
}

fn unresolvable(descriptor: &TypeDescriptor, path: &str) -> ResolveError {
    ResolveError::CannotResolve {
        type_name: descriptor.name.clone(),
        path: path.to_string(),
    }
}

/// Strip module paths from every segment of a type name:
/// `alloc::vec::Vec<my::Point>` becomes `Vec<Point>`.
fn short_type_name(full: &str) -> String {
    let mut short = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            short.push_str(segment.rsplit("::").next().unwrap_or_default());
            segment.clear();
            short.push(c);
        }
    }
    short.push_str(segment.rsplit("::").next().unwrap_or_default());
    short
}
