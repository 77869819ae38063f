//! Generator combinators for property-based testing.
//!
//! A generator is a function from [`GenParameters`] to a single
//! [`GenIteration`]. Feeding each iteration's `next_parameters` back in gives
//! the infinite iteration stream that `check` and `sample` pull from.

use crate::data::{GenParameters, Rng, Size, DEFAULT_DISCARD_LIMIT};
use crate::shrink::{IdentifyFn, MeasureFn, ShrinkFn};
use crate::space::{Example, ExampleId, ExampleSpace};
use std::collections::HashSet;
use std::rc::Rc;

mod choice;
mod collection;
mod integer;

pub use collection::{ListGen, SetGen};
pub use integer::{Bias, Integer, IntegerGen};

/// A successful generator run: an example space plus the parameters it was
/// generated with and the parameters the next run should use.
#[derive(Debug, Clone)]
pub struct GenInstance<T> {
    pub replay_parameters: GenParameters,
    pub next_parameters: GenParameters,
    pub example_space: ExampleSpace<T>,
}

/// A run whose value was rejected, e.g. by a filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenDiscard {
    pub replay_parameters: GenParameters,
    pub next_parameters: GenParameters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenErrorKind {
    /// The generator was configured with contradictory constraints.
    Configuration,
    /// A safety cap, such as the collection count limit, was hit.
    LimitExceeded,
    /// A nested generator discarded too many times in a row.
    Exhausted { discards: usize },
}

/// A fatal generator failure.
#[derive(Debug, Clone, PartialEq)]
pub struct GenError {
    pub gen_name: String,
    pub message: String,
    pub kind: GenErrorKind,
    pub replay_parameters: GenParameters,
    pub next_parameters: GenParameters,
}

/// One element of a generator's iteration stream.
#[derive(Debug, Clone)]
pub enum GenIteration<T> {
    Instance(GenInstance<T>),
    Discard(GenDiscard),
    Error(GenError),
}

impl<T> GenIteration<T> {
    pub fn replay_parameters(&self) -> GenParameters {
        match self {
            GenIteration::Instance(instance) => instance.replay_parameters,
            GenIteration::Discard(discard) => discard.replay_parameters,
            GenIteration::Error(error) => error.replay_parameters,
        }
    }

    pub fn next_parameters(&self) -> GenParameters {
        match self {
            GenIteration::Instance(instance) => instance.next_parameters,
            GenIteration::Discard(discard) => discard.next_parameters,
            GenIteration::Error(error) => error.next_parameters,
        }
    }

    pub fn is_instance(&self) -> bool {
        matches!(self, GenIteration::Instance(_))
    }

    /// Replace the outgoing parameters, whatever the kind of iteration.
    pub fn with_next_parameters(self, next_parameters: GenParameters) -> Self {
        match self {
            GenIteration::Instance(instance) => GenIteration::Instance(GenInstance {
                next_parameters,
                ..instance
            }),
            GenIteration::Discard(discard) => GenIteration::Discard(GenDiscard {
                next_parameters,
                ..discard
            }),
            GenIteration::Error(error) => GenIteration::Error(GenError {
                next_parameters,
                ..error
            }),
        }
    }

    /// Replace the parameters the iteration reports it was generated with.
    pub fn with_replay_parameters(self, replay_parameters: GenParameters) -> Self {
        match self {
            GenIteration::Instance(instance) => GenIteration::Instance(GenInstance {
                replay_parameters,
                ..instance
            }),
            GenIteration::Discard(discard) => GenIteration::Discard(GenDiscard {
                replay_parameters,
                ..discard
            }),
            GenIteration::Error(error) => GenIteration::Error(GenError {
                replay_parameters,
                ..error
            }),
        }
    }

    /// Split off the instance, re-typing discards and errors so a combinator
    /// can forward them as its own result. Forwarded iterations report
    /// `replay_parameters` as the parameters they replay from.
    pub(crate) fn into_instance<U>(
        self,
        replay_parameters: GenParameters,
    ) -> Result<GenInstance<T>, GenIteration<U>> {
        match self {
            GenIteration::Instance(instance) => Ok(instance),
            GenIteration::Discard(discard) => Err(GenIteration::Discard(GenDiscard {
                replay_parameters,
                next_parameters: discard.next_parameters,
            })),
            GenIteration::Error(error) => Err(GenIteration::Error(GenError {
                replay_parameters,
                ..error
            })),
        }
    }
}

type GenFn<T> = Rc<dyn Fn(GenParameters) -> GenIteration<T>>;

/// A generator for test data of type `T`.
///
/// Generators are explicit, first-class values composed with combinator
/// methods. Running a generator is pure: the same parameters always produce
/// the same iteration.
pub struct Gen<T> {
    run: GenFn<T>,
}

impl<T> Clone for Gen<T> {
    fn clone(&self) -> Self {
        Gen {
            run: self.run.clone(),
        }
    }
}

impl<T: Clone + 'static> Gen<T> {
    /// Create a new generator from a function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(GenParameters) -> GenIteration<T> + 'static,
    {
        Gen { run: Rc::new(f) }
    }

    /// Run the generator once.
    pub fn run(&self, parameters: GenParameters) -> GenIteration<T> {
        (self.run)(parameters)
    }

    /// The infinite iteration stream starting at `parameters`.
    pub fn iterations(&self, parameters: GenParameters) -> GenIterations<T> {
        GenIterations {
            gen: self.clone(),
            parameters,
        }
    }

    /// Create a generator that always produces the same value.
    pub fn constant(value: T) -> Self {
        Gen::new(move |parameters| {
            GenIteration::Instance(GenInstance {
                replay_parameters: parameters,
                next_parameters: parameters,
                example_space: ExampleSpace::singleton(value.clone()),
            })
        })
    }

    /// Create a non-shrinking generator from a raw function of the random
    /// source and size. The function returns the value and the source it
    /// leaves behind.
    pub fn create<F>(f: F) -> Self
    where
        F: Fn(Rng, Size) -> (T, Rng) + 'static,
    {
        Gen::new(move |parameters| {
            let (value, rng) = f(parameters.rng, parameters.size);
            GenIteration::Instance(GenInstance {
                replay_parameters: parameters,
                next_parameters: parameters.with_rng(rng),
                example_space: ExampleSpace::singleton(value),
            })
        })
    }

    /// A generator that always fails with a configuration error.
    pub fn error(gen_name: impl Into<String>, message: impl Into<String>) -> Self {
        Gen::failing(gen_name.into(), message.into(), GenErrorKind::Configuration)
    }

    pub(crate) fn failing(gen_name: String, message: String, kind: GenErrorKind) -> Self {
        Gen::new(move |parameters| {
            GenIteration::Error(GenError {
                gen_name: gen_name.clone(),
                message: message.clone(),
                kind,
                replay_parameters: parameters,
                next_parameters: parameters,
            })
        })
    }

    /// Map a function over the generated values.
    pub fn map<U, F>(&self, f: F) -> Gen<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let gen = self.clone();
        let f = Rc::new(f);
        Gen::new(move |parameters| match gen.run(parameters).into_instance(parameters) {
            Ok(instance) => {
                let f = f.clone();
                GenIteration::Instance(GenInstance {
                    replay_parameters: instance.replay_parameters,
                    next_parameters: instance.next_parameters,
                    example_space: instance.example_space.map(move |value| f(value)),
                })
            }
            Err(iteration) => iteration,
        })
    }

    /// Bind/flatmap for dependent generation.
    ///
    /// The right generator runs with the parameters the left one leaves
    /// behind. When the left value shrinks, the right generator is re-run
    /// from those same parameters against the shrunk value.
    pub fn bind<U, F>(&self, f: F) -> Gen<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> Gen<U> + 'static,
    {
        let gen = self.clone();
        let f: Rc<dyn Fn(&T) -> Gen<U>> = Rc::new(f);
        Gen::new(move |parameters| {
            let left = match gen.run(parameters).into_instance(parameters) {
                Ok(instance) => instance,
                Err(iteration) => return iteration,
            };
            let right_parameters = left.next_parameters;
            let right_gen = f(&left.example_space.current().value);
            let right = match right_gen.run(right_parameters).into_instance(parameters) {
                Ok(instance) => instance,
                Err(iteration) => return iteration,
            };
            let id = left
                .example_space
                .current()
                .id
                .combine(right.example_space.current().id);
            GenIteration::Instance(GenInstance {
                replay_parameters: parameters,
                next_parameters: right.next_parameters,
                example_space: bind_space(
                    left.example_space,
                    right.example_space,
                    f.clone(),
                    right_parameters,
                    Rc::new(HashSet::from([id])),
                ),
            })
        })
    }

    /// Filter generated values by a predicate.
    ///
    /// A value failing the predicate turns the iteration into a discard.
    /// Shrinks failing the predicate are pruned from the example space.
    pub fn filter<F>(&self, predicate: F) -> Gen<T>
    where
        F: Fn(&T) -> bool + 'static,
    {
        let gen = self.clone();
        let predicate = Rc::new(predicate);
        Gen::new(move |parameters| match gen.run(parameters) {
            GenIteration::Instance(instance) => {
                let predicate = predicate.clone();
                match instance.example_space.filter(move |value| predicate(value)) {
                    Some(example_space) => GenIteration::Instance(GenInstance {
                        example_space,
                        ..instance
                    }),
                    None => GenIteration::Discard(GenDiscard {
                        replay_parameters: instance.replay_parameters,
                        next_parameters: instance.next_parameters,
                    }),
                }
            }
            other => other,
        })
    }

    /// Map and filter in one step. A root mapped to `None` is a discard.
    pub fn filter_map<U, F>(&self, f: F) -> Gen<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> Option<U> + 'static,
    {
        let gen = self.clone();
        let f = Rc::new(f);
        Gen::new(move |parameters| match gen.run(parameters).into_instance(parameters) {
            Ok(instance) => {
                let f = f.clone();
                match instance.example_space.filter_map(move |value| f(value)) {
                    Some(example_space) => GenIteration::Instance(GenInstance {
                        replay_parameters: instance.replay_parameters,
                        next_parameters: instance.next_parameters,
                        example_space,
                    }),
                    None => GenIteration::Discard(GenDiscard {
                        replay_parameters: instance.replay_parameters,
                        next_parameters: instance.next_parameters,
                    }),
                }
            }
            Err(other) => other,
        })
    }

    /// Pair with another generator. The second runs with the parameters the
    /// first leaves behind.
    pub fn zip<U>(&self, other: &Gen<U>) -> Gen<(T, U)>
    where
        U: Clone + 'static,
    {
        let (left_gen, right_gen) = (self.clone(), other.clone());
        Gen::new(move |parameters| {
            let left = match left_gen.run(parameters).into_instance(parameters) {
                Ok(instance) => instance,
                Err(iteration) => return iteration,
            };
            let right = match right_gen.run(left.next_parameters).into_instance(parameters) {
                Ok(instance) => instance,
                Err(iteration) => return iteration,
            };
            GenIteration::Instance(GenInstance {
                replay_parameters: parameters,
                next_parameters: right.next_parameters,
                example_space: left.example_space.zip(&right.example_space),
            })
        })
    }

    pub fn zip3<U, V>(&self, second: &Gen<U>, third: &Gen<V>) -> Gen<(T, U, V)>
    where
        U: Clone + 'static,
        V: Clone + 'static,
    {
        self.zip(second)
            .zip(third)
            .map(|((a, b), c)| (a.clone(), b.clone(), c.clone()))
    }

    /// Replace the example space with one unfolded from the generated value
    /// using custom shrink, measure and identify functions.
    pub fn unfold(&self, shrink: ShrinkFn<T>, measure: MeasureFn<T>, identify: IdentifyFn<T>) -> Gen<T> {
        let gen = self.clone();
        Gen::new(move |parameters| match gen.run(parameters) {
            GenIteration::Instance(instance) => {
                let root = instance.example_space.current().value.clone();
                GenIteration::Instance(GenInstance {
                    example_space: ExampleSpace::unfold(
                        root,
                        shrink.clone(),
                        measure.clone(),
                        identify.clone(),
                    ),
                    ..instance
                })
            }
            other => other,
        })
    }

    /// Keep the generated value but never shrink it.
    pub fn no_shrink(&self) -> Gen<T> {
        let gen = self.clone();
        Gen::new(move |parameters| match gen.run(parameters) {
            GenIteration::Instance(instance) => {
                let current = instance.example_space.current().clone();
                GenIteration::Instance(GenInstance {
                    example_space: ExampleSpace::new(current, || Box::new(std::iter::empty())),
                    ..instance
                })
            }
            other => other,
        })
    }

    /// Run with the waypoint set to the current random source, restoring the
    /// caller's waypoint afterwards.
    pub fn set_rng_waypoint(&self) -> Gen<T> {
        let gen = self.clone();
        Gen::new(move |parameters| {
            let inner = parameters.with_rng_waypoint(Some(parameters.rng));
            let iteration = gen.run(inner);
            let next = iteration.next_parameters().with_rng_waypoint(parameters.rng_waypoint);
            iteration
                .with_next_parameters(next)
                .with_replay_parameters(parameters)
        })
    }

    /// Run from a source derived from the waypoint instead of the current
    /// source, then move the waypoint along.
    ///
    /// Sibling generators that each reference the waypoint draw from sources
    /// that depend only on their position, not on how much randomness earlier
    /// siblings consumed. Without a waypoint the generator runs unchanged.
    pub fn reference_rng_waypoint<F>(&self, f: F) -> Gen<T>
    where
        F: Fn(Rng) -> Rng + 'static,
    {
        let gen = self.clone();
        Gen::new(move |parameters| match parameters.rng_waypoint {
            Some(waypoint) => {
                let moved = f(waypoint);
                let inner = parameters.with_rng(moved).with_rng_waypoint(Some(moved));
                let iteration = gen.run(inner);
                let next = iteration.next_parameters().with_rng_waypoint(Some(moved));
                iteration
                    .with_next_parameters(next)
                    .with_replay_parameters(parameters)
            }
            None => gen.run(parameters),
        })
    }
}

/// Pull iterations until one is an instance, following each discard's next
/// parameters. Gives up after [`DEFAULT_DISCARD_LIMIT`] consecutive discards.
pub(crate) fn pull_instance<T: Clone + 'static>(
    gen: &Gen<T>,
    parameters: GenParameters,
) -> Result<GenInstance<T>, GenError> {
    let mut current = parameters;
    for _ in 0..DEFAULT_DISCARD_LIMIT {
        match gen.run(current) {
            GenIteration::Instance(instance) => return Ok(instance),
            GenIteration::Discard(discard) => current = discard.next_parameters,
            GenIteration::Error(error) => return Err(error),
        }
    }
    Err(GenError {
        gen_name: "Gen".to_string(),
        message: format!("exhausted after {DEFAULT_DISCARD_LIMIT} consecutive discards"),
        kind: GenErrorKind::Exhausted {
            discards: DEFAULT_DISCARD_LIMIT,
        },
        replay_parameters: parameters,
        next_parameters: current,
    })
}

fn bind_space<T, U>(
    left: ExampleSpace<T>,
    right: ExampleSpace<U>,
    f: Rc<dyn Fn(&T) -> Gen<U>>,
    right_parameters: GenParameters,
    encountered: Rc<HashSet<ExampleId>>,
) -> ExampleSpace<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let current = Example::new(
        left.current().id.combine(right.current().id),
        right.current().value.clone(),
        left.current().distance + right.current().distance,
    );
    ExampleSpace::new(current, move || {
        let mut seen = (*encountered).clone();
        let regenerate = f.clone();
        let left_shrinks = left.subspace().filter_map(move |child| {
            match regenerate(&child.current().value).run(right_parameters) {
                GenIteration::Instance(instance) => Some((child, instance.example_space)),
                _ => None,
            }
        });
        let fixed_left = left.clone();
        let right_shrinks = right.subspace().map(move |child| (fixed_left.clone(), child));
        let f = f.clone();
        Box::new(left_shrinks.chain(right_shrinks).filter_map(move |(l, r)| {
            let id = l.current().id.combine(r.current().id);
            if !seen.insert(id) {
                return None;
            }
            Some(bind_space(l, r, f.clone(), right_parameters, Rc::new(seen.clone())))
        }))
    })
}

/// The infinite stream of a generator's iterations.
pub struct GenIterations<T> {
    gen: Gen<T>,
    parameters: GenParameters,
}

impl<T: Clone + 'static> Iterator for GenIterations<T> {
    type Item = GenIteration<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let iteration = self.gen.run(self.parameters);
        self.parameters = iteration.next_parameters();
        Some(iteration)
    }
}
