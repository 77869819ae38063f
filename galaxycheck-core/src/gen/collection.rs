//! List and set generators.
//!
//! Collections draw a count and then each element from its own fork of the
//! random source, so changing how much randomness one element consumes never
//! shifts the others.

use super::{pull_instance, Bias, Gen, GenDiscard, GenError, GenErrorKind, GenInstance, GenIteration};
use crate::data::{GenParameters, Rng};
use crate::shrink;
use crate::space::ExampleSpace;
use std::collections::HashSet;
use std::hash::Hash;

/// Largest count allowed unless explicitly unlocked.
pub const COUNT_LIMIT: usize = 1000;

const DEFAULT_COUNT_RANGE: usize = 20;

/// Count constraints shared by the collection builders.
#[derive(Debug, Clone, Copy)]
struct CountBounds {
    min: Option<usize>,
    max: Option<usize>,
    bias: Bias,
    limit_enabled: bool,
}

impl Default for CountBounds {
    fn default() -> Self {
        CountBounds {
            min: None,
            max: None,
            bias: Bias::WithSize,
            limit_enabled: true,
        }
    }
}

impl CountBounds {
    /// Resolve the bounds, or report why they are invalid.
    fn resolve(&self, gen_name: &str) -> Result<(usize, usize), (String, GenErrorKind)> {
        let min = self.min.unwrap_or(0);
        let max = self.max.unwrap_or_else(|| min.saturating_add(DEFAULT_COUNT_RANGE));
        if min > max {
            return Err((
                "'min count' cannot be greater than 'max count'".to_string(),
                GenErrorKind::Configuration,
            ));
        }
        if self.limit_enabled && max > COUNT_LIMIT {
            return Err((
                format!(
                    "Count limit exceeded. This is a built-in safety mechanism to prevent hanging tests. \
                     If generating a collection with over {COUNT_LIMIT} elements was intended, relax this \
                     constraint by calling {gen_name}::disable_count_limit_unsafe()"
                ),
                GenErrorKind::LimitExceeded,
            ));
        }
        Ok((min, max))
    }

    fn count_gen(&self, min: usize, max: usize) -> Gen<i64> {
        Gen::int64()
            .between(min as i64, max as i64)
            .shrink_towards(min as i64)
            .with_bias(self.bias)
            .build()
    }
}

/// Run `element` once per count, each time from the next fork of the spine.
///
/// Returns the element spaces and the spine source left over.
fn generate_elements<T: Clone + 'static>(
    element: &Gen<T>,
    parameters: GenParameters,
    spine: Rng,
    count: usize,
) -> Result<(Vec<ExampleSpace<T>>, Rng), GenError> {
    let mut spine = spine;
    let mut spaces = Vec::with_capacity(count);
    for _ in 0..count {
        let element_parameters = GenParameters {
            rng: spine,
            size: parameters.size,
            rng_waypoint: Some(spine),
        };
        let instance = pull_instance(element, element_parameters)?;
        spaces.push(instance.example_space);
        spine = spine.fork();
    }
    Ok((spaces, spine))
}

fn list_distance<T: Clone + 'static>(spaces: &[ExampleSpace<T>], min: usize, max: usize) -> f64 {
    let count_distance = shrink::count_distance(spaces.len(), min, max);
    if spaces.is_empty() {
        return count_distance;
    }
    let element_distance: f64 =
        spaces.iter().map(|space| space.current().distance).sum::<f64>() / spaces.len() as f64;
    count_distance + element_distance
}

/// Builder for list generators.
///
/// ```rust
/// use galaxycheck_core::*;
///
/// let gen: Gen<Vec<i32>> = Gen::int32().between(0, 9).build().list().with_count_between(1, 5).build();
/// ```
#[derive(Clone)]
pub struct ListGen<T> {
    element: Gen<T>,
    count: CountBounds,
}

impl<T: Clone + 'static> ListGen<T> {
    pub fn new(element: Gen<T>) -> Self {
        ListGen {
            element,
            count: CountBounds::default(),
        }
    }

    /// Generate lists of exactly `count` elements.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count.min = Some(count);
        self.count.max = Some(count);
        self
    }

    /// Generate lists of between `x` and `y` elements, inclusive, in either order.
    pub fn with_count_between(mut self, x: usize, y: usize) -> Self {
        self.count.min = Some(x.min(y));
        self.count.max = Some(x.max(y));
        self
    }

    pub fn with_count_greater_than_equal(mut self, min: usize) -> Self {
        self.count.min = Some(min);
        self
    }

    pub fn with_count_less_than_equal(mut self, max: usize) -> Self {
        self.count.max = Some(max);
        self
    }

    pub fn with_count_bias(mut self, bias: Bias) -> Self {
        self.count.bias = bias;
        self
    }

    /// Allow counts above [`COUNT_LIMIT`].
    pub fn disable_count_limit_unsafe(mut self) -> Self {
        self.count.limit_enabled = false;
        self
    }

    pub fn build(self) -> Gen<Vec<T>> {
        let (min, max) = match self.count.resolve("ListGen") {
            Ok(bounds) => bounds,
            Err((message, kind)) => return Gen::failing("ListGen".to_string(), message, kind),
        };
        let count_gen = self.count.count_gen(min, max);
        let element = self.element;

        Gen::new(move |parameters| {
            let count_instance = match count_gen.run(parameters).into_instance(parameters) {
                Ok(instance) => instance,
                Err(iteration) => return iteration,
            };
            let count = count_instance.example_space.current().value as usize;
            let spine = count_instance.next_parameters.rng;

            let (spaces, spine) = match generate_elements(&element, parameters, spine, count) {
                Ok(generated) => generated,
                Err(error) => return GenIteration::Error(GenError {
                    replay_parameters: parameters,
                    ..error
                }),
            };

            GenIteration::Instance(GenInstance {
                replay_parameters: parameters,
                next_parameters: parameters.with_rng(spine),
                example_space: ExampleSpace::merge(
                    spaces,
                    |values: &[T]| values.to_vec(),
                    shrink::cull(min),
                    move |spaces: &[ExampleSpace<T>]| list_distance(spaces, min, max),
                ),
            })
        })
    }
}

impl<T: Clone + 'static> From<ListGen<T>> for Gen<Vec<T>> {
    fn from(builder: ListGen<T>) -> Self {
        builder.build()
    }
}

/// Builder for set generators.
#[derive(Clone)]
pub struct SetGen<T> {
    element: Gen<T>,
    count: CountBounds,
}

impl<T: Clone + Eq + Hash + 'static> SetGen<T> {
    pub fn new(element: Gen<T>) -> Self {
        SetGen {
            element,
            count: CountBounds::default(),
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count.min = Some(count);
        self.count.max = Some(count);
        self
    }

    pub fn with_count_between(mut self, x: usize, y: usize) -> Self {
        self.count.min = Some(x.min(y));
        self.count.max = Some(x.max(y));
        self
    }

    pub fn with_count_greater_than_equal(mut self, min: usize) -> Self {
        self.count.min = Some(min);
        self
    }

    pub fn with_count_less_than_equal(mut self, max: usize) -> Self {
        self.count.max = Some(max);
        self
    }

    pub fn disable_count_limit_unsafe(mut self) -> Self {
        self.count.limit_enabled = false;
        self
    }

    /// Elements are drawn until `count` distinct values were seen or the
    /// attempts run out. Falling short of the minimum count discards.
    pub fn build(self) -> Gen<HashSet<T>> {
        let (min, max) = match self.count.resolve("SetGen") {
            Ok(bounds) => bounds,
            Err((message, kind)) => return Gen::failing("SetGen".to_string(), message, kind),
        };
        let count_gen = self.count.count_gen(min, max);
        let element = self.element;

        Gen::new(move |parameters| {
            let count_instance = match count_gen.run(parameters).into_instance(parameters) {
                Ok(instance) => instance,
                Err(iteration) => return iteration,
            };
            let count = count_instance.example_space.current().value as usize;
            let mut spine = count_instance.next_parameters.rng;

            let mut seen = HashSet::new();
            let mut spaces = Vec::with_capacity(count);
            let mut attempts = 0;
            while spaces.len() < count && attempts < count * 10 + 10 {
                attempts += 1;
                let (mut drawn, next) = match generate_elements(&element, parameters, spine, 1) {
                    Ok(generated) => generated,
                    Err(error) => return GenIteration::Error(GenError {
                        replay_parameters: parameters,
                        ..error
                    }),
                };
                spine = next;
                if let Some(space) = drawn.pop() {
                    if seen.insert(space.current().value.clone()) {
                        spaces.push(space);
                    }
                }
            }

            let next_parameters = parameters.with_rng(spine);
            if spaces.len() < min {
                return GenIteration::Discard(GenDiscard {
                    replay_parameters: parameters,
                    next_parameters,
                });
            }

            let space = ExampleSpace::merge(
                spaces,
                |values: &[T]| values.to_vec(),
                shrink::cull(min),
                move |spaces: &[ExampleSpace<T>]| list_distance(spaces, min, max),
            )
            .filter(|values| values.iter().collect::<HashSet<_>>().len() == values.len())
            .map(|space| space.map(|values| values.iter().cloned().collect::<HashSet<T>>()));

            match space {
                Some(example_space) => GenIteration::Instance(GenInstance {
                    replay_parameters: parameters,
                    next_parameters,
                    example_space,
                }),
                None => GenIteration::Discard(GenDiscard {
                    replay_parameters: parameters,
                    next_parameters,
                }),
            }
        })
    }
}

impl<T: Clone + Eq + Hash + 'static> From<SetGen<T>> for Gen<HashSet<T>> {
    fn from(builder: SetGen<T>) -> Self {
        builder.build()
    }
}

impl<T: Clone + 'static> Gen<T> {
    /// Start building a generator of lists of this generator's values.
    pub fn list(&self) -> ListGen<T> {
        ListGen::new(self.clone())
    }

    /// Generate lists with the default count range.
    pub fn vec_of(&self) -> Gen<Vec<T>> {
        self.list().build()
    }
}

impl<T: Clone + Eq + Hash + 'static> Gen<T> {
    /// Start building a generator of sets of this generator's values.
    pub fn set(&self) -> SetGen<T> {
        SetGen::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Size;

    fn parameters(seed: i32, size: usize) -> GenParameters {
        GenParameters::create(Rng::create(seed), Size::new(size))
    }

    fn instance<T: Clone + 'static>(gen: &Gen<T>, seed: i32, size: usize) -> GenInstance<T> {
        match gen.run(parameters(seed, size)) {
            GenIteration::Instance(instance) => instance,
            other => panic!("Expected instance, got: {:?}", other.next_parameters()),
        }
    }

    #[test]
    fn test_list_distance_of_owned_elements() {
        let spaces = vec![
            ExampleSpace::singleton("a".to_string()),
            ExampleSpace::singleton("b".to_string()),
        ];
        assert_eq!(list_distance(&spaces, 1, 5), shrink::count_distance(2, 1, 5));
        assert_eq!(list_distance::<String>(&[], 0, 5), shrink::count_distance(0, 0, 5));
    }

    #[test]
    fn test_list_count_bounds() {
        let gen = Gen::int32().between(0, 9).build().list().with_count_between(2, 6).build();
        for seed in 0..100 {
            let list = instance(&gen, seed, 100).example_space.current().value.clone();
            assert!((2..=6).contains(&list.len()), "{list:?}");
            assert!(list.iter().all(|x| (0..=9).contains(x)));
        }
    }

    #[test]
    fn test_list_exact_count() {
        let gen = Gen::constant(1u8).list().with_count(4).build();
        assert_eq!(instance(&gen, 3, 50).example_space.current().value, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_list_shrinks_respect_min_count() {
        let gen = Gen::int32().between(0, 100).build().list().with_count_between(3, 10).build();
        let space = instance(&gen, 7, 100).example_space;
        for example in space.examples(3) {
            assert!(example.value.len() >= 3);
        }
    }

    #[test]
    fn test_count_limit() {
        let gen = Gen::constant(0).list().with_count_greater_than_equal(1001).build();
        match gen.run(parameters(0, 0)) {
            GenIteration::Error(error) => {
                assert_eq!(error.kind, GenErrorKind::LimitExceeded);
                assert!(error.message.contains("ListGen::disable_count_limit_unsafe()"));
            }
            _ => panic!("Expected limit error"),
        }

        let gen = Gen::constant(0)
            .list()
            .with_count(1001)
            .disable_count_limit_unsafe()
            .build();
        assert_eq!(instance(&gen, 0, 0).example_space.current().value.len(), 1001);
    }

    #[test]
    fn test_min_count_greater_than_max_count() {
        let gen = Gen::constant(0).list().with_count_greater_than_equal(5).with_count_less_than_equal(2).build();
        match gen.run(parameters(0, 0)) {
            GenIteration::Error(error) => assert_eq!(error.kind, GenErrorKind::Configuration),
            _ => panic!("Expected configuration error"),
        }
    }

    #[test]
    fn test_elements_are_stable_under_element_consumption() {
        // Elements draw from their own forks, so a greedy element generator
        // yields the same values as a frugal one built on the same draw.
        let frugal = Gen::create(|rng, _| (rng.value(0, 1_000_000), rng.next()));
        let greedy = Gen::create(|rng, _| (rng.value(0, 1_000_000), rng.next().next().next()));
        let frugal_list = instance(&frugal.list().with_count(5).build(), 42, 50);
        let greedy_list = instance(&greedy.list().with_count(5).build(), 42, 50);
        assert_eq!(
            frugal_list.example_space.current().value,
            greedy_list.example_space.current().value
        );
        assert_eq!(frugal_list.next_parameters, greedy_list.next_parameters);
    }

    #[test]
    fn test_set_values_are_distinct() {
        let gen = Gen::int32().between(0, 5).build().set().with_count_between(0, 4).build();
        for seed in 0..50 {
            let space = instance(&gen, seed, 100).example_space;
            for example in space.examples(2) {
                assert!(example.value.len() <= 4);
                assert!(example.value.iter().all(|x| (0..=5).contains(x)));
            }
        }
    }

    #[test]
    fn test_set_discards_when_too_few_distinct_values() {
        let gen = Gen::constant(1).set().with_count(3).build();
        assert!(matches!(gen.run(parameters(0, 10)), GenIteration::Discard(_)));
    }
}
