//! Pulling values out of generators outside of a property: sampling and
//! minimal search.

use crate::check::check;
use crate::data::Config;
use crate::error::{GalaxyError, Result};
use crate::gen::{pull_instance, Gen};
use crate::property::{for_all, Outcome};
use crate::space::ExampleSpace;
use std::cell::RefCell;
use std::rc::Rc;

/// Generate `config.iterations` values.
///
/// Values are drawn the way a check draws them, so the size grows from one
/// value to the next and discards are retried.
pub fn sample<T: Clone + 'static>(gen: &Gen<T>, config: &Config) -> Result<Vec<T>> {
    let values = Rc::new(RefCell::new(Vec::with_capacity(config.iterations)));
    let recorder = values.clone();
    let property = for_all(gen.clone(), move |value: &T| {
        recorder.borrow_mut().push(value.clone());
        Outcome::Pass
    });
    // Sampling never replays and never fails, so the rest of the config only
    // decides seed, size and iteration count.
    let config = Config {
        replay: None,
        ..config.clone()
    };
    check(&property, &config)?;
    let values = values.borrow().clone();
    Ok(values)
}

/// The example space of the first instance produced from `config`'s initial
/// parameters.
pub fn sample_example_space<T: Clone + 'static>(gen: &Gen<T>, config: &Config) -> Result<ExampleSpace<T>> {
    let instance = pull_instance(gen, config.initial_parameters())?;
    Ok(instance.example_space)
}

/// One value: the root of [`sample_example_space`].
pub fn sample_one<T: Clone + 'static>(gen: &Gen<T>, config: &Config) -> Result<T> {
    let space = sample_example_space(gen, config)?;
    Ok(space.current().value.clone())
}

/// The smallest generated value satisfying `predicate`.
///
/// Values satisfying the predicate are treated as counterexamples and shrunk,
/// so the result is the minimal such value the generator's shrinks can reach.
pub fn minimal<T, F>(gen: &Gen<T>, predicate: F, config: &Config) -> Result<T>
where
    T: Clone + 'static,
    F: Fn(&T) -> bool + 'static,
{
    let property = for_all(gen.clone(), move |value: &T| !predicate(value));
    let result = check(&property, config)?;
    match result.counterexample {
        Some(counterexample) => Ok(counterexample.value),
        None => Err(GalaxyError::NoMinimalFound {
            iterations: result.iterations,
        }),
    }
}

impl<T: Clone + 'static> Gen<T> {
    /// Shorthand for [`sample`] with `count` iterations and an optional seed.
    pub fn sample(&self, count: usize, seed: Option<i32>) -> Result<Vec<T>> {
        let config = Config::default().with_iterations(count);
        let config = match seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        };
        sample(self, &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Size;

    #[test]
    fn test_sample_count_and_determinism() {
        let gen = Gen::int32().between(-1000, 1000).build();
        let first = gen.sample(50, Some(7)).unwrap_or_else(|e| panic!("{e}"));
        let second = gen.sample(50, Some(7)).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(first.len(), 50);
        assert_eq!(first, second);
        assert!(first.iter().all(|x| (-1000..=1000).contains(x)));
    }

    #[test]
    fn test_sample_skips_discards() {
        let gen = Gen::int32().between(0, 100).build().filter(|x| x % 2 == 0);
        let values = gen.sample(30, Some(3)).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(values.len(), 30);
        assert!(values.iter().all(|x| x % 2 == 0));
    }

    #[test]
    fn test_sample_exhaustion() {
        let gen = Gen::int32().build().filter(|_| false);
        let result = gen.sample(10, Some(0));
        assert_eq!(result, Err(GalaxyError::Exhausted { discards: 1000 }));
    }

    #[test]
    fn test_sample_one_at_size() {
        let config = Config::default().with_seed(11).with_size(Size::MAX);
        let gen = Gen::int32().between(0, 10).build();
        let one = sample_one(&gen, &config).unwrap_or_else(|e| panic!("{e}"));
        let space = sample_example_space(&gen, &config).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(one, space.current().value);
    }

    #[test]
    fn test_sample_example_space_reports_errors() {
        let gen = Gen::<i32>::error("BrokenGen", "nope");
        match sample_example_space(&gen, &Config::default().with_seed(0)) {
            Err(GalaxyError::Generator { gen_name, .. }) => assert_eq!(gen_name, "BrokenGen"),
            other => panic!("Expected generator error, got: {other:?}"),
        }
    }

    #[test]
    fn test_minimal_integer() {
        let gen = Gen::int32().between(0, 1000).build();
        let config = Config::default().with_seed(0);
        assert_eq!(minimal(&gen, |&x| x >= 10, &config), Ok(10));
    }

    #[test]
    fn test_minimal_list_by_length() {
        let gen = Gen::int32().between(0, 100).build().list().build();
        let config = Config::default().with_seed(4);
        let found = minimal(&gen, |xs: &Vec<i32>| xs.len() >= 3, &config);
        assert_eq!(found, Ok(vec![0, 0, 0]));
    }

    #[test]
    fn test_no_minimal_found() {
        let gen = Gen::int32().between(0, 10).build();
        let config = Config::default().with_seed(0).with_iterations(20);
        assert_eq!(
            minimal(&gen, |&x| x > 10, &config),
            Err(GalaxyError::NoMinimalFound { iterations: 20 })
        );
    }
}
