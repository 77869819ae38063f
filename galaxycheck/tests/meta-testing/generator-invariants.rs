//! Generator invariant properties
//!
//! Generators must be pure functions of their parameters and respect every
//! bound they are configured with, at every size.

use crate::{arbitrary_seed, arbitrary_size, assert_property, parameters};
use galaxycheck::*;

fn instance<T: Clone + 'static>(gen: &Gen<T>, parameters: GenParameters) -> Option<GenInstance<T>> {
    match gen.run(parameters) {
        GenIteration::Instance(instance) => Some(instance),
        _ => None,
    }
}

/// Property: the same parameters always give the same iteration
pub fn test_generation_is_deterministic() {
    let prop = for_all(arbitrary_seed().zip(&arbitrary_size()), |&(seed, size)| {
        let gen = Gen::int32().between(-1000, 1000).build().list().build();
        let first = instance(&gen, parameters(seed, size));
        let second = instance(&gen, parameters(seed, size));
        match (first, second) {
            (Some(a), Some(b)) => {
                a.example_space.current().value == b.example_space.current().value
                    && a.example_space.current().id == b.example_space.current().id
                    && a.next_parameters == b.next_parameters
            }
            _ => false,
        }
    });
    assert_property("Deterministic generation", prop);
}

/// Property: integers and their shrinks stay within the configured range
pub fn test_integers_stay_in_bounds() {
    let bounds = Gen::int_range(-500, 500).zip(&Gen::int_range(0, 300));
    let prop = for_all(
        arbitrary_seed().zip3(&arbitrary_size(), &bounds),
        |&(seed, size, (min, extent))| {
            let max = min + extent;
            let gen = Gen::int32().between(min, max).build();
            match instance(&gen, parameters(seed, size)) {
                Some(instance) => instance
                    .example_space
                    .examples(3)
                    .iter()
                    .all(|example| (min..=max).contains(&example.value)),
                None => false,
            }
        },
    );
    assert_property("Integer bounds", prop);
}

/// Property: lists and their shrinks keep a count within the configured range
pub fn test_list_counts_stay_in_bounds() {
    let prop = for_all(arbitrary_seed().zip(&arbitrary_size()), |&(seed, size)| {
        let gen = Gen::int_range(0, 10).list().with_count_between(2, 6).build();
        match instance(&gen, parameters(seed, size)) {
            Some(instance) => instance
                .example_space
                .examples(2)
                .iter()
                .all(|example| (2..=6).contains(&example.value.len())),
            None => false,
        }
    });
    assert_property("List count bounds", prop);
}

/// Property: sets hold exactly the requested number of distinct values
pub fn test_sets_have_requested_counts() {
    let prop = for_all(arbitrary_seed().zip(&Gen::int_range(0, 8)), |&(seed, count)| {
        let gen = Gen::int_range(0, 1000).set().with_count(count as usize).build();
        match instance(&gen, parameters(seed, Size::MAX)) {
            Some(instance) => instance.example_space.current().value.len() == count as usize,
            None => true,
        }
    });
    assert_property("Set counts", prop);
}
