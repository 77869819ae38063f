//! Shrinking correctness properties
//!
//! These properties ensure that example spaces only ever propose simpler
//! values and that following them always ends at the simplest one.

use crate::{arbitrary_seed, arbitrary_size, assert_property, parameters};
use galaxycheck::*;
use std::collections::HashSet;

fn space_of<T: Clone + 'static>(gen: &Gen<T>, parameters: GenParameters) -> Option<ExampleSpace<T>> {
    match gen.run(parameters) {
        GenIteration::Instance(instance) => Some(instance.example_space),
        _ => None,
    }
}

/// Property: every shrink of an integer is strictly closer to the origin
pub fn test_integer_shrinks_are_closer_to_origin() {
    let prop = for_all(arbitrary_seed().zip(&arbitrary_size()), |&(seed, size)| {
        let gen = Gen::int32().between(-1000, 1000).shrink_towards(7).build();
        let Some(space) = space_of(&gen, parameters(seed, size)) else {
            return false;
        };
        let root = space.current();
        space.subspace().all(|child| {
            let child = child.current();
            (child.value - 7).abs() < (root.value - 7).abs() && child.distance < root.distance
        })
    });
    assert_property("Shrinks move closer", prop);
}

/// Property: always taking the first shrink ends at the simplest list
pub fn test_greedy_shrinking_reaches_origin() {
    let prop = for_all(arbitrary_seed().zip(&arbitrary_size()), |&(seed, size)| {
        let gen = Gen::int_range(0, 100).list().with_count_between(2, 6).build();
        let Some(mut current) = space_of(&gen, parameters(seed, size)) else {
            return false;
        };

        // Prevent infinite loops
        let max_shrink_steps = 1000;
        let mut shrink_steps = 0;
        while let Some(next) = current.subspace().next() {
            current = next;
            shrink_steps += 1;
            if shrink_steps >= max_shrink_steps {
                return false;
            }
        }

        current.current().value == vec![0, 0] && current.current().distance == 0.0
    });
    assert_property("Greedy shrinking", prop);
}

/// Property: the children of a merged space never repeat an identity
pub fn test_merged_children_have_distinct_ids() {
    let prop = for_all(arbitrary_seed().zip(&arbitrary_size()), |&(seed, size)| {
        let gen = Gen::int_range(0, 3).list().with_count_between(0, 8).build();
        let Some(space) = space_of(&gen, parameters(seed, size)) else {
            return false;
        };
        let mut seen = HashSet::from([space.current().id]);
        space.subspace().all(|child| seen.insert(child.current().id))
    });
    assert_property("Distinct merged children", prop);
}
