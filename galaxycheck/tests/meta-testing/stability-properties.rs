//! Stability properties
//!
//! Members of a composite generator drawing from forks of a shared waypoint
//! must not be disturbed by how much randomness their siblings consume.

use crate::{arbitrary_seed, arbitrary_size, assert_property, parameters};
use galaxycheck::*;

fn member<T: Clone + 'static>(gen: Gen<T>) -> Gen<T> {
    gen.reference_rng_waypoint(|rng| rng.fork())
}

fn root_value<T: Clone + 'static>(gen: &Gen<T>, parameters: GenParameters) -> Option<T> {
    match gen.run(parameters) {
        GenIteration::Instance(instance) => Some(instance.example_space.current().value.clone()),
        _ => None,
    }
}

/// Property: replacing the first member does not change the second
pub fn test_waypoint_isolates_members() {
    let prop = for_all(arbitrary_seed().zip(&arbitrary_size()), |&(seed, size)| {
        let second = member(Gen::int32().between(-10_000, 10_000).build());
        let greedy = member(Gen::int_range(0, 100).list().build()).map(|xs| xs.len() as i32);
        let frugal = member(Gen::constant(0));

        let with_greedy = greedy.zip(&second).set_rng_waypoint();
        let with_frugal = frugal.zip(&second).set_rng_waypoint();

        let a = root_value(&with_greedy, parameters(seed, size));
        let b = root_value(&with_frugal, parameters(seed, size));
        match (a, b) {
            (Some((_, a)), Some((_, b))) => a == b,
            _ => false,
        }
    });
    assert_property("Waypoint stability", prop);
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Order {
    items: Vec<u8>,
    quantity: i32,
    express: bool,
}

impl Describe for Order {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Order>(TypeShape::Settable(
            Settable::new::<Order>()
                .with_member("items", |o: &mut Order, v| o.items = v)
                .with_member("quantity", |o: &mut Order, v| o.quantity = v)
                .with_member("express", |o: &mut Order, v| o.express = v),
        ))
    }
}

/// Property: overriding one member of a resolved type leaves the others as
/// they were
pub fn test_resolver_override_isolates_members() {
    let plain = GenFactory::default().create::<Order>();
    let overridden = GenFactory::default()
        .override_member("$.items", Gen::constant(vec![1u8, 2, 3]))
        .create::<Order>();

    let prop = for_all(arbitrary_seed().zip(&arbitrary_size()), move |&(seed, size)| {
        let a = root_value(&plain, parameters(seed, size));
        let b = root_value(&overridden, parameters(seed, size));
        match (a, b) {
            (Some(a), Some(b)) => {
                b.items == vec![1, 2, 3] && a.quantity == b.quantity && a.express == b.express
            }
            _ => false,
        }
    });
    assert_property("Resolver stability", prop);
}
