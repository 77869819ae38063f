//! Shrink, measure and identify functions.
//!
//! A shrink function proposes simpler candidates for a value, a measure
//! function reports how far a value is from the simplest one, and an identify
//! function gives the structural identity used to prune duplicates while an
//! example space is unfolded.

use crate::space::ExampleId;
use std::hash::Hash;
use std::rc::Rc;

/// Proposes simpler candidates for a value, most aggressive first.
pub type ShrinkFn<T> = Rc<dyn Fn(&T) -> Box<dyn Iterator<Item = T>>>;

/// Distance of a value from the simplest value (0).
pub type MeasureFn<T> = Rc<dyn Fn(&T) -> f64>;

/// Structural identity of a value.
pub type IdentifyFn<T> = Rc<dyn Fn(&T) -> ExampleId>;

/// A shrinker that never proposes anything.
pub fn none<T: 'static>() -> ShrinkFn<T> {
    Rc::new(|_: &T| -> Box<dyn Iterator<Item = T>> { Box::new(std::iter::empty()) })
}

/// A shrinker from a closure returning a vector of candidates.
pub fn from_fn<T, F>(f: F) -> ShrinkFn<T>
where
    T: 'static,
    F: Fn(&T) -> Vec<T> + 'static,
{
    Rc::new(move |value: &T| -> Box<dyn Iterator<Item = T>> { Box::new(f(value).into_iter()) })
}

/// Candidates moving `value` towards `origin`: the origin itself, then points
/// halving the remaining distance, ending one step away from `value`.
///
/// Because the final candidate is always adjacent to `value`, repeatedly
/// taking the first failing candidate converges on the exact boundary of a
/// monotone predicate.
pub fn towards(origin: i128, value: i128) -> Vec<i128> {
    if origin == value {
        return Vec::new();
    }

    let diff = value - origin;
    let mut candidates = vec![origin];
    let mut half = diff / 2;
    while half != 0 {
        candidates.push(value - half);
        half /= 2;
    }
    candidates
}

/// Integer shrinker towards a fixed origin.
pub fn integer_towards(origin: i128) -> ShrinkFn<i128> {
    Rc::new(move |value: &i128| -> Box<dyn Iterator<Item = i128>> {
        Box::new(towards(origin, *value).into_iter())
    })
}

/// Integer measure: distance from the origin as a percentage of the widest
/// extent of `[min, max]` from that origin.
pub fn integer_distance(origin: i128, min: i128, max: i128) -> MeasureFn<i128> {
    let extent = (origin - min).max(max - origin);
    Rc::new(move |value: &i128| {
        if extent == 0 {
            0.0
        } else {
            (*value - origin).abs() as f64 * 100.0 / extent as f64
        }
    })
}

/// Identity by hashing the value.
pub fn identify_hashed<T: Hash + 'static>() -> IdentifyFn<T> {
    Rc::new(|value: &T| ExampleId::primitive(value))
}

/// Measure that treats every value as already simplest.
pub fn measure_zero<T: 'static>() -> MeasureFn<T> {
    Rc::new(|_: &T| 0.0)
}

/// Shrinks a list by removing chunks while staying at or above `min_count`.
///
/// Chunk sizes start at everything removable and halve down to single
/// elements, so short lists are proposed before single-element removals.
pub fn cull<T: Clone + 'static>(min_count: usize) -> ShrinkFn<Vec<T>> {
    Rc::new(move |items: &Vec<T>| -> Box<dyn Iterator<Item = Vec<T>>> {
        let items = items.clone();
        let len = items.len();
        let removable = len.saturating_sub(min_count);
        let chunk_sizes = halves(removable);
        Box::new(chunk_sizes.into_iter().flat_map(move |chunk| {
            let items = items.clone();
            (0..=len - chunk).step_by(chunk).map(move |start| {
                let mut culled = Vec::with_capacity(len - chunk);
                culled.extend_from_slice(&items[..start]);
                culled.extend_from_slice(&items[start + chunk..]);
                culled
            })
        }))
    })
}

/// `n, n/2, n/4, ..., 1`.
fn halves(n: usize) -> Vec<usize> {
    let mut result = Vec::new();
    let mut current = n;
    while current > 0 {
        result.push(current);
        current /= 2;
    }
    result
}

/// Measure of a count within `[min_count, max_count]`, as a percentage.
pub fn count_distance(count: usize, min_count: usize, max_count: usize) -> f64 {
    if max_count <= min_count {
        0.0
    } else {
        count.saturating_sub(min_count) as f64 * 100.0 / (max_count - min_count) as f64
    }
}
