//! Example spaces: lazily unfolded trees of progressively simpler values.

use crate::shrink::{IdentifyFn, MeasureFn, ShrinkFn};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

mod id;
pub mod render;

pub use id::ExampleId;

/// A value together with its identity and its distance from the simplest value.
#[derive(Debug, Clone, PartialEq)]
pub struct Example<T> {
    pub id: ExampleId,
    pub value: T,
    pub distance: f64,
}

impl<T> Example<T> {
    pub fn new(id: ExampleId, value: T, distance: f64) -> Self {
        Example {
            id,
            value,
            distance,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Example<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (distance {:.2})", self.value, self.distance)
    }
}

type Subspace<T> = Box<dyn Iterator<Item = ExampleSpace<T>>>;
type SubspaceFn<T> = Rc<dyn Fn() -> Subspace<T>>;
type Encountered = Rc<HashSet<ExampleId>>;

/// A node of an example space: the current example plus a lazily produced
/// sequence of simpler spaces.
///
/// Spaces can be conceptually infinite. Children are only built when the
/// subspace is pulled, and pulling the subspace twice yields the same
/// sequence, so a path of child indices identifies a node reproducibly.
pub struct ExampleSpace<T> {
    current: Example<T>,
    subspace: SubspaceFn<T>,
}

impl<T: Clone> Clone for ExampleSpace<T> {
    fn clone(&self) -> Self {
        ExampleSpace {
            current: self.current.clone(),
            subspace: self.subspace.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ExampleSpace<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExampleSpace")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

/// How a merged space combines, shrinks and measures its parts.
struct MergeStrategy<T, U> {
    merge_values: Box<dyn Fn(&[T]) -> U>,
    shrink_list: ShrinkFn<Vec<ExampleSpace<T>>>,
    measure_list: Box<dyn Fn(&[ExampleSpace<T>]) -> f64>,
}

impl<T: Clone + 'static> ExampleSpace<T> {
    /// Create a space from an example and a function producing its children.
    pub fn new<F>(current: Example<T>, subspace: F) -> Self
    where
        F: Fn() -> Subspace<T> + 'static,
    {
        ExampleSpace {
            current,
            subspace: Rc::new(subspace),
        }
    }

    /// A space with a single, simplest example and no children.
    pub fn singleton(value: T) -> Self {
        ExampleSpace::new(Example::new(ExampleId::EMPTY, value, 0.0), || {
            Box::new(std::iter::empty())
        })
    }

    pub fn current(&self) -> &Example<T> {
        &self.current
    }

    /// The children of this node, in order. Each call starts afresh.
    pub fn subspace(&self) -> Subspace<T> {
        (self.subspace)()
    }

    pub fn has_subspace(&self) -> bool {
        self.subspace().next().is_some()
    }

    /// Build a space by recursively applying `shrink` to `root`.
    ///
    /// A candidate whose identity was already encountered on the way to it
    /// (an ancestor, or an earlier sibling of it or of an ancestor) is pruned.
    /// That is the only guard against shrink functions that cycle.
    pub fn unfold(
        root: T,
        shrink: ShrinkFn<T>,
        measure: MeasureFn<T>,
        identify: IdentifyFn<T>,
    ) -> Self {
        let id = identify(&root);
        let encountered = Rc::new(HashSet::from([id]));
        unfold_helper(root, id, shrink, measure, identify, encountered)
    }

    /// Transform every value, keeping identities, distances and structure.
    pub fn map<U, F>(&self, f: F) -> ExampleSpace<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        map_space(self, Rc::new(f))
    }

    /// Remove every node whose value fails `predicate`, along with all of its
    /// descendants. Returns `None` when the root itself fails.
    pub fn filter<F>(&self, predicate: F) -> Option<Self>
    where
        F: Fn(&T) -> bool + 'static,
    {
        filter_space(self, Rc::new(predicate))
    }

    /// [`ExampleSpace::map`] and [`ExampleSpace::filter`] in one pass: nodes
    /// for which `f` returns `None` are pruned with their descendants.
    pub fn filter_map<U, F>(&self, f: F) -> Option<ExampleSpace<U>>
    where
        U: Clone + 'static,
        F: Fn(&T) -> Option<U> + 'static,
    {
        filter_map_space(self, Rc::new(f))
    }

    /// Follow a path of child indices from this node.
    pub fn navigate(&self, path: &[usize]) -> Option<Self> {
        let mut node = self.clone();
        for &index in path {
            node = node.subspace().nth(index)?;
        }
        Some(node)
    }

    /// The example at `path`, if the path stays within the space.
    pub fn navigate_example(&self, path: &[usize]) -> Option<Example<T>> {
        self.navigate(path).map(|node| node.current)
    }

    /// Combine independently generated spaces into one.
    ///
    /// Children of the merged space come from two sources, in order: lists
    /// proposed by `shrink_list` (e.g. dropping elements), then, for each
    /// position, that position's space substituted by each of its own
    /// children with the others held fixed. Candidates are deduplicated by
    /// combined identity as in [`ExampleSpace::unfold`].
    pub fn merge<U, M, D>(
        spaces: Vec<ExampleSpace<T>>,
        merge_values: M,
        shrink_list: ShrinkFn<Vec<ExampleSpace<T>>>,
        measure_list: D,
    ) -> ExampleSpace<U>
    where
        U: Clone + 'static,
        M: Fn(&[T]) -> U + 'static,
        D: Fn(&[ExampleSpace<T>]) -> f64 + 'static,
    {
        let strategy = Rc::new(MergeStrategy {
            merge_values: Box::new(merge_values),
            shrink_list,
            measure_list: Box::new(measure_list),
        });
        let id = merged_id(&spaces);
        merge_helper(spaces, id, strategy, Rc::new(HashSet::from([id])))
    }

    /// Pair two spaces. Shrinks the left side first, then the right.
    ///
    /// This is `merge` over two spaces of different types with no culling:
    /// the same per-position substitution order and the same deduplication.
    pub fn zip<U>(&self, other: &ExampleSpace<U>) -> ExampleSpace<(T, U)>
    where
        U: Clone + 'static,
    {
        let id = self.current.id.combine(other.current.id);
        zip_helper(self.clone(), other.clone(), Rc::new(HashSet::from([id])))
    }

    /// Examples of every node down to `max_depth`, breadth first.
    pub fn examples(&self, max_depth: usize) -> Vec<Example<T>> {
        let mut result = Vec::new();
        let mut queue = VecDeque::from([(self.clone(), 0usize)]);
        while let Some((node, depth)) = queue.pop_front() {
            if depth < max_depth {
                queue.extend(node.subspace().map(|child| (child, depth + 1)));
            }
            result.push(node.current);
        }
        result
    }

    /// Number of nodes down to `max_depth`.
    pub fn count_to_depth(&self, max_depth: usize) -> usize {
        self.examples(max_depth).len()
    }
}

fn unfold_helper<T: Clone + 'static>(
    value: T,
    id: ExampleId,
    shrink: ShrinkFn<T>,
    measure: MeasureFn<T>,
    identify: IdentifyFn<T>,
    encountered: Encountered,
) -> ExampleSpace<T> {
    let current = Example::new(id, value.clone(), measure(&value));
    ExampleSpace::new(current, move || {
        let mut seen = (*encountered).clone();
        let (shrink, measure, identify) = (shrink.clone(), measure.clone(), identify.clone());
        let candidates = shrink(&value);
        Box::new(candidates.filter_map(move |candidate| {
            let id = identify(&candidate);
            if !seen.insert(id) {
                return None;
            }
            Some(unfold_helper(
                candidate,
                id,
                shrink.clone(),
                measure.clone(),
                identify.clone(),
                Rc::new(seen.clone()),
            ))
        }))
    })
}

fn map_space<T, U>(space: &ExampleSpace<T>, f: Rc<dyn Fn(&T) -> U>) -> ExampleSpace<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let current = Example::new(
        space.current.id,
        f(&space.current.value),
        space.current.distance,
    );
    let subspace = space.subspace.clone();
    ExampleSpace::new(current, move || {
        let f = f.clone();
        Box::new(subspace().map(move |child| map_space(&child, f.clone())))
    })
}

fn filter_space<T>(space: &ExampleSpace<T>, predicate: Rc<dyn Fn(&T) -> bool>) -> Option<ExampleSpace<T>>
where
    T: Clone + 'static,
{
    if !predicate(&space.current.value) {
        return None;
    }
    let subspace = space.subspace.clone();
    Some(ExampleSpace::new(space.current.clone(), move || {
        let predicate = predicate.clone();
        Box::new(subspace().filter_map(move |child| filter_space(&child, predicate.clone())))
    }))
}

fn filter_map_space<T, U>(space: &ExampleSpace<T>, f: Rc<dyn Fn(&T) -> Option<U>>) -> Option<ExampleSpace<U>>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let value = f(&space.current.value)?;
    let current = Example::new(space.current.id, value, space.current.distance);
    let subspace = space.subspace.clone();
    Some(ExampleSpace::new(current, move || {
        let f = f.clone();
        Box::new(subspace().filter_map(move |child| filter_map_space(&child, f.clone())))
    }))
}

fn merged_id<T>(spaces: &[ExampleSpace<T>]) -> ExampleId {
    ExampleId::primitive(&spaces.len())
        .combine(ExampleId::combine_all(spaces.iter().map(|s| s.current.id)))
}

fn merge_helper<T, U>(
    spaces: Vec<ExampleSpace<T>>,
    id: ExampleId,
    strategy: Rc<MergeStrategy<T, U>>,
    encountered: Encountered,
) -> ExampleSpace<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let values: Vec<T> = spaces.iter().map(|s| s.current.value.clone()).collect();
    let current = Example::new(
        id,
        (strategy.merge_values)(&values),
        (strategy.measure_list)(&spaces),
    );
    ExampleSpace::new(current, move || {
        let mut seen = (*encountered).clone();
        let strategy = strategy.clone();
        let culled = (strategy.shrink_list)(&spaces);
        let substituted = substitutions(spaces.clone());
        Box::new(culled.chain(substituted).filter_map(move |candidate| {
            let id = merged_id(&candidate);
            if !seen.insert(id) {
                return None;
            }
            Some(merge_helper(candidate, id, strategy.clone(), Rc::new(seen.clone())))
        }))
    })
}

/// For each position, the list with that position replaced by each of its children.
fn substitutions<T: Clone + 'static>(
    spaces: Vec<ExampleSpace<T>>,
) -> impl Iterator<Item = Vec<ExampleSpace<T>>> {
    (0..spaces.len()).flat_map(move |index| {
        let children = spaces[index].subspace();
        let base = spaces.clone();
        children.map(move |child| {
            let mut substituted = base.clone();
            substituted[index] = child;
            substituted
        })
    })
}

fn zip_helper<T, U>(
    left: ExampleSpace<T>,
    right: ExampleSpace<U>,
    encountered: Encountered,
) -> ExampleSpace<(T, U)>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let current = Example::new(
        left.current.id.combine(right.current.id),
        (left.current.value.clone(), right.current.value.clone()),
        left.current.distance + right.current.distance,
    );
    ExampleSpace::new(current, move || {
        let mut seen = (*encountered).clone();
        let fixed_right = right.clone();
        let fixed_left = left.clone();
        let left_shrinks = left
            .subspace()
            .map(move |child| (child, fixed_right.clone()));
        let right_shrinks = right
            .subspace()
            .map(move |child| (fixed_left.clone(), child));
        Box::new(left_shrinks.chain(right_shrinks).filter_map(move |(l, r)| {
            let id = l.current.id.combine(r.current.id);
            if !seen.insert(id) {
                return None;
            }
            Some(zip_helper(l, r, Rc::new(seen.clone())))
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shrink;

    fn integer_space(value: i128) -> ExampleSpace<i128> {
        ExampleSpace::unfold(
            value,
            shrink::integer_towards(0),
            shrink::integer_distance(0, -100, 100),
            shrink::identify_hashed(),
        )
    }

    #[test]
    fn test_singleton_space() {
        let space = ExampleSpace::singleton(42);
        assert_eq!(space.current().value, 42);
        assert_eq!(space.current().distance, 0.0);
        assert_eq!(space.current().id, ExampleId::EMPTY);
        assert!(!space.has_subspace());
    }

    #[test]
    fn test_unfold_children_follow_shrinker() {
        let space = integer_space(10);
        let children: Vec<i128> = space.subspace().map(|c| c.current().value).collect();
        assert_eq!(children, vec![0, 5, 8, 9]);
        assert_eq!(space.current().distance, 10.0);
    }

    #[test]
    fn test_unfold_prunes_cycles() {
        // A shrinker that flips between two values forever.
        let space = ExampleSpace::unfold(
            1i32,
            shrink::from_fn(|&v: &i32| vec![1 - v]),
            shrink::measure_zero(),
            shrink::identify_hashed(),
        );
        assert_eq!(space.count_to_depth(50), 2);
    }

    #[test]
    fn test_unfold_prunes_earlier_siblings() {
        // Every node proposes 0 and 1; once a sibling produced them they are
        // never proposed again further down.
        let space = ExampleSpace::unfold(
            5i32,
            shrink::from_fn(|&v: &i32| if v > 1 { vec![0, 1, v - 1] } else { vec![0, 1] }),
            shrink::measure_zero(),
            shrink::identify_hashed(),
        );
        let four = space.navigate(&[2]).map(|n| n.current().value);
        assert_eq!(four, Some(4));
        let grandchildren: Vec<i32> = space
            .navigate(&[2])
            .map(|n| n.subspace().map(|c| c.current().value).collect())
            .unwrap_or_default();
        assert_eq!(grandchildren, vec![3]);
    }

    #[test]
    fn test_subspace_is_repeatable() {
        let space = integer_space(37);
        let first: Vec<i128> = space.subspace().map(|c| c.current().value).collect();
        let second: Vec<i128> = space.subspace().map(|c| c.current().value).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_infinite_space_is_lazy() {
        let space = ExampleSpace::unfold(
            0u64,
            shrink::from_fn(|&v: &u64| vec![v + 1, v + 2]),
            shrink::measure_zero(),
            shrink::identify_hashed(),
        );
        let deep = space.navigate(&[0; 1000]).map(|n| n.current().value);
        assert_eq!(deep, Some(1000));
    }

    #[test]
    fn test_map_preserves_structure() {
        let space = integer_space(10);
        let mapped = space.map(|v| format!("#{v}"));
        assert_eq!(mapped.current().value, "#10");
        assert_eq!(mapped.current().id, space.current().id);
        let children: Vec<String> = mapped.subspace().map(|c| c.current().value.clone()).collect();
        assert_eq!(children, vec!["#0", "#5", "#8", "#9"]);
    }

    #[test]
    fn test_filter_drops_subtrees() {
        let space = integer_space(10);
        assert!(space.filter(|v| *v > 20).is_none());

        let filtered = space.filter(|v| v % 2 == 0).map(|s| {
            s.subspace().map(|c| c.current().value).collect::<Vec<_>>()
        });
        assert_eq!(filtered, Some(vec![0, 8]));
    }

    #[test]
    fn test_navigate() {
        let space = integer_space(10);
        assert_eq!(space.navigate_example(&[]).map(|e| e.value), Some(10));
        assert_eq!(space.navigate_example(&[1]).map(|e| e.value), Some(5));
        assert_eq!(space.navigate_example(&[1, 0]).map(|e| e.value), Some(3));
        assert!(space.navigate(&[0, 0]).is_none());
        assert!(space.navigate(&[17]).is_none());
    }

    #[test]
    fn test_merge_siblings_have_distinct_ids() {
        let spaces = vec![integer_space(6), integer_space(6)];
        let merged = ExampleSpace::merge(
            spaces,
            |values: &[i128]| values.to_vec(),
            shrink::none(),
            |spaces: &[ExampleSpace<i128>]| spaces.iter().map(|s| s.current().distance).sum(),
        );
        assert_eq!(merged.current().value, vec![6, 6]);

        let mut queue = VecDeque::from([(merged, 0)]);
        while let Some((node, depth)) = queue.pop_front() {
            let children: Vec<ExampleSpace<Vec<i128>>> = node.subspace().collect();
            let ids: HashSet<ExampleId> = children.iter().map(|c| c.current().id).collect();
            assert_eq!(ids.len(), children.len());
            if depth < 3 {
                queue.extend(children.into_iter().map(|c| (c, depth + 1)));
            }
        }
    }

    #[test]
    fn test_merge_culls_then_substitutes() {
        let spaces = vec![integer_space(2), integer_space(3)];
        let merged = ExampleSpace::merge(
            spaces,
            |values: &[i128]| values.to_vec(),
            shrink::from_fn(|spaces: &Vec<ExampleSpace<i128>>| vec![spaces[..1].to_vec()]),
            |spaces: &[ExampleSpace<i128>]| spaces.len() as f64,
        );
        let children: Vec<Vec<i128>> = merged.subspace().map(|c| c.current().value.clone()).collect();
        assert_eq!(children, vec![vec![2], vec![0, 3], vec![1, 3], vec![2, 0], vec![2, 2]]);
        assert_eq!(merged.current().distance, 2.0);
    }

    #[test]
    fn test_zip_shrinks_left_then_right() {
        let zipped = integer_space(2).zip(&integer_space(1));
        assert_eq!(zipped.current().value, (2, 1));
        let children: Vec<(i128, i128)> = zipped.subspace().map(|c| c.current().value).collect();
        assert_eq!(children, vec![(0, 1), (1, 1), (2, 0)]);
        assert_eq!(zipped.current().distance, 3.0);
    }

    #[test]
    fn test_zip_matches_merge_without_culling() {
        let zipped = integer_space(6).zip(&integer_space(3));
        let merged = ExampleSpace::merge(
            vec![integer_space(6), integer_space(3)],
            |values: &[i128]| values.to_vec(),
            shrink::none(),
            |spaces: &[ExampleSpace<i128>]| spaces.iter().map(|s| s.current().distance).sum(),
        );
        let from_zip: Vec<(Vec<i128>, f64)> = zipped
            .examples(3)
            .into_iter()
            .map(|e| (vec![e.value.0, e.value.1], e.distance))
            .collect();
        let from_merge: Vec<(Vec<i128>, f64)> =
            merged.examples(3).into_iter().map(|e| (e.value, e.distance)).collect();
        assert_eq!(from_zip, from_merge);
    }

    #[test]
    fn test_examples_breadth_first() {
        let space = integer_space(4);
        let values: Vec<i128> = space.examples(2).into_iter().map(|e| e.value).collect();
        assert_eq!(values, vec![4, 0, 2, 3, 1]);
    }
}
