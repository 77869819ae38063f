//! Exploration: the shrink search over an example space.
//!
//! Starting from a failing root, children are tested in order and the search
//! descends into the first failing child, never returning to its siblings.
//! The walk is iterative, so arbitrarily deep spaces cannot overflow the
//! stack.

use crate::property::Outcome;
use crate::space::ExampleSpace;
use std::rc::Rc;

/// One step of an exploration.
#[derive(Debug, Clone)]
pub enum ExplorationStage<T> {
    NonCounterexample {
        example_space: ExampleSpace<T>,
        path: Vec<usize>,
    },
    Counterexample {
        example_space: ExampleSpace<T>,
        path: Vec<usize>,
        exception: Option<String>,
    },
    Discard,
}

impl<T> ExplorationStage<T> {
    pub fn is_counterexample(&self) -> bool {
        matches!(self, ExplorationStage::Counterexample { .. })
    }
}

enum State<T> {
    Root(ExampleSpace<T>, Vec<usize>),
    Shrinking {
        children: Box<dyn Iterator<Item = ExampleSpace<T>>>,
        path: Vec<usize>,
        index: usize,
    },
    Done,
}

/// Lazy sequence of exploration stages.
pub struct Exploration<T> {
    test: Rc<dyn Fn(&T) -> Outcome>,
    state: State<T>,
}

/// Explore `example_space` from its root.
pub fn explore<T: Clone + 'static>(
    example_space: ExampleSpace<T>,
    test: Rc<dyn Fn(&T) -> Outcome>,
) -> Exploration<T> {
    explore_at(example_space, test, Vec::new())
}

/// Explore a node reached by `base_path`; stage paths continue from it.
pub fn explore_at<T: Clone + 'static>(
    example_space: ExampleSpace<T>,
    test: Rc<dyn Fn(&T) -> Outcome>,
    base_path: Vec<usize>,
) -> Exploration<T> {
    Exploration {
        test,
        state: State::Root(example_space, base_path),
    }
}

impl<T: Clone + 'static> Iterator for Exploration<T> {
    type Item = ExplorationStage<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Done => None,
            State::Root(example_space, path) => {
                let outcome = (self.test)(&example_space.current().value);
                tracing::trace!(?path, "explored root");
                Some(match outcome {
                    Outcome::Pass => ExplorationStage::NonCounterexample {
                        example_space,
                        path,
                    },
                    Outcome::Discard => ExplorationStage::Discard,
                    Outcome::Fail(exception) => {
                        self.state = State::Shrinking {
                            children: example_space.subspace(),
                            path: path.clone(),
                            index: 0,
                        };
                        ExplorationStage::Counterexample {
                            example_space,
                            path,
                            exception,
                        }
                    }
                })
            }
            State::Shrinking {
                mut children,
                path,
                index,
            } => {
                let child = children.next()?;
                let mut child_path = path.clone();
                child_path.push(index);
                let outcome = (self.test)(&child.current().value);
                tracing::trace!(path = ?child_path, fail = outcome.is_fail(), "explored shrink");
                Some(match outcome {
                    Outcome::Fail(exception) => {
                        self.state = State::Shrinking {
                            children: child.subspace(),
                            path: child_path.clone(),
                            index: 0,
                        };
                        ExplorationStage::Counterexample {
                            example_space: child,
                            path: child_path,
                            exception,
                        }
                    }
                    Outcome::Pass => {
                        self.state = State::Shrinking {
                            children,
                            path,
                            index: index + 1,
                        };
                        ExplorationStage::NonCounterexample {
                            example_space: child,
                            path: child_path,
                        }
                    }
                    Outcome::Discard => {
                        self.state = State::Shrinking {
                            children,
                            path,
                            index: index + 1,
                        };
                        ExplorationStage::Discard
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shrink;

    fn integer_space(value: i128) -> ExampleSpace<i128> {
        ExampleSpace::unfold(
            value,
            shrink::integer_towards(0),
            shrink::integer_distance(0, 0, 100),
            shrink::identify_hashed(),
        )
    }

    fn test_fn(f: impl Fn(&i128) -> Outcome + 'static) -> Rc<dyn Fn(&i128) -> Outcome> {
        Rc::new(f)
    }

    fn last_counterexample(stages: Vec<ExplorationStage<i128>>) -> Option<(i128, Vec<usize>)> {
        stages.into_iter().rev().find_map(|stage| match stage {
            ExplorationStage::Counterexample {
                example_space,
                path,
                ..
            } => Some((example_space.current().value, path)),
            _ => None,
        })
    }

    #[test]
    fn test_passing_root_is_a_single_stage() {
        let stages: Vec<_> = explore(integer_space(10), test_fn(|_| Outcome::Pass)).collect();
        assert_eq!(stages.len(), 1);
        assert!(!stages[0].is_counterexample());
    }

    #[test]
    fn test_discarded_root() {
        let stages: Vec<_> = explore(integer_space(10), test_fn(|_| Outcome::Discard)).collect();
        assert!(matches!(stages.as_slice(), [ExplorationStage::Discard]));
    }

    #[test]
    fn test_converges_on_boundary() {
        let test = test_fn(|&x| if x < 50 { Outcome::Pass } else { Outcome::Fail(None) });
        let stages: Vec<_> = explore(integer_space(97), test).collect();
        let (value, path) = last_counterexample(stages).unwrap_or_default();
        assert_eq!(value, 50);

        let replayed = integer_space(97).navigate_example(&path).map(|e| e.value);
        assert_eq!(replayed, Some(50));
    }

    #[test]
    fn test_stops_at_first_failing_child() {
        // Root 10 has children 0, 5, 8, 9. Every value fails, so the search
        // dives into 0 at once and never evaluates 5, 8 or 9.
        let stages: Vec<_> = explore(integer_space(10), test_fn(|_| Outcome::Fail(None))).collect();
        assert_eq!(stages.len(), 2);
        assert_eq!(last_counterexample(stages), Some((0, vec![0])));
    }

    #[test]
    fn test_carries_exception() {
        let test = test_fn(|&x| Outcome::Fail(Some(format!("bad {x}"))));
        let stages: Vec<_> = explore(integer_space(3), test).collect();
        match stages.last() {
            Some(ExplorationStage::Counterexample { exception, .. }) => {
                assert_eq!(exception.as_deref(), Some("bad 0"));
            }
            other => panic!("Expected counterexample, got: {other:?}"),
        }
    }

    #[test]
    fn test_base_path_prefixes_stage_paths() {
        let space = integer_space(10);
        let node = space.navigate(&[3]).map(|n| (n.current().value, n));
        let (value, node) = node.unwrap_or_else(|| panic!("missing node"));
        assert_eq!(value, 9);
        let stages: Vec<_> =
            explore_at(node, test_fn(|_| Outcome::Fail(None)), vec![3]).take(2).collect();
        let paths: Vec<Vec<usize>> = stages
            .into_iter()
            .filter_map(|stage| match stage {
                ExplorationStage::Counterexample { path, .. } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(paths, vec![vec![3], vec![3, 0]]);
        assert_eq!(space.navigate_example(&[3, 0]).map(|e| e.value), Some(7));
    }
}
