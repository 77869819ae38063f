//! The check state machine.
//!
//! Each transition consumes the current state and context and produces the
//! next pair. Generation pulls one iteration at a time, exploration pulls one
//! stage at a time, so a check can stop between any two steps.

use crate::data::{Config, GenParameters};
use crate::error::{GalaxyError, Result};
use crate::explore::{explore, explore_at, ExplorationStage};
use crate::gen::{GenDiscard, GenError, GenErrorKind, GenInstance, GenIteration};
use crate::property::Property;
use crate::replay::Replay;
use crate::space::{ExampleId, ExampleSpace};
use std::fmt;

/// Number of most recent counterexamples that must share an id before the
/// search is considered converged.
const CONVERGENCE_WINDOW: usize = 3;

/// Why a check stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    IsReplay,
    DeepCheckDisabled,
    ReachedMaximumIterations,
    ReachedShrinkLimit,
    ReachedMaximumSize,
    FoundTheoreticalSmallestCounterexample,
    FoundPragmaticSmallestCounterexample,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminationReason::IsReplay => "replay finished",
            TerminationReason::DeepCheckDisabled => "deep check disabled",
            TerminationReason::ReachedMaximumIterations => "reached maximum iterations",
            TerminationReason::ReachedShrinkLimit => "reached shrink limit",
            TerminationReason::ReachedMaximumSize => "reached maximum size",
            TerminationReason::FoundTheoreticalSmallestCounterexample => {
                "found theoretical smallest counterexample"
            }
            TerminationReason::FoundPragmaticSmallestCounterexample => {
                "found pragmatic smallest counterexample"
            }
        };
        f.write_str(text)
    }
}

/// A counterexample together with how to reproduce it.
#[derive(Debug, Clone)]
pub(crate) struct CounterexampleContext<T> {
    pub example_space: ExampleSpace<T>,
    pub replay_parameters: GenParameters,
    pub replay_path: Vec<usize>,
    pub exception: Option<String>,
}

impl<T: Clone + 'static> CounterexampleContext<T> {
    fn id(&self) -> ExampleId {
        self.example_space.current().id
    }

    fn distance(&self) -> f64 {
        self.example_space.current().distance
    }

    fn size(&self) -> usize {
        self.replay_parameters.size.get()
    }

    /// Smaller distance wins; on a tie, the counterexample found at the
    /// larger size.
    fn is_better_than(&self, other: &Self) -> bool {
        self.distance() < other.distance()
            || (self.distance() == other.distance() && self.size() > other.size())
    }
}

/// Counters and settings threaded through every transition.
#[derive(Debug, Clone)]
pub(crate) struct CheckStateContext<T> {
    pub requested_iterations: usize,
    pub shrink_limit: usize,
    pub deep_check: bool,
    pub is_replay: bool,
    pub discard_limit: usize,
    pub completed_iterations: usize,
    pub discards: usize,
    pub consecutive_discards: usize,
    pub shrinks: usize,
    /// Most recent first.
    pub counterexample_history: Vec<CounterexampleContext<T>>,
    pub initial_parameters: GenParameters,
    pub next_parameters: GenParameters,
}

impl<T: Clone + 'static> CheckStateContext<T> {
    pub fn new(config: &Config, initial_parameters: GenParameters) -> Self {
        CheckStateContext {
            requested_iterations: config.iterations,
            shrink_limit: config.shrink_limit,
            deep_check: config.deep_check,
            is_replay: config.replay.is_some(),
            discard_limit: config.discard_limit,
            completed_iterations: 0,
            discards: 0,
            consecutive_discards: 0,
            shrinks: 0,
            counterexample_history: Vec::new(),
            initial_parameters,
            next_parameters: initial_parameters,
        }
    }

    pub fn best_counterexample(&self) -> Option<&CounterexampleContext<T>> {
        self.counterexample_history
            .iter()
            .fold(None, |best: Option<&CounterexampleContext<T>>, candidate| match best {
                Some(best) if !candidate.is_better_than(best) => Some(best),
                _ => Some(candidate),
            })
    }

    fn increment_completed_iterations(self) -> Self {
        CheckStateContext {
            completed_iterations: self.completed_iterations + 1,
            ..self
        }
    }

    fn increment_discards(self) -> Self {
        CheckStateContext {
            discards: self.discards + 1,
            consecutive_discards: self.consecutive_discards + 1,
            ..self
        }
    }

    fn reset_consecutive_discards(self) -> Self {
        CheckStateContext {
            consecutive_discards: 0,
            ..self
        }
    }

    fn increment_shrinks(self) -> Self {
        CheckStateContext {
            shrinks: self.shrinks + 1,
            ..self
        }
    }

    fn with_next_parameters(self, next_parameters: GenParameters) -> Self {
        CheckStateContext {
            next_parameters,
            ..self
        }
    }

    fn add_counterexample(mut self, counterexample: CounterexampleContext<T>) -> Self {
        self.counterexample_history.insert(0, counterexample);
        self
    }

    /// The last few counterexamples are all the same example.
    fn has_converged(&self) -> bool {
        let recent = &self.counterexample_history;
        recent.len() >= CONVERGENCE_WINDOW
            && recent[..CONVERGENCE_WINDOW]
                .iter()
                .all(|counterexample| counterexample.id() == recent[0].id())
    }
}

/// The exploration of one instance, in progress.
pub(crate) struct ExplorationInProgress<T> {
    instance: GenInstance<T>,
    stages: Box<dyn Iterator<Item = ExplorationStage<T>>>,
    counterexample: Option<CounterexampleContext<T>>,
    is_first: bool,
}

pub(crate) enum CheckState<T> {
    GenerationBegin,
    GenerationHoldingNextIteration(GenIteration<T>),
    GenerationInstance(GenInstance<T>),
    GenerationDiscard(GenDiscard),
    GenerationError(GenError),
    InstanceExplorationBegin(GenInstance<T>),
    InstanceExplorationHoldingNextStage(ExplorationInProgress<T>),
    InstanceExplorationCounterexample {
        progress: ExplorationInProgress<T>,
        example_space: ExampleSpace<T>,
        path: Vec<usize>,
        exception: Option<String>,
    },
    InstanceExplorationNonCounterexample(ExplorationInProgress<T>),
    InstanceExplorationEnd(ExplorationInProgress<T>),
    GenerationEnd {
        instance: GenInstance<T>,
        counterexample: Option<CounterexampleContext<T>>,
    },
    Replay(String),
    Termination(TerminationReason),
}

type Transition<T> = Result<(CheckState<T>, CheckStateContext<T>)>;

impl<T: Clone + 'static> CheckState<T> {
    pub fn name(&self) -> &'static str {
        match self {
            CheckState::GenerationBegin => "Generation_Begin",
            CheckState::GenerationHoldingNextIteration(_) => "Generation_HoldingNextIteration",
            CheckState::GenerationInstance(_) => "Generation_Instance",
            CheckState::GenerationDiscard(_) => "Generation_Discard",
            CheckState::GenerationError(_) => "Generation_Error",
            CheckState::InstanceExplorationBegin(_) => "InstanceExploration_Begin",
            CheckState::InstanceExplorationHoldingNextStage(_) => {
                "InstanceExploration_HoldingNextExplorationStage"
            }
            CheckState::InstanceExplorationCounterexample { .. } => "InstanceExploration_Counterexample",
            CheckState::InstanceExplorationNonCounterexample(_) => {
                "InstanceExploration_NonCounterexample"
            }
            CheckState::InstanceExplorationEnd(_) => "InstanceExploration_End",
            CheckState::GenerationEnd { .. } => "Generation_End",
            CheckState::Replay(_) => "Replay",
            CheckState::Termination(_) => "Termination",
        }
    }

    pub fn transition(self, property: &Property<T>, context: CheckStateContext<T>) -> Transition<T> {
        match self {
            CheckState::GenerationBegin => generation_begin(property, context),
            CheckState::GenerationHoldingNextIteration(iteration) => {
                let state = match iteration {
                    GenIteration::Instance(instance) => CheckState::GenerationInstance(instance),
                    GenIteration::Discard(discard) => CheckState::GenerationDiscard(discard),
                    GenIteration::Error(error) => CheckState::GenerationError(error),
                };
                Ok((state, context))
            }
            CheckState::GenerationInstance(instance) => Ok((
                CheckState::InstanceExplorationBegin(instance),
                context.reset_consecutive_discards(),
            )),
            CheckState::GenerationDiscard(discard) => generation_discard(discard, context),
            CheckState::GenerationError(error) => Err(generation_error(error)),
            CheckState::InstanceExplorationBegin(instance) => {
                let stages = explore(instance.example_space.clone(), property.test_fn());
                let progress = ExplorationInProgress {
                    instance,
                    stages: Box::new(stages),
                    counterexample: None,
                    is_first: true,
                };
                Ok((CheckState::InstanceExplorationHoldingNextStage(progress), context))
            }
            CheckState::InstanceExplorationHoldingNextStage(progress) => {
                holding_next_stage(progress, context)
            }
            CheckState::InstanceExplorationCounterexample {
                mut progress,
                example_space,
                path,
                exception,
            } => {
                tracing::debug!(
                    distance = example_space.current().distance,
                    ?path,
                    size = progress.instance.replay_parameters.size.get(),
                    "found counterexample"
                );
                progress.counterexample = Some(CounterexampleContext {
                    example_space,
                    replay_parameters: progress.instance.replay_parameters,
                    replay_path: path,
                    exception,
                });
                Ok((CheckState::InstanceExplorationHoldingNextStage(progress), context))
            }
            CheckState::InstanceExplorationNonCounterexample(progress) => {
                Ok((CheckState::InstanceExplorationHoldingNextStage(progress), context))
            }
            CheckState::InstanceExplorationEnd(progress) => Ok((
                CheckState::GenerationEnd {
                    instance: progress.instance,
                    counterexample: progress.counterexample,
                },
                context,
            )),
            CheckState::GenerationEnd {
                instance,
                counterexample,
            } => generation_end(instance, counterexample, context),
            CheckState::Replay(token) => replay(&token, property, context),
            CheckState::Termination(reason) => Ok((CheckState::Termination(reason), context)),
        }
    }
}

fn generation_begin<T: Clone + 'static>(property: &Property<T>, context: CheckStateContext<T>) -> Transition<T> {
    if context.completed_iterations >= context.requested_iterations {
        return Ok((
            CheckState::Termination(TerminationReason::ReachedMaximumIterations),
            context,
        ));
    }
    let iteration = property.gen().run(context.next_parameters);
    Ok((CheckState::GenerationHoldingNextIteration(iteration), context))
}

fn generation_discard<T: Clone + 'static>(discard: GenDiscard, context: CheckStateContext<T>) -> Transition<T> {
    let context = context.increment_discards();
    if context.is_replay {
        return Ok((CheckState::Termination(TerminationReason::IsReplay), context));
    }
    if context.consecutive_discards >= context.discard_limit {
        tracing::warn!(
            discards = context.consecutive_discards,
            "giving up after too many consecutive discards"
        );
        return Err(GalaxyError::Exhausted {
            discards: context.consecutive_discards,
        });
    }
    let next_parameters = discard
        .next_parameters
        .with_size(discard.replay_parameters.size.increment());
    Ok((CheckState::GenerationBegin, context.with_next_parameters(next_parameters)))
}

fn generation_error(error: GenError) -> GalaxyError {
    if let GenErrorKind::Exhausted { discards } = error.kind {
        tracing::warn!(discards, gen_name = %error.gen_name, "nested generator exhausted");
    }
    GalaxyError::from(error)
}

fn holding_next_stage<T: Clone + 'static>(
    mut progress: ExplorationInProgress<T>,
    context: CheckStateContext<T>,
) -> Transition<T> {
    if !progress.is_first && context.shrinks >= context.shrink_limit {
        return Ok((CheckState::InstanceExplorationEnd(progress), context));
    }

    let stage = match progress.stages.next() {
        Some(stage) => stage,
        None => return Ok((CheckState::InstanceExplorationEnd(progress), context)),
    };

    let was_first = progress.is_first;
    progress.is_first = false;
    let context = if was_first {
        context
    } else {
        context.increment_shrinks()
    };

    let state = match stage {
        ExplorationStage::Counterexample {
            example_space,
            path,
            exception,
        } => CheckState::InstanceExplorationCounterexample {
            progress,
            example_space,
            path,
            exception,
        },
        ExplorationStage::NonCounterexample { .. } => {
            CheckState::InstanceExplorationNonCounterexample(progress)
        }
        // The instance itself was discarded by the test function.
        ExplorationStage::Discard if was_first => CheckState::GenerationDiscard(GenDiscard {
            replay_parameters: progress.instance.replay_parameters,
            next_parameters: progress.instance.next_parameters,
        }),
        ExplorationStage::Discard => CheckState::InstanceExplorationHoldingNextStage(progress),
    };
    Ok((state, context))
}

fn generation_end<T: Clone + 'static>(
    instance: GenInstance<T>,
    counterexample: Option<CounterexampleContext<T>>,
    context: CheckStateContext<T>,
) -> Transition<T> {
    let context = context.increment_completed_iterations();
    let replay_size = instance.replay_parameters.size;

    let counterexample = match counterexample {
        Some(counterexample) => counterexample,
        None => {
            if context.is_replay {
                return Ok((CheckState::Termination(TerminationReason::IsReplay), context));
            }
            let next_parameters = instance.next_parameters.with_size(replay_size.increment());
            return Ok((CheckState::GenerationBegin, context.with_next_parameters(next_parameters)));
        }
    };

    let distance = counterexample.distance();
    let context = context.add_counterexample(counterexample);

    let reason = if context.is_replay {
        Some(TerminationReason::IsReplay)
    } else if !context.deep_check {
        Some(TerminationReason::DeepCheckDisabled)
    } else if context.completed_iterations >= context.requested_iterations {
        Some(TerminationReason::ReachedMaximumIterations)
    } else if context.shrinks >= context.shrink_limit {
        Some(TerminationReason::ReachedShrinkLimit)
    } else if replay_size.is_max() {
        Some(TerminationReason::ReachedMaximumSize)
    } else if distance == 0.0 {
        Some(TerminationReason::FoundTheoreticalSmallestCounterexample)
    } else if context.has_converged() {
        Some(TerminationReason::FoundPragmaticSmallestCounterexample)
    } else {
        None
    };

    match reason {
        Some(reason) => Ok((CheckState::Termination(reason), context)),
        None => {
            let next_parameters = instance.next_parameters.with_size(replay_size.big_increment());
            Ok((CheckState::GenerationBegin, context.with_next_parameters(next_parameters)))
        }
    }
}

const STALE_REPLAY_HINT: &str =
    "The replay value may be stale: remove it from the configuration and run again.";

fn replay<T: Clone + 'static>(token: &str, property: &Property<T>, context: CheckStateContext<T>) -> Transition<T> {
    let replay = match Replay::decode(token) {
        Ok(replay) => replay,
        Err(error) => {
            let parameters = context.next_parameters;
            return Ok((
                CheckState::GenerationError(replay_error(
                    format!("Error decoding replay string: {error}. {STALE_REPLAY_HINT}"),
                    parameters,
                )),
                context,
            ));
        }
    };

    let parameters = replay.parameters;
    let context = CheckStateContext {
        initial_parameters: parameters,
        next_parameters: parameters,
        ..context
    };

    let instance = match property.gen().run(parameters) {
        GenIteration::Instance(instance) => instance,
        other => return Ok((CheckState::GenerationHoldingNextIteration(other), context)),
    };

    let node = match instance.example_space.navigate(&replay.path) {
        Some(node) => node,
        None => {
            return Ok((
                CheckState::GenerationError(replay_error(
                    format!(
                        "Error replaying example: path {:?} does not exist in the generated example space. {STALE_REPLAY_HINT}",
                        replay.path
                    ),
                    parameters,
                )),
                context,
            ));
        }
    };

    let stages = explore_at(node, property.test_fn(), replay.path).take(1);
    let progress = ExplorationInProgress {
        instance,
        stages: Box::new(stages),
        counterexample: None,
        is_first: true,
    };
    Ok((CheckState::InstanceExplorationHoldingNextStage(progress), context))
}

fn replay_error(message: String, parameters: GenParameters) -> GenError {
    GenError {
        gen_name: "Replay".to_string(),
        message,
        kind: GenErrorKind::Configuration,
        replay_parameters: parameters,
        next_parameters: parameters,
    }
}
