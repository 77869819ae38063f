//! Checking properties: drives the check state machine to termination and
//! reports the best counterexample found.

use crate::data::{Config, GenParameters};
use crate::error::Result;
use crate::property::Property;
use crate::replay::Replay;
use crate::space::ExampleId;
use std::fmt;

mod state;

pub use state::TerminationReason;
use state::{CheckState, CheckStateContext};

/// The smallest counterexample a check found.
#[derive(Debug, Clone)]
pub struct Counterexample<T> {
    pub id: ExampleId,
    pub value: T,
    pub distance: f64,
    pub replay_parameters: GenParameters,
    pub replay_path: Vec<usize>,
    /// Token reproducing this counterexample via [`Config::with_replay`].
    pub replay: String,
    /// Failure message of the test function, if it gave one.
    pub exception: Option<String>,
}

/// Outcome of checking a property.
#[derive(Debug, Clone)]
pub struct CheckResult<T> {
    pub iterations: usize,
    pub discards: usize,
    pub shrinks: usize,
    pub counterexample: Option<Counterexample<T>>,
    pub termination_reason: TerminationReason,
    pub initial_parameters: GenParameters,
    pub next_parameters: GenParameters,
    pub deep_check: bool,
}

impl<T> CheckResult<T> {
    pub fn falsified(&self) -> bool {
        self.counterexample.is_some()
    }
}

impl<T: Clone + 'static> CheckResult<T> {
    fn from_context(context: CheckStateContext<T>, termination_reason: TerminationReason) -> Self {
        let counterexample = context.best_counterexample().map(|best| {
            let current = best.example_space.current();
            Counterexample {
                id: current.id,
                value: current.value.clone(),
                distance: current.distance,
                replay_parameters: best.replay_parameters,
                replay_path: best.replay_path.clone(),
                replay: Replay::new(best.replay_parameters, best.replay_path.clone()).encode(),
                exception: best.exception.clone(),
            }
        });
        CheckResult {
            iterations: context.completed_iterations,
            discards: context.discards,
            shrinks: context.shrinks,
            counterexample,
            termination_reason,
            initial_parameters: context.initial_parameters,
            next_parameters: context.next_parameters,
            deep_check: context.deep_check,
        }
    }
}

impl<T: fmt::Debug> fmt::Display for CheckResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.counterexample {
            None => write!(f, "  ✓ property passed {} tests.", self.iterations),
            Some(counterexample) => {
                writeln!(
                    f,
                    "  ✗ property failed after {} tests and {} shrinks.",
                    self.iterations, self.shrinks
                )?;
                if let Some(exception) = &counterexample.exception {
                    writeln!(f, "    === {} ===", exception)?;
                }
                writeln!(f, "    Minimal counterexample: {:?}", counterexample.value)?;
                write!(f, "    Reproduce with replay: {}", counterexample.replay)
            }
        }
    }
}

/// Check `property` against generated values until a termination condition
/// is met.
///
/// Generator errors and discard exhaustion are returned as errors. A failing
/// property is not an error: it is reported through the returned
/// [`CheckResult`].
pub fn check<T: Clone + 'static>(property: &Property<T>, config: &Config) -> Result<CheckResult<T>> {
    let context = CheckStateContext::new(config, config.initial_parameters());
    let mut state = match &config.replay {
        Some(replay) => CheckState::Replay(replay.clone()),
        None => CheckState::GenerationBegin,
    };
    let mut context = context;

    loop {
        let (next_state, next_context) = state.transition(property, context)?;
        tracing::trace!(state = next_state.name(), "check transition");
        if let CheckState::Termination(reason) = next_state {
            tracing::debug!(
                %reason,
                iterations = next_context.completed_iterations,
                shrinks = next_context.shrinks,
                discards = next_context.discards,
                "check terminated"
            );
            return Ok(CheckResult::from_context(next_context, reason));
        }
        state = next_state;
        context = next_context;
    }
}
