//! Error types surfaced to callers of `sample`, `check` and `minimal`.

use crate::gen::{GenError, GenErrorKind};
use crate::replay::Replay;
use thiserror::Error;

/// Main error type for GalaxyCheck.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GalaxyError {
    /// A generator was misconfigured or failed while running. Fatal to the run.
    #[error("Error while running generator {gen_name}: {message}")]
    Generator {
        gen_name: String,
        message: String,
        /// Replay token of the parameters the failing iteration ran with.
        replay: Option<String>,
    },

    /// Too many consecutive discards while pulling iterations.
    #[error("Exhausted after {discards} consecutive discards")]
    Exhausted { discards: usize },

    /// A built-in safety limit was hit, e.g. a collection count above the cap.
    #[error("Error while running generator {gen_name}: {message}")]
    LimitExceeded { gen_name: String, message: String },

    /// `minimal` never saw a value satisfying the predicate.
    #[error("Could not find any value satisfying the predicate after {iterations} iterations")]
    NoMinimalFound { iterations: usize },
}

/// Result type for GalaxyCheck operations.
pub type Result<T> = std::result::Result<T, GalaxyError>;

impl From<GenError> for GalaxyError {
    fn from(error: GenError) -> Self {
        match error.kind {
            GenErrorKind::Configuration => GalaxyError::Generator {
                replay: Some(Replay::new(error.replay_parameters, Vec::new()).encode()),
                gen_name: error.gen_name,
                message: error.message,
            },
            GenErrorKind::LimitExceeded => GalaxyError::LimitExceeded {
                gen_name: error.gen_name,
                message: error.message,
            },
            GenErrorKind::Exhausted { discards } => GalaxyError::Exhausted { discards },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_error_message() {
        let error = GalaxyError::Generator {
            gen_name: "IntegerGen".to_string(),
            message: "'min' cannot be greater than 'max'".to_string(),
            replay: None,
        };
        assert_eq!(
            error.to_string(),
            "Error while running generator IntegerGen: 'min' cannot be greater than 'max'"
        );
    }

    #[test]
    fn test_exhaustion_message() {
        let error = GalaxyError::Exhausted { discards: 1000 };
        assert_eq!(error.to_string(), "Exhausted after 1000 consecutive discards");
    }
}
