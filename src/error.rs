//! Error types for pipeline construction and execution

use thiserror::Error;

/// Errors produced while building or running a pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A registered step body is not usable (raised at registration time)
    #[error("invalid body for step \"{step}\": {reason}")]
    InvalidStepBody { step: String, reason: String },

    /// A step's input failed its contract check
    #[error("input for step \"{step}\" failed validation: {value}")]
    ValidationFailed { step: String, value: String },

    /// A fan-out step received a non-sequence input
    #[error("fan-out step \"{step}\" expected a sequence but received: {value}")]
    TypeMismatch { step: String, value: String },

    /// An error raised by a step body, surfaced unchanged
    #[error(transparent)]
    Step(#[from] anyhow::Error),
}

impl PipelineError {
    /// The name of the step the error is attached to, if any.
    ///
    /// Body errors carry no step name; they pass through untouched.
    pub fn step_name(&self) -> Option<&str> {
        match self {
            PipelineError::InvalidStepBody { step, .. }
            | PipelineError::ValidationFailed { step, .. }
            | PipelineError::TypeMismatch { step, .. } => Some(step),
            PipelineError::Step(_) => None,
        }
    }
}
