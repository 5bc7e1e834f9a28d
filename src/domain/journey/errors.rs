//! Journey state errors.

use thiserror::Error;

/// A journey operation that does not match the current state.
///
/// These are inconsistencies, not crashes: callers log them and carry on,
/// since channel webhooks may be redelivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JourneyError {
    #[error("journey has no steps")]
    NoSteps,

    #[error("journey is already complete")]
    AllComplete,

    #[error("step '{requested}' is not the active step '{active}'")]
    NotActiveStep { requested: String, active: String },

    #[error("step '{0}' is already complete")]
    AlreadyComplete(String),

    #[error("unknown step '{0}'")]
    UnknownStep(String),

    #[error("no staged steps to activate")]
    NothingStaged,

    #[error("invalid steps: {0}")]
    InvalidSteps(String),
}

impl JourneyError {
    /// True for a replayed operation on a step that is already closed.
    pub fn is_replay(&self) -> bool {
        matches!(self, JourneyError::AlreadyComplete(_))
    }
}
