//! Media Handler Port - validators for steps that require images.
//!
//! Media never goes through the tool-calling pipeline. The orchestrator
//! records the received media on the active step and hands the step to
//! the handler registered under the step's function id.

use async_trait::async_trait;

use crate::domain::journey::StepDescriptor;
use crate::domain::tools::StructuredOutcome;

use super::tool_handler::{ExecutionContext, HandlerError};

/// What to do with the step's media after the handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDisposition {
    /// Keep the received media (e.g. waiting for the back of a document).
    Keep,
    /// Clear the media so the client can resubmit cleanly.
    Reset,
}

/// Result of a media handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaVerdict {
    pub outcome: StructuredOutcome,
    pub disposition: MediaDisposition,
}

impl MediaVerdict {
    /// Accepted media; the step is completed.
    pub fn accepted(outcome: StructuredOutcome) -> Self {
        Self {
            outcome: outcome.with_complete(true),
            disposition: MediaDisposition::Keep,
        }
    }

    /// Rejected media; the step's media is cleared.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            outcome: StructuredOutcome::failure(message),
            disposition: MediaDisposition::Reset,
        }
    }

    /// More media is needed; what was received is kept.
    pub fn incomplete(message: impl Into<String>) -> Self {
        Self {
            outcome: StructuredOutcome::failure(message),
            disposition: MediaDisposition::Keep,
        }
    }
}

/// Port for a media step validator.
#[async_trait]
pub trait MediaHandler: Send + Sync {
    /// Validate the media recorded on `step`.
    async fn handle(
        &self,
        step: &StepDescriptor,
        context: &ExecutionContext,
    ) -> Result<MediaVerdict, HandlerError>;
}
