//! Tool Handler Port - business handlers behind catalog functions.
//!
//! Every handler is invoked with the validated call and an explicit
//! [`ExecutionContext`]. The context carries what handlers need beyond
//! the model-produced arguments (the client's case id) and lives only
//! as long as the call borrowing it.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{ClientId, ReportId};
use crate::domain::tools::{StructuredOutcome, ValidatedCall};

use super::media_fetcher::MediaFetchError;
use super::verification_service::VerificationError;

/// Per-call context handed to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Client the call is made for.
    pub client_id: ClientId,
    /// External case id, when the client has one.
    pub report_id: Option<ReportId>,
}

impl ExecutionContext {
    /// Creates a context for a client without a case id.
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            report_id: None,
        }
    }

    /// Sets the case id.
    pub fn with_report_id(mut self, report_id: Option<ReportId>) -> Self {
        self.report_id = report_id;
        self
    }

    /// Returns the case id or a `MissingContext` error.
    pub fn require_report_id(&self) -> Result<&ReportId, HandlerError> {
        self.report_id
            .as_ref()
            .ok_or(HandlerError::MissingContext("report_id"))
    }
}

/// Port for a text tool handler.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the call.
    ///
    /// Business rejections (bad email, wrong code) are `Ok` outcomes with
    /// `status: false`; `Err` is reserved for failures the handler could
    /// not turn into a user-facing answer.
    async fn invoke(
        &self,
        call: &ValidatedCall,
        context: &ExecutionContext,
    ) -> Result<StructuredOutcome, HandlerError>;
}

/// Failures raised inside handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("missing execution context: {0}")]
    MissingContext(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("verification service failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("media fetch failed: {0}")]
    MediaFetch(#[from] MediaFetchError),

    #[error("handler failed: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
