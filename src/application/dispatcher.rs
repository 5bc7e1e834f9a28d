//! Function dispatcher - invokes handlers for validated calls.
//!
//! Handlers are resolved through an explicit name → handler table built
//! once from the client profile. Every invocation runs inside a tracing
//! span carrying the call's context, and any handler error or panic is
//! converted into a failed [`StructuredOutcome`] at this boundary.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::Instrument;

use crate::domain::journey::StepDescriptor;
use crate::domain::tools::{
    SchemaValidator, StructuredOutcome, ToolCallDirective, ToolCatalog, ValidatedCall,
    ValidationFailure,
};
use crate::ports::{
    ClientFunctions, ExecutionContext, MediaHandler, MediaVerdict, RegisteredTool, ToolHandler,
};

const DEFAULT_FAILURE_MESSAGE: &str =
    "Sorry, we could not process your request right now. Please try again.";

/// Why a batch produced nothing to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoActionReason {
    /// The model produced no directive.
    NoToolCall,
    /// Every directive named the catch-all.
    OnlyCatchAll,
    /// A directive failed validation next to a catch-all; nothing ran.
    Discarded(Vec<ValidationFailure>),
    /// Every actionable directive failed validation.
    AllInvalid(Vec<ValidationFailure>),
}

/// One executed call and its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedCall {
    pub function: String,
    pub outcome: StructuredOutcome,
}

/// Result of dispatching a batch of directives.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    NoActionable(NoActionReason),
    /// Outcomes in parse order; never empty.
    Dispatched(Vec<DispatchedCall>),
}

/// Resolves and invokes tool and media handlers.
pub struct FunctionDispatcher {
    tool_handlers: HashMap<String, Arc<dyn ToolHandler>>,
    media_handlers: HashMap<String, Arc<dyn MediaHandler>>,
    validator: SchemaValidator,
    failure_message: String,
}

impl Default for FunctionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionDispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            tool_handlers: HashMap::new(),
            media_handlers: HashMap::new(),
            validator: SchemaValidator::new(),
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Builds the handler tables from a client profile.
    pub fn from_functions(functions: &dyn ClientFunctions) -> Self {
        let mut dispatcher = Self::new();
        for tool in functions.tools() {
            dispatcher.register_tool(tool);
        }
        dispatcher.media_handlers = functions.media_tools();
        dispatcher
    }

    /// Sets the message used when a handler fails unexpectedly.
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    pub fn register_tool(&mut self, tool: RegisteredTool) {
        self.tool_handlers
            .insert(tool.name().to_string(), tool.handler);
    }

    pub fn register_media(&mut self, function: impl Into<String>, handler: Arc<dyn MediaHandler>) {
        self.media_handlers.insert(function.into(), handler);
    }

    pub fn has_tool_handler(&self, name: &str) -> bool {
        self.tool_handlers.contains_key(name)
    }

    pub fn has_media_handler(&self, function: &str) -> bool {
        self.media_handlers.contains_key(function)
    }

    pub fn failure_message(&self) -> &str {
        &self.failure_message
    }

    /// Invokes the handler for a validated call.
    pub async fn dispatch(&self, call: &ValidatedCall, context: &ExecutionContext) -> StructuredOutcome {
        let Some(handler) = self.tool_handlers.get(call.name()) else {
            tracing::error!(function = call.name(), "No handler registered for catalog function");
            return StructuredOutcome::failure(&self.failure_message);
        };

        let span = tracing::info_span!(
            "dispatch",
            function = call.name(),
            client_id = %context.client_id,
            report_id = context.report_id.as_ref().map(|r| r.as_str()).unwrap_or("-"),
        );

        let result = AssertUnwindSafe(handler.invoke(call, context))
            .catch_unwind()
            .instrument(span)
            .await;

        match result {
            Ok(Ok(outcome)) => {
                tracing::debug!(
                    function = call.name(),
                    status = outcome.status,
                    complete = outcome.mark_as_complete,
                    "Handler finished"
                );
                outcome
            }
            Ok(Err(err)) => {
                tracing::error!(function = call.name(), error = %err, "Handler failed");
                StructuredOutcome::failure(&self.failure_message)
            }
            Err(_) => {
                tracing::error!(function = call.name(), "Handler panicked");
                StructuredOutcome::failure(&self.failure_message)
            }
        }
    }

    /// Validates and dispatches the directives of one model response.
    ///
    /// The whole batch is validated before anything runs. If any directive
    /// is invalid while a catch-all is present, the batch is discarded.
    /// Otherwise valid, non-catch-all directives run in parse order.
    pub async fn dispatch_batch(
        &self,
        directives: &[ToolCallDirective],
        catalog: &ToolCatalog,
        context: &ExecutionContext,
    ) -> BatchOutcome {
        if directives.is_empty() {
            return BatchOutcome::NoActionable(NoActionReason::NoToolCall);
        }

        let has_catch_all = directives.iter().any(ToolCallDirective::is_catch_all);
        let mut actionable = Vec::new();
        let mut failures = Vec::new();

        for directive in directives {
            match self.validator.validate(directive, catalog) {
                Ok(call) if call.is_catch_all() => {}
                Ok(call) => actionable.push(call),
                Err(failure) => {
                    tracing::warn!(
                        client_id = %context.client_id,
                        function = %directive.name,
                        error = %failure,
                        "Rejected tool call"
                    );
                    failures.push(failure);
                }
            }
        }

        if !failures.is_empty() && has_catch_all {
            tracing::info!(
                client_id = %context.client_id,
                rejected = failures.len(),
                "Discarding tool call batch with invalid and catch-all calls"
            );
            return BatchOutcome::NoActionable(NoActionReason::Discarded(failures));
        }

        if actionable.is_empty() {
            let reason = if failures.is_empty() {
                NoActionReason::OnlyCatchAll
            } else {
                NoActionReason::AllInvalid(failures)
            };
            return BatchOutcome::NoActionable(reason);
        }

        let mut dispatched = Vec::with_capacity(actionable.len());
        for call in &actionable {
            let outcome = self.dispatch(call, context).await;
            dispatched.push(DispatchedCall {
                function: call.name().to_string(),
                outcome,
            });
        }
        BatchOutcome::Dispatched(dispatched)
    }

    /// Runs the media handler bound to `step`.
    ///
    /// Returns `None` when no media handler is registered for the step.
    pub async fn dispatch_media(
        &self,
        step: &StepDescriptor,
        context: &ExecutionContext,
    ) -> Option<MediaVerdict> {
        let handler = self.media_handlers.get(&step.function_id)?;

        let span = tracing::info_span!(
            "dispatch_media",
            function = %step.function_id,
            client_id = %context.client_id,
            media = step.images.len(),
        );

        let result = AssertUnwindSafe(handler.handle(step, context))
            .catch_unwind()
            .instrument(span)
            .await;

        let verdict = match result {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(err)) => {
                tracing::error!(function = %step.function_id, error = %err, "Media handler failed");
                MediaVerdict::rejected(&self.failure_message)
            }
            Err(_) => {
                tracing::error!(function = %step.function_id, "Media handler panicked");
                MediaVerdict::rejected(&self.failure_message)
            }
        };
        Some(verdict)
    }
}
