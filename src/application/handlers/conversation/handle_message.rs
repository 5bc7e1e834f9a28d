//! HandleMessage command handler - the conversation orchestrator.
//!
//! Routes each inbound message by the client's journey state: start
//! button, no journey, completed journey, image step, or text step. The
//! client's lock is held for the whole turn, so reading the active step
//! and writing its progress never interleave with another message from
//! the same client.
//!
//! Every path ends with at least one outbound message; store and model
//! failures, and turns that exceed the deadline, end with the configured
//! retry text.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::application::client_locks::ClientLocks;
use crate::application::dispatcher::FunctionDispatcher;
use crate::application::instruction_writer::InstructionWriter;
use crate::application::messages::ConversationMessages;
use crate::application::tool_pipeline::{PipelineResult, ToolCallPipeline};
use crate::domain::foundation::ClientId;
use crate::domain::journey::{JourneyError, JourneyStatus, MediaRef, StepDescriptor};
use crate::domain::tools::StructuredOutcome;
use crate::ports::{
    ExecutionContext, JourneyStore, JourneyStoreError, MediaDisposition, MessageSender,
};

/// A message received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub client_id: ClientId,
    pub body: String,
    pub media: Vec<MediaRef>,
    /// The client pressed the start button.
    pub is_button: bool,
}

impl InboundMessage {
    /// A plain text message.
    pub fn text(client_id: ClientId, body: impl Into<String>) -> Self {
        Self {
            client_id,
            body: body.into(),
            media: Vec::new(),
            is_button: false,
        }
    }

    /// A start button press.
    pub fn button(client_id: ClientId, body: impl Into<String>) -> Self {
        Self {
            is_button: true,
            ..Self::text(client_id, body)
        }
    }

    pub fn with_media(mut self, media: impl IntoIterator<Item = MediaRef>) -> Self {
        self.media.extend(media);
        self
    }

    pub fn has_text(&self) -> bool {
        !self.body.trim().is_empty()
    }
}

/// What one turn did.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationTurn {
    /// Staged steps became live; greeting and first instruction sent.
    Started { first_step: Option<String> },
    /// The current step's instruction was sent again.
    Reprompted { step: String },
    /// No live journey; generic reply plus start hint sent.
    NoJourney,
    JourneyComplete,
    /// Image step without media; the image request was sent.
    ImageRequested { step: String },
    /// Media-only message on a text step.
    MediaNotRequired { step: String },
    /// Nothing actionable; a context-grounded reply was sent.
    Fallback { step: String },
    /// An outcome was sent and the step stays active.
    Replied { step: String, outcome: StructuredOutcome },
    /// The step was completed; `next` is the new active step.
    Advanced { from: String, next: Option<String> },
    /// The outcome asked to advance but the journey had moved on.
    AdvanceSkipped { step: String },
    /// The model was unreachable; the retry text was sent.
    UpstreamRetry { step: String },
    /// The store failed; the retry text was sent.
    Failed,
    /// The turn exceeded its deadline; the retry text was sent.
    TimedOut,
}

/// Default upper bound on one turn, lock wait excluded.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(90);

/// Handler for inbound client messages.
pub struct HandleMessageHandler {
    store: Arc<dyn JourneyStore>,
    sender: Arc<dyn MessageSender>,
    pipeline: Arc<ToolCallPipeline>,
    dispatcher: Arc<FunctionDispatcher>,
    writer: Arc<InstructionWriter>,
    messages: ConversationMessages,
    locks: ClientLocks,
    turn_timeout: Duration,
}

impl HandleMessageHandler {
    pub fn new(
        store: Arc<dyn JourneyStore>,
        sender: Arc<dyn MessageSender>,
        pipeline: Arc<ToolCallPipeline>,
        dispatcher: Arc<FunctionDispatcher>,
        writer: Arc<InstructionWriter>,
    ) -> Self {
        Self {
            store,
            sender,
            pipeline,
            dispatcher,
            writer,
            messages: ConversationMessages::default(),
            locks: ClientLocks::new(),
            turn_timeout: DEFAULT_TURN_TIMEOUT,
        }
    }

    pub fn with_messages(mut self, messages: ConversationMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Shares per-client locks with other handlers touching journeys.
    pub fn with_locks(mut self, locks: ClientLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Bounds the work of one turn. On expiry the retry text is sent.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    pub fn locks(&self) -> &ClientLocks {
        &self.locks
    }

    /// Processes one inbound message.
    pub async fn handle(&self, message: InboundMessage) -> ConversationTurn {
        let _turn = self.locks.acquire(&message.client_id).await;

        match tokio::time::timeout(self.turn_timeout, self.process(&message)).await {
            Ok(Ok(turn)) => {
                tracing::debug!(client_id = %message.client_id, turn = ?turn, "Turn finished");
                turn
            }
            Ok(Err(err)) => {
                tracing::error!(client_id = %message.client_id, error = %err, "Journey store failed");
                self.send(&message.client_id, &self.messages.retry_fallback).await;
                ConversationTurn::Failed
            }
            Err(_) => {
                tracing::warn!(
                    client_id = %message.client_id,
                    timeout_secs = self.turn_timeout.as_secs(),
                    "Turn exceeded its deadline"
                );
                self.send(&message.client_id, &self.messages.retry_fallback).await;
                ConversationTurn::TimedOut
            }
        }
    }

    async fn process(&self, message: &InboundMessage) -> Result<ConversationTurn, JourneyStoreError> {
        let client_id = &message.client_id;

        if message.is_button {
            if let Some(turn) = self.start(client_id).await? {
                return Ok(turn);
            }
        }

        let Some(journey) = self.store.load(client_id).await? else {
            return Ok(self.no_journey(message).await);
        };

        match journey.status() {
            JourneyStatus::NotStarted => return Ok(self.no_journey(message).await),
            JourneyStatus::AllComplete => {
                self.send(client_id, &self.messages.journey_complete).await;
                return Ok(ConversationTurn::JourneyComplete);
            }
            JourneyStatus::InProgress => {}
        }

        let Some(step) = journey.active_step().cloned() else {
            return Ok(ConversationTurn::JourneyComplete);
        };
        let context =
            ExecutionContext::new(client_id.clone()).with_report_id(journey.report_id().cloned());

        if message.is_button {
            let instruction = self.writer.request_step(client_id, &step).await;
            self.send(client_id, &instruction).await;
            return Ok(ConversationTurn::Reprompted {
                step: step.function_id,
            });
        }

        if step.require_images {
            if message.media.is_empty() {
                return Ok(self.request_image(message, step).await);
            }
            return self.handle_media(message, step, &context).await;
        }

        if !message.media.is_empty() && !message.has_text() {
            self.send(client_id, &self.messages.media_not_required).await;
            return Ok(ConversationTurn::MediaNotRequired {
                step: step.function_id,
            });
        }

        self.handle_text(message, step, &context).await
    }

    /// Promotes staged steps. `None` when nothing was staged.
    async fn start(&self, client_id: &ClientId) -> Result<Option<ConversationTurn>, JourneyStoreError> {
        let first = match self.store.activate_staged(client_id).await {
            Ok(first) => first,
            Err(JourneyStoreError::Inconsistent(JourneyError::NothingStaged))
            | Err(JourneyStoreError::NotFound(_)) => {
                tracing::debug!(client_id = %client_id, "Start pressed with nothing staged");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        tracing::info!(
            client_id = %client_id,
            first_step = first.as_ref().map(|s| s.function_id.as_str()).unwrap_or("-"),
            "Journey started"
        );

        let greeting = self.writer.greeting(client_id).await;
        self.send(client_id, &greeting).await;
        if let Some(step) = &first {
            let instruction = self.writer.request_step(client_id, step).await;
            self.send(client_id, &instruction).await;
        }

        Ok(Some(ConversationTurn::Started {
            first_step: first.map(|s| s.function_id),
        }))
    }

    async fn no_journey(&self, message: &InboundMessage) -> ConversationTurn {
        let reply = self
            .writer
            .generic_reply(&message.client_id, &message.body)
            .await;
        let text = format!("{}\n\n{}", reply, self.messages.start_process);
        self.send(&message.client_id, &text).await;
        ConversationTurn::NoJourney
    }

    async fn request_image(&self, message: &InboundMessage, step: StepDescriptor) -> ConversationTurn {
        let client_id = &message.client_id;
        let text = if message.has_text() {
            self.writer
                .explain_step(client_id, &step, &message.body, None)
                .await
        } else {
            self.writer.request_step(client_id, &step).await
        };
        self.send(client_id, &text).await;
        ConversationTurn::ImageRequested {
            step: step.function_id,
        }
    }

    async fn handle_media(
        &self,
        message: &InboundMessage,
        step: StepDescriptor,
        context: &ExecutionContext,
    ) -> Result<ConversationTurn, JourneyStoreError> {
        let client_id = &message.client_id;

        for media in &message.media {
            let count = self
                .store
                .append_image(client_id, &step.function_id, media.clone())
                .await?;
            tracing::debug!(client_id = %client_id, step = %step.function_id, count, "Media recorded");
        }

        self.send(client_id, &self.messages.processing_notice).await;

        // Reload so the handler sees every media item recorded so far.
        let step = self
            .store
            .get_active_step(client_id)
            .await?
            .filter(|active| active.function_id == step.function_id)
            .unwrap_or(step);

        let Some(verdict) = self.dispatcher.dispatch_media(&step, context).await else {
            tracing::warn!(client_id = %client_id, step = %step.function_id, "No media handler for step");
            let outcome = StructuredOutcome::failure(&self.messages.unrecognised_function);
            self.send(client_id, &outcome.message).await;
            return Ok(ConversationTurn::Replied {
                step: step.function_id,
                outcome,
            });
        };

        if verdict.disposition == MediaDisposition::Reset && !verdict.outcome.advances_step() {
            self.store.reset_images(client_id, &step.function_id).await?;
        }

        self.apply_outcome(&step, verdict.outcome, &message.body, context)
            .await
    }

    async fn handle_text(
        &self,
        message: &InboundMessage,
        step: StepDescriptor,
        context: &ExecutionContext,
    ) -> Result<ConversationTurn, JourneyStoreError> {
        let client_id = &message.client_id;

        match self.pipeline.run(&message.body, &step, context).await {
            PipelineResult::Outcomes(calls) => {
                let mut calls = calls.into_iter();
                let Some(first) = calls.next() else {
                    return Ok(self.fallback(message, step).await);
                };
                for ignored in calls {
                    tracing::info!(
                        client_id = %client_id,
                        function = %ignored.function,
                        status = ignored.outcome.status,
                        "Outcome not acted on"
                    );
                }
                self.apply_outcome(&step, first.outcome, &message.body, context)
                    .await
            }
            PipelineResult::NoDirective(reason) => {
                tracing::debug!(client_id = %client_id, reason = ?reason, "No actionable directive");
                Ok(self.fallback(message, step).await)
            }
            PipelineResult::ParseFailure(_) => Ok(self.fallback(message, step).await),
            PipelineResult::Unavailable(_) => {
                self.send(client_id, &self.messages.retry_fallback).await;
                Ok(ConversationTurn::UpstreamRetry {
                    step: step.function_id,
                })
            }
        }
    }

    async fn fallback(&self, message: &InboundMessage, step: StepDescriptor) -> ConversationTurn {
        let text = self
            .writer
            .explain_step(&message.client_id, &step, &message.body, None)
            .await;
        self.send(&message.client_id, &text).await;
        ConversationTurn::Fallback {
            step: step.function_id,
        }
    }

    async fn apply_outcome(
        &self,
        step: &StepDescriptor,
        outcome: StructuredOutcome,
        user_input: &str,
        context: &ExecutionContext,
    ) -> Result<ConversationTurn, JourneyStoreError> {
        let client_id = &context.client_id;

        let text = if outcome.status {
            match (&outcome.data, outcome.response_with_llm) {
                (Some(data), true) => {
                    self.writer
                        .explain_step(client_id, step, user_input, Some(data))
                        .await
                }
                (None, true) => self.writer.rephrase(client_id, step, &outcome.message).await,
                (_, false) => outcome.message.clone(),
            }
        } else if outcome.response_with_llm || outcome.message.trim().is_empty() {
            let detail = outcome
                .data
                .clone()
                .unwrap_or_else(|| Value::String(outcome.message.clone()));
            self.writer
                .explain_step(client_id, step, user_input, Some(&detail))
                .await
        } else {
            outcome.message.clone()
        };

        // An advance is followed by the next instruction; anything else
        // must still answer the client.
        let text = if text.trim().is_empty() && !outcome.advances_step() {
            self.writer
                .explain_step(client_id, step, user_input, outcome.data.as_ref())
                .await
        } else {
            text
        };

        if !text.trim().is_empty() {
            self.send(client_id, &text).await;
        }

        if outcome.advances_step() {
            return self.advance(step, client_id).await;
        }

        Ok(ConversationTurn::Replied {
            step: step.function_id.clone(),
            outcome,
        })
    }

    async fn advance(
        &self,
        step: &StepDescriptor,
        client_id: &ClientId,
    ) -> Result<ConversationTurn, JourneyStoreError> {
        let from = step.function_id.clone();

        match self.store.advance(client_id, &step.function_id).await {
            Ok(Some(next)) => {
                tracing::info!(client_id = %client_id, from = %from, next = %next.function_id, "Step completed");
                let instruction = self.writer.request_step(client_id, &next).await;
                self.send(client_id, &instruction).await;
                Ok(ConversationTurn::Advanced {
                    from,
                    next: Some(next.function_id),
                })
            }
            Ok(None) => {
                tracing::info!(client_id = %client_id, from = %from, "Journey complete");
                self.send(client_id, &self.messages.journey_complete).await;
                Ok(ConversationTurn::Advanced { from, next: None })
            }
            Err(JourneyStoreError::Inconsistent(err)) if err.is_replay() => {
                tracing::debug!(client_id = %client_id, step = %from, "Replayed advance ignored");
                Ok(ConversationTurn::AdvanceSkipped { step: from })
            }
            Err(err) if err.is_inconsistency() => {
                tracing::warn!(client_id = %client_id, step = %from, error = %err, "Advance skipped");
                Ok(ConversationTurn::AdvanceSkipped { step: from })
            }
            Err(err) => Err(err),
        }
    }

    async fn send(&self, to: &ClientId, body: &str) {
        if let Err(err) = self.sender.send_text(to, body).await {
            tracing::error!(client_id = %to, error = %err, "Failed to send message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::messaging::RecordingSender;
    use crate::adapters::storage::InMemoryJourneyStore;
    use crate::application::instruction_writer::InstructionConfig;
    use crate::domain::foundation::ReportId;
    use crate::domain::tools::{ParameterType, ToolCatalog, ToolSpecification, ValidatedCall};
    use crate::ports::{HandlerError, MediaHandler, MediaVerdict, RegisteredTool, ToolHandler};

    struct EmailHandler;

    #[async_trait]
    impl ToolHandler for EmailHandler {
        async fn invoke(
            &self,
            call: &ValidatedCall,
            _context: &ExecutionContext,
        ) -> Result<StructuredOutcome, HandlerError> {
            Ok(match call.str_arg("value") {
                Some("ack") => StructuredOutcome::success(""),
                Some(v) if v.contains('@') => StructuredOutcome::completed("Email saved"),
                _ => StructuredOutcome::failure("That email does not look right"),
            })
        }
    }

    struct RejectingFace;

    #[async_trait]
    impl MediaHandler for RejectingFace {
        async fn handle(
            &self,
            _step: &StepDescriptor,
            _context: &ExecutionContext,
        ) -> Result<MediaVerdict, HandlerError> {
            Ok(MediaVerdict::rejected("Face not detected"))
        }
    }

    struct Harness {
        ai: MockAIProvider,
        store: Arc<InMemoryJourneyStore>,
        sender: Arc<RecordingSender>,
        handler: HandleMessageHandler,
    }

    fn harness() -> Harness {
        harness_with(MockAIProvider::new())
    }

    fn harness_with(ai: MockAIProvider) -> Harness {
        let store = Arc::new(InMemoryJourneyStore::new());
        let sender = Arc::new(RecordingSender::new());

        let spec = ToolSpecification::new("check_email_valid", "Validate email")
            .with_parameter("value", ParameterType::String, "email", true);
        let mut dispatcher = FunctionDispatcher::new();
        dispatcher.register_tool(RegisteredTool::new(spec.clone(), Arc::new(EmailHandler)));
        dispatcher.register_media("check_face_valid", Arc::new(RejectingFace));
        let dispatcher = Arc::new(dispatcher);
        let catalog = Arc::new(ToolCatalog::from_specifications(vec![spec]).unwrap());

        let pipeline = Arc::new(ToolCallPipeline::new(
            Arc::new(ai.clone()),
            dispatcher.clone(),
            catalog,
        ));
        let writer = Arc::new(InstructionWriter::new(
            Arc::new(ai.clone()),
            InstructionConfig::default(),
        ));

        let handler =
            HandleMessageHandler::new(store.clone(), sender.clone(), pipeline, dispatcher, writer);
        Harness {
            ai,
            store,
            sender,
            handler,
        }
    }

    fn client() -> ClientId {
        ClientId::new("5215512345678").unwrap()
    }

    fn steps() -> Vec<StepDescriptor> {
        vec![
            StepDescriptor::new("check_email_valid", "your email", "send you a code"),
            StepDescriptor::new("check_face_valid", "a selfie", "confirm it is you")
                .requiring_images(["image/*"]),
        ]
    }

    async fn registered(h: &Harness) {
        h.store
            .register_contact(&client(), ReportId::new("rep-1").unwrap(), steps())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn message_without_journey_gets_generic_reply_and_start_hint() {
        let h = harness();
        h.ai.push_purpose_response("generic_reply", "We help you verify your identity.");

        let turn = h.handler.handle(InboundMessage::text(client(), "what is this?")).await;

        assert_eq!(turn, ConversationTurn::NoJourney);
        let sent = h.sender.texts_for(&client());
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("We help you verify your identity."));
        assert!(sent[0].ends_with(&ConversationMessages::default().start_process));
    }

    #[tokio::test]
    async fn staged_contact_is_not_live_until_start() {
        let h = harness();
        registered(&h).await;

        let turn = h.handler.handle(InboundMessage::text(client(), "hola")).await;
        assert_eq!(turn, ConversationTurn::NoJourney);
    }

    #[tokio::test]
    async fn start_button_sends_greeting_and_first_instruction() {
        let h = harness();
        registered(&h).await;
        h.ai.push_purpose_response("greeting", "Hi, I'm your assistant.");
        h.ai.push_purpose_response("request_step", "Please share your email.");

        let turn = h.handler.handle(InboundMessage::button(client(), "Start")).await;

        assert_eq!(
            turn,
            ConversationTurn::Started {
                first_step: Some("check_email_valid".to_string())
            }
        );
        assert_eq!(
            h.sender.texts_for(&client()),
            vec!["Hi, I'm your assistant.", "Please share your email."]
        );
    }

    #[tokio::test]
    async fn completed_outcome_advances_and_requests_next_step() {
        let h = harness();
        registered(&h).await;
        h.handler.handle(InboundMessage::button(client(), "Start")).await;
        h.sender.clear();

        h.ai.push_purpose_response(
            "tool_call",
            r#"<tool_call>{"name": "check_email_valid", "arguments": {"value": "ana@example.com"}}</tool_call>"#,
        );
        h.ai.push_purpose_response("request_step", "Now send a selfie.");

        let turn = h
            .handler
            .handle(InboundMessage::text(client(), "ana@example.com"))
            .await;

        assert_eq!(
            turn,
            ConversationTurn::Advanced {
                from: "check_email_valid".to_string(),
                next: Some("check_face_valid".to_string())
            }
        );
        assert_eq!(
            h.sender.texts_for(&client()),
            vec!["Email saved", "Now send a selfie."]
        );
    }

    #[tokio::test]
    async fn failed_outcome_keeps_step_active() {
        let h = harness();
        registered(&h).await;
        h.handler.handle(InboundMessage::button(client(), "Start")).await;
        h.sender.clear();

        h.ai.push_purpose_response(
            "tool_call",
            r#"<tool_call>{"name": "check_email_valid", "arguments": {"value": "nope"}}</tool_call>"#,
        );
        let turn = h.handler.handle(InboundMessage::text(client(), "nope")).await;

        assert!(matches!(turn, ConversationTurn::Replied { ref outcome, .. } if !outcome.status));
        assert_eq!(h.sender.texts_for(&client()), vec!["That email does not look right"]);
        let active = h.store.get_active_step(&client()).await.unwrap().unwrap();
        assert_eq!(active.function_id, "check_email_valid");
    }

    #[tokio::test]
    async fn media_only_message_on_text_step_is_refused() {
        let h = harness();
        registered(&h).await;
        h.handler.handle(InboundMessage::button(client(), "Start")).await;
        h.sender.clear();

        let turn = h
            .handler
            .handle(InboundMessage::text(client(), "").with_media([MediaRef::new("https://m/1")]))
            .await;

        assert_eq!(
            turn,
            ConversationTurn::MediaNotRequired {
                step: "check_email_valid".to_string()
            }
        );
    }

    #[tokio::test]
    async fn rejected_media_is_reset_for_resubmission() {
        let h = harness();
        h.store.initialize_journey(&client(), steps()).await.unwrap();
        h.store.advance(&client(), "check_email_valid").await.unwrap();

        let turn = h
            .handler
            .handle(InboundMessage::text(client(), "").with_media([MediaRef::new("https://m/selfie")]))
            .await;

        assert!(matches!(turn, ConversationTurn::Replied { ref step, .. } if step == "check_face_valid"));
        assert_eq!(
            h.sender.texts_for(&client()),
            vec![
                ConversationMessages::default().processing_notice,
                "Face not detected".to_string()
            ]
        );
        let active = h.store.get_active_step(&client()).await.unwrap().unwrap();
        assert!(active.images.is_empty());
        assert!(!active.complete);
    }

    #[tokio::test]
    async fn completed_journey_gets_completion_message() {
        let h = harness();
        h.store.initialize_journey(&client(), steps()).await.unwrap();
        h.store.advance(&client(), "check_email_valid").await.unwrap();
        h.store.advance(&client(), "check_face_valid").await.unwrap();

        let turn = h.handler.handle(InboundMessage::text(client(), "hello?")).await;

        assert_eq!(turn, ConversationTurn::JourneyComplete);
        assert_eq!(
            h.sender.texts_for(&client()),
            vec![ConversationMessages::default().journey_complete]
        );
    }

    #[tokio::test]
    async fn empty_success_message_gets_an_explanation() {
        let h = harness();
        h.store.initialize_journey(&client(), steps()).await.unwrap();

        h.ai.push_purpose_response(
            "tool_call",
            r#"<tool_call>{"name": "check_email_valid", "arguments": {"value": "ack"}}</tool_call>"#,
        );
        h.ai.push_purpose_response("explain_step", "Please send your email address.");
        let turn = h.handler.handle(InboundMessage::text(client(), "ok")).await;

        assert!(matches!(turn, ConversationTurn::Replied { ref outcome, .. } if outcome.status));
        assert_eq!(
            h.sender.texts_for(&client()),
            vec!["Please send your email address."]
        );
    }

    #[tokio::test]
    async fn slow_model_ends_turn_with_retry_text() {
        let mut h = harness_with(MockAIProvider::new().with_delay(Duration::from_millis(300)));
        h.handler = h.handler.with_turn_timeout(Duration::from_millis(30));
        h.store.initialize_journey(&client(), steps()).await.unwrap();

        let turn = h
            .handler
            .handle(InboundMessage::text(client(), "ana@example.com"))
            .await;

        assert_eq!(turn, ConversationTurn::TimedOut);
        assert_eq!(
            h.sender.texts_for(&client()),
            vec![ConversationMessages::default().retry_fallback]
        );
        let active = h.store.get_active_step(&client()).await.unwrap().unwrap();
        assert_eq!(active.function_id, "check_email_valid");
        assert_eq!(h.handler.locks().active_clients(), 0);
    }

    #[tokio::test]
    async fn concurrent_turns_for_one_client_run_in_order() {
        let h = harness_with(MockAIProvider::new().with_delay(Duration::from_millis(20)));
        h.store.initialize_journey(&client(), steps()).await.unwrap();
        h.ai.push_purpose_response(
            "tool_call",
            r#"<tool_call>{"name": "check_email_valid", "arguments": {"value": "ana@example.com"}}</tool_call>"#,
        );

        let (first, second) = tokio::join!(
            h.handler.handle(InboundMessage::text(client(), "ana@example.com")),
            h.handler.handle(InboundMessage::text(client(), "what now?")),
        );

        assert_eq!(
            first,
            ConversationTurn::Advanced {
                from: "check_email_valid".to_string(),
                next: Some("check_face_valid".to_string())
            }
        );
        assert_eq!(
            second,
            ConversationTurn::ImageRequested {
                step: "check_face_valid".to_string()
            }
        );
        assert_eq!(h.ai.calls_for("tool_call"), 1);
    }
}
