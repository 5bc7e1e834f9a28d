//! End-to-end conversation tests.
//!
//! These tests drive a full verification journey through the public API:
//! contact registration, the start button, text steps interpreted by a
//! scripted model, and media steps validated by the identity profile.
//! External collaborators (model, verification API, media host, channel)
//! are replaced by in-process fakes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use verification_agent::adapters::ai::{MockAIProvider, MockError};
use verification_agent::adapters::messaging::RecordingSender;
use verification_agent::adapters::storage::InMemoryJourneyStore;
use verification_agent::application::{
    ClientLocks, ConversationMessages, ConversationTurn, FunctionDispatcher, HandleMessageHandler,
    IdentityProfile, InboundMessage, InstructionConfig, InstructionWriter, RegisterContactCommand,
    RegisterContactHandler, ToolCallPipeline,
};
use verification_agent::domain::foundation::{ClientId, ReportId};
use verification_agent::domain::journey::{JourneyStatus, MediaRef, StepDescriptor};
use verification_agent::domain::tools::ToolCatalog;
use verification_agent::ports::{
    AddressExtraction, ClientFunctions, FaceQuality, FetchedMedia, IdExtraction, JourneyStore,
    LivenessCheck, MediaFetchError, MediaFetcher, VerificationError, VerificationService,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Default)]
struct FakeVerificationApi {
    emails: Mutex<Vec<String>>,
    otps_sent: Mutex<usize>,
    otp_checks: Mutex<Vec<String>>,
}

#[async_trait]
impl VerificationService for FakeVerificationApi {
    async fn save_email(&self, _report: &ReportId, email: &str) -> Result<(), VerificationError> {
        self.emails.lock().unwrap().push(email.to_string());
        Ok(())
    }

    async fn send_otp(&self, _report: &ReportId) -> Result<(), VerificationError> {
        *self.otps_sent.lock().unwrap() += 1;
        Ok(())
    }

    async fn verify_otp(&self, _report: &ReportId, code: &str) -> Result<bool, VerificationError> {
        self.otp_checks.lock().unwrap().push(code.to_string());
        Ok(code == "123456")
    }

    async fn face_quality(&self, _report: &ReportId, _image: &[u8]) -> Result<FaceQuality, VerificationError> {
        Ok(FaceQuality {
            detected: true,
            score: 91.0,
        })
    }

    async fn face_liveness(&self, _report: &ReportId, _image: &[u8]) -> Result<LivenessCheck, VerificationError> {
        Ok(LivenessCheck {
            is_live: true,
            score: 0.97,
        })
    }

    async fn extract_address(
        &self,
        _report: &ReportId,
        _document: &[u8],
        _content_type: &str,
    ) -> Result<Option<AddressExtraction>, VerificationError> {
        Ok(None)
    }

    async fn extract_id(
        &self,
        _report: &ReportId,
        _front: &[u8],
        _back: &[u8],
    ) -> Result<Option<IdExtraction>, VerificationError> {
        Ok(Some(IdExtraction {
            full_name: "Ana Lopez".to_string(),
            document_number: Some("IDMEX123".to_string()),
            personal_number: None,
        }))
    }
}

struct StaticMediaHost;

#[async_trait]
impl MediaFetcher for StaticMediaHost {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, MediaFetchError> {
        if url.ends_with("/missing") {
            return Err(MediaFetchError::NotFound(url.to_string()));
        }
        Ok(FetchedMedia::new("image/jpeg", url.as_bytes().to_vec()))
    }
}

struct Harness {
    ai: MockAIProvider,
    api: Arc<FakeVerificationApi>,
    store: Arc<InMemoryJourneyStore>,
    sender: Arc<RecordingSender>,
    register: RegisterContactHandler,
    messages: HandleMessageHandler,
}

fn harness() -> Harness {
    let ai = MockAIProvider::new();
    let api = Arc::new(FakeVerificationApi::default());
    let store = Arc::new(InMemoryJourneyStore::new());
    let sender = Arc::new(RecordingSender::new());

    let profile = IdentityProfile::new(api.clone(), Arc::new(StaticMediaHost));
    let catalog = Arc::new(ToolCatalog::from_specifications(profile.tool_specifications()).unwrap());
    let dispatcher = Arc::new(FunctionDispatcher::from_functions(&profile));
    let pipeline = Arc::new(ToolCallPipeline::new(
        Arc::new(ai.clone()),
        dispatcher.clone(),
        catalog,
    ));
    let writer = Arc::new(InstructionWriter::new(
        Arc::new(ai.clone()),
        InstructionConfig {
            institution: "Banco Uno".to_string(),
            ..InstructionConfig::default()
        },
    ));

    let locks = ClientLocks::new();
    let register = RegisterContactHandler::new(store.clone(), sender.clone(), "Banco Uno")
        .with_locks(locks.clone());
    let messages = HandleMessageHandler::new(store.clone(), sender.clone(), pipeline, dispatcher, writer)
        .with_locks(locks);

    Harness {
        ai,
        api,
        store,
        sender,
        register,
        messages,
    }
}

fn client() -> ClientId {
    ClientId::new("5215512345678").unwrap()
}

fn tool_call(name: &str, value: &str) -> String {
    format!(
        r#"<tool_call>{{"name": "{}", "arguments": {{"value": "{}"}}}}</tool_call>"#,
        name, value
    )
}

fn journey_steps() -> Vec<StepDescriptor> {
    vec![
        StepDescriptor::new("check_email_valid", "your email", "send you a verification code"),
        StepDescriptor::new("check_otp_valid", "the code we emailed you", "confirm your email")
            .with_available_functions(["check_otp_valid", "resend_otp"]),
        StepDescriptor::new("check_face_valid", "a selfie", "confirm it is you")
            .requiring_images(["image/*"]),
        StepDescriptor::new("check_ine_valid", "both sides of your ID", "register your identity")
            .requiring_images(["image/*"]),
    ]
}

async fn register_and_start(h: &Harness) {
    h.register
        .handle(RegisterContactCommand {
            client_id: client(),
            report_id: ReportId::new("rep-77").unwrap(),
            steps: journey_steps(),
            welcome_message: None,
        })
        .await
        .unwrap();
    h.messages.handle(InboundMessage::button(client(), "Start")).await;
    h.sender.clear();
}

fn photo(url: &str) -> MediaRef {
    MediaRef::new(url).with_content_type("image/jpeg")
}

// =============================================================================
// Journey Tests
// =============================================================================

#[tokio::test]
async fn registration_sends_welcome_and_waits_for_start() {
    let h = harness();

    let result = h
        .register
        .handle(RegisterContactCommand {
            client_id: client(),
            report_id: ReportId::new("rep-77").unwrap(),
            steps: journey_steps(),
            welcome_message: None,
        })
        .await
        .unwrap();

    assert_eq!(result.staged_steps, 4);
    assert!(result.notified);
    let sent = h.sender.texts_for(&client());
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("Banco Uno"));
    assert_eq!(sent[1], ConversationMessages::default().additional_info);

    let turn = h.messages.handle(InboundMessage::text(client(), "hola")).await;
    assert_eq!(turn, ConversationTurn::NoJourney);

    let turn = h.messages.handle(InboundMessage::button(client(), "Start")).await;
    assert_eq!(
        turn,
        ConversationTurn::Started {
            first_step: Some("check_email_valid".to_string())
        }
    );
}

#[tokio::test]
async fn email_and_otp_steps_complete_through_tool_calls() {
    let h = harness();
    register_and_start(&h).await;

    h.ai.push_purpose_response("tool_call", tool_call("check_email_valid", "Ana@Example.com"));
    let turn = h
        .messages
        .handle(InboundMessage::text(client(), "my mail is Ana@Example.com"))
        .await;

    assert_eq!(
        turn,
        ConversationTurn::Advanced {
            from: "check_email_valid".to_string(),
            next: Some("check_otp_valid".to_string())
        }
    );
    assert_eq!(*h.api.emails.lock().unwrap(), vec!["ana@example.com"]);
    assert_eq!(*h.api.otps_sent.lock().unwrap(), 1);
    assert_eq!(
        h.sender.texts_for(&client())[0],
        "Thanks! We sent a verification code to ana@example.com."
    );

    h.ai.push_purpose_response("tool_call", tool_call("check_otp_valid", "111111"));
    let turn = h.messages.handle(InboundMessage::text(client(), "111111")).await;
    assert!(matches!(
        turn,
        ConversationTurn::Replied { ref step, ref outcome } if step == "check_otp_valid" && !outcome.status
    ));

    h.ai.push_purpose_response("tool_call", tool_call("check_otp_valid", "123456"));
    let turn = h.messages.handle(InboundMessage::text(client(), "123456")).await;
    assert_eq!(
        turn,
        ConversationTurn::Advanced {
            from: "check_otp_valid".to_string(),
            next: Some("check_face_valid".to_string())
        }
    );
    assert_eq!(*h.api.otp_checks.lock().unwrap(), vec!["111111", "123456"]);
}

#[tokio::test]
async fn resend_is_offered_on_the_otp_step_without_advancing() {
    let h = harness();
    register_and_start(&h).await;
    h.ai.push_purpose_response("tool_call", tool_call("check_email_valid", "ana@example.com"));
    h.messages.handle(InboundMessage::text(client(), "ana@example.com")).await;

    h.ai.push_purpose_response("tool_call", tool_call("resend_otp", "send it again"));
    let turn = h
        .messages
        .handle(InboundMessage::text(client(), "I did not get the code"))
        .await;

    assert!(matches!(
        turn,
        ConversationTurn::Replied { ref step, ref outcome } if step == "check_otp_valid" && outcome.status
    ));
    assert_eq!(*h.api.otps_sent.lock().unwrap(), 2);
    let active = h.store.get_active_step(&client()).await.unwrap().unwrap();
    assert_eq!(active.function_id, "check_otp_valid");
}

#[tokio::test]
async fn catch_all_only_reply_never_advances() {
    let h = harness();
    register_and_start(&h).await;

    h.ai.push_purpose_response("tool_call", tool_call("generic_response", "what is this for?"));
    h.ai.push_purpose_response("explain_step", "We need your email to send you a code.");
    let turn = h
        .messages
        .handle(InboundMessage::text(client(), "what is this for?"))
        .await;

    assert_eq!(
        turn,
        ConversationTurn::Fallback {
            step: "check_email_valid".to_string()
        }
    );
    assert_eq!(
        h.sender.texts_for(&client()),
        vec!["We need your email to send you a code."]
    );
    assert!(h.api.emails.lock().unwrap().is_empty());
    let active = h.store.get_active_step(&client()).await.unwrap().unwrap();
    assert_eq!(active.function_id, "check_email_valid");
}

#[tokio::test]
async fn mixed_batch_with_invalid_call_is_discarded() {
    let h = harness();
    register_and_start(&h).await;

    let reply = format!(
        "{}\n{}",
        r#"<tool_call>{"name": "check_email_valid", "arguments": {}}</tool_call>"#,
        tool_call("generic_response", "hi")
    );
    h.ai.push_purpose_response("tool_call", reply);
    let turn = h.messages.handle(InboundMessage::text(client(), "hi")).await;

    assert_eq!(
        turn,
        ConversationTurn::Fallback {
            step: "check_email_valid".to_string()
        }
    );
    assert!(h.api.emails.lock().unwrap().is_empty());
}

#[tokio::test]
async fn functions_of_other_steps_are_not_dispatched() {
    let h = harness();
    register_and_start(&h).await;

    h.ai.push_purpose_response("tool_call", tool_call("check_otp_valid", "123456"));
    let turn = h.messages.handle(InboundMessage::text(client(), "123456")).await;

    assert_eq!(
        turn,
        ConversationTurn::Fallback {
            step: "check_email_valid".to_string()
        }
    );
    assert!(h.api.otp_checks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn media_steps_finish_the_journey() {
    let h = harness();
    register_and_start(&h).await;
    h.ai.push_purpose_response("tool_call", tool_call("check_email_valid", "ana@example.com"));
    h.messages.handle(InboundMessage::text(client(), "ana@example.com")).await;
    h.ai.push_purpose_response("tool_call", tool_call("check_otp_valid", "123456"));
    h.messages.handle(InboundMessage::text(client(), "123456")).await;

    let turn = h.messages.handle(InboundMessage::text(client(), "ok")).await;
    assert_eq!(
        turn,
        ConversationTurn::ImageRequested {
            step: "check_face_valid".to_string()
        }
    );

    let turn = h
        .messages
        .handle(InboundMessage::text(client(), "").with_media([photo("https://media/selfie")]))
        .await;
    assert_eq!(
        turn,
        ConversationTurn::Advanced {
            from: "check_face_valid".to_string(),
            next: Some("check_ine_valid".to_string())
        }
    );

    let turn = h
        .messages
        .handle(InboundMessage::text(client(), "").with_media([photo("https://media/front")]))
        .await;
    assert!(matches!(
        turn,
        ConversationTurn::Replied { ref step, .. } if step == "check_ine_valid"
    ));

    h.sender.clear();
    let turn = h
        .messages
        .handle(InboundMessage::text(client(), "").with_media([photo("https://media/back")]))
        .await;
    assert_eq!(
        turn,
        ConversationTurn::Advanced {
            from: "check_ine_valid".to_string(),
            next: None
        }
    );
    let sent = h.sender.texts_for(&client());
    assert_eq!(sent[0], ConversationMessages::default().processing_notice);
    assert_eq!(sent[1], "Thanks Ana Lopez, your ID was registered.");
    assert_eq!(sent[2], ConversationMessages::default().journey_complete);

    let journey = h.store.load(&client()).await.unwrap().unwrap();
    assert_eq!(journey.status(), JourneyStatus::AllComplete);

    let turn = h.messages.handle(InboundMessage::text(client(), "hello?")).await;
    assert_eq!(turn, ConversationTurn::JourneyComplete);
}

#[tokio::test]
async fn empty_model_reply_falls_back_without_advancing() {
    let h = harness();
    register_and_start(&h).await;

    h.ai.push_purpose_response("tool_call", "");
    let turn = h
        .messages
        .handle(InboundMessage::text(client(), "ana@example.com"))
        .await;
    assert!(matches!(turn, ConversationTurn::Fallback { .. }));

    let active = h.store.get_active_step(&client()).await.unwrap().unwrap();
    assert_eq!(active.function_id, "check_email_valid");
}

#[tokio::test]
async fn model_outage_asks_the_client_to_retry() {
    let h = harness();
    register_and_start(&h).await;

    let _ = h.ai.clone().with_purpose_error(
        "tool_call",
        MockError::Unavailable {
            message: "overloaded".to_string(),
        },
    );
    let turn = h
        .messages
        .handle(InboundMessage::text(client(), "ana@example.com"))
        .await;

    assert_eq!(
        turn,
        ConversationTurn::UpstreamRetry {
            step: "check_email_valid".to_string()
        }
    );
    assert_eq!(
        h.sender.texts_for(&client()),
        vec![ConversationMessages::default().retry_fallback]
    );
}
