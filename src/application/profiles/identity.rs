//! Identity-verification profile.
//!
//! Text tools confirm contact data and the requested amount; media tools
//! validate a proof of address, a selfie and an ID card through the
//! external verification API.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::tools::{ParameterType, ToolSpecification};
use crate::ports::{
    ClientFunctions, MediaFetcher, MediaHandler, RegisteredTool, ToolHandler, VerificationService,
};

use super::identity_media::{CheckAddress, CheckFace, CheckIdCard};
use super::identity_text::{CheckAmount, CheckEmail, CheckName, CheckNumber, CheckOtp, ResendOtp};

/// Tunables of the identity profile.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProfileConfig {
    /// Largest amount a client may request.
    pub max_request_amount: f64,
    /// Minimum face quality score, exclusive.
    pub face_quality_threshold: f64,
}

impl Default for IdentityProfileConfig {
    fn default() -> Self {
        Self {
            max_request_amount: 20_000.0,
            face_quality_threshold: 68.0,
        }
    }
}

/// Tools and media validators for identity verification.
pub struct IdentityProfile {
    service: Arc<dyn VerificationService>,
    fetcher: Arc<dyn MediaFetcher>,
    config: IdentityProfileConfig,
}

impl IdentityProfile {
    pub fn new(service: Arc<dyn VerificationService>, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            service,
            fetcher,
            config: IdentityProfileConfig::default(),
        }
    }

    pub fn with_config(mut self, config: IdentityProfileConfig) -> Self {
        self.config = config;
        self
    }

    fn tool(name: &str, description: &str, value: &str, handler: Arc<dyn ToolHandler>) -> RegisteredTool {
        RegisteredTool::new(
            ToolSpecification::new(name, description).with_parameter(
                "value",
                ParameterType::String,
                value,
                true,
            ),
            handler,
        )
    }
}

impl ClientFunctions for IdentityProfile {
    fn tools(&self) -> Vec<RegisteredTool> {
        vec![
            Self::tool(
                "check_email_valid",
                "Validates and saves the client's email, then sends a verification code to it",
                "The email address written by the client",
                Arc::new(CheckEmail::new(self.service.clone())),
            ),
            Self::tool(
                "check_otp_valid",
                "Checks the 6-digit verification code the client received by email",
                "The code written by the client",
                Arc::new(CheckOtp::new(self.service.clone())),
            ),
            Self::tool(
                "resend_otp",
                "Sends a new verification code when the client did not receive it or asks for another one",
                "The client's request",
                Arc::new(ResendOtp::new(self.service.clone())),
            ),
            Self::tool(
                "check_amount_to_request",
                "Registers the amount of money the client wants to request",
                "The amount as a number, without currency symbols",
                Arc::new(CheckAmount::new(self.config.max_request_amount)),
            ),
            Self::tool(
                "check_name_valid",
                "Registers the client's full name",
                "The full name written by the client",
                Arc::new(CheckName),
            ),
            Self::tool(
                "check_number_valid",
                "Registers the client's 8-digit number",
                "The number written by the client",
                Arc::new(CheckNumber),
            ),
        ]
    }

    fn media_tools(&self) -> HashMap<String, Arc<dyn MediaHandler>> {
        let mut tools: HashMap<String, Arc<dyn MediaHandler>> = HashMap::new();
        tools.insert(
            "check_address_valid".to_string(),
            Arc::new(CheckAddress::new(self.service.clone(), self.fetcher.clone())),
        );
        tools.insert(
            "check_face_valid".to_string(),
            Arc::new(CheckFace::new(
                self.service.clone(),
                self.fetcher.clone(),
                self.config.face_quality_threshold,
            )),
        );
        tools.insert(
            "check_ine_valid".to_string(),
            Arc::new(CheckIdCard::new(self.service.clone(), self.fetcher.clone())),
        );
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    use crate::domain::foundation::{ClientId, ReportId};
    use crate::domain::journey::{MediaRef, StepDescriptor};
    use crate::domain::tools::{SchemaValidator, StructuredOutcome, ToolCallDirective, ToolCatalog};
    use crate::ports::{
        AddressExtraction, ExecutionContext, FaceQuality, FetchedMedia, HandlerError,
        IdExtraction, LivenessCheck, MediaDisposition, MediaFetchError, VerificationError,
    };

    #[derive(Default)]
    struct FakeService {
        saved_emails: Mutex<Vec<String>>,
        otps_sent: Mutex<usize>,
        reject_email: bool,
        quality: Option<FaceQuality>,
        live: bool,
        id: Option<IdExtraction>,
    }

    #[async_trait]
    impl VerificationService for FakeService {
        async fn save_email(&self, _report: &ReportId, email: &str) -> Result<(), VerificationError> {
            if self.reject_email {
                return Err(VerificationError::Rejected("blocked domain".to_string()));
            }
            self.saved_emails.lock().unwrap().push(email.to_string());
            Ok(())
        }

        async fn send_otp(&self, _report: &ReportId) -> Result<(), VerificationError> {
            *self.otps_sent.lock().unwrap() += 1;
            Ok(())
        }

        async fn verify_otp(&self, _report: &ReportId, code: &str) -> Result<bool, VerificationError> {
            Ok(code == "123456")
        }

        async fn face_quality(&self, _report: &ReportId, _image: &[u8]) -> Result<FaceQuality, VerificationError> {
            self.quality
                .ok_or_else(|| VerificationError::Unavailable("no quality".to_string()))
        }

        async fn face_liveness(&self, _report: &ReportId, _image: &[u8]) -> Result<LivenessCheck, VerificationError> {
            Ok(LivenessCheck {
                is_live: self.live,
                score: 0.9,
            })
        }

        async fn extract_address(
            &self,
            _report: &ReportId,
            document: &[u8],
            _content_type: &str,
        ) -> Result<Option<AddressExtraction>, VerificationError> {
            Ok((!document.is_empty()).then(|| AddressExtraction {
                address: "Av. Juarez 10".to_string(),
                postal_code: Some("06000".to_string()),
                township: None,
            }))
        }

        async fn extract_id(
            &self,
            _report: &ReportId,
            _front: &[u8],
            _back: &[u8],
        ) -> Result<Option<IdExtraction>, VerificationError> {
            Ok(self.id.clone())
        }
    }

    struct FakeFetcher;

    #[async_trait]
    impl MediaFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedMedia, MediaFetchError> {
            match url {
                "https://media/pdf" => Ok(FetchedMedia::new("application/pdf", vec![1, 2, 3])),
                "https://media/missing" => Err(MediaFetchError::NotFound(url.to_string())),
                _ => Ok(FetchedMedia::new("image/jpeg", vec![9, 9])),
            }
        }
    }

    fn profile(service: FakeService) -> (Arc<FakeService>, IdentityProfile) {
        let service = Arc::new(service);
        let profile = IdentityProfile::new(service.clone(), Arc::new(FakeFetcher));
        (service, profile)
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new(ClientId::new("521").unwrap())
            .with_report_id(Some(ReportId::new("rep-1").unwrap()))
    }

    async fn call(
        profile: &IdentityProfile,
        name: &str,
        value: &str,
        ctx: &ExecutionContext,
    ) -> Result<StructuredOutcome, HandlerError> {
        let catalog = ToolCatalog::from_specifications(profile.tool_specifications()).unwrap();
        let validated = SchemaValidator::new()
            .validate(&ToolCallDirective::with_value(name, value), &catalog)
            .unwrap();
        let tool = profile
            .tools()
            .into_iter()
            .find(|t| t.name() == name)
            .unwrap();
        tool.handler.invoke(&validated, ctx).await
    }

    fn media_step(function: &str, urls: &[&str]) -> StepDescriptor {
        let mut step = StepDescriptor::new(function, "a photo", "").requiring_images(["image/*"]);
        step.images = urls.iter().map(|u| MediaRef::new(*u)).collect();
        step
    }

    #[test]
    fn declares_every_tool_with_value_parameter() {
        let (_, profile) = profile(FakeService::default());
        let names: Vec<String> = profile.tools().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "check_email_valid",
                "check_otp_valid",
                "resend_otp",
                "check_amount_to_request",
                "check_name_valid",
                "check_number_valid",
            ]
        );
        for spec in profile.tool_specifications() {
            assert!(spec.is_required("value"));
        }

        let mut media: Vec<String> = profile.media_tools().into_keys().collect();
        media.sort();
        assert_eq!(media, vec!["check_address_valid", "check_face_valid", "check_ine_valid"]);
    }

    #[tokio::test]
    async fn email_is_saved_and_code_sent() {
        let (service, profile) = profile(FakeService::default());

        let outcome = call(&profile, "check_email_valid", "Mi correo es ANA@Mail.com", &context())
            .await
            .unwrap();

        assert!(outcome.advances_step());
        assert_eq!(outcome.data, Some(json!({ "email": "ana@mail.com" })));
        assert_eq!(*service.saved_emails.lock().unwrap(), vec!["ana@mail.com"]);
        assert_eq!(*service.otps_sent.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn malformed_email_fails_without_calling_service() {
        let (service, profile) = profile(FakeService::default());

        let outcome = call(&profile, "check_email_valid", "not an email", &context()).await.unwrap();

        assert!(!outcome.status);
        assert!(service.saved_emails.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_email_is_a_failure_outcome() {
        let (_, profile) = profile(FakeService {
            reject_email: true,
            ..FakeService::default()
        });

        let outcome = call(&profile, "check_email_valid", "a@b.com", &context()).await.unwrap();
        assert!(!outcome.status);
    }

    #[tokio::test]
    async fn email_needs_a_case() {
        let (_, profile) = profile(FakeService::default());
        let ctx = ExecutionContext::new(ClientId::new("521").unwrap());

        let result = call(&profile, "check_email_valid", "a@b.com", &ctx).await;
        assert!(matches!(result, Err(HandlerError::MissingContext("report_id"))));
    }

    #[tokio::test]
    async fn otp_checks_format_then_service() {
        let (_, profile) = profile(FakeService::default());

        assert!(call(&profile, "check_otp_valid", "123456", &context()).await.unwrap().advances_step());
        assert!(!call(&profile, "check_otp_valid", "654321", &context()).await.unwrap().status);
        assert!(!call(&profile, "check_otp_valid", "12 34", &context()).await.unwrap().status);
    }

    #[tokio::test]
    async fn resend_never_completes() {
        let (service, profile) = profile(FakeService::default());

        let outcome = call(&profile, "resend_otp", "send it again", &context()).await.unwrap();

        assert!(outcome.status);
        assert!(!outcome.advances_step());
        assert_eq!(*service.otps_sent.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn amount_is_bounded() {
        let (_, profile) = profile(FakeService::default());

        assert!(call(&profile, "check_amount_to_request", "$15,000", &context()).await.unwrap().advances_step());
        assert!(!call(&profile, "check_amount_to_request", "25000", &context()).await.unwrap().status);
        assert!(!call(&profile, "check_amount_to_request", "mucho", &context()).await.unwrap().status);
    }

    #[tokio::test]
    async fn name_and_number_rules() {
        let (_, profile) = profile(FakeService::default());

        assert!(call(&profile, "check_name_valid", "Ana Pérez", &context()).await.unwrap().advances_step());
        assert!(!call(&profile, "check_name_valid", "  ", &context()).await.unwrap().status);
        assert!(call(&profile, "check_number_valid", "1234 5678", &context()).await.unwrap().advances_step());
        assert!(!call(&profile, "check_number_valid", "1234567", &context()).await.unwrap().status);
    }

    #[tokio::test]
    async fn face_below_threshold_is_rejected() {
        let (_, profile) = profile(FakeService {
            quality: Some(FaceQuality { detected: true, score: 68.0 }),
            live: true,
            ..FakeService::default()
        });
        let handler = profile.media_tools().remove("check_face_valid").unwrap();

        let verdict = handler
            .handle(&media_step("check_face_valid", &["https://media/selfie"]), &context())
            .await
            .unwrap();

        assert!(!verdict.outcome.status);
        assert_eq!(verdict.disposition, MediaDisposition::Reset);
    }

    #[tokio::test]
    async fn clear_live_face_is_accepted() {
        let (_, profile) = profile(FakeService {
            quality: Some(FaceQuality { detected: true, score: 91.0 }),
            live: true,
            ..FakeService::default()
        });
        let handler = profile.media_tools().remove("check_face_valid").unwrap();

        let verdict = handler
            .handle(&media_step("check_face_valid", &["https://media/selfie"]), &context())
            .await
            .unwrap();

        assert!(verdict.outcome.advances_step());
    }

    #[tokio::test]
    async fn spoofed_face_is_rejected() {
        let (_, profile) = profile(FakeService {
            quality: Some(FaceQuality { detected: true, score: 91.0 }),
            live: false,
            ..FakeService::default()
        });
        let handler = profile.media_tools().remove("check_face_valid").unwrap();

        let verdict = handler
            .handle(&media_step("check_face_valid", &["https://media/selfie"]), &context())
            .await
            .unwrap();

        assert_eq!(verdict.disposition, MediaDisposition::Reset);
    }

    #[tokio::test]
    async fn id_card_waits_for_back() {
        let (_, profile) = profile(FakeService::default());
        let handler = profile.media_tools().remove("check_ine_valid").unwrap();

        let verdict = handler
            .handle(&media_step("check_ine_valid", &["https://media/front"]), &context())
            .await
            .unwrap();

        assert!(!verdict.outcome.status);
        assert_eq!(verdict.disposition, MediaDisposition::Keep);
    }

    #[tokio::test]
    async fn id_card_with_both_sides_is_extracted() {
        let (_, profile) = profile(FakeService {
            id: Some(IdExtraction {
                full_name: "ANA PEREZ".to_string(),
                document_number: Some("123".to_string()),
                personal_number: None,
            }),
            ..FakeService::default()
        });
        let handler = profile.media_tools().remove("check_ine_valid").unwrap();

        let verdict = handler
            .handle(
                &media_step("check_ine_valid", &["https://media/front", "https://media/back"]),
                &context(),
            )
            .await
            .unwrap();

        assert!(verdict.outcome.advances_step());
        assert!(verdict.outcome.message.contains("ANA PEREZ"));
    }

    #[tokio::test]
    async fn address_rejects_unaccepted_type() {
        let (_, profile) = profile(FakeService::default());
        let handler = profile.media_tools().remove("check_address_valid").unwrap();

        let verdict = handler
            .handle(&media_step("check_address_valid", &["https://media/pdf"]), &context())
            .await
            .unwrap();

        assert!(!verdict.outcome.status);
        assert_eq!(verdict.disposition, MediaDisposition::Reset);
    }

    #[tokio::test]
    async fn address_is_extracted() {
        let (_, profile) = profile(FakeService::default());
        let handler = profile.media_tools().remove("check_address_valid").unwrap();

        let verdict = handler
            .handle(&media_step("check_address_valid", &["https://media/photo"]), &context())
            .await
            .unwrap();

        assert!(verdict.outcome.advances_step());
        assert_eq!(verdict.outcome.data.as_ref().unwrap()["postal_code"], "06000");
    }

    #[tokio::test]
    async fn missing_media_is_an_error() {
        let (_, profile) = profile(FakeService::default());
        let handler = profile.media_tools().remove("check_address_valid").unwrap();

        let result = handler
            .handle(&media_step("check_address_valid", &["https://media/missing"]), &context())
            .await;

        assert!(matches!(result, Err(HandlerError::MediaFetch(_))));
    }
}
