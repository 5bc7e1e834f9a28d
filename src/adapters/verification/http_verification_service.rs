//! HTTP Verification Service - VerificationService over the verification REST API.
//!
//! Every endpoint is scoped by a `report` query parameter and answers with
//! an envelope `{ "status": bool, "payload": ... }`. Credentials travel in
//! the `api_key` / `api_secret` headers.
//!
//! | Operation        | Request                                         |
//! |------------------|-------------------------------------------------|
//! | save email       | `PUT  /services/email` `{ "email" }`            |
//! | send OTP         | `GET  /services/otp/generate/email`             |
//! | verify OTP       | `GET  /services/otp/validate/email/{code}`      |
//! | face quality     | `POST /services/face/quality` multipart `face`  |
//! | face liveness    | `POST /services/face` multipart `face`          |
//! | proof of address | `POST /services/address` multipart `document`   |
//! | ID card          | `POST /services/id` multipart `front`, `back`   |

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::domain::foundation::ReportId;
use crate::ports::{
    AddressExtraction, FaceQuality, IdExtraction, LivenessCheck, VerificationError,
    VerificationService,
};

/// Verification API settings.
#[derive(Debug, Clone)]
pub struct VerificationApiConfig {
    /// Base URL including the version prefix, e.g. `https://api.example.com/api/v1`.
    pub base_url: String,
    api_key: Secret<String>,
    api_secret: Secret<String>,
    pub timeout: Duration,
}

impl VerificationApiConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: Secret::new(api_key.into()),
            api_secret: Secret::new(api_secret.into()),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    payload: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LivenessPayload {
    status: bool,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct AddressPayload {
    #[serde(default)]
    address: Vec<String>,
    #[serde(default)]
    zone: Option<AddressZone>,
}

#[derive(Debug, Deserialize)]
struct AddressZone {
    #[serde(default)]
    cp_id: Option<Value>,
    #[serde(default)]
    township: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdPayload {
    #[serde(default)]
    names: Option<IdNames>,
    #[serde(default)]
    document_number: Option<Value>,
    #[serde(default)]
    personal_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdNames {
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    last_name: Option<String>,
}

/// Renders a scalar that the API sends either as string or number.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl AddressPayload {
    fn into_extraction(self) -> Option<AddressExtraction> {
        let address = self.address.into_iter().next()?;
        let (postal_code, township) = match self.zone {
            Some(zone) => (zone.cp_id.as_ref().and_then(scalar_text), zone.township),
            None => (None, None),
        };
        Some(AddressExtraction {
            address,
            postal_code,
            township,
        })
    }
}

impl IdPayload {
    fn into_extraction(self) -> Option<IdExtraction> {
        let names = self.names?;
        let full_name = names
            .names
            .into_iter()
            .chain(names.last_name)
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full_name.is_empty() {
            return None;
        }
        Some(IdExtraction {
            full_name,
            document_number: self.document_number.as_ref().and_then(scalar_text),
            personal_number: self.personal_number,
        })
    }
}

/// REST client for the verification API.
pub struct HttpVerificationService {
    config: VerificationApiConfig,
    client: Client,
}

impl HttpVerificationService {
    pub fn new(config: VerificationApiConfig) -> Result<Self, VerificationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VerificationError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn authorized(&self, builder: RequestBuilder, report: &ReportId) -> RequestBuilder {
        builder
            .query(&[("report", report.as_str())])
            .header("api_key", self.config.api_key.expose_secret())
            .header("api_secret", self.config.api_secret.expose_secret())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        operation: &'static str,
    ) -> Result<Envelope<T>, VerificationError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(operation, error = %e, "Verification API request failed");
            VerificationError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(VerificationError::Unavailable(format!("{}: HTTP {}", operation, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VerificationError::Unavailable(e.to_string()))?;
        decode_envelope(&body, operation)
    }

    /// Sends and requires `status: true`.
    async fn send_ok<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        operation: &'static str,
    ) -> Result<Option<T>, VerificationError> {
        let envelope = self.send::<T>(builder, operation).await?;
        if envelope.status {
            Ok(envelope.payload)
        } else {
            Err(VerificationError::Rejected(format!("{} returned status false", operation)))
        }
    }

    fn image_part(bytes: &[u8], file_name: &str) -> Result<Part, VerificationError> {
        Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")
            .map_err(|e| VerificationError::InvalidResponse(e.to_string()))
    }
}

/// Decodes the envelope; the payload is only typed when `status` is true,
/// since failed calls carry free-form payloads.
fn decode_envelope<T: DeserializeOwned>(body: &str, operation: &str) -> Result<Envelope<T>, VerificationError> {
    let invalid = |e: serde_json::Error| VerificationError::InvalidResponse(format!("{}: {}", operation, e));

    let raw: Envelope<Value> = serde_json::from_str(body).map_err(invalid)?;
    let payload = match raw.payload {
        Some(payload) if raw.status && !payload.is_null() => {
            Some(serde_json::from_value(payload).map_err(invalid)?)
        }
        _ => None,
    };
    Ok(Envelope {
        status: raw.status,
        payload,
    })
}

#[async_trait]
impl VerificationService for HttpVerificationService {
    async fn save_email(&self, report: &ReportId, email: &str) -> Result<(), VerificationError> {
        let request = self.authorized(
            self.client
                .put(self.config.url("/services/email"))
                .json(&serde_json::json!({ "email": email })),
            report,
        );
        self.send_ok::<Value>(request, "save_email").await.map(|_| ())
    }

    async fn send_otp(&self, report: &ReportId) -> Result<(), VerificationError> {
        let request = self.authorized(
            self.client.get(self.config.url("/services/otp/generate/email")),
            report,
        );
        self.send_ok::<Value>(request, "send_otp").await.map(|_| ())
    }

    async fn verify_otp(&self, report: &ReportId, code: &str) -> Result<bool, VerificationError> {
        let path = format!("/services/otp/validate/email/{}", code);
        let request = self.authorized(self.client.get(self.config.url(&path)), report);
        let envelope = self.send::<Value>(request, "verify_otp").await?;
        Ok(envelope.status)
    }

    async fn face_quality(&self, report: &ReportId, image: &[u8]) -> Result<FaceQuality, VerificationError> {
        let form = Form::new().part("face", Self::image_part(image, "face.jpg")?);
        let request = self.authorized(
            self.client.post(self.config.url("/services/face/quality")).multipart(form),
            report,
        );
        let envelope = self.send::<Value>(request, "face_quality").await?;
        let score = envelope.payload.as_ref().and_then(Value::as_f64);
        Ok(match (envelope.status, score) {
            (true, Some(score)) => FaceQuality { detected: true, score },
            _ => FaceQuality { detected: false, score: 0.0 },
        })
    }

    async fn face_liveness(&self, report: &ReportId, image: &[u8]) -> Result<LivenessCheck, VerificationError> {
        let form = Form::new().part("face", Self::image_part(image, "face.jpg")?);
        let request = self.authorized(
            self.client.post(self.config.url("/services/face")).multipart(form),
            report,
        );
        let envelope = self.send::<LivenessPayload>(request, "face_liveness").await?;
        Ok(match (envelope.status, envelope.payload) {
            (true, Some(payload)) => LivenessCheck {
                is_live: payload.status,
                score: payload.score,
            },
            _ => LivenessCheck { is_live: false, score: 0.0 },
        })
    }

    async fn extract_address(
        &self,
        report: &ReportId,
        document: &[u8],
        content_type: &str,
    ) -> Result<Option<AddressExtraction>, VerificationError> {
        let file_name = if content_type.starts_with("application/pdf") {
            "document.pdf"
        } else {
            "document.jpg"
        };
        let part = Part::bytes(document.to_vec())
            .file_name(file_name)
            .mime_str(content_type)
            .map_err(|e| VerificationError::InvalidResponse(e.to_string()))?;
        let request = self.authorized(
            self.client
                .post(self.config.url("/services/address"))
                .multipart(Form::new().part("document", part)),
            report,
        );

        let envelope = self.send::<AddressPayload>(request, "extract_address").await?;
        if !envelope.status {
            return Ok(None);
        }
        Ok(envelope.payload.and_then(AddressPayload::into_extraction))
    }

    async fn extract_id(
        &self,
        report: &ReportId,
        front: &[u8],
        back: &[u8],
    ) -> Result<Option<IdExtraction>, VerificationError> {
        let form = Form::new()
            .part("front", Self::image_part(front, "front.jpg")?)
            .part("back", Self::image_part(back, "back.jpg")?);
        let request = self.authorized(
            self.client.post(self.config.url("/services/id")).multipart(form),
            report,
        );

        let envelope = self.send::<IdPayload>(request, "extract_id").await?;
        if !envelope.status {
            return Ok(None);
        }
        Ok(envelope.payload.and_then(IdPayload::into_extraction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let config = VerificationApiConfig::new("https://api.example.com/api/v1/", "k", "s");
        assert_eq!(
            config.url("/services/email"),
            "https://api.example.com/api/v1/services/email"
        );
    }

    #[test]
    fn address_payload_takes_first_line_and_zone() {
        let envelope: Envelope<AddressPayload> = decode_envelope(
            r#"{"status": true, "payload": {"address": ["Av. Juarez 10", "Centro"],
                "zone": {"cp_id": "06000", "township": "Centro"}, "valid": true}}"#,
            "extract_address",
        )
        .unwrap();

        let extraction = envelope.payload.unwrap().into_extraction().unwrap();
        assert_eq!(extraction.address, "Av. Juarez 10");
        assert_eq!(extraction.postal_code.as_deref(), Some("06000"));
        assert_eq!(extraction.township.as_deref(), Some("Centro"));
    }

    #[test]
    fn address_without_lines_is_none() {
        let payload: AddressPayload = serde_json::from_str(r#"{"address": []}"#).unwrap();
        assert!(payload.into_extraction().is_none());
    }

    #[test]
    fn id_payload_joins_names() {
        let envelope: Envelope<IdPayload> = decode_envelope(
            r#"{"status": true, "payload": {"names": {"names": ["ANA", "MARIA"], "last_name": "PEREZ"},
                "document_number": 123456, "personal_number": "PEMA800101"}}"#,
            "extract_id",
        )
        .unwrap();

        let extraction = envelope.payload.unwrap().into_extraction().unwrap();
        assert_eq!(extraction.full_name, "ANA MARIA PEREZ");
        assert_eq!(extraction.document_number.as_deref(), Some("123456"));
    }

    #[test]
    fn envelope_without_payload_decodes() {
        let envelope: Envelope<Value> = decode_envelope(r#"{"status": false}"#, "send_otp").unwrap();
        assert!(!envelope.status);
        assert!(envelope.payload.is_none());
    }

    #[test]
    fn failed_call_ignores_payload_shape() {
        let envelope: Envelope<AddressPayload> =
            decode_envelope(r#"{"status": false, "payload": "document not readable"}"#, "extract_address")
                .unwrap();
        assert!(envelope.payload.is_none());
    }

    #[test]
    fn non_json_is_invalid_response() {
        let result = decode_envelope::<Value>("<html>", "send_otp");
        assert!(matches!(result, Err(VerificationError::InvalidResponse(_))));
    }

    #[test]
    fn scalar_text_handles_strings_and_numbers() {
        assert_eq!(scalar_text(&serde_json::json!("06000")), Some("06000".to_string()));
        assert_eq!(scalar_text(&serde_json::json!(6000)), Some("6000".to_string()));
        assert_eq!(scalar_text(&serde_json::json!(null)), None);
    }
}
