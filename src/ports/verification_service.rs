//! Verification Service Port - the external identity-verification API.
//!
//! Only the capabilities the verification profile needs are modeled:
//! email/OTP confirmation, face checks, and document extraction. All
//! operations are scoped to a case (`ReportId`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::ReportId;

/// Face quality assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceQuality {
    /// Whether a face was detected at all.
    pub detected: bool,
    /// Quality score, 0-100.
    pub score: f64,
}

/// Liveness (anti-spoofing) assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LivenessCheck {
    pub is_live: bool,
    pub score: f64,
}

/// Fields extracted from a proof of address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressExtraction {
    pub address: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub township: Option<String>,
}

/// Fields extracted from an ID card (front and back).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdExtraction {
    pub full_name: String,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub personal_number: Option<String>,
}

/// Port for the external verification API.
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Store the client's email on the case.
    async fn save_email(&self, report: &ReportId, email: &str) -> Result<(), VerificationError>;

    /// Send a one-time code to the case's email.
    async fn send_otp(&self, report: &ReportId) -> Result<(), VerificationError>;

    /// Check a one-time code. `Ok(false)` means the code was wrong.
    async fn verify_otp(&self, report: &ReportId, code: &str) -> Result<bool, VerificationError>;

    /// Assess the quality of a face image.
    async fn face_quality(&self, report: &ReportId, image: &[u8]) -> Result<FaceQuality, VerificationError>;

    /// Check that a face image comes from a live person.
    async fn face_liveness(&self, report: &ReportId, image: &[u8]) -> Result<LivenessCheck, VerificationError>;

    /// Extract address fields. `Ok(None)` means nothing usable was found.
    async fn extract_address(
        &self,
        report: &ReportId,
        document: &[u8],
        content_type: &str,
    ) -> Result<Option<AddressExtraction>, VerificationError>;

    /// Extract ID card fields. `Ok(None)` means the document was not recognised.
    async fn extract_id(
        &self,
        report: &ReportId,
        front: &[u8],
        back: &[u8],
    ) -> Result<Option<IdExtraction>, VerificationError>;
}

/// Verification API failures.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("verification request rejected: {0}")]
    Rejected(String),

    #[error("verification service unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected verification response: {0}")]
    InvalidResponse(String),
}
