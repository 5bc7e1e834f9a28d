//! HTTP DTOs for contact endpoints.

use serde::{Deserialize, Serialize};

use crate::application::RegisterContactResult;
use crate::domain::journey::StepDescriptor;

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Request to register a contact and stage its steps.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterContactRequest {
    pub client_id: String,
    pub report_id: String,
    pub steps: Vec<StepDescriptor>,
    #[serde(default)]
    pub welcome_message: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct RegisterContactResponse {
    pub client_id: String,
    pub staged_steps: usize,
    pub notified: bool,
}

impl From<RegisterContactResult> for RegisterContactResponse {
    fn from(result: RegisterContactResult) -> Self {
        Self {
            client_id: result.client_id.to_string(),
            staged_steps: result.staged_steps,
            notified: result.notified,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(resource_type: &str, id: &str) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            message: format!("{} not found: {}", resource_type, id),
            details: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            code: "SERVICE_UNAVAILABLE".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
        }
    }
}
