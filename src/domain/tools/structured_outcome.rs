//! Structured outcome - the uniform result of a handler invocation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized result of executing a directive or a media handler.
///
/// Drives both the outgoing message and step advancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredOutcome {
    /// Whether the handler succeeded.
    pub status: bool,
    /// Text to show to the user, or to feed to the model for rephrasing.
    pub message: String,
    /// Whether the active step should be closed.
    #[serde(default)]
    pub mark_as_complete: bool,
    /// Whether `message` must be rephrased through the model before sending.
    #[serde(default)]
    pub response_with_llm: bool,
    /// Optional step-specific payload (e.g. extracted document fields).
    #[serde(default)]
    pub data: Option<Value>,
}

impl StructuredOutcome {
    /// A successful outcome that leaves the step open.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            mark_as_complete: false,
            response_with_llm: false,
            data: None,
        }
    }

    /// A successful outcome that closes the active step.
    pub fn completed(message: impl Into<String>) -> Self {
        Self::success(message).with_complete(true)
    }

    /// A failed outcome.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            mark_as_complete: false,
            response_with_llm: false,
            data: None,
        }
    }

    pub fn with_complete(mut self, complete: bool) -> Self {
        self.mark_as_complete = complete;
        self
    }

    pub fn with_llm_rephrase(mut self, rephrase: bool) -> Self {
        self.response_with_llm = rephrase;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// True when the step should advance after sending.
    pub fn advances_step(&self) -> bool {
        self.status && self.mark_as_complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completed_outcome_advances() {
        let outcome = StructuredOutcome::completed("OTP verified");
        assert!(outcome.status);
        assert!(outcome.advances_step());
    }

    #[test]
    fn failure_never_advances() {
        let outcome = StructuredOutcome::failure("bad code").with_complete(true);
        assert!(!outcome.advances_step());
    }

    #[test]
    fn serializes_with_camel_case_wire_names() {
        let outcome = StructuredOutcome::success("resent")
            .with_llm_rephrase(true)
            .with_data(json!({"email": "a@b.mx"}));
        let wire = serde_json::to_value(&outcome).unwrap();

        assert_eq!(wire["status"], true);
        assert_eq!(wire["markAsComplete"], false);
        assert_eq!(wire["responseWithLlm"], true);
        assert_eq!(wire["data"]["email"], "a@b.mx");
    }

    #[test]
    fn deserializes_with_missing_optional_flags() {
        let outcome: StructuredOutcome =
            serde_json::from_str(r#"{"status": false, "message": "nope"}"#).unwrap();
        assert_eq!(outcome, StructuredOutcome::failure("nope"));
    }
}
