//! Conversation configuration - institution, language and message texts

use std::time::Duration;

use serde::Deserialize;

use crate::application::{ConversationMessages, IdentityProfileConfig, InstructionConfig};

use super::error::ValidationError;

/// Conversation configuration
///
/// Every message text is optional; unset texts keep the built-in defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Institution the assistant speaks for
    #[serde(default = "default_institution")]
    pub institution: String,

    /// Site offered to clients asking for more information
    pub website: Option<String>,

    /// Language model replies are written in
    #[serde(default = "default_language")]
    pub language: String,

    /// Welcome template; `{institution}` is replaced
    pub welcome_message: Option<String>,
    pub additional_info_message: Option<String>,
    pub start_process_message: Option<String>,
    pub processing_message: Option<String>,
    pub completion_message: Option<String>,
    pub retry_message: Option<String>,
    pub no_media_required_message: Option<String>,

    /// Largest amount a client may request
    #[serde(default = "default_max_request_amount")]
    pub max_request_amount: f64,

    /// Minimum selfie quality score, exclusive
    #[serde(default = "default_face_quality_threshold")]
    pub face_quality_threshold: f64,

    /// Deadline for one message turn, in seconds
    #[serde(default = "default_turn_timeout")]
    pub turn_timeout_secs: u64,
}

impl ConversationConfig {
    /// Message texts with configured overrides applied.
    pub fn messages(&self) -> ConversationMessages {
        let defaults = ConversationMessages::default();
        let pick = |value: &Option<String>, default: String| {
            value
                .as_ref()
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .unwrap_or(default)
        };

        ConversationMessages {
            welcome: pick(&self.welcome_message, defaults.welcome),
            additional_info: pick(&self.additional_info_message, defaults.additional_info),
            start_process: pick(&self.start_process_message, defaults.start_process),
            processing_notice: pick(&self.processing_message, defaults.processing_notice),
            journey_complete: pick(&self.completion_message, defaults.journey_complete),
            retry_fallback: pick(&self.retry_message, defaults.retry_fallback),
            media_not_required: pick(&self.no_media_required_message, defaults.media_not_required),
            unrecognised_function: defaults.unrecognised_function,
        }
    }

    /// Phrasing settings for the instruction writer.
    pub fn instruction_config(&self) -> InstructionConfig {
        InstructionConfig {
            institution: self.institution.clone(),
            website: self.website.clone(),
            language: self.language.clone(),
            ..InstructionConfig::default()
        }
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }

    pub fn profile_config(&self) -> IdentityProfileConfig {
        IdentityProfileConfig {
            max_request_amount: self.max_request_amount,
            face_quality_threshold: self.face_quality_threshold,
        }
    }

    /// Validate conversation configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.institution.trim().is_empty() {
            return Err(ValidationError::MissingRequired("CONVERSATION__INSTITUTION"));
        }
        if self.max_request_amount.is_nan() || self.max_request_amount <= 0.0 {
            return Err(ValidationError::InvalidMaxAmount);
        }
        if self.turn_timeout_secs == 0 {
            return Err(ValidationError::InvalidTurnTimeout);
        }
        Ok(())
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            institution: default_institution(),
            website: None,
            language: default_language(),
            welcome_message: None,
            additional_info_message: None,
            start_process_message: None,
            processing_message: None,
            completion_message: None,
            retry_message: None,
            no_media_required_message: None,
            max_request_amount: default_max_request_amount(),
            face_quality_threshold: default_face_quality_threshold(),
            turn_timeout_secs: default_turn_timeout(),
        }
    }
}

fn default_institution() -> String {
    "our institution".to_string()
}

fn default_language() -> String {
    "Spanish".to_string()
}

fn default_max_request_amount() -> f64 {
    20_000.0
}

fn default_face_quality_threshold() -> f64 {
    68.0
}

fn default_turn_timeout() -> u64 {
    90
}
