//! Messaging channel configuration (Twilio WhatsApp)

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::error::ValidationError;

/// Messaging configuration
///
/// When no account is configured, outbound messages are only recorded
/// in memory and logged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagingConfig {
    /// Twilio account SID
    pub account_sid: Option<String>,

    /// Twilio auth token; also used to download media
    pub auth_token: Option<Secret<String>>,

    /// Sender number
    pub from_number: Option<String>,

    /// Override of the Twilio API base URL
    pub api_base_url: Option<String>,
}

impl MessagingConfig {
    /// Check if a Twilio account is configured
    pub fn is_configured(&self) -> bool {
        self.account_sid.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Validate messaging configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.is_configured() {
            return Ok(());
        }
        if !self
            .auth_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
        {
            return Err(ValidationError::MissingRequired("MESSAGING__AUTH_TOKEN"));
        }
        if !self.from_number.as_ref().is_some_and(|n| !n.is_empty()) {
            return Err(ValidationError::MissingRequired("MESSAGING__FROM_NUMBER"));
        }
        if let Some(url) = &self.api_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidUrl("messaging.api_base_url"));
            }
        }
        Ok(())
    }
}
