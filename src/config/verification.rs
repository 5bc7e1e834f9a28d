//! Verification API configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Verification API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Base URL including the version prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    pub api_key: Option<Secret<String>>,

    pub api_secret: Option<Secret<String>>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl VerificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate verification configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("verification.base_url"));
        }
        if !is_set(&self.api_key) {
            return Err(ValidationError::MissingRequired("VERIFICATION__API_KEY"));
        }
        if !is_set(&self.api_secret) {
            return Err(ValidationError::MissingRequired("VERIFICATION__API_SECRET"));
        }
        Ok(())
    }
}

fn is_set(secret: &Option<Secret<String>>) -> bool {
    secret.as_ref().is_some_and(|s| !s.expose_secret().is_empty())
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_secret: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.nebuia.com/api/v1".to_string()
}

fn default_timeout() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_need_credentials() {
        let config = VerificationConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("VERIFICATION__API_KEY"))
        ));
    }

    #[test]
    fn test_valid_config() {
        let config = VerificationConfig {
            api_key: Some(Secret::new("key".to_string())),
            api_secret: Some(Secret::new("secret".to_string())),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let config = VerificationConfig {
            base_url: "api.example.com".to_string(),
            api_key: Some(Secret::new("key".to_string())),
            api_secret: Some(Secret::new("secret".to_string())),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidUrl(_))));
    }
}
