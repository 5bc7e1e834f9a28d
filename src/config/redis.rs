//! Redis configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Redis configuration
///
/// Without a URL the service keeps journeys in memory.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: Option<String>,

    /// Prefix of journey keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl RedisConfig {
    /// The configured URL, ignoring blank values.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.url() {
            Some(url) if !url.starts_with("redis://") && !url.starts_with("rediss://") => {
                Err(ValidationError::InvalidRedisUrl)
            }
            _ => Ok(()),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_key_prefix() -> String {
    crate::adapters::storage::DEFAULT_KEY_PREFIX.to_string()
}
