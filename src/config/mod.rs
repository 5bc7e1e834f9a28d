//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `VERIFICATION_AGENT` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use verification_agent::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr().unwrap());
//! ```

mod ai;
mod conversation;
mod error;
mod messaging;
mod redis;
mod server;
mod verification;

pub use ai::AiConfig;
pub use conversation::ConversationConfig;
pub use error::{ConfigError, ValidationError};
pub use messaging::MessagingConfig;
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};
pub use verification::VerificationConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Language model configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Redis configuration (journey storage)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Messaging channel configuration (Twilio)
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Verification API configuration
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Institution, language and message texts
    #[serde(default)]
    pub conversation: ConversationConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `VERIFICATION_AGENT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `VERIFICATION_AGENT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `VERIFICATION_AGENT__AI__API_KEY=...` -> `ai.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VERIFICATION_AGENT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.ai.validate()?;
        self.redis.validate()?;
        self.messaging.validate()?;
        self.verification.validate()?;
        self.conversation.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
