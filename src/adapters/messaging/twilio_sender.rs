//! Twilio WhatsApp sender - MessageSender over the Twilio Messages API.
//!
//! Messages are posted as forms to
//! `{api_base}/2010-04-01/Accounts/{account_sid}/Messages.json` with the
//! account SID and auth token as basic auth. Client ids are phone numbers
//! without the `whatsapp:` channel prefix; it is added here.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

use crate::domain::foundation::ClientId;
use crate::ports::{MessageSender, SendError};

const CHANNEL_PREFIX: &str = "whatsapp:";

/// Twilio account settings.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    auth_token: Secret<String>,
    /// Sender number, with or without the `whatsapp:` prefix.
    pub from_number: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl TwilioConfig {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: Secret::new(auth_token.into()),
            from_number: from_number.into(),
            api_base: "https://api.twilio.com".to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

/// Sends WhatsApp messages through Twilio.
pub struct TwilioSender {
    config: TwilioConfig,
    client: Client,
}

impl TwilioSender {
    pub fn new(config: TwilioConfig) -> Result<Self, SendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SendError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

fn channel_address(number: &str) -> String {
    if number.starts_with(CHANNEL_PREFIX) {
        number.to_string()
    } else {
        format!("{}{}", CHANNEL_PREFIX, number)
    }
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send_text(&self, to: &ClientId, body: &str) -> Result<(), SendError> {
        let form = [
            ("From", channel_address(&self.config.from_number)),
            ("To", channel_address(to.as_str())),
            ("Body", body.to_string()),
        ];

        let response = self
            .client
            .post(self.config.messages_url())
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&form)
            .send()
            .await
            .map_err(|e| SendError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(client_id = %to, "Message sent");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        tracing::warn!(client_id = %to, status = %status, "Twilio rejected message");
        Err(error_for_status(status, detail))
    }
}

fn error_for_status(status: StatusCode, detail: String) -> SendError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        SendError::Unavailable(format!("{}: {}", status, detail))
    } else {
        SendError::Rejected(format!("{}: {}", status, detail))
    }
}
