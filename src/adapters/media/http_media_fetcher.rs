//! HTTP media fetcher - downloads channel media with basic auth.
//!
//! Twilio media URLs require the account SID and auth token; other hosts
//! are fetched without credentials when none are configured.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

use crate::ports::{FetchedMedia, MediaFetchError, MediaFetcher};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Credentials for protected media hosts.
#[derive(Debug, Clone)]
pub struct MediaCredentials {
    pub username: String,
    password: Secret<String>,
}

impl MediaCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password.into()),
        }
    }
}

/// Fetches media over HTTP(S).
pub struct HttpMediaFetcher {
    client: Client,
    credentials: Option<MediaCredentials>,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration) -> Result<Self, MediaFetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaFetchError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, credentials: MediaCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, MediaFetchError> {
        let mut request = self.client.get(url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(
                &credentials.username,
                Some(credentials.password.expose_secret()),
            );
        }

        let response = request
            .send()
            .await
            .map_err(|e| MediaFetchError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                return Err(MediaFetchError::NotFound(url.to_string()))
            }
            status => {
                tracing::warn!(url, status = %status, "Media download failed");
                return Err(MediaFetchError::Unavailable(format!("HTTP {}", status)));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaFetchError::Unavailable(e.to_string()))?;

        tracing::debug!(url, content_type = %content_type, size = bytes.len(), "Media downloaded");
        Ok(FetchedMedia::new(content_type, bytes.to_vec()))
    }
}
