//! Media Fetcher Port - downloads media referenced by inbound messages.

use async_trait::async_trait;
use thiserror::Error;

/// Downloaded media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    /// Content type reported by the media host.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FetchedMedia {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Port for fetching media by URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, MediaFetchError>;
}

/// Media download failures.
#[derive(Debug, Error)]
pub enum MediaFetchError {
    #[error("media not found: {0}")]
    NotFound(String),

    #[error("media host unavailable: {0}")]
    Unavailable(String),
}
