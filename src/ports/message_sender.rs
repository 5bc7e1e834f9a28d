//! Message Sender Port - outbound messages on the messaging channel.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::ClientId;

/// Port for delivering text to a client.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message.
    async fn send_text(&self, to: &ClientId, body: &str) -> Result<(), SendError>;
}

/// Delivery failures.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("channel rejected message: {0}")]
    Rejected(String),

    #[error("channel unavailable: {0}")]
    Unavailable(String),
}
