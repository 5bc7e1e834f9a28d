//! Recording sender - keeps outbound messages in memory.
//!
//! Used by tests and by local runs without a messaging account.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::foundation::ClientId;
use crate::ports::{MessageSender, SendError};

/// A message captured by [`RecordingSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: ClientId,
    pub body: String,
}

/// MessageSender that records instead of delivering.
#[derive(Debug, Clone, Default)]
pub struct RecordingSender {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, Vec<SentMessage>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every message sent so far, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.locked().clone()
    }

    /// Bodies sent to one client, in order.
    pub fn texts_for(&self, client_id: &ClientId) -> Vec<String> {
        self.locked()
            .iter()
            .filter(|m| &m.to == client_id)
            .map(|m| m.body.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.locked().clear();
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_text(&self, to: &ClientId, body: &str) -> Result<(), SendError> {
        tracing::info!(client_id = %to, body, "Recorded outbound message");
        self.locked().push(SentMessage {
            to: to.clone(),
            body: body.to_string(),
        });
        Ok(())
    }
}
