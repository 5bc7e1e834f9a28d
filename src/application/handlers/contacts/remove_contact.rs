//! RemoveContactHandler - Command handler for deleting a client.

use std::sync::Arc;

use crate::application::client_locks::ClientLocks;
use crate::domain::foundation::ClientId;
use crate::ports::{JourneyStore, JourneyStoreError};

/// Handler for removing contacts and their journeys.
pub struct RemoveContactHandler {
    store: Arc<dyn JourneyStore>,
    locks: ClientLocks,
}

impl RemoveContactHandler {
    pub fn new(store: Arc<dyn JourneyStore>) -> Self {
        Self {
            store,
            locks: ClientLocks::new(),
        }
    }

    pub fn with_locks(mut self, locks: ClientLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Returns false when the client did not exist.
    pub async fn handle(&self, client_id: &ClientId) -> Result<bool, JourneyStoreError> {
        let _turn = self.locks.acquire(client_id).await;
        let removed = self.store.delete(client_id).await?;
        tracing::info!(client_id = %client_id, removed, "Contact removed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryJourneyStore;
    use crate::domain::journey::StepDescriptor;

    #[tokio::test]
    async fn removes_existing_contact_once() {
        let store = Arc::new(InMemoryJourneyStore::new());
        let client = ClientId::new("521").unwrap();
        store
            .initialize_journey(&client, vec![StepDescriptor::new("a", "x", "")])
            .await
            .unwrap();
        let handler = RemoveContactHandler::new(store.clone());

        assert!(handler.handle(&client).await.unwrap());
        assert!(!handler.handle(&client).await.unwrap());
        assert!(store.load(&client).await.unwrap().is_none());
    }
}
