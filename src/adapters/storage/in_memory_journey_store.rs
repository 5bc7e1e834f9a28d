//! In-Memory Journey Store Adapter
//!
//! Keeps journeys in a process-local map.
//! Useful for testing and single-instance development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::ClientId;
use crate::domain::journey::ClientJourney;
use crate::ports::{JourneyStore, JourneyStoreError};

/// In-memory storage for client journeys
#[derive(Debug, Clone, Default)]
pub struct InMemoryJourneyStore {
    journeys: Arc<RwLock<HashMap<ClientId, ClientJourney>>>,
}

impl InMemoryJourneyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored journeys (useful for tests)
    pub async fn clear(&self) {
        self.journeys.write().await.clear();
    }

    /// Get the number of stored journeys
    pub async fn journey_count(&self) -> usize {
        self.journeys.read().await.len()
    }
}

#[async_trait]
impl JourneyStore for InMemoryJourneyStore {
    async fn load(&self, client_id: &ClientId) -> Result<Option<ClientJourney>, JourneyStoreError> {
        Ok(self.journeys.read().await.get(client_id).cloned())
    }

    async fn save(&self, journey: &ClientJourney) -> Result<(), JourneyStoreError> {
        self.journeys
            .write()
            .await
            .insert(journey.client_id().clone(), journey.clone());
        Ok(())
    }

    async fn delete(&self, client_id: &ClientId) -> Result<bool, JourneyStoreError> {
        Ok(self.journeys.write().await.remove(client_id).is_some())
    }
}
