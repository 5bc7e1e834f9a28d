//! Redis-backed journey store.
//!
//! Each journey is stored as one JSON document under
//! `{prefix}:{client_id}`. The store performs plain GET/SET/DEL with no
//! cross-process locking. Per-client serialization comes from the
//! in-process `ClientLocks`, so one service instance must own the keys.
//! Journeys survive restarts but are not safe to share between replicas.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::ClientId;
use crate::domain::journey::ClientJourney;
use crate::ports::{JourneyStore, JourneyStoreError};

/// Default key prefix for journey documents.
pub const DEFAULT_KEY_PREFIX: &str = "verification:journey";

/// Redis journey store.
#[derive(Clone)]
pub struct RedisJourneyStore {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisJourneyStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    /// Connects to `url` and opens a multiplexed connection.
    pub async fn connect(url: &str) -> Result<Self, JourneyStoreError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        Ok(Self::new(conn))
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, client_id: &ClientId) -> String {
        journey_key(&self.key_prefix, client_id)
    }
}

fn journey_key(prefix: &str, client_id: &ClientId) -> String {
    format!("{}:{}", prefix, client_id.as_str())
}

fn unavailable(err: redis::RedisError) -> JourneyStoreError {
    JourneyStoreError::Unavailable(err.to_string())
}

#[async_trait]
impl JourneyStore for RedisJourneyStore {
    async fn load(&self, client_id: &ClientId) -> Result<Option<ClientJourney>, JourneyStoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.key(client_id)).await.map_err(unavailable)?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| JourneyStoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn save(&self, journey: &ClientJourney) -> Result<(), JourneyStoreError> {
        let json = serde_json::to_string(journey)
            .map_err(|e| JourneyStoreError::Serialization(e.to_string()))?;

        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.key(journey.client_id()), json)
            .await
            .map_err(unavailable)
    }

    async fn delete(&self, client_id: &ClientId) -> Result<bool, JourneyStoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(self.key(client_id)).await.map_err(unavailable)?;
        Ok(removed > 0)
    }
}
