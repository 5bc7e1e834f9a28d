//! Journey storage adapters.
//!
//! - `InMemoryJourneyStore` - process-local map, for tests and development
//! - `RedisJourneyStore` - JSON documents in Redis

mod in_memory_journey_store;
mod redis_journey_store;

pub use in_memory_journey_store::InMemoryJourneyStore;
pub use redis_journey_store::{RedisJourneyStore, DEFAULT_KEY_PREFIX};
