//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Language model providers (OpenAI-compatible, mock)
//! - `storage` - Journey stores (in-memory, Redis)
//! - `messaging` - Outbound channel senders (Twilio, recording)
//! - `media` - Media download over HTTP
//! - `verification` - External identity-verification API
//! - `http` - Webhook and REST endpoints

pub mod ai;
pub mod http;
pub mod media;
pub mod messaging;
pub mod storage;
pub mod verification;

pub use ai::{MockAIProvider, OpenAIConfig, OpenAIProvider};
pub use media::{HttpMediaFetcher, MediaCredentials};
pub use messaging::{RecordingSender, TwilioConfig, TwilioSender};
pub use storage::{InMemoryJourneyStore, RedisJourneyStore};
pub use verification::{HttpVerificationService, VerificationApiConfig};
