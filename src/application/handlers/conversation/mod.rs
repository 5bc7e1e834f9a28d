//! Conversation handlers.
//!
//! Handles inbound client messages against the client's journey.

mod handle_message;

pub use handle_message::{ConversationTurn, HandleMessageHandler, InboundMessage};
