//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod contacts;
pub mod conversation;

pub use contacts::{
    RegisterContactCommand, RegisterContactError, RegisterContactHandler, RegisterContactResult,
    RemoveContactHandler,
};
pub use conversation::{ConversationTurn, HandleMessageHandler, InboundMessage};
