//! Contact command handlers.
//!
//! Registering a contact stages its verification steps and sends the
//! welcome; removing it deletes the journey.

mod register_contact;
mod remove_contact;

pub use register_contact::{
    RegisterContactCommand, RegisterContactError, RegisterContactHandler, RegisterContactResult,
};
pub use remove_contact::RemoveContactHandler;
