//! Client profiles - concrete [`ClientFunctions`](crate::ports::ClientFunctions) sets.

mod identity;
mod identity_media;
mod identity_text;

pub use identity::{IdentityProfile, IdentityProfileConfig};
