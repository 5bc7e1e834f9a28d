//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, and error types that form the
//! vocabulary of the verification domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ClientId, ReportId};
pub use timestamp::Timestamp;
