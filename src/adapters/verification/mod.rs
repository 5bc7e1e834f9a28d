//! Verification API adapters.

mod http_verification_service;

pub use http_verification_service::{HttpVerificationService, VerificationApiConfig};
