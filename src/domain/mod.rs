//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `tools` - Tool specifications, catalog, response parsing and schema validation
//! - `journey` - Per-client verification steps and the step state machine

pub mod foundation;
pub mod journey;
pub mod tools;
