//! Verification Agent - Conversational identity verification over chat
//!
//! This crate drives per-client verification journeys on a messaging
//! channel: a language model interprets each client message as tool calls,
//! which are validated against a catalog and dispatched to business
//! handlers that decide whether the client's current step is complete.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
