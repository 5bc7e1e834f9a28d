//! Verification journeys - per-client ordered steps and their progress.

mod client_journey;
mod errors;
mod step;

pub use client_journey::{ClientJourney, JourneyStatus};
pub use errors::JourneyError;
pub use step::{MediaRef, StepDescriptor};
