//! Messaging channel adapters.

mod recording_sender;
mod twilio_sender;

pub use recording_sender::{RecordingSender, SentMessage};
pub use twilio_sender::{TwilioConfig, TwilioSender};
