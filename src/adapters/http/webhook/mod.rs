//! HTTP adapter for the messaging channel webhook.

mod dto;
mod handlers;
mod routes;

pub use dto::{inbound_from_form, EMPTY_TWIML};
pub use handlers::WebhookHandlers;
pub use routes::webhook_routes;
