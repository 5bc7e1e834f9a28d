//! HTTP adapters - REST and webhook endpoints.
//!
//! - `webhook` - inbound messages from the messaging channel
//! - `contacts` - contact registration, removal and the status probe

pub mod contacts;
pub mod webhook;

use axum::Router;

pub use contacts::{contact_routes, ContactHandlers, ErrorResponse};
pub use webhook::{webhook_routes, WebhookHandlers};

/// Merges every HTTP surface into one router.
pub fn api_router(webhook: WebhookHandlers, contacts: ContactHandlers) -> Router {
    Router::new()
        .merge(webhook_routes(webhook))
        .merge(contact_routes(contacts))
}
