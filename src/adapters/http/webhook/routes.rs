//! HTTP routes for the messaging webhook.

use axum::{routing::post, Router};

use super::handlers::{receive_message, WebhookHandlers};

/// Creates the webhook router.
pub fn webhook_routes(handlers: WebhookHandlers) -> Router {
    Router::new()
        .route("/webhook/messages", post(receive_message))
        .with_state(handlers)
}
