//! HTTP handlers for the messaging webhook.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form,
};

use crate::application::HandleMessageHandler;

use super::dto::{inbound_from_form, EMPTY_TWIML};

#[derive(Clone)]
pub struct WebhookHandlers {
    message_handler: Arc<HandleMessageHandler>,
}

impl WebhookHandlers {
    pub fn new(message_handler: Arc<HandleMessageHandler>) -> Self {
        Self { message_handler }
    }
}

/// POST /webhook/messages - Inbound client message
///
/// The turn runs on its own task and the channel is acknowledged at once,
/// so a dropped connection or the request timeout cannot cancel it.
/// Ordering per client comes from the handler's lock table.
pub async fn receive_message(
    State(handlers): State<WebhookHandlers>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let message = match inbound_from_form(&form) {
        Ok(message) => message,
        Err(err) => {
            tracing::warn!(error = %err, "Webhook without sender");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    let handler = Arc::clone(&handlers.message_handler);
    tokio::spawn(async move {
        handler.handle(message).await;
    });
    twiml(EMPTY_TWIML)
}

fn twiml(body: &'static str) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}
