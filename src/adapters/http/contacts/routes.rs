//! HTTP routes for contact endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{register_contact, remove_contact, status, ContactHandlers};

/// Creates the contact router, including the status probe.
pub fn contact_routes(handlers: ContactHandlers) -> Router {
    Router::new()
        .route("/contacts", post(register_contact))
        .route("/contacts/:client_id", delete(remove_contact))
        .route("/status", get(status))
        .with_state(handlers)
}
