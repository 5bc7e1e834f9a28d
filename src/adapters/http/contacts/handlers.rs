//! HTTP handlers for contact endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::{
    RegisterContactCommand, RegisterContactError, RegisterContactHandler, RemoveContactHandler,
};
use crate::domain::foundation::{ClientId, ReportId};
use crate::ports::JourneyStoreError;

use super::dto::{ErrorResponse, RegisterContactRequest, RegisterContactResponse, StatusResponse};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ContactHandlers {
    register_handler: Arc<RegisterContactHandler>,
    remove_handler: Arc<RemoveContactHandler>,
}

impl ContactHandlers {
    pub fn new(
        register_handler: Arc<RegisterContactHandler>,
        remove_handler: Arc<RemoveContactHandler>,
    ) -> Self {
        Self {
            register_handler,
            remove_handler,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /contacts - Register a contact and send the welcome
pub async fn register_contact(
    State(handlers): State<ContactHandlers>,
    Json(req): Json<RegisterContactRequest>,
) -> Response {
    let ids = ClientId::new(req.client_id).and_then(|c| Ok((c, ReportId::new(req.report_id)?)));
    let (client_id, report_id) = match ids {
        Ok(ids) => ids,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::bad_request(err.to_string())))
                .into_response()
        }
    };

    let cmd = RegisterContactCommand {
        client_id,
        report_id,
        steps: req.steps,
        welcome_message: req.welcome_message,
    };

    match handlers.register_handler.handle(cmd).await {
        Ok(result) => {
            let response: RegisterContactResponse = result.into();
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(RegisterContactError::NoSteps) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("A contact needs at least one step")),
        )
            .into_response(),
        Err(RegisterContactError::Store(e)) => handle_store_error(e),
    }
}

/// DELETE /contacts/:client_id - Remove a contact and its journey
pub async fn remove_contact(
    State(handlers): State<ContactHandlers>,
    Path(client_id): Path<String>,
) -> Response {
    let client_id = match ClientId::new(client_id) {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("Invalid client ID")),
            )
                .into_response()
        }
    };

    match handlers.remove_handler.handle(&client_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Contact", client_id.as_str())),
        )
            .into_response(),
        Err(e) => handle_store_error(e),
    }
}

/// GET /status - Liveness probe
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

fn handle_store_error(error: JourneyStoreError) -> Response {
    match error {
        JourneyStoreError::Inconsistent(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(e.to_string())),
        )
            .into_response(),
        JourneyStoreError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Contact", id.as_str())),
        )
            .into_response(),
        JourneyStoreError::Unavailable(msg) => {
            tracing::error!(error = %msg, "Journey store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::unavailable("Journey store unavailable")),
            )
                .into_response()
        }
        JourneyStoreError::Serialization(msg) => {
            tracing::error!(error = %msg, "Journey serialization failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("Stored journey is unreadable")),
            )
                .into_response()
        }
    }
}
