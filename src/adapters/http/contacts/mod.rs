//! HTTP adapter for contact endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, RegisterContactRequest, RegisterContactResponse, StatusResponse};
pub use handlers::ContactHandlers;
pub use routes::contact_routes;
