//! HTTP surface: axum handlers and router.

pub mod handlers;
pub mod rest;

pub use handlers::{ApiState, ErrorResponse};
pub use rest::{create_rest_router, RestApiConfig};
