//! REST router for the calendar engine.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::debug;

use crate::api::handlers::{
    destinations_handler, get_event_handler, list_events_handler, update_event_handler, ApiState,
};
use crate::calendar::CalendarService;

/// HTTP surface configuration.
#[derive(Debug, Clone)]
pub struct RestApiConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub prefix: String,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            prefix: "/api/v1".to_string(),
        }
    }
}

/// Build the REST router over a calendar service.
pub fn create_rest_router(service: Arc<CalendarService>, config: &RestApiConfig) -> Router {
    let state = Arc::new(ApiState { service });

    let api = Router::new()
        .route("/calendars/{view}/events", get(list_events_handler))
        .route(
            "/calendars/{view}/events/update",
            post(update_event_handler),
        )
        .route(
            "/calendars/{view}/events/{table_id}/{record_id}",
            get(get_event_handler),
        )
        .route("/calendars/{view}/destinations", get(destinations_handler))
        .with_state(state);

    let mut router = Router::new().nest(&config.prefix, api);
    if config.enable_cors {
        router = router.layer(cors_layer(&config.cors_origins));
        debug!(origins = ?config.cors_origins, "CORS enabled");
    }
    router
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
