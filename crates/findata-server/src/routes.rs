//! Route definitions.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{self, AppState};

/// Create the API router.
///
/// # Arguments
/// * `state` - Dispatcher, settings and the rendered OpenAPI document
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Tools
        .route("/tools", get(handlers::list_tools))
        .route("/tools/:name", post(handlers::call_tool))
        // Documentation
        .route("/openapi.json", get(handlers::openapi))
        .route("/docs", get(handlers::swagger_ui))
        .route("/redoc", get(handlers::redoc))
        // State
        .with_state(state)
}
