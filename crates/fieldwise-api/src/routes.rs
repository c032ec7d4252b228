//! API route definitions

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::{extract, health, schemas};
use crate::state::AppState;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Schema registry endpoints
        .route("/schemas", get(schemas::list_schemas))
        .route("/schemas", post(schemas::create_schema))
        .route("/schemas/:id", get(schemas::get_schema))
        .route("/schemas/:id", put(schemas::replace_schema))
        // Extraction endpoints
        .route("/extract", post(extract::extract))
        .route("/extract/upload", post(extract::extract_upload))
        // Status endpoint
        .route("/status", get(health::status))
}
