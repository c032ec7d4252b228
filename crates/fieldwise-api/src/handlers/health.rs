//! Health check handlers

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Service status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub schemas: usize,
    pub backends: Vec<String>,
}

/// Service status: uptime, request count, registered schemas and backends
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        uptime_seconds: state.uptime_secs(),
        total_requests: state.get_request_count(),
        schemas: state.registry.len(),
        backends: state.orchestrator.backend_ids(),
    })
}
