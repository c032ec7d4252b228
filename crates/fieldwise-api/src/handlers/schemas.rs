//! Schema registry handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use fieldwise_core::{FieldSpec, Schema};

use crate::error::AppError;
use crate::state::AppState;

/// Schema definition payload
#[derive(Debug, Deserialize)]
pub struct SchemaPayload {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
}

impl SchemaPayload {
    fn into_schema(self) -> Result<Schema, AppError> {
        let mut schema = Schema::new(self.id, self.fields)?;
        if let Some(description) = self.description {
            schema = schema.with_description(description);
        }
        Ok(schema)
    }
}

#[derive(Serialize)]
pub struct SchemaListResponse {
    pub schemas: Vec<String>,
}

/// List registered schema identifiers
pub async fn list_schemas(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.increment_requests();
    Json(SchemaListResponse {
        schemas: state.registry.ids(),
    })
}

/// Fetch one schema by identifier
pub async fn get_schema(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Schema>, AppError> {
    state.increment_requests();
    let schema = state.registry.get(&id)?;
    Ok(Json(Schema::clone(&schema)))
}

/// Register a new schema; rejects duplicates
pub async fn create_schema(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SchemaPayload>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();
    let schema = payload.into_schema()?;
    let id = schema.id.clone();
    state.registry.define(schema)?;

    tracing::info!(schema = %id, "schema registered");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Replace a schema atomically; in-flight runs keep the version they resolved
pub async fn replace_schema(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SchemaPayload>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();
    if payload.id != id {
        return Err(AppError::BadRequest(format!(
            "Schema id '{}' does not match path '{id}'",
            payload.id
        )));
    }

    let schema = payload.into_schema()?;
    state.registry.redefine(schema);

    tracing::info!(schema = %id, "schema redefined");
    Ok(Json(serde_json::json!({ "id": id })))
}
