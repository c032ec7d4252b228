//! Extraction handlers
//!
//! Two entry points feed the same run path: a JSON body with base64 page
//! bytes, and a multipart upload for clients that post the image file
//! directly.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fieldwise_core::{DocumentPage, ExtractionFailure, ExtractionOutcome, ValidatedRecord};

use crate::error::AppError;
use crate::state::AppState;

/// Extraction request payload; page bytes arrive base64-encoded
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub schema_id: String,
    /// Backend name; defaults to the configured backend
    #[serde(default)]
    pub backend: Option<String>,
    /// Base64-encoded page image
    pub page: String,
    #[serde(default = "default_mime")]
    pub mime_type: String,
    /// Zero-based page index within the source document
    #[serde(default)]
    pub page_index: u32,
}

fn default_mime() -> String {
    "image/png".to_string()
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub run_id: Uuid,
    pub record: ValidatedRecord,
}

#[derive(Serialize)]
pub struct ExtractFailureResponse {
    pub run_id: Uuid,
    pub failure: ExtractionFailure,
}

/// Run one extraction over one page (JSON body, base64 page bytes).
///
/// Validated records return 200; a run that exhausts its repair budget
/// returns 422 with the offending fields so the caller can route the page to
/// manual correction.
pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExtractRequest>,
) -> Result<Response, AppError> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    state.increment_requests();

    let bytes = STANDARD
        .decode(payload.page.as_bytes())
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 page data: {e}")))?;
    check_page_size(&state, bytes.len())?;

    let page = DocumentPage::new(bytes, payload.mime_type).with_page(payload.page_index);
    run_extraction(&state, page, &payload.schema_id, payload.backend.as_deref()).await
}

/// Run one extraction over one page (multipart upload).
///
/// Expected parts: `page` (the image file; its content type is taken as the
/// MIME type), `schema_id`, and optional `backend` / `page_index` text parts.
pub async fn extract_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    state.increment_requests();

    let mut schema_id = None;
    let mut backend = None;
    let mut page_index = 0u32;
    let mut mime_type = default_mime();
    let mut bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("schema_id") => schema_id = Some(read_text(field, "schema_id").await?),
            Some("backend") => backend = Some(read_text(field, "backend").await?),
            Some("page_index") => {
                let raw = read_text(field, "page_index").await?;
                page_index = raw.parse().map_err(|_| {
                    AppError::BadRequest(format!("Invalid page_index '{raw}'"))
                })?;
            }
            Some("page") => {
                if let Some(ct) = field.content_type() {
                    mime_type = ct.to_string();
                }
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read 'page' part: {e}"))
                })?;
                bytes = Some(data.to_vec());
            }
            _ => {}
        }
    }

    let schema_id = schema_id
        .ok_or_else(|| AppError::BadRequest("Missing 'schema_id' part".to_string()))?;
    let bytes =
        bytes.ok_or_else(|| AppError::BadRequest("Missing 'page' file part".to_string()))?;
    check_page_size(&state, bytes.len())?;

    let page = DocumentPage::new(bytes, mime_type).with_page(page_index);
    run_extraction(&state, page, &schema_id, backend.as_deref()).await
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read '{name}' part: {e}")))
}

fn check_page_size(state: &AppState, len: usize) -> Result<(), AppError> {
    let max_bytes = state.config.server.max_body_size;
    if len > max_bytes {
        return Err(AppError::BadRequest(format!(
            "Page exceeds upload limit of {max_bytes} bytes"
        )));
    }
    Ok(())
}

async fn run_extraction(
    state: &AppState,
    page: DocumentPage,
    schema_id: &str,
    backend: Option<&str>,
) -> Result<Response, AppError> {
    let backend = backend.unwrap_or_else(|| state.default_backend());

    let run_id = Uuid::new_v4();
    tracing::info!(%run_id, schema = schema_id, backend, "extraction run started");

    let outcome = state
        .orchestrator
        .extract(&page, schema_id, backend)
        .await?;

    match outcome {
        ExtractionOutcome::Record(record) => {
            Ok(Json(ExtractResponse { run_id, record }).into_response())
        }
        ExtractionOutcome::Failed(failure) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ExtractFailureResponse { run_id, failure }),
        )
            .into_response()),
    }
}
