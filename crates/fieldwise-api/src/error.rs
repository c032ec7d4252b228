//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::not_found(&msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiError::conflict(msg)),
            AppError::BadGateway(msg) => (
                StatusCode::BAD_GATEWAY,
                ApiError::new("BACKEND_UNAVAILABLE", "Extraction backend unavailable")
                    .with_details(msg),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal_error().with_details(msg),
            ),
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<fieldwise_core::FieldwiseError> for AppError {
    fn from(err: fieldwise_core::FieldwiseError) -> Self {
        use fieldwise_core::FieldwiseError;

        match err {
            FieldwiseError::UnknownSchema(id) => AppError::NotFound(format!("Schema '{id}'")),
            FieldwiseError::DuplicateSchema(id) => {
                AppError::Conflict(format!("Schema '{id}' already exists"))
            }
            FieldwiseError::InvalidSchema(msg) => {
                AppError::BadRequest(format!("Invalid schema: {msg}"))
            }
            FieldwiseError::BackendUnavailable(msg) => AppError::BadGateway(msg),
            FieldwiseError::BackendRefused(msg) => {
                AppError::BadGateway(format!("Backend refused: {msg}"))
            }
            FieldwiseError::Config(msg) => AppError::BadRequest(msg),
            FieldwiseError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}
