//! Fieldwise Core - Domain models, schema registry, and shared types
//!
//! This crate defines the core abstractions used throughout the Fieldwise
//! extraction system:
//! - Field and schema models (typed field definitions per document type)
//! - The schema registry with atomic-swap redefinition
//! - Extraction data model (requests, candidate/validated records, failures)
//! - Common error types
//! - Configuration management

pub mod config;
pub mod registry;
pub mod schema;

pub use config::{
    default_date_formats, AppConfig, BackendKind, ConfigError, GatewayConfig, LoggingConfig,
    ServerConfig, ValidatorConfig,
};
pub use registry::SchemaRegistry;
pub use schema::{FieldSpec, FieldType, Schema};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Fieldwise operations
#[derive(Error, Debug)]
pub enum FieldwiseError {
    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Duplicate schema: {0}")]
    DuplicateSchema(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend refused request: {0}")]
    BackendRefused(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for FieldwiseError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FieldwiseError>;

// ============================================================================
// Document Input
// ============================================================================

/// A single document page submitted for extraction.
///
/// Splitting multi-page documents into page images and file-type detection
/// are collaborator responsibilities; the core only sees raw page bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPage {
    /// Raw image/page bytes
    pub bytes: Vec<u8>,

    /// MIME type of the bytes (e.g., "image/png")
    pub mime_type: String,

    /// Zero-based page index within the source document
    pub page: u32,
}

impl DocumentPage {
    /// Create a new page from raw bytes
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            page: 0,
        }
    }

    /// Set the page index
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

/// One extraction run: a page, the schema to apply, and the backend to use.
///
/// Owned exclusively by a single orchestrator invocation and discarded when
/// the run completes.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// The page to extract from
    pub page: DocumentPage,

    /// Schema identifier (resolved via the registry)
    pub schema_id: String,

    /// Backend identifier (resolved via the gateway)
    pub backend_id: String,
}

impl ExtractionRequest {
    /// Create a new request
    pub fn new(
        page: DocumentPage,
        schema_id: impl Into<String>,
        backend_id: impl Into<String>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            page,
            schema_id: schema_id.into(),
            backend_id: backend_id.into(),
        }
    }
}

// ============================================================================
// Model Responses
// ============================================================================

/// Token accounting reported by a backend, when available
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Opaque text returned by a backend for one inference call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawModelResponse {
    /// The raw response text
    pub text: String,

    /// Model that produced the response
    pub model: Option<String>,

    /// Token usage, if the backend reports it
    pub usage: Option<TokenUsage>,
}

impl RawModelResponse {
    /// Create a response from text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            usage: None,
        }
    }

    /// An empty response (used when a backend declines to answer)
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set token usage
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// True if the response carries no usable text
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ============================================================================
// Records
// ============================================================================

/// Which backend and attempt produced a candidate record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    /// Backend name (e.g., "openai", "ollama")
    pub backend: String,

    /// Attempt number within the run (0 = initial, 1+ = repair attempts)
    pub attempt: u32,
}

impl Provenance {
    pub fn new(backend: impl Into<String>, attempt: u32) -> Self {
        Self {
            backend: backend.into(),
            attempt,
        }
    }
}

/// Unvalidated extraction result: field name to raw string value.
///
/// Built only by the response parser. Fields the parser could not locate are
/// simply absent from the map; absence is decided by the validator, never
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Raw values keyed by schema field name
    pub values: BTreeMap<String, String>,

    /// Which backend/attempt produced this candidate
    pub provenance: Provenance,
}

impl CandidateRecord {
    /// Create an empty candidate
    pub fn new(provenance: Provenance) -> Self {
        Self {
            values: BTreeMap::new(),
            provenance,
        }
    }

    /// Record a raw value for a field
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// Get the raw value for a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// True if no fields were recognized
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A typed value satisfying a field's declared type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    /// Render the value as display text
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Date(d) => d.to_string(),
        }
    }
}

/// Final typed, schema-conformant extraction result.
///
/// Immutable once produced; every required field of the schema is present
/// and every present field satisfies its declared type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedRecord {
    /// Schema this record conforms to
    pub schema_id: String,

    /// Typed values keyed by field name; absent optional fields are omitted
    pub fields: BTreeMap<String, FieldValue>,

    /// Which backend/attempt produced the accepted candidate
    pub provenance: Provenance,

    /// When validation completed
    pub extracted_at: DateTime<Utc>,
}

impl ValidatedRecord {
    /// Create a record from validated fields
    pub fn new(
        schema_id: impl Into<String>,
        fields: BTreeMap<String, FieldValue>,
        provenance: Provenance,
    ) -> Self {
        Self {
            schema_id: schema_id.into(),
            fields,
            provenance,
            extracted_at: Utc::now(),
        }
    }

    /// Get the typed value for a field
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}

// ============================================================================
// Failures
// ============================================================================

/// What went wrong with a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Required field absent from the candidate
    Missing,
    /// Value present but could not be coerced to the declared type
    Invalid,
    /// Coerced value is not a member of the declared choice set
    NotInSet,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Invalid => write!(f, "invalid"),
            Self::NotInSet => write!(f, "not in allowed set"),
        }
    }
}

/// A per-field validation problem, with the raw value kept for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Field name
    pub field: String,

    /// Problem classification
    pub kind: IssueKind,

    /// Raw value as extracted, when one was present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl FieldIssue {
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: IssueKind::Missing,
            raw: None,
        }
    }

    pub fn invalid(field: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: IssueKind::Invalid,
            raw: Some(raw.into()),
        }
    }

    pub fn not_in_set(field: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: IssueKind::NotInSet,
            raw: Some(raw.into()),
        }
    }
}

/// Reason a run ended without a validated record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Fields remained missing or invalid after the repair budget ran out
    IncompleteRecord,
}

/// Terminal extraction failure naming exactly the problematic fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionFailure {
    /// Failure classification
    pub reason: FailureReason,

    /// The offending fields
    pub issues: Vec<FieldIssue>,

    /// Last candidate record, for diagnostics and manual correction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_candidate: Option<CandidateRecord>,
}

impl ExtractionFailure {
    /// Create an incomplete-record failure
    pub fn incomplete(issues: Vec<FieldIssue>, last_candidate: Option<CandidateRecord>) -> Self {
        Self {
            reason: FailureReason::IncompleteRecord,
            issues,
            last_candidate,
        }
    }

    /// Names of the offending fields
    pub fn field_names(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }
}

/// Result of one extraction run: a record or a structured failure.
///
/// Never a silent partial success; a run that cannot satisfy the schema
/// surfaces the offending fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Record(ValidatedRecord),
    Failed(ExtractionFailure),
}

impl ExtractionOutcome {
    /// True if the run produced a validated record
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
