//! End-to-end extraction runs against a scripted backend

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use fieldwise_core::{
    DocumentPage, ExtractionOutcome, FieldSpec, FieldValue, FieldwiseError, IssueKind,
    RawModelResponse, Result, Schema, SchemaRegistry, ValidatorConfig,
};
use fieldwise_engine::Orchestrator;
use fieldwise_gateway::ModelBackend;

// ============================================================================
// Scripted backend
// ============================================================================

enum Script {
    Text(&'static str),
    Refuse,
    Unavailable,
}

struct MockBackend {
    name: &'static str,
    script: Mutex<VecDeque<Script>>,
    calls: AtomicU32,
}

impl MockBackend {
    fn scripted(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            name: "mock",
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn infer(&self, _page: &DocumentPage, _prompt: &str) -> Result<RawModelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Script::Text(text)) => Ok(RawModelResponse::new(text)),
            Some(Script::Refuse) => Err(FieldwiseError::BackendRefused(
                "cannot assist with that".to_string(),
            )),
            Some(Script::Unavailable) => Err(FieldwiseError::BackendUnavailable(
                "connection refused".to_string(),
            )),
            None => Ok(RawModelResponse::empty()),
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn invoice_schema() -> Schema {
    Schema::new(
        "invoice",
        vec![
            FieldSpec::text("invoiceNumber").required(),
            FieldSpec::number("amount").required(),
            FieldSpec::date("date"),
        ],
    )
    .unwrap()
}

fn page() -> DocumentPage {
    DocumentPage::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png")
}

fn orchestrator(backend: Arc<MockBackend>, options: ValidatorConfig) -> Orchestrator {
    let registry = Arc::new(SchemaRegistry::new());
    registry.define(invoice_schema()).unwrap();
    Orchestrator::new(registry, options).with_backend(backend)
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn test_valid_response_yields_record_in_one_call() {
    let backend = MockBackend::scripted(vec![Script::Text(
        r#"{"invoiceNumber": "4521", "amount": "$1,250.00", "date": "2024-03-15"}"#,
    )]);
    let orch = orchestrator(backend.clone(), ValidatorConfig::default());

    let outcome = orch.extract(&page(), "invoice", "mock").await.unwrap();
    let record = match outcome {
        ExtractionOutcome::Record(r) => r,
        ExtractionOutcome::Failed(f) => panic!("unexpected failure: {:?}", f.issues),
    };

    assert_eq!(record.schema_id, "invoice");
    assert_eq!(
        record.get("invoiceNumber"),
        Some(&FieldValue::Text("4521".to_string()))
    );
    assert_eq!(record.get("amount"), Some(&FieldValue::Number(1250.0)));
    assert_eq!(record.provenance.backend, "mock");
    assert_eq!(record.provenance.attempt, 0);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_labelled_text_response_yields_record() {
    let backend = MockBackend::scripted(vec![Script::Text(
        "Here is what I found.\nInvoice No: 4521, Total Amount: $1,250.00",
    )]);
    let orch = orchestrator(backend.clone(), ValidatorConfig::default());

    let outcome = orch.extract(&page(), "invoice", "mock").await.unwrap();
    assert!(outcome.is_record());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_empty_responses_exhaust_budget_and_name_fields() {
    let backend = MockBackend::scripted(vec![Script::Text(""), Script::Text("")]);
    let orch = orchestrator(backend.clone(), ValidatorConfig::default());

    let outcome = orch.extract(&page(), "invoice", "mock").await.unwrap();
    let failure = match outcome {
        ExtractionOutcome::Failed(f) => f,
        ExtractionOutcome::Record(_) => panic!("expected failure"),
    };

    assert_eq!(failure.field_names(), vec!["invoiceNumber", "amount"]);
    assert!(failure
        .issues
        .iter()
        .all(|i| i.kind == IssueKind::Missing));
    // Default budget of one repair: initial call plus exactly one retry.
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_repair_attempt_can_succeed() {
    let backend = MockBackend::scripted(vec![
        Script::Text(r#"{"invoiceNumber": "4521", "amount": "twelve"}"#),
        Script::Text(r#"{"invoiceNumber": "4521", "amount": "12.00"}"#),
    ]);
    let orch = orchestrator(backend.clone(), ValidatorConfig::default());

    let outcome = orch.extract(&page(), "invoice", "mock").await.unwrap();
    let record = match outcome {
        ExtractionOutcome::Record(r) => r,
        ExtractionOutcome::Failed(f) => panic!("unexpected failure: {:?}", f.issues),
    };

    assert_eq!(record.get("amount"), Some(&FieldValue::Number(12.0)));
    assert_eq!(record.provenance.attempt, 1);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_zero_budget_fails_after_single_call() {
    let backend = MockBackend::scripted(vec![Script::Text("")]);
    let options = ValidatorConfig {
        repair_budget: 0,
        ..Default::default()
    };
    let orch = orchestrator(backend.clone(), options);

    let outcome = orch.extract(&page(), "invoice", "mock").await.unwrap();
    assert!(!outcome.is_record());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_optional_only_schema_accepts_empty_response() {
    let registry = Arc::new(SchemaRegistry::new());
    registry
        .define(Schema::new("memo", vec![FieldSpec::text("note")]).unwrap())
        .unwrap();

    let backend = MockBackend::scripted(vec![Script::Text("")]);
    let orch =
        Orchestrator::new(registry, ValidatorConfig::default()).with_backend(backend.clone());

    let outcome = orch.extract(&page(), "memo", "mock").await.unwrap();
    let record = match outcome {
        ExtractionOutcome::Record(r) => r,
        ExtractionOutcome::Failed(f) => panic!("unexpected failure: {:?}", f.issues),
    };
    assert!(record.fields.is_empty());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_choice_mismatch_names_field() {
    let registry = Arc::new(SchemaRegistry::new());
    registry
        .define(
            Schema::new(
                "cheque",
                vec![FieldSpec::choice("status", vec!["Paid".to_string(), "Due".to_string()])
                    .required()],
            )
            .unwrap(),
        )
        .unwrap();

    let backend = MockBackend::scripted(vec![
        Script::Text(r#"{"status": "overdue"}"#),
        Script::Text(r#"{"status": "overdue"}"#),
    ]);
    let orch =
        Orchestrator::new(registry, ValidatorConfig::default()).with_backend(backend.clone());

    let outcome = orch.extract(&page(), "cheque", "mock").await.unwrap();
    let failure = match outcome {
        ExtractionOutcome::Failed(f) => f,
        ExtractionOutcome::Record(_) => panic!("expected failure"),
    };
    assert_eq!(failure.issues.len(), 1);
    assert_eq!(failure.issues[0].field, "status");
    assert_eq!(failure.issues[0].kind, IssueKind::NotInSet);
    assert_eq!(failure.issues[0].raw.as_deref(), Some("overdue"));
}

#[tokio::test]
async fn test_refusal_flows_into_failure_not_error() {
    let backend = MockBackend::scripted(vec![Script::Refuse, Script::Refuse]);
    let orch = orchestrator(backend.clone(), ValidatorConfig::default());

    let outcome = orch.extract(&page(), "invoice", "mock").await.unwrap();
    assert!(!outcome.is_record());
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_unavailable_backend_propagates_without_retry() {
    let backend = MockBackend::scripted(vec![Script::Unavailable]);
    let orch = orchestrator(backend.clone(), ValidatorConfig::default());

    let err = orch.extract(&page(), "invoice", "mock").await.unwrap_err();
    assert!(matches!(err, FieldwiseError::BackendUnavailable(_)));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_unknown_schema_fails_before_inference() {
    let backend = MockBackend::scripted(vec![]);
    let orch = orchestrator(backend.clone(), ValidatorConfig::default());

    let err = orch.extract(&page(), "receipt", "mock").await.unwrap_err();
    assert!(matches!(err, FieldwiseError::UnknownSchema(_)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_unknown_backend_fails_before_inference() {
    let backend = MockBackend::scripted(vec![]);
    let orch = orchestrator(backend.clone(), ValidatorConfig::default());

    let err = orch.extract(&page(), "invoice", "ghost").await.unwrap_err();
    assert!(matches!(err, FieldwiseError::Config(_)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_extract_pages_collects_per_page_outcomes() {
    let backend = MockBackend::scripted(vec![
        Script::Text(r#"{"invoiceNumber": "1", "amount": "10"}"#),
        // Second page fails both attempts.
        Script::Text(""),
        Script::Text(""),
    ]);
    let orch = orchestrator(backend.clone(), ValidatorConfig::default());

    let pages = vec![page().with_page(0), page().with_page(1)];
    let outcomes = orch.extract_pages(&pages, "invoice", "mock").await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_record());
    assert!(!outcomes[1].is_record());
    assert_eq!(backend.calls(), 3);
}
