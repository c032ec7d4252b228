//! Extraction orchestrator
//!
//! One invocation processes exactly one document page and holds no state
//! beyond the run, so any number of runs may execute concurrently. The only
//! shared read is the schema registry snapshot resolved at the start of the
//! run; the gateway call is the only suspension point, and dropping the
//! future between awaits abandons an in-flight call without touching shared
//! state.
//!
//! The repair loop is a bounded state machine
//! (Parsing -> Validating -> [Repairing -> Parsing] -> Done/Failed): at most
//! `repair_budget` corrective re-extractions per run, sequential, never
//! parallel.

use std::collections::HashMap;
use std::sync::Arc;

use fieldwise_core::{
    DocumentPage, ExtractionFailure, ExtractionOutcome, ExtractionRequest, FieldwiseError,
    Provenance, RawModelResponse, Result, SchemaRegistry, ValidatedRecord, ValidatorConfig,
};
use fieldwise_gateway::ModelBackend;

use crate::{prompt, validator};

/// Ties registry, gateway, parser, and validator together for single runs
pub struct Orchestrator {
    registry: Arc<SchemaRegistry>,
    backends: HashMap<String, Arc<dyn ModelBackend>>,
    options: ValidatorConfig,
}

impl Orchestrator {
    /// Create an orchestrator over a schema registry
    pub fn new(registry: Arc<SchemaRegistry>, options: ValidatorConfig) -> Self {
        Self {
            registry,
            backends: HashMap::new(),
            options,
        }
    }

    /// Register a backend under its own name
    pub fn with_backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.backends.insert(backend.name().to_string(), backend);
        self
    }

    /// The schema registry this orchestrator reads from
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Names of the registered backends, sorted
    pub fn backend_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.backends.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn backend(&self, backend_id: &str) -> Result<&Arc<dyn ModelBackend>> {
        self.backends
            .get(backend_id)
            .ok_or_else(|| FieldwiseError::Config(format!("unknown backend '{backend_id}'")))
    }

    /// Run one extraction: resolve schema, prompt the backend, parse,
    /// validate, and repair within budget.
    ///
    /// Registry and gateway errors propagate unchanged; a backend refusal is
    /// treated as an empty response and flows into parsing, so the validator
    /// owns the terminal decision.
    pub async fn extract(
        &self,
        page: &DocumentPage,
        schema_id: &str,
        backend_id: &str,
    ) -> Result<ExtractionOutcome> {
        let schema = self.registry.get(schema_id)?;
        let backend = self.backend(backend_id)?;

        let base_prompt = prompt::build_prompt(&schema);
        let budget = self.options.repair_budget;

        let mut prompt_text = base_prompt.clone();
        let mut attempt: u32 = 0;
        let mut last_candidate = None;
        let mut last_issues = Vec::new();

        loop {
            let raw = match backend.infer(page, &prompt_text).await {
                Ok(raw) => raw,
                Err(FieldwiseError::BackendRefused(reason)) => {
                    tracing::warn!(schema = schema_id, backend = backend_id, %reason,
                        "backend refused; treating as empty response");
                    RawModelResponse::empty()
                }
                Err(e) => return Err(e),
            };

            let candidate = fieldwise_parser::parse(
                &raw,
                &schema,
                Provenance::new(backend.name(), attempt),
            );

            match validator::check(&candidate, &schema, &self.options) {
                Ok(fields) => {
                    tracing::info!(schema = schema_id, backend = backend_id, attempt,
                        "extraction validated");
                    let provenance = candidate.provenance.clone();
                    return Ok(ExtractionOutcome::Record(ValidatedRecord::new(
                        schema.id.clone(),
                        fields,
                        provenance,
                    )));
                }
                Err(issues) => {
                    last_candidate = Some(candidate);
                    if attempt >= budget {
                        last_issues = issues;
                        break;
                    }
                    tracing::info!(schema = schema_id, backend = backend_id, attempt,
                        problem_fields = issues.len(), "requesting corrective re-extraction");
                    prompt_text = prompt::build_repair_prompt(&base_prompt, &issues);
                    last_issues = issues;
                    attempt += 1;
                }
            }
        }

        tracing::warn!(schema = schema_id, backend = backend_id,
            problem_fields = last_issues.len(), "repair budget exhausted");
        Ok(ExtractionOutcome::Failed(ExtractionFailure::incomplete(
            last_issues,
            last_candidate,
        )))
    }

    /// Run a prepared request
    pub async fn run(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome> {
        self.extract(&request.page, &request.schema_id, &request.backend_id)
            .await
    }

    /// Extract every page of a document sequentially, collecting one outcome
    /// per page. A gateway/registry error on any page aborts the batch.
    pub async fn extract_pages(
        &self,
        pages: &[DocumentPage],
        schema_id: &str,
        backend_id: &str,
    ) -> Result<Vec<ExtractionOutcome>> {
        let mut outcomes = Vec::with_capacity(pages.len());
        for page in pages {
            outcomes.push(self.extract(page, schema_id, backend_id).await?);
        }
        Ok(outcomes)
    }
}
