//! Fieldwise Gateway - Model backend abstraction
//!
//! Normalizes heterogeneous extraction backends (cloud multimodal LLM,
//! local vision model) behind one inference contract. Backend selection is
//! driven by configuration, never by type inspection at call sites; callers
//! only ever see `dyn ModelBackend`.

use std::sync::Arc;

use async_trait::async_trait;

use fieldwise_core::{BackendKind, DocumentPage, GatewayConfig, RawModelResponse, Result};

pub mod ollama;
pub mod openai;

pub use ollama::OllamaVisionBackend;
pub use openai::OpenAiVisionBackend;

/// One inference contract regardless of backend.
///
/// `infer` is the sole suspension point of an extraction run. It fails with
/// `BackendUnavailable` on network/auth/timeout problems and with
/// `BackendRefused` when the model declines or returns empty output.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Run one inference over a document page with the given prompt
    async fn infer(&self, page: &DocumentPage, prompt: &str) -> Result<RawModelResponse>;

    /// Backend name for logging and provenance
    fn name(&self) -> &str;
}

/// Create a backend of the given kind from gateway configuration
pub fn create_backend(kind: BackendKind, config: &GatewayConfig) -> Result<Arc<dyn ModelBackend>> {
    match kind {
        BackendKind::OpenAi => Ok(Arc::new(OpenAiVisionBackend::from_config(config)?)),
        BackendKind::Ollama => Ok(Arc::new(OllamaVisionBackend::from_config(config))),
    }
}

/// Create the default backend named by the configuration
pub fn create_default_backend(config: &GatewayConfig) -> Result<Arc<dyn ModelBackend>> {
    create_backend(config.backend, config)
}

/// Base64 data URL for embedding page bytes in a request body
pub(crate) fn data_url(page: &DocumentPage) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    format!("data:{};base64,{}", page.mime_type, STANDARD.encode(&page.bytes))
}

/// Plain base64 payload (Ollama style)
pub(crate) fn base64_bytes(page: &DocumentPage) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    STANDARD.encode(&page.bytes)
}
