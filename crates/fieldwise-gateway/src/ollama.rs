//! Ollama vision backend
//!
//! Talks to a locally served vision model (e.g., llava, moondream) through
//! the Ollama generate API, shipping the page image as a base64 payload.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use fieldwise_core::{
    DocumentPage, FieldwiseError, GatewayConfig, RawModelResponse, Result, TokenUsage,
};

use crate::{base64_bytes, ModelBackend};

/// Local vision backend speaking the Ollama generate protocol
pub struct OllamaVisionBackend {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    model: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

impl OllamaVisionBackend {
    /// Create a new backend
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Create from gateway config
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.ollama_url.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn build_request(&self, page: &DocumentPage, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            images: vec![base64_bytes(page)],
            stream: false,
        }
    }
}

#[async_trait]
impl ModelBackend for OllamaVisionBackend {
    async fn infer(&self, page: &DocumentPage, prompt: &str) -> Result<RawModelResponse> {
        let request = self.build_request(page, prompt);

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FieldwiseError::BackendUnavailable(format!("Ollama request timed out: {e}"))
                } else {
                    FieldwiseError::BackendUnavailable(format!("Ollama request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(FieldwiseError::BackendUnavailable(format!(
                "Ollama error ({status}): {error_text}"
            )));
        }

        let result: GenerateResponse = response.json().await.map_err(|e| {
            FieldwiseError::BackendUnavailable(format!("Failed to parse Ollama response: {e}"))
        })?;

        if result.response.trim().is_empty() {
            return Err(FieldwiseError::BackendRefused(
                "empty completion".to_string(),
            ));
        }

        let mut raw = RawModelResponse::new(result.response);
        if let Some(model) = result.model {
            raw = raw.with_model(model);
        }
        if let (Some(prompt_tokens), Some(completion_tokens)) =
            (result.prompt_eval_count, result.eval_count)
        {
            raw = raw.with_usage(TokenUsage {
                prompt_tokens,
                completion_tokens,
            });
        }

        tracing::debug!(
            backend = "ollama",
            page = page.page,
            "inference completed"
        );
        Ok(raw)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_creation() {
        let backend = OllamaVisionBackend::new(
            "http://localhost:11434",
            "llava",
            Duration::from_secs(60),
        );
        assert_eq!(backend.model, "llava");
        assert_eq!(backend.name(), "ollama");
    }

    #[test]
    fn test_request_carries_image() {
        let backend = OllamaVisionBackend::new(
            "http://localhost:11434",
            "llava",
            Duration::from_secs(60),
        );
        let page = DocumentPage::new(vec![1, 2, 3], "image/png");
        let request = backend.build_request(&page, "Extract the fields.");

        assert_eq!(request.images.len(), 1);
        assert!(!request.stream);
        assert_eq!(request.prompt, "Extract the fields.");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "model": "llava",
            "response": "invoiceNumber: 4521",
            "done": true,
            "prompt_eval_count": 410,
            "eval_count": 12
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.response, "invoiceNumber: 4521");
        assert_eq!(parsed.eval_count, Some(12));
    }
}
