//! OpenAI-compatible vision backend
//!
//! Sends the page image as a data-URL content part of a chat completion.
//! Works against the OpenAI API and compatible endpoints (Azure, vLLM)
//! via a configurable base URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use fieldwise_core::{
    DocumentPage, FieldwiseError, GatewayConfig, RawModelResponse, Result, TokenUsage,
};

use crate::{data_url, ModelBackend};

/// Cloud multimodal backend speaking the OpenAI chat-completions protocol
pub struct OpenAiVisionBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenAiVisionBackend {
    /// Create a new backend
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    /// Create from gateway config
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| FieldwiseError::Config("OpenAI API key required".to_string()))?;

        let mut backend = Self::new(
            api_key.clone(),
            config.model.clone(),
            config.max_tokens,
            config.temperature,
            Duration::from_secs(config.timeout_secs),
        );
        if let Some(url) = &config.openai_base_url {
            backend.base_url = url.clone();
        }
        Ok(backend)
    }

    /// Set custom base URL (for Azure or compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request(&self, page: &DocumentPage, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url(page),
                        },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiVisionBackend {
    async fn infer(&self, page: &DocumentPage, prompt: &str) -> Result<RawModelResponse> {
        let request = self.build_request(page, prompt);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FieldwiseError::BackendUnavailable(format!("OpenAI request timed out: {e}"))
                } else {
                    FieldwiseError::BackendUnavailable(format!("OpenAI request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(FieldwiseError::BackendUnavailable(format!(
                "OpenAI error ({status}): {error_text}"
            )));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            FieldwiseError::BackendUnavailable(format!("Failed to parse OpenAI response: {e}"))
        })?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| FieldwiseError::BackendRefused("no completion returned".to_string()))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(FieldwiseError::BackendRefused(refusal));
        }

        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(FieldwiseError::BackendRefused(
                "empty completion".to_string(),
            ));
        }

        let mut raw = RawModelResponse::new(text);
        if let Some(model) = result.model {
            raw = raw.with_model(model);
        }
        if let Some(usage) = result.usage {
            raw = raw.with_usage(TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            });
        }

        tracing::debug!(
            backend = "openai",
            page = page.page,
            "inference completed"
        );
        Ok(raw)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
