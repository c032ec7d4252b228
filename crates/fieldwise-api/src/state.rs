//! Application state management

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use fieldwise_core::{AppConfig, SchemaRegistry};
use fieldwise_engine::Orchestrator;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Schema registry (shared with the orchestrator)
    pub registry: Arc<SchemaRegistry>,
    /// Extraction orchestrator
    pub orchestrator: Arc<Orchestrator>,
    /// Backend used when a request does not pick one; always a registered
    /// backend when any exist
    default_backend: String,
}

impl AppState {
    /// Create new application state.
    ///
    /// The configured default backend may not be registered (e.g., OpenAI
    /// configured but no API key set); in that case requests fall back to the
    /// first registered backend instead of failing on every run.
    pub fn new(config: AppConfig, registry: Arc<SchemaRegistry>, orchestrator: Orchestrator) -> Self {
        let configured = config.gateway.backend.as_str();
        let registered = orchestrator.backend_ids();
        let default_backend = if registered.iter().any(|id| id == configured) {
            configured.to_string()
        } else if let Some(first) = registered.first() {
            tracing::warn!(
                configured,
                fallback = %first,
                "configured default backend not registered; falling back"
            );
            first.clone()
        } else {
            configured.to_string()
        };

        Self {
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            registry,
            orchestrator: Arc::new(orchestrator),
            default_backend,
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Backend name used when a request does not pick one
    pub fn default_backend(&self) -> &str {
        &self.default_backend
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fieldwise_core::{DocumentPage, RawModelResponse, Result};
    use fieldwise_gateway::ModelBackend;

    struct StubBackend(&'static str);

    #[async_trait]
    impl ModelBackend for StubBackend {
        async fn infer(&self, _page: &DocumentPage, _prompt: &str) -> Result<RawModelResponse> {
            Ok(RawModelResponse::empty())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    fn state_with_backend(name: &'static str) -> AppState {
        let config = AppConfig::default(); // configured default: openai
        let registry = Arc::new(SchemaRegistry::new());
        let orchestrator = Orchestrator::new(registry.clone(), config.validator.clone())
            .with_backend(Arc::new(StubBackend(name)));
        AppState::new(config, registry, orchestrator)
    }

    #[test]
    fn test_default_backend_falls_back_to_registered() {
        // Only ollama is registered; the configured openai default would make
        // every backend-less request fail.
        let state = state_with_backend("ollama");
        assert_eq!(state.default_backend(), "ollama");
    }

    #[test]
    fn test_default_backend_kept_when_registered() {
        let state = state_with_backend("openai");
        assert_eq!(state.default_backend(), "openai");
    }

    #[test]
    fn test_default_backend_without_registrations() {
        let config = AppConfig::default();
        let registry = Arc::new(SchemaRegistry::new());
        let orchestrator = Orchestrator::new(registry.clone(), config.validator.clone());
        let state = AppState::new(config, registry, orchestrator);
        assert_eq!(state.default_backend(), "openai");
    }
}
