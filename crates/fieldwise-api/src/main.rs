//! Fieldwise API Server
//!
//! REST server for schema-driven document field extraction.

use std::sync::Arc;

use fieldwise_api::{create_router, state::AppState};
use fieldwise_core::{AppConfig, BackendKind, SchemaRegistry};
use fieldwise_engine::Orchestrator;
use fieldwise_gateway::create_backend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldwise_api=debug,tower_http=debug".into()),
        )
        .init();

    // Load configuration
    let config = AppConfig::from_env().unwrap_or_default();
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Wire registry and orchestrator
    let registry = Arc::new(SchemaRegistry::new());
    let mut orchestrator =
        Orchestrator::new(registry.clone(), config.validator.clone());

    // Ollama needs no credentials; OpenAI is registered when a key is set.
    orchestrator =
        orchestrator.with_backend(create_backend(BackendKind::Ollama, &config.gateway)?);
    if config.gateway.openai_api_key.is_some() {
        orchestrator =
            orchestrator.with_backend(create_backend(BackendKind::OpenAi, &config.gateway)?);
    }

    let backends = orchestrator.backend_ids();
    let state = Arc::new(AppState::new(config, registry, orchestrator));

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Fieldwise API server starting on http://{}", addr);
    tracing::info!("Registered backends: {}", backends.join(", "));

    axum::serve(listener, app).await?;

    Ok(())
}
