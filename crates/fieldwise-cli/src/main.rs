//! Fieldwise CLI - Command-line interface
//!
//! Usage:
//!   fieldwise schema list
//!   fieldwise schema show <id>
//!   fieldwise extract <image> --schema <id>

mod schemas;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use fieldwise_core::{AppConfig, DocumentPage, ExtractionOutcome, SchemaRegistry};
use fieldwise_engine::Orchestrator;
use fieldwise_gateway::{create_backend, create_default_backend};

#[derive(Parser)]
#[command(name = "fieldwise")]
#[command(about = "Schema-driven document field extraction CLI")]
#[command(version)]
struct Cli {
    /// Schema definition file
    #[arg(long, default_value = "schemas.toml", global = true)]
    schemas: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect registered schemas
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
    /// Extract fields from a document page image
    Extract {
        /// Path to the page image
        image: PathBuf,
        /// Schema to apply
        #[arg(long)]
        schema: String,
        /// Backend to use (defaults to the configured backend)
        #[arg(long)]
        backend: Option<String>,
        /// Zero-based page index within the source document
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
}

#[derive(Subcommand)]
enum SchemaAction {
    /// List schema identifiers
    List,
    /// Show one schema definition
    Show { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let registry = Arc::new(SchemaRegistry::new());
    if cli.schemas.exists() {
        let count = schemas::load_into(&registry, &cli.schemas)?;
        tracing::debug!(file = %cli.schemas.display(), count, "schemas loaded");
    }

    match cli.command {
        Commands::Schema { action } => match action {
            SchemaAction::List => {
                for id in registry.ids() {
                    println!("{id}");
                }
                Ok(ExitCode::SUCCESS)
            }
            SchemaAction::Show { id } => {
                let schema = registry.get(&id)?;
                println!("{}", serde_json::to_string_pretty(schema.as_ref())?);
                Ok(ExitCode::SUCCESS)
            }
        },
        Commands::Extract {
            image,
            schema,
            backend,
            page,
        } => extract(&registry, &image, &schema, backend.as_deref(), page).await,
    }
}

async fn extract(
    registry: &Arc<SchemaRegistry>,
    image: &Path,
    schema_id: &str,
    backend: Option<&str>,
    page_index: u32,
) -> anyhow::Result<ExitCode> {
    let config = AppConfig::from_env()?;

    let bytes = std::fs::read(image)?;
    let page = DocumentPage::new(bytes, mime_for(image)).with_page(page_index);

    let chosen = match backend {
        Some(name) => create_backend(name.parse()?, &config.gateway)?,
        None => create_default_backend(&config.gateway)?,
    };
    let backend_id = chosen.name().to_string();

    let orchestrator =
        Orchestrator::new(registry.clone(), config.validator.clone()).with_backend(chosen);

    let outcome = orchestrator.extract(&page, schema_id, &backend_id).await?;
    match outcome {
        ExtractionOutcome::Record(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(ExitCode::SUCCESS)
        }
        ExtractionOutcome::Failed(failure) => {
            println!("{}", serde_json::to_string_pretty(&failure)?);
            eprintln!(
                "extraction incomplete: {}",
                failure.field_names().join(", ")
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

/// MIME type from the image file extension
fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for(Path::new("scan.jpeg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("scan.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("page.png")), "image/png");
        assert_eq!(mime_for(Path::new("no-extension")), "image/png");
    }
}
