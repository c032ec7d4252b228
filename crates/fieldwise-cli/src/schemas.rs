//! Schema file loading
//!
//! Schemas are declared in a TOML file, one `[[schemas]]` table per document
//! type:
//!
//! ```toml
//! [[schemas]]
//! id = "invoice"
//! description = "Retail invoices"
//!
//! [[schemas.fields]]
//! name = "invoiceNumber"
//! type = "text"
//! required = true
//!
//! [[schemas.fields]]
//! name = "amount"
//! type = "number"
//! required = true
//! ```

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use fieldwise_core::{FieldSpec, Schema, SchemaRegistry};

#[derive(Deserialize)]
struct SchemaFile {
    #[serde(default)]
    schemas: Vec<SchemaEntry>,
}

#[derive(Deserialize)]
struct SchemaEntry {
    id: String,
    #[serde(default)]
    description: Option<String>,
    fields: Vec<FieldSpec>,
}

/// Load a schema file and register every entry
pub fn load_into(registry: &SchemaRegistry, path: &Path) -> anyhow::Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema file {}", path.display()))?;
    let file: SchemaFile = toml::from_str(&content)
        .with_context(|| format!("parsing schema file {}", path.display()))?;

    let count = file.schemas.len();
    for entry in file.schemas {
        let mut schema = Schema::new(entry.id, entry.fields)?;
        if let Some(description) = entry.description {
            schema = schema.with_description(description);
        }
        registry.define(schema)?;
    }
    Ok(count)
}

// ============================================================================
// Tests
// ============================================================================
