//! Schema registry
//!
//! Process-wide store of document-type schemas. Reads are lock-light: the
//! registry keeps an immutable map behind an `Arc` and writers replace the
//! whole map atomically, so an in-flight extraction run that resolved its
//! schema keeps one consistent version for the entire run even if the schema
//! is redefined concurrently.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{FieldwiseError, Result, Schema};

type SchemaMap = HashMap<String, Arc<Schema>>;

/// Registry of document-type schemas
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    inner: RwLock<Arc<SchemaMap>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with schemas.
    ///
    /// Fails with `DuplicateSchema` if two schemas share an id.
    pub fn with_schemas(schemas: impl IntoIterator<Item = Schema>) -> Result<Self> {
        let registry = Self::new();
        for schema in schemas {
            registry.define(schema)?;
        }
        Ok(registry)
    }

    fn snapshot(&self) -> Arc<SchemaMap> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Register a new schema. Fails with `DuplicateSchema` if the id exists.
    pub fn define(&self, schema: Schema) -> Result<()> {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.contains_key(&schema.id) {
            return Err(FieldwiseError::DuplicateSchema(schema.id));
        }
        let mut next = (**guard).clone();
        next.insert(schema.id.clone(), Arc::new(schema));
        *guard = Arc::new(next);
        Ok(())
    }

    /// Replace (or insert) a schema definition.
    ///
    /// Writers are serialized; readers continue against the prior map until
    /// the new one is swapped in.
    pub fn redefine(&self, schema: Schema) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = (**guard).clone();
        next.insert(schema.id.clone(), Arc::new(schema));
        *guard = Arc::new(next);
    }

    /// Resolve a schema by id. Fails with `UnknownSchema` if absent.
    ///
    /// The returned `Arc` is a stable snapshot: later redefinitions do not
    /// affect it.
    pub fn get(&self, schema_id: &str) -> Result<Arc<Schema>> {
        self.snapshot()
            .get(schema_id)
            .cloned()
            .ok_or_else(|| FieldwiseError::UnknownSchema(schema_id.to_string()))
    }

    /// Registered schema ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.snapshot().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered schemas
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// True if no schemas are registered
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
