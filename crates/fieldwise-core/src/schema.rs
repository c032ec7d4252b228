//! Schema and field definitions
//!
//! A schema names one document type and lists its expected fields in order.
//! Schemas are validated at construction time, so a registered schema can be
//! trusted at use time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{FieldwiseError, Result};

// ============================================================================
// Field Types
// ============================================================================

/// Declared type of a field, validated at registration time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Free text
    Text,
    /// Numeric value; currency symbols and thousands separators are tolerated
    Number,
    /// Calendar date, parsed against the field hint or the configured formats
    Date,
    /// Enumerated set; the coerced value must be one of the options
    Choice { options: Vec<String> },
}

impl FieldType {
    /// Short name used in prompts and diagnostics
    pub fn describe(&self) -> String {
        match self {
            Self::Text => "text".to_string(),
            Self::Number => "number".to_string(),
            Self::Date => "date".to_string(),
            Self::Choice { options } => format!("one of [{}]", options.join(", ")),
        }
    }
}

// ============================================================================
// Field Specification
// ============================================================================

/// One field of a document-type schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within the schema
    pub name: String,

    /// Declared type
    #[serde(flatten)]
    pub field_type: FieldType,

    /// Required fields must appear in every validated record
    #[serde(default)]
    pub required: bool,

    /// Treat an empty string as a valid value instead of absence
    #[serde(default)]
    pub allow_empty: bool,

    /// Optional format hint (e.g., a currency, a chrono date pattern)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl FieldSpec {
    /// Create a field with the given type; optional by default
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            allow_empty: false,
            hint: None,
        }
    }

    /// Text field shorthand
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// Number field shorthand
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    /// Date field shorthand
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    /// Choice field shorthand
    pub fn choice(name: impl Into<String>, options: Vec<String>) -> Self {
        Self::new(name, FieldType::Choice { options })
    }

    /// Mark the field required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Accept empty-string values
    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Attach a format hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Named ordered set of field definitions describing one document type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema identifier (e.g., "invoice")
    pub id: String,

    /// Ordered field definitions
    pub fields: Vec<FieldSpec>,

    /// Optional free-text context passed to the extraction prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Schema {
    /// Create a schema, validating its field definitions.
    ///
    /// Fails with `InvalidSchema` on an empty id, an empty field list,
    /// duplicate or empty field names, or a choice field with no options.
    pub fn new(id: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FieldwiseError::InvalidSchema(
                "schema id must not be empty".to_string(),
            ));
        }
        if fields.is_empty() {
            return Err(FieldwiseError::InvalidSchema(format!(
                "schema '{id}' has no fields"
            )));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(FieldwiseError::InvalidSchema(format!(
                    "schema '{id}' has a field with an empty name"
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(FieldwiseError::InvalidSchema(format!(
                    "schema '{id}' has duplicate field '{}'",
                    field.name
                )));
            }
            if let FieldType::Choice { options } = &field.field_type {
                if options.is_empty() {
                    return Err(FieldwiseError::InvalidSchema(format!(
                        "choice field '{}' in schema '{id}' has no options",
                        field.name
                    )));
                }
            }
        }

        Ok(Self {
            id,
            fields,
            description: None,
        })
    }

    /// Attach a description used as extra prompt context
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of all required fields, in declaration order
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_schema() -> Schema {
        Schema::new(
            "invoice",
            vec![
                FieldSpec::text("invoiceNumber").required(),
                FieldSpec::number("amount").required().with_hint("currency"),
                FieldSpec::date("date"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_schema_construction() {
        let schema = invoice_schema();
        assert_eq!(schema.id, "invoice");
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.required_fields(), vec!["invoiceNumber", "amount"]);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Schema::new(
            "bad",
            vec![FieldSpec::text("amount"), FieldSpec::number("amount")],
        );
        assert!(matches!(result, Err(FieldwiseError::InvalidSchema(_))));
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(Schema::new("empty", vec![]).is_err());
        assert!(Schema::new("", vec![FieldSpec::text("x")]).is_err());
        assert!(Schema::new("blank-field", vec![FieldSpec::text("  ")]).is_err());
    }

    #[test]
    fn test_choice_without_options_rejected() {
        let result = Schema::new("bad", vec![FieldSpec::choice("status", vec![])]);
        assert!(matches!(result, Err(FieldwiseError::InvalidSchema(_))));
    }

    #[test]
    fn test_field_lookup() {
        let schema = invoice_schema();
        assert!(schema.field("amount").is_some());
        assert!(schema.field("amount").unwrap().required);
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_field_type_describe() {
        assert_eq!(FieldType::Number.describe(), "number");
        let choice = FieldType::Choice {
            options: vec!["paid".to_string(), "due".to_string()],
        };
        assert_eq!(choice.describe(), "one of [paid, due]");
    }
}
