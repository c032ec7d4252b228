//! Extraction prompt building
//!
//! The prompt lists the schema's fields with their types and hints and asks
//! for a JSON-only answer. The corrective variant appended during repair
//! names exactly the fields that came back missing or invalid.

use fieldwise_core::{FieldIssue, IssueKind, Schema};

/// Build the extraction prompt for a schema
pub fn build_prompt(schema: &Schema) -> String {
    let mut out = String::from(
        "You are a data extraction system. Extract the following fields from \
         the document image.\n\nFields:\n",
    );

    for field in &schema.fields {
        let requirement = if field.required { "required" } else { "optional" };
        out.push_str(&format!(
            "- {} ({}, {})",
            field.name,
            field.field_type.describe(),
            requirement
        ));
        if let Some(hint) = &field.hint {
            out.push_str(&format!("; format: {hint}"));
        }
        out.push('\n');
    }

    out.push_str(
        "\nRules:\n\
         1. Return ONLY a JSON object with exactly these keys.\n\
         2. If a field is not visible in the document, use null.\n\
         3. Copy values as written; do not invent or infer missing data.\n",
    );

    if let Some(description) = &schema.description {
        out.push_str(&format!("\nContext: {description}\n"));
    }
    out
}

/// Build the corrective re-extraction prompt for a repair attempt
pub fn build_repair_prompt(base: &str, issues: &[FieldIssue]) -> String {
    let mut out = String::from(base);
    out.push_str("\nYour previous answer had problems with these fields:\n");
    for issue in issues {
        match (&issue.kind, &issue.raw) {
            (IssueKind::Missing, _) => {
                out.push_str(&format!("- {}: missing\n", issue.field));
            }
            (kind, Some(raw)) => {
                out.push_str(&format!("- {}: {kind} (got \"{raw}\")\n", issue.field));
            }
            (kind, None) => {
                out.push_str(&format!("- {}: {kind}\n", issue.field));
            }
        }
    }
    out.push_str(
        "Look at the document again and return the full JSON object with \
         these fields corrected.\n",
    );
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fieldwise_core::FieldSpec;

    fn schema() -> Schema {
        Schema::new(
            "invoice",
            vec![
                FieldSpec::text("invoiceNumber").required(),
                FieldSpec::number("amount").required().with_hint("currency"),
                FieldSpec::date("date"),
            ],
        )
        .unwrap()
        .with_description("Retail invoices, single page.")
    }

    #[test]
    fn test_prompt_lists_fields_and_rules() {
        let prompt = build_prompt(&schema());
        assert!(prompt.contains("- invoiceNumber (text, required)"));
        assert!(prompt.contains("- amount (number, required); format: currency"));
        assert!(prompt.contains("- date (date, optional)"));
        assert!(prompt.contains("ONLY a JSON object"));
        assert!(prompt.contains("Retail invoices"));
    }

    #[test]
    fn test_repair_prompt_names_offending_fields() {
        let base = build_prompt(&schema());
        let repaired = build_repair_prompt(
            &base,
            &[
                FieldIssue::missing("invoiceNumber"),
                FieldIssue::invalid("amount", "twelve"),
            ],
        );

        assert!(repaired.starts_with(&base));
        assert!(repaired.contains("- invoiceNumber: missing"));
        assert!(repaired.contains("- amount: invalid (got \"twelve\")"));
        // Untouched fields are not called out.
        assert!(!repaired.contains("- date:"));
    }
}
