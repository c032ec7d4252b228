//! Fieldwise Parser - Model response to candidate record
//!
//! Converts raw model output into a `CandidateRecord` matching a schema's
//! field set. Three passes, best-structured first:
//! 1. Embedded/fenced JSON payload - extract directly; when one parses it is
//!    authoritative and the text passes are skipped
//! 2. Labelled key/value text ("Invoice No: 4521") - anchor on labels
//! 3. Loosely structured prose - locate each field's label words and take
//!    the following token span, filling only fields pass 2 left absent
//!
//! Parsing never fails: malformed input degrades to a partial or empty
//! candidate, and the failure decision is deferred to the validator. A field
//! the response does not mention is simply absent from the candidate.

use fieldwise_core::{CandidateRecord, Provenance, RawModelResponse, Schema};

pub mod json;
pub mod labels;
pub mod names;

/// Parse a raw model response into a candidate record for the given schema.
///
/// The prose pass only fills fields the key/value pass did not recognize.
pub fn parse(raw: &RawModelResponse, schema: &Schema, provenance: Provenance) -> CandidateRecord {
    let mut candidate = CandidateRecord::new(provenance);

    if raw.is_blank() {
        return candidate;
    }

    // A parseable JSON payload is authoritative: a null there means the
    // model looked and found nothing, so the text passes must not scavenge
    // a value for it from the surrounding prose.
    if let Some(value) = json::extract_object(&raw.text) {
        json::apply(&value, schema, &mut candidate);
    } else {
        labels::apply_key_values(&raw.text, schema, &mut candidate);
        labels::apply_prose(&raw.text, schema, &mut candidate);
    }

    tracing::debug!(
        schema = %schema.id,
        recognized = candidate.values.len(),
        of = schema.fields.len(),
        "parsed model response"
    );
    candidate
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fieldwise_core::FieldSpec;

    fn invoice_schema() -> Schema {
        Schema::new(
            "invoice",
            vec![
                FieldSpec::text("invoiceNumber").required(),
                FieldSpec::number("amount").required(),
                FieldSpec::date("date"),
            ],
        )
        .unwrap()
    }

    fn parse_text(text: &str) -> CandidateRecord {
        parse(
            &RawModelResponse::new(text),
            &invoice_schema(),
            Provenance::new("mock", 0),
        )
    }

    #[test]
    fn test_labelled_text_scenario() {
        let candidate = parse_text("Invoice No: 4521, Total Amount: $1,250.00");
        assert_eq!(candidate.get("invoiceNumber"), Some("4521"));
        assert_eq!(candidate.get("amount"), Some("$1,250.00"));
        assert_eq!(candidate.get("date"), None);
    }

    #[test]
    fn test_fenced_json_payload() {
        let candidate = parse_text(
            "Here is the extracted data:\n```json\n{\"invoiceNumber\": \"4521\", \"amount\": 1250.0, \"date\": null}\n```",
        );
        assert_eq!(candidate.get("invoiceNumber"), Some("4521"));
        assert_eq!(candidate.get("amount"), Some("1250.0"));
        // null means the model could not find it
        assert_eq!(candidate.get("date"), None);
    }

    #[test]
    fn test_items_batch_wrapper() {
        let candidate =
            parse_text(r#"{"items": [{"invoice_number": "4521", "amount": "$1,250.00"}]}"#);
        assert_eq!(candidate.get("invoiceNumber"), Some("4521"));
        assert_eq!(candidate.get("amount"), Some("$1,250.00"));
    }

    #[test]
    fn test_prose_response() {
        let candidate =
            parse_text("The invoice number is 4521 and the total amount was $1,250.00.");
        assert_eq!(candidate.get("invoiceNumber"), Some("4521"));
        assert_eq!(candidate.get("amount"), Some("$1,250.00"));
    }

    #[test]
    fn test_empty_response_yields_empty_candidate() {
        let candidate = parse_text("");
        assert!(candidate.is_empty());
    }

    #[test]
    fn test_off_topic_response_yields_empty_candidate() {
        let candidate = parse_text("I'm sorry, I cannot see any document in this image.");
        assert!(candidate.is_empty());
    }

    #[test]
    fn test_partial_response() {
        let candidate = parse_text("Invoice No: 4521");
        assert_eq!(candidate.get("invoiceNumber"), Some("4521"));
        assert_eq!(candidate.get("amount"), None);
    }

    #[test]
    fn test_json_wins_over_later_passes() {
        // The JSON block already names the field; the prose around it must
        // not overwrite the structured value.
        let candidate = parse_text(
            "The amount reads 999.\n{\"invoiceNumber\": \"4521\", \"amount\": \"1250.00\"}",
        );
        assert_eq!(candidate.get("amount"), Some("1250.00"));
    }

    #[test]
    fn test_multiline_key_values() {
        let candidate = parse_text("Invoice Number: INV-4521\nAmount Due: 1,250.00\nDate: 2024-03-15");
        assert_eq!(candidate.get("invoiceNumber"), Some("INV-4521"));
        assert_eq!(candidate.get("amount"), Some("1,250.00"));
        assert_eq!(candidate.get("date"), Some("2024-03-15"));
    }
}
