//! Label-anchored passes
//!
//! Pass 2 handles labelled key/value text: every `Label: value` (or
//! `Label = value`) anchor is collected, a value runs from its anchor to
//! the next anchor or end of line, and each schema field binds to its
//! best-scoring label.
//!
//! Pass 3 handles running prose: each still-absent field's label words are
//! located in the text and the following token span is taken as the value.
//! Thousands separators are respected, so "$1,250.00" survives intact.

use regex::Regex;

use fieldwise_core::{CandidateRecord, Schema};

use crate::names;

const ANCHOR_PATTERN: &str = r"([A-Za-z][A-Za-z0-9 .#/_-]{0,40}?)\s*[:=]\s*";

/// Fill absent fields from `Label: value` pairs
pub fn apply_key_values(text: &str, schema: &Schema, candidate: &mut CandidateRecord) {
    let Ok(anchor) = Regex::new(ANCHOR_PATTERN) else {
        return;
    };

    let matches: Vec<regex::Captures> = anchor.captures_iter(text).collect();
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (i, caps) in matches.iter().enumerate() {
        let Some(whole) = caps.get(0) else { continue };
        let Some(label) = caps.get(1) else { continue };

        let value_start = whole.end();
        let mut value_end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        if let Some(newline) = text[value_start..value_end].find('\n') {
            value_end = value_start + newline;
        }

        let value = text[value_start..value_end]
            .trim()
            .trim_end_matches([',', ';', '.', '"'])
            .trim();
        if !value.is_empty() {
            pairs.push((label.as_str().trim().to_string(), value.to_string()));
        }
    }

    for field in &schema.fields {
        if candidate.get(&field.name).is_some() {
            continue;
        }
        let field_tokens = names::tokens(&field.name);

        let mut best: Option<(f32, &str)> = None;
        for (label, value) in &pairs {
            if let Some(score) = names::label_score(&field_tokens, label) {
                // Strictly-greater keeps the earliest pair on ties.
                if best.map_or(true, |(s, _)| score > s) {
                    best = Some((score, value));
                }
            }
        }
        if let Some((_, value)) = best {
            candidate.insert(&field.name, value);
        }
    }
}

/// Fill absent fields by locating their label words in running prose
pub fn apply_prose(text: &str, schema: &Schema, candidate: &mut CandidateRecord) {
    for field in &schema.fields {
        if candidate.get(&field.name).is_some() {
            continue;
        }
        let field_tokens = names::tokens(&field.name);
        if field_tokens.is_empty() {
            continue;
        }

        let label_pattern = field_tokens
            .iter()
            .map(|t| names::surface_forms(t))
            .collect::<Vec<_>>()
            .join(r"[\s._-]+");
        let pattern = format!(r"(?i)\b{label_pattern}\b(?:\s+(?:is|was|of))?\s*[:=]?\s*");
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };

        for m in re.find_iter(text) {
            let value = take_value_span(&text[m.end()..]);
            if !value.is_empty() {
                candidate.insert(&field.name, value);
                break;
            }
        }
    }
}

/// Take the token span following a label, stopping at sentence structure.
///
/// A comma or period followed by a digit is kept (thousands and decimal
/// separators); a bare " and " ends the span.
fn take_value_span(rest: &str) -> String {
    let bytes = rest.as_bytes();
    let mut end = 0;

    for (i, ch) in rest.char_indices() {
        if end >= 80 {
            break;
        }
        match ch {
            '\n' | ';' => break,
            ',' | '.' => {
                let next_is_digit = bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit());
                if !next_is_digit {
                    break;
                }
            }
            c if c.is_whitespace() => {
                let lookahead = &bytes[i..];
                if lookahead.len() >= 5 && lookahead[..5].eq_ignore_ascii_case(b" and ") {
                    break;
                }
            }
            _ => {}
        }
        end = i + ch.len_utf8();
    }

    rest[..end].trim().trim_matches('"').trim().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fieldwise_core::{FieldSpec, Provenance};

    fn schema() -> Schema {
        Schema::new(
            "invoice",
            vec![
                FieldSpec::text("invoiceNumber"),
                FieldSpec::number("amount"),
                FieldSpec::date("date"),
            ],
        )
        .unwrap()
    }

    fn candidate() -> CandidateRecord {
        CandidateRecord::new(Provenance::new("mock", 0))
    }

    #[test]
    fn test_key_values_same_line() {
        let mut c = candidate();
        apply_key_values(
            "Invoice No: 4521, Total Amount: $1,250.00",
            &schema(),
            &mut c,
        );
        assert_eq!(c.get("invoiceNumber"), Some("4521"));
        assert_eq!(c.get("amount"), Some("$1,250.00"));
    }

    #[test]
    fn test_key_values_multiline() {
        let mut c = candidate();
        apply_key_values(
            "Invoice Number: INV-4521\nAmount Due = 1,250.00\nDate: 2024-03-15",
            &schema(),
            &mut c,
        );
        assert_eq!(c.get("invoiceNumber"), Some("INV-4521"));
        assert_eq!(c.get("amount"), Some("1,250.00"));
        assert_eq!(c.get("date"), Some("2024-03-15"));
    }

    #[test]
    fn test_exact_label_beats_wordy_label() {
        let mut c = candidate();
        apply_key_values(
            "Previous Amount: 10.00\nAmount: 25.00",
            &schema(),
            &mut c,
        );
        assert_eq!(c.get("amount"), Some("25.00"));
    }

    #[test]
    fn test_unrelated_labels_ignored() {
        let mut c = candidate();
        apply_key_values("Customer: ACME Corp\nVAT ID: DE12345", &schema(), &mut c);
        assert!(c.is_empty());
    }

    #[test]
    fn test_prose_extraction() {
        let mut c = candidate();
        apply_prose(
            "The invoice number is 4521 and the total amount was $1,250.00.",
            &schema(),
            &mut c,
        );
        assert_eq!(c.get("invoiceNumber"), Some("4521"));
        assert_eq!(c.get("amount"), Some("$1,250.00"));
    }

    #[test]
    fn test_prose_does_not_overwrite() {
        let mut c = candidate();
        c.insert("amount", "99.00");
        apply_prose("the amount was 123", &schema(), &mut c);
        assert_eq!(c.get("amount"), Some("99.00"));
    }

    #[test]
    fn test_value_span_stops_at_sentence() {
        assert_eq!(take_value_span("4521 and more text"), "4521");
        assert_eq!(take_value_span("$1,250.00."), "$1,250.00");
        assert_eq!(take_value_span("ACME Corp, registered in Berlin"), "ACME Corp");
        assert_eq!(take_value_span("15 March 2024\nnext line"), "15 March 2024");
    }
}
