//! Candidate validation and type coercion
//!
//! `check` is a pure function from a candidate record and a schema to either
//! a fully typed field map or the list of per-field issues. It is the sole
//! place terminal extraction failures originate; parsing upstream never
//! fails and the orchestrator only decides whether the repair budget allows
//! another attempt.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use fieldwise_core::{
    CandidateRecord, FieldIssue, FieldType, FieldValue, Schema, ValidatorConfig,
};

/// Validate a candidate against a schema.
///
/// Returns the typed field map when every required field is present and
/// every present field coerces to its declared type; otherwise returns the
/// issues in schema declaration order. Empty-string values count as absent
/// unless the field allows empty.
pub fn check(
    candidate: &CandidateRecord,
    schema: &Schema,
    options: &ValidatorConfig,
) -> Result<BTreeMap<String, FieldValue>, Vec<FieldIssue>> {
    let mut fields = BTreeMap::new();
    let mut issues = Vec::new();

    for spec in &schema.fields {
        let raw = candidate.get(&spec.name).map(str::trim);

        let raw = match raw {
            None => {
                if spec.required {
                    issues.push(FieldIssue::missing(&spec.name));
                }
                continue;
            }
            Some("") if !spec.allow_empty => {
                if spec.required {
                    issues.push(FieldIssue::missing(&spec.name));
                }
                continue;
            }
            Some(raw) => raw,
        };

        match &spec.field_type {
            FieldType::Text => {
                fields.insert(spec.name.clone(), FieldValue::Text(raw.to_string()));
            }
            FieldType::Number => match coerce_number(raw) {
                Some(n) => {
                    fields.insert(spec.name.clone(), FieldValue::Number(n));
                }
                None => issues.push(FieldIssue::invalid(&spec.name, raw)),
            },
            FieldType::Date => {
                match coerce_date(raw, spec.hint.as_deref(), &options.date_formats) {
                    Some(d) => {
                        fields.insert(spec.name.clone(), FieldValue::Date(d));
                    }
                    None => issues.push(FieldIssue::invalid(&spec.name, raw)),
                }
            }
            FieldType::Choice { options: allowed } => {
                match allowed.iter().find(|o| o.eq_ignore_ascii_case(raw)) {
                    Some(canonical) => {
                        fields.insert(spec.name.clone(), FieldValue::Text(canonical.clone()));
                    }
                    None => issues.push(FieldIssue::not_in_set(&spec.name, raw)),
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(fields)
    } else {
        Err(issues)
    }
}

/// Parse a numeric value, tolerating currency symbols, currency codes,
/// thousands separators, and accounting-style parentheses for negatives.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (inner, negate) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (trimmed, false),
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | '₩' | '₹' | ',' | ' ' | '\u{a0}'))
        .collect();

    // Currency codes like "USD 1250" or "1250 EUR" survive symbol stripping.
    let cleaned = cleaned
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim_end_matches(|c: char| c.is_ascii_alphabetic());

    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| if negate { -n } else { n })
}

/// Parse a date against the field hint first, then the configured format
/// list in order; the first successful format wins.
pub fn coerce_date(raw: &str, hint: Option<&str>, formats: &[String]) -> Option<NaiveDate> {
    let trimmed = raw.trim();

    if let Some(hint) = hint {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, hint) {
            return Some(date);
        }
    }
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

// ============================================================================
// Tests
// ============================================================================
