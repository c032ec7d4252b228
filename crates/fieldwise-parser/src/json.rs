//! Structured-payload pass
//!
//! Models asked for JSON usually return it, often wrapped in prose or a
//! markdown fence, sometimes as a `{"items": [...]}` batch. This pass digs
//! the first balanced JSON object out of the text and maps its keys onto
//! schema fields.

use serde_json::Value;

use fieldwise_core::{CandidateRecord, Schema};

use crate::names;

/// Extract the first parseable JSON object from free text.
///
/// Scans for balanced `{...}` spans (string- and escape-aware) so fenced or
/// prose-embedded payloads are found without relying on the fence markers.
pub fn extract_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if start.is_some() => in_string = true,
            b'{' => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if start.is_some() => {
                depth -= 1;
                if depth == 0 {
                    let span = &text[start.unwrap_or(0)..=i];
                    if let Ok(value) = serde_json::from_str::<Value>(span) {
                        return Some(value);
                    }
                    // Not valid JSON after all; keep scanning past this span.
                    start = None;
                }
            }
            _ => {}
        }
    }
    None
}

/// Map a JSON object's keys onto schema fields, filling absent fields only.
///
/// Accepts either a flat object or a `{"items": [{...}]}` batch wrapper, in
/// which case the first item is used (one record per page).
pub fn apply(value: &Value, schema: &Schema, candidate: &mut CandidateRecord) {
    let object = match unwrap_batch(value) {
        Some(Value::Object(map)) => map,
        _ => return,
    };

    for field in &schema.fields {
        if candidate.get(&field.name).is_some() {
            continue;
        }
        let field_tokens = names::tokens(&field.name);

        let mut best: Option<(f32, &Value)> = None;
        for (key, item) in object {
            if let Some(score) = names::label_score(&field_tokens, key) {
                if best.map_or(true, |(s, _)| score > s) {
                    best = Some((score, item));
                }
            }
        }

        if let Some((_, item)) = best {
            if let Some(text) = scalar_text(item) {
                candidate.insert(&field.name, text);
            }
        }
    }
}

fn unwrap_batch(value: &Value) -> Option<&Value> {
    if let Value::Object(map) = value {
        if let Some(Value::Array(items)) = map.get("items") {
            return items.iter().find(|v| v.is_object());
        }
    }
    Some(value)
}

/// Render a scalar JSON value as raw text; null and nested values are
/// treated as not-extracted.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
