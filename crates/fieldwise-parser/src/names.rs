//! Field-name normalization and label matching
//!
//! Schema field names (camelCase, snake_case) and document labels
//! ("Invoice No", "AMOUNT DUE") are compared as normalized word tokens,
//! with a small abbreviation table so "No"/"Num"/"#" line up with "number".

/// Split a name or label into lowercase word tokens.
///
/// Splits on non-alphanumeric characters and camelCase boundaries; each
/// token is mapped through the abbreviation table ("#" survives splitting
/// as its own token via the table below).
pub fn tokens(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && prev_lower {
                if !current.is_empty() {
                    words.push(current.clone());
                    current.clear();
                }
            }
            prev_lower = ch.is_lowercase() || ch.is_numeric();
            current.extend(ch.to_lowercase());
        } else {
            if ch == '#' {
                if !current.is_empty() {
                    words.push(current.clone());
                    current.clear();
                }
                words.push("#".to_string());
            }
            if !current.is_empty() {
                words.push(current.clone());
                current.clear();
            }
            prev_lower = false;
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.into_iter().map(|w| canonical(&w).to_string()).collect()
}

/// Map common label abbreviations to the token schema authors write out
fn canonical(token: &str) -> &str {
    match token {
        "no" | "num" | "nbr" | "#" => "number",
        "amt" => "amount",
        "qty" => "quantity",
        "desc" => "description",
        "dt" => "date",
        "inv" => "invoice",
        "addr" => "address",
        _ => token,
    }
}

/// Score how well a document label matches a field's tokens.
///
/// The field's last token (its head noun) must appear in the label; the
/// score is the fraction of field tokens covered, lightly penalized for
/// extra label words so an exact label beats a wordier one. Returns `None`
/// below the acceptance threshold.
pub fn label_score(field_tokens: &[String], label: &str) -> Option<f32> {
    if field_tokens.is_empty() {
        return None;
    }
    let label_tokens = tokens(label);
    if label_tokens.is_empty() {
        return None;
    }

    let head = &field_tokens[field_tokens.len() - 1];
    if !label_tokens.contains(head) {
        return None;
    }

    let hits = field_tokens
        .iter()
        .filter(|t| label_tokens.contains(t))
        .count();
    let extra = label_tokens.len().saturating_sub(hits);
    let score = hits as f32 / field_tokens.len() as f32 - 0.05 * extra as f32;

    (score >= 0.5).then_some(score)
}

/// Regex alternation of surface forms a token takes in documents
pub fn surface_forms(token: &str) -> String {
    match token {
        "number" => r"(?:number|no\.?|num\.?|nbr|\#)".to_string(),
        "amount" => r"(?:amount|amt\.?)".to_string(),
        "quantity" => r"(?:quantity|qty\.?)".to_string(),
        "description" => r"(?:description|desc\.?)".to_string(),
        "invoice" => r"(?:invoice|inv\.?)".to_string(),
        "date" => r"(?:date|dated)".to_string(),
        _ => regex::escape(token),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_split() {
        assert_eq!(tokens("invoiceNumber"), vec!["invoice", "number"]);
        assert_eq!(tokens("amount"), vec!["amount"]);
    }

    #[test]
    fn test_snake_and_space_split() {
        assert_eq!(tokens("invoice_number"), vec!["invoice", "number"]);
        assert_eq!(tokens("Invoice Number"), vec!["invoice", "number"]);
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(tokens("Invoice No"), vec!["invoice", "number"]);
        assert_eq!(tokens("Inv #"), vec!["invoice", "number"]);
        assert_eq!(tokens("Amt Due"), vec!["amount", "due"]);
    }

    #[test]
    fn test_label_score_exact_and_partial() {
        let field = tokens("invoiceNumber");
        assert_eq!(label_score(&field, "Invoice No"), Some(1.0));
        assert!(label_score(&field, "No").is_some()); // head matched, half score
        assert!(label_score(&field, "Customer Name").is_none());
    }

    #[test]
    fn test_label_score_prefers_exact() {
        let field = tokens("amount");
        let exact = label_score(&field, "Amount").unwrap();
        let wordy = label_score(&field, "Total Amount").unwrap();
        assert!(exact > wordy);
    }

    #[test]
    fn test_head_token_required() {
        let field = tokens("invoiceNumber");
        // "Invoice Date" mentions invoice but not the head token "number"
        assert!(label_score(&field, "Invoice Date").is_none());
    }
}
