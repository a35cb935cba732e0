//! Extraction of structured payloads from model output.
//!
//! Models are asked to answer with a JSON object but often wrap it in
//! prose or code fences. The extractor takes everything between the first
//! `{` and the last `}`; if that is not a JSON object the whole text becomes
//! the summary of a fallback payload. Extraction never fails.

use crate::models::Recommendation;
use serde_json::{json, Value};
use tracing::warn;

/// Extract the embedded JSON object from `text`, or return the fallback
/// payload `{summary: text, findings: [], recommendation: COMMENT}`.
pub fn extract_payload(text: &str) -> Value {
    match embedded_object(text) {
        Some(value) => value,
        None => fallback_payload(text),
    }
}

/// True when `text` carries a parseable JSON object.
pub fn has_payload(text: &str) -> bool {
    embedded_object(text).is_some()
}

fn embedded_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    // Both indices sit on ASCII braces, so the slice is on char boundaries.
    let candidate = &text[start..=end];
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(e) => {
            warn!("Failed to parse JSON payload: {}", e);
            None
        }
    }
}

fn fallback_payload(text: &str) -> Value {
    json!({
        "summary": text,
        "findings": [],
        "recommendation": Recommendation::Comment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_fallback(text: &str) {
        let value = extract_payload(text);
        assert_eq!(value["summary"], text);
        assert_eq!(value["findings"], json!([]));
        assert_eq!(value["recommendation"], "COMMENT");
    }

    #[test]
    fn test_extracts_fenced_json() {
        let text = "Here is my review:\n```json\n{\"pr_accessed\": true, \"findings\": []}\n```\nThanks!";
        let value = extract_payload(text);
        assert_eq!(value["pr_accessed"], true);
        assert!(has_payload(text));
    }

    #[test]
    fn test_nested_braces_use_outermost_pair() {
        let text = r#"{"findings": [{"severity": "LOW", "file": "a.rs"}], "score": 9}"#;
        let value = extract_payload(text);
        assert_eq!(value["score"], 9);
        assert_eq!(value["findings"][0]["file"], "a.rs");
    }

    #[test]
    fn test_plain_prose_falls_back_verbatim() {
        assert_fallback("The PR looks good to me, nothing to add.");
    }

    #[test]
    fn test_empty_string_falls_back() {
        assert_fallback("");
    }

    #[test]
    fn test_unbalanced_braces_fall_back() {
        assert_fallback("{ \"summary\": \"cut off");
        assert_fallback("closing only }");
        assert_fallback("} reversed {");
    }

    #[test]
    fn test_malformed_json_falls_back() {
        assert_fallback("{not: json, at all}");
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        assert_fallback("🔴 критично {ошибка");
        let value = extract_payload("🎉 {\"summary\": \"✨\"} 🚀");
        assert_eq!(value["summary"], "✨");
    }
}
