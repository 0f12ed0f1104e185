//! Parsing of JSON answers out of model text.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

/// Parse a JSON object from a model response.
///
/// Tried in order: the whole text, the first fenced code block, then the
/// outermost `{ ... }` of the text. Fences inside JSON string values are
/// left alone because the whole text is parsed first.
pub(crate) fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(.*?)```").expect("valid regex")
    });

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty response".to_string());
    }

    let first_err = match serde_json::from_str(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(caps) = FENCE_RE.captures(trimmed) {
        if let Ok(value) = serde_json::from_str(caps[1].trim()) {
            return Ok(value);
        }
    }

    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(format!("not JSON: {first_err}"));
    };
    if end <= start {
        return Err(format!("not JSON: {first_err}"));
    }
    serde_json::from_str(&trimmed[start..=end]).map_err(|e| format!("invalid JSON: {e}"))
}
