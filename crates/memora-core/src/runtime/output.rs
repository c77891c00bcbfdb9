//! Turning accumulated backend text into structured output.

use serde_json::{Value, json};

/// Parse `raw` as JSON, then as the body of a leading fenced code block,
/// and finally fall back to `{"content": raw}`. Never fails.
pub fn parse_output(raw: &str) -> Value {
    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with("```") {
        unwrap_fence(trimmed).unwrap_or(trimmed)
    } else {
        trimmed
    };
    serde_json::from_str(candidate).unwrap_or_else(|_| json!({ "content": raw }))
}

/// Body of a "```" or "```json" fenced block, without the fence lines.
pub fn unwrap_fence(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let body = after.strip_prefix('\n')?;
    let end = body.find("\n```")?;
    Some(&body[..end])
}

/// The object form of a value, or an empty object.
pub fn as_object(value: &Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
