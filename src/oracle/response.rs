//! Extraction of JSON payloads from raw model text.
//!
//! Models wrap their answers in prose, markdown code fences, or a
//! `{"data": ...}` envelope. Extraction tries, in order: the whole text,
//! the first fenced code block, then the outermost bracketed span.

use serde_json::Value;

const FENCE: &str = "```";

/// Bound on nested envelope/string unwrapping.
const MAX_UNWRAP_DEPTH: usize = 8;

/// Pulls the JSON value out of `raw`, or `None` if there is none.
pub fn extract_json(raw: &str) -> Option<Value> {
    extract_at_depth(raw, 0)
}

fn extract_at_depth(raw: &str, depth: usize) -> Option<Value> {
    if depth > MAX_UNWRAP_DEPTH {
        return None;
    }
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return unwrap_envelope(value, depth);
    }

    if let Some(inner) = fenced_block(text) {
        if let Some(value) = extract_at_depth(inner, depth + 1) {
            return Some(value);
        }
    }

    let span = bracketed_span(text)?;
    let value = serde_json::from_str::<Value>(span).ok()?;
    unwrap_envelope(value, depth)
}

/// Strips `{"data": ...}` envelopes from an already structured value.
/// Strings are left as they are.
pub fn strip_envelope(mut value: Value) -> Value {
    for _ in 0..=MAX_UNWRAP_DEPTH {
        match value {
            Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
                match map.remove("data") {
                    Some(inner) => value = inner,
                    None => return Value::Object(map),
                }
            }
            other => return other,
        }
    }
    value
}

/// Unwraps `{"data": ...}` envelopes and JSON-encoded strings.
fn unwrap_envelope(value: Value, depth: usize) -> Option<Value> {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            let inner = map.remove("data")?;
            unwrap_envelope(inner, depth + 1)
        }
        Value::String(s) => {
            let trimmed = s.trim_start();
            if trimmed.starts_with('[') || trimmed.starts_with('{') || trimmed.contains(FENCE) {
                extract_at_depth(&s, depth + 1).or(Some(Value::String(s)))
            } else {
                Some(Value::String(s))
            }
        }
        other => Some(other),
    }
}

/// Body of the first markdown code fence, without its language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE)? + FENCE.len();
    let rest = &text[start..];
    // The opening fence line may carry a language tag such as `json`.
    let body_start = match rest.find('\n') {
        Some(nl) if !rest[..nl].trim().contains(['{', '[']) => nl + 1,
        _ => 0,
    };
    let body = &rest[body_start..];
    let end = body.find(FENCE)?;
    Some(&body[..end])
}

/// Text from the first `[`/`{` to the last matching closer.
fn bracketed_span(text: &str) -> Option<&str> {
    let open = text.find(['[', '{'])?;
    let closer = if text[open..].starts_with('[') { ']' } else { '}' };
    let close = text.rfind(closer)?;
    if close <= open {
        return None;
    }
    Some(&text[open..=close])
}
