//! Payload flattening.
//!
//! Rules match against a single string: object keys and values, array items
//! and scalars joined by single spaces. Object keys are visited in sorted
//! order so the text (and therefore every span) is deterministic.

use serde_json::Value;

/// Flattens a payload to scan text with whitespace collapsed.
pub fn flatten(payload: &Value) -> String {
    let mut parts = Vec::new();
    collect(payload, &mut parts);
    collapse_whitespace(&parts.join(" "))
}

fn collect(value: &Value, parts: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => parts.push(b.to_string()),
        Value::Number(n) => parts.push(n.to_string()),
        Value::String(s) => parts.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                collect(item, parts);
            }
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                parts.push(key.clone());
                if let Some(item) = map.get(key) {
                    collect(item, parts);
                }
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
