//! # Canonical JSON and Digests
//!
//! Every digest the gate records (schema fingerprints, rule-set fingerprints,
//! payload digests, log entry hashes) is computed over a canonical JSON form so
//! that semantically identical documents always hash identically.
//!
//! The canonical form follows RFC 8785 closely enough for audit purposes:
//!
//! 1. **Object Keys**: sorted by UTF-16 code units
//! 2. **Numbers**: integers verbatim, whole floats folded to integers
//! 3. **Strings**: minimal escaping
//! 4. **Whitespace**: none
//! 5. **Arrays**: original element order
//!
//! ## Example
//!
//! ```rust
//! use gate_types::canonical::{canonicalize, digest_hex};
//! use serde_json::json;
//!
//! let a = json!({"b": 1, "a": 2});
//! let b = json!({"a": 2, "b": 1});
//!
//! assert_eq!(canonicalize(&a), r#"{"a":2,"b":1}"#);
//! assert_eq!(digest_hex(&a), digest_hex(&b));
//! ```

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Canonicalizes a JSON value.
///
/// Semantically identical inputs always produce bytewise identical outputs.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// SHA-256 of the canonical form, hex encoded.
pub fn digest_hex(value: &Value) -> String {
    let canonical = canonicalize(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical digest of any serializable value.
///
/// Returns `None` only when the value cannot be represented as JSON
/// (for example a map with non-string keys).
pub fn digest_of<T: serde::Serialize>(value: &T) -> Option<String> {
    serde_json::to_value(value).ok().map(|v| digest_hex(&v))
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&canonical_number(n)),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| compare_utf16(a, b));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn canonical_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_nan() || f.is_infinite() => "null".to_string(),
        Some(f) if f.fract() == 0.0 && f.abs() < (i64::MAX as f64) => (f as i64).to_string(),
        Some(f) => format!("{}", f),
        None => n.to_string(),
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn compare_utf16(a: &str, b: &str) -> std::cmp::Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(canonicalize(&json!(null)), "null");
        assert_eq!(canonicalize(&json!(true)), "true");
        assert_eq!(canonicalize(&json!(-17)), "-17");
        assert_eq!(canonicalize(&json!(2.0)), "2");
        assert_eq!(canonicalize(&json!(2.5)), "2.5");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(canonicalize(&json!("he\"llo")), r#""he\"llo""#);
        assert_eq!(canonicalize(&json!("a\nb")), r#""a\nb""#);
        assert_eq!(canonicalize(&json!("\u{1}")), r#""\u0001""#);
    }

    #[test]
    fn test_nested_key_sorting() {
        let value = json!({"z": [3, {"b": 1, "a": 0}], "a": {"y": 1, "x": 2}});
        assert_eq!(
            canonicalize(&value),
            r#"{"a":{"x":2,"y":1},"z":[3,{"a":0,"b":1}]}"#
        );
    }

    #[test]
    fn test_digest_is_order_independent() {
        let a = json!({"alpha": 1, "beta": [1, 2]});
        let b = json!({"beta": [1, 2], "alpha": 1});
        assert_eq!(digest_hex(&a), digest_hex(&b));
        assert_eq!(digest_hex(&a).len(), DIGEST_HEX_LEN);
    }

    #[test]
    fn test_digest_detects_change() {
        assert_ne!(digest_hex(&json!({"a": 1})), digest_hex(&json!({"a": 2})));
    }

    #[test]
    fn test_array_order_matters() {
        assert_ne!(digest_hex(&json!([1, 2])), digest_hex(&json!([2, 1])));
    }
}
