//! Secret redaction for persisted payloads.
//!
//! Best effort: obvious credentials in SUBMITTED payload snapshots are
//! replaced before they reach durable storage. The payload digest recorded
//! alongside is computed before redaction.

use regex::Regex;
use serde_json::Value;

const REDACTED: &str = "[REDACTED]";
const REDACTED_KEY_BLOCK: &str = "[REDACTED_PRIVATE_KEY_BLOCK]";

/// Compiled redaction patterns.
#[derive(Debug, Clone)]
pub struct Redactor {
    patterns: Vec<(Regex, &'static str)>,
}

impl Redactor {
    /// Builds the default pattern set.
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = vec![
            // key = value style assignments keep the key name
            (
                Regex::new(r#"(?i)\b(api[_-]?key|secret|token|bearer)\b\s*[:=]\s*['"]?[A-Za-z0-9\-_]{8,}['"]?"#)?,
                "$1=[REDACTED]",
            ),
            (Regex::new(r"\bgh[pousr]_[A-Za-z0-9]{20,}\b")?, REDACTED),
            (Regex::new(r"\bAKIA[0-9A-Z]{16}\b")?, REDACTED),
            (Regex::new(r"\b[A-Za-z0-9\-_]{32,}\b")?, REDACTED),
        ];
        Ok(Self { patterns })
    }

    /// Redacts one string. Returns `None` when nothing matched.
    pub fn redact_str(&self, text: &str) -> Option<String> {
        if text.contains("-----BEGIN") && text.contains("PRIVATE KEY-----") {
            return Some(REDACTED_KEY_BLOCK.to_string());
        }

        let mut out = text.to_string();
        let mut changed = false;
        for (pattern, replacement) in &self.patterns {
            if pattern.is_match(&out) {
                out = pattern.replace_all(&out, *replacement).into_owned();
                changed = true;
            }
        }
        changed.then_some(out)
    }

    /// Redacts every string in a JSON value. The flag reports whether
    /// anything was replaced.
    pub fn redact_value(&self, value: &Value) -> (Value, bool) {
        match value {
            Value::String(s) => match self.redact_str(s) {
                Some(r) => (Value::String(r), true),
                None => (value.clone(), false),
            },
            Value::Array(items) => {
                let mut changed = false;
                let items = items
                    .iter()
                    .map(|item| {
                        let (v, c) = self.redact_value(item);
                        changed |= c;
                        v
                    })
                    .collect();
                (Value::Array(items), changed)
            }
            Value::Object(map) => {
                let mut changed = false;
                let map = map
                    .iter()
                    .map(|(k, item)| {
                        let (v, c) = self.redact_value(item);
                        changed |= c;
                        (k.clone(), v)
                    })
                    .collect();
                (Value::Object(map), changed)
            }
            _ => (value.clone(), false),
        }
    }
}
