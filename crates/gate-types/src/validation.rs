//! Schema validation outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One problem found in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON-path-like location, e.g. `$.meta.tags[1]`.
    pub path: String,
    /// Human readable reason.
    pub reason: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Outcome of checking a payload against its schema.
///
/// Records which registry snapshot and which exact schema produced it, so an
/// audit can reproduce the check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Schema (proposal type) name.
    pub schema: String,
    /// Registry snapshot version used.
    pub registry_version: u64,
    /// Canonical digest of the schema definition.
    pub schema_fingerprint: String,
    /// Whether the payload conforms.
    pub passed: bool,
    /// Every violation, in traversal order.
    pub violations: Vec<Violation>,
    /// Non-failing observations (unknown fields under the `warn` policy).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Violation>,
}

impl ValidationResult {
    pub fn new(
        schema: impl Into<String>,
        registry_version: u64,
        schema_fingerprint: impl Into<String>,
        violations: Vec<Violation>,
        warnings: Vec<Violation>,
    ) -> Self {
        Self {
            schema: schema.into(),
            registry_version,
            schema_fingerprint: schema_fingerprint.into(),
            passed: violations.is_empty(),
            violations,
            warnings,
        }
    }
}
