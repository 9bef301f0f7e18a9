//! # Rule Sets
//!
//! A rule set is an immutable, versioned list of compiled regex rules. The
//! version label plus a canonical fingerprint of the rule definitions is
//! recorded with every scan, so an audit can tell "not risky under v1" apart
//! from "risky under v2".

use crate::error::{Result, ScanError};
use crate::flatten::flatten;
use gate_types::canonical::digest_hex;
use gate_types::{MatchSpan, RiskCategory, RiskFinding, ScanResult, Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Serializable rule definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDef {
    pub id: String,
    pub category: RiskCategory,
    pub severity: Severity,
    /// Regex (Rust `regex` syntax).
    pub pattern: String,
    #[serde(default)]
    pub description: String,
}

impl RuleDef {
    pub fn new(
        id: impl Into<String>,
        category: RiskCategory,
        severity: Severity,
        pattern: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            severity,
            pattern: pattern.into(),
            description: description.into(),
        }
    }
}

/// A rule with its compiled pattern.
#[derive(Debug, Clone)]
struct Rule {
    def: RuleDef,
    regex: Regex,
}

/// Serializable form of a whole rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetDef {
    pub version: String,
    pub rules: Vec<RuleDef>,
}

/// Immutable compiled rule set.
#[derive(Debug, Clone)]
pub struct RuleSet {
    version: String,
    fingerprint: String,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compiles a rule set.
    ///
    /// # Errors
    ///
    /// - `ScanError::Invalid` for an empty version label or rule id
    /// - `ScanError::DuplicateRule` when two rules share an id
    /// - `ScanError::InvalidPattern` when a regex does not compile
    pub fn compile(version: impl Into<String>, defs: Vec<RuleDef>) -> Result<Self> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(ScanError::Invalid("version label must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(defs.len());
        for def in defs {
            if def.id.trim().is_empty() {
                return Err(ScanError::Invalid("rule id must not be empty".to_string()));
            }
            if !seen.insert(def.id.clone()) {
                return Err(ScanError::DuplicateRule(def.id));
            }
            let regex = Regex::new(&def.pattern).map_err(|source| ScanError::InvalidPattern {
                rule: def.id.clone(),
                source,
            })?;
            rules.push(Rule { def, regex });
        }

        let fingerprint = fingerprint(&version, rules.iter().map(|r| &r.def));
        Ok(Self {
            version,
            fingerprint,
            rules,
        })
    }

    /// Compiles a rule set from its serialized form.
    pub fn from_def(def: RuleSetDef) -> Result<Self> {
        Self::compile(def.version, def.rules)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule definitions, in registration order.
    pub fn defs(&self) -> Vec<RuleDef> {
        self.rules.iter().map(|r| r.def.clone()).collect()
    }

    /// Scans a payload. Pure and deterministic for a fixed rule set.
    ///
    /// Each rule contributes at most one finding, carrying its first match.
    pub fn scan(&self, payload: &Value) -> ScanResult {
        let text = flatten(payload);
        let findings = self
            .rules
            .iter()
            .filter_map(|rule| {
                rule.regex.find(&text).map(|m| RiskFinding {
                    rule_id: rule.def.id.clone(),
                    category: rule.def.category,
                    severity: rule.def.severity,
                    description: rule.def.description.clone(),
                    span: MatchSpan {
                        start: m.start(),
                        end: m.end(),
                        text: m.as_str().to_string(),
                    },
                })
            })
            .collect();

        ScanResult::new(self.version.clone(), self.fingerprint.clone(), findings)
    }
}

fn fingerprint<'a>(version: &str, defs: impl Iterator<Item = &'a RuleDef>) -> String {
    let rules: Vec<Value> = defs
        .map(|d| {
            json!({
                "id": d.id,
                "category": d.category,
                "severity": d.severity,
                "pattern": d.pattern,
            })
        })
        .collect();
    digest_hex(&json!({ "version": version, "rules": rules }))
}
