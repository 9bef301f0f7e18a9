//! # Risk Scanner Facade
//!
//! Holds every registered rule set and an atomically swapped pointer to the
//! active one. A scan captures the active `Arc<RuleSet>` once, so a rule set
//! registered mid-scan never mixes with the one in use.
//!
//! Registered sets are retained by version so audits can re-run a scan under
//! the exact rules that produced a recorded result.

use crate::builtin::builtin_rule_set;
use crate::error::{Result, ScanError};
use crate::rules::{RuleDef, RuleSet};
use gate_types::ScanResult;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

#[derive(Debug)]
struct Inner {
    active: Arc<RuleSet>,
    history: BTreeMap<String, Arc<RuleSet>>,
}

/// Pluggable, versioned risk scanner.
#[derive(Debug)]
pub struct RiskScanner {
    inner: RwLock<Inner>,
}

impl RiskScanner {
    /// Creates a scanner with `initial` active.
    pub fn new(initial: RuleSet) -> Self {
        let active = Arc::new(initial);
        let mut history = BTreeMap::new();
        history.insert(active.version().to_string(), active.clone());
        Self {
            inner: RwLock::new(Inner { active, history }),
        }
    }

    /// Creates a scanner with the built-in rule set active.
    pub fn with_builtin() -> Result<Self> {
        Ok(Self::new(builtin_rule_set()?))
    }

    /// Compiles and activates a rule set for all subsequent scans.
    ///
    /// # Errors
    ///
    /// `ScanError::VersionExists` if the label was used before; any compile
    /// error from [`RuleSet::compile`].
    pub fn register(&self, version: impl Into<String>, rules: Vec<RuleDef>) -> Result<Arc<RuleSet>> {
        let version = version.into();
        let compiled = Arc::new(RuleSet::compile(version.clone(), rules)?);

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.history.contains_key(&version) {
            return Err(ScanError::VersionExists(version));
        }
        inner.history.insert(version.clone(), compiled.clone());
        inner.active = compiled.clone();

        info!(
            "Activated rule set {} ({} rules, fingerprint {})",
            version,
            compiled.len(),
            compiled.fingerprint()
        );
        Ok(compiled)
    }

    /// The rule set new scans will use.
    pub fn active(&self) -> Arc<RuleSet> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .active
            .clone()
    }

    /// A previously registered rule set.
    pub fn rule_set(&self, version: &str) -> Option<Arc<RuleSet>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .history
            .get(version)
            .cloned()
    }

    /// Registered version labels, sorted.
    pub fn versions(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .history
            .keys()
            .cloned()
            .collect()
    }

    /// Scans with the active rule set.
    pub fn scan(&self, payload: &Value) -> ScanResult {
        let rules = self.active();
        let result = rules.scan(payload);
        debug!(
            "Scan under {} produced {} finding(s), risk {}",
            rules.version(),
            result.findings.len(),
            result.risk_level
        );
        result
    }

    /// Re-runs a scan under a specific registered version.
    pub fn rescan(&self, version: &str, payload: &Value) -> Result<ScanResult> {
        let rules = self
            .rule_set(version)
            .ok_or_else(|| ScanError::UnknownVersion(version.to_string()))?;
        Ok(rules.scan(payload))
    }
}
