//! Configuration types for the governance gate.

use crate::error::GateError;
use crate::Result;
use gate_decision::DecisionPolicy;
use gate_scanner::RuleSetDef;
use gate_schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the gate facade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Append-only log storage.
    pub log: LogConfig,

    /// Decision policy.
    pub decision: DecisionPolicy,

    /// Admission control.
    pub admission: AdmissionConfig,

    /// Expiry sweeper.
    pub sweep: SweepConfig,

    /// Schemas registered at start-up, by proposal type.
    pub schemas: BTreeMap<String, Schema>,

    /// Rule sets registered at start-up. The last one is active; the
    /// built-in set is used when none are given.
    pub rule_sets: Vec<RuleSetDef>,
}

/// Log storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub backend: LogBackend,

    /// Scrub obvious secrets from submitted payload snapshots.
    pub redact_secrets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            backend: LogBackend::Memory,
            redact_secrets: true,
        }
    }
}

/// Where log entries are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogBackend {
    /// Process memory. Lost on exit.
    Memory,
    /// Sled database directory.
    Sled { path: PathBuf },
}

/// Admission control configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Pipelines allowed to run at once before `Submit` fails fast.
    pub max_in_flight: usize,

    /// Consecutive integrity failures that halt new admissions.
    pub integrity_failure_limit: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 64,
            integrity_failure_limit: 3,
        }
    }
}

/// Expiry sweeper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub interval_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl GateConfig {
    /// Parses TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| GateError::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses JSON.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| GateError::Config(format!("invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a file, choosing the format by extension (`.json`, else TOML).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GateError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    /// Checks settings that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.admission.max_in_flight == 0 {
            return Err(GateError::Config(
                "admission.max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.admission.integrity_failure_limit == 0 {
            return Err(GateError::Config(
                "admission.integrity_failure_limit must be at least 1".to_string(),
            ));
        }
        if self.sweep.interval_ms == 0 {
            return Err(GateError::Config(
                "sweep.interval_ms must be at least 1".to_string(),
            ));
        }
        if let LogBackend::Sled { path } = &self.log.backend {
            if path.as_os_str().is_empty() {
                return Err(GateError::Config("log.backend.path is empty".to_string()));
            }
        }
        for (name, schema) in &self.schemas {
            schema
                .check()
                .map_err(|e| GateError::Config(format!("schema {}: {}", name, e)))?;
        }
        let mut versions = HashSet::new();
        for rule_set in &self.rule_sets {
            if !versions.insert(rule_set.version.as_str()) {
                return Err(GateError::Config(format!(
                    "rule set version {} listed twice",
                    rule_set.version
                )));
            }
        }
        Ok(())
    }
}
