//! Risk findings and severity aggregation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered severity scale.
///
/// `NONE < LOW < MEDIUM < HIGH < CRITICAL`; the derived ordering follows
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::None
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::None => "NONE",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// What kind of risk a rule detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskCategory {
    /// Claims or actions beyond the agent's authority.
    Overreach,
    /// Conflicts with explicit policy.
    PolicyConflict,
    /// Unsupported certainty or promotional exaggeration.
    Hype,
    /// Credentials or key material.
    Secrets,
    /// Malware or intrusion guidance.
    Malware,
    SelfHarm,
    Violence,
    Harassment,
    /// Personal identifying information.
    Pii,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskCategory::Overreach => "overreach",
            RiskCategory::PolicyConflict => "policy-conflict",
            RiskCategory::Hype => "hype",
            RiskCategory::Secrets => "secrets",
            RiskCategory::Malware => "malware",
            RiskCategory::SelfHarm => "self-harm",
            RiskCategory::Violence => "violence",
            RiskCategory::Harassment => "harassment",
            RiskCategory::Pii => "pii",
        };
        f.write_str(s)
    }
}

/// Portion of the scanned text a rule matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpan {
    /// Byte offset into the flattened text.
    pub start: usize,
    pub end: usize,
    /// The matched text.
    pub text: String,
}

/// One rule match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub rule_id: String,
    pub category: RiskCategory,
    pub severity: Severity,
    pub description: String,
    pub span: MatchSpan,
}

/// Outcome of scanning one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Rule-set version label that produced this result.
    pub rule_set_version: String,
    /// Canonical digest of that rule set.
    pub rule_set_fingerprint: String,
    /// Maximum severity among the findings.
    pub risk_level: Severity,
    /// Findings sorted by severity (descending) then rule id.
    pub findings: Vec<RiskFinding>,
}

impl ScanResult {
    /// Builds a result, putting findings in their stable reporting order.
    pub fn new(
        rule_set_version: impl Into<String>,
        rule_set_fingerprint: impl Into<String>,
        mut findings: Vec<RiskFinding>,
    ) -> Self {
        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        Self {
            rule_set_version: rule_set_version.into(),
            rule_set_fingerprint: rule_set_fingerprint.into(),
            risk_level: aggregate(&findings),
            findings,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Overall risk: the maximum severity, or `NONE` without findings.
pub fn aggregate(findings: &[RiskFinding]) -> Severity {
    findings
        .iter()
        .map(|f| f.severity)
        .max()
        .unwrap_or(Severity::None)
}
