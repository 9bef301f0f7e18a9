//! # Gate Policy
//!
//! Maps a scan result to a gate outcome. Evaluation order:
//!
//! 1. risk at or above `auto_reject_at` → AUTO_REJECTED (risk threshold)
//! 2. `auto_approve` and risk within `auto_approve_ceiling` → AUTO_APPROVED
//! 3. any escalating finding whose category is set to auto-reject →
//!    AUTO_REJECTED (category policy)
//! 4. otherwise → PENDING_HUMAN with `human_timeout_secs`
//!
//! A finding escalates when it exceeds the auto-approve ceiling (every
//! finding escalates when auto-approval is off).

use gate_types::{DecisionReason, GateOutcome, RiskCategory, ScanResult, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a finding's category demands once it escalates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryAction {
    AutoReject,
    RequireHuman,
}

/// Configurable decision policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPolicy {
    pub auto_approve: bool,
    pub auto_approve_ceiling: Severity,
    pub auto_reject_at: Option<Severity>,
    /// Per-category overrides of `default_action`.
    pub category_actions: BTreeMap<RiskCategory, CategoryAction>,
    pub default_action: CategoryAction,
    /// Seconds a proposal may wait for a human before it expires.
    pub human_timeout_secs: u64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        let mut category_actions = BTreeMap::new();
        category_actions.insert(RiskCategory::PolicyConflict, CategoryAction::AutoReject);
        Self {
            auto_approve: true,
            auto_approve_ceiling: Severity::Low,
            auto_reject_at: None,
            category_actions,
            default_action: CategoryAction::RequireHuman,
            human_timeout_secs: 300,
        }
    }
}

impl DecisionPolicy {
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.human_timeout_secs = secs;
        self
    }

    pub fn with_auto_reject_at(mut self, level: Severity) -> Self {
        self.auto_reject_at = Some(level);
        self
    }

    pub fn with_category_action(mut self, category: RiskCategory, action: CategoryAction) -> Self {
        self.category_actions.insert(category, action);
        self
    }

    pub fn action_for(&self, category: RiskCategory) -> CategoryAction {
        self.category_actions
            .get(&category)
            .copied()
            .unwrap_or(self.default_action)
    }

    /// Decides the gate outcome for a scan. Pure.
    pub fn evaluate(&self, scan: &ScanResult) -> GateOutcome {
        let level = scan.risk_level;

        if let Some(threshold) = self.auto_reject_at {
            if level >= threshold {
                return GateOutcome::AutoRejected {
                    reason: DecisionReason::RiskThreshold { level },
                };
            }
        }

        if self.auto_approve && level <= self.auto_approve_ceiling {
            return GateOutcome::AutoApproved {
                reason: DecisionReason::LowRisk { level },
            };
        }

        let rejecting = scan
            .findings
            .iter()
            .filter(|f| !self.auto_approve || f.severity > self.auto_approve_ceiling)
            .find(|f| self.action_for(f.category) == CategoryAction::AutoReject);
        if let Some(finding) = rejecting {
            return GateOutcome::AutoRejected {
                reason: DecisionReason::CategoryPolicy {
                    category: finding.category,
                },
            };
        }

        GateOutcome::PendingHuman {
            reason: DecisionReason::HumanRequired { level },
            timeout_secs: self.human_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gate_types::{MatchSpan, RiskFinding};

    fn finding(category: RiskCategory, severity: Severity) -> RiskFinding {
        RiskFinding {
            rule_id: format!("{}.rule", category),
            category,
            severity,
            description: String::new(),
            span: MatchSpan {
                start: 0,
                end: 0,
                text: String::new(),
            },
        }
    }

    fn scan(findings: Vec<RiskFinding>) -> ScanResult {
        ScanResult::new("v1", "fp", findings)
    }

    #[test]
    fn test_clean_and_low_auto_approve() {
        let policy = DecisionPolicy::default();
        assert!(matches!(policy.evaluate(&scan(vec![])), GateOutcome::AutoApproved { .. }));
        assert!(matches!(
            policy.evaluate(&scan(vec![finding(RiskCategory::Hype, Severity::Low)])),
            GateOutcome::AutoApproved { .. }
        ));
    }

    #[test]
    fn test_overreach_requires_human() {
        let outcome = DecisionPolicy::default()
            .evaluate(&scan(vec![finding(RiskCategory::Overreach, Severity::Critical)]));
        assert_eq!(
            outcome,
            GateOutcome::PendingHuman {
                reason: DecisionReason::HumanRequired {
                    level: Severity::Critical
                },
                timeout_secs: 300,
            }
        );
    }

    #[test]
    fn test_policy_conflict_auto_rejects() {
        let outcome = DecisionPolicy::default().evaluate(&scan(vec![
            finding(RiskCategory::Hype, Severity::High),
            finding(RiskCategory::PolicyConflict, Severity::Medium),
        ]));
        assert_eq!(
            outcome,
            GateOutcome::AutoRejected {
                reason: DecisionReason::CategoryPolicy {
                    category: RiskCategory::PolicyConflict
                }
            }
        );
    }

    #[test]
    fn test_threshold_rejects_before_anything_else() {
        let policy = DecisionPolicy::default().with_auto_reject_at(Severity::High);
        let outcome = policy.evaluate(&scan(vec![finding(RiskCategory::Overreach, Severity::Critical)]));
        assert_eq!(
            outcome,
            GateOutcome::AutoRejected {
                reason: DecisionReason::RiskThreshold {
                    level: Severity::Critical
                }
            }
        );
    }

    #[test]
    fn test_no_auto_approve_sends_everything_to_humans() {
        let policy = DecisionPolicy {
            auto_approve: false,
            ..DecisionPolicy::default()
        };
        assert!(matches!(
            policy.evaluate(&scan(vec![])),
            GateOutcome::PendingHuman { .. }
        ));
    }

    #[test]
    fn test_category_override() {
        let policy = DecisionPolicy::default()
            .with_category_action(RiskCategory::Secrets, CategoryAction::AutoReject);
        assert!(matches!(
            policy.evaluate(&scan(vec![finding(RiskCategory::Secrets, Severity::High)])),
            GateOutcome::AutoRejected { .. }
        ));
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: DecisionPolicy = serde_json::from_value(serde_json::json!({
            "human_timeout_secs": 60,
            "category_actions": {"hype": "auto-reject"}
        }))
        .unwrap();
        assert!(policy.auto_approve);
        assert_eq!(policy.human_timeout_secs, 60);
        assert_eq!(policy.action_for(RiskCategory::Hype), CategoryAction::AutoReject);
        // A supplied table replaces the default one.
        assert_eq!(
            policy.action_for(RiskCategory::PolicyConflict),
            CategoryAction::RequireHuman
        );
    }
}
