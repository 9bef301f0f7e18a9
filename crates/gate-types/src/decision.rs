//! Decisions, gate outcomes and human verdicts.

use crate::ids::Participant;
use crate::risk::{RiskCategory, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of governance for one proposal.
///
/// `PendingHuman` is the only non-terminal value. Once a terminal value is
/// recorded it never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    AutoApproved,
    AutoRejected,
    PendingHuman,
    HumanApproved,
    HumanRejected,
    /// Deadline elapsed without a human verdict. Never an approval.
    Expired,
}

impl Decision {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Decision::PendingHuman)
    }

    /// Whether the proposal may take effect.
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::AutoApproved | Decision::HumanApproved)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::AutoApproved => "AUTO_APPROVED",
            Decision::AutoRejected => "AUTO_REJECTED",
            Decision::PendingHuman => "PENDING_HUMAN",
            Decision::HumanApproved => "HUMAN_APPROVED",
            Decision::HumanRejected => "HUMAN_REJECTED",
            Decision::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// Why a decision was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DecisionReason {
    /// Overall risk within the auto-approve ceiling.
    LowRisk { level: Severity },
    /// Payload failed its schema.
    SchemaViolation { violations: usize },
    /// Overall risk reached the auto-reject threshold.
    RiskThreshold { level: Severity },
    /// A finding's category is configured to auto-reject.
    CategoryPolicy { category: RiskCategory },
    /// Risk requires explicit human consent.
    HumanRequired { level: Severity },
    /// A human reviewer decided.
    HumanVerdict,
    /// No verdict arrived before the deadline.
    DeadlineElapsed,
    /// The submitting agent withdrew the proposal.
    Cancelled,
}

/// What the gate decided right after scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateOutcome {
    AutoApproved { reason: DecisionReason },
    AutoRejected { reason: DecisionReason },
    /// Held for a human. The deadline is the GATED entry timestamp plus
    /// `timeout_secs`.
    PendingHuman {
        reason: DecisionReason,
        timeout_secs: u64,
    },
}

impl GateOutcome {
    pub fn decision(&self) -> Decision {
        match self {
            GateOutcome::AutoApproved { .. } => Decision::AutoApproved,
            GateOutcome::AutoRejected { .. } => Decision::AutoRejected,
            GateOutcome::PendingHuman { .. } => Decision::PendingHuman,
        }
    }

    pub fn reason(&self) -> &DecisionReason {
        match self {
            GateOutcome::AutoApproved { reason }
            | GateOutcome::AutoRejected { reason }
            | GateOutcome::PendingHuman { reason, .. } => reason,
        }
    }
}

/// A human reviewer's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanVerdict {
    Approve,
    Reject,
}

impl HumanVerdict {
    pub fn decision(&self) -> Decision {
        match self {
            HumanVerdict::Approve => Decision::HumanApproved,
            HumanVerdict::Reject => Decision::HumanRejected,
        }
    }
}

/// Snapshot recorded in a DECIDED entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Always terminal.
    pub decision: Decision,
    pub reason: DecisionReason,
    /// Who caused the transition.
    pub actor: Participant,
}

impl DecisionRecord {
    pub fn new(decision: Decision, reason: DecisionReason, actor: Participant) -> Self {
        Self {
            decision,
            reason,
            actor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::HumanId;

    #[test]
    fn test_terminal_states() {
        assert!(!Decision::PendingHuman.is_terminal());
        for d in [
            Decision::AutoApproved,
            Decision::AutoRejected,
            Decision::HumanApproved,
            Decision::HumanRejected,
            Decision::Expired,
        ] {
            assert!(d.is_terminal());
        }
    }

    #[test]
    fn test_expiry_is_never_approval() {
        assert!(!Decision::Expired.is_approved());
        assert!(!Decision::PendingHuman.is_approved());
        assert!(Decision::HumanApproved.is_approved());
    }

    #[test]
    fn test_gate_outcome_serialization() {
        let outcome = GateOutcome::PendingHuman {
            reason: DecisionReason::HumanRequired {
                level: Severity::Critical,
            },
            timeout_secs: 300,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "PENDING_HUMAN");
        assert_eq!(json["reason"]["reason"], "human_required");
        assert_eq!(json["reason"]["level"], "CRITICAL");
        assert_eq!(outcome.decision(), Decision::PendingHuman);
    }

    #[test]
    fn test_decision_record_serialization() {
        let record = DecisionRecord::new(
            Decision::HumanApproved,
            DecisionReason::HumanVerdict,
            Participant::HumanReviewer(HumanId::new("alice")),
        );
        let back: DecisionRecord =
            serde_json::from_value(serde_json::to_value(&record).unwrap()).unwrap();
        assert_eq!(back, record);
    }
}
