//! Error types for the gate facade.
//!
//! Governance rejections are not errors; they are `Decision` values. What
//! remains falls into four groups:
//!
//! | Group         | Variants                                                  |
//! |---------------|-----------------------------------------------------------|
//! | Configuration | `SchemaNotRegistered`, `SchemaAlreadyRegistered`, `InvalidSchema`, `RuleSetVersionExists`, `InvalidRule`, `Config` |
//! | Integrity     | `Integrity`, `Stalled`, `Halted`, `Log`                    |
//! | Lifecycle     | `NotPending`, `AlreadyResolved`, `NotFound`, `InProgress`, `NotApproved`, `PayloadRedacted` |
//! | Admission     | `Backpressure`, `Forbidden`                               |

use gate_decision::DecisionError;
use gate_log::LogError;
use gate_scanner::ScanError;
use gate_schema::SchemaError;
use gate_types::{Decision, ProposalId};
use thiserror::Error;

/// Core error type for gate operations.
#[derive(Debug, Error)]
pub enum GateError {
    /// No schema is registered for the proposal type.
    #[error("Schema not registered: {0}")]
    SchemaNotRegistered(String),

    #[error("Schema already registered: {0}")]
    SchemaAlreadyRegistered(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Rule set version already registered: {0}")]
    RuleSetVersionExists(String),

    #[error("Invalid rule set: {0}")]
    InvalidRule(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The log failed while advancing a proposal. The proposal is stalled.
    #[error("Integrity failure for proposal {proposal_id}: {source}")]
    Integrity {
        proposal_id: ProposalId,
        #[source]
        source: LogError,
    },

    /// The proposal was frozen by an earlier integrity failure.
    #[error("Proposal {0} is stalled")]
    Stalled(ProposalId),

    /// Admissions are halted after repeated integrity failures.
    #[error("Admissions halted after {failures} consecutive integrity failures")]
    Halted { failures: u32 },

    #[error("Proposal {0} is not pending")]
    NotPending(ProposalId),

    #[error("Proposal {proposal_id} already resolved as {decision}")]
    AlreadyResolved {
        proposal_id: ProposalId,
        decision: Decision,
    },

    #[error("Proposal {0} not found")]
    NotFound(ProposalId),

    /// The proposal is still moving through the pipeline.
    #[error("Proposal {0} is still in the pipeline")]
    InProgress(ProposalId),

    /// Only approved proposals may be re-published.
    #[error("Proposal {proposal_id} is {decision}, not approved")]
    NotApproved {
        proposal_id: ProposalId,
        decision: Decision,
    },

    /// The approved payload is only left as a redacted log snapshot
    /// (e.g. after a restart) and cannot be re-published unaltered.
    #[error("Approved payload of proposal {0} is only available redacted")]
    PayloadRedacted(ProposalId),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Too many pipelines in flight.
    #[error("Backpressure: {in_flight} of {limit} pipelines in flight")]
    Backpressure { in_flight: usize, limit: usize },

    /// Log error outside any single proposal (open, verify).
    #[error("Log error: {0}")]
    Log(#[from] LogError),
}

impl GateError {
    /// Whether this error means durability could not be confirmed.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            GateError::Integrity { .. } | GateError::Stalled(_) | GateError::Halted { .. }
        ) || matches!(self, GateError::Log(e) if e.is_integrity_failure())
    }

    /// Whether this is a configuration error rejected at the boundary.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GateError::SchemaNotRegistered(_)
                | GateError::SchemaAlreadyRegistered(_)
                | GateError::InvalidSchema(_)
                | GateError::RuleSetVersionExists(_)
                | GateError::InvalidRule(_)
                | GateError::Config(_)
        )
    }

    pub(crate) fn from_decision(proposal_id: ProposalId, err: DecisionError) -> Self {
        match err {
            DecisionError::NotPending(id) => GateError::NotPending(id),
            DecisionError::AlreadyResolved {
                proposal_id,
                decision,
            } => GateError::AlreadyResolved {
                proposal_id,
                decision,
            },
            DecisionError::NotFound(id) => GateError::NotFound(id),
            DecisionError::Forbidden(msg) => GateError::Forbidden(msg),
            DecisionError::Stalled(id) => GateError::Stalled(id),
            DecisionError::Log(source) => GateError::Integrity {
                proposal_id,
                source,
            },
        }
    }
}

impl From<SchemaError> for GateError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::AlreadyRegistered(name) => GateError::SchemaAlreadyRegistered(name),
            SchemaError::NotRegistered(name) => GateError::SchemaNotRegistered(name),
            SchemaError::InvalidDefinition(msg) => GateError::InvalidSchema(msg),
        }
    }
}

impl From<ScanError> for GateError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::VersionExists(version) => GateError::RuleSetVersionExists(version),
            other => GateError::InvalidRule(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors_are_configuration() {
        let err: GateError = SchemaError::NotRegistered("x.v1".to_string()).into();
        assert!(matches!(err, GateError::SchemaNotRegistered(ref n) if n == "x.v1"));
        assert!(err.is_configuration());
        assert!(!err.is_integrity_failure());
    }

    #[test]
    fn test_scan_errors_map() {
        let err: GateError = ScanError::VersionExists("v2".to_string()).into();
        assert!(matches!(err, GateError::RuleSetVersionExists(_)));
        let err: GateError = ScanError::DuplicateRule("r".to_string()).into();
        assert!(matches!(err, GateError::InvalidRule(ref m) if m.contains("r")));
    }

    #[test]
    fn test_log_failure_becomes_integrity() {
        let pid = ProposalId::new();
        let err = GateError::from_decision(
            pid,
            DecisionError::Log(LogError::WriteFailure {
                seq: 4,
                reason: "disk full".to_string(),
            }),
        );
        assert!(err.is_integrity_failure());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_already_resolved_display() {
        let err = GateError::AlreadyResolved {
            proposal_id: ProposalId::new(),
            decision: Decision::Expired,
        };
        assert!(err.to_string().contains("EXPIRED"));
    }
}
