//! Error types for the decision gate.

use gate_log::LogError;
use gate_types::{Decision, ProposalId};
use thiserror::Error;

/// Errors from gate transitions.
#[derive(Debug, Error)]
pub enum DecisionError {
    /// The proposal is known but not awaiting a human.
    #[error("Proposal {0} is not pending")]
    NotPending(ProposalId),

    /// Another transition already committed a terminal decision.
    #[error("Proposal {proposal_id} already resolved as {decision}")]
    AlreadyResolved {
        proposal_id: ProposalId,
        decision: Decision,
    },

    /// The gate has never seen this proposal.
    #[error("Proposal {0} not found")]
    NotFound(ProposalId),

    /// The caller lacks the capability for this transition.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A previous integrity failure froze this proposal.
    #[error("Proposal {0} is stalled after an integrity failure")]
    Stalled(ProposalId),

    /// The log refused or failed the write.
    #[error("Log error: {0}")]
    Log(#[from] LogError),
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, DecisionError>;
