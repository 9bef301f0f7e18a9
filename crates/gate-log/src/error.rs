//! Error types for the append-only log.

use gate_types::{EventKind, ProposalId};
use thiserror::Error;

/// Log errors.
///
/// `WriteFailure` and `SequenceCollision` are integrity failures: the caller
/// must stop advancing the affected proposal rather than guess an outcome.
#[derive(Debug, Error)]
pub enum LogError {
    /// The entry could not be made durable. Nothing was appended.
    #[error("Log write failure at seq {seq}: {reason}")]
    WriteFailure { seq: u64, reason: String },

    /// The store already holds an entry at this sequence number.
    #[error("Sequence number collision at seq {0}")]
    SequenceCollision(u64),

    /// A different record already exists for this proposal and stage.
    #[error("Proposal {proposal_id} already has a {kind} entry (seq {seq})")]
    StageAlreadyRecorded {
        proposal_id: ProposalId,
        kind: EventKind,
        seq: u64,
    },

    /// The stage would break per-proposal pipeline order.
    #[error("Proposal {proposal_id}: {kind} out of pipeline order (last recorded: {last:?})")]
    OutOfOrder {
        proposal_id: ProposalId,
        kind: EventKind,
        last: Option<EventKind>,
    },

    /// Persisted entries fail verification.
    #[error("Log corrupted at seq {seq}: {reason}")]
    Corrupted { seq: u64, reason: String },

    /// Storage engine error while opening or loading.
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Entry (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LogError {
    /// Whether this error means the log could not be trusted to have
    /// recorded the transition.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            LogError::WriteFailure { .. }
                | LogError::SequenceCollision(_)
                | LogError::Corrupted { .. }
                | LogError::Storage(_)
                | LogError::Serialization(_)
        )
    }
}

/// Result type for log operations.
pub type Result<T> = std::result::Result<T, LogError>;
