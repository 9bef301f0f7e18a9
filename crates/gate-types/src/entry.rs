//! # Log Entries
//!
//! An entry is an immutable record of one state transition. Entries are
//! chained: each carries the hash of its predecessor, and its own hash is the
//! SHA-256 of the canonical JSON of its body. Altering any byte of any past
//! entry breaks every later link.
//!
//! ```text
//!   seq 0                 seq 1                 seq 2
//! ┌──────────────┐      ┌──────────────┐      ┌──────────────┐
//! │ prev: 000…0  │ ◄─── │ prev: h0     │ ◄─── │ prev: h1     │
//! │ hash: h0     │      │ hash: h1     │      │ hash: h2     │
//! └──────────────┘      └──────────────┘      └──────────────┘
//! ```

use crate::canonical::digest_hex;
use crate::decision::{DecisionRecord, GateOutcome};
use crate::ids::{AgentId, ProposalId};
use crate::risk::ScanResult;
use crate::validation::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Predecessor hash of the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Pipeline stage an entry records, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Submitted,
    Validated,
    Scanned,
    Gated,
    Decided,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Submitted => "SUBMITTED",
            EventKind::Validated => "VALIDATED",
            EventKind::Scanned => "SCANNED",
            EventKind::Gated => "GATED",
            EventKind::Decided => "DECIDED",
        };
        f.write_str(s)
    }
}

/// Snapshot stored with a SUBMITTED entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedRecord {
    pub agent: AgentId,
    pub proposal_type: String,
    /// Payload as persisted; secrets may have been redacted.
    pub payload: Value,
    /// Digest of the payload as submitted, before any redaction.
    pub payload_digest: String,
    #[serde(default)]
    pub redacted: bool,
}

/// Stage-specific snapshot carried by an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventRecord {
    Submitted(SubmittedRecord),
    Validated(ValidationResult),
    Scanned(ScanResult),
    Gated(GateOutcome),
    Decided(DecisionRecord),
}

impl EventRecord {
    pub fn kind(&self) -> EventKind {
        match self {
            EventRecord::Submitted(_) => EventKind::Submitted,
            EventRecord::Validated(_) => EventKind::Validated,
            EventRecord::Scanned(_) => EventKind::Scanned,
            EventRecord::Gated(_) => EventKind::Gated,
            EventRecord::Decided(_) => EventKind::Decided,
        }
    }
}

/// One immutable, hash-chained record in the append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub proposal_id: ProposalId,
    pub record: EventRecord,
    pub prev_hash: String,
    pub hash: String,
}

impl LogEntry {
    /// Builds an entry and computes its hash.
    pub fn seal(
        seq: u64,
        timestamp: DateTime<Utc>,
        proposal_id: ProposalId,
        record: EventRecord,
        prev_hash: impl Into<String>,
    ) -> Self {
        let mut entry = Self {
            seq,
            timestamp,
            proposal_id,
            record,
            prev_hash: prev_hash.into(),
            hash: String::new(),
        };
        entry.hash = entry.compute_hash();
        entry
    }

    pub fn kind(&self) -> EventKind {
        self.record.kind()
    }

    /// Recomputes the hash from the entry body.
    pub fn compute_hash(&self) -> String {
        let body = json!({
            "seq": self.seq,
            "timestamp": self.timestamp,
            "proposal_id": self.proposal_id,
            "record": self.record,
            "prev_hash": self.prev_hash,
        });
        digest_hex(&body)
    }

    /// Whether the stored hash matches the body.
    pub fn verify_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }
}
