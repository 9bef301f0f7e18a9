//! Proposals submitted by model agents.

use crate::canonical::digest_hex;
use crate::ids::{AgentId, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A unit of work submitted by an agent for governance review.
///
/// Immutable once created: fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    id: ProposalId,
    agent: AgentId,
    proposal_type: String,
    payload: Value,
    submitted_at: DateTime<Utc>,
}

impl Proposal {
    /// Creates a proposal with a freshly assigned identifier.
    pub fn new(
        agent: AgentId,
        proposal_type: impl Into<String>,
        payload: Value,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self::with_id(ProposalId::new(), agent, proposal_type, payload, submitted_at)
    }

    /// Rebuilds a proposal with a known identifier (log replay).
    pub fn with_id(
        id: ProposalId,
        agent: AgentId,
        proposal_type: impl Into<String>,
        payload: Value,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            agent,
            proposal_type: proposal_type.into(),
            payload,
            submitted_at,
        }
    }

    pub fn id(&self) -> ProposalId {
        self.id
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    pub fn proposal_type(&self) -> &str {
        &self.proposal_type
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Canonical SHA-256 digest of the payload.
    pub fn payload_digest(&self) -> String {
        digest_hex(&self.payload)
    }
}
