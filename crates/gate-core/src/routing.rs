//! # Bounded Routing
//!
//! Agents never talk to each other. The only path from one agent's proposal
//! to another agent is the router re-publishing a committed, approved
//! outcome into the recipient's inbox as a [`CommittedInput`].
//!
//! ```text
//!  agent A ── submit ──► Router ── log ──► DECIDED(approved)
//!                          │
//!                          └── publish ──► inbox(B) ── drain ──► agent B
//! ```
//!
//! A `CommittedInput` carries the approved payload and decision, never the
//! submitting agent's identity.

use chrono::{DateTime, Utc};
use gate_types::{AgentId, Decision, ProposalId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Label carried by every re-published input.
pub const COMMITTED_INPUT_SOURCE: &str = "governance-gate/committed";

/// An approved outcome delivered to another agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedInput {
    /// Always [`COMMITTED_INPUT_SOURCE`].
    pub source: String,
    pub proposal_id: ProposalId,
    pub proposal_type: String,
    /// Payload exactly as approved; its digest matches the SUBMITTED entry.
    pub payload: Value,
    pub payload_digest: String,
    pub decision: Decision,
    /// Sequence number of the DECIDED entry backing this input.
    pub decided_seq: u64,
    pub published_at: DateTime<Utc>,
}

/// Per-agent queues of committed inputs.
#[derive(Debug, Default)]
pub(crate) struct Inboxes {
    queues: Mutex<HashMap<AgentId, VecDeque<CommittedInput>>>,
}

impl Inboxes {
    pub(crate) fn deliver(&self, recipient: AgentId, input: CommittedInput) {
        self.queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(recipient)
            .or_default()
            .push_back(input);
    }

    pub(crate) fn drain(&self, agent: &AgentId) -> Vec<CommittedInput> {
        self.queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(agent)
            .map(Vec::from)
            .unwrap_or_default()
    }

    pub(crate) fn len(&self, agent: &AgentId) -> usize {
        self.queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(agent)
            .map_or(0, VecDeque::len)
    }
}
