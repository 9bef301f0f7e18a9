//! # Decision Gate
//!
//! Per-proposal state machine driven after VALIDATED and SCANNED exist.
//!
//! ```text
//!                  ┌──────────────► AUTO_APPROVED
//!   scan ── gate ──┼──────────────► AUTO_REJECTED
//!                  └─► PENDING_HUMAN ──┬─ resolve ──► HUMAN_APPROVED / HUMAN_REJECTED
//!                                      ├─ cancel  ──► AUTO_REJECTED (cancelled)
//!                                      └─ deadline ─► EXPIRED
//! ```
//!
//! Every transition out of PENDING_HUMAN happens while holding the pending
//! table lock and is published only after its DECIDED entry is durable. A
//! racing transition that loses finds either the entry gone from the table
//! or the log refusing a second DECIDED, and reports `AlreadyResolved`.
//!
//! Expiry is checked lazily as well: a verdict arriving at or after the
//! deadline commits EXPIRED instead, so the outcome never depends on when
//! the sweeper last ran.

use crate::error::{DecisionError, Result};
use crate::policy::DecisionPolicy;
use chrono::{DateTime, Utc};
use gate_log::{AppendOnlyLog, LogError};
use gate_types::{
    AgentId, Clock, Decision, DecisionReason, DecisionRecord, EventRecord, GateOutcome, HumanId,
    HumanVerdict, Participant, ProposalId, ScanResult, ValidationResult,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// A proposal waiting on a human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub proposal_id: ProposalId,
    pub submitter: AgentId,
    pub deadline: DateTime<Utc>,
    /// Sequence number of the GATED entry that opened the hold.
    pub gated_seq: u64,
}

/// Published state of a gated proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub(crate) decision: Decision,
    /// Whether the proposal went through PENDING_HUMAN.
    pub(crate) held: bool,
}

/// Result of one expiry pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub expired: Vec<ProposalId>,
    /// Overdue proposals whose EXPIRED entry could not be written.
    pub stalled: Vec<ProposalId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.stalled.is_empty()
    }
}

/// The Decision Gate.
#[derive(Debug)]
pub struct DecisionGate {
    log: Arc<AppendOnlyLog>,
    clock: Arc<dyn Clock>,
    policy: DecisionPolicy,
    pending: Mutex<HashMap<ProposalId, PendingApproval>>,
    decisions: RwLock<HashMap<ProposalId, Resolution>>,
    stalled: RwLock<HashSet<ProposalId>>,
}

impl DecisionGate {
    /// Creates a gate writing to `log`. Deadlines use the log's clock so
    /// they line up with entry timestamps.
    pub fn new(log: Arc<AppendOnlyLog>, policy: DecisionPolicy) -> Self {
        let clock = log.clock();
        Self {
            log,
            clock,
            policy,
            pending: Mutex::new(HashMap::new()),
            decisions: RwLock::new(HashMap::new()),
            stalled: RwLock::new(HashSet::new()),
        }
    }

    pub(crate) fn restored(
        log: Arc<AppendOnlyLog>,
        policy: DecisionPolicy,
        pending: HashMap<ProposalId, PendingApproval>,
        decisions: HashMap<ProposalId, Resolution>,
        stalled: HashSet<ProposalId>,
    ) -> Self {
        let gate = Self::new(log, policy);
        *gate.pending.lock().unwrap_or_else(|e| e.into_inner()) = pending;
        *gate.decisions.write().unwrap_or_else(|e| e.into_inner()) = decisions;
        *gate.stalled.write().unwrap_or_else(|e| e.into_inner()) = stalled;
        gate
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Gates a scanned proposal: writes GATED and, for automatic outcomes,
    /// the DECIDED entry.
    ///
    /// Returns `PENDING_HUMAN` or the terminal decision.
    pub fn gate(
        &self,
        proposal_id: ProposalId,
        submitter: &AgentId,
        scan: &ScanResult,
    ) -> Result<Decision> {
        let outcome = self.policy.evaluate(scan);
        let gated = self
            .log
            .append(proposal_id, EventRecord::Gated(outcome.clone()))
            .map_err(|e| self.integrity_failure(proposal_id, e))?;

        match outcome {
            GateOutcome::PendingHuman { timeout_secs, .. } => {
                let deadline = deadline_after(gated.timestamp, timeout_secs);
                let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
                pending.insert(
                    proposal_id,
                    PendingApproval {
                        proposal_id,
                        submitter: submitter.clone(),
                        deadline,
                        gated_seq: gated.seq,
                    },
                );
                self.publish(proposal_id, Decision::PendingHuman, true);
                info!(
                    "Proposal {} held for human review until {} (risk {})",
                    proposal_id, deadline, scan.risk_level
                );
                Ok(Decision::PendingHuman)
            }
            GateOutcome::AutoApproved { reason } => self.decide(
                proposal_id,
                DecisionRecord::new(Decision::AutoApproved, reason, Participant::System),
            ),
            GateOutcome::AutoRejected { reason } => self.decide(
                proposal_id,
                DecisionRecord::new(Decision::AutoRejected, reason, Participant::System),
            ),
        }
    }

    /// Records the schema short-circuit: DECIDED(AUTO_REJECTED) right after
    /// a failing VALIDATED entry.
    pub fn reject_invalid(
        &self,
        proposal_id: ProposalId,
        validation: &ValidationResult,
    ) -> Result<Decision> {
        let reason = DecisionReason::SchemaViolation {
            violations: validation.violations.len(),
        };
        self.decide(
            proposal_id,
            DecisionRecord::new(Decision::AutoRejected, reason, Participant::System),
        )
    }

    fn decide(&self, proposal_id: ProposalId, record: DecisionRecord) -> Result<Decision> {
        let entry = self
            .log
            .append(proposal_id, EventRecord::Decided(record))
            .map_err(|e| self.integrity_failure(proposal_id, e))?;
        let decision = decided_in(&entry.record).unwrap_or(Decision::AutoRejected);
        self.publish(proposal_id, decision, false);
        debug!("Proposal {} decided {}", proposal_id, decision);
        Ok(decision)
    }

    /// Applies a human verdict to a PENDING_HUMAN proposal.
    ///
    /// # Errors
    ///
    /// - `AlreadyResolved` if another transition (or the deadline) won
    /// - `NotPending` if the proposal was decided without a human hold
    /// - `NotFound` for unknown proposals
    pub fn resolve(
        &self,
        proposal_id: ProposalId,
        verdict: HumanVerdict,
        human: &HumanId,
    ) -> Result<Decision> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let approval = match pending.get(&proposal_id) {
            Some(approval) => approval.clone(),
            None => return Err(self.not_pending(proposal_id)),
        };

        if self.clock.now() >= approval.deadline {
            let decision = self.commit(&mut pending, proposal_id, expired_record())?;
            warn!(
                "Verdict from {} for {} arrived after the deadline",
                human, proposal_id
            );
            return Err(DecisionError::AlreadyResolved {
                proposal_id,
                decision,
            });
        }

        let record = DecisionRecord::new(
            verdict.decision(),
            DecisionReason::HumanVerdict,
            Participant::HumanReviewer(human.clone()),
        );
        let decision = self.commit(&mut pending, proposal_id, record)?;
        info!("Proposal {} resolved {} by {}", proposal_id, decision, human);
        Ok(decision)
    }

    /// Withdraws a pending proposal on behalf of its submitter.
    pub fn cancel(&self, proposal_id: ProposalId, agent: &AgentId) -> Result<Decision> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let approval = match pending.get(&proposal_id) {
            Some(approval) => approval.clone(),
            None => return Err(self.not_pending(proposal_id)),
        };

        if approval.submitter != *agent {
            return Err(DecisionError::Forbidden(format!(
                "agent {} cannot cancel proposal {} submitted by {}",
                agent, proposal_id, approval.submitter
            )));
        }

        if self.clock.now() >= approval.deadline {
            let decision = self.commit(&mut pending, proposal_id, expired_record())?;
            return Err(DecisionError::AlreadyResolved {
                proposal_id,
                decision,
            });
        }

        let record = DecisionRecord::new(
            Decision::AutoRejected,
            DecisionReason::Cancelled,
            Participant::ModelAgent(agent.clone()),
        );
        let decision = self.commit(&mut pending, proposal_id, record)?;
        info!("Proposal {} cancelled by {}", proposal_id, agent);
        Ok(decision)
    }

    /// Expires one proposal if its deadline has passed.
    ///
    /// Returns `NotPending` while the deadline is still ahead.
    pub fn expire(&self, proposal_id: ProposalId) -> Result<Decision> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let approval = match pending.get(&proposal_id) {
            Some(approval) => approval.clone(),
            None => return Err(self.not_pending(proposal_id)),
        };
        if self.clock.now() < approval.deadline {
            return Err(DecisionError::NotPending(proposal_id));
        }
        self.commit(&mut pending, proposal_id, expired_record())
    }

    /// Moves every overdue PENDING_HUMAN proposal to EXPIRED.
    pub fn sweep(&self) -> SweepReport {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now();
        let mut overdue: Vec<(DateTime<Utc>, ProposalId)> = pending
            .values()
            .filter(|p| p.deadline <= now)
            .map(|p| (p.deadline, p.proposal_id))
            .collect();
        overdue.sort();

        let mut report = SweepReport::default();
        for (_, proposal_id) in overdue {
            match self.commit(&mut pending, proposal_id, expired_record()) {
                Ok(_) => report.expired.push(proposal_id),
                Err(DecisionError::AlreadyResolved { .. }) => {}
                Err(_) => report.stalled.push(proposal_id),
            }
        }
        if !report.is_empty() {
            info!(
                "Expiry sweep: {} expired, {} stalled",
                report.expired.len(),
                report.stalled.len()
            );
        }
        report
    }

    /// Writes the terminal DECIDED entry for a pending proposal. Caller holds
    /// the pending lock.
    fn commit(
        &self,
        pending: &mut HashMap<ProposalId, PendingApproval>,
        proposal_id: ProposalId,
        record: DecisionRecord,
    ) -> Result<Decision> {
        match self.log.append(proposal_id, EventRecord::Decided(record)) {
            Ok(entry) => {
                let decision = decided_in(&entry.record).unwrap_or(Decision::Expired);
                pending.remove(&proposal_id);
                self.publish(proposal_id, decision, true);
                Ok(decision)
            }
            Err(LogError::StageAlreadyRecorded { seq, .. }) => {
                let decision = self
                    .log
                    .get(seq)
                    .and_then(|entry| decided_in(&entry.record))
                    .unwrap_or(Decision::Expired);
                pending.remove(&proposal_id);
                self.publish(proposal_id, decision, true);
                Err(DecisionError::AlreadyResolved {
                    proposal_id,
                    decision,
                })
            }
            Err(e) => {
                pending.remove(&proposal_id);
                Err(self.integrity_failure(proposal_id, e))
            }
        }
    }

    fn publish(&self, proposal_id: ProposalId, decision: Decision, held: bool) {
        self.decisions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(proposal_id, Resolution { decision, held });
    }

    fn integrity_failure(&self, proposal_id: ProposalId, err: LogError) -> DecisionError {
        error!("Proposal {} stalled: {}", proposal_id, err);
        self.mark_stalled(proposal_id);
        DecisionError::Log(err)
    }

    fn not_pending(&self, proposal_id: ProposalId) -> DecisionError {
        if self.is_stalled(proposal_id) {
            return DecisionError::Stalled(proposal_id);
        }
        let resolution = self
            .decisions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&proposal_id)
            .copied();
        match resolution {
            Some(Resolution {
                decision,
                held: true,
            }) if decision.is_terminal() => DecisionError::AlreadyResolved {
                proposal_id,
                decision,
            },
            Some(_) => DecisionError::NotPending(proposal_id),
            None if self.log.stage_of(proposal_id).is_some() => {
                DecisionError::NotPending(proposal_id)
            }
            None => DecisionError::NotFound(proposal_id),
        }
    }

    /// Freezes a proposal after an integrity failure.
    pub fn mark_stalled(&self, proposal_id: ProposalId) {
        self.stalled
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(proposal_id);
    }

    pub fn is_stalled(&self, proposal_id: ProposalId) -> bool {
        self.stalled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&proposal_id)
    }

    pub fn stalled(&self) -> Vec<ProposalId> {
        let mut ids: Vec<_> = self
            .stalled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Latest durable decision for a gated proposal.
    pub fn decision(&self, proposal_id: ProposalId) -> Option<Decision> {
        self.decisions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&proposal_id)
            .map(|r| r.decision)
    }

    /// Pending approvals, earliest deadline first.
    pub fn pending(&self) -> Vec<PendingApproval> {
        let mut pending: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.deadline
                .cmp(&b.deadline)
                .then(a.proposal_id.cmp(&b.proposal_id))
        });
        pending
    }

    pub fn pending_approval(&self, proposal_id: ProposalId) -> Option<PendingApproval> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&proposal_id)
            .cloned()
    }
}

fn expired_record() -> DecisionRecord {
    DecisionRecord::new(
        Decision::Expired,
        DecisionReason::DeadlineElapsed,
        Participant::System,
    )
}

/// Upper bound on a human hold (ten years).
const MAX_TIMEOUT_SECS: i64 = 10 * 365 * 24 * 60 * 60;

pub(crate) fn deadline_after(gated_at: DateTime<Utc>, timeout_secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(timeout_secs)
        .unwrap_or(MAX_TIMEOUT_SECS)
        .min(MAX_TIMEOUT_SECS);
    gated_at
        .checked_add_signed(chrono::Duration::seconds(secs))
        .unwrap_or(gated_at)
}

pub(crate) fn decided_in(record: &EventRecord) -> Option<Decision> {
    match record {
        EventRecord::Decided(decided) => Some(decided.decision),
        _ => None,
    }
}
