//! # Replay
//!
//! Rebuilds gate state from the log alone. The fold is pure: the same
//! entries always produce the same decisions, which is what makes crash
//! recovery and third-party audit agree.
//!
//! | Last entries for a proposal        | Restored state                         |
//! |------------------------------------|----------------------------------------|
//! | `DECIDED`                          | its terminal decision                  |
//! | `GATED(PENDING_HUMAN)`             | pending, deadline = GATED ts + timeout |
//! | anything else                      | stalled (no outcome is guessed)        |

use crate::gate::{deadline_after, DecisionGate, PendingApproval, Resolution};
use crate::policy::DecisionPolicy;
use chrono::{DateTime, Utc};
use gate_log::AppendOnlyLog;
use gate_types::{AgentId, Decision, EventKind, EventRecord, GateOutcome, LogEntry, ProposalId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// An open human hold found in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub gated_seq: u64,
    pub gated_at: DateTime<Utc>,
    pub timeout_secs: u64,
}

impl Hold {
    pub fn deadline(&self) -> DateTime<Utc> {
        deadline_after(self.gated_at, self.timeout_secs)
    }
}

/// Everything the log says about one proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayedProposal {
    pub proposal_id: ProposalId,
    pub submitter: Option<AgentId>,
    /// Latest recorded stage.
    pub stage: EventKind,
    /// PENDING_HUMAN while held, the terminal decision once DECIDED.
    pub decision: Option<Decision>,
    pub hold: Option<Hold>,
}

impl ReplayedProposal {
    /// Stopped in the pipeline with neither a decision nor a hold.
    pub fn is_stalled(&self) -> bool {
        self.decision.is_none()
    }
}

/// Folds entries into per-proposal state.
pub fn replay<'a, I>(entries: I) -> BTreeMap<ProposalId, ReplayedProposal>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut proposals: BTreeMap<ProposalId, ReplayedProposal> = BTreeMap::new();
    for entry in entries {
        let state = proposals
            .entry(entry.proposal_id)
            .or_insert_with(|| ReplayedProposal {
                proposal_id: entry.proposal_id,
                submitter: None,
                stage: entry.kind(),
                decision: None,
                hold: None,
            });
        state.stage = entry.kind();

        match &entry.record {
            EventRecord::Submitted(submitted) => {
                state.submitter = Some(submitted.agent.clone());
            }
            EventRecord::Gated(GateOutcome::PendingHuman { timeout_secs, .. }) => {
                state.hold = Some(Hold {
                    gated_seq: entry.seq,
                    gated_at: entry.timestamp,
                    timeout_secs: *timeout_secs,
                });
                state.decision = Some(Decision::PendingHuman);
            }
            EventRecord::Decided(decided) => {
                state.decision = Some(decided.decision);
            }
            _ => {}
        }
    }
    proposals
}

/// Terminal decisions only.
pub fn decisions<'a, I>(entries: I) -> BTreeMap<ProposalId, Decision>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    replay(entries)
        .into_values()
        .filter_map(|p| p.decision.filter(|d| d.is_terminal()).map(|d| (p.proposal_id, d)))
        .collect()
}

/// Summary of a restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub entries: u64,
    pub terminal: usize,
    pub pending: usize,
    /// Pending proposals already past their deadline; the next sweep
    /// expires them.
    pub overdue: usize,
    pub stalled: Vec<ProposalId>,
}

/// Rebuilds a gate over an opened (and therefore verified) log.
pub fn restore(log: Arc<AppendOnlyLog>, policy: DecisionPolicy) -> (DecisionGate, RestoreReport) {
    let entries = log.read_all();
    let replayed = replay(entries.iter().map(|e| e.as_ref()));
    let now = log.clock().now();

    let mut report = RestoreReport {
        entries: entries.len() as u64,
        ..RestoreReport::default()
    };
    let mut pending = HashMap::new();
    let mut resolutions = HashMap::new();
    let mut stalled = HashSet::new();

    for proposal in replayed.into_values() {
        let held = proposal.hold.is_some();
        match (proposal.decision, &proposal.hold, &proposal.submitter) {
            (Some(Decision::PendingHuman), Some(hold), Some(submitter)) => {
                let deadline = hold.deadline();
                if deadline <= now {
                    report.overdue += 1;
                }
                pending.insert(
                    proposal.proposal_id,
                    PendingApproval {
                        proposal_id: proposal.proposal_id,
                        submitter: submitter.clone(),
                        deadline,
                        gated_seq: hold.gated_seq,
                    },
                );
                resolutions.insert(
                    proposal.proposal_id,
                    Resolution {
                        decision: Decision::PendingHuman,
                        held,
                    },
                );
                report.pending += 1;
            }
            (Some(decision), _, _) if decision.is_terminal() => {
                resolutions.insert(proposal.proposal_id, Resolution { decision, held });
                report.terminal += 1;
            }
            _ => {
                warn!(
                    "Proposal {} stopped at {} without an outcome; marking stalled",
                    proposal.proposal_id, proposal.stage
                );
                stalled.insert(proposal.proposal_id);
                report.stalled.push(proposal.proposal_id);
            }
        }
    }

    info!(
        "Restored gate: {} terminal, {} pending ({} overdue), {} stalled",
        report.terminal,
        report.pending,
        report.overdue,
        report.stalled.len()
    );
    (
        DecisionGate::restored(log, policy, pending, resolutions, stalled),
        report,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gate_log::{LogOptions, SledStore};
    use gate_types::{
        DecisionReason, HumanId, HumanVerdict, ManualClock, ScanResult, Severity, SubmittedRecord,
        ValidationResult,
    };
    use serde_json::json;

    fn submit_and_scan(log: &AppendOnlyLog, agent: &str, scan: &ScanResult) -> ProposalId {
        let pid = ProposalId::new();
        log.append(
            pid,
            EventRecord::Submitted(SubmittedRecord {
                agent: AgentId::new(agent),
                proposal_type: "t".to_string(),
                payload: json!({"output": "x"}),
                payload_digest: String::new(),
                redacted: false,
            }),
        )
        .unwrap();
        log.append(
            pid,
            EventRecord::Validated(ValidationResult::new("t", 1, "f", vec![], vec![])),
        )
        .unwrap();
        log.append(pid, EventRecord::Scanned(scan.clone())).unwrap();
        pid
    }

    fn risky() -> ScanResult {
        ScanResult::new(
            "v1",
            "fp",
            vec![gate_types::RiskFinding {
                rule_id: "overreach.x".to_string(),
                category: gate_types::RiskCategory::Overreach,
                severity: Severity::Critical,
                description: String::new(),
                span: gate_types::MatchSpan {
                    start: 0,
                    end: 1,
                    text: "x".to_string(),
                },
            }],
        )
    }

    #[test]
    fn test_restore_after_crash_with_sled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        let clock = Arc::new(ManualClock::starting_now());
        let policy = DecisionPolicy::default().with_timeout_secs(300);

        let (approved, resolved, waiting, stuck, before) = {
            let store = Arc::new(SledStore::open(&path).unwrap());
            let log = Arc::new(
                AppendOnlyLog::open(store, clock.clone(), LogOptions::default()).unwrap(),
            );
            let gate = DecisionGate::new(log.clone(), policy.clone());

            let clean = ScanResult::new("v1", "fp", vec![]);
            let approved = submit_and_scan(&log, "a", &clean);
            gate.gate(approved, &AgentId::new("a"), &clean).unwrap();

            let resolved = submit_and_scan(&log, "b", &risky());
            gate.gate(resolved, &AgentId::new("b"), &risky()).unwrap();
            gate.resolve(resolved, HumanVerdict::Reject, &HumanId::new("h"))
                .unwrap();

            clock.advance(chrono::Duration::seconds(100));
            let waiting = submit_and_scan(&log, "c", &risky());
            gate.gate(waiting, &AgentId::new("c"), &risky()).unwrap();

            // Crash between SCANNED and GATED.
            let stuck = submit_and_scan(&log, "d", &clean);

            let before = decisions(log.read_all().iter().map(|e| e.as_ref()));
            (approved, resolved, waiting, stuck, before)
        };

        let store = Arc::new(SledStore::open(&path).unwrap());
        let log = Arc::new(AppendOnlyLog::open(store, clock.clone(), LogOptions::default()).unwrap());
        let (gate, report) = restore(log.clone(), policy);

        assert_eq!(report.terminal, 2);
        assert_eq!(report.pending, 1);
        assert_eq!(report.stalled, vec![stuck]);
        assert_eq!(gate.decision(approved), Some(Decision::AutoApproved));
        assert_eq!(gate.decision(resolved), Some(Decision::HumanRejected));
        assert_eq!(gate.decision(waiting), Some(Decision::PendingHuman));
        assert!(gate.is_stalled(stuck));
        assert_eq!(decisions(log.read_all().iter().map(|e| e.as_ref())), before);

        // The timer resumes from the GATED timestamp, not from the restart.
        let hold = gate.pending_approval(waiting).unwrap();
        let gated = log.get(hold.gated_seq).unwrap();
        assert_eq!(hold.deadline, gated.timestamp + chrono::Duration::seconds(300));

        clock.advance(chrono::Duration::seconds(300));
        assert_eq!(gate.sweep().expired, vec![waiting]);
        assert!(matches!(
            gate.resolve(resolved, HumanVerdict::Approve, &HumanId::new("h")),
            Err(crate::DecisionError::AlreadyResolved {
                decision: Decision::HumanRejected,
                ..
            })
        ));
    }

    #[test]
    fn test_gated_auto_without_decided_is_stalled() {
        let log = AppendOnlyLog::in_memory().unwrap();
        let clean = ScanResult::new("v1", "fp", vec![]);
        let pid = submit_and_scan(&log, "a", &clean);
        log.append(
            pid,
            EventRecord::Gated(GateOutcome::AutoApproved {
                reason: DecisionReason::LowRisk {
                    level: Severity::None,
                },
            }),
        )
        .unwrap();

        let replayed = replay(log.read_all().iter().map(|e| e.as_ref()));
        assert!(replayed[&pid].is_stalled());
        assert_eq!(replayed[&pid].stage, EventKind::Gated);
        assert!(decisions(log.read_all().iter().map(|e| e.as_ref())).is_empty());
    }

    #[test]
    fn test_restore_counts_overdue() {
        let clock = Arc::new(ManualClock::starting_now());
        let log = Arc::new(
            AppendOnlyLog::open(
                Arc::new(gate_log::MemoryStore::new()),
                clock.clone(),
                LogOptions::default(),
            )
            .unwrap(),
        );
        let policy = DecisionPolicy::default().with_timeout_secs(60);
        let gate = DecisionGate::new(log.clone(), policy.clone());
        let pid = submit_and_scan(&log, "a", &risky());
        gate.gate(pid, &AgentId::new("a"), &risky()).unwrap();

        clock.advance(chrono::Duration::seconds(61));
        let (restored, report) = restore(log, policy);
        assert_eq!(report.overdue, 1);
        assert_eq!(restored.sweep().expired, vec![pid]);
    }
}
