//! Background expiry sweeper.
//!
//! Runs [`DecisionGate::sweep`] on a fixed interval until stopped. The gate
//! also expires lazily on every transition, so the interval only bounds how
//! long an overdue proposal reads as PENDING_HUMAN.
//!
//! The gate itself is synchronous: a sweep takes the pending lock and
//! flushes the store for every expiry. Each pass therefore runs on the
//! blocking pool so it never stalls a runtime worker.

use crate::gate::DecisionGate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Spawns the sweep loop.
pub struct ExpirySweeper;

impl ExpirySweeper {
    /// Starts sweeping `gate` every `period` on the current runtime.
    pub fn spawn(gate: Arc<DecisionGate>, period: Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Expiry sweeper started ({:?} interval)", period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let gate = gate.clone();
                        match tokio::task::spawn_blocking(move || gate.sweep()).await {
                            Ok(report) if report.is_empty() => {
                                debug!("Expiry sweep: nothing overdue");
                            }
                            Ok(_) => {}
                            Err(e) => error!("Expiry sweep task failed: {}", e),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Expiry sweeper stopped");
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Owner of a running sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals shutdown and waits for the loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DecisionPolicy;
    use gate_log::{AppendOnlyLog, LogOptions, MemoryStore};
    use gate_types::{
        AgentId, Decision, EventRecord, ManualClock, MatchSpan, ProposalId, RiskCategory,
        RiskFinding, ScanResult, Severity, SubmittedRecord, ValidationResult,
    };
    use serde_json::json;

    fn held(log: &AppendOnlyLog, gate: &DecisionGate) -> ProposalId {
        let pid = ProposalId::new();
        let scan = ScanResult::new(
            "v1",
            "fp",
            vec![RiskFinding {
                rule_id: "overreach.x".to_string(),
                category: RiskCategory::Overreach,
                severity: Severity::Critical,
                description: String::new(),
                span: MatchSpan {
                    start: 0,
                    end: 1,
                    text: "x".to_string(),
                },
            }],
        );
        log.append(
            pid,
            EventRecord::Submitted(SubmittedRecord {
                agent: AgentId::new("a"),
                proposal_type: "t".to_string(),
                payload: json!({}),
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
        gate.gate(pid, &AgentId::new("a"), &scan).unwrap();
        pid
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_expires_overdue_proposals() {
        let clock = Arc::new(ManualClock::starting_now());
        let log = Arc::new(
            AppendOnlyLog::open(Arc::new(MemoryStore::new()), clock.clone(), LogOptions::default())
                .unwrap(),
        );
        let gate = Arc::new(DecisionGate::new(
            log.clone(),
            DecisionPolicy::default().with_timeout_secs(300),
        ));
        let pid = held(&log, &gate);

        let handle = ExpirySweeper::spawn(gate.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(gate.decision(pid), Some(Decision::PendingHuman));

        clock.advance(chrono::Duration::seconds(300));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(gate.decision(pid), Some(Decision::Expired));

        assert!(handle.is_running());
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_prompt() {
        let log = Arc::new(AppendOnlyLog::in_memory().unwrap());
        let gate = Arc::new(DecisionGate::new(log, DecisionPolicy::default()));
        let handle = ExpirySweeper::spawn(gate, Duration::from_secs(3600));
        tokio::time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .unwrap();
    }
}
