//! # Concurrency Tests
//!
//! Parallel submitters share one total order; racing terminal transitions
//! produce exactly one DECIDED entry and every loser hears `AlreadyResolved`.

use gate_core::{GateConfig, GateError, Router};
use gate_log::MemoryStore;
use gate_types::{AgentId, Decision, EventKind, HumanId, HumanVerdict, ManualClock, ProposalId};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn shared_router(clock: Arc<ManualClock>) -> Arc<Router> {
    let mut config = GateConfig::default();
    config.admission.max_in_flight = 256;
    Arc::new(Router::open_with_store(config, Arc::new(MemoryStore::new()), clock).unwrap())
}

#[test]
fn test_parallel_submitters_share_one_gap_free_order() {
    let router = shared_router(Arc::new(ManualClock::starting_now()));
    let threads = 8;
    let per_thread = 25;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let router = router.clone();
            thread::spawn(move || {
                let agent = AgentId::new(format!("agent-{}", t));
                (0..per_thread)
                    .map(|i| {
                        let output = if i % 5 == 0 {
                            format!("We have deployed build {}", i)
                        } else {
                            format!("Summary {} from {}", i, t)
                        };
                        router
                            .submit(&agent, "llm_output.v1", json!({"output": output}))
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let submissions: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(submissions.len(), threads * per_thread);

    let log = router.read_log(0, u64::MAX);
    for (i, entry) in log.iter().enumerate() {
        assert_eq!(entry.seq, i as u64);
    }

    let mut per_proposal: HashMap<ProposalId, Vec<EventKind>> = HashMap::new();
    for entry in log.iter() {
        per_proposal
            .entry(entry.proposal_id)
            .or_default()
            .push(entry.kind());
    }
    assert_eq!(per_proposal.len(), submissions.len());
    for kinds in per_proposal.values() {
        assert!(kinds.windows(2).all(|w| w[0] < w[1]));
    }

    let pending = submissions
        .iter()
        .filter(|s| s.decision == Decision::PendingHuman)
        .count();
    assert_eq!(pending, threads * per_thread / 5);
    assert_eq!(router.pending().len(), pending);
    assert!(router.verify_log().is_ok());
}

#[test]
fn test_racing_resolvers_and_sweeper_commit_once() {
    let clock = Arc::new(ManualClock::starting_now());
    let router = shared_router(clock.clone());

    for round in 0..20 {
        let held = router
            .submit(
                &AgentId::new("ops-bot"),
                "llm_output.v1",
                json!({"output": format!("I have transferred batch {}", round)}),
            )
            .unwrap();
        assert_eq!(held.decision, Decision::PendingHuman);

        let contenders = 4;
        let barrier = Arc::new(Barrier::new(contenders + 1));
        let resolvers: Vec<_> = (0..contenders)
            .map(|i| {
                let router = router.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let verdict = if i % 2 == 0 {
                        HumanVerdict::Approve
                    } else {
                        HumanVerdict::Reject
                    };
                    router.resolve(held.proposal_id, verdict, &HumanId::new(format!("h{}", i)))
                })
            })
            .collect();
        let sweeper = {
            let router = router.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                router.sweep()
            })
        };

        let results: Vec<_> = resolvers.into_iter().map(|h| h.join().unwrap()).collect();
        sweeper.join().unwrap();

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        let winner = *winners[0];
        for loser in results.iter().filter(|r| r.is_err()) {
            match loser {
                Err(GateError::AlreadyResolved { decision, .. }) => assert_eq!(*decision, winner),
                other => panic!("unexpected {:?}", other),
            }
        }

        let decided = router
            .read_log(0, u64::MAX)
            .iter()
            .filter(|e| e.proposal_id == held.proposal_id && e.kind() == EventKind::Decided)
            .count();
        assert_eq!(decided, 1);
        assert_eq!(router.get_decision(held.proposal_id).unwrap(), winner);
    }
}

#[test]
fn test_verdict_at_the_deadline_instant_expires() {
    let clock = Arc::new(ManualClock::starting_now());
    let router = shared_router(clock.clone());
    let held = router
        .submit(
            &AgentId::new("ops-bot"),
            "llm_output.v1",
            json!({"output": "We have signed the lease."}),
        )
        .unwrap();

    clock.advance(chrono::Duration::seconds(300));
    let barrier = Arc::new(Barrier::new(2));
    let resolver = {
        let router = router.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            router.resolve(held.proposal_id, HumanVerdict::Approve, &HumanId::new("h"))
        })
    };
    let sweeper = {
        let router = router.clone();
        thread::spawn(move || {
            barrier.wait();
            router.sweep()
        })
    };

    let resolved = resolver.join().unwrap();
    sweeper.join().unwrap();
    assert!(matches!(
        resolved,
        Err(GateError::AlreadyResolved {
            decision: Decision::Expired,
            ..
        })
    ));
    assert_eq!(router.get_decision(held.proposal_id).unwrap(), Decision::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_background_sweeper_expires_holds() {
    let clock = Arc::new(ManualClock::starting_now());
    let mut config = GateConfig::default();
    config.sweep.interval_ms = 50;
    let router = Router::open_with_store(config, Arc::new(MemoryStore::new()), clock.clone()).unwrap();

    let held = router
        .submit(
            &AgentId::new("ops-bot"),
            "llm_output.v1",
            json!({"output": "I have deleted the old backups."}),
        )
        .unwrap();
    let sweeper = router.start_sweeper();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(router.get_decision(held.proposal_id).unwrap(), Decision::PendingHuman);

    clock.advance(chrono::Duration::seconds(300));
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(router.get_decision(held.proposal_id).unwrap(), Decision::Expired);

    sweeper.stop().await;
}
