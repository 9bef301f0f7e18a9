//! # Audit Verification
//!
//! Checks a full sequence of entries against every structural guarantee the
//! log makes:
//!
//! 1. **Gap-free**: entry `i` has `seq == i`
//! 2. **Chained**: each `prev_hash` equals the previous entry's `hash`
//! 3. **Sealed**: each `hash` matches its recomputed body hash
//! 4. **Single submission**: every proposal starts with exactly one SUBMITTED
//! 5. **Ordered**: per proposal, kinds strictly increase in pipeline order
//!
//! The first failure is reported with its sequence number.

use crate::error::{LogError, Result};
use gate_types::{EventKind, LogEntry, ProposalId, GENESIS_HASH};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Summary of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub entries: u64,
    pub proposals: usize,
    /// Hash of the last entry, or the genesis hash for an empty log.
    pub head_hash: String,
}

/// Verifies entries in order.
pub fn verify_entries<'a, I>(entries: I) -> Result<VerifyReport>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut expected_seq = 0u64;
    let mut prev_hash = GENESIS_HASH.to_string();
    let mut last_kind: HashMap<ProposalId, EventKind> = HashMap::new();

    for entry in entries {
        let seq = entry.seq;
        let corrupt = |reason: String| LogError::Corrupted { seq, reason };

        if seq != expected_seq {
            return Err(corrupt(format!("expected seq {}", expected_seq)));
        }
        if entry.prev_hash != prev_hash {
            return Err(corrupt("broken hash chain".to_string()));
        }
        if !entry.verify_hash() {
            return Err(corrupt("entry hash mismatch".to_string()));
        }

        let kind = entry.kind();
        match last_kind.get(&entry.proposal_id) {
            None if kind != EventKind::Submitted => {
                return Err(corrupt(format!(
                    "{} for proposal {} without SUBMITTED",
                    kind, entry.proposal_id
                )));
            }
            Some(last) if *last >= kind => {
                return Err(corrupt(format!(
                    "{} after {} for proposal {}",
                    kind, last, entry.proposal_id
                )));
            }
            _ => {}
        }
        last_kind.insert(entry.proposal_id, kind);

        prev_hash = entry.hash.clone();
        expected_seq += 1;
    }

    Ok(VerifyReport {
        entries: expected_seq,
        proposals: last_kind.len(),
        head_hash: prev_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gate_types::{
        AgentId, Decision, DecisionReason, DecisionRecord, EventRecord, Participant,
        SubmittedRecord, ValidationResult,
    };
    use serde_json::json;

    fn submitted() -> EventRecord {
        EventRecord::Submitted(SubmittedRecord {
            agent: AgentId::new("a"),
            proposal_type: "t".to_string(),
            payload: json!({}),
            payload_digest: String::new(),
            redacted: false,
        })
    }

    fn validated() -> EventRecord {
        EventRecord::Validated(ValidationResult::new("t", 1, "f", vec![], vec![]))
    }

    fn decided() -> EventRecord {
        EventRecord::Decided(DecisionRecord::new(
            Decision::AutoRejected,
            DecisionReason::Cancelled,
            Participant::System,
        ))
    }

    fn chain(records: Vec<(ProposalId, EventRecord)>) -> Vec<LogEntry> {
        let mut prev = GENESIS_HASH.to_string();
        records
            .into_iter()
            .enumerate()
            .map(|(i, (pid, record))| {
                let entry = LogEntry::seal(i as u64, Utc::now(), pid, record, prev.clone());
                prev = entry.hash.clone();
                entry
            })
            .collect()
    }

    #[test]
    fn test_valid_chain() {
        let (a, b) = (ProposalId::new(), ProposalId::new());
        let entries = chain(vec![
            (a, submitted()),
            (b, submitted()),
            (a, validated()),
            (a, decided()),
        ]);
        let report = verify_entries(&entries).unwrap();
        assert_eq!(report.entries, 4);
        assert_eq!(report.proposals, 2);
        assert_eq!(report.head_hash, entries[3].hash);
    }

    #[test]
    fn test_empty_log() {
        let report = verify_entries(&Vec::<LogEntry>::new()).unwrap();
        assert_eq!(report.entries, 0);
        assert_eq!(report.head_hash, GENESIS_HASH);
    }

    #[test]
    fn test_gap_detected() {
        let a = ProposalId::new();
        let mut entries = chain(vec![(a, submitted()), (a, validated())]);
        entries.remove(0);
        assert!(matches!(verify_entries(&entries), Err(LogError::Corrupted { seq: 1, .. })));
    }

    #[test]
    fn test_tampered_record_detected() {
        let a = ProposalId::new();
        let mut entries = chain(vec![(a, submitted()), (a, decided())]);
        entries[1].record = EventRecord::Decided(DecisionRecord::new(
            Decision::HumanApproved,
            DecisionReason::HumanVerdict,
            Participant::System,
        ));
        assert!(matches!(verify_entries(&entries), Err(LogError::Corrupted { seq: 1, .. })));
    }

    #[test]
    fn test_duplicate_submission_detected() {
        let a = ProposalId::new();
        let entries = chain(vec![(a, submitted()), (a, submitted())]);
        assert!(matches!(verify_entries(&entries), Err(LogError::Corrupted { seq: 1, .. })));
    }

    #[test]
    fn test_out_of_order_kinds_detected() {
        let a = ProposalId::new();
        let entries = chain(vec![(a, submitted()), (a, decided()), (a, validated())]);
        assert!(matches!(verify_entries(&entries), Err(LogError::Corrupted { seq: 2, .. })));
    }

    #[test]
    fn test_orphan_entry_detected() {
        let entries = chain(vec![(ProposalId::new(), validated())]);
        assert!(matches!(verify_entries(&entries), Err(LogError::Corrupted { seq: 0, .. })));
    }
}
