//! # Append-Only Log
//!
//! The single serialization point of the gate. All writers contend for one
//! mutex that assigns the next sequence number, persists the entry and only
//! then publishes it to readers.
//!
//! ```text
//!  append ──► [writer mutex] ── seal(seq, prev_hash) ── store.persist ──┐
//!                                                                       │ ok
//!  read   ◄── RwLock<Vec<Arc<LogEntry>>>  (index == seq) ◄── push ──────┘
//! ```
//!
//! ## Guarantees
//!
//! - An entry is visible to readers only after the store acknowledged it.
//! - A failed persist consumes no sequence number, so the log stays gap-free.
//! - The in-memory arena only grows; entries are shared immutably via `Arc`.
//! - `(proposal, kind)` is an idempotency key: replaying an identical append
//!   returns the original entry, a conflicting one is refused.

use crate::error::{LogError, Result};
use crate::redact::Redactor;
use crate::store::{LogStore, MemoryStore};
use crate::verify::{verify_entries, VerifyReport};
use gate_types::{Clock, EventKind, EventRecord, LogEntry, ProposalId, SystemClock, GENESIS_HASH};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Log construction options.
#[derive(Debug, Clone, Copy)]
pub struct LogOptions {
    /// Redact secrets in SUBMITTED payload snapshots.
    pub redact_secrets: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            redact_secrets: true,
        }
    }
}

#[derive(Debug)]
struct WriterState {
    next_seq: u64,
    head_hash: String,
    stages: HashMap<(ProposalId, EventKind), u64>,
    last_kind: HashMap<ProposalId, EventKind>,
}

/// Durable, strictly ordered, hash-chained log.
#[derive(Debug)]
pub struct AppendOnlyLog {
    store: Arc<dyn LogStore>,
    clock: Arc<dyn Clock>,
    redactor: Option<Redactor>,
    writer: Mutex<WriterState>,
    entries: RwLock<Vec<Arc<LogEntry>>>,
}

impl AppendOnlyLog {
    /// Opens a log over `store`, verifying everything already persisted.
    ///
    /// # Errors
    ///
    /// `LogError::Corrupted` if the stored entries fail verification; a
    /// corrupted log is never opened for writing.
    pub fn open(store: Arc<dyn LogStore>, clock: Arc<dyn Clock>, options: LogOptions) -> Result<Self> {
        let loaded = store.load()?;
        let report = verify_entries(&loaded)?;

        let mut stages = HashMap::new();
        let mut last_kind = HashMap::new();
        for entry in &loaded {
            stages.insert((entry.proposal_id, entry.kind()), entry.seq);
            last_kind.insert(entry.proposal_id, entry.kind());
        }

        let redactor = if options.redact_secrets {
            Some(Redactor::new().map_err(|e| LogError::WriteFailure {
                seq: report.entries,
                reason: format!("redaction patterns: {}", e),
            })?)
        } else {
            None
        };

        info!(
            "Opened {} log: {} entries, {} proposals",
            store.backend(),
            report.entries,
            report.proposals
        );

        Ok(Self {
            store,
            clock,
            redactor,
            writer: Mutex::new(WriterState {
                next_seq: report.entries,
                head_hash: report.head_hash,
                stages,
                last_kind,
            }),
            entries: RwLock::new(loaded.into_iter().map(Arc::new).collect()),
        })
    }

    /// Fresh in-memory log on the system clock.
    pub fn in_memory() -> Result<Self> {
        Self::open(
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            LogOptions::default(),
        )
    }

    /// Appends one record and returns the durable entry.
    ///
    /// # Errors
    ///
    /// - `StageAlreadyRecorded` if a different record exists for this stage
    /// - `OutOfOrder` if the stage would break pipeline order
    /// - `WriteFailure` / `SequenceCollision` if the store refused the write
    pub fn append(&self, proposal_id: ProposalId, record: EventRecord) -> Result<Arc<LogEntry>> {
        let kind = record.kind();
        let record = self.prepare(record);

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(&seq) = writer.stages.get(&(proposal_id, kind)) {
            let existing = self.get(seq).ok_or(LogError::Corrupted {
                seq,
                reason: "indexed entry missing from arena".to_string(),
            })?;
            if existing.record == record {
                debug!("Idempotent append of {} for {} (seq {})", kind, proposal_id, seq);
                return Ok(existing);
            }
            return Err(LogError::StageAlreadyRecorded {
                proposal_id,
                kind,
                seq,
            });
        }

        let last = writer.last_kind.get(&proposal_id).copied();
        let in_order = match last {
            None => kind == EventKind::Submitted,
            Some(previous) => previous < kind,
        };
        if !in_order {
            return Err(LogError::OutOfOrder {
                proposal_id,
                kind,
                last,
            });
        }

        let seq = writer.next_seq;
        let entry = LogEntry::seal(
            seq,
            self.clock.now(),
            proposal_id,
            record,
            writer.head_hash.clone(),
        );

        if let Err(e) = self.store.persist(&entry) {
            error!("Append of {} for {} failed: {}", kind, proposal_id, e);
            return Err(e);
        }

        writer.next_seq += 1;
        writer.head_hash = entry.hash.clone();
        writer.stages.insert((proposal_id, kind), seq);
        writer.last_kind.insert(proposal_id, kind);

        let entry = Arc::new(entry);
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry.clone());
        debug!("seq {} {} {}", seq, kind, proposal_id);
        Ok(entry)
    }

    fn prepare(&self, record: EventRecord) -> EventRecord {
        match (record, &self.redactor) {
            (EventRecord::Submitted(mut submitted), Some(redactor)) => {
                let (payload, changed) = redactor.redact_value(&submitted.payload);
                if changed {
                    warn!("Redacted secrets from submitted payload");
                    submitted.payload = payload;
                    submitted.redacted = true;
                }
                EventRecord::Submitted(submitted)
            }
            (record, _) => record,
        }
    }

    /// Entry at `seq`.
    pub fn get(&self, seq: u64) -> Option<Arc<LogEntry>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        usize::try_from(seq).ok().and_then(|i| entries.get(i).cloned())
    }

    /// Entries with `from <= seq <= to`, clamped to what exists.
    pub fn read(&self, from: u64, to: u64) -> Vec<Arc<LogEntry>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        if entries.is_empty() || from > to {
            return Vec::new();
        }
        let last = entries.len() as u64 - 1;
        if from > last {
            return Vec::new();
        }
        let to = to.min(last);
        entries[from as usize..=to as usize].to_vec()
    }

    /// Every entry, in order.
    pub fn read_all(&self) -> Vec<Arc<LogEntry>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Entries for one proposal, in order.
    pub fn entries_for(&self, proposal_id: ProposalId) -> Vec<Arc<LogEntry>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.proposal_id == proposal_id)
            .cloned()
            .collect()
    }

    /// Latest stage recorded for a proposal.
    pub fn stage_of(&self, proposal_id: ProposalId) -> Option<EventKind> {
        self.writer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last_kind
            .get(&proposal_id)
            .copied()
    }

    pub fn len(&self) -> u64 {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hash of the newest entry.
    pub fn head_hash(&self) -> String {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string())
    }

    /// Re-verifies the in-memory arena.
    pub fn verify(&self) -> Result<VerifyReport> {
        let entries = self.read_all();
        verify_entries(entries.iter().map(|e| e.as_ref()))
    }

    /// Reloads and verifies what the store actually holds.
    pub fn verify_store(&self) -> Result<VerifyReport> {
        let loaded = self.store.load()?;
        verify_entries(&loaded)
    }

    /// Time source used for entry timestamps.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }
}
