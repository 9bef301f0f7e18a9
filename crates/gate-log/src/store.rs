//! # Persistent Storage Backends
//!
//! The log writes through a [`LogStore`]. A store only has to do two things:
//! make one entry durable before returning, and hand every entry back in
//! sequence order on open.
//!
//! | Backend       | Durability                    | Use                    |
//! |---------------|-------------------------------|------------------------|
//! | `SledStore`   | `flush()` before acknowledge  | production, CLI        |
//! | `MemoryStore` | process lifetime              | tests, fault injection |
//!
//! ## Sled Layout
//!
//! | Tree      | Key            | Value            |
//! |-----------|----------------|------------------|
//! | `entries` | seq (u64, BE)  | JSON `LogEntry`  |
//!
//! Big-endian keys make sled's lexicographic iteration equal sequence order.
//! Entries are inserted with compare-and-swap against an absent key, so an
//! existing sequence number can never be overwritten.

use crate::error::{LogError, Result};
use gate_types::LogEntry;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

/// Tree name for log entries.
const ENTRY_TREE: &str = "entries";

/// Durable backing store for the append-only log.
pub trait LogStore: Send + Sync + fmt::Debug {
    /// Persists one entry. Must not return `Ok` before the entry is durable.
    fn persist(&self, entry: &LogEntry) -> Result<()>;

    /// Loads every entry in sequence order.
    fn load(&self) -> Result<Vec<LogEntry>>;

    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;
}

/// Sled-backed durable store.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    entries: sled::Tree,
}

impl SledStore {
    /// Opens or creates a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let entries = db.open_tree(ENTRY_TREE)?;
        Ok(Self { db, entries })
    }

    /// Creates a throwaway store that lives in a temp directory.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let entries = db.open_tree(ENTRY_TREE)?;
        Ok(Self { db, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LogStore for SledStore {
    fn persist(&self, entry: &LogEntry) -> Result<()> {
        insert_durable(&self.entries, entry, || self.db.flush())
    }

    fn load(&self) -> Result<Vec<LogEntry>> {
        let mut out = Vec::with_capacity(self.entries.len());
        for item in self.entries.iter() {
            let (key, value) = item?;
            let entry: LogEntry = serde_json::from_slice(&value)?;
            let expected: [u8; 8] = entry.seq.to_be_bytes();
            if key.as_ref() != expected.as_slice() {
                return Err(LogError::Corrupted {
                    seq: entry.seq,
                    reason: "stored under a different key".to_string(),
                });
            }
            out.push(entry);
        }
        Ok(out)
    }

    fn backend(&self) -> &'static str {
        "sled"
    }
}

impl fmt::Debug for SledStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SledStore")
            .field("entries", &self.len())
            .finish()
    }
}

/// Inserts `entry` under its sequence number, then runs `flush`.
///
/// A failed flush removes the entry again, so a `WriteFailure` never leaves
/// an orphan behind that would collide with the retried sequence number or
/// resurface on the next open.
fn insert_durable<F>(tree: &sled::Tree, entry: &LogEntry, flush: F) -> Result<()>
where
    F: FnOnce() -> sled::Result<usize>,
{
    let key = entry.seq.to_be_bytes();
    let value = serde_json::to_vec(entry)?;

    let swapped = tree
        .compare_and_swap(key, None as Option<&[u8]>, Some(value.as_slice()))
        .map_err(|e| LogError::WriteFailure {
            seq: entry.seq,
            reason: e.to_string(),
        })?;
    if swapped.is_err() {
        return Err(LogError::SequenceCollision(entry.seq));
    }

    match flush() {
        Ok(flushed) => {
            debug!("Persisted seq {} ({} bytes flushed)", entry.seq, flushed);
            Ok(())
        }
        Err(e) => {
            if let Err(undo) =
                tree.compare_and_swap(key, Some(value.as_slice()), None as Option<&[u8]>)
            {
                error!("Could not roll back unflushed seq {}: {}", entry.seq, undo);
            }
            warn!("Flush failed for seq {}: {}", entry.seq, e);
            Err(LogError::WriteFailure {
                seq: entry.seq,
                reason: e.to_string(),
            })
        }
    }
}

/// In-memory store with a write-failure switch.
///
/// Clones share the same entries, so a test can "reopen" a log from the
/// same store after dropping the first instance.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a store with existing entries (imports, corruption tests).
    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// While set, every `persist` fails with `WriteFailure`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogStore for MemoryStore {
    fn persist(&self, entry: &LogEntry) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LogError::WriteFailure {
                seq: entry.seq,
                reason: "injected write failure".to_string(),
            });
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.iter().any(|e| e.seq == entry.seq) {
            return Err(LogError::SequenceCollision(entry.seq));
        }
        entries.push(entry.clone());
        Ok(())
    }

    fn load(&self) -> Result<Vec<LogEntry>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone();
        entries.sort_by_key(|e| e.seq);
        Ok(entries)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
