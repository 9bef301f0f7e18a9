//! # Append-Only Log
//!
//! Durable, strictly ordered, tamper-evident record of every governance
//! transition. This is the audit trail: a transition that is not in the log
//! did not happen.
//!
//! ## Threat Model
//!
//! | Threat                         | Defense                                  |
//! |--------------------------------|------------------------------------------|
//! | Silent loss of a transition    | Persist before publish, fail loudly      |
//! | Duplicate entries on retry     | `(proposal, kind)` idempotency key       |
//! | Rewriting history              | SHA-256 hash chain, verified on open     |
//! | Overwriting a sequence number  | Compare-and-swap inserts                 |
//! | Credentials leaking into audit | Redaction of submitted payloads          |
//!
//! ## Example
//!
//! ```rust
//! use gate_log::AppendOnlyLog;
//! use gate_types::{AgentId, EventRecord, ProposalId, SubmittedRecord};
//! use serde_json::json;
//!
//! let log = AppendOnlyLog::in_memory().unwrap();
//! let pid = ProposalId::new();
//! let entry = log
//!     .append(
//!         pid,
//!         EventRecord::Submitted(SubmittedRecord {
//!             agent: AgentId::new("writer"),
//!             proposal_type: "llm_output.v1".into(),
//!             payload: json!({"output": "hello"}),
//!             payload_digest: String::new(),
//!             redacted: false,
//!         }),
//!     )
//!     .unwrap();
//! assert_eq!(entry.seq, 0);
//! assert!(log.verify().is_ok());
//! ```

mod error;
pub mod log;
pub mod redact;
pub mod store;
pub mod verify;

pub use error::{LogError, Result};
pub use log::{AppendOnlyLog, LogOptions};
pub use redact::Redactor;
pub use store::{LogStore, MemoryStore, SledStore};
pub use verify::{verify_entries, VerifyReport};
