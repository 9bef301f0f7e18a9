//! # Governance Gate Types
//!
//! Shared data model for the governance gate: proposals, validation results,
//! risk findings, decisions and hash-chained log entries.
//!
//! Every other gate crate depends on this one; it depends on none of them.
//!
//! ## Lifecycle
//!
//! ```text
//! SUBMITTED ─► VALIDATED ─┬─► SCANNED ─► GATED ─┬─► DECIDED (AUTO_*)
//!                         │                     └─► PENDING_HUMAN ─► DECIDED
//!                         └─(fail)─► DECIDED (AUTO_REJECTED)
//! ```
//!
//! | Decision       | Terminal | Approves |
//! |----------------|----------|----------|
//! | AUTO_APPROVED  | yes      | yes      |
//! | AUTO_REJECTED  | yes      | no       |
//! | PENDING_HUMAN  | no       | no       |
//! | HUMAN_APPROVED | yes      | yes      |
//! | HUMAN_REJECTED | yes      | no       |
//! | EXPIRED        | yes      | no       |

pub mod canonical;
pub mod clock;
pub mod decision;
pub mod entry;
pub mod ids;
pub mod proposal;
pub mod risk;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{Decision, DecisionReason, DecisionRecord, GateOutcome, HumanVerdict};
pub use entry::{EventKind, EventRecord, LogEntry, SubmittedRecord, GENESIS_HASH};
pub use ids::{AgentId, Capability, HumanId, Participant, ProposalId};
pub use proposal::Proposal;
pub use risk::{aggregate, MatchSpan, RiskCategory, RiskFinding, ScanResult, Severity};
pub use validation::{ValidationResult, Violation};
