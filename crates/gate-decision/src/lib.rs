//! # Decision Gate
//!
//! Turns a scan into a governance outcome and guards human finality: a
//! high-risk proposal takes effect only with explicit human consent, and the
//! absence of a verdict is never read as consent.
//!
//! | Component        | Role                                              |
//! |------------------|---------------------------------------------------|
//! | `DecisionPolicy` | Pure mapping from scan result to gate outcome     |
//! | `DecisionGate`   | Pending holds, verdicts, cancellation, expiry     |
//! | `ExpirySweeper`  | Tokio task sweeping overdue holds to EXPIRED      |
//! | `replay`         | Pure fold of the log into decisions, crash restore|
//!
//! ## Example
//!
//! ```rust
//! use gate_decision::DecisionPolicy;
//! use gate_types::{Decision, ScanResult};
//!
//! let policy = DecisionPolicy::default();
//! let outcome = policy.evaluate(&ScanResult::new("builtin-1", "fp", vec![]));
//! assert_eq!(outcome.decision(), Decision::AutoApproved);
//! ```

mod error;
pub mod gate;
pub mod policy;
pub mod replay;
pub mod sweeper;

pub use error::{DecisionError, Result};
pub use gate::{DecisionGate, PendingApproval, SweepReport};
pub use policy::{CategoryAction, DecisionPolicy};
pub use replay::{decisions, replay, restore, Hold, ReplayedProposal, RestoreReport};
pub use sweeper::{ExpirySweeper, SweeperHandle};
