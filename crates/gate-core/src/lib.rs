//! # Governance Gate Core
//!
//! Router / Hub facade for governing LLM agent output. Orchestrates the
//! Schema Validator, Risk Scanner, Decision Gate and Append-Only Log.
//!
//! ## Failure Coverage
//!
//! | Failure mode              | Component        | Defense                              |
//! |---------------------------|------------------|--------------------------------------|
//! | Malformed output          | Schema Validator | All violations reported, auto-reject |
//! | Overreach, hype, secrets  | Risk Scanner     | Versioned rules, pinned per proposal |
//! | Authority bleed           | Decision Gate    | Human finality, expiry never approves|
//! | Compounded hallucination  | Router           | Bounded routing of committed outcomes|
//! | Unaudited decisions       | Append-Only Log  | Durable before visible, hash chained |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        GOVERNANCE GATE                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   agents ──submit──►  ┌─────────────────┐  ◄──resolve── humans  │
//! │                       │  Router / Hub   │                       │
//! │   agents ◄──inbox───  └────────┬────────┘                       │
//! │                                │                                │
//! │         ┌──────────────┬───────┴──────┬──────────────┐          │
//! │         ▼              ▼              ▼              ▼          │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────┐    │
//! │  │   Schema   │ │    Risk    │ │  Decision  │ │   Append-  │    │
//! │  │ Validator  │ │  Scanner   │ │    Gate    │ │  Only Log  │    │
//! │  └────────────┘ └────────────┘ └────────────┘ └────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use gate_core::{GateConfig, Router};
//! use gate_types::{AgentId, Decision, HumanId, HumanVerdict};
//! use serde_json::json;
//!
//! let router = Router::open(GateConfig::default()).unwrap();
//! let agent = AgentId::new("ops-bot");
//!
//! let held = router
//!     .submit(&agent, "llm_output.v1", json!({"output": "I have deployed the fix to production."}))
//!     .unwrap();
//! assert_eq!(held.decision, Decision::PendingHuman);
//!
//! let decision = router
//!     .resolve(held.proposal_id, HumanVerdict::Approve, &HumanId::new("oncall"))
//!     .unwrap();
//! assert_eq!(decision, Decision::HumanApproved);
//! ```
//!
//! ## Notes
//!
//! - Components never reference each other; the router passes values
//! - A decision is visible only after its log entry is durable
//! - Expiry is terminal and never an approval

mod admission;
mod config;
mod error;
mod router;
mod routing;

pub use admission::{AdmissionControl, AdmissionPermit};
pub use config::{AdmissionConfig, GateConfig, LogBackend, LogConfig, SweepConfig};
pub use error::GateError;
pub use router::{ProposalStatus, RecoveryReport, Router, Submission};
pub use routing::{CommittedInput, COMMITTED_INPUT_SOURCE};

// Re-export component types for convenience
pub use gate_decision::{CategoryAction, DecisionPolicy, PendingApproval, SweepReport, SweeperHandle};
pub use gate_log::VerifyReport;
pub use gate_scanner::{RuleDef, RuleSetDef};
pub use gate_schema::{FieldSpec, FieldType, Schema, UnknownFieldPolicy};

/// Core result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
