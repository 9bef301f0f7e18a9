//! # Schema Validator
//!
//! Checks proposal payloads against registered contracts.
//!
//! ## Components
//!
//! | Module      | Role                                               |
//! |-------------|----------------------------------------------------|
//! | `schema`    | Serde-loadable contract definitions + fingerprints |
//! | `validator` | Pure validation, collecting every violation        |
//! | `registry`  | Versioned, atomically swapped snapshots            |
//! | `builtin`   | Contracts shipped with the gate                    |
//!
//! ## Example
//!
//! ```rust
//! use gate_schema::{FieldSpec, FieldType, Schema, SchemaRegistry, UnknownFieldPolicy};
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::new();
//! registry
//!     .register(
//!         "summary",
//!         Schema::new(UnknownFieldPolicy::Reject)
//!             .field("text", FieldSpec::new(FieldType::String).required()),
//!     )
//!     .unwrap();
//!
//! let result = registry.snapshot().validate("summary", &json!({"txt": "x"})).unwrap();
//! assert!(!result.passed);
//! assert_eq!(result.violations.len(), 2);
//! ```

pub mod builtin;
mod error;
pub mod registry;
pub mod schema;
pub mod validator;

pub use builtin::LLM_OUTPUT_V1;
pub use error::{Result, SchemaError};
pub use registry::{RegisteredSchema, SchemaRegistry, SchemaSnapshot};
pub use schema::{FieldSpec, FieldType, Schema, UnknownFieldPolicy};
pub use validator::validate;
