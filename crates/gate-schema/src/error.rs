//! Error types for the schema registry.

use thiserror::Error;

/// Errors raised while registering or looking up schemas.
///
/// These are configuration errors: they never become proposal events.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A schema with this name already exists.
    #[error("Schema already registered: {0}")]
    AlreadyRegistered(String),

    /// No schema with this name exists.
    #[error("Schema not registered: {0}")]
    NotRegistered(String),

    /// The definition itself is malformed.
    #[error("Invalid schema definition: {0}")]
    InvalidDefinition(String),
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
