//! Error types for the risk scanner.

use thiserror::Error;

/// Errors raised while registering rule sets.
///
/// Scanning itself never fails; these are configuration errors.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A rule's pattern does not compile.
    #[error("Rule {rule} has an invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    /// Two rules in one set share an id.
    #[error("Duplicate rule id in rule set: {0}")]
    DuplicateRule(String),

    /// A rule or version label is empty.
    #[error("Invalid rule set: {0}")]
    Invalid(String),

    /// A rule set with this version label was already registered.
    #[error("Rule set version already registered: {0}")]
    VersionExists(String),

    /// No rule set with this version label is known.
    #[error("Unknown rule set version: {0}")]
    UnknownVersion(String),
}

/// Result type for scanner operations.
pub type Result<T> = std::result::Result<T, ScanError>;
