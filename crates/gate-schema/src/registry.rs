//! # Schema Registry
//!
//! Read-mostly shared configuration, modeled as immutable snapshots swapped
//! atomically. Every registration produces a new snapshot with the next
//! version; readers clone the current `Arc` and keep using it for as long as
//! they need, unaffected by later registrations.
//!
//! ```text
//!   readers ──► RwLock<Arc<SchemaSnapshot>> ──► v3 { llm_output.v1, report }
//!                          ▲
//!   register ──────────────┘  builds v4 = v3 + new schema, then swaps
//! ```
//!
//! Schemas are immutable once registered: registering a name twice is a
//! configuration error, never a silent overwrite.

use crate::error::{Result, SchemaError};
use crate::schema::Schema;
use crate::validator;
use gate_types::ValidationResult;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// A schema together with the identity it was registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSchema {
    pub name: String,
    pub definition: Schema,
    /// Canonical digest of `definition`.
    pub fingerprint: String,
    /// Registry version that introduced this schema.
    pub registry_version: u64,
}

impl RegisteredSchema {
    pub fn new(name: impl Into<String>, definition: Schema, registry_version: u64) -> Self {
        let fingerprint = definition.fingerprint();
        Self {
            name: name.into(),
            definition,
            fingerprint,
            registry_version,
        }
    }
}

/// One immutable view of the registry.
#[derive(Debug, Default)]
pub struct SchemaSnapshot {
    version: u64,
    schemas: BTreeMap<String, Arc<RegisteredSchema>>,
}

impl SchemaSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredSchema>> {
        self.schemas.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    /// Validates a payload against the named schema.
    pub fn validate(&self, name: &str, payload: &Value) -> Result<ValidationResult> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaError::NotRegistered(name.to_string()))?;
        Ok(validator::validate(payload, &schema))
    }
}

/// Versioned, atomically swapped schema registry.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    current: RwLock<Arc<SchemaSnapshot>>,
}

impl SchemaRegistry {
    /// Creates an empty registry at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in contracts.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for (name, schema) in crate::builtin::builtins() {
            // Fresh registry with distinct built-in names; cannot collide.
            let _ = registry.register(name, schema);
        }
        registry
    }

    /// Registers a schema, returning the new registry version.
    ///
    /// # Errors
    ///
    /// - `SchemaError::AlreadyRegistered` if the name is taken
    /// - `SchemaError::InvalidDefinition` if the name is empty or the
    ///   definition is malformed
    pub fn register(&self, name: impl Into<String>, definition: Schema) -> Result<u64> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaError::InvalidDefinition(
                "schema name must not be empty".to_string(),
            ));
        }
        definition.check()?;

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        if current.contains(&name) {
            return Err(SchemaError::AlreadyRegistered(name));
        }

        let version = current.version + 1;
        let mut schemas = current.schemas.clone();
        let registered = Arc::new(RegisteredSchema::new(name.clone(), definition, version));
        debug!("Schema {} fingerprint {}", name, registered.fingerprint);
        schemas.insert(name.clone(), registered);

        *current = Arc::new(SchemaSnapshot { version, schemas });
        info!("Registered schema {} (registry v{})", name, version);
        Ok(version)
    }

    /// Current snapshot. Cheap; callers may hold it indefinitely.
    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().contains(name)
    }
}
