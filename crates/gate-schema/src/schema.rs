//! # Schema Contracts
//!
//! A schema is a named contract describing the required shape of a payload.
//! Definitions are plain serde data so they can be loaded from configuration:
//!
//! ```toml
//! unknown_fields = "reject"
//!
//! [fields.output]
//! type = "any"
//! required = true
//!
//! [fields.meta]
//! type = "object"
//! unknown_fields = "warn"
//! ```
//!
//! Field types:
//!
//! | Type      | Accepts                              |
//! |-----------|--------------------------------------|
//! | `any`     | any non-null value                   |
//! | `string`  | JSON strings                         |
//! | `number`  | any JSON number                      |
//! | `integer` | numbers without a fractional part    |
//! | `boolean` | `true` / `false`                     |
//! | `array`   | arrays, each item checked by `items` |
//! | `object`  | objects, checked by nested `fields`  |

use crate::error::{Result, SchemaError};
use gate_types::canonical::digest_hex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to do with payload fields the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFieldPolicy {
    /// Each unknown field is a violation.
    Reject,
    /// Unknown fields are accepted silently.
    #[default]
    Ignore,
    /// Unknown fields are reported as warnings but do not fail.
    Warn,
}

/// Expected JSON type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Any,
    String,
    Number,
    Integer,
    Boolean,
    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Box<FieldSpec>>,
    },
    Object {
        #[serde(default)]
        fields: BTreeMap<String, FieldSpec>,
        #[serde(default)]
        unknown_fields: UnknownFieldPolicy,
    },
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Any => "any",
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array { .. } => "array",
            FieldType::Object { .. } => "object",
        }
    }
}

/// Constraints on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(flatten)]
    pub ty: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Whether an explicit `null` is accepted.
    #[serde(default)]
    pub nullable: bool,
    /// Strings, arrays and objects must not be empty.
    #[serde(default)]
    pub non_empty: bool,
}

impl FieldSpec {
    pub fn new(ty: FieldType) -> Self {
        Self {
            ty,
            required: false,
            nullable: false,
            non_empty: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }
}

/// Contract for the payload of one proposal type.
///
/// The payload itself must be a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    pub unknown_fields: UnknownFieldPolicy,
}

impl Schema {
    pub fn new(unknown_fields: UnknownFieldPolicy) -> Self {
        Self {
            fields: BTreeMap::new(),
            unknown_fields,
        }
    }

    /// Adds a field (builder style).
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Canonical digest of the definition.
    pub fn fingerprint(&self) -> String {
        match serde_json::to_value(self) {
            Ok(value) => digest_hex(&value),
            // BTreeMap<String, _> always serializes; keep the path total anyway.
            Err(_) => String::new(),
        }
    }

    /// Rejects definitions that can never be satisfied or checked.
    pub fn check(&self) -> Result<()> {
        check_fields(&self.fields, "$")
    }
}

fn check_fields(fields: &BTreeMap<String, FieldSpec>, path: &str) -> Result<()> {
    for (name, spec) in fields {
        if name.is_empty() {
            return Err(SchemaError::InvalidDefinition(format!(
                "empty field name under {}",
                path
            )));
        }
        let child = format!("{}.{}", path, name);
        check_spec(spec, &child)?;
    }
    Ok(())
}

fn check_spec(spec: &FieldSpec, path: &str) -> Result<()> {
    if spec.non_empty
        && !matches!(
            spec.ty,
            FieldType::String | FieldType::Array { .. } | FieldType::Object { .. } | FieldType::Any
        )
    {
        return Err(SchemaError::InvalidDefinition(format!(
            "{}: non_empty does not apply to {}",
            path,
            spec.ty.name()
        )));
    }
    match &spec.ty {
        FieldType::Array { items: Some(items) } => check_spec(items, &format!("{}[]", path)),
        FieldType::Object { fields, .. } => check_fields(fields, path),
        _ => Ok(()),
    }
}
