//! Built-in contracts.

use crate::schema::{FieldSpec, FieldType, Schema, UnknownFieldPolicy};
use std::collections::BTreeMap;

/// Name of the structured LLM output contract.
pub const LLM_OUTPUT_V1: &str = "llm_output.v1";

/// Structured LLM output:
///
/// ```json
/// { "status": "ok", "output": "... | {...} | [...]", "meta": {} }
/// ```
///
/// `output` is required and must not be null; `status` must be a string
/// when present; `meta` must be an object when present.
pub fn llm_output_v1() -> Schema {
    Schema::new(UnknownFieldPolicy::Ignore)
        .field("output", FieldSpec::new(FieldType::Any).required())
        .field("status", FieldSpec::new(FieldType::String))
        .field(
            "meta",
            FieldSpec::new(FieldType::Object {
                fields: BTreeMap::new(),
                unknown_fields: UnknownFieldPolicy::Ignore,
            }),
        )
}

/// Every built-in contract by name.
pub fn builtins() -> Vec<(&'static str, Schema)> {
    vec![(LLM_OUTPUT_V1, llm_output_v1())]
}
