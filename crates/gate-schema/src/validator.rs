//! Payload validation.
//!
//! A pure function of payload and schema: no I/O, no shared state. Every
//! violation is collected so a submitter can fix all of them in one pass.

use crate::registry::RegisteredSchema;
use crate::schema::{FieldSpec, FieldType, UnknownFieldPolicy};
use gate_types::{ValidationResult, Violation};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Validates a payload against a registered schema.
pub fn validate(payload: &Value, schema: &RegisteredSchema) -> ValidationResult {
    let mut violations = Vec::new();
    let mut warnings = Vec::new();

    match payload {
        Value::Object(map) => check_object(
            map,
            &schema.definition.fields,
            schema.definition.unknown_fields,
            "$",
            &mut violations,
            &mut warnings,
        ),
        other => violations.push(Violation::new(
            "$",
            format!("expected object, found {}", type_name(other)),
        )),
    }

    ValidationResult::new(
        schema.name.clone(),
        schema.registry_version,
        schema.fingerprint.clone(),
        violations,
        warnings,
    )
}

fn check_object(
    map: &Map<String, Value>,
    fields: &BTreeMap<String, FieldSpec>,
    policy: UnknownFieldPolicy,
    path: &str,
    violations: &mut Vec<Violation>,
    warnings: &mut Vec<Violation>,
) {
    for (name, spec) in fields {
        let child = format!("{}.{}", path, name);
        match map.get(name) {
            None if spec.required => {
                violations.push(Violation::new(child, "required field missing"));
            }
            None => {}
            Some(value) => check_value(value, spec, &child, violations, warnings),
        }
    }

    let mut unknown: Vec<&String> = map.keys().filter(|k| !fields.contains_key(*k)).collect();
    unknown.sort();
    for key in unknown {
        let child = format!("{}.{}", path, key);
        match policy {
            UnknownFieldPolicy::Reject => violations.push(Violation::new(child, "unknown field")),
            UnknownFieldPolicy::Warn => warnings.push(Violation::new(child, "unknown field")),
            UnknownFieldPolicy::Ignore => {}
        }
    }
}

fn check_value(
    value: &Value,
    spec: &FieldSpec,
    path: &str,
    violations: &mut Vec<Violation>,
    warnings: &mut Vec<Violation>,
) {
    if value.is_null() {
        if !spec.nullable {
            violations.push(Violation::new(path, "must not be null"));
        }
        return;
    }

    let conforms = match (&spec.ty, value) {
        (FieldType::Any, _) => true,
        (FieldType::String, Value::String(_)) => true,
        (FieldType::Number, Value::Number(_)) => true,
        (FieldType::Integer, Value::Number(n)) => {
            n.is_i64() || n.is_u64() || n.as_f64().map_or(false, |f| f.fract() == 0.0)
        }
        (FieldType::Boolean, Value::Bool(_)) => true,
        (FieldType::Array { .. }, Value::Array(_)) => true,
        (FieldType::Object { .. }, Value::Object(_)) => true,
        _ => false,
    };
    if !conforms {
        violations.push(Violation::new(
            path,
            format!("expected {}, found {}", spec.ty.name(), type_name(value)),
        ));
        return;
    }

    if spec.non_empty && is_empty(value) {
        violations.push(Violation::new(path, "must not be empty"));
    }

    match (&spec.ty, value) {
        (FieldType::Array { items: Some(items) }, Value::Array(values)) => {
            for (i, item) in values.iter().enumerate() {
                let child = format!("{}[{}]", path, i);
                check_value(item, items, &child, violations, warnings);
            }
        }
        (FieldType::Object { fields, unknown_fields }, Value::Object(map)) => {
            check_object(map, fields, *unknown_fields, path, violations, warnings);
        }
        _ => {}
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
