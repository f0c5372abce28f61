//! Defaults pass
//!
//! Runs once after all files are parsed (and merged). Every field that has a
//! `default` but no value gets one. A default naming an identifier is
//! resolved first through the registry's value table, then through a field
//! mapped from that identifier; otherwise the default is used literally.

use crate::diagnostics::{DebugKind, DebugLog};
use crate::extract::ValueExtractor;
use crate::mapping::{DefineIndex, FieldSpec, FieldType, MappingDocument};
use crate::preprocessor::{is_identifier, DefineRegistry};
use crate::result::{FieldMetadata, ParseResult};
use crate::value::FieldValue;

/// Fill absent fields from mapping defaults. Returns the number applied.
pub fn apply_defaults(
    mapping: &MappingDocument,
    index: &DefineIndex,
    registry: &DefineRegistry,
    result: &mut ParseResult,
    log: &mut DebugLog,
) -> usize {
    let mut applied = 0;

    for (category, field_key, spec) in mapping.fields() {
        let Some(default) = &spec.default else {
            continue;
        };
        if result.contains(category, field_key) {
            continue;
        }

        let (value, source) = match default.as_str().map(str::trim) {
            Some(name) if is_identifier(name) => {
                match resolve_identifier(name, spec, index, registry, result) {
                    Some(value) => (Some(value), name.to_string()),
                    None => (literal(default, spec, registry), "default".to_string()),
                }
            }
            _ => (literal(default, spec, registry), "default".to_string()),
        };
        let Some(value) = value else {
            log.push(
                DebugKind::CoercionFallback,
                None,
                format!("{}.{}: default {} has no field representation", category, field_key, default),
            );
            continue;
        };

        log.push(
            DebugKind::DefaultApplied,
            None,
            format!("{}.{} = {} (default from {})", category, field_key, value, source),
        );
        result.set_field(
            category,
            field_key,
            value,
            FieldMetadata {
                define_name: source,
                line_number: None,
                file: None,
                field_type: spec.field_type,
                ui_field_id: spec.ui_field_id.clone(),
                from_default: true,
            },
        );
        applied += 1;
    }

    if applied > 0 {
        tracing::debug!("Applied {} default value(s)", applied);
    }
    applied
}

fn resolve_identifier(
    name: &str,
    spec: &FieldSpec,
    index: &DefineIndex,
    registry: &DefineRegistry,
    result: &ParseResult,
) -> Option<FieldValue> {
    if let Some(raw) = registry.value(name) {
        return Some(ValueExtractor::new(registry).extract(Some(raw), spec).value);
    }

    index
        .exact(name)
        .iter()
        .filter(|field| field.pattern.index.is_none())
        .find_map(|field| result.get(&field.category, &field.field_key))
        .cloned()
}

/// A JSON default taken at face value and fitted to the declared type
fn literal(default: &serde_json::Value, spec: &FieldSpec, registry: &DefineRegistry) -> Option<FieldValue> {
    if let serde_json::Value::String(text) = default {
        if spec.field_type != FieldType::String && spec.field_type != FieldType::Raw {
            return Some(ValueExtractor::new(registry).extract(Some(text), spec).value);
        }
    }

    let value = FieldValue::from_json(default)?;
    Some(match (spec.field_type, value) {
        (FieldType::Float, FieldValue::Integer(n)) => FieldValue::Float(n as f64),
        (FieldType::Integer, FieldValue::Float(f)) if f.abs() < i64::MAX as f64 => {
            FieldValue::Integer(f.trunc() as i64)
        }
        (FieldType::String, FieldValue::Integer(n)) => FieldValue::String(n.to_string()),
        (FieldType::String, FieldValue::Float(f)) => FieldValue::String(f.to_string()),
        (_, value) => value,
    })
}
