//! Validation pass
//!
//! Checks the finished result against each field's rules and reports
//! findings as warnings. Values are never modified.

use crate::diagnostics::{Warning, WarningLevel};
use crate::mapping::{FieldSpec, MappingDocument};
use crate::result::ParseResult;

/// Validate `result` against the rules in `mapping`
pub fn validate(mapping: &MappingDocument, result: &ParseResult) -> Vec<Warning> {
    let mut warnings = Vec::new();

    for (category, field_key, spec) in mapping.fields() {
        let required = spec.is_required();
        let must_be_true = spec.must_be_true();
        let range = spec.validation.as_ref().map(|v| (v.min, v.max));
        if !required && !must_be_true && range.is_none() {
            continue;
        }

        let path = format!("{}.{}", category, field_key);
        let value = result.get(category, field_key);

        if required && value.is_none() {
            warnings.push(
                Warning::new(
                    spec.error_level(),
                    format!("Required setting {} ({}) is missing", path, sources(spec)),
                )
                .for_field(&path),
            );
        }

        // An absent field that is also required already has its warning
        if must_be_true && !value.is_some_and(|v| v.is_truthy()) && (value.is_some() || !required) {
            let message = spec
                .notes
                .clone()
                .unwrap_or_else(|| format!("{} ({}) should be enabled", path, sources(spec)));
            warnings.push(Warning::new(spec.error_level(), message).for_field(&path));
        }

        if let (Some((min, max)), Some(n)) = (range, value.and_then(|v| v.as_f64())) {
            if let Some(min) = min.filter(|&min| n < min) {
                warnings.push(
                    Warning::new(
                        WarningLevel::Warning,
                        format!("{} = {} is below the minimum of {}", path, n, min),
                    )
                    .for_field(&path),
                );
            }
            if let Some(max) = max.filter(|&max| n > max) {
                warnings.push(
                    Warning::new(
                        WarningLevel::Warning,
                        format!("{} = {} is above the maximum of {}", path, n, max),
                    )
                    .for_field(&path),
                );
            }
        }
    }

    if !warnings.is_empty() {
        tracing::info!("Validation produced {} warning(s)", warnings.len());
    }
    warnings
}

fn sources(spec: &FieldSpec) -> String {
    spec.maps_from.join(", ")
}
