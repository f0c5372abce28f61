//! Define-to-field mapping

use crate::diagnostics::{DebugKind, DebugLog};
use crate::extract::ValueExtractor;
use crate::mapping::{DefineIndex, FieldSpec, IndexedField};
use crate::preprocessor::{DefineLine, DefineRegistry};
use crate::result::{FieldMetadata, ParseResult};

/// Writes the fields an active define maps to
pub struct FieldMapper<'a> {
    index: &'a DefineIndex,
}

impl<'a> FieldMapper<'a> {
    /// A mapper over a built index
    pub fn new(index: &'a DefineIndex) -> Self {
        Self { index }
    }

    /// Map one registered define. Returns the number of fields written.
    pub fn map_define(
        &self,
        define: &DefineLine,
        line: usize,
        registry: &DefineRegistry,
        result: &mut ParseResult,
        log: &mut DebugLog,
    ) -> usize {
        let matches = self.index.lookup(&define.name);
        if matches.is_empty() {
            log.push(
                DebugKind::NotInMapping,
                Some(line),
                format!("{} not in mapping", define.name),
            );
            return 0;
        }

        let extractor = ValueExtractor::new(registry);
        let mut written = 0;
        for field in matches {
            let path = field.path();
            log.push(
                DebugKind::MappingMatch,
                Some(line),
                format!("{} -> {}", field.pattern.raw, path),
            );

            if !conditions_met(&field.spec, registry) {
                log.push(
                    DebugKind::ConditionalSkip,
                    Some(line),
                    format!("{} skipped: field conditions not met", path),
                );
                continue;
            }

            let extracted = match field.pattern.index {
                Some(index) => {
                    match extractor.extract_element(define.value.as_deref(), index, &field.spec) {
                        Ok(extracted) => extracted,
                        Err(reason) => {
                            log.push(
                                DebugKind::CoercionFallback,
                                Some(line),
                                format!("{} skipped: {}[{}]: {}", path, define.name, index, reason),
                            );
                            continue;
                        }
                    }
                }
                None => extractor.extract(define.value.as_deref(), &field.spec),
            };

            if let Some(reason) = &extracted.fallback {
                log.push(
                    DebugKind::CoercionFallback,
                    Some(line),
                    format!("{}: {}", path, reason),
                );
            }

            log.push(
                DebugKind::Extracted,
                Some(line),
                format!("{} = {}", path, extracted.value),
            );
            let metadata = metadata_for(define, field, line, result.metadata.files.last());
            result.set_field(&field.category, &field.field_key, extracted.value, metadata);
            written += 1;
        }
        written
    }
}

fn metadata_for(
    define: &DefineLine,
    field: &IndexedField,
    line: usize,
    file: Option<&String>,
) -> FieldMetadata {
    let define_name = match field.pattern.index {
        Some(index) => format!("{}[{}]", define.name, index),
        None => define.name.clone(),
    };
    FieldMetadata {
        define_name,
        line_number: Some(line),
        file: file.cloned(),
        field_type: field.spec.field_type,
        ui_field_id: field.spec.ui_field_id.clone(),
        from_default: false,
    }
}

/// `conditionalOn` (any), `conditionalOnAll` (all) and `conditionalOnNot`
/// (none) against the current registry. An empty list imposes nothing.
pub fn conditions_met(spec: &FieldSpec, registry: &DefineRegistry) -> bool {
    let defined = |name: &String| registry.is_defined(name);
    (spec.conditional_on.is_empty() || spec.conditional_on.iter().any(defined))
        && spec.conditional_on_all.iter().all(defined)
        && !spec.conditional_on_not.iter().any(defined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{FieldType, MappingDocument};
    use crate::value::FieldValue;

    fn define(name: &str, value: Option<&str>) -> DefineLine {
        DefineLine {
            name: name.into(),
            value: value.map(str::to_string),
            function_like: false,
        }
    }

    #[test]
    fn test_conditions() {
        let mut registry = DefineRegistry::new();
        registry.define("A", None);
        registry.define("B", None);

        let mut spec = FieldSpec::new("X", FieldType::String);
        assert!(conditions_met(&spec, &registry));

        spec.conditional_on = vec!["Z".into(), "A".into()];
        assert!(conditions_met(&spec, &registry));
        spec.conditional_on_all = vec!["A".into(), "B".into()];
        assert!(conditions_met(&spec, &registry));
        spec.conditional_on_not = vec!["B".into()];
        assert!(!conditions_met(&spec, &registry));
        spec.conditional_on_not = vec!["Z".into()];
        spec.conditional_on = vec!["Z".into()];
        assert!(!conditions_met(&spec, &registry));
    }

    #[test]
    fn test_map_define_writes_fields_and_metadata() {
        let mut doc = MappingDocument::new();
        let mut probe = FieldSpec::new("BLTOUCH", FieldType::Boolean);
        probe.ui_field_id = Some("probe-bltouch".into());
        doc.insert("probe", "bltouch", probe);
        let mut gated = FieldSpec::new("BLTOUCH", FieldType::String);
        gated.conditional_on = vec!["NEVER".into()];
        doc.insert("probe", "gated", gated);
        doc.insert("motion", "steps.z", FieldSpec::new("STEPS[2]", FieldType::Float));
        doc.insert("motion", "steps.e", FieldSpec::new("STEPS[9]", FieldType::Float));
        let index = DefineIndex::build(&doc);
        let mapper = FieldMapper::new(&index);

        let mut registry = DefineRegistry::new();
        registry.define("BLTOUCH", None);
        registry.define("STEPS", Some("{ 80, 80, 400, 93 }"));
        let mut result = ParseResult::new("Configuration.h");
        let mut log = DebugLog::new(Some("Configuration.h"), false);

        assert_eq!(mapper.map_define(&define("BLTOUCH", None), 5, &registry, &mut result, &mut log), 1);
        assert_eq!(
            mapper.map_define(&define("STEPS", Some("{ 80, 80, 400, 93 }")), 9, &registry, &mut result, &mut log),
            1
        );
        assert_eq!(mapper.map_define(&define("UNMAPPED", Some("1")), 10, &registry, &mut result, &mut log), 0);

        assert_eq!(result.get("probe", "bltouch"), Some(&FieldValue::Boolean(true)));
        assert!(!result.contains("probe", "gated"));
        assert_eq!(result.get("motion", "steps.z"), Some(&FieldValue::Float(400.0)));
        assert!(!result.contains("motion", "steps.e"));

        let meta = result.field_metadata("probe", "bltouch").unwrap();
        assert_eq!(meta.define_name, "BLTOUCH");
        assert_eq!(meta.line_number, Some(5));
        assert_eq!(meta.file.as_deref(), Some("Configuration.h"));
        assert_eq!(meta.ui_field_id.as_deref(), Some("probe-bltouch"));
        assert_eq!(result.field_metadata("motion", "steps.z").unwrap().define_name, "STEPS[2]");

        let kinds: Vec<_> = log.entries().iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&DebugKind::ConditionalSkip));
        assert!(kinds.contains(&DebugKind::CoercionFallback));
        assert!(!kinds.contains(&DebugKind::NotInMapping));
    }
}
