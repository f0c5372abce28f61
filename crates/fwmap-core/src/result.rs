//! Parse results
//!
//! Serialized shape:
//!
//! ```json
//! {
//!   "basic": { "machineName": "Ender-3", "baudRate": 115200 },
//!   "motion": { "steps": { "x": 80, "y": 80 } },
//!   "_metadata": { "files": [...], "parsedAt": "...", "parserVersion": "...", "fields": { "basic.machineName": { ... } } },
//!   "_debugLog": [ ... ],
//!   "warnings": [ ... ]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diagnostics::{DebugEntry, Warning};
use crate::mapping::FieldType;
use crate::value::{count_leaves, get_path, insert_path, Category, FieldValue};

/// Where a field value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    /// Identifier the value was extracted from (the `mapsFrom` entry for
    /// indexed fields, e.g. `STEPS[2]`)
    pub define_name: String,
    /// 1-based line of the define; `None` for defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    /// Source file of the define
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Declared type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Copied from the field rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_field_id: Option<String>,
    /// The value came from the rule's default
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_default: bool,
}

/// Provenance of a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    /// Source files in parse order
    pub files: Vec<String>,
    /// When the parse finished
    pub parsed_at: DateTime<Utc>,
    /// Crate version that produced the result
    pub parser_version: String,
    /// Keyed by `category.fieldKey`
    pub fields: BTreeMap<String, FieldMetadata>,
}

impl Default for ResultMetadata {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            parsed_at: Utc::now(),
            parser_version: crate::VERSION.to_string(),
            fields: BTreeMap::new(),
        }
    }
}

/// Structured configuration extracted from one or more source files
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParseResult {
    /// Field values by category
    #[serde(flatten)]
    pub categories: BTreeMap<String, Category>,

    /// Provenance and per-field metadata
    #[serde(rename = "_metadata")]
    pub metadata: ResultMetadata,

    /// Ordered engine trace
    #[serde(rename = "_debugLog", default)]
    pub debug_log: Vec<DebugEntry>,

    /// User-facing findings
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl ParseResult {
    /// An empty result for one source file
    pub fn new(file: &str) -> Self {
        let mut result = Self::default();
        result.metadata.files.push(file.to_string());
        result
    }

    /// Value at `category` / dotted `field_key`
    pub fn get(&self, category: &str, field_key: &str) -> Option<&FieldValue> {
        get_path(self.categories.get(category)?, field_key)
    }

    /// Whether the field has a value
    pub fn contains(&self, category: &str, field_key: &str) -> bool {
        self.get(category, field_key).is_some()
    }

    /// Metadata recorded for the field
    pub fn field_metadata(&self, category: &str, field_key: &str) -> Option<&FieldMetadata> {
        self.metadata.fields.get(&field_path(category, field_key))
    }

    /// Number of populated leaf fields
    pub fn field_count(&self) -> usize {
        self.categories.values().map(count_leaves).sum()
    }

    pub(crate) fn set_field(
        &mut self,
        category: &str,
        field_key: &str,
        value: FieldValue,
        metadata: FieldMetadata,
    ) {
        insert_path(
            self.categories.entry(category.to_string()).or_default(),
            field_key,
            value,
        );
        self.metadata
            .fields
            .insert(field_path(category, field_key), metadata);
    }
}

pub(crate) fn field_path(category: &str, field_key: &str) -> String {
    format!("{}.{}", category, field_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::WarningLevel;

    #[test]
    fn test_serialized_shape() {
        let mut result = ParseResult::new("Configuration.h");
        result.set_field(
            "basic",
            "machineName",
            FieldValue::String("Ender-3".into()),
            FieldMetadata {
                define_name: "CUSTOM_MACHINE_NAME".into(),
                line_number: Some(12),
                file: Some("Configuration.h".into()),
                field_type: FieldType::String,
                ui_field_id: Some("machine-name".into()),
                from_default: false,
            },
        );
        result
            .warnings
            .push(Warning::new(WarningLevel::Warning, "check me").for_field("basic.machineName"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["basic"]["machineName"], "Ender-3");
        assert_eq!(json["_metadata"]["files"][0], "Configuration.h");
        let meta = &json["_metadata"]["fields"]["basic.machineName"];
        assert_eq!(meta["defineName"], "CUSTOM_MACHINE_NAME");
        assert_eq!(meta["lineNumber"], 12);
        assert_eq!(meta["type"], "string");
        assert_eq!(meta["uiFieldId"], "machine-name");
        assert!(meta.get("fromDefault").is_none());
        assert_eq!(json["warnings"][0]["level"], "warning");
        assert!(json["_debugLog"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut result = ParseResult::new("a.h");
        result.set_field(
            "motion",
            "steps.x",
            FieldValue::Integer(80),
            FieldMetadata {
                define_name: "STEPS[0]".into(),
                line_number: Some(3),
                file: None,
                field_type: FieldType::Integer,
                ui_field_id: None,
                from_default: false,
            },
        );
        let json = serde_json::to_string(&result).unwrap();
        let back: ParseResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("motion", "steps.x"), Some(&FieldValue::Integer(80)));
        assert_eq!(back.field_count(), 1);
        assert_eq!(back, result);
    }
}
