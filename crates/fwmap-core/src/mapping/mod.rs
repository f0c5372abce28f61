//! Mapping documents
//!
//! A mapping document is JSON keyed by category, each category a map of
//! `fieldKey -> FieldSpec`. Documents may wrap their categories in a
//! `"categories"` object and may carry metadata keys (`$schema`, `version`,
//! `firmware`, ...), which are never treated as categories.
//!
//! Several documents are merged in load order: later documents override
//! earlier ones field-by-field within a category.

mod error;
mod index;
mod loader;
mod sets;
mod types;

pub use error::MappingLoadError;
pub use index::{DefineIndex, IndexedField, MapsFromPattern};
pub use loader::{MappingLoader, MappingSource};
pub use sets::{MappingSet, MappingSets};
pub use types::{FieldSpec, FieldType, Validation};

use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Top-level keys that describe a document rather than hold fields
const METADATA_KEYS: &[&str] = &[
    "version",
    "firmware",
    "firmwareVariant",
    "description",
    "configFile",
    "generatedFrom",
    "totalDefines",
    "coreDefines",
    "lastUpdated",
    "part",
    "sourceFile",
    "th3dNotes",
    "warnings",
];

fn is_metadata_key(key: &str) -> bool {
    key.starts_with('$') || key.starts_with('_') || METADATA_KEYS.contains(&key)
}

/// Fields of one category keyed by field key
pub type CategorySpecs = BTreeMap<String, FieldSpec>;

/// A (possibly merged) mapping document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDocument {
    /// Document `version`
    #[serde(rename = "version", skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,

    /// Firmware family the document describes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,

    /// Free-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Field rules by category
    pub categories: BTreeMap<String, CategorySpecs>,
}

impl MappingDocument {
    /// An empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from parsed JSON; `location` is only used in errors
    pub fn from_value(value: serde_json::Value, location: &str) -> Result<Self, MappingLoadError> {
        let serde_json::Value::Object(mut root) = value else {
            return Err(MappingLoadError::InvalidDocument {
                location: location.to_string(),
                message: "top level must be a JSON object".to_string(),
            });
        };

        let mut doc = MappingDocument {
            schema_version: root.get("version").and_then(scalar_to_string),
            firmware: root
                .get("firmware")
                .or_else(|| root.get("firmwareVariant"))
                .and_then(scalar_to_string),
            description: root.get("description").and_then(scalar_to_string),
            categories: BTreeMap::new(),
        };

        // Merged documents written by older tooling nest everything under "categories"
        let body = match root.remove("categories") {
            Some(serde_json::Value::Object(categories)) => categories,
            _ => root,
        };

        for (category, fields) in body {
            if is_metadata_key(&category) {
                continue;
            }
            let serde_json::Value::Object(fields) = fields else {
                continue;
            };

            let specs = doc.categories.entry(category.clone()).or_default();
            for (field_key, raw_spec) in fields {
                if !raw_spec.is_object() {
                    continue;
                }
                match serde_json::from_value::<FieldSpec>(raw_spec) {
                    Ok(spec) => {
                        specs.insert(field_key, spec);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Skipping field {}.{} in mapping '{}': {}",
                            category,
                            field_key,
                            location,
                            e
                        );
                    }
                }
            }
        }

        doc.categories.retain(|_, specs| !specs.is_empty());
        Ok(doc)
    }

    /// Parse a document from JSON text
    pub fn from_json(json: &str, location: &str) -> Result<Self, MappingLoadError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| MappingLoadError::Json {
                location: location.to_string(),
                message: e.to_string(),
            })?;
        Self::from_value(value, location)
    }

    /// Merge another document into this one. `other` wins on key collisions.
    pub fn merge(&mut self, other: MappingDocument) {
        if other.schema_version.is_some() {
            self.schema_version = other.schema_version;
        }
        if other.firmware.is_some() {
            self.firmware = other.firmware;
        }
        if other.description.is_some() {
            self.description = other.description;
        }
        for (category, fields) in other.categories {
            self.categories.entry(category).or_default().extend(fields);
        }
    }

    /// Merge a sequence of documents in order
    pub fn merged(documents: impl IntoIterator<Item = MappingDocument>) -> Self {
        let mut merged = MappingDocument::new();
        for doc in documents {
            merged.merge(doc);
        }
        merged
    }

    /// Insert or replace a single field
    pub fn insert(&mut self, category: &str, field_key: &str, spec: FieldSpec) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(field_key.to_string(), spec);
    }

    /// Rule for one field
    pub fn field(&self, category: &str, field_key: &str) -> Option<&FieldSpec> {
        self.categories.get(category)?.get(field_key)
    }

    /// Iterate `(category, fieldKey, spec)` in deterministic order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str, &FieldSpec)> {
        self.categories.iter().flat_map(|(category, fields)| {
            fields
                .iter()
                .map(move |(key, spec)| (category.as_str(), key.as_str(), spec))
        })
    }

    /// Number of field rules
    pub fn field_count(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// No field rules at all
    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }
}

impl FromStr for MappingDocument {
    type Err = MappingLoadError;

    fn from_str(json: &str) -> Result<Self, Self::Err> {
        Self::from_json(json, "<inline>")
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
