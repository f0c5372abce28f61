//! Field specification types as they appear in mapping documents

use serde::{Deserialize, Deserializer, Serialize};

use crate::diagnostics::WarningLevel;

/// Declared type of a mapped field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Text, unquoted when quoted
    #[default]
    String,
    /// Whole number; fractions are truncated
    #[serde(alias = "int")]
    Integer,
    /// Floating-point number
    #[serde(alias = "number", alias = "double")]
    Float,
    /// A switch; a bare define is `true`
    #[serde(alias = "bool")]
    Boolean,
    /// A `{ ... }` list
    Array,
    /// Any type name the engine does not know; the raw text is passed through
    #[serde(other)]
    Raw,
}

impl FieldType {
    /// `integer` or `float`
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }
}

/// Validation rules attached to a field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    /// The field must end up with a value
    #[serde(default)]
    pub required: bool,
    /// The value must be truthy
    #[serde(default)]
    pub must_be_true: bool,
    /// Inclusive lower bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Level for required and mustBeTrue warnings; `error` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_level: Option<WarningLevel>,
}

/// Declarative rule mapping one or more source identifiers to a result field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Source identifiers; entries may contain `*` and/or a `[i]` suffix
    #[serde(default, deserialize_with = "one_or_many")]
    pub maps_from: Vec<String>,

    /// Declared type
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Element type for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<FieldType>,

    /// Literal or identifier used when no define supplies the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    /// At least one must be defined (OR)
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub conditional_on: Vec<String>,

    /// All must be defined (AND)
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub conditional_on_all: Vec<String>,

    /// None may be defined (NOR)
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub conditional_on_not: Vec<String>,

    /// Older mapping files flag required fields at the top level
    #[serde(default)]
    pub required: bool,

    /// Checks run after the merge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,

    /// Opaque token for the presentation layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_field_id: Option<String>,

    /// Message used for a failed mustBeTrue check
    #[serde(default, alias = "th3dNotes", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FieldSpec {
    /// A rule reading one identifier
    pub fn new(maps_from: &str, field_type: FieldType) -> Self {
        Self {
            maps_from: vec![maps_from.to_string()],
            field_type,
            ..Default::default()
        }
    }

    /// Required either at the top level or under `validation`
    pub fn is_required(&self) -> bool {
        self.required || self.validation.as_ref().is_some_and(|v| v.required)
    }

    /// Whether the value must be truthy
    pub fn must_be_true(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.must_be_true)
    }

    /// Level for this field's warnings
    pub fn error_level(&self) -> WarningLevel {
        self.validation
            .as_ref()
            .and_then(|v| v.error_level)
            .unwrap_or_default()
    }

    /// Any `conditionalOn*` gate is present
    pub fn has_conditionals(&self) -> bool {
        !self.conditional_on.is_empty()
            || !self.conditional_on_all.is_empty()
            || !self.conditional_on_not.is_empty()
    }
}

/// Accept either `"NAME"` or `["A", "B"]`
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}
