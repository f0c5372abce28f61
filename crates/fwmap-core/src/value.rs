//! Typed field values and the nested configuration tree
//!
//! Extracted values are stored per category as a tree of [`ConfigNode`]s.
//! Dotted field keys (`"xy.max"`) build intermediate groups, so a category
//! serializes to the same nested object a UI layer expects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single typed value extracted from a `#define`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A switch
    Boolean(bool),
    /// Whole number
    Integer(i64),
    /// Floating-point number
    Float(f64),
    /// Text
    String(String),
    /// Elements of a `{ ... }` list
    Array(Vec<FieldValue>),
    /// Right-hand side kept verbatim because it is an arithmetic expression
    /// (e.g. `X_BED_SIZE/2`). Serializes as a plain string.
    Expression(String),
}

impl FieldValue {
    /// Truthiness used by `mustBeTrue` validation
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Boolean(b) => *b,
            FieldValue::Integer(n) => *n != 0,
            FieldValue::Float(f) => *f != 0.0,
            FieldValue::String(s) | FieldValue::Expression(s) => !s.is_empty(),
            FieldValue::Array(items) => !items.is_empty(),
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(n) => Some(*n as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text of a string or expression
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) | FieldValue::Expression(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of an array
    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Convert a JSON literal (typically a mapping `default`) into a field value.
    ///
    /// Objects and `null` have no field representation and yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(FieldValue::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Integer)
                .or_else(|| n.as_f64().map(FieldValue::Float)),
            serde_json::Value::String(s) => Some(FieldValue::String(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(FieldValue::from_json)
                .collect::<Option<Vec<_>>>()
                .map(FieldValue::Array),
            serde_json::Value::Null | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::String(s) => write!(f, "\"{}\"", s),
            FieldValue::Expression(s) => write!(f, "{}", s),
            FieldValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A node in a category tree: either a leaf value or a group of nested fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigNode {
    /// A field value
    Value(FieldValue),
    /// Nested fields from a dotted key
    Group(BTreeMap<String, ConfigNode>),
}

/// Fields of one category, keyed by the first segment of the field key
pub type Category = BTreeMap<String, ConfigNode>;

/// Write `value` at a dotted `path` inside `category`, creating groups as needed.
///
/// A leaf sitting where a group is required is replaced (last write wins).
pub fn insert_path(category: &mut Category, path: &str, value: FieldValue) {
    let mut parts = path.split('.').peekable();
    let mut current = category;

    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), ConfigNode::Value(value));
            return;
        }

        let node = current
            .entry(part.to_string())
            .or_insert_with(|| ConfigNode::Group(BTreeMap::new()));
        if let ConfigNode::Value(_) = node {
            *node = ConfigNode::Group(BTreeMap::new());
        }
        current = match node {
            ConfigNode::Group(children) => children,
            ConfigNode::Value(_) => return,
        };
    }
}

/// Look up the leaf value at a dotted `path`
pub fn get_path<'a>(category: &'a Category, path: &str) -> Option<&'a FieldValue> {
    let mut parts = path.split('.');
    let mut node = category.get(parts.next()?)?;
    for part in parts {
        node = match node {
            ConfigNode::Group(children) => children.get(part)?,
            ConfigNode::Value(_) => return None,
        };
    }
    match node {
        ConfigNode::Value(v) => Some(v),
        ConfigNode::Group(_) => None,
    }
}

/// Recursively merge `source` into `target`; leaves in `source` win
pub fn deep_merge(target: &mut Category, source: Category) {
    for (key, node) in source {
        if let ConfigNode::Group(incoming) = node {
            if let Some(ConfigNode::Group(existing)) = target.get_mut(&key) {
                deep_merge(existing, incoming);
            } else {
                target.insert(key, ConfigNode::Group(incoming));
            }
        } else {
            target.insert(key, node);
        }
    }
}

/// Count leaf values in a category tree
pub fn count_leaves(category: &Category) -> usize {
    category
        .values()
        .map(|node| match node {
            ConfigNode::Value(_) => 1,
            ConfigNode::Group(children) => count_leaves(children),
        })
        .sum()
}
