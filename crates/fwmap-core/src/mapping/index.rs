//! Reverse index from source identifier to field specifications
//!
//! `mapsFrom` entries come in three shapes:
//! - exact identifiers: `BLTOUCH`
//! - wildcards with `*`, anchored at both ends: `LCD_*` matches `LCD_LANGUAGE`
//!   but not `LCDS_LANGUAGE`
//! - indexed entries `NAME[i]` selecting element `i` of a `{ ... }` list
//!
//! Exact identifiers are looked up directly; wildcards are scanned in order.

use regex::Regex;
use std::collections::HashMap;

use super::{FieldSpec, MappingDocument};

/// A parsed `mapsFrom` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapsFromPattern {
    /// Entry as written in the mapping
    pub raw: String,
    /// Identifier (or wildcard pattern) with any index suffix removed
    pub base: String,
    /// Zero-based element index from a `[i]` suffix
    pub index: Option<usize>,
}

impl MapsFromPattern {
    /// Split an entry into its base and optional index
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (base, index) = split_index_suffix(raw);
        Self {
            raw: raw.to_string(),
            base: base.to_string(),
            index,
        }
    }

    /// The base contains `*`
    pub fn is_wildcard(&self) -> bool {
        self.base.contains('*')
    }

    /// Anchored regex equivalent of a wildcard base
    fn wildcard_regex(&self) -> Result<Regex, regex::Error> {
        let body = self
            .base
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        Regex::new(&format!("^{}$", body))
    }
}

/// Split `NAME[3]` into (`NAME`, Some(3)); anything else is returned whole
fn split_index_suffix(raw: &str) -> (&str, Option<usize>) {
    let Some(inner) = raw.strip_suffix(']') else {
        return (raw, None);
    };
    let Some(open) = inner.rfind('[') else {
        return (raw, None);
    };
    match inner[open + 1..].trim().parse::<usize>() {
        Ok(index) if open > 0 => (inner[..open].trim_end(), Some(index)),
        _ => (raw, None),
    }
}

/// One field reachable from an identifier
#[derive(Debug, Clone)]
pub struct IndexedField {
    /// Category the field lives in
    pub category: String,
    /// Possibly dotted key inside the category
    pub field_key: String,
    /// Rule the field was declared with
    pub spec: FieldSpec,
    /// The `mapsFrom` entry that matched
    pub pattern: MapsFromPattern,
}

impl IndexedField {
    /// `category.fieldKey`
    pub fn path(&self) -> String {
        format!("{}.{}", self.category, self.field_key)
    }
}

/// Reverse index built once per mapping and shared read-only across parses
#[derive(Debug, Clone, Default)]
pub struct DefineIndex {
    exact: HashMap<String, Vec<IndexedField>>,
    wildcards: Vec<(Regex, IndexedField)>,
}

impl DefineIndex {
    /// Index every `mapsFrom` entry of `mapping`
    pub fn build(mapping: &MappingDocument) -> Self {
        let mut index = DefineIndex::default();

        for (category, field_key, spec) in mapping.fields() {
            for entry in &spec.maps_from {
                let pattern = MapsFromPattern::parse(entry);
                if pattern.base.is_empty() {
                    continue;
                }
                let field = IndexedField {
                    category: category.to_string(),
                    field_key: field_key.to_string(),
                    spec: spec.clone(),
                    pattern,
                };

                if field.pattern.is_wildcard() {
                    match field.pattern.wildcard_regex() {
                        Ok(re) => index.wildcards.push((re, field)),
                        Err(e) => tracing::warn!(
                            "Ignoring wildcard '{}' for {}: {}",
                            field.pattern.raw,
                            field.path(),
                            e
                        ),
                    }
                } else {
                    index
                        .exact
                        .entry(field.pattern.base.clone())
                        .or_default()
                        .push(field);
                }
            }
        }

        tracing::info!(
            "Indexed {} identifiers and {} wildcard patterns",
            index.exact.len(),
            index.wildcards.len()
        );
        index
    }

    /// All fields an identifier maps to: exact entries first, then wildcards
    pub fn lookup(&self, name: &str) -> Vec<&IndexedField> {
        let mut found: Vec<&IndexedField> = self
            .exact
            .get(name)
            .map(|fields| fields.iter().collect())
            .unwrap_or_default();
        found.extend(
            self.wildcards
                .iter()
                .filter(|(re, _)| re.is_match(name))
                .map(|(_, field)| field),
        );
        found
    }

    /// Fields mapped from exactly `name` (no wildcard expansion)
    pub fn exact(&self, name: &str) -> &[IndexedField] {
        self.exact.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct exact identifiers
    pub fn identifier_count(&self) -> usize {
        self.exact.len()
    }

    /// Number of wildcard entries
    pub fn wildcard_count(&self) -> usize {
        self.wildcards.len()
    }

    /// Nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcards.is_empty()
    }
}
