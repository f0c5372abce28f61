//! Define registry
//!
//! Tracks which identifiers are currently defined and the raw text of their
//! values. Only defines reached in an active region are registered.

use std::collections::{HashMap, HashSet};

/// Active identifiers and their raw right-hand sides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefineRegistry {
    defined: HashSet<String>,
    values: HashMap<String, String>,
}

impl DefineRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with `NAME` / `NAME=VALUE` entries
    pub fn with_predefined<S: AsRef<str>>(entries: &[S]) -> Self {
        let mut registry = Self::new();
        registry.seed(entries);
        registry
    }

    /// Add `NAME` or `NAME=value` entries; invalid names are ignored
    pub fn seed<S: AsRef<str>>(&mut self, entries: &[S]) {
        for entry in entries {
            let entry = entry.as_ref().trim();
            let (name, value) = match entry.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim())),
                None => (entry, None),
            };
            if is_identifier(name) {
                self.define(name, value);
            } else {
                tracing::warn!("Ignoring predefined entry '{}': not an identifier", entry);
            }
        }
    }

    /// Register `name`. A bare define drops any value left by an earlier one.
    pub fn define(&mut self, name: &str, value: Option<&str>) {
        self.defined.insert(name.to_string());
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => {
                self.values.insert(name.to_string(), value.to_string());
            }
            None => {
                self.values.remove(name);
            }
        }
    }

    /// Remove `name`; returns whether it was defined
    pub fn undefine(&mut self, name: &str) -> bool {
        self.values.remove(name);
        self.defined.remove(name)
    }

    /// Whether `name` is defined
    pub fn is_defined(&self, name: &str) -> bool {
        self.defined.contains(name)
    }

    /// Raw text of a valued define
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Resolve a bare identifier one level; anything else is returned as is
    pub fn resolve<'a>(&'a self, token: &'a str) -> &'a str {
        if is_identifier(token) {
            self.value(token).unwrap_or(token)
        } else {
            token
        }
    }

    /// Add everything from `other`; its values win
    pub fn extend(&mut self, other: &DefineRegistry) {
        self.defined.extend(other.defined.iter().cloned());
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
        for name in &other.defined {
            if !other.values.contains_key(name) {
                self.values.remove(name);
            }
        }
    }

    /// Forget every define
    pub fn clear(&mut self) {
        self.defined.clear();
        self.values.clear();
    }

    /// Number of defined names
    pub fn len(&self) -> usize {
        self.defined.len()
    }

    /// Nothing is defined
    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }
}

/// C identifier: `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
