//! Multi-file result merging
//!
//! Firmware configuration is commonly split across a main header and
//! companion headers. Per-file results are merged in order: field values and
//! metadata from later files win, the debug log and warnings are
//! concatenated, and the source file lists are joined.

use crate::result::ParseResult;
use crate::value::deep_merge;

impl ParseResult {
    /// Merge `other` into `self`; `other` wins on field collisions
    pub fn merge(&mut self, other: ParseResult) {
        for (name, category) in other.categories {
            deep_merge(self.categories.entry(name).or_default(), category);
        }
        self.metadata.fields.extend(other.metadata.fields);
        self.metadata.files.extend(other.metadata.files);
        if other.metadata.parsed_at > self.metadata.parsed_at {
            self.metadata.parsed_at = other.metadata.parsed_at;
        }
        self.debug_log.extend(other.debug_log);
        self.warnings.extend(other.warnings);
    }
}

/// Merge per-file results in order
pub fn merge_results(results: impl IntoIterator<Item = ParseResult>) -> ParseResult {
    let mut results = results.into_iter();
    let Some(mut merged) = results.next() else {
        return ParseResult::default();
    };
    for result in results {
        merged.merge(result);
    }
    merged
}
