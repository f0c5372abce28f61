//! Diagnostics produced while parsing
//!
//! Two streams come out of every parse:
//! - `warnings`: user-facing findings (validation failures, malformed input)
//! - `_debugLog`: an ordered trace of what the engine decided and why

use serde::{Deserialize, Serialize};

/// Severity of a user-facing warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    /// Informational note
    Info,
    /// Worth checking, not necessarily wrong
    #[serde(alias = "warn")]
    Warning,
    /// A setting that should be fixed
    #[default]
    Error,
}

/// A user-facing warning record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Severity
    pub level: WarningLevel,
    /// Human-readable description
    pub message: String,
    /// `category.fieldKey` the warning refers to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Warning {
    /// A warning not tied to a field
    pub fn new(level: WarningLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            field: None,
        }
    }

    /// Attach the `category.fieldKey` the warning refers to
    pub fn for_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Category of a debug log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebugKind {
    /// General progress note
    Info,
    /// A `#define` seen in an active region (verbose)
    DefineFound,
    /// An `#undef` removed an identifier
    Undefined,
    /// An active define no field maps from (verbose)
    NotInMapping,
    /// A define matched a field
    MappingMatch,
    /// A define was skipped by a conditional or a field gate
    ConditionalSkip,
    /// A value was written to the result
    Extracted,
    /// A directive other than `#define` (verbose)
    Directive,
    /// An `#if` expression could not be evaluated
    ExpressionError,
    /// A value did not fit its declared type
    CoercionFallback,
    /// A missing field was filled from its default
    DefaultApplied,
    /// Stray or unterminated conditional directive
    Malformed,
    /// Closing counts for a parse
    Summary,
}

impl DebugKind {
    /// Kinds that are only recorded when verbose logging is enabled
    fn is_verbose(self) -> bool {
        matches!(
            self,
            DebugKind::DefineFound | DebugKind::NotInMapping | DebugKind::Directive
        )
    }
}

/// One entry of the ordered debug log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugEntry {
    /// What happened
    pub kind: DebugKind,
    /// Details
    pub message: String,
    /// Source file, if the entry belongs to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based source line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// Collects debug entries for a single source file
#[derive(Debug, Clone, Default)]
pub struct DebugLog {
    entries: Vec<DebugEntry>,
    file: Option<String>,
    verbose: bool,
}

impl DebugLog {
    /// An empty log for `file`; `verbose` keeps the verbose-only kinds
    pub fn new(file: Option<&str>, verbose: bool) -> Self {
        Self {
            entries: Vec::new(),
            file: file.map(str::to_string),
            verbose,
        }
    }

    /// Record an entry. Verbose-only kinds are dropped unless enabled.
    pub fn push(&mut self, kind: DebugKind, line: Option<usize>, message: impl Into<String>) {
        if kind.is_verbose() && !self.verbose {
            return;
        }
        let message = message.into();
        tracing::debug!(kind = ?kind, line = ?line, file = ?self.file, "{}", message);
        self.entries.push(DebugEntry {
            kind,
            message,
            file: self.file.clone(),
            line,
        });
    }

    /// Entries recorded so far
    pub fn entries(&self) -> &[DebugEntry] {
        &self.entries
    }

    /// Consume the log
    pub fn into_entries(self) -> Vec<DebugEntry> {
        self.entries
    }
}
