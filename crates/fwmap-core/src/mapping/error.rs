//! Error types for mapping loading

use thiserror::Error;

/// Errors that can occur while loading mapping documents
#[derive(Error, Debug)]
pub enum MappingLoadError {
    /// A mapping file could not be read
    #[error("I/O error reading mapping '{location}': {message}")]
    Io { location: String, message: String },

    /// A mapping URL could not be fetched
    #[error("HTTP error fetching mapping '{location}': {message}")]
    Http { location: String, message: String },

    /// A document is not valid JSON
    #[error("Invalid JSON in mapping '{location}': {message}")]
    Json { location: String, message: String },

    /// Valid JSON that is not a mapping document
    #[error("Invalid mapping document '{location}': {message}")]
    InvalidDocument { location: String, message: String },

    /// Every source failed, or none was given
    #[error("No mapping documents could be loaded")]
    NoDocuments,

    /// No mapping set has the requested id
    #[error("Unknown mapping set '{name}'. Available: {available}")]
    UnknownMappingSet { name: String, available: String },
}
