//! Error types for configuration parsing

use thiserror::Error;

use crate::mapping::MappingLoadError;

/// Errors that stop a parse from starting.
///
/// Problems inside a source file never surface here; they are recorded in
/// the result's debug log and warnings instead.
#[derive(Error, Debug)]
pub enum ParseError {
    /// A source or options file could not be read
    #[error("I/O error: {0}")]
    Io(String),

    /// No usable mapping
    #[error(transparent)]
    Mapping(#[from] MappingLoadError),

    /// An options file is not valid JSON for [`crate::ParserOptions`]
    #[error("Invalid parser options in '{path}': {message}")]
    Options { path: String, message: String },
}
