//! # fwmap Core Library
//!
//! Mapping-driven extraction of firmware configuration headers.
//!
//! This library provides:
//! - Loading and merging declarative mapping documents (file, URL or inline JSON)
//! - A miniature C preprocessor: `#define`/`#undef`, `#if`/`#ifdef`/`#ifndef`/
//!   `#elif`/`#else`/`#endif`, Marlin-style predicates (`ENABLED`, `ANY`, ...)
//! - Typed value extraction (strings, integers, floats, booleans, `{ ... }` lists)
//! - Define-to-field mapping with wildcards, array indices and conditional gates
//! - Multi-file merging, mapping defaults and validation
//!
//! ## Supported firmware
//!
//! - TH3D Unified Firmware
//! - Marlin
//! - Anything else a mapping document describes
//!
//! ## Example
//!
//! ```rust,ignore
//! use fwmap_core::prelude::*;
//!
//! let parser = ConfigParser::for_mapping_set("marlin", &MappingSets::default(), ParserOptions::default()).await?;
//! let result = parser
//!     .parse_paths(&["Configuration.h".into(), "Configuration_adv.h".into()])
//!     .await?;
//!
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod mapper;
pub mod mapping;
pub mod merge;
pub mod options;
pub mod parser;
pub mod preprocessor;
pub mod result;
pub mod validation;
pub mod value;

pub use error::ParseError;
pub use parser::ConfigParser;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::diagnostics::{DebugEntry, DebugKind, Warning, WarningLevel};
    pub use crate::error::ParseError;
    pub use crate::mapping::{
        FieldSpec, FieldType, MappingDocument, MappingLoadError, MappingSet, MappingSets,
        MappingSource,
    };
    pub use crate::merge::merge_results;
    pub use crate::options::ParserOptions;
    pub use crate::parser::ConfigParser;
    pub use crate::preprocessor::DefineRegistry;
    pub use crate::result::{FieldMetadata, ParseResult};
    pub use crate::value::{ConfigNode, FieldValue};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
