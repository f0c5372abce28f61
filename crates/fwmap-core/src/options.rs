//! Parser options

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ParseError;

/// Behaviour switches for [`ConfigParser`](crate::ConfigParser)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserOptions {
    /// Keep one define registry across all files of a multi-file parse, so a
    /// later file sees defines from earlier ones
    #[serde(default)]
    pub share_defines_across_files: bool,

    /// Fill absent fields from mapping defaults
    #[serde(default = "default_true")]
    pub apply_defaults: bool,

    /// Run the validation pass
    #[serde(default = "default_true")]
    pub validate: bool,

    /// Record per-define and per-directive entries in the debug log
    #[serde(default)]
    pub verbose_debug_log: bool,

    /// `NAME` or `NAME=VALUE` entries seeded into every fresh registry
    #[serde(default)]
    pub predefined: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            share_defines_across_files: false,
            apply_defaults: default_true(),
            validate: default_true(),
            verbose_debug_log: false,
            predefined: Vec::new(),
        }
    }
}

impl ParserOptions {
    /// Load options from a JSON file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        let text = std::fs::read_to_string(path).map_err(|e| ParseError::Io(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ParseError::Options {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_uses_defaults() {
        let opts: ParserOptions =
            serde_json::from_str(r#"{"shareDefinesAcrossFiles": true, "predefined": ["EZBOARD"]}"#).unwrap();
        assert!(opts.share_defines_across_files);
        assert!(opts.apply_defaults);
        assert!(opts.validate);
        assert!(!opts.verbose_debug_log);
        assert_eq!(opts.predefined, vec!["EZBOARD"]);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"validate": false}}"#).unwrap();
        let opts = ParserOptions::from_file(file.path()).unwrap();
        assert!(!opts.validate);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, r#"{{"validate": "nope"}}"#).unwrap();
        assert!(matches!(
            ParserOptions::from_file(bad.path()),
            Err(ParseError::Options { .. })
        ));
    }
}
