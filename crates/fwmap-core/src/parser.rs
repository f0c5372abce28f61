//! Configuration parser
//!
//! A [`ConfigParser`] owns one merged mapping and the index built from it.
//! Every call to [`ConfigParser::parse`] or [`ConfigParser::parse_multiple`]
//! starts from fresh per-parse state, so the same instance gives the same
//! result for the same input and can be reused freely.
//!
//! Per file:
//! 1. block comments are stripped and lines classified
//! 2. the preprocessor gates lines and maintains the define registry
//! 3. each active `#define` is looked up in the index and mapped
//!
//! After all files: results are merged, then the defaults and validation
//! passes run once over the merged result.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::defaults::apply_defaults;
use crate::diagnostics::{DebugKind, DebugLog};
use crate::error::ParseError;
use crate::mapper::FieldMapper;
use crate::mapping::{DefineIndex, MappingDocument, MappingLoader, MappingSets, MappingSource};
use crate::merge::merge_results;
use crate::options::ParserOptions;
use crate::preprocessor::{strip_block_comments, DefineRegistry, LineClassifier, Preprocessor};
use crate::result::ParseResult;
use crate::validation::validate;

/// Mapping-driven configuration parser
#[derive(Debug, Clone)]
pub struct ConfigParser {
    mapping: MappingDocument,
    index: DefineIndex,
    options: ParserOptions,
}

impl ConfigParser {
    /// A parser with default options
    pub fn new(mapping: MappingDocument) -> Self {
        Self::with_options(mapping, ParserOptions::default())
    }

    /// A parser with explicit options
    pub fn with_options(mapping: MappingDocument, options: ParserOptions) -> Self {
        let index = DefineIndex::build(&mapping);
        Self {
            mapping,
            index,
            options,
        }
    }

    /// Load and merge mapping documents, then build a parser over them
    pub async fn load(sources: &[MappingSource], options: ParserOptions) -> Result<Self, ParseError> {
        let mapping = MappingLoader::new().load(sources).await?;
        Ok(Self::with_options(mapping, options))
    }

    /// Build a parser for a named mapping set (`th3d`, `marlin`, ...)
    pub async fn for_mapping_set(
        id: &str,
        sets: &MappingSets,
        options: ParserOptions,
    ) -> Result<Self, ParseError> {
        let set = sets.get(id)?;
        tracing::info!("Loading mapping set '{}' ({})", id, set.name);
        Self::load(&set.sources(), options).await
    }

    /// The merged mapping document
    pub fn mapping(&self) -> &MappingDocument {
        &self.mapping
    }

    /// Identifier index built from the mapping
    pub fn index(&self) -> &DefineIndex {
        &self.index
    }

    /// Options in effect
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse a single source file
    pub fn parse(&self, content: &str, file_name: &str) -> ParseResult {
        self.parse_multiple([(file_name, content)])
    }

    /// Parse related files in order (`(file name, content)` pairs) into one result
    pub fn parse_multiple<'s>(&self, files: impl IntoIterator<Item = (&'s str, &'s str)>) -> ParseResult {
        let share = self.options.share_defines_across_files;
        // Shared: the registry carried from file to file. Otherwise: the
        // union of every file's final registry, later files winning.
        let mut carried = if share {
            self.fresh_registry()
        } else {
            DefineRegistry::new()
        };

        let mut results = Vec::new();
        for (file_name, content) in files {
            let start = if share {
                std::mem::take(&mut carried)
            } else {
                self.fresh_registry()
            };
            let (result, registry) = self.parse_file(content, file_name, start);
            if share {
                carried = registry;
            } else {
                carried.extend(&registry);
            }
            results.push(result);
        }

        self.finalize(merge_results(results), &carried)
    }

    /// Read and parse one file from disk
    pub async fn parse_path(&self, path: &Path) -> Result<ParseResult, ParseError> {
        self.parse_paths(&[path.to_path_buf()]).await
    }

    /// Read and parse several files from disk, in order
    pub async fn parse_paths(&self, paths: &[PathBuf]) -> Result<ParseResult, ParseError> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| ParseError::Io(format!("{}: {}", path.display(), e)))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            sources.push((name, String::from_utf8_lossy(&bytes).into_owned()));
        }
        Ok(self.parse_multiple(
            sources
                .iter()
                .map(|(name, content)| (name.as_str(), content.as_str())),
        ))
    }

    fn fresh_registry(&self) -> DefineRegistry {
        DefineRegistry::with_predefined(&self.options.predefined)
    }

    fn parse_file(
        &self,
        content: &str,
        file_name: &str,
        registry: DefineRegistry,
    ) -> (ParseResult, DefineRegistry) {
        let mut result = ParseResult::new(file_name);
        let mut log = DebugLog::new(Some(file_name), self.options.verbose_debug_log);
        log.push(
            DebugKind::Info,
            None,
            format!(
                "Parsing {} against {} mapped fields",
                file_name,
                self.mapping.field_count()
            ),
        );

        let stripped = strip_block_comments(content);
        let mapper = FieldMapper::new(&self.index);
        let mut preprocessor = Preprocessor::new(registry, file_name);
        let mut lines = 0;
        let mut mapped = 0;

        for line in LineClassifier::new(&stripped) {
            lines += 1;
            if let Some(define) = preprocessor.process(&line, &mut log) {
                mapped += mapper.map_define(
                    define,
                    line.number,
                    preprocessor.registry(),
                    &mut result,
                    &mut log,
                );
            }
        }

        let (registry, warnings) = preprocessor.finish(&mut log);
        log.push(
            DebugKind::Info,
            None,
            format!(
                "{}: {} lines, {} defines active, {} field(s) written",
                file_name,
                lines,
                registry.len(),
                mapped
            ),
        );
        tracing::debug!("Parsed {}: {} field(s) written", file_name, mapped);

        result.warnings.extend(warnings);
        result.debug_log = log.into_entries();
        (result, registry)
    }

    fn finalize(&self, mut result: ParseResult, registry: &DefineRegistry) -> ParseResult {
        let mut log = DebugLog::new(None, self.options.verbose_debug_log);

        if self.options.apply_defaults {
            apply_defaults(&self.mapping, &self.index, registry, &mut result, &mut log);
        }
        if self.options.validate {
            let warnings = validate(&self.mapping, &result);
            result.warnings.extend(warnings);
        }

        let from_defaults = result
            .metadata
            .fields
            .values()
            .filter(|m| m.from_default)
            .count();
        let summary = format!(
            "Extracted {} field(s) ({} from defaults) from {} file(s) with {} warning(s)",
            result.field_count(),
            from_defaults,
            result.metadata.files.len(),
            result.warnings.len()
        );
        tracing::info!("{}", summary);
        log.push(DebugKind::Summary, None, summary);

        result.debug_log.extend(log.into_entries());
        result.metadata.parsed_at = Utc::now();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    const MAPPING: &str = r#"{
        "basic": {
            "baudRate": { "mapsFrom": "BAUDRATE", "type": "integer" },
            "machineName": { "mapsFrom": ["CUSTOM_MACHINE_NAME", "USER_PRINTER_NAME"], "type": "string" }
        }
    }"#;

    fn parser() -> ConfigParser {
        ConfigParser::new(MAPPING.parse().unwrap())
    }

    #[test]
    fn test_parse_basic() {
        let result = parser().parse(
            "#define BAUDRATE 250000\n#define CUSTOM_MACHINE_NAME \"Ender\" // name\n",
            "Configuration.h",
        );
        assert_eq!(result.get("basic", "baudRate"), Some(&FieldValue::Integer(250000)));
        assert_eq!(
            result.get("basic", "machineName"),
            Some(&FieldValue::String("Ender".into()))
        );
        assert_eq!(result.metadata.files, vec!["Configuration.h"]);
        assert_eq!(
            result.debug_log.last().map(|e| e.kind),
            Some(DebugKind::Summary)
        );
    }

    #[test]
    fn test_later_define_overwrites() {
        let result = parser().parse("#define BAUDRATE 115200\n#define BAUDRATE 250000\n", "c.h");
        assert_eq!(result.get("basic", "baudRate"), Some(&FieldValue::Integer(250000)));
        assert_eq!(result.field_metadata("basic", "baudRate").unwrap().line_number, Some(2));
    }

    #[test]
    fn test_predefined_identifiers_gate_blocks() {
        let options = ParserOptions {
            predefined: vec!["FAST_BOARD".into()],
            ..Default::default()
        };
        let parser = ConfigParser::with_options(MAPPING.parse().unwrap(), options);
        let result = parser.parse(
            "#ifdef FAST_BOARD\n#define BAUDRATE 250000\n#else\n#define BAUDRATE 115200\n#endif\n",
            "c.h",
        );
        assert_eq!(result.get("basic", "baudRate"), Some(&FieldValue::Integer(250000)));
    }
}
