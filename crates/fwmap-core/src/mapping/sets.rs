//! Named mapping sets
//!
//! A mapping set names a firmware variant and the mapping documents that
//! describe it. Built-in sets cover TH3D and upstream Marlin; more can be
//! loaded from a JSON file shaped like:
//!
//! ```json
//! { "mine": { "name": "My fork", "basePath": "maps/mine/", "files": ["core.json"] } }
//! ```
//!
//! The built-in documents are compiled into the crate and addressed with the
//! `bundled:` base path, so they load from any working directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::{MappingLoadError, MappingSource};

/// Base path prefix for documents compiled into the crate
const BUNDLED_PREFIX: &str = "bundled:";

/// Mapping documents shipped with the crate, keyed by `<set>/<file>`
const BUNDLED: &[(&str, &str)] = &[
    (
        "th3d/th3d-config-mapping.json",
        include_str!("../../../../assets/data/maps/th3d/th3d-config-mapping.json"),
    ),
    (
        "th3d/th3d-config-adv-mapping.json",
        include_str!("../../../../assets/data/maps/th3d/th3d-config-adv-mapping.json"),
    ),
    (
        "marlin/marlin-config-mapping.json",
        include_str!("../../../../assets/data/maps/marlin/marlin-config-mapping.json"),
    ),
    (
        "marlin/marlin-config-adv-mapping.json",
        include_str!("../../../../assets/data/maps/marlin/marlin-config-adv-mapping.json"),
    ),
];

/// Contents of a bundled document, if `key` names one
fn bundled_document(key: &str) -> Option<&'static str> {
    BUNDLED
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, json)| *json)
}

/// A firmware variant and the documents that map it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSet {
    /// Display name
    pub name: String,
    /// Prefix joined to every file: a directory, a URL or `bundled:<set>/`
    #[serde(default)]
    pub base_path: String,
    /// Documents in load order; later ones override earlier ones
    #[serde(default)]
    pub files: Vec<String>,
}

impl MappingSet {
    /// Build a set from its display name, base path and file list
    pub fn new(name: &str, base_path: &str, files: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            base_path: base_path.to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Mapping sources in load order (`basePath` + file).
    ///
    /// A `bundled:` location that names no shipped document becomes a path,
    /// which then fails to load and is reported like any missing file.
    pub fn sources(&self) -> Vec<MappingSource> {
        self.files
            .iter()
            .map(|file| {
                let location = format!("{}{}", self.base_path, file);
                match location.strip_prefix(BUNDLED_PREFIX) {
                    Some(key) => match bundled_document(key) {
                        Some(json) => MappingSource::inline(location.clone(), json),
                        None => MappingSource::Path(location.clone().into()),
                    },
                    None => MappingSource::parse(&location),
                }
            })
            .collect()
    }
}

/// Registry of mapping sets keyed by short id (`th3d`, `marlin`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingSets {
    sets: BTreeMap<String, MappingSet>,
}

impl Default for MappingSets {
    fn default() -> Self {
        let mut sets = BTreeMap::new();
        sets.insert(
            "th3d".to_string(),
            MappingSet::new(
                "TH3D Unified Firmware",
                "bundled:th3d/",
                &["th3d-config-mapping.json", "th3d-config-adv-mapping.json"],
            ),
        );
        sets.insert(
            "marlin".to_string(),
            MappingSet::new(
                "Marlin Firmware",
                "bundled:marlin/",
                &["marlin-config-mapping.json", "marlin-config-adv-mapping.json"],
            ),
        );
        sets.insert("custom".to_string(), MappingSet::new("Custom Mapping", "", &[]));
        MappingSets { sets }
    }
}

impl MappingSets {
    /// An empty registry without the built-ins
    pub fn empty() -> Self {
        MappingSets {
            sets: BTreeMap::new(),
        }
    }

    /// Built-ins overlaid with the sets declared in a JSON file
    pub fn from_file(path: &Path) -> Result<Self, MappingLoadError> {
        let location = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| MappingLoadError::Io {
            location: location.clone(),
            message: e.to_string(),
        })?;
        let extra: MappingSets = serde_json::from_str(&text).map_err(|e| MappingLoadError::Json {
            location,
            message: e.to_string(),
        })?;

        let mut sets = MappingSets::default();
        sets.sets.extend(extra.sets);
        Ok(sets)
    }

    /// Look up a set by id
    pub fn get(&self, id: &str) -> Result<&MappingSet, MappingLoadError> {
        self.sets
            .get(id)
            .ok_or_else(|| MappingLoadError::UnknownMappingSet {
                name: id.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Add or replace a set
    pub fn insert(&mut self, id: impl Into<String>, set: MappingSet) {
        self.sets.insert(id.into(), set);
    }

    /// Set ids in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.sets.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_sets() {
        let sets = MappingSets::default();
        assert_eq!(sets.names(), vec!["custom", "marlin", "th3d"]);

        let th3d = sets.get("th3d").unwrap();
        let sources = th3d.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].location(), "bundled:th3d/th3d-config-mapping.json");
        assert!(matches!(&sources[0], MappingSource::Inline { json, .. } if json.contains("mapsFrom")));
        assert!(sets.get("custom").unwrap().sources().is_empty());
    }

    #[test]
    fn test_unknown_bundled_document_is_a_path() {
        let set = MappingSet::new("Broken", "bundled:klipper/", &["printer.json"]);
        assert_eq!(
            set.sources(),
            vec![MappingSource::Path("bundled:klipper/printer.json".into())]
        );
    }

    #[test]
    fn test_unknown_set() {
        let err = MappingSets::default().get("klipper").unwrap_err();
        match err {
            MappingLoadError::UnknownMappingSet { name, available } => {
                assert_eq!(name, "klipper");
                assert!(available.contains("marlin"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_sets_from_file_extend_builtins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "mine": {{ "name": "Mine", "basePath": "https://maps.example/", "files": ["a.json"] }} }}"#
        )
        .unwrap();

        let sets = MappingSets::from_file(file.path()).unwrap();
        assert!(sets.get("th3d").is_ok());
        let mine = sets.get("mine").unwrap();
        assert_eq!(
            mine.sources(),
            vec![MappingSource::Url("https://maps.example/a.json".into())]
        );
    }
}
