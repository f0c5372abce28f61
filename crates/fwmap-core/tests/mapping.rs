//! Mapping documents: loading from disk and inline JSON, merge order,
//! index lookups and named mapping sets.

use fwmap_core::mapping::{DefineIndex, MappingLoader};
use fwmap_core::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_mapping(dir: &TempDir, name: &str, json: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, json).unwrap();
    path
}

const BASE: &str = r#"{
    "version": "1.0",
    "firmware": "Marlin",
    "basic": {
        "machineName": { "mapsFrom": "CUSTOM_MACHINE_NAME", "type": "string" },
        "baudRate": { "mapsFrom": "BAUDRATE", "type": "integer" }
    }
}"#;

const OVERRIDE: &str = r#"{
    "basic": {
        "machineName": { "mapsFrom": "USER_PRINTER_NAME", "type": "string", "uiFieldId": "printer-name" }
    },
    "lcd": {
        "language": { "mapsFrom": "LCD_*", "type": "string" }
    }
}"#;

#[tokio::test]
async fn test_later_document_overrides_field() {
    let dir = TempDir::new().unwrap();
    let base = write_mapping(&dir, "base.json", BASE);
    let extra = write_mapping(&dir, "extra.json", OVERRIDE);

    let mapping = MappingLoader::new()
        .load(&[MappingSource::from(base), MappingSource::from(extra)])
        .await
        .unwrap();

    assert_eq!(mapping.firmware.as_deref(), Some("Marlin"));
    assert_eq!(mapping.field_count(), 3);
    let name = mapping.field("basic", "machineName").unwrap();
    assert_eq!(name.maps_from, vec!["USER_PRINTER_NAME"]);
    assert_eq!(name.ui_field_id.as_deref(), Some("printer-name"));
    // Fields the later document does not mention survive
    assert!(mapping.field("basic", "baudRate").is_some());
}

#[tokio::test]
async fn test_overridden_identifier_no_longer_maps() {
    let dir = TempDir::new().unwrap();
    let sources = vec![
        MappingSource::from(write_mapping(&dir, "base.json", BASE)),
        MappingSource::from(write_mapping(&dir, "extra.json", OVERRIDE)),
    ];
    let parser = ConfigParser::load(&sources, ParserOptions::default())
        .await
        .unwrap();

    let result = parser.parse(
        "#define CUSTOM_MACHINE_NAME \"old\"\n#define USER_PRINTER_NAME \"new\"\n",
        "Configuration.h",
    );
    assert_eq!(
        result.get("basic", "machineName"),
        Some(&FieldValue::String("new".into()))
    );
    assert_eq!(
        result.field_metadata("basic", "machineName").unwrap().define_name,
        "USER_PRINTER_NAME"
    );
}

#[tokio::test]
async fn test_failed_document_is_skipped_when_others_load() {
    let dir = TempDir::new().unwrap();
    let base = write_mapping(&dir, "base.json", BASE);
    let broken = write_mapping(&dir, "broken.json", "{ not json");
    let missing = dir.path().join("missing.json");

    let mapping = MappingLoader::new()
        .load(&[
            MappingSource::from(base),
            MappingSource::from(broken),
            MappingSource::from(missing),
        ])
        .await
        .unwrap();
    assert_eq!(mapping.field_count(), 2);
}

#[tokio::test]
async fn test_load_errors() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");

    let single = MappingLoader::new()
        .load(&[MappingSource::from(missing.clone())])
        .await
        .unwrap_err();
    assert!(matches!(single, MappingLoadError::Io { .. }));

    let broken = write_mapping(&dir, "broken.json", "[1, 2, 3]");
    let several = MappingLoader::new()
        .load(&[MappingSource::from(missing), MappingSource::from(broken)])
        .await
        .unwrap_err();
    assert!(matches!(several, MappingLoadError::NoDocuments));

    let parse_err = ConfigParser::load(&[], ParserOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        parse_err,
        ParseError::Mapping(MappingLoadError::NoDocuments)
    ));
}

#[tokio::test]
async fn test_inline_source() {
    let source = MappingSource::parse(BASE);
    assert!(matches!(source, MappingSource::Inline { .. }));
    let mapping = MappingLoader::new().load_one(&source).await.unwrap();
    assert_eq!(mapping.field_count(), 2);
}

#[test]
fn test_wildcard_is_anchored() {
    let mapping: MappingDocument = OVERRIDE.parse().unwrap();
    let index = DefineIndex::build(&mapping);

    let hits = index.lookup("LCD_LANGUAGE");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path(), "lcd.language");
    assert!(index.lookup("LCDS_LANGUAGE").is_empty());
    assert!(index.lookup("MY_LCD_LANGUAGE").is_empty());
    assert_eq!(index.wildcard_count(), 1);
}

#[test]
fn test_one_identifier_feeds_several_fields() {
    let mapping: MappingDocument = r#"{
        "probe": {
            "enabled": { "mapsFrom": "BLTOUCH", "type": "boolean" },
            "kind": { "mapsFrom": ["FIX_MOUNTED_PROBE", "BLTOUCH"], "type": "string" }
        }
    }"#
    .parse()
    .unwrap();
    let parser = ConfigParser::new(mapping);
    let result = parser.parse("#define BLTOUCH\n", "Configuration.h");

    assert_eq!(result.get("probe", "enabled"), Some(&FieldValue::Boolean(true)));
    assert_eq!(
        result.get("probe", "kind"),
        Some(&FieldValue::String("enabled".into()))
    );
}

#[test]
fn test_metadata_keys_are_not_categories() {
    let mapping: MappingDocument = r#"{
        "$schema": "https://example.com/schema.json",
        "version": 2,
        "description": "demo",
        "_comment": { "x": { "mapsFrom": "X" } },
        "categories": {
            "basic": { "name": { "mapsFrom": "NAME" } }
        }
    }"#
    .parse()
    .unwrap();
    assert_eq!(mapping.categories.keys().collect::<Vec<_>>(), vec!["basic"]);
    assert_eq!(mapping.schema_version.as_deref(), Some("2"));
}

#[tokio::test]
async fn test_mapping_set_from_sets_file() {
    let dir = TempDir::new().unwrap();
    write_mapping(&dir, "core.json", BASE);
    let sets_json = format!(
        r#"{{ "mine": {{ "name": "My fork", "basePath": "{}/", "files": ["core.json"] }} }}"#,
        dir.path().display()
    );
    let sets_path = write_mapping(&dir, "sets.json", &sets_json);

    let sets = MappingSets::from_file(&sets_path).unwrap();
    let parser = ConfigParser::for_mapping_set("mine", &sets, ParserOptions::default())
        .await
        .unwrap();
    assert_eq!(parser.mapping().field_count(), 2);

    let err = ConfigParser::for_mapping_set("klipper", &sets, ParserOptions::default())
        .await
        .unwrap_err();
    match err {
        ParseError::Mapping(MappingLoadError::UnknownMappingSet { name, available }) => {
            assert_eq!(name, "klipper");
            assert!(available.contains("mine"));
            assert!(available.contains("th3d"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
