//! Integration tests for FlagRepository
//!
//! These tests verify:
//! - A load/save cycle reproduces an equivalent config.json
//! - Type-aware edits and their failure modes
//! - Search results against a brute-force filter (property tests)
//! - Import, merge and export through flat JSON files

use bartender::services::{FLAGS_SECTION, FlagError, FlagRepository};
use bartender::{FlagStatus, FlagValue};
use camino::Utf8PathBuf;
use proptest::prelude::*;
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

fn create_test_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, path)
}

fn read_json(path: &Utf8PathBuf) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_save_after_load_is_equivalent() {
    let (_temp_dir, root) = create_test_dir();
    let config_path = root.join("config.json");
    let original = json!({
        "bring_back_oof": true,
        "fflags": {
            "FFlagDebugDisplayFPS": true,
            "DFIntTaskSchedulerTargetFps": 144,
            "FFlagHandleAltEnterFullscreenManually": "False",
            "FIntRenderShadowIntensity": 0,
            "DFFlagTextureQualityOverrideEnabled": 0.5
        },
        "use_opengl": false
    });
    fs::write(&config_path, serde_json::to_string(&original).unwrap()).unwrap();

    let mut repository = FlagRepository::new(&config_path);
    assert_eq!(repository.load().unwrap(), 5);
    repository.save().unwrap();

    assert_eq!(read_json(&config_path), original);
    assert_eq!(repository.status(), FlagStatus::Saved);
}

#[test]
fn test_edit_survives_reload() {
    let (_temp_dir, root) = create_test_dir();
    let config_path = root.join("config.json");
    fs::write(
        &config_path,
        r#"{"fflags": {"DFIntTaskSchedulerTargetFps": 60}, "discord_rpc_enabled": true}"#,
    )
    .unwrap();

    let mut repository = FlagRepository::new(&config_path);
    repository.load().unwrap();
    repository.set_value("DFIntTaskSchedulerTargetFps", "240").unwrap();
    repository.set_value("FFlagDebugGraphicsPreferVulkan", "TRUE").unwrap();
    repository.save().unwrap();

    let mut reloaded = FlagRepository::new(&config_path);
    reloaded.load().unwrap();
    assert_eq!(
        reloaded.get("DFIntTaskSchedulerTargetFps"),
        Some(&FlagValue::Int(240))
    );
    assert_eq!(
        reloaded.get("FFlagDebugGraphicsPreferVulkan"),
        Some(&FlagValue::Bool(true))
    );
    assert_eq!(read_json(&config_path)["discord_rpc_enabled"], json!(true));
}

#[test]
fn test_missing_flags_section_is_empty() {
    let (_temp_dir, root) = create_test_dir();
    let config_path = root.join("config.json");
    fs::write(&config_path, r#"{"use_opengl": true}"#).unwrap();

    let mut repository = FlagRepository::new(&config_path);
    assert_eq!(repository.load().unwrap(), 0);

    repository.set_value("FFlagFoo", "true").unwrap();
    repository.save().unwrap();

    let saved = read_json(&config_path);
    assert_eq!(saved["use_opengl"], json!(true));
    assert_eq!(saved[FLAGS_SECTION]["FFlagFoo"], json!(true));
}

#[test]
fn test_integer_limits_survive_load_and_save() {
    let (_temp_dir, root) = create_test_dir();
    let config_path = root.join("config.json");
    let original = json!({
        "fflags": {
            "DFIntMax": i64::MAX,
            "DFIntMin": i64::MIN
        }
    });
    fs::write(&config_path, serde_json::to_string(&original).unwrap()).unwrap();

    let mut repository = FlagRepository::new(&config_path);
    repository.load().unwrap();
    repository.save().unwrap();

    assert_eq!(repository.get("DFIntMax"), Some(&FlagValue::Int(i64::MAX)));
    assert_eq!(read_json(&config_path), original);
}

#[test]
fn test_integer_above_i64_is_rejected_not_retyped() {
    let (_temp_dir, root) = create_test_dir();
    let config_path = root.join("config.json");
    let contents = r#"{"fflags": {"DFIntBig": 18446744073709551615}}"#;
    fs::write(&config_path, contents).unwrap();

    let mut repository = FlagRepository::new(&config_path);
    let err = repository.load().unwrap_err();

    assert!(matches!(err, FlagError::Parse { .. }));
    assert!(err.to_string().contains("DFIntBig"));
    assert!(repository.get("DFIntBig").is_none());
    assert_eq!(fs::read_to_string(&config_path).unwrap(), contents);
}

#[test]
fn test_save_without_load_keeps_sober_settings() {
    let (_temp_dir, root) = create_test_dir();
    let config_path = root.join("config.json");
    fs::write(
        &config_path,
        r#"{"use_opengl": true, "fflags": {"FFlagA": true}}"#,
    )
    .unwrap();

    let mut repository = FlagRepository::new(&config_path);
    repository.set_value("FFlagB", "1").unwrap();
    repository.save().unwrap();

    let saved = read_json(&config_path);
    assert_eq!(saved["use_opengl"], json!(true));
    // Unloaded flags are replaced by the in-memory mapping
    assert_eq!(saved[FLAGS_SECTION], json!({"FFlagB": 1}));
}

#[test]
fn test_import_then_save_without_load_keeps_sober_settings() {
    let (_temp_dir, root) = create_test_dir();
    let config_path = root.join("config.json");
    let import_path = root.join("preset.json");
    fs::write(&config_path, r#"{"discord_rpc_enabled": false}"#).unwrap();
    fs::write(&import_path, r#"{"FIntRenderShadowIntensity": 0}"#).unwrap();

    let mut repository = FlagRepository::new(&config_path);
    repository.import_from(&import_path).unwrap();
    repository.save().unwrap();

    assert_eq!(
        read_json(&config_path),
        json!({
            "discord_rpc_enabled": false,
            "fflags": {"FIntRenderShadowIntensity": 0}
        })
    );
}

#[test]
fn test_malformed_json_is_parse_error() {
    let (_temp_dir, root) = create_test_dir();
    let config_path = root.join("config.json");
    fs::write(&config_path, "{\"fflags\": {").unwrap();

    let mut repository = FlagRepository::new(&config_path);
    let err = repository.load().unwrap_err();

    assert!(matches!(err, FlagError::Parse { .. }));
    assert_eq!(repository.status(), FlagStatus::Unloaded);
}

#[test]
fn test_import_replaces_and_merge_extends() {
    let (_temp_dir, root) = create_test_dir();
    let import_path = root.join("preset.json");
    fs::write(&import_path, r#"{"FFlagA": true, "FIntB": 3}"#).unwrap();

    let mut repository = FlagRepository::new(root.join("config.json"));
    repository.load().unwrap();
    repository.set_value("FFlagOld", "false").unwrap();

    repository.merge_from(&import_path).unwrap();
    assert_eq!(repository.len(), 3);

    repository.import_from(&import_path).unwrap();
    assert_eq!(repository.len(), 2);
    assert!(repository.get("FFlagOld").is_none());
    assert_eq!(repository.status(), FlagStatus::Modified);
}

#[test]
fn test_failed_import_keeps_current_flags() {
    let (_temp_dir, root) = create_test_dir();
    let import_path = root.join("broken.json");
    fs::write(&import_path, r#"{"FFlagA": [1, 2]}"#).unwrap();

    let mut repository = FlagRepository::new(root.join("config.json"));
    repository.set_value("FFlagKeep", "true").unwrap();

    assert!(matches!(
        repository.import_from(&import_path),
        Err(FlagError::Parse { .. })
    ));
    assert_eq!(repository.get("FFlagKeep"), Some(&FlagValue::Bool(true)));
}

#[test]
fn test_export_then_import() {
    let (_temp_dir, root) = create_test_dir();
    let export_path = root.join("export.json");

    let mut source = FlagRepository::new(root.join("a.json"));
    source.set_value("FFlagDebugDisplayFPS", "true").unwrap();
    source.set_value("FIntFRMMinGrassDistance", "0").unwrap();
    source.set_value("FStringPartTexturePackTable", "{}").unwrap();
    source.export_to(&export_path).unwrap();

    let mut target = FlagRepository::new(root.join("b.json"));
    target.import_from(&export_path).unwrap();

    assert_eq!(target.flags(), source.flags());
}

#[test]
fn test_export_is_flat_object() {
    let (_temp_dir, root) = create_test_dir();
    let export_path = root.join("export.json");

    let mut repository = FlagRepository::new(root.join("config.json"));
    repository.set_value("DFIntTaskSchedulerTargetFps", "144").unwrap();
    repository.export_to(&export_path).unwrap();

    assert_eq!(
        read_json(&export_path),
        json!({"DFIntTaskSchedulerTargetFps": 144})
    );
}

proptest! {
    #[test]
    fn prop_int_flags_accept_any_integer(n in any::<i64>()) {
        let mut repository = FlagRepository::new("unused.json");
        repository.set_value("FIntValue", "0").unwrap();

        let value = repository.set_value("FIntValue", &n.to_string()).unwrap();
        prop_assert_eq!(value, FlagValue::Int(n));
    }

    #[test]
    fn prop_int_flags_reject_words(word in "[a-zA-Z]{1,12}") {
        let mut repository = FlagRepository::new("unused.json");
        repository.set_value("FIntValue", "7").unwrap();

        let result = repository.set_value("FIntValue", &word);
        prop_assert!(
            matches!(result, Err(FlagError::TypeCoercion { .. })),
            "expected a coercion error"
        );
        prop_assert_eq!(repository.get("FIntValue"), Some(&FlagValue::Int(7)));
    }

    #[test]
    fn prop_search_matches_brute_force(
        keys in prop::collection::btree_set("[A-Za-z]{1,10}", 0..20),
        term in "[A-Za-z]{0,3}",
    ) {
        let mut repository = FlagRepository::new("unused.json");
        for key in &keys {
            repository.set_value(key, "1").unwrap();
        }

        let search = repository.search(&term);
        let found: Vec<&str> = search.iter().collect();
        let expected: Vec<&str> = keys
            .iter()
            .map(String::as_str)
            .filter(|key| key.to_lowercase().contains(&term.to_lowercase()))
            .collect();

        prop_assert_eq!(&found, &expected);
        // A second pass yields the same keys
        prop_assert_eq!(search.iter().count(), found.len());
    }
}
