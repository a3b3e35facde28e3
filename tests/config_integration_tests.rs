//! Integration tests for ConfigManager and settings layering
//!
//! These tests verify:
//! - Defaults are used when Bartender.yaml is missing
//! - A partial settings file overrides only the keys it names
//! - Environment variables override the file
//! - Saved settings round-trip through the YAML file

use bartender::config::SETTINGS_FILE_NAME;
use bartender::{ConfigManager, Settings};
use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

fn test_manager(config_path: &Utf8PathBuf, env_prefix: &str) -> ConfigManager {
    ConfigManager::new(config_path)
        .unwrap()
        .with_env_prefix(env_prefix)
        .with_defaults(Settings::from_home(config_path))
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.settings_path(), config_path.join(SETTINGS_FILE_NAME));
}

#[test]
fn test_config_dir_is_created() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("a").join("bartender");

    ConfigManager::new(&nested).unwrap();

    assert!(nested.is_dir());
}

#[test]
fn test_load_defaults_without_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = test_manager(&config_path, "BARTENDER_IT_DEFAULTS");

    let settings = manager.load_settings().unwrap();

    assert_eq!(settings, Settings::from_home(&config_path));
    assert!(!settings.debug_mode);
}

#[test]
fn test_partial_file_overrides_named_keys() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(SETTINGS_FILE_NAME),
        "overlay_dir: /srv/sober/overlay\ndebug_mode: true\n",
    )
    .unwrap();
    let manager = test_manager(&config_path, "BARTENDER_IT_PARTIAL");

    let settings = manager.load_settings().unwrap();
    let defaults = Settings::from_home(&config_path);

    assert_eq!(settings.overlay_dir, "/srv/sober/overlay");
    assert!(settings.debug_mode);
    assert_eq!(settings.mods_dir, defaults.mods_dir);
    assert_eq!(settings.flags_config_path, defaults.flags_config_path);
}

#[test]
fn test_environment_overrides_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(SETTINGS_FILE_NAME),
        "mods_dir: /from/file\n",
    )
    .unwrap();

    // Unique prefix so parallel tests never observe this variable
    // SAFETY: no other test reads or writes variables with this prefix
    unsafe {
        std::env::set_var("BARTENDER_IT_ENVOVERRIDE_MODS_DIR", "/from/env");
    }

    let manager = test_manager(&config_path, "BARTENDER_IT_ENVOVERRIDE");
    let settings = manager.load_settings().unwrap();

    assert_eq!(settings.mods_dir, "/from/env");
}

#[test]
fn test_invalid_yaml_is_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(config_path.join(SETTINGS_FILE_NAME), "mods_dir: [unclosed\n").unwrap();
    let manager = test_manager(&config_path, "BARTENDER_IT_INVALID");

    assert!(manager.load_settings().is_err());
}

#[test]
fn test_save_and_load_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = test_manager(&config_path, "BARTENDER_IT_SAVE");

    let mut settings = manager.load_settings().unwrap();
    settings.base_assets_dir = Utf8PathBuf::from("/opt/sober/assets");
    manager.save_settings(&settings).unwrap();

    let contents = fs::read_to_string(manager.settings_path()).unwrap();
    assert!(contents.contains("base_assets_dir: /opt/sober/assets"));

    let loaded = manager.load_settings().unwrap();
    assert_eq!(loaded, settings);
}
