//! Integration tests for configuration loading
//!
//! Covers the settings file round trip, environment layering, and feeding the
//! loaded settings into a controller.

use camino::Utf8PathBuf;
use forbidden_finder::config::SETTINGS_FILE;
use forbidden_finder::{ConfigManager, ScanController, ScanSettings};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp_dir.path().join("Forbidden Finder Data")).unwrap();
    (temp_dir, dir)
}

#[test]
fn test_config_directory_creation() {
    let (_temp_dir, dir) = config_dir();
    assert!(!dir.exists());

    let manager = ConfigManager::new(&dir).unwrap();

    assert!(dir.exists());
    assert_eq!(manager.settings_path(), dir.join(SETTINGS_FILE));
}

#[test]
fn test_default_settings_file_round_trip() {
    let (_temp_dir, dir) = config_dir();
    let manager = ConfigManager::new(&dir).unwrap();

    manager.ensure_settings_file().unwrap();
    let yaml = fs::read_to_string(manager.settings_path()).unwrap();
    assert!(yaml.contains("output_dir: forbidden_output"));
    assert!(yaml.contains("top_words: 10"));

    let loaded = manager
        .load_settings_with_env(config::Map::new())
        .unwrap();
    assert_eq!(loaded, ScanSettings::default());
}

#[test]
fn test_env_layer_beats_file_layer() {
    let (_temp_dir, dir) = config_dir();
    let manager = ConfigManager::new(&dir).unwrap();
    fs::write(
        manager.settings_path(),
        "max_concurrent_files: 8\ndrain_timeout_ms: 100\n",
    )
    .unwrap();

    let mut env = config::Map::new();
    env.insert(
        "FORBIDDEN_FINDER_MAX_CONCURRENT_FILES".to_string(),
        "2".to_string(),
    );

    let settings = manager.load_settings_with_env(env).unwrap();

    assert_eq!(settings.max_concurrent_files, Some(2));
    assert_eq!(settings.drain_timeout_ms, 100);
    assert_eq!(settings.concurrency_limit(), 2);
}

#[test]
fn test_loaded_settings_drive_controller() {
    let (_temp_dir, dir) = config_dir();
    let manager = ConfigManager::new(&dir).unwrap();
    fs::write(manager.settings_path(), "top_words: 3\nmax_concurrent_files: 0\n").unwrap();

    let settings = manager
        .load_settings_with_env(config::Map::new())
        .unwrap();
    let controller = Arc::new(ScanController::new(settings));

    assert_eq!(controller.settings().top_words, 3);
    // Zero is clamped, a run always has at least one worker
    assert_eq!(controller.settings().concurrency_limit(), 1);
}

#[test]
fn test_invalid_yaml_handling() {
    let (_temp_dir, dir) = config_dir();
    let manager = ConfigManager::new(&dir).unwrap();
    fs::write(manager.settings_path(), "top_words: [unclosed\n").unwrap();

    assert!(manager.load_settings_with_env(config::Map::new()).is_err());
}
