use std::fs;
use std::time::Duration;

use procwatch::core::config::Config;
use procwatch::core::process_monitor::{FilterInputs, SortKey};
use tempfile::TempDir;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.sampling_interval(), Duration::from_millis(1000));
    assert_eq!(config.refresh_interval(), Duration::from_millis(2000));
    assert!(!config.auto_refresh);
    assert_eq!(config.sort, SortKey::Name);
    assert!(config.filter.is_empty());
}

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    let config = Config {
        sampling_interval_ms: 250,
        auto_refresh: true,
        sort: SortKey::Threads,
        filter: FilterInputs {
            text: "code".to_string(),
            min_memory_mb: "100".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    config.save_to(&path).unwrap();
    assert!(path.exists());

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_load_missing_or_empty_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    assert_eq!(Config::load_from(&path).unwrap(), Config::default());

    fs::write(&path, b"").unwrap();
    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}

#[test]
fn test_config_load_garbage_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, b"{ not json").unwrap();

    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}

#[test]
fn test_config_path_is_under_procwatch() {
    if let Ok(path) = Config::get_config_path() {
        assert!(path.ends_with("procwatch/config.json"));
    }
}
