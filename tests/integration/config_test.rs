use lemon_server::core::config::{DEFAULT_PORT, DEFAULT_SHUTDOWN_GRACE_MS};
use lemon_server::Config;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_round_trip_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lemon-server").join("config.json");

    let mut config = Config::default();
    config.set_port(9200);
    config.bind_address = "127.0.0.1".to_string();
    config.save_to(&path).unwrap();

    assert!(path.exists());
    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.listen_address(), "127.0.0.1:9200");
}

#[test]
fn test_unknown_keys_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "legacy_setting": true, "shutdown_grace_ms": 50 }"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.shutdown_grace_ms, 50);
}

#[test]
fn test_empty_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, b"").unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.shutdown_grace_ms, DEFAULT_SHUTDOWN_GRACE_MS);
    assert!(config.get_presentmon_path().is_none());
}
