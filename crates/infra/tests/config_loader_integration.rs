//! Integration tests for the configuration loader: file probing, TOML/JSON
//! parsing, and merging onto defaults.

use std::io::Write;
use std::sync::Mutex;

use chronarc_domain::{ChronarcError, Config};
use chronarc_infra::config::load_from_file;
use once_cell::sync::Lazy;
use tempfile::NamedTempFile;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[test]
fn load_from_file_json_merges_onto_defaults() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
    let json_content = r#"{
        "database": {
            "path": "/tmp/integration_test.db",
            "encryption_key": "test-encryption-key-123",
            "pool_size": 10,
            "call_timeout_secs": 5
        },
        "provider": {
            "client_id": "test-client-id",
            "redirect_uri": "http://127.0.0.1:0/oauth/callback"
        }
    }"#;

    let mut temp_file = NamedTempFile::new().expect("failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("failed to write to temp file");
    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("failed to copy file");

    let config = load_from_file(Some(path.clone())).expect("should load config from JSON file");

    assert_eq!(config.database.path, "/tmp/integration_test.db");
    assert_eq!(config.database.pool_size, 10);
    assert_eq!(config.database.encryption_key, "test-encryption-key-123");
    assert_eq!(config.provider.client_id, "test-client-id");
    // Fields the file didn't mention keep their defaults.
    assert_eq!(config.classification.skip_threshold, Config::default().classification.skip_threshold);

    std::fs::remove_file(path).ok();
}

#[test]
fn load_from_file_toml_merges_onto_defaults() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
    let toml_content = r#"
[database]
path = "/tmp/integration_test_toml.db"
encryption_key = "toml-key-456"
pool_size = 8
call_timeout_secs = 5

[scheduler]
interval_secs = 300
max_failures = 3
staleness_hours = 4
default_window_weeks_before = 2
default_window_weeks_after = 2
max_gap_fill_jobs_per_tick = 10
"#;

    let mut temp_file = NamedTempFile::new().expect("failed to create temp file");
    temp_file.write_all(toml_content.as_bytes()).expect("failed to write to temp file");
    let path = temp_file.path().with_extension("toml");
    std::fs::copy(temp_file.path(), &path).expect("failed to copy file");

    let config = load_from_file(Some(path.clone())).expect("should load config from TOML file");

    assert_eq!(config.database.path, "/tmp/integration_test_toml.db");
    assert_eq!(config.database.pool_size, 8);
    assert_eq!(config.scheduler.interval_secs, 300);
    assert_eq!(config.scheduler.max_failures, 3);

    std::fs::remove_file(path).ok();
}

#[test]
fn load_from_file_with_minimal_fields_keeps_defaults_elsewhere() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
    let json_content = r#"{
        "database": {
            "path": "minimal.db",
            "encryption_key": "",
            "pool_size": 5,
            "call_timeout_secs": 5
        }
    }"#;

    let mut temp_file = NamedTempFile::new().expect("failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("failed to write to temp file");
    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("failed to copy file");

    let config = load_from_file(Some(path.clone())).expect("should load config with minimal fields");

    assert_eq!(config.database.path, "minimal.db");
    assert_eq!(config.provider.client_id, Config::default().provider.client_id);

    std::fs::remove_file(path).ok();
}

#[test]
fn load_from_file_nonexistent_path_errors() {
    let result = load_from_file(Some("/nonexistent/path/config.json".into()));
    match result {
        Err(ChronarcError::InvalidRequest(msg)) => {
            assert!(msg.contains("not found"), "error message should mention 'not found': {msg}");
        }
        other => panic!("expected InvalidRequest error, got {other:?}"),
    }
}

#[test]
fn load_from_file_invalid_json_errors() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
    let invalid_content = r#"{ "this is": "not valid" "#;

    let mut temp_file = NamedTempFile::new().expect("failed to create temp file");
    temp_file.write_all(invalid_content.as_bytes()).expect("failed to write to temp file");
    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("failed to copy file");

    let result = load_from_file(Some(path.clone()));
    match result {
        Err(ChronarcError::InvalidRequest(msg)) => {
            assert!(msg.contains("JSON"), "error message should mention JSON: {msg}");
        }
        other => panic!("expected InvalidRequest error, got {other:?}"),
    }

    std::fs::remove_file(path).ok();
}
