//! CLI Configuration Tests
//!
//! Tests for config file loading:
//! - Defaults apply to omitted fields
//! - Invalid values are rejected with a config error
//! - Limits from config are enforced when loading data

use std::fs;
use std::path::PathBuf;

use docpipe::cli::{load_collection, CliErrorCode, Config};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write_config(temp_dir: &TempDir, content: &str) -> PathBuf {
    let path = temp_dir.path().join("docpipe.json");
    fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// Loading Tests
// =============================================================================

/// Empty object yields every default.
#[test]
fn test_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "{}");

    let config = Config::load(&path).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.max_documents, 1_000_000);
    assert_eq!(config.log_filter, "warn");
    assert!(!config.pretty);
}

/// Explicit values override defaults.
#[test]
fn test_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        &json!({"max_documents": 10, "log_filter": "docpipe=debug", "pretty": true}).to_string(),
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.max_documents, 10);
    assert_eq!(config.log_filter, "docpipe=debug");
    assert!(config.pretty);
}

/// No path means defaults.
#[test]
fn test_load_or_default_without_path() {
    assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
}

// =============================================================================
// Validation Tests
// =============================================================================

/// Zero max_documents is rejected.
#[test]
fn test_zero_max_documents_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, r#"{"max_documents": 0}"#);

    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::ConfigError);
}

/// Unknown keys are rejected.
#[test]
fn test_unknown_key_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, r#"{"max_docs": 5}"#);

    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::ConfigError);
}

/// Unparseable log filter is rejected.
#[test]
fn test_bad_log_filter_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, r#"{"log_filter": "docpipe=loud"}"#);

    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::ConfigError);
}

/// Missing file is a config error.
#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = Config::load(&temp_dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::ConfigError);
}

// =============================================================================
// Enforcement Tests
// =============================================================================

/// Collections at the limit load; above it they do not.
#[test]
fn test_max_documents_boundary() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("rows.json");
    fs::write(&data, json!([{"n": 1}, {"n": 2}]).to_string()).unwrap();

    let at_limit = Config {
        max_documents: 2,
        ..Config::default()
    };
    assert_eq!(load_collection(&data, &at_limit).unwrap().len(), 2);

    let below = Config {
        max_documents: 1,
        ..Config::default()
    };
    assert_eq!(
        load_collection(&data, &below).unwrap_err().code(),
        &CliErrorCode::TooManyDocuments
    );
}

/// Non-record entries are an input error.
#[test]
fn test_data_must_be_records() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("rows.json");
    fs::write(&data, "[1, 2]").unwrap();

    let err = load_collection(&data, &Config::default()).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::InputError);
}
