use std::io::Write;
use std::path::PathBuf;

use sheetflow_core::config::{AppConfig, DEFAULT_CREDENTIALS_ENV};

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[credentials]
env_var = "PIPELINE_SA"
path = "/etc/sheetflow/service_account.json"

[worksheet]
default_rows = 10
default_cols = 10

[backend]
store = "/var/lib/sheetflow/sheets.json"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.credentials.env_var, "PIPELINE_SA");
    assert_eq!(
        config.credentials_path(),
        Some(PathBuf::from("/etc/sheetflow/service_account.json"))
    );
    assert_eq!(config.worksheet.default_rows, 10);
    assert_eq!(config.worksheet.default_cols, 10);
    assert_eq!(config.store_path(), PathBuf::from("/var/lib/sheetflow/sheets.json"));
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("SHEETFLOW_TEST_STORE_DIR", "/srv/sheets");

    let toml_content = r#"
[backend]
store = "${SHEETFLOW_TEST_STORE_DIR}/store.json"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.backend.store, "/srv/sheets/store.json");

    std::env::remove_var("SHEETFLOW_TEST_STORE_DIR");
}

#[test]
fn test_empty_config_uses_defaults() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"").expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.credentials.env_var, DEFAULT_CREDENTIALS_ENV);
    assert!(config.credentials.path.is_none());
    assert_eq!(config.worksheet.default_rows, 1000);
    assert_eq!(config.worksheet.default_cols, 26);
    assert!(config.backend.store.ends_with("sheets.json"));
}

#[test]
fn test_partial_section_fills_defaults() {
    let config = AppConfig::from_toml(
        r#"
[worksheet]
default_rows = 50
"#,
    )
    .expect("parse config");

    assert_eq!(config.worksheet.default_rows, 50);
    assert_eq!(config.worksheet.default_cols, 26);
}

#[test]
fn test_missing_file_is_an_error_for_load() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("absent.toml");

    assert!(AppConfig::load(&path).is_err());
    let config = AppConfig::load_or_default(&path).expect("defaults");
    assert_eq!(config.worksheet.default_rows, 1000);
}

#[test]
fn test_invalid_toml_is_rejected() {
    let err = AppConfig::from_toml("[worksheet]\ndefault_rows = \"many\"\n").unwrap_err();
    assert!(err.to_string().to_lowercase().contains("config"), "{err}");
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = AppConfig::default();
    let text = toml::to_string_pretty(&config).expect("serialize");
    let parsed = AppConfig::from_toml(&text).expect("parse");
    assert_eq!(parsed.worksheet, config.worksheet);
    assert_eq!(parsed.credentials.env_var, config.credentials.env_var);
}
