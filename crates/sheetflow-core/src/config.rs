use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetflowError};

/// Environment variable holding a base64-encoded service-account document.
pub const DEFAULT_CREDENTIALS_ENV: &str = "GOOGLE_SERVICE_ACCOUNT_CREDENTIALS";

/// Top-level sheetflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub worksheet: WorksheetConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Where the authentication node looks for credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Name of the environment variable carrying the encoded document.
    #[serde(default = "default_credentials_env")]
    pub env_var: String,
    /// Path used when an `authenticate` step does not name one.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_var: default_credentials_env(),
            path: None,
        }
    }
}

fn default_credentials_env() -> String {
    DEFAULT_CREDENTIALS_ENV.to_string()
}

/// Defaults applied by `create_worksheet` when rows/cols are not given.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorksheetConfig {
    #[serde(default = "default_rows")]
    pub default_rows: u32,
    #[serde(default = "default_cols")]
    pub default_cols: u32,
}

impl Default for WorksheetConfig {
    fn default() -> Self {
        Self {
            default_rows: default_rows(),
            default_cols: default_cols(),
        }
    }
}

fn default_rows() -> u32 { 1000 }
fn default_cols() -> u32 { 26 }

/// Local backend persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// JSON file the local backend loads from and saves to.
    #[serde(default = "default_store")]
    pub store: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
        }
    }
}

fn default_store() -> String { "~/.sheetflow/sheets.json".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| SheetflowError::ConfigNotFound(path.display().to_string()))?;

        Self::from_toml(&content)
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from TOML text, expanding `${ENV_VAR}` references.
    pub fn from_toml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| SheetflowError::Config(e.to_string()))
    }

    /// Resolve the backend store path (expand ~).
    pub fn store_path(&self) -> PathBuf {
        expand_home(&self.backend.store)
    }

    /// Resolve the configured default credentials path, if any.
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials.path.as_deref().map(expand_home)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
pub fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_SHEETFLOW_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_SHEETFLOW_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_SHEETFLOW_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_SHEETFLOW_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_SHEETFLOW_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.credentials.env_var, DEFAULT_CREDENTIALS_ENV);
        assert!(config.credentials.path.is_none());
        assert_eq!(config.worksheet.default_rows, 1000);
        assert_eq!(config.worksheet.default_cols, 26);
        assert_eq!(config.backend.store, "~/.sheetflow/sheets.json");
    }

    #[test]
    fn test_legacy_worksheet_defaults() {
        let toml_str = r#"
[worksheet]
default_rows = 10
default_cols = 10
"#;
        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.worksheet.default_rows, 10);
        assert_eq!(config.worksheet.default_cols, 10);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml_str = r#"
[credentials]
path = "/etc/sheetflow/sa.json"
"#;
        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.credentials.env_var, DEFAULT_CREDENTIALS_ENV);
        assert_eq!(
            config.credentials_path(),
            Some(PathBuf::from("/etc/sheetflow/sa.json"))
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("[worksheet\n").unwrap_err();
        assert!(matches!(err, SheetflowError::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("/nonexistent/sheetflow.toml")).unwrap();
        assert_eq!(config.worksheet.default_rows, 1000);
    }
}
