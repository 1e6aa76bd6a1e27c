//! Credential resolution chain for the authentication node.
//!
//! Sources are tried in precedence order:
//!
//! 1. an explicit file path, if it exists on disk;
//! 2. an environment variable holding a base64-encoded JSON document.
//!
//! "Nothing to try" is [`SheetflowError::CredentialsNotFound`]; a source that
//! exists but cannot be decoded is [`SheetflowError::AuthenticationFailed`].

use std::fmt;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SheetflowError};

/// A service-account credential document. Unknown fields are ignored.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceAccountCredentials {
    #[serde(rename = "type", default)]
    pub account_type: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("type", &self.account_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Where a credential document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    Environment(String),
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "file {}", p.display()),
            Self::Environment(var) => write!(f, "environment variable {}", var),
        }
    }
}

/// A decoded document together with its source.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub source: CredentialSource,
    pub credentials: ServiceAccountCredentials,
}

/// Run the chain against the process environment.
pub fn resolve_credentials(path: Option<&Path>, env_var: &str) -> Result<ResolvedCredentials> {
    resolve_credentials_with(path, env_var, |name| std::env::var(name).ok())
}

/// Run the chain with a custom environment lookup.
///
/// `lookup` is only called when no existing file path was supplied.
pub fn resolve_credentials_with<F>(
    path: Option<&Path>,
    env_var: &str,
    lookup: F,
) -> Result<ResolvedCredentials>
where
    F: FnOnce(&str) -> Option<String>,
{
    if let Some(path) = path {
        if path.exists() {
            debug!(path = %path.display(), "Loading credentials from file");
            let credentials = load_file(path)?;
            return Ok(ResolvedCredentials {
                source: CredentialSource::File(path.to_path_buf()),
                credentials,
            });
        }
        debug!(path = %path.display(), "Credentials file does not exist, trying environment");
    }

    let encoded = lookup(env_var)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SheetflowError::CredentialsNotFound {
            env_var: env_var.to_string(),
        })?;

    debug!(env_var, "Decoding credentials from environment");
    let credentials = decode_blob(&encoded, env_var)?;
    Ok(ResolvedCredentials {
        source: CredentialSource::Environment(env_var.to_string()),
        credentials,
    })
}

/// Read and parse a credential file.
pub fn load_file(path: &Path) -> Result<ServiceAccountCredentials> {
    let bytes = std::fs::read(path).map_err(|e| {
        SheetflowError::AuthenticationFailed(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_document(&bytes)
}

/// Base64-decode then JSON-decode an encoded credential blob.
pub fn decode_blob(encoded: &str, env_var: &str) -> Result<ServiceAccountCredentials> {
    let trimmed = encoded.trim();
    let bytes = STANDARD
        .decode(trimmed)
        .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed.trim_end_matches('=')))
        .map_err(|e| {
            SheetflowError::AuthenticationFailed(format!("${} is not valid base64: {}", env_var, e))
        })?;
    parse_document(&bytes)
}

/// Encode a document the way the environment variable expects it.
pub fn encode_blob(credentials: &ServiceAccountCredentials) -> Result<String> {
    Ok(STANDARD.encode(serde_json::to_vec(credentials)?))
}

fn parse_document(bytes: &[u8]) -> Result<ServiceAccountCredentials> {
    serde_json::from_slice(bytes).map_err(|e| {
        SheetflowError::AuthenticationFailed(format!("credential document is not valid JSON: {}", e))
    })
}
