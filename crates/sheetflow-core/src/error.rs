use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetflowError {
    // Resolution errors
    #[error("Node '{node}' has no value for input '{slot}' (not wired and not in context)")]
    MissingDependency { node: String, slot: String },

    // Credential errors
    #[error("No credentials found: no usable file path and ${env_var} is not set")]
    CredentialsNotFound { env_var: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    // Remote errors
    #[error("{kind} not found: {name}")]
    RemoteNotFound { kind: String, name: String },

    #[error("Remote operation failed: {operation}: {message}")]
    RemoteOperationFailed { operation: String, message: String },

    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    // Node construction errors
    #[error("Invalid node '{node}': {message}")]
    InvalidNode { node: String, message: String },

    #[error("Unknown node kind: {0}")]
    UnknownNode(String),

    #[error("Node '{node}' returned a bad '{slot}' output: {message}")]
    OutputContract {
        node: String,
        slot: String,
        message: String,
    },

    // Pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SheetflowError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::RemoteNotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteOperationFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn invalid_node(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidNode {
            node: node.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SheetflowError>;
