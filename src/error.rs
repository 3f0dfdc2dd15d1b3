use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssessError>;

#[derive(Error, Debug)]
pub enum AssessError {
    #[error("Cannot connect to {target}: {error}")]
    Connection {
        target: String,
        #[source]
        error: ConnectionError,
    },

    #[error("Unsupported target {target}: {reason}")]
    UnsupportedTarget { target: String, reason: String },

    #[error("Catalog error in {origin}{}: {message}", .check.as_deref().map(|c| format!(" (check {c})")).unwrap_or_default())]
    CatalogLoad {
        origin: String,
        check: Option<String>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a metadata source could not produce a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("target unreachable: {0}")]
    Unreachable(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The source answered, but the row does not describe a target this
    /// tool understands.
    #[error("unusable property row: {0}")]
    InvalidRow(String),
}

impl AssessError {
    pub fn catalog(origin: impl Into<String>, check: Option<&str>, message: impl Into<String>) -> Self {
        Self::CatalogLoad {
            origin: origin.into(),
            check: check.map(str::to_owned),
            message: message.into(),
        }
    }

    pub fn unsupported(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Connection { .. } => 3,
            Self::UnsupportedTarget { .. } => 4,
            Self::CatalogLoad { .. } => 5,
            _ => 2,
        }
    }
}
