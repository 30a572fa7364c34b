//! Error taxonomy shared by every surface.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the configuration store, the registry and the bridge.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or empty required input.
    #[error("{0}")]
    Validation(String),

    /// Unknown server name. Always carries the known names.
    #[error("Server '{name}' not found")]
    ServerNotFound { name: String, available: Vec<String> },

    /// A file named by the caller does not exist.
    #[error("File '{}' not found", .0.display())]
    FileNotFound(PathBuf),

    /// Persisted or imported data could not be parsed.
    #[error("File '{}' is not a valid configuration: {reason}", path.display())]
    MalformedConfig { path: PathBuf, reason: String },

    /// Required credential is absent from the environment.
    #[error("{0} environment variable not set")]
    MissingCredential(String),

    /// Failure surfaced by the agent or session layer.
    #[error("{0}")]
    ExternalOperation(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Stable discriminant for rendering errors outside Rust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    MalformedConfig,
    MissingCredential,
    ExternalOperation,
    Cancelled,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::ServerNotFound { .. } | Error::FileNotFound(_) => ErrorKind::NotFound,
            Error::MalformedConfig { .. } => ErrorKind::MalformedConfig,
            Error::MissingCredential(_) => ErrorKind::MissingCredential,
            Error::ExternalOperation(_) => ErrorKind::ExternalOperation,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Io { .. } => ErrorKind::Internal,
        }
    }

    /// Known server names, when the error is an unknown-server lookup.
    pub fn available_servers(&self) -> Option<&[String]> {
        match self {
            Error::ServerNotFound { available, .. } => Some(available),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn external(err: anyhow::Error) -> Self {
        Error::ExternalOperation(format!("{err:#}"))
    }
}
