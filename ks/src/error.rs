//! Credential store error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing credentials
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("Invalid API key format: expected a value starting with 'sk-' or 'Bearer '")]
    InvalidFormat,

    #[error("No data directory available for the credential store")]
    NoDataDir,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt credential file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl KeystoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KeystoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the error is a rejected key format
    pub fn is_format_error(&self) -> bool {
        matches!(self, KeystoreError::InvalidFormat)
    }
}
