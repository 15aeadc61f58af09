// Error types for the scan engine
//
// Setup errors (invalid root, unusable output directory) abort a run before any
// file is dispatched. Per-file I/O errors are reported as `ScanError::Io` and
// only cause that file to be skipped.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while scanning a directory tree
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid input {path}: {reason}")]
    InvalidInput { path: Utf8PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to prepare run at {path}: {source}")]
    Setup {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report {path}: {source}")]
    Report {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Forbidden word {word:?} cannot be matched: {reason}")]
    InvalidWord { word: String, reason: String },

    #[error("A scan is already in progress")]
    AlreadyRunning,
}

impl ScanError {
    /// Build an `Io` error for a specific path
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that abort the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

pub type ScanResult<T> = std::result::Result<T, ScanError>;
