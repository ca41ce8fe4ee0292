//! Error types for Pagesmith.
//!
//! Library crates use [`PagesmithError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Pagesmith operations.
#[derive(Debug, thiserror::Error)]
pub enum PagesmithError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Discovery found nothing to process. Fatal for a batch run.
    #[error("no HTML documents found under {dir:?}")]
    NoDocuments { dir: PathBuf },

    /// A document could not be decoded as UTF-8 text.
    #[error("{path:?} is not valid UTF-8")]
    Encoding { path: PathBuf },

    /// A transformation pass failed on a document.
    #[error("pass `{pass}` failed: {message}")]
    Pass { pass: &'static str, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad report, malformed record, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A worker task panicked or was cancelled.
    #[error("worker error: {0}")]
    Worker(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagesmithError>;

impl PagesmithError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a pass failure tagged with the pass name.
    pub fn pass(pass: &'static str, msg: impl Into<String>) -> Self {
        Self::Pass {
            pass,
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    ///
    /// `InvalidData` from `read_to_string` is reported as an encoding error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::InvalidData {
            return Self::Encoding { path };
        }
        Self::Io { path, source }
    }
}
