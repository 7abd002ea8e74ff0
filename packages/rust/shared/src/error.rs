//! Error types for Carton.
//!
//! Library crates use [`CartonError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Carton operations.
#[derive(Debug, thiserror::Error)]
pub enum CartonError {
    /// A record is absent from its bucket.
    #[error("{bucket}/{id} not found")]
    NotFound { bucket: String, id: String },

    /// Store gateway I/O or transport error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A referenced component could not be loaded.
    #[error("failed to resolve component {id}: {source}")]
    Resolution {
        id: String,
        source: Box<CartonError>,
    },

    /// An output merge was requested with nothing to merge.
    #[error("no outputs supplied")]
    NoOutputsSupplied,

    /// A repository retrieval manager failed to clone.
    #[error("clone of {url} failed: {message}")]
    Clone { url: String, message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unknown status, blank identifier, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Record encoding or decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CartonError>;

impl CartonError {
    /// Create a not-found error for a bucket/id pair.
    pub fn not_found(bucket: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            id: id.into(),
        }
    }

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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a component lookup failure with the component id.
    pub fn resolution(id: impl Into<String>, source: CartonError) -> Self {
        Self::Resolution {
            id: id.into(),
            source: Box::new(source),
        }
    }

    /// Create a clone failure for `url`.
    pub fn clone_failed(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Clone {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// True when the record (or a nested component) is missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Resolution { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for CartonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
