//! Error types for pagelift.
//!
//! Library crates use [`PageliftError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pagelift operations.
#[derive(Debug, thiserror::Error)]
pub enum PageliftError {
    /// Configuration loading or validation error. Also raised by the
    /// translation engine when a local image reference cannot be resolved
    /// because no image-host URL prefix is configured.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP transport error.
    #[error("network error: {0}")]
    Network(String),

    /// Document-store API error, tagged with the failing operation.
    #[error("store error during {operation}: {message}")]
    Store { operation: String, message: String },

    /// Image-host error, tagged with the failing operation.
    #[error("image host error during {operation}: {message}")]
    ImageHost { operation: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unexpected response shape, invalid input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PageliftError>;

impl PageliftError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a store error tagged with the failing operation.
    pub fn store(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Store {
            operation: operation.into(),
            message: msg.into(),
        }
    }

    /// Create an image-host error tagged with the failing operation.
    pub fn image_host(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ImageHost {
            operation: operation.into(),
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
}
