//! Error types for modality stores and record readers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error from a store read or a record parse.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Requested frame index is past the end of the store.
    #[error("Frame index {index} out of range for store of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Record file had unexpected contents.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Image decode failure.
    #[error("Failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// JSON annotation failure.
    #[error("Failed to parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The background prefetch thread could not be started.
    #[error("Failed to spawn prefetch thread: {0}")]
    Spawn(#[source] io::Error),
}

impl StoreError {
    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_error_displays_bounds() {
        let err = StoreError::IndexOutOfRange { index: 9, len: 3 };
        let msg = err.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains('3'));
    }
}
