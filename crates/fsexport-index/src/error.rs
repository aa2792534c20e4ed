//! Error types for fsexport-index.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for fsexport-index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Error type for index and archive info files.
#[derive(Debug, Error)]
pub enum IndexError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No index file at the expected location.
    #[error("Index file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The index file exists but does not decode.
    #[error("Corrupt index: {0}")]
    Corrupt(String),

    /// Archive info could not be encoded.
    #[error("Archive info serialization failed: {0}")]
    ArchiveInfo(#[from] serde_json::Error),
}

impl IndexError {
    /// Create a corrupt index error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}
