//! Error types for document loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading and chunking documents
#[derive(Debug, Error)]
pub enum LoadError {
    /// The input path does not exist
    #[error("Path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// The input path exists but cannot be read
    #[error("No read permissions for: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// The file extension has no parser
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// Chunk size and overlap do not describe a valid window
    #[error("Invalid chunking options: size {size}, overlap {overlap} (need 0 <= overlap < size)")]
    InvalidChunking { size: usize, overlap: usize },

    /// A parser failed on one file
    #[error("Failed to parse '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Create a parse error for a file
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}
