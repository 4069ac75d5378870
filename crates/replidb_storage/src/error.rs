//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Positioning the file for a write failed.
    #[error("failed to seek to offset {offset}: {source}")]
    SeekFailed {
        /// The requested offset.
        offset: u64,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A rename failed and the source file is still present.
    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    RenameFailed {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// Error reported by the rename.
        #[source]
        source: io::Error,
    },
}
