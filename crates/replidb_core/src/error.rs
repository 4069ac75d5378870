//! Error types for ReplicaDB core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in directory and metadata handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] replidb_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another process holds the directory lock.
    #[error("database locked: another process has exclusive access to {}", path.display())]
    DatabaseLocked {
        /// The locked database directory.
        path: PathBuf,
    },

    /// Invalid on-disk format.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// Neither base file slot of a table holds a readable revision.
    #[error("no valid base file for table {table}")]
    NoValidRevision {
        /// The table that was inspected.
        table: String,
    },

    /// Table name is empty or contains characters other than `a`-`z`.
    #[error("invalid table name: {name:?}")]
    InvalidTableName {
        /// The rejected name, lossily decoded.
        name: String,
    },
}

impl CoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}
