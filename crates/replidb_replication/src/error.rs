//! Error types for changeset application.

use replidb_codec::CodecError;
use replidb_core::{CoreError, Revision};
use replidb_storage::StorageError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Errors that can occur while applying a changeset.
///
/// Every error aborts the whole apply. Items already written to disk before
/// the error was detected stay written; the caller resynchronises by
/// revision on its next attempt.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// The changeset stream is truncated or structurally invalid.
    #[error("malformed changeset: {message}")]
    MalformedProtocol {
        /// Description of the problem.
        message: String,
    },

    /// The connection delivered something other than what the protocol allows.
    #[error("protocol violation: {message}")]
    ProtocolViolation {
        /// Description of the problem.
        message: String,
    },

    /// The changeset was produced with a different format version.
    #[error("unsupported changeset version {actual} (expected {expected})")]
    UnsupportedVersion {
        /// Version this replica understands.
        expected: u32,
        /// Version in the changeset header.
        actual: u32,
    },

    /// The header's end revision does not follow its start revision.
    #[error("end revision {end} is not later than start revision {start}")]
    InvalidRevisionRange {
        /// Start revision from the header.
        start: Revision,
        /// End revision from the header.
        end: Revision,
    },

    /// The changeset type is recognised but not supported.
    #[error("unsupported changeset type: {0}")]
    UnsupportedChangesetType(u8),

    /// An item tag outside the known set.
    #[error("unrecognised item type in changeset: {0}")]
    UnrecognizedItemType(u8),

    /// A table name that is empty or not all lowercase letters.
    #[error("invalid table name in changeset: {name:?}")]
    InvalidTableName {
        /// The rejected name, lossily decoded.
        name: String,
    },

    /// The footer's required revision is earlier than the end revision.
    #[error("required revision {required} is earlier than end revision {end}")]
    StaleRequiredRevision {
        /// Required revision from the footer.
        required: Revision,
        /// End revision from the header.
        end: Revision,
    },

    /// Bytes remain after the footer.
    #[error("{count} bytes of junk found at end of changeset")]
    TrailingGarbage {
        /// Number of unexpected bytes.
        count: usize,
    },

    /// The deadline passed while waiting on the connection.
    #[error("timed out waiting for changeset data")]
    Timeout,

    /// Another process holds the database lock.
    #[error("database at {} is locked by another process", path.display())]
    LockUnavailable {
        /// The locked database directory.
        path: PathBuf,
    },

    /// The changeset does not start at the replica's revision.
    #[error("changeset is for revision {expected}, replica is at {}", describe_revision(.actual))]
    RevisionMismatch {
        /// Start revision of the changeset.
        expected: Revision,
        /// Revision recorded by the replica, if it could be read.
        actual: Option<Revision>,
    },

    /// A filesystem operation on a table file failed.
    #[error("failed to update {} for table {table}: {source}", path.display())]
    StorageWriteFailed {
        /// Table being modified.
        table: String,
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The connection failed for a reason other than the deadline.
    #[error("transport error: {0}")]
    Transport(String),

    /// Database directory or metadata error.
    #[error("database error: {0}")]
    Core(#[source] CoreError),
}

/// The error taxonomy, for callers that branch on the class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or semantically invalid input.
    ProtocolViolation,
    /// Deadline exceeded.
    Timeout,
    /// Directory lock held elsewhere.
    LockUnavailable,
    /// Replica revision disagrees with the changeset.
    RevisionMismatch,
    /// Filesystem failure on a table or journal file.
    StorageWriteFailed,
    /// Transport or database failure outside the protocol.
    Other,
}

impl ReplicationError {
    /// Creates a malformed protocol error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedProtocol {
            message: message.into(),
        }
    }

    /// Creates a protocol violation error.
    pub fn violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates a storage write error for a table file.
    pub fn storage(table: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StorageWriteFailed {
            table: table.into(),
            path: path.into(),
            source,
        }
    }

    /// Creates a storage write error from a storage-layer failure.
    pub fn from_storage(
        table: impl Into<String>,
        path: impl Into<PathBuf>,
        err: StorageError,
    ) -> Self {
        let source = match err {
            StorageError::Io(source)
            | StorageError::SeekFailed { source, .. }
            | StorageError::RenameFailed { source, .. } => source,
        };
        Self::storage(table, path, source)
    }

    /// Wraps a codec error with the field that was being decoded.
    pub fn codec(field: &str, err: CodecError) -> Self {
        Self::malformed(format!("{field}: {err}"))
    }

    /// Returns the class of this error.
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            Self::MalformedProtocol { .. }
            | Self::ProtocolViolation { .. }
            | Self::UnsupportedVersion { .. }
            | Self::InvalidRevisionRange { .. }
            | Self::UnsupportedChangesetType(_)
            | Self::UnrecognizedItemType(_)
            | Self::InvalidTableName { .. }
            | Self::StaleRequiredRevision { .. }
            | Self::TrailingGarbage { .. } => ErrorKind::ProtocolViolation,
            Self::Timeout => ErrorKind::Timeout,
            Self::LockUnavailable { .. } => ErrorKind::LockUnavailable,
            Self::RevisionMismatch { .. } => ErrorKind::RevisionMismatch,
            Self::StorageWriteFailed { .. } => ErrorKind::StorageWriteFailed,
            Self::Transport(_) | Self::Core(_) => ErrorKind::Other,
        }
    }

    /// Returns true if the input from the connection was at fault.
    pub fn is_protocol_violation(&self) -> bool {
        self.error_kind() == ErrorKind::ProtocolViolation
    }
}

fn describe_revision(revision: &Option<Revision>) -> String {
    revision.map_or_else(|| "an unknown revision".to_string(), |rev| rev.to_string())
}

impl From<CoreError> for ReplicationError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DatabaseLocked { path } => Self::LockUnavailable { path },
            CoreError::InvalidTableName { name } => Self::InvalidTableName { name },
            other => Self::Core(other),
        }
    }
}
