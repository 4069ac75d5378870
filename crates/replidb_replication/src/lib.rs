//! # ReplicaDB Replication
//!
//! Applies changesets streamed from a master to the table files of a
//! replica.
//!
//! A changeset moves a replica from one revision to a later one. It is read
//! from a [`Connection`] in chunks, checked as it is read, and applied item
//! by item:
//!
//! - **Base file items** replace one slot of a table's base file whole
//! - **Block items** patch fixed-size blocks of a table's data file in place
//!
//! The whole apply runs under the database directory lock and fails on the
//! first error. Optionally every consumed byte is kept in a journal file so
//! the changeset can be inspected or passed on later.
//!
//! ## Example
//!
//! ```rust,ignore
//! use replidb_replication::{MemoryConnection, Replicator, ReplicatorConfig};
//! use std::time::{Duration, Instant};
//!
//! let replicator = Replicator::new("replica", ReplicatorConfig::new().max_changesets(5));
//! let mut conn = MemoryConnection::changeset(changeset_bytes);
//! let deadline = Instant::now() + Duration::from_secs(30);
//! let summary = replicator.apply_changeset(&mut conn, deadline, true)?;
//! println!("replica now at {}", summary.required_revision);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod base;
mod blocks;
mod config;
mod connection;
mod error;
mod journal;
mod replicator;
mod revision;
mod stream;

pub use base::BaseFileWrite;
pub use blocks::BlockWrites;
pub use config::{ReplicatorConfig, DEFAULT_CHUNK_SIZE, MAX_CHANGESETS_ENV};
pub use connection::{Connection, MemoryConnection, MessageType, ReaderConnection};
pub use error::{ErrorKind, ReplicationError, ReplicationResult};
pub use journal::{journal_file_name, ChangesetJournal, JournalEntry, JournalWriter};
pub use replicator::{ApplyState, ChangesetSummary, ReplicationStats, Replicator};
pub use revision::revision_at_least;
