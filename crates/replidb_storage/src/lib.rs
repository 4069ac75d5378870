//! # ReplicaDB Storage
//!
//! Storage primitives for applying changesets to table files.
//!
//! Tables are mutated in two deliberately different ways:
//!
//! - **Base files** are small and must change all at once. They are replaced
//!   whole via [`replace_file`]: write a temporary file, fsync, rename.
//! - **Data files** are large and block-addressed. Individual blocks are
//!   patched in place through a [`StorageBackend`] at `block * block_size`.
//!
//! ## Design Principles
//!
//! - Backends are opaque byte stores with positioned writes
//! - No knowledge of changesets, revisions or table naming
//! - Must be `Send + Sync`
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing
//! - [`FileBackend`] - For table data files
//!
//! ## Example
//!
//! ```rust
//! use replidb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.write_at(0, b"hello world").unwrap();
//! backend.write_at(6, b"there").unwrap();
//! assert_eq!(backend.data(), b"hello there");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod replace;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use replace::{
    commit_rename, commit_rename_with, replace_file, sync_directory, write_synced, RenameOutcome,
};
