//! # ReplicaDB Core
//!
//! Database directory bookkeeping shared by the replication code and tools.
//!
//! This crate provides:
//! - [`DatabaseDir`]: the exclusive directory lock and the table file layout
//! - [`VersionFile`]: the database identity, checked on every read
//! - [`Revision`], [`TableName`], [`BaseSlot`]: validated domain types
//! - [`changeset`]: the changeset wire format constants

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod changeset;
mod dir;
mod error;
mod types;
mod version;

pub use dir::{version_path, DatabaseDir, RECORD_TABLE};
pub use error::{CoreError, CoreResult};
pub use types::{BaseSlot, Revision, TableName};
pub use version::{VersionFile, FORMAT_VERSION, VERSION_MAGIC};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
