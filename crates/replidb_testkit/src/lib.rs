//! # ReplicaDB Testkit
//!
//! Test utilities for ReplicaDB.
//!
//! This crate provides:
//! - [`ChangesetBuilder`] for well-formed and deliberately malformed changesets
//! - [`TempReplica`] temporary replica directories
//! - Property-based test generators using proptest
//! - Fuzz targets for the changeset primitives
//!
//! ## Usage
//!
//! ```rust,ignore
//! use replidb_testkit::prelude::*;
//!
//! #[test]
//! fn applies_base_file() {
//!     let replica = TempReplica::at_revision(10);
//!     let changeset = ChangesetBuilder::new(10, 11)
//!         .base_file("t", b'A', &[1, 2, 3])
//!         .build();
//!     // ... apply and check replica.read("t.baseA")
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod fixtures;
pub mod fuzz;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builder::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use builder::ChangesetBuilder;
pub use fixtures::TempReplica;
pub use fuzz::*;
pub use generators::*;
