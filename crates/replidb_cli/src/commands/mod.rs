//! CLI command implementations.

pub mod apply;
pub mod init;
pub mod journal;
pub mod revision;
pub mod uuid;
