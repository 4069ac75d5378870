//! Storage backend trait definition.

use crate::error::StorageResult;

/// A block-addressable byte store.
///
/// Backends are **opaque byte stores**: they know nothing about tables,
/// blocks or changesets. Callers compute offsets and the backend places the
/// bytes there.
///
/// # Invariants
///
/// - `write_at` either writes all of `data` at `offset` or returns an error
/// - Writing past the current end extends the store and zero-fills any gap
/// - After `sync` returns, all completed writes survive process termination
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For table data files
pub trait StorageBackend: Send + Sync {
    /// Writes `data` at `offset`, extending the store if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if positioning or writing fails.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;
}
