//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An in-memory storage backend.
///
/// Behaves like a sparse file: writing past the end zero-fills the gap.
///
/// # Example
///
/// ```rust
/// use replidb_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// backend.write_at(4, b"data").unwrap();
/// assert_eq!(backend.data(), b"\0\0\0\0data");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
    syncs: RwLock<usize>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend with pre-existing data.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
            syncs: RwLock::new(0),
        }
    }

    /// Returns a copy of all data in the backend.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Number of times `sync` has been called.
    #[must_use]
    pub fn sync_count(&self) -> usize {
        *self.syncs.read()
    }
}

impl StorageBackend for InMemoryBackend {
    fn write_at(&mut self, offset: u64, new_data: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        let range = usize::try_from(offset)
            .ok()
            .and_then(|start| Some((start, start.checked_add(new_data.len())?)));
        let Some((start, end)) = range else {
            return Err(StorageError::SeekFailed {
                offset,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "offset exceeds addressable memory",
                ),
            });
        };
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(new_data);
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        *self.syncs.write() += 1;
        Ok(())
    }
}
