//! File-based storage backend for table data files.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based storage backend.
///
/// Writes are positioned: each `write_at` seeks and then writes the whole
/// buffer before returning, so a failed seek never turns into a write at the
/// wrong offset.
///
/// # Durability
///
/// `sync()` calls `File::sync_all()` so both the data and the file length
/// are on disk.
///
/// # Example
///
/// ```no_run
/// use replidb_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("table.DB")).unwrap();
/// backend.write_at(8192, &[0u8; 8192]).unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<File>,
}

impl FileBackend {
    /// Opens the file at `path` for positioned writes, creating it if absent.
    ///
    /// Existing contents are preserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| StorageError::SeekFailed { offset, source })?;
        file.write_all(data)?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        let file = self.file.write();
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.DB");

        let _backend = FileBackend::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn file_write_then_sync() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.DB");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.write_at(0, b"hello").unwrap();
        backend.write_at(5, b" world").unwrap();
        backend.sync().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn file_sparse_write_extends_with_gap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.DB");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.write_at(8, &[0xbb; 4]).unwrap();
        backend.sync().unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(data.len(), 12);
        assert_eq!(&data[..8], &[0; 8]);
        assert_eq!(&data[8..], &[0xbb; 4]);
    }

    #[test]
    fn file_overwrite_in_place_keeps_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.DB");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.write_at(0, &[1; 8]).unwrap();
        backend.write_at(2, &[9; 2]).unwrap();
        backend.sync().unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![1, 1, 9, 9, 1, 1, 1, 1]);
    }

    #[test]
    fn file_reopen_preserves_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.DB");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.write_at(0, b"persistent data").unwrap();
            backend.sync().unwrap();
        }

        let mut backend = FileBackend::open(&path).unwrap();
        backend.write_at(0, b"P").unwrap();
        backend.sync().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"Persistent data");
    }

    #[test]
    fn file_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.DB");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.path(), path);
    }
}
