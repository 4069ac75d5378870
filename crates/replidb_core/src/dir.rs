//! Database directory management.
//!
//! This module handles the file system layout of a ReplicaDB database:
//!
//! ```text
//! <db_path>/
//! ├─ LOCK              # Advisory lock for single-writer access
//! ├─ VERSION           # Database identity (UUID) and format version
//! ├─ <table>.baseA     # Base file, slot A
//! ├─ <table>.baseB     # Base file, slot B
//! ├─ <table>.DB        # Block-addressed data file
//! └─ changes<rev>      # Retained changeset journal entries
//! ```
//!
//! The LOCK file ensures only one process modifies the tables at a time.
//! The revision of the database is recorded in the base files of the
//! reserved [`RECORD_TABLE`].

use crate::error::{CoreError, CoreResult};
use crate::types::{BaseSlot, Revision, TableName};
use fs2::FileExt;
use replidb_codec::decode_uint;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File names within the database directory.
const LOCK_FILE: &str = "LOCK";
const VERSION_FILE: &str = "VERSION";

/// Table whose base files carry the database revision.
pub const RECORD_TABLE: &str = "record";

/// Manages the database directory structure and file locking.
///
/// # Thread Safety
///
/// The `DatabaseDir` holds an exclusive lock on the database directory for
/// as long as it is alive. Only one `DatabaseDir` can exist per directory at
/// a time, across processes.
///
/// # Example
///
/// ```rust,ignore
/// use replidb_core::DatabaseDir;
/// use std::path::Path;
///
/// let dir = DatabaseDir::open(Path::new("replica"), true)?;
/// println!("current revision: {}", dir.current_revision()?);
/// ```
#[derive(Debug)]
pub struct DatabaseDir {
    /// Root directory path.
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl DatabaseDir {
    /// Opens a database directory and takes its exclusive lock.
    ///
    /// The lock is attempted exactly once; contention is reported rather
    /// than waited out.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (returns `DatabaseLocked`)
    /// - I/O errors occur, including a lock call the filesystem refuses
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "database directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if let Err(err) = lock_file.try_lock_exclusive() {
            if is_lock_contended(&err) {
                return Err(CoreError::DatabaseLocked {
                    path: path.to_path_buf(),
                });
            }
            return Err(CoreError::Io(err));
        }
        debug!(path = %path.display(), "acquired database lock");

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the database directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of a table's base file in the given slot.
    #[must_use]
    pub fn base_path(&self, table: &TableName, slot: BaseSlot) -> PathBuf {
        self.path.join(format!("{table}.base{slot}"))
    }

    /// Returns the path of a table's block-addressed data file.
    #[must_use]
    pub fn data_path(&self, table: &TableName) -> PathBuf {
        self.path.join(format!("{table}.DB"))
    }

    /// Returns the temporary path used while replacing a table's base file.
    #[must_use]
    pub fn temp_path(&self, table: &TableName) -> PathBuf {
        self.path.join(format!("{table}.tmp"))
    }

    /// Returns the path to the VERSION file.
    #[must_use]
    pub fn version_path(&self) -> PathBuf {
        version_path(&self.path)
    }

    /// Reads the revision recorded in the [`RECORD_TABLE`] base files.
    ///
    /// Both slots are inspected and the higher readable revision wins. A slot
    /// that is missing or does not start with a valid revision is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoValidRevision`] if neither slot is readable.
    pub fn current_revision(&self) -> CoreResult<Revision> {
        let table = TableName::parse(RECORD_TABLE.as_bytes())?;
        let mut best: Option<Revision> = None;

        for slot in BaseSlot::ALL {
            if let Some(rev) = read_base_revision(&self.base_path(&table, slot))? {
                best = Some(best.map_or(rev, |b| b.max(rev)));
            }
        }

        best.ok_or(CoreError::NoValidRevision {
            table: RECORD_TABLE.to_string(),
        })
    }
}

/// Returns the path to the VERSION file of the database at `db_path`.
#[must_use]
pub fn version_path(db_path: &Path) -> PathBuf {
    db_path.join(VERSION_FILE)
}

/// Reads the revision prefix of a base file.
///
/// Returns `Ok(None)` if the file is absent or its prefix does not decode.
fn read_base_revision(path: &Path) -> CoreResult<Option<Revision>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(decode_uint::<u64>(&data)
        .ok()
        .map(|(rev, _)| Revision::new(rev)))
}

/// True if a failed `try_lock_exclusive` means someone else holds the lock.
fn is_lock_contended(err: &io::Error) -> bool {
    let contended = fs2::lock_contended_error();
    err.kind() == io::ErrorKind::WouldBlock
        || (err.raw_os_error().is_some() && err.raw_os_error() == contended.raw_os_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use replidb_codec::encode_uint;
    use tempfile::tempdir;

    fn table(name: &str) -> TableName {
        TableName::parse(name.as_bytes()).unwrap()
    }

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("replica");

        assert!(!db_path.exists());

        let dir = DatabaseDir::open(&db_path, true).unwrap();
        assert!(db_path.is_dir());
        assert_eq!(dir.path(), db_path);
    }

    #[test]
    fn only_contention_counts_as_locked() {
        assert!(is_lock_contended(&fs2::lock_contended_error()));
        assert!(is_lock_contended(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_lock_contended(&io::Error::other("no locks available")));
        assert!(!is_lock_contended(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn enolck_is_not_contention() {
        // ENOLCK, as returned by some NFS mounts.
        assert!(!is_lock_contended(&io::Error::from_raw_os_error(37)));
    }

    #[test]
    fn open_fails_if_not_exists_and_no_create() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("nonexistent");

        let result = DatabaseDir::open(&db_path, false);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("locked");

        let _dir1 = DatabaseDir::open(&db_path, true).unwrap();

        let result = DatabaseDir::open(&db_path, true);
        assert!(matches!(result, Err(CoreError::DatabaseLocked { .. })));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("reopen");

        {
            let _dir = DatabaseDir::open(&db_path, true).unwrap();
        }

        let _dir2 = DatabaseDir::open(&db_path, true).unwrap();
    }

    #[test]
    fn paths_are_correct() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("paths");

        let dir = DatabaseDir::open(&db_path, true).unwrap();
        let t = table("termlist");

        assert_eq!(dir.base_path(&t, BaseSlot::A), db_path.join("termlist.baseA"));
        assert_eq!(dir.base_path(&t, BaseSlot::B), db_path.join("termlist.baseB"));
        assert_eq!(dir.data_path(&t), db_path.join("termlist.DB"));
        assert_eq!(dir.temp_path(&t), db_path.join("termlist.tmp"));
        assert_eq!(dir.version_path(), db_path.join("VERSION"));
    }

    #[test]
    fn current_revision_without_record_fails() {
        let temp = tempdir().unwrap();
        let dir = DatabaseDir::open(temp.path(), true).unwrap();

        assert!(matches!(
            dir.current_revision(),
            Err(CoreError::NoValidRevision { .. })
        ));
    }

    #[test]
    fn current_revision_prefers_higher_slot() {
        let temp = tempdir().unwrap();
        let dir = DatabaseDir::open(temp.path(), true).unwrap();

        let mut a = encode_uint(7);
        a.extend_from_slice(b"rest of base A");
        fs::write(temp.path().join("record.baseA"), a).unwrap();
        fs::write(temp.path().join("record.baseB"), encode_uint(9)).unwrap();

        assert_eq!(dir.current_revision().unwrap(), Revision::new(9));
    }

    #[test]
    fn current_revision_skips_unreadable_slot() {
        let temp = tempdir().unwrap();
        let dir = DatabaseDir::open(temp.path(), true).unwrap();

        fs::write(temp.path().join("record.baseA"), encode_uint(4)).unwrap();
        // Truncated varint: continuation bit set on the last byte.
        fs::write(temp.path().join("record.baseB"), [0xff]).unwrap();

        assert_eq!(dir.current_revision().unwrap(), Revision::new(4));
    }
}
