//! Temporary replica directories.

use replidb_codec::encode_uint;
use replidb_core::{VersionFile, RECORD_TABLE};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A replica directory deleted when dropped.
pub struct TempReplica {
    dir: TempDir,
}

impl TempReplica {
    /// Creates an empty replica directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Creates a replica directory with a VERSION file.
    pub fn with_version() -> (Self, VersionFile) {
        let replica = Self::new();
        let version = VersionFile::create(replica.path()).expect("Failed to create VERSION file");
        (replica, version)
    }

    /// Creates a replica whose recorded revision is `revision`.
    pub fn at_revision(revision: u64) -> Self {
        let replica = Self::new();
        replica.set_revision(revision);
        replica
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the path of a file in the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Records `revision` in slot A of the record table.
    pub fn set_revision(&self, revision: u64) {
        let mut base = encode_uint(revision);
        base.extend_from_slice(b"record");
        self.write(&format!("{RECORD_TABLE}.baseA"), &base);
    }

    /// Writes a file in the directory.
    pub fn write(&self, name: &str, data: &[u8]) {
        fs::write(self.file(name), data).expect("Failed to write file");
    }

    /// Reads a file in the directory.
    pub fn read(&self, name: &str) -> Vec<u8> {
        fs::read(self.file(name)).expect("Failed to read file")
    }

    /// Returns true if the file exists.
    pub fn exists(&self, name: &str) -> bool {
        self.file(name).exists()
    }

    /// Returns the names and contents of all regular files.
    ///
    /// The LOCK file is left out since every apply creates it.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        for entry in fs::read_dir(self.path()).expect("Failed to list directory") {
            let entry = entry.expect("Failed to read directory entry");
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "LOCK" || !entry.path().is_file() {
                continue;
            }
            files.insert(name, fs::read(entry.path()).expect("Failed to read file"));
        }
        files
    }

    /// Returns the names of journal files, sorted.
    pub fn journal_files(&self) -> Vec<String> {
        self.snapshot()
            .into_keys()
            .filter(|name| name.starts_with("changes"))
            .collect()
    }
}

impl Default for TempReplica {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replidb_core::{DatabaseDir, Revision};

    #[test]
    fn recorded_revision_is_readable() {
        let replica = TempReplica::at_revision(42);
        let dir = DatabaseDir::open(replica.path(), false).unwrap();
        assert_eq!(dir.current_revision().unwrap(), Revision::new(42));
    }

    #[test]
    fn snapshot_skips_lock() {
        let replica = TempReplica::new();
        let _dir = DatabaseDir::open(replica.path(), false).unwrap();
        replica.write("t.baseA", b"abc");
        replica.write("changes3", b"x");

        let snapshot = replica.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["t.baseA"], b"abc");
        assert_eq!(replica.journal_files(), vec!["changes3".to_string()]);
    }

    #[test]
    fn version_fixture() {
        let (replica, version) = TempReplica::with_version();
        let read = VersionFile::read_and_check(replica.path()).unwrap();
        assert_eq!(read, version);
    }
}
