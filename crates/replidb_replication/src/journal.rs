//! Retention of raw changeset bytes.
//!
//! When enabled, every byte consumed while applying a changeset is copied to
//! `changes<start_revision>` in the database directory. The copy is
//! diagnostic: a failed apply leaves its partial file behind, and failures to
//! write or prune journal files never fail the apply itself.

use crate::error::{ReplicationError, ReplicationResult};
use replidb_core::Revision;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

const JOURNAL_PREFIX: &str = "changes";

/// Returns the journal file name for a changeset starting at `revision`.
#[must_use]
pub fn journal_file_name(revision: Revision) -> String {
    format!("{JOURNAL_PREFIX}{}", revision.as_u64())
}

fn parse_journal_file_name(name: &str) -> Option<Revision> {
    let digits = name.strip_prefix(JOURNAL_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(Revision::new)
}

/// A journal file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Start revision of the journaled changeset.
    pub revision: Revision,
    /// Full path of the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time, if the filesystem reports one.
    pub modified: Option<SystemTime>,
}

/// The set of journal files of one database directory.
#[derive(Debug, Clone)]
pub struct ChangesetJournal {
    dir: PathBuf,
    max_changesets: usize,
}

impl ChangesetJournal {
    /// Creates a journal for `dir` retaining at most `max_changesets` files.
    pub fn new(dir: impl Into<PathBuf>, max_changesets: usize) -> Self {
        Self {
            dir: dir.into(),
            max_changesets,
        }
    }

    /// Returns true if changesets are retained at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.max_changesets > 0
    }

    /// Creates the journal file for a changeset starting at `revision`.
    ///
    /// Returns `None` when retention is disabled. Otherwise the new file
    /// replaces any previous file for the same revision, and older files
    /// beyond the retention cap are removed.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicationError::StorageWriteFailed`] if the file cannot be
    /// created. Pruning failures are only logged.
    pub fn open_for_revision(
        &self,
        revision: Revision,
    ) -> ReplicationResult<Option<JournalWriter>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let path = self.dir.join(journal_file_name(revision));
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|err| ReplicationError::storage("journal", &path, err))?;
        debug!(path = %path.display(), revision = revision.as_u64(), "opened changeset journal");

        self.prune(&path);

        Ok(Some(JournalWriter {
            file,
            path,
            written: 0,
        }))
    }

    /// Removes the oldest journal files until at most the cap remain.
    ///
    /// `keep` is never removed.
    fn prune(&self, keep: &Path) {
        let entries = match Self::list(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %self.dir.display(), error = %err, "cannot list journal files");
                return;
            }
        };

        let surplus = entries.len().saturating_sub(self.max_changesets);
        let doomed = entries
            .iter()
            .filter(|entry| entry.path != keep)
            .take(surplus);

        for entry in doomed {
            match fs::remove_file(&entry.path) {
                Ok(()) => debug!(path = %entry.path.display(), "pruned journal file"),
                Err(err) => {
                    warn!(path = %entry.path.display(), error = %err, "cannot prune journal file");
                }
            }
        }
    }

    /// Lists journal files in `dir`, oldest first.
    ///
    /// Files are ordered by modification time, then by revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn list(dir: &Path) -> io::Result<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        for item in fs::read_dir(dir)? {
            let item = item?;
            let name = item.file_name();
            let Some(revision) = name.to_str().and_then(parse_journal_file_name) else {
                continue;
            };
            let metadata = item.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(JournalEntry {
                revision,
                path: item.path(),
                size: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }
        entries.sort_by_key(|entry| (entry.modified, entry.revision));
        Ok(entries)
    }
}

/// An open journal file receiving changeset bytes in consumption order.
#[derive(Debug)]
pub struct JournalWriter {
    file: File,
    path: PathBuf,
    written: u64,
}

impl JournalWriter {
    /// Appends bytes exactly as consumed.
    pub fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes appended so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        if let Err(err) = self.file.sync_all() {
            warn!(path = %self.path.display(), error = %err, "cannot sync journal file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_names() {
        assert_eq!(journal_file_name(Revision::new(42)), "changes42");
        assert_eq!(parse_journal_file_name("changes42"), Some(Revision::new(42)));
        assert_eq!(parse_journal_file_name("changes"), None);
        assert_eq!(parse_journal_file_name("changes4x"), None);
        assert_eq!(parse_journal_file_name("changes+4"), None);
        assert_eq!(parse_journal_file_name("record.baseA"), None);
    }

    #[test]
    fn disabled_journal_creates_nothing() {
        let temp = tempdir().unwrap();
        let journal = ChangesetJournal::new(temp.path(), 0);

        assert!(journal.open_for_revision(Revision::new(1)).unwrap().is_none());
        assert!(ChangesetJournal::list(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn append_writes_verbatim() {
        let temp = tempdir().unwrap();
        let journal = ChangesetJournal::new(temp.path(), 2);

        let path = {
            let mut writer = journal.open_for_revision(Revision::new(7)).unwrap().unwrap();
            writer.append(b"Replica").unwrap();
            writer.append(b"Changes").unwrap();
            assert_eq!(writer.written(), 14);
            writer.path().to_path_buf()
        };

        assert_eq!(path, temp.path().join("changes7"));
        assert_eq!(fs::read(&path).unwrap(), b"ReplicaChanges");
    }

    #[test]
    fn reopening_same_revision_truncates() {
        let temp = tempdir().unwrap();
        let journal = ChangesetJournal::new(temp.path(), 1);

        let mut first = journal.open_for_revision(Revision::new(3)).unwrap().unwrap();
        first.append(b"first attempt").unwrap();
        drop(first);

        let mut second = journal.open_for_revision(Revision::new(3)).unwrap().unwrap();
        second.append(b"retry").unwrap();
        drop(second);

        assert_eq!(fs::read(temp.path().join("changes3")).unwrap(), b"retry");
    }

    #[test]
    fn prune_keeps_newest() {
        let temp = tempdir().unwrap();
        let journal = ChangesetJournal::new(temp.path(), 2);

        for rev in 1..=4 {
            journal.open_for_revision(Revision::new(rev)).unwrap();
        }

        let revisions: Vec<u64> = ChangesetJournal::list(temp.path())
            .unwrap()
            .iter()
            .map(|entry| entry.revision.as_u64())
            .collect();
        assert_eq!(revisions, vec![3, 4]);
    }

    #[test]
    fn list_ignores_other_files() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("record.baseA"), b"x").unwrap();
        fs::write(temp.path().join("changes9"), b"abc").unwrap();
        fs::create_dir(temp.path().join("changes10")).unwrap();

        let entries = ChangesetJournal::list(temp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].revision, Revision::new(9));
        assert_eq!(entries[0].size, 3);
    }
}
