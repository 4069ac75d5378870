//! Whole-file replacement via write, fsync and rename.
//!
//! Small files that must change atomically are written to a temporary path
//! in the same directory, synced, and renamed over the destination. Readers
//! see either the old contents or the new contents, never a mix.
//!
//! ## Rename failure on network filesystems
//!
//! An NFS server can perform a rename, crash before acknowledging it, and
//! then fail the client's retry because the source no longer exists. From
//! the client this looks like a failed rename even though the new file is in
//! place. [`commit_rename`] therefore checks whether the temporary file is
//! still present after a failed rename: if it is gone, the rename is taken
//! to have happened and [`RenameOutcome::AssumedAfterError`] is returned.
//! If it is still present, it is removed and the original error is
//! returned.

use crate::error::{StorageError, StorageResult};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// How a rename completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The rename reported success.
    Renamed,
    /// The rename reported an error but the source was gone afterwards.
    AssumedAfterError,
}

/// Writes `data` to `path`, truncating any previous contents, and syncs it.
///
/// The file is closed before this returns.
///
/// # Errors
///
/// Returns an error if the file cannot be created, written or synced.
pub fn write_synced(path: &Path, data: &[u8]) -> StorageResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

/// Renames `tmp` over `target`.
///
/// # Errors
///
/// Returns [`StorageError::RenameFailed`] if the rename fails and `tmp` still
/// exists afterwards.
pub fn commit_rename(tmp: &Path, target: &Path) -> StorageResult<RenameOutcome> {
    commit_rename_with(tmp, target, |from, to| fs::rename(from, to))
}

/// Like [`commit_rename`], with the rename operation supplied by the caller.
///
/// # Errors
///
/// Returns [`StorageError::RenameFailed`] if `rename` fails and `tmp` still
/// exists afterwards.
pub fn commit_rename_with<F>(tmp: &Path, target: &Path, rename: F) -> StorageResult<RenameOutcome>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let source = match rename(tmp, target) {
        Ok(()) => return Ok(RenameOutcome::Renamed),
        Err(err) => err,
    };

    // Removing the temporary file doubles as the existence check.
    match fs::remove_file(tmp) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(RenameOutcome::AssumedAfterError),
        _ => Err(StorageError::RenameFailed {
            from: tmp.to_path_buf(),
            to: target.to_path_buf(),
            source,
        }),
    }
}

/// Writes `data` to `tmp`, syncs it and renames it over `target`.
///
/// # Errors
///
/// Returns an error if writing fails or the rename fails with `tmp` still
/// present.
pub fn replace_file(tmp: &Path, target: &Path, data: &[u8]) -> StorageResult<RenameOutcome> {
    write_synced(tmp, data)?;
    commit_rename(tmp, target)
}

/// Syncs a directory so that entries created or renamed in it are durable.
///
/// On Windows, NTFS journaling covers directory metadata and there is no
/// equivalent call, so this is a no-op.
#[cfg(unix)]
pub fn sync_directory(dir: &Path) -> StorageResult<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

/// Syncs a directory so that entries created or renamed in it are durable.
#[cfg(not(unix))]
pub fn sync_directory(_dir: &Path) -> StorageResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn replace_creates_target() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("ttmp");
        let target = dir.path().join("t.baseA");

        let outcome = replace_file(&tmp, &target, &[1, 2, 3]).unwrap();
        assert_eq!(outcome, RenameOutcome::Renamed);
        assert_eq!(fs::read(&target).unwrap(), vec![1, 2, 3]);
        assert!(!tmp.exists());
    }

    #[test]
    fn replace_overwrites_existing_target() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("ttmp");
        let target = dir.path().join("t.baseA");
        fs::write(&target, b"old contents that are longer").unwrap();

        replace_file(&tmp, &target, b"new").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn write_synced_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"0123456789").unwrap();

        write_synced(&path, b"ab").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"ab");
    }

    #[test]
    fn failed_rename_with_source_gone_is_success() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("ttmp");
        let target = dir.path().join("t.baseB");
        write_synced(&tmp, b"payload").unwrap();

        // The rename takes effect but the acknowledgement is lost.
        let outcome = commit_rename_with(&tmp, &target, |from, to| {
            fs::rename(from, to)?;
            Err(io::Error::new(io::ErrorKind::Other, "stale NFS file handle"))
        })
        .unwrap();

        assert_eq!(outcome, RenameOutcome::AssumedAfterError);
        assert_eq!(fs::read(&target).unwrap(), b"payload");
    }

    #[test]
    fn failed_rename_with_source_present_is_error() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("ttmp");
        let target = dir.path().join("t.baseB");
        fs::write(&target, b"previous").unwrap();
        write_synced(&tmp, b"payload").unwrap();

        let result = commit_rename_with(&tmp, &target, |_, _| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        });

        assert!(matches!(result, Err(StorageError::RenameFailed { .. })));
        assert_eq!(fs::read(&target).unwrap(), b"previous");
        assert!(!tmp.exists(), "temporary file is cleaned up");
    }

    #[test]
    fn sync_directory_succeeds() {
        let dir = tempdir().unwrap();
        sync_directory(dir.path()).unwrap();
    }
}
