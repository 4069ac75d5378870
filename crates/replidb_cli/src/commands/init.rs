//! Init command implementation.

use replidb_core::{DatabaseDir, VersionFile};
use std::path::Path;

/// Creates a replica directory with a fresh VERSION file.
///
/// An existing VERSION file is kept, and must be valid.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let uuid = init(path)?;
    println!("Replica at {} has UUID {uuid}", path.display());
    Ok(())
}

/// Initialises the directory and returns its UUID.
pub fn init(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let dir = DatabaseDir::open(path, true)?;
    let version = if dir.version_path().exists() {
        tracing::info!(path = %path.display(), "replica already initialised");
        VersionFile::read_and_check(dir.path())?
    } else {
        VersionFile::create(dir.path())?
    };
    Ok(version.uuid_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_is_idempotent() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("replica");

        let first = init(&path).unwrap();
        let second = init(&path).unwrap();

        assert_eq!(first.len(), 36);
        assert_eq!(first, second);
    }
}
