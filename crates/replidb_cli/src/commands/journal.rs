//! Journal command implementation.

use replidb_replication::ChangesetJournal;
use serde::Serialize;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// A retained journal file.
#[derive(Debug, Serialize)]
pub struct JournalFile {
    /// Start revision of the changeset.
    pub revision: u64,
    /// File path.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Modification time in seconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<u64>,
}

/// Lists journal files, oldest first.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let files = list(path)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&files)?),
        _ => {
            if files.is_empty() {
                println!("No journal files in {}", path.display());
            }
            for file in &files {
                println!("{:>12}  {:>10} bytes  {}", file.revision, file.size, file.path);
            }
        }
    }
    Ok(())
}

/// Collects journal files in `path`.
pub fn list(path: &Path) -> Result<Vec<JournalFile>, Box<dyn std::error::Error>> {
    let entries = ChangesetJournal::list(path)?;
    Ok(entries
        .into_iter()
        .map(|entry| JournalFile {
            revision: entry.revision.as_u64(),
            path: entry.path.display().to_string(),
            size: entry.size,
            modified: entry
                .modified
                .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                .map(|age| age.as_secs()),
        })
        .collect())
}
