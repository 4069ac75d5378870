//! Apply command implementation.

use replidb_replication::{ReaderConnection, Replicator, ReplicatorConfig};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::{Duration, Instant};

/// Outcome of applying a changeset file.
#[derive(Debug, Serialize)]
pub struct ApplyReport {
    /// Replica path.
    pub path: String,
    /// Start revision from the header.
    pub start_revision: u64,
    /// End revision from the header.
    pub end_revision: u64,
    /// New revision of the replica.
    pub revision: u64,
    /// Base files replaced, as `table.baseX`.
    pub base_files: Vec<String>,
    /// Data file blocks written.
    pub blocks_written: u64,
    /// Changeset bytes read.
    pub bytes: u64,
    /// Journal file, if journaling is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
}

/// Applies the changeset in `changeset` to the replica at `path`.
pub fn run(
    path: &Path,
    changeset: &Path,
    valid: bool,
    timeout_secs: u64,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ReplicatorConfig::from_env();
    let report = apply(path, changeset, valid, Duration::from_secs(timeout_secs), config)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => {
            println!(
                "Applied changeset {} -> {} ({} base files, {} blocks, {} bytes)",
                report.start_revision,
                report.end_revision,
                report.base_files.len(),
                report.blocks_written,
                report.bytes
            );
            println!("Replica revision: {}", report.revision);
            if let Some(journal) = &report.journal {
                println!("Journaled to {journal}");
            }
        }
    }
    Ok(())
}

/// Applies a changeset file and reports what changed.
pub fn apply(
    path: &Path,
    changeset: &Path,
    valid: bool,
    timeout: Duration,
    config: ReplicatorConfig,
) -> Result<ApplyReport, Box<dyn std::error::Error>> {
    let file = File::open(changeset)
        .map_err(|err| format!("cannot open changeset {}: {err}", changeset.display()))?;
    let mut conn = ReaderConnection::new(BufReader::new(file));

    let replicator = Replicator::new(path, config);
    let summary = replicator.apply_changeset(&mut conn, Instant::now() + timeout, valid)?;

    Ok(ApplyReport {
        path: path.display().to_string(),
        start_revision: summary.start_revision.as_u64(),
        end_revision: summary.end_revision.as_u64(),
        revision: summary.required_revision.as_u64(),
        base_files: summary
            .base_files
            .iter()
            .map(|write| format!("{}.base{}", write.table, write.slot))
            .collect(),
        blocks_written: summary.blocks_written(),
        bytes: summary.bytes,
        journal: summary.journal.map(|journal| journal.display().to_string()),
    })
}
