//! Uuid command implementation.

use replidb_replication::{Replicator, ReplicatorConfig};
use std::path::Path;

/// Prints the replica's UUID, or an empty line if it has none.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let replicator = Replicator::new(path, ReplicatorConfig::default());
    println!("{}", replicator.get_uuid());
    Ok(())
}
