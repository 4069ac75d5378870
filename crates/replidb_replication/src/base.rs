//! Whole-file replacement of a table's base file.

use crate::connection::Connection;
use crate::error::{ReplicationError, ReplicationResult};
use crate::stream::ChangesetStream;
use replidb_core::{BaseSlot, DatabaseDir, TableName};
use replidb_storage::{commit_rename, sync_directory, write_synced, RenameOutcome};
use tracing::{debug, warn};

/// A base file written by a changeset item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseFileWrite {
    /// Table the base file belongs to.
    pub table: String,
    /// Slot that was replaced.
    pub slot: BaseSlot,
    /// New size of the base file.
    pub size: usize,
}

/// Applies one base file item.
///
/// The stream is positioned after the table name. The payload is written to
/// the table's temporary file, synced and renamed over the slot's base file,
/// so the slot holds either its old or its new contents.
pub(crate) fn apply_base_file<C: Connection + ?Sized>(
    stream: &mut ChangesetStream<'_, C>,
    dir: &DatabaseDir,
    table: &TableName,
    sync_dir: bool,
) -> ReplicationResult<BaseFileWrite> {
    let (tag, size) = stream.decode("base file header", |d| Ok((d.byte()?, d.uint::<usize>()?)))?;
    let slot = BaseSlot::from_tag(tag).ok_or_else(|| {
        ReplicationError::malformed(format!(
            "invalid base file slot {:?} for table {table}",
            char::from(tag)
        ))
    })?;

    stream.fill(size)?;
    if stream.buf().len() < size {
        return Err(ReplicationError::malformed(format!(
            "base file for table {table} truncated: expected {size} bytes, got {}",
            stream.buf().len()
        )));
    }

    let tmp = dir.temp_path(table);
    write_synced(&tmp, &stream.buf()[..size])
        .map_err(|err| ReplicationError::from_storage(table.as_str(), &tmp, err))?;
    stream.consume(size);

    let target = dir.base_path(table, slot);
    match commit_rename(&tmp, &target) {
        Ok(RenameOutcome::Renamed) => {}
        Ok(RenameOutcome::AssumedAfterError) => {
            warn!(
                table = %table,
                slot = %slot,
                "rename reported failure but the temporary file is gone, assuming it succeeded"
            );
        }
        Err(err) => return Err(ReplicationError::from_storage(table.as_str(), &target, err)),
    }

    if sync_dir {
        sync_directory(dir.path())
            .map_err(|err| ReplicationError::from_storage(table.as_str(), dir.path(), err))?;
    }

    debug!(table = %table, slot = %slot, size, "replaced base file");
    Ok(BaseFileWrite {
        table: table.to_string(),
        slot,
        size,
    })
}
