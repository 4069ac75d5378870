//! In-place block patching of a table's data file.

use crate::connection::Connection;
use crate::error::{ReplicationError, ReplicationResult};
use crate::stream::ChangesetStream;
use replidb_core::{DatabaseDir, TableName};
use replidb_storage::{FileBackend, StorageBackend, StorageError};
use tracing::{debug, trace};

/// Block writes made by one changeset item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockWrites {
    /// Table whose data file was patched.
    pub table: String,
    /// Size of every block in the item.
    pub block_size: u32,
    /// Number of blocks written.
    pub blocks: u64,
}

/// Where a block write failed.
#[derive(Debug)]
enum BlockFailure {
    Replication(ReplicationError),
    Storage(StorageError),
}

impl From<ReplicationError> for BlockFailure {
    fn from(err: ReplicationError) -> Self {
        Self::Replication(err)
    }
}

/// Applies one block sequence item to the table's data file.
///
/// The stream is positioned after the table name. The data file is created
/// if missing and synced once after the last block.
pub(crate) fn apply_blocks<C: Connection + ?Sized>(
    stream: &mut ChangesetStream<'_, C>,
    dir: &DatabaseDir,
    table: &TableName,
) -> ReplicationResult<BlockWrites> {
    let block_size = stream.decode("block size", |d| d.uint::<u32>())?;
    if block_size == 0 {
        return Err(ReplicationError::malformed(format!(
            "zero block size for table {table}"
        )));
    }

    let path = dir.data_path(table);
    let mut data = FileBackend::open(&path)
        .map_err(|err| ReplicationError::from_storage(table.as_str(), &path, err))?;

    let blocks =
        write_blocks(stream, &mut data, table, block_size).map_err(|failure| match failure {
            BlockFailure::Replication(err) => err,
            BlockFailure::Storage(err) => {
                ReplicationError::from_storage(table.as_str(), &path, err)
            }
        })?;

    debug!(table = %table, block_size, blocks, "patched data file");
    Ok(BlockWrites {
        table: table.to_string(),
        block_size,
        blocks,
    })
}

/// Copies blocks from the stream into `data` until the terminating
/// reference, then syncs `data`.
fn write_blocks<C, B>(
    stream: &mut ChangesetStream<'_, C>,
    data: &mut B,
    table: &TableName,
    block_size: u32,
) -> Result<u64, BlockFailure>
where
    C: Connection + ?Sized,
    B: StorageBackend,
{
    let len = block_size as usize;
    let mut count = 0u64;

    loop {
        let block_ref = stream.decode("block number", |d| d.uint::<u32>())?;
        let Some(block) = block_ref.checked_sub(1) else {
            break;
        };

        stream.fill(len)?;
        if stream.buf().len() < len {
            return Err(ReplicationError::malformed(format!(
                "incomplete block {block} for table {table}: expected {len} bytes, got {}",
                stream.buf().len()
            ))
            .into());
        }

        let offset = u64::from(block) * u64::from(block_size);
        data.write_at(offset, &stream.buf()[..len])
            .map_err(BlockFailure::Storage)?;
        stream.consume(len);
        count += 1;
        trace!(table = %table, block, "wrote block");
    }

    data.sync().map_err(BlockFailure::Storage)?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MemoryConnection;
    use replidb_codec::put_uint;
    use replidb_storage::InMemoryBackend;
    use std::time::{Duration, Instant};

    fn blocks_body(items: &[(u32, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (block, data) in items {
            put_uint(&mut body, u64::from(*block) + 1);
            body.extend_from_slice(data);
        }
        body.push(0);
        body
    }

    fn run(
        body: Vec<u8>,
        backend: &mut InMemoryBackend,
        block_size: u32,
    ) -> Result<(u64, usize), BlockFailure> {
        run_over(MemoryConnection::changeset(body).with_max_chunk(3), backend, block_size)
    }

    fn run_over(
        mut conn: MemoryConnection,
        backend: &mut InMemoryBackend,
        block_size: u32,
    ) -> Result<(u64, usize), BlockFailure> {
        let deadline = Instant::now() + Duration::from_secs(30);
        conn.get_message_chunked(deadline)?;
        let mut stream = ChangesetStream::new(&mut conn, deadline, 8);
        let table = TableName::parse(b"t").map_err(ReplicationError::from)?;
        let count = write_blocks(&mut stream, backend, &table, block_size)?;
        Ok((count, stream.drain_remaining()?))
    }

    #[test]
    fn block_completed_by_final_read() {
        let mut backend = InMemoryBackend::new();
        let mut body = blocks_body(&[(1, &[0xcc; 12][..])]);
        // Drop the terminator so the block data is the last of the body.
        body.pop();
        let conn = MemoryConnection::changeset(body).with_max_chunk(3).with_eager_end();

        let err = run_over(conn, &mut backend, 12).unwrap_err();
        let BlockFailure::Replication(err) = err else {
            panic!("expected a protocol error");
        };
        assert!(err.to_string().contains("block number"), "{err}");
        assert_eq!(&backend.data()[12..24], &[0xcc; 12]);
    }

    #[test]
    fn writes_at_block_offsets() {
        let mut backend = InMemoryBackend::new();
        let body = blocks_body(&[(0, &[0xaa; 4][..]), (2, &[0xbb; 4][..])]);

        let (count, rest) = run(body, &mut backend, 4).unwrap();
        assert_eq!(count, 2);
        assert_eq!(rest, 0);

        let data = backend.data();
        assert_eq!(data.len(), 12);
        assert_eq!(&data[0..4], &[0xaa; 4]);
        assert_eq!(&data[8..12], &[0xbb; 4]);
        assert_eq!(backend.sync_count(), 1);
    }

    #[test]
    fn overwrites_in_place() {
        let mut backend = InMemoryBackend::with_data(vec![1; 6]);
        let body = blocks_body(&[(1, &[7, 7][..])]);

        run(body, &mut backend, 2).unwrap();
        assert_eq!(backend.data(), vec![1, 1, 7, 7, 1, 1]);
    }

    #[test]
    fn terminator_stops_before_following_bytes() {
        let mut backend = InMemoryBackend::new();
        let mut body = blocks_body(&[]);
        body.extend_from_slice(&[0, 42]);

        let (count, rest) = run(body, &mut backend, 4).unwrap();
        assert_eq!(count, 0);
        assert_eq!(rest, 2);
        assert!(backend.data().is_empty());
        assert_eq!(backend.sync_count(), 1);
    }

    #[test]
    fn incomplete_block_is_malformed() {
        let mut backend = InMemoryBackend::new();
        let mut body = Vec::new();
        put_uint(&mut body, 1);
        body.extend_from_slice(&[1, 2, 3]);

        match run(body, &mut backend, 4) {
            Err(BlockFailure::Replication(ReplicationError::MalformedProtocol { message })) => {
                assert!(message.contains("incomplete block 0"));
            }
            _ => panic!("expected malformed error"),
        }
        assert!(backend.data().is_empty());
        assert_eq!(backend.sync_count(), 0);
    }

    #[test]
    fn oversized_block_number_is_malformed() {
        let mut backend = InMemoryBackend::new();
        let mut body = Vec::new();
        put_uint(&mut body, u64::from(u32::MAX) + 1);

        assert!(matches!(
            run(body, &mut backend, 4),
            Err(BlockFailure::Replication(ReplicationError::MalformedProtocol { .. }))
        ));
    }
}
