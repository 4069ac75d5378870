//! Benchmark utilities.

#![warn(missing_docs)]

use rand::seq::index;
use rand::Rng;
use replidb_testkit::ChangesetBuilder;

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Pick `count` distinct random block indexes below `4 * count`.
pub fn block_indexes(count: usize) -> Vec<u32> {
    let limit = u32::try_from(count.saturating_mul(4)).unwrap_or(u32::MAX);
    let count = count.min(limit as usize);
    index::sample(&mut rand::thread_rng(), limit as usize, count)
        .into_iter()
        .filter_map(|index| u32::try_from(index).ok())
        .collect()
}

/// Build a changeset writing `count` random blocks of `block_size` bytes to
/// table `t`, at the indexes chosen by [`block_indexes`].
pub fn block_changeset(count: usize, block_size: usize) -> Vec<u8> {
    let blocks: Vec<(u32, Vec<u8>)> = block_indexes(count)
        .into_iter()
        .map(|index| (index, random_data(block_size)))
        .collect();
    let refs: Vec<(u32, &[u8])> = blocks
        .iter()
        .map(|(index, data)| (*index, data.as_slice()))
        .collect();

    ChangesetBuilder::new(1, 2)
        .blocks("t", block_size as u64, &refs)
        .build()
}

/// Build a changeset replacing `t.baseA` with `size` random bytes.
pub fn base_file_changeset(size: usize) -> Vec<u8> {
    ChangesetBuilder::new(1, 2)
        .base_file("t", b'A', &random_data(size))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn block_indexes_are_distinct() {
        let indexes = block_indexes(500);
        assert_eq!(indexes.len(), 500);
        assert!(indexes.iter().all(|&index| index < 2000));
        let unique: HashSet<u32> = indexes.iter().copied().collect();
        assert_eq!(unique.len(), indexes.len());
    }

    #[test]
    fn no_blocks() {
        assert!(block_indexes(0).is_empty());
        assert!(block_changeset(0, 16).starts_with(b"ReplicaChanges"));
    }
}
