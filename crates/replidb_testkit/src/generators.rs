//! Property-based test generators using proptest.
//!
//! Strategies here only produce well-formed changesets; malformed input is
//! derived from them by the tests themselves (truncation, byte flips).

use crate::builder::ChangesetBuilder;
use proptest::prelude::*;

/// Strategy for valid table names.
pub fn table_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,12}").expect("Invalid regex")
}

/// Strategy for `(start, end)` with `end > start`.
pub fn revision_range_strategy() -> impl Strategy<Value = (u64, u64)> {
    (0u64..u64::MAX - 1, 1u64..1_000).prop_map(|(start, step)| (start, start.saturating_add(step)))
}

/// Strategy for a base file slot tag.
pub fn slot_strategy() -> impl Strategy<Value = u8> {
    prop_oneof![Just(b'A'), Just(b'B')]
}

/// One item of a generated changeset.
#[derive(Debug, Clone)]
pub enum ItemSpec {
    /// Replace `table.base<slot>` with `data`.
    BaseFile {
        /// Table name.
        table: String,
        /// Slot tag.
        slot: u8,
        /// New contents.
        data: Vec<u8>,
    },
    /// Write blocks of `block_size` bytes to `table.DB`.
    Blocks {
        /// Table name.
        table: String,
        /// Block size.
        block_size: u64,
        /// Block index and contents.
        blocks: Vec<(u32, Vec<u8>)>,
    },
}

/// Strategy for a single base file or block item.
pub fn item_strategy() -> impl Strategy<Value = ItemSpec> {
    let base = (
        table_name_strategy(),
        slot_strategy(),
        prop::collection::vec(any::<u8>(), 0..256),
    )
        .prop_map(|(table, slot, data)| ItemSpec::BaseFile { table, slot, data });

    let blocks = (table_name_strategy(), 1u64..64)
        .prop_flat_map(|(table, block_size)| {
            let block = (0u32..32, prop::collection::vec(any::<u8>(), block_size as usize));
            (
                Just(table),
                Just(block_size),
                prop::collection::vec(block, 0..8),
            )
        })
        .prop_map(|(table, block_size, blocks)| ItemSpec::Blocks {
            table,
            block_size,
            blocks,
        });

    prop_oneof![base, blocks]
}

/// A generated well-formed changeset.
#[derive(Debug, Clone)]
pub struct ChangesetSpec {
    /// Start revision.
    pub start: u64,
    /// End revision.
    pub end: u64,
    /// Items in order.
    pub items: Vec<ItemSpec>,
}

impl ChangesetSpec {
    /// Encodes the changeset.
    pub fn build(&self) -> Vec<u8> {
        self.items
            .iter()
            .fold(ChangesetBuilder::new(self.start, self.end), |builder, item| match item {
                ItemSpec::BaseFile { table, slot, data } => builder.base_file(table, *slot, data),
                ItemSpec::Blocks {
                    table,
                    block_size,
                    blocks,
                } => {
                    let blocks: Vec<(u32, &[u8])> = blocks
                        .iter()
                        .map(|(index, data)| (*index, data.as_slice()))
                        .collect();
                    builder.blocks(table, *block_size, &blocks)
                }
            })
            .build()
    }
}

/// Strategy for well-formed changesets.
pub fn changeset_strategy() -> impl Strategy<Value = ChangesetSpec> {
    (
        revision_range_strategy(),
        prop::collection::vec(item_strategy(), 0..6),
    )
        .prop_map(|((start, end), items)| ChangesetSpec { start, end, items })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for tests that touch the filesystem.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn table_names_are_lowercase(name in table_name_strategy()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.bytes().all(|b| b.is_ascii_lowercase()));
        }

        #[test]
        fn revision_ranges_increase((start, end) in revision_range_strategy()) {
            prop_assert!(end > start);
        }

        #[test]
        fn changesets_start_with_magic(spec in changeset_strategy()) {
            prop_assert!(spec.build().starts_with(b"ReplicaChanges"));
        }
    }
}
