//! Construction of changeset byte streams.
//!
//! [`ChangesetBuilder`] produces well-formed changesets by default. Every
//! field can be overridden so tests can produce the specific malformed
//! input they need.

use replidb_codec::{put_string, put_uint};
use replidb_core::changeset::{ChangesetType, ItemType, CHANGES_MAGIC, CHANGES_VERSION};

/// Builds a changeset body.
///
/// # Example
///
/// ```rust
/// use replidb_testkit::ChangesetBuilder;
///
/// let bytes = ChangesetBuilder::new(10, 11)
///     .base_file("t", b'A', &[1, 2, 3])
///     .build();
/// assert!(bytes.starts_with(b"ReplicaChanges"));
/// ```
#[derive(Debug, Clone)]
pub struct ChangesetBuilder {
    magic: Vec<u8>,
    version: u64,
    start: u64,
    end: u64,
    changeset_type: u8,
    items: Vec<u8>,
    end_marker: bool,
    required: Option<u64>,
    trailing: Vec<u8>,
}

impl ChangesetBuilder {
    /// Starts a normal changeset from `start` to `end`.
    ///
    /// The required revision defaults to `end`.
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            magic: CHANGES_MAGIC.to_vec(),
            version: u64::from(CHANGES_VERSION),
            start,
            end,
            changeset_type: ChangesetType::Normal.as_byte(),
            items: Vec::new(),
            end_marker: true,
            required: None,
            trailing: Vec::new(),
        }
    }

    /// Replaces the magic marker.
    #[must_use]
    pub fn magic(mut self, magic: &[u8]) -> Self {
        self.magic = magic.to_vec();
        self
    }

    /// Replaces the format version.
    #[must_use]
    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Replaces the changeset type byte.
    #[must_use]
    pub fn changeset_type(mut self, byte: u8) -> Self {
        self.changeset_type = byte;
        self
    }

    /// Sets the required revision in the footer.
    #[must_use]
    pub fn required(mut self, revision: u64) -> Self {
        self.required = Some(revision);
        self
    }

    /// Appends bytes after the footer.
    #[must_use]
    pub fn trailing(mut self, bytes: &[u8]) -> Self {
        self.trailing.extend_from_slice(bytes);
        self
    }

    /// Leaves out the end-of-items marker and the footer.
    #[must_use]
    pub fn without_end(mut self) -> Self {
        self.end_marker = false;
        self
    }

    /// Adds a base file item.
    ///
    /// `slot` is written as given, so invalid slots can be produced.
    #[must_use]
    pub fn base_file(mut self, table: &str, slot: u8, data: &[u8]) -> Self {
        self.items.push(ItemType::BaseFile.as_byte());
        put_string(&mut self.items, table.as_bytes());
        self.items.push(slot);
        put_uint(&mut self.items, data.len() as u64);
        self.items.extend_from_slice(data);
        self
    }

    /// Adds a block item writing `data` at each block index.
    ///
    /// Every data slice should be `block_size` bytes long.
    #[must_use]
    pub fn blocks(mut self, table: &str, block_size: u64, blocks: &[(u32, &[u8])]) -> Self {
        self.items.push(ItemType::Blocks.as_byte());
        put_string(&mut self.items, table.as_bytes());
        put_uint(&mut self.items, block_size);
        for (index, data) in blocks {
            put_uint(&mut self.items, u64::from(*index) + 1);
            self.items.extend_from_slice(data);
        }
        self.items.push(0);
        self
    }

    /// Appends raw bytes to the item section.
    #[must_use]
    pub fn raw_item(mut self, bytes: &[u8]) -> Self {
        self.items.extend_from_slice(bytes);
        self
    }

    /// Returns the changeset bytes.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut out = self.magic.clone();
        put_uint(&mut out, self.version);
        put_uint(&mut out, self.start);
        put_uint(&mut out, self.end);
        out.push(self.changeset_type);
        out.extend_from_slice(&self.items);
        if self.end_marker {
            out.push(ItemType::End.as_byte());
            put_uint(&mut out, self.required.unwrap_or(self.end));
        }
        out.extend_from_slice(&self.trailing);
        out
    }

    /// Returns the byte length of the header.
    #[must_use]
    pub fn header_len(&self) -> usize {
        Self::new(self.start, self.end)
            .magic(&self.magic)
            .version(self.version)
            .without_end()
            .build()
            .len()
    }
}
