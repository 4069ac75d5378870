//! Changeset wire format constants.
//!
//! ```text
//! changeset := MAGIC version startrev endrev type item* 0x00 reqrev
//! item      := itemtype tablename payload
//! base      := slot size bytes[size]
//! blocks    := blocksize (blockref bytes[blocksize])* 0
//! ```
//!
//! All integers are base-128 unsigned (see `replidb_codec`). A `blockref`
//! is the target block index plus one, so that zero can end the sequence.

/// Marker at the start of every changeset.
pub const CHANGES_MAGIC: &[u8] = b"ReplicaChanges";

/// The only changeset format version this build understands.
pub const CHANGES_VERSION: u32 = 1;

/// The kind of changes carried by a changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangesetType {
    /// Ordinary changes made through committed revisions.
    Normal,
    /// Changes made with in-place modification enabled on the master.
    /// Reserved; replicas reject it.
    Dangerous,
}

impl ChangesetType {
    /// Returns the wire byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Dangerous => 1,
        }
    }

    /// Parses a wire byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Normal),
            1 => Some(Self::Dangerous),
            _ => None,
        }
    }
}

/// Tag preceding each item in the changeset body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    /// End of the item list; the footer follows.
    End,
    /// Replacement of one base file slot.
    BaseFile,
    /// A sequence of block writes to the data file.
    Blocks,
}

impl ItemType {
    /// Returns the wire byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::End => 0,
            Self::BaseFile => 1,
            Self::Blocks => 2,
        }
    }

    /// Parses a wire byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::End),
            1 => Some(Self::BaseFile),
            2 => Some(Self::Blocks),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changeset_type_bytes() {
        for ty in [ChangesetType::Normal, ChangesetType::Dangerous] {
            assert_eq!(ChangesetType::from_byte(ty.as_byte()), Some(ty));
        }
        assert_eq!(ChangesetType::from_byte(2), None);
    }

    #[test]
    fn item_type_bytes() {
        for ty in [ItemType::End, ItemType::BaseFile, ItemType::Blocks] {
            assert_eq!(ItemType::from_byte(ty.as_byte()), Some(ty));
        }
        assert_eq!(ItemType::from_byte(3), None);
        assert_eq!(ItemType::from_byte(0xff), None);
    }
}
