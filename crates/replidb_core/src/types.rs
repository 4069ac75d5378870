//! Core type definitions for ReplicaDB.

use crate::error::{CoreError, CoreResult};
use replidb_codec::encode_uint;
use std::fmt;

/// A database revision number.
///
/// Revisions increase monotonically; each identifies a consistent state of
/// every table in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(pub u64);

impl Revision {
    /// Creates a new revision.
    #[must_use]
    pub const fn new(rev: u64) -> Self {
        Self(rev)
    }

    /// Returns the raw revision value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the wire encoding of this revision.
    #[must_use]
    pub fn encode(self) -> Vec<u8> {
        encode_uint(self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rev:{}", self.0)
    }
}

/// A validated table name: one or more lowercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Validates raw bytes as a table name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTableName`] if `raw` is empty or contains
    /// anything other than `a`-`z`.
    pub fn parse(raw: &[u8]) -> CoreResult<Self> {
        let name = String::from_utf8_lossy(raw).into_owned();
        if raw.is_empty() || !raw.iter().all(u8::is_ascii_lowercase) {
            return Err(CoreError::InvalidTableName { name });
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the two alternating base file slots of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseSlot {
    /// Slot `A`.
    A,
    /// Slot `B`.
    B,
}

impl BaseSlot {
    /// Both slots, in tag order.
    pub const ALL: [BaseSlot; 2] = [BaseSlot::A, BaseSlot::B];

    /// Parses a slot tag byte (`b'A'` or `b'B'`).
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'A' => Some(Self::A),
            b'B' => Some(Self::B),
            _ => None,
        }
    }

    /// Returns the slot tag byte.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::A => b'A',
            Self::B => b'B',
        }
    }
}

impl fmt::Display for BaseSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.tag()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_ordering_and_display() {
        assert!(Revision::new(10) < Revision::new(11));
        assert_eq!(format!("{}", Revision::new(42)), "rev:42");
        assert_eq!(Revision::new(300).encode(), vec![0xac, 0x02]);
    }

    #[test]
    fn table_name_accepts_lowercase() {
        assert_eq!(TableName::parse(b"postlist").unwrap().as_str(), "postlist");
        assert_eq!(TableName::parse(b"t").unwrap().to_string(), "t");
    }

    #[test]
    fn table_name_rejects_invalid() {
        for raw in [&b""[..], b"Post", b"a1", b"../x", b"a.b", b"\xff"] {
            assert!(
                matches!(TableName::parse(raw), Err(CoreError::InvalidTableName { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn base_slot_tags() {
        assert_eq!(BaseSlot::from_tag(b'A'), Some(BaseSlot::A));
        assert_eq!(BaseSlot::from_tag(b'B'), Some(BaseSlot::B));
        assert_eq!(BaseSlot::from_tag(b'C'), None);
        assert_eq!(BaseSlot::from_tag(b'a'), None);
        assert_eq!(BaseSlot::B.to_string(), "B");
    }
}
