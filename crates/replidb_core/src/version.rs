//! The VERSION file: database identity and format version.
//!
//! ## Layout
//!
//! ```text
//! | magic "RDBV" (4) | format version u16 LE (2) | uuid (16) | crc32 u32 LE (4) |
//! ```
//!
//! The CRC covers every byte before it. A file that fails any check is
//! rejected as a whole.

use crate::dir::version_path;
use crate::error::{CoreError, CoreResult};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Magic bytes for the VERSION file.
pub const VERSION_MAGIC: [u8; 4] = *b"RDBV";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

const FILE_SIZE: usize = 4 + 2 + 16 + 4;

/// The decoded contents of a VERSION file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionFile {
    /// Format version the database was created with.
    pub format_version: u16,
    /// Identity of the database, shared by a master and its replicas.
    pub uuid: Uuid,
}

impl VersionFile {
    /// Creates a VERSION file with a freshly generated UUID.
    ///
    /// The file is written to a temporary path and renamed into place.
    pub fn create(db_path: &Path) -> CoreResult<Self> {
        Self::create_with_uuid(db_path, Uuid::new_v4())
    }

    /// Creates a VERSION file carrying the given UUID.
    ///
    /// Replicas use this to adopt the identity of their master.
    pub fn create_with_uuid(db_path: &Path, uuid: Uuid) -> CoreResult<Self> {
        let version = Self {
            format_version: FORMAT_VERSION,
            uuid,
        };
        let target = version_path(db_path);
        let tmp = target.with_extension("tmp");
        replidb_storage::replace_file(&tmp, &target, &version.encode())?;
        Ok(version)
    }

    /// Reads and validates the VERSION file of the database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, has the wrong size, magic or
    /// format version, or fails its checksum.
    pub fn read_and_check(db_path: &Path) -> CoreResult<Self> {
        let data = fs::read(version_path(db_path))?;
        Self::decode(&data)
    }

    /// Returns the hyphenated UUID string.
    #[must_use]
    pub fn uuid_string(&self) -> String {
        self.uuid.hyphenated().to_string()
    }

    /// Encodes the file contents.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FILE_SIZE);
        buf.extend_from_slice(&VERSION_MAGIC);
        buf.extend_from_slice(&self.format_version.to_le_bytes());
        buf.extend_from_slice(self.uuid.as_bytes());
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Decodes and validates file contents.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        if data.len() != FILE_SIZE {
            return Err(CoreError::invalid_format(format!(
                "VERSION file has size {}, expected {FILE_SIZE}",
                data.len()
            )));
        }
        if data[0..4] != VERSION_MAGIC {
            return Err(CoreError::invalid_format("invalid VERSION magic"));
        }

        let body = &data[..FILE_SIZE - 4];
        let expected = u32::from_le_bytes([data[22], data[23], data[24], data[25]]);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(CoreError::ChecksumMismatch { expected, actual });
        }

        let format_version = u16::from_le_bytes([data[4], data[5]]);
        if format_version != FORMAT_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported format version: {format_version}"
            )));
        }

        let uuid = Uuid::from_slice(&data[6..22])
            .map_err(|e| CoreError::invalid_format(format!("invalid uuid: {e}")))?;

        Ok(Self {
            format_version,
            uuid,
        })
    }
}
