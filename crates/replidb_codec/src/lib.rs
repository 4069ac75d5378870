//! # ReplicaDB Codec
//!
//! Primitive encodings used by the ReplicaDB changeset format.
//!
//! Two primitives appear throughout the wire format and the on-disk
//! revision record:
//! - Unsigned integers in base-128 groups, least significant group first,
//!   with the high bit of each byte marking continuation
//! - Strings as an unsigned-integer length followed by that many raw bytes
//!
//! Encoding is canonical: every value has exactly one minimal encoding.
//! Decoding is strict about truncation and overflow, since changesets arrive
//! from the network and must be treated as untrusted.
//!
//! ## Usage
//!
//! ```
//! use replidb_codec::{decode_uint, encode_uint};
//!
//! let bytes = encode_uint(300);
//! let (value, used) = decode_uint::<u64>(&bytes).unwrap();
//! assert_eq!(value, 300);
//! assert_eq!(used, bytes.len());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;

pub use decoder::{decode_string, decode_uint, Decoder};
pub use encoder::{encode_string, encode_uint, put_string, put_uint};
pub use error::{CodecError, CodecResult};
