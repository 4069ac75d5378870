//! Fuzz targets for the changeset primitives.
//!
//! These can be driven by cargo-fuzz or called from property tests. They
//! must never panic on any input.

use replidb_codec::{decode_string, decode_uint, encode_uint, Decoder};
use replidb_core::changeset::CHANGES_MAGIC;

/// Decoding arbitrary bytes as an integer either fails or round-trips.
pub fn fuzz_decode_uint(data: &[u8]) {
    if let Ok((value, used)) = decode_uint::<u64>(data) {
        assert!(used <= data.len());
        // Non-canonical encodings (trailing zero groups) decode too, so only
        // the value is compared.
        let reencoded = encode_uint(value);
        let (again, _) = decode_uint::<u64>(&reencoded).expect("re-encoded value must decode");
        assert_eq!(again, value);
    }
}

/// Decoding arbitrary bytes as a string never reads past the input.
pub fn fuzz_decode_string(data: &[u8]) {
    if let Ok((value, used)) = decode_string(data) {
        assert!(used <= data.len());
        assert!(value.len() <= used);
    }
}

/// Walks a changeset header out of arbitrary bytes without panicking.
pub fn fuzz_changeset_header(data: &[u8]) {
    let mut decoder = Decoder::new(data);
    if !decoder.strip_prefix(CHANGES_MAGIC) {
        return;
    }
    let _ = decoder.uint::<u32>().and_then(|_| decoder.uint::<u64>());
    let _ = decoder.uint::<u64>();
    let _ = decoder.byte();
    assert!(decoder.position() <= data.len());
}
