//! Encoding of unsigned integers and length-prefixed strings.

use bytes::BufMut;

/// Append the canonical base-128 encoding of `value` to `buf`.
pub fn put_uint(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80;
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Encode `value` as a standalone byte vector.
///
/// The output is always the shortest possible encoding.
#[must_use]
pub fn encode_uint(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    put_uint(&mut buf, value);
    buf
}

/// Append a length-prefixed string to `buf`.
pub fn put_string(buf: &mut impl BufMut, value: &[u8]) {
    put_uint(buf, value.len() as u64);
    buf.put_slice(value);
}

/// Encode a length-prefixed string as a standalone byte vector.
#[must_use]
pub fn encode_string(value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(value.len() + 2);
    put_string(&mut buf, value);
    buf
}
