//! Decoding of unsigned integers and length-prefixed strings.

use crate::error::{CodecError, CodecResult};

/// Decode a base-128 unsigned integer from the start of `buf`.
///
/// Groups of seven bits are stored least significant first; a set high bit
/// means another group follows. Returns the value and the number of bytes
/// consumed.
///
/// # Errors
///
/// Returns [`CodecError::UnexpectedEof`] if `buf` ends before a terminating
/// group, or [`CodecError::IntegerOverflow`] if the value does not fit `T`.
pub fn decode_uint<T: TryFrom<u64>>(buf: &[u8]) -> CodecResult<(T, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;

    for (index, &byte) in buf.iter().enumerate() {
        let group = u64::from(byte & 0x7f);
        if shift >= u64::BITS || (group << shift) >> shift != group {
            return Err(CodecError::IntegerOverflow);
        }
        value |= group << shift;

        if byte & 0x80 == 0 {
            let value = T::try_from(value).map_err(|_| CodecError::IntegerOverflow)?;
            return Ok((value, index + 1));
        }
        shift += 7;
    }

    Err(CodecError::unexpected_eof("unsigned integer"))
}

/// Decode a length-prefixed byte string from the start of `buf`.
///
/// The returned slice borrows from `buf`. The second element is the total
/// number of bytes consumed, prefix included.
///
/// # Errors
///
/// Returns an error if the prefix is malformed or fewer bytes remain than
/// the prefix declares.
pub fn decode_string(buf: &[u8]) -> CodecResult<(&[u8], usize)> {
    let (len, prefix) = decode_uint::<usize>(buf)?;
    let end = prefix
        .checked_add(len)
        .ok_or(CodecError::IntegerOverflow)?;
    if end > buf.len() {
        return Err(CodecError::unexpected_eof("string body"));
    }
    Ok((&buf[prefix..end], end))
}

/// A cursor over a byte slice that decodes values in sequence.
///
/// The cursor tracks how many bytes have been consumed, which callers use to
/// account for exactly the bytes they have read.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next unsigned integer.
    pub fn uint<T: TryFrom<u64>>(&mut self) -> CodecResult<T> {
        let (value, used) = decode_uint(self.remaining())?;
        self.pos += used;
        Ok(value)
    }

    /// Decode the next length-prefixed string.
    pub fn string(&mut self) -> CodecResult<&'a [u8]> {
        let data = self.data;
        let (value, used) = decode_string(&data[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    /// Read a single raw byte.
    #[inline]
    pub fn byte(&mut self) -> CodecResult<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(CodecError::unexpected_eof("byte"))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Consume `prefix` if the remaining input starts with it.
    ///
    /// Returns `false` and consumes nothing otherwise.
    pub fn strip_prefix(&mut self, prefix: &[u8]) -> bool {
        if self.remaining().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if all bytes have been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_single_byte() {
        assert_eq!(decode_uint::<u64>(&[0x00]).unwrap(), (0, 1));
        assert_eq!(decode_uint::<u64>(&[0x7f]).unwrap(), (127, 1));
    }

    #[test]
    fn decode_multi_byte_little_endian_groups() {
        // 300 = 0b10_0101100 -> 0xac 0x02
        assert_eq!(decode_uint::<u64>(&[0xac, 0x02]).unwrap(), (300, 2));
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        assert_eq!(decode_uint::<u32>(&[0x05, 0xff, 0xff]).unwrap(), (5, 1));
    }

    #[test]
    fn decode_truncated_fails() {
        assert_eq!(
            decode_uint::<u64>(&[0x80, 0x80]),
            Err(CodecError::unexpected_eof("unsigned integer"))
        );
        assert!(decode_uint::<u64>(&[]).is_err());
    }

    #[test]
    fn decode_u64_overflow_fails() {
        // Eleven groups cannot fit in 64 bits.
        let mut bytes = vec![0xff; 10];
        bytes.push(0x01);
        assert_eq!(decode_uint::<u64>(&bytes), Err(CodecError::IntegerOverflow));

        // Tenth group may only carry a single bit.
        let mut bytes = vec![0xff; 9];
        bytes.push(0x02);
        assert_eq!(decode_uint::<u64>(&bytes), Err(CodecError::IntegerOverflow));
    }

    #[test]
    fn decode_u64_max() {
        let mut bytes = vec![0xff; 9];
        bytes.push(0x01);
        assert_eq!(decode_uint::<u64>(&bytes).unwrap(), (u64::MAX, 10));
    }

    #[test]
    fn decode_narrow_width_overflow_fails() {
        // 2^32 does not fit a u32.
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x10];
        assert_eq!(decode_uint::<u32>(&bytes), Err(CodecError::IntegerOverflow));
        assert_eq!(decode_uint::<u64>(&bytes).unwrap(), (1 << 32, 5));
    }

    #[test]
    fn decode_string_basic() {
        let (s, used) = decode_string(&[3, b'a', b'b', b'c', 9]).unwrap();
        assert_eq!(s, b"abc");
        assert_eq!(used, 4);
    }

    #[test]
    fn decode_string_empty() {
        let (s, used) = decode_string(&[0]).unwrap();
        assert!(s.is_empty());
        assert_eq!(used, 1);
    }

    #[test]
    fn decode_string_short_body_fails() {
        assert_eq!(
            decode_string(&[4, b'a', b'b']),
            Err(CodecError::unexpected_eof("string body"))
        );
    }

    #[test]
    fn decoder_tracks_position() {
        let data = [b'M', b'G', 0x01, 0x02, b'x', 0xaa];
        let mut decoder = Decoder::new(&data);
        assert!(!decoder.strip_prefix(b"MX"));
        assert!(decoder.strip_prefix(b"MG"));
        assert_eq!(decoder.uint::<u32>().unwrap(), 1);
        assert_eq!(decoder.string().unwrap(), b"x");
        assert_eq!(decoder.position(), 5);
        assert_eq!(decoder.byte().unwrap(), 0xaa);
        assert!(decoder.is_empty());
        assert!(decoder.byte().is_err());
    }
}
