//! Comparison of encoded revision numbers.

use crate::error::{ReplicationError, ReplicationResult};
use replidb_codec::decode_uint;

/// Returns true if the revision encoded in `candidate` is at least the one
/// encoded in `target`.
///
/// Bytes after each encoded number are ignored.
///
/// # Errors
///
/// Returns [`ReplicationError::MalformedProtocol`] if either operand does not
/// start with a complete 64-bit revision number.
pub fn revision_at_least(candidate: &[u8], target: &[u8]) -> ReplicationResult<bool> {
    let (candidate, _) = decode_uint::<u64>(candidate)
        .map_err(|err| ReplicationError::codec("candidate revision", err))?;
    let (target, _) = decode_uint::<u64>(target)
        .map_err(|err| ReplicationError::codec("target revision", err))?;
    Ok(candidate >= target)
}
