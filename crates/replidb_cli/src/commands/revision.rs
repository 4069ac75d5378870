//! Revision-at-least command implementation.

use replidb_codec::encode_uint;
use replidb_replication::revision_at_least;

/// Prints whether revision `a` is at least revision `b`.
pub fn run(a: u64, b: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", compare(a, b)?);
    Ok(())
}

/// Compares two revisions through their wire encoding.
pub fn compare(a: u64, b: u64) -> Result<bool, Box<dyn std::error::Error>> {
    Ok(revision_at_least(&encode_uint(a), &encode_uint(b))?)
}
