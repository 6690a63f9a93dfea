//! Header checksum computation.
//!
//! The fixed header carries an MD5 digest of the folder records (the bytes
//! between the fixed header and `header_size`). MD5 is a format obligation
//! here, not a security boundary; the engine writes it so downstream tools
//! that verify it stay happy, and ignores it on the way in.

use md5::{Digest, Md5};

use crate::format::CHECKSUM_LEN;

/// Computes the MD5 digest of the serialized folder records.
pub fn header_digest(records: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Md5::new();
    hasher.update(records);
    hasher.finalize().into()
}

/// Returns whether `expected` matches the digest of `records`.
pub fn verify(records: &[u8], expected: &[u8; CHECKSUM_LEN]) -> bool {
    &header_digest(records) == expected
}
