//! ROM2 container format constants and low-level layout helpers.
//!
//! A ROM2 container is laid out as (all integers little-endian):
//!
//! ```text
//! magic[4] = "ROM2"
//! u16 val1, u16 val2          opaque engine metadata, passed through
//! u32 header_size             absolute offset where folder records end
//! u32 offset_mul              scale factor for all flat offsets
//! u8[16] checksum             MD5 digest of the folder records
//! ...folder records...        until header_size
//! ...data region...           from least_flat_offset * offset_mul
//! ```
//!
//! Each folder record is a `u32` entry count followed by fixed 12-byte
//! entries (`packed`, `flat_offset`, `length`), then the NUL-terminated
//! names referenced by each entry's 24-bit name pointer, padded to an
//! `offset_mul` boundary.

pub mod parser;
pub mod reader;

/// The ROM2 file signature (magic bytes).
pub const MAGIC: &[u8; 4] = b"ROM2";

/// Size of the fixed header in bytes: magic, `val1`, `val2`, `header_size`,
/// `offset_mul`, and the 16-byte checksum. Folder records start here.
pub const FIXED_HEADER_LEN: u64 = 32;

/// Length of the header checksum field (an MD5 digest).
pub const CHECKSUM_LEN: usize = 16;

/// Size of one fixed folder-record entry block.
pub const ENTRY_LEN: usize = 12;

/// Bit in an entry's packed word marking the entry as a folder.
pub const FOLDER_FLAG: u32 = 0x8000_0000;

/// Mask extracting the 24-bit name pointer from an entry's packed word.
pub const NAME_PTR_MASK: u32 = 0x00ff_ffff;

/// Rounds `value` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two; ROM2 scale factors always are.
#[inline]
pub const fn align_up(value: u64, alignment: u32) -> u64 {
    let a = alignment as u64 - 1;
    (value + a) & !a
}
