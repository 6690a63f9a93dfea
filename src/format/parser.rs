//! Streaming decoder for the ROM2 container header.
//!
//! The parser consumes the fixed header and the folder records in one
//! forward pass and leaves the cursor at the start of the data region.
//! Payload data is never touched here; the rebuild reads it later through
//! a second cursor.

use std::collections::BTreeMap;
use std::io::Read;

use crate::error::{Error, Result};
use crate::format::{
    align_up, CHECKSUM_LEN, ENTRY_LEN, FIXED_HEADER_LEN, FOLDER_FLAG, MAGIC, NAME_PTR_MASK,
};
use crate::read::{Archive, FileNode, Folder, FolderKey, FolderNode, Node};

use super::reader::SequentialReader;

/// Fixed entry fields read before the entry's name is known.
struct RawEntry {
    is_folder: bool,
    flat_offset: u32,
    length: u32,
}

/// Parses a complete container header into an [`Archive`].
///
/// On success the cursor sits at the first byte of the data region, having
/// consumed the header and any padding before the first file.
pub(crate) fn parse<R: Read>(r: &mut SequentialReader<R>) -> Result<Archive> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(Error::BadMagic { found: magic });
    }

    let val1 = r.read_u16_le()?;
    let val2 = r.read_u16_le()?;
    let header_size = r.read_u32_le()?;
    let offset_mul = r.read_u32_le()?;
    if offset_mul == 0 || !offset_mul.is_power_of_two() {
        return Err(Error::IntegrityError {
            detail: format!("offset multiplier {offset_mul} is not a power of two"),
        });
    }

    // The checksum covers the folder records; nothing validates it on the
    // way in since the engine re-derives every offset anyway.
    r.skip(CHECKSUM_LEN as u64)?;

    let header_start = r.position();
    debug_assert_eq!(header_start, FIXED_HEADER_LEN);
    log::debug!(
        "ROM2 header: val1={val1:#x} val2={val2:#x} header_size={header_size:#x} offset_mul={offset_mul}"
    );

    let mut folders = BTreeMap::new();
    let mut least_flat: Option<u32> = None;

    while r.position() < header_size as u64 {
        let start = r.position();
        let rel_start = start - header_start;
        if rel_start % offset_mul as u64 != 0 {
            return Err(Error::AlignmentError {
                position: start,
                alignment: offset_mul,
            });
        }
        let key = FolderKey((rel_start / offset_mul as u64) as u32);

        let count = r.read_u32_le()?;
        if count == 0 {
            return Err(Error::IntegrityError {
                detail: format!("{key} at {start:#x} has no entries"),
            });
        }

        // Values section: fixed 12-byte blocks, keyed by name pointer so
        // the names section can match them up afterwards.
        let mut pending: BTreeMap<u32, RawEntry> = BTreeMap::new();
        let mut record_len = 0u32;
        for i in 0..count {
            let packed = r.read_u32_le()?;
            let flat_offset = r.read_u32_le()?;
            let length = r.read_u32_le()?;
            let is_folder = packed & FOLDER_FLAG != 0;

            // The self entry's length field doubles as the record length.
            if i == 0 {
                record_len = length;
            }
            if !is_folder && flat_offset > 0 {
                least_flat = Some(match least_flat {
                    Some(least) => least.min(flat_offset),
                    None => flat_offset,
                });
            }
            pending.insert(
                packed & NAME_PTR_MASK,
                RawEntry {
                    is_folder,
                    flat_offset,
                    length,
                },
            );
        }

        let fixed_len = 4 + count as u64 * ENTRY_LEN as u64;
        if (record_len as u64) < fixed_len {
            return Err(Error::IntegrityError {
                detail: format!(
                    "{key} record length {record_len} shorter than its {count} entry blocks"
                ),
            });
        }

        // Names section: entries are interleaved non-contiguously, so skip
        // a byte at a time until the record-relative position matches a
        // pending name pointer, bounded by the record length.
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let raw = loop {
                let rel = (r.position() - start) as u32;
                if let Some(raw) = pending.remove(&rel) {
                    break raw;
                }
                if rel >= record_len {
                    return Err(Error::IntegrityError {
                        detail: format!("name pointer scan ran past the end of {key}"),
                    });
                }
                r.skip(1)?;
            };
            let name = r.read_cstr()?;
            entries.push(if raw.is_folder {
                Node::Folder(FolderNode {
                    name,
                    key: FolderKey(raw.flat_offset),
                    length: Some(raw.length),
                })
            } else {
                Node::File(FileNode {
                    name,
                    flat_offset: Some(raw.flat_offset),
                    length: Some(raw.length),
                    token: None,
                    payload: None,
                })
            });
        }

        log::trace!("parsed {key} at {start:#x}: {count} entries");
        folders.insert(key, Folder { entries });

        // Records are packed back to back, each aligned up from its
        // recorded length.
        r.skip_to(align_up(start + record_len as u64, offset_mul))?;
    }

    // The data region starts at the smallest nonzero file offset. An
    // all-folder container has no data region; place the boundary right
    // after the header so the writer still produces a valid layout.
    let least_flat_offset = match least_flat {
        Some(least) => {
            let data_offset = least as u64 * offset_mul as u64;
            // A data region inside the header means overlapping regions;
            // skip_to reports that as an out-of-order access.
            r.skip_to(data_offset)?;
            least
        }
        None => (align_up(header_size as u64, offset_mul) / offset_mul as u64) as u32,
    };

    Ok(Archive {
        val1,
        val2,
        header_start,
        offset_mul,
        least_flat_offset,
        folders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn le16(v: u16) -> [u8; 2] {
        v.to_le_bytes()
    }
    fn le32(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }

    /// Builds a minimal single-folder container: root holding `.`/`..` and
    /// one file `a` whose 4 payload bytes sit at flat offset 5 (mul 16).
    fn tiny_image() -> Vec<u8> {
        let mut img = Vec::new();
        img.extend_from_slice(MAGIC);
        img.extend_from_slice(&le16(7));
        img.extend_from_slice(&le16(9));

        // Root record: count + 3 entries + ".\0..\0a\0" = 4 + 36 + 7 = 47
        let record_len = 47u32;
        img.extend_from_slice(&le32(32 + 48)); // header_size (record aligned to 48)
        img.extend_from_slice(&le32(16)); // offset_mul
        img.extend_from_slice(&[0u8; CHECKSUM_LEN]); // checksum, unchecked

        let mut rec = Vec::new();
        rec.extend_from_slice(&le32(3));
        // ".": folder, name ptr 40, key 0, record length
        rec.extend_from_slice(&le32(FOLDER_FLAG | 40));
        rec.extend_from_slice(&le32(0));
        rec.extend_from_slice(&le32(record_len));
        // "..": folder, name ptr 42, key 0
        rec.extend_from_slice(&le32(FOLDER_FLAG | 42));
        rec.extend_from_slice(&le32(0));
        rec.extend_from_slice(&le32(record_len));
        // "a": file, name ptr 45, flat 5, length 4
        rec.extend_from_slice(&le32(45));
        rec.extend_from_slice(&le32(5));
        rec.extend_from_slice(&le32(4));
        rec.extend_from_slice(b".\0..\0a\0");
        assert_eq!(rec.len(), record_len as usize);
        rec.resize(48, 0);
        img.extend_from_slice(&rec);

        // Data region at 5 * 16 = 80
        img.resize(80, 0);
        img.extend_from_slice(b"DATA");
        img.resize(96, 0);
        img
    }

    #[test]
    fn test_parse_tiny_image() {
        let mut r = SequentialReader::new(Cursor::new(tiny_image()));
        let archive = parse(&mut r).unwrap();

        assert_eq!(archive.val1, 7);
        assert_eq!(archive.val2, 9);
        assert_eq!(archive.offset_mul(), 16);
        assert_eq!(archive.least_flat_offset(), 5);
        assert_eq!(archive.data_offset(), 80);
        assert_eq!(archive.folder_count(), 1);

        let root = archive.root().unwrap();
        assert_eq!(root.len(), 3);
        assert_eq!(root.entries()[0].name(), ".");
        assert_eq!(root.entries()[1].name(), "..");
        let file = root.entries()[2].as_file().unwrap();
        assert_eq!(file.name, "a");
        assert_eq!(file.flat_offset, Some(5));
        assert_eq!(file.length, Some(4));
        assert!(file.token.is_none());

        // Parser leaves the cursor at the data boundary
        assert_eq!(r.position(), 80);
    }

    #[test]
    fn test_bad_magic() {
        let mut img = tiny_image();
        img[..4].copy_from_slice(b"ROM ");
        let mut r = SequentialReader::new(Cursor::new(img));
        assert!(matches!(
            parse(&mut r),
            Err(Error::BadMagic { found }) if &found == b"ROM "
        ));
    }

    #[test]
    fn test_truncated_records() {
        let img = tiny_image();
        let mut r = SequentialReader::new(Cursor::new(img[..40].to_vec()));
        assert!(matches!(parse(&mut r), Err(Error::UnexpectedEnd { .. })));
    }

    #[test]
    fn test_bogus_offset_mul() {
        let mut img = tiny_image();
        img[12..16].copy_from_slice(&le32(12)); // not a power of two
        let mut r = SequentialReader::new(Cursor::new(img));
        assert!(matches!(parse(&mut r), Err(Error::IntegrityError { .. })));
    }

    #[test]
    fn test_name_scan_bounded_by_record_length() {
        let mut img = tiny_image();
        // Point the file entry's name pointer past the record so the scan
        // runs off the end.
        img[32 + 28..32 + 32].copy_from_slice(&le32(60));
        let mut r = SequentialReader::new(Cursor::new(img));
        assert!(matches!(parse(&mut r), Err(Error::IntegrityError { .. })));
    }
}
