//! Folder record layout and serialization for the rebuild's header pass.
//!
//! The pass runs in two steps. [`plan`] walks the folder map once and
//! assigns every folder a record address in the new header, which fixes the
//! key each folder entry must store. [`encode`] then serializes all records
//! into one buffer: per record it reserves zeroed 12-byte entry blocks,
//! emits the names while noting where each one landed, and fixes the blocks
//! up afterwards with the final name pointers, keys, and lengths.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::format::{align_up, ENTRY_LEN, FOLDER_FLAG, NAME_PTR_MASK};
use crate::read::{Archive, Folder, FolderKey, Node, RESERVED_ENTRIES};

/// Where one folder's record lands in the new header.
pub(crate) struct RecordLayout {
    /// Record start relative to the header start, in bytes.
    pub rel_start: u64,
    /// Unaligned record length: count word, entry blocks, names.
    pub record_len: u32,
    /// The folder's address in `offset_mul` units, stored by every entry
    /// that references it.
    pub new_key: u32,
}

fn record_len(folder: &Folder) -> u64 {
    let names: u64 = folder
        .entries()
        .iter()
        .map(|e| e.name().len() as u64 + 1)
        .sum();
    4 + folder.len() as u64 * ENTRY_LEN as u64 + names
}

/// Assigns every folder a record address, packing records in key order.
pub(crate) fn plan(archive: &Archive) -> Result<BTreeMap<FolderKey, RecordLayout>> {
    let mul = archive.offset_mul();
    let mut layout = BTreeMap::new();
    let mut rel = 0u64;
    for (key, folder) in archive.folders() {
        if folder.len() < RESERVED_ENTRIES {
            return Err(Error::IntegrityError {
                detail: format!("{key} lacks its reserved entries"),
            });
        }
        let len = record_len(folder);
        // Name pointers are 24-bit, so every name must start below the mask.
        if len > NAME_PTR_MASK as u64 {
            return Err(Error::IntegrityError {
                detail: format!("{key} record length {len} exceeds the name pointer range"),
            });
        }
        layout.insert(
            key,
            RecordLayout {
                rel_start: rel,
                record_len: len as u32,
                new_key: (rel / mul as u64) as u32,
            },
        );
        rel = align_up(rel + len, mul);
    }
    Ok(layout)
}

fn folder_ref(layout: &BTreeMap<FolderKey, RecordLayout>, key: FolderKey) -> Result<&RecordLayout> {
    layout.get(&key).ok_or(Error::MissingMetadata {
        key: key.to_string(),
    })
}

/// Serializes all folder records into one buffer, padded to `offset_mul`
/// boundaries, exactly as they will appear after the fixed header.
pub(crate) fn encode(
    archive: &Archive,
    layout: &BTreeMap<FolderKey, RecordLayout>,
) -> Result<Vec<u8>> {
    let mul = archive.offset_mul();
    let mut buf = Vec::new();

    for (key, folder) in archive.folders() {
        let planned = folder_ref(layout, key)?;
        let start = buf.len();
        if start as u64 != planned.rel_start {
            return Err(Error::IntegrityError {
                detail: format!(
                    "{key} record started at {start:#x}, planned {:#x}",
                    planned.rel_start
                ),
            });
        }

        // The self entry comes first; its length field is what the decoder
        // trusts as the record length, and its address field must agree
        // with where this record actually sits.
        match folder.entries().first() {
            Some(Node::Folder(d)) if d.name == "." => {
                if folder_ref(layout, d.key)?.new_key != planned.new_key {
                    return Err(Error::IntegrityError {
                        detail: format!(
                            "self entry of {key} resolves to key {}, record sits at key {}",
                            folder_ref(layout, d.key)?.new_key,
                            planned.new_key
                        ),
                    });
                }
            }
            _ => {
                return Err(Error::IntegrityError {
                    detail: format!("first entry of {key} is not the self reference"),
                });
            }
        }

        buf.extend_from_slice(&(folder.len() as u32).to_le_bytes());

        // Reserve the entry blocks, emit the names, then fix the blocks up.
        let blocks_at = buf.len();
        buf.resize(blocks_at + folder.len() * ENTRY_LEN, 0);

        let mut name_ptrs = Vec::with_capacity(folder.len());
        for entry in folder.entries() {
            name_ptrs.push((buf.len() - start) as u32);
            buf.extend_from_slice(entry.name().as_bytes());
            buf.push(0);
        }

        let actual_len = (buf.len() - start) as u32;
        if actual_len != planned.record_len {
            return Err(Error::IntegrityError {
                detail: format!(
                    "{key} serialized to {actual_len} bytes, planned {}",
                    planned.record_len
                ),
            });
        }

        for (i, entry) in folder.entries().iter().enumerate() {
            let (packed, flat, length) = match entry {
                Node::Folder(d) => {
                    let target = folder_ref(layout, d.key)?;
                    (name_ptrs[i] | FOLDER_FLAG, target.new_key, target.record_len)
                }
                Node::File(f) => {
                    let describe = || Error::MissingMetadata {
                        key: match &f.token {
                            Some(t) => format!("file '{t}'"),
                            None => format!("file '{}'", f.name),
                        },
                    };
                    let flat = f.flat_offset.ok_or_else(describe)?;
                    let length = f.length.ok_or_else(describe)?;
                    (name_ptrs[i], flat, length)
                }
            };
            let block = &mut buf[blocks_at + i * ENTRY_LEN..blocks_at + (i + 1) * ENTRY_LEN];
            block[0..4].copy_from_slice(&packed.to_le_bytes());
            block[4..8].copy_from_slice(&flat.to_le_bytes());
            block[8..12].copy_from_slice(&length.to_le_bytes());
        }

        buf.resize(align_up(start as u64 + actual_len as u64, mul) as usize, 0);
    }
    Ok(buf)
}
