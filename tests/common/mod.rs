//! Shared fixtures: an in-memory ROM2 image builder and lookup helpers.
//!
//! The builder lays a container out the same way the rebuild does (records
//! packed in key order, names straight after the entry blocks, data packed
//! in ascending address order with zero padding), so a rebuild with no
//! patches applied reproduces the fixture byte for byte.

#![allow(dead_code)]

use rompack::checksum::header_digest;
use rompack::format::{align_up, ENTRY_LEN, FIXED_HEADER_LEN, FOLDER_FLAG, MAGIC};
use rompack::Archive;
use std::io::Cursor;

/// Scale factor used by every fixture.
pub const MUL: u32 = 16;

/// One node of a fixture tree.
pub enum Entry {
    /// A file with literal payload bytes.
    File { name: String, payload: Vec<u8> },
    /// A folder with child entries.
    Dir { name: String, children: Vec<Entry> },
}

pub fn file(name: &str, payload: &[u8]) -> Entry {
    Entry::File {
        name: name.to_string(),
        payload: payload.to_vec(),
    }
}

pub fn dir(name: &str, children: Vec<Entry>) -> Entry {
    Entry::Dir {
        name: name.to_string(),
        children,
    }
}

enum Slot {
    File(usize),
    Dir(usize),
}

struct FlatFolder {
    parent: usize,
    entries: Vec<(String, Slot)>,
}

fn flatten(
    folders: &mut Vec<FlatFolder>,
    payloads: &mut Vec<Vec<u8>>,
    folder_id: usize,
    mut children: Vec<Entry>,
) {
    children.sort_by(|a, b| name_of(a).cmp(name_of(b)));
    for child in children {
        match child {
            Entry::File { name, payload } => {
                payloads.push(payload);
                let id = payloads.len() - 1;
                folders[folder_id].entries.push((name, Slot::File(id)));
            }
            Entry::Dir { name, children } => {
                folders.push(FlatFolder {
                    parent: folder_id,
                    entries: Vec::new(),
                });
                let id = folders.len() - 1;
                folders[folder_id].entries.push((name, Slot::Dir(id)));
                flatten(folders, payloads, id, children);
            }
        }
    }
}

fn name_of(e: &Entry) -> &str {
    match e {
        Entry::File { name, .. } | Entry::Dir { name, .. } => name,
    }
}

/// Serializes a complete container image holding `root_entries` at the root.
///
/// The data region starts directly after the folder records, so the header
/// has no room to grow. Use [`build_image_slack`] for fixtures that will
/// have entries patched in.
pub fn build_image(val1: u16, val2: u16, root_entries: Vec<Entry>) -> Vec<u8> {
    build_image_slack(val1, val2, root_entries, 0)
}

/// Like [`build_image`], but leaves `slack_units` spare `MUL`-byte units
/// between the folder records and the data region, mirroring shipped
/// archives whose headers sit well clear of their data.
pub fn build_image_slack(
    val1: u16,
    val2: u16,
    root_entries: Vec<Entry>,
    slack_units: u32,
) -> Vec<u8> {
    let mut folders = vec![FlatFolder {
        parent: 0,
        entries: Vec::new(),
    }];
    let mut payloads = Vec::new();
    flatten(&mut folders, &mut payloads, 0, root_entries);

    // Record lengths and addresses, packed back to back in id order.
    let record_len: Vec<u64> = folders
        .iter()
        .map(|f| {
            let count = f.entries.len() + 2;
            let names: u64 = 5 + f.entries.iter().map(|(n, _)| n.len() as u64 + 1).sum::<u64>();
            4 + count as u64 * ENTRY_LEN as u64 + names
        })
        .collect();
    let mut keys = Vec::with_capacity(folders.len());
    let mut rel = 0u64;
    for len in &record_len {
        keys.push((rel / MUL as u64) as u32);
        rel = align_up(rel + len, MUL);
    }
    let records_size = rel;
    let header_size = FIXED_HEADER_LEN + records_size;

    // File addresses, packed in folder order starting right after the header.
    let mut file_at = vec![(0u32, 0u32); payloads.len()];
    let mut cursor = align_up(header_size, MUL) + slack_units as u64 * MUL as u64;
    let data_start = cursor;
    for folder in &folders {
        for (_, slot) in &folder.entries {
            if let Slot::File(id) = slot {
                file_at[*id] = ((cursor / MUL as u64) as u32, payloads[*id].len() as u32);
                cursor = align_up(cursor + payloads[*id].len() as u64, MUL);
            }
        }
    }

    // Folder records.
    let mut records = Vec::with_capacity(records_size as usize);
    for (id, folder) in folders.iter().enumerate() {
        let start = records.len();
        let count = folder.entries.len() + 2;
        records.extend_from_slice(&(count as u32).to_le_bytes());
        let blocks_at = records.len();
        records.resize(blocks_at + count * ENTRY_LEN, 0);

        let mut blocks: Vec<(u32, u32, u32)> = Vec::with_capacity(count);
        let push_name = |records: &mut Vec<u8>, name: &str| -> u32 {
            let ptr = (records.len() - start) as u32;
            records.extend_from_slice(name.as_bytes());
            records.push(0);
            ptr
        };
        let ptr = push_name(&mut records, ".");
        blocks.push((ptr | FOLDER_FLAG, keys[id], record_len[id] as u32));
        let ptr = push_name(&mut records, "..");
        blocks.push((
            ptr | FOLDER_FLAG,
            keys[folder.parent],
            record_len[folder.parent] as u32,
        ));
        for (name, slot) in &folder.entries {
            let ptr = push_name(&mut records, name);
            blocks.push(match slot {
                Slot::File(fid) => (ptr, file_at[*fid].0, file_at[*fid].1),
                Slot::Dir(did) => (ptr | FOLDER_FLAG, keys[*did], record_len[*did] as u32),
            });
        }
        assert_eq!(records.len() - start, record_len[id] as usize);
        for (i, (packed, flat, length)) in blocks.iter().enumerate() {
            let block = &mut records[blocks_at + i * ENTRY_LEN..blocks_at + (i + 1) * ENTRY_LEN];
            block[0..4].copy_from_slice(&packed.to_le_bytes());
            block[4..8].copy_from_slice(&flat.to_le_bytes());
            block[8..12].copy_from_slice(&length.to_le_bytes());
        }
        records.resize(align_up((start as u64) + record_len[id], MUL) as usize, 0);
    }
    assert_eq!(records.len() as u64, records_size);

    // Assemble the image.
    let mut img = Vec::new();
    img.extend_from_slice(MAGIC);
    img.extend_from_slice(&val1.to_le_bytes());
    img.extend_from_slice(&val2.to_le_bytes());
    img.extend_from_slice(&(header_size as u32).to_le_bytes());
    img.extend_from_slice(&MUL.to_le_bytes());
    img.extend_from_slice(&header_digest(&records));
    img.extend_from_slice(&records);
    img.resize(data_start as usize, 0);
    for folder in &folders {
        for (_, slot) in &folder.entries {
            if let Slot::File(id) = slot {
                let (flat, len) = file_at[*id];
                assert_eq!(img.len(), flat as usize * MUL as usize);
                img.extend_from_slice(&payloads[*id]);
                img.resize(align_up(flat as u64 * MUL as u64 + len as u64, MUL) as usize, 0);
            }
        }
    }
    img
}

/// A fixture resembling a small game archive, with nested voice folders and
/// room for the header to grow.
pub fn game_image() -> Vec<u8> {
    build_image_slack(
        1,
        0,
        vec![
            file("script.dat", b"@scene intro\n@bg school_day\n"),
            file("config.ini", b"volume=80\n"),
            dir(
                "voice",
                vec![
                    dir(
                        "27",
                        vec![
                            file("bea_03600_.nxa", &[0x60; 48]),
                            file("bea_03700_.nxa", &[0x70; 33]),
                            file("bea_03800_.nxa", &[0x80; 17]),
                        ],
                    ),
                    dir("28", vec![file("mia_00100_.nxa", &[0x10; 21])]),
                ],
            ),
        ],
        64,
    )
}

/// Reads one file's payload out of `image` by walking the parsed tree.
pub fn read_file(image: &[u8], path: &[&str]) -> Option<Vec<u8>> {
    let archive = Archive::open(Cursor::new(image.to_vec())).ok()?;
    let mut folder = archive.root().ok()?;
    let (file_name, dirs) = path.split_last()?;
    for name in dirs {
        let key = folder.get(name)?.as_folder()?.key;
        folder = archive.folder(key)?;
    }
    let file = folder.get(file_name)?.as_file()?;
    let at = file.flat_offset? as usize * archive.offset_mul() as usize;
    let len = file.length? as usize;
    image.get(at..at + len).map(<[u8]>::to_vec)
}
