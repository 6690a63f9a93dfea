//! Two-phase container rebuild.
//!
//! [`Writer`] consumes a patched [`Archive`] and serializes a complete new
//! container. Phase one writes the data region: untouched payloads are
//! copied from a fresh cursor over the original bytes in ascending address
//! order, replacements and additions are drained from their suppliers, and
//! every file is assigned its final address from the sink position. Phase
//! two plans and serializes the folder records (see [`header_encode`]) and
//! finally rewrites the fixed header with the new record size and checksum.
//!
//! The output must be a fresh target. On any error the partially written
//! output is unusable and should be discarded; the source is never touched.

mod header_encode;

use std::io::{Read, Seek, Write};

use crate::checksum;
use crate::error::{Error, Result};
use crate::format::reader::SequentialReader;
use crate::format::{FIXED_HEADER_LEN, MAGIC};
use crate::read::{Archive, FolderKey, Node};
use crate::sink::PositionTracker;

/// What a rebuild did, returned by [`Writer::write`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Untouched files copied verbatim from the source.
    pub files_copied: usize,
    /// Existing files whose payload came from a supplier.
    pub files_replaced: usize,
    /// Files that did not exist in the source container.
    pub files_added: usize,
    /// Folder records emitted into the new header.
    pub folders: usize,
    /// Total size of the new container in bytes.
    pub total_bytes: u64,
}

/// Serializes a patched [`Archive`] into a new container.
///
/// The writer consumes the archive: after a rebuild the tree's addresses
/// describe the old container, so it must not be reused.
pub struct Writer {
    archive: Archive,
}

/// A file scheduled for the data pass, addressed back into the tree.
struct Slot {
    folder: FolderKey,
    index: usize,
}

impl Writer {
    /// Creates a writer over `archive`.
    pub fn new(archive: Archive) -> Self {
        Self { archive }
    }

    /// Writes the complete new container to `output`.
    ///
    /// `source` is a second cursor over the original container's bytes; it
    /// is read forward-only for the untouched payload copies. Pass any
    /// empty source for an archive whose files are all patched in.
    ///
    /// # Errors
    ///
    /// [`Error::MissingMetadata`] for a pending file with no payload,
    /// [`Error::IntegrityError`] when the new folder records would overrun
    /// the data region or planned and actual offsets disagree, and
    /// [`Error::Io`] from either endpoint.
    pub fn write<R: Read, W: Write + Seek>(mut self, source: R, output: W) -> Result<WriteSummary> {
        let mul = self.archive.offset_mul();
        let data_offset = self.archive.data_offset();
        let mut reader = SequentialReader::new(source);
        let mut sink = PositionTracker::new(output);
        let mut summary = WriteSummary {
            folders: self.archive.folder_count(),
            ..WriteSummary::default()
        };

        // The header region is filled with zeros now and overwritten at the
        // end, so the gap after the folder records stays zeroed.
        sink.pad_to(data_offset)?;

        // Existing files go first, in ascending source address order, which
        // keeps the source cursor moving strictly forward. Patched-in files
        // follow in tree order (folders by key, entries by name), so the
        // layout is deterministic.
        let mut existing: Vec<(u32, u32, Slot)> = Vec::new();
        let mut fresh: Vec<(String, Slot)> = Vec::new();
        for (folder, record) in self.archive.folders() {
            for (index, node) in record.entries().iter().enumerate() {
                let Node::File(file) = node else { continue };
                let slot = Slot { folder, index };
                match file.flat_offset {
                    Some(flat) => {
                        let length = file.length.ok_or_else(|| Error::MissingMetadata {
                            key: format!("file '{}'", file.name),
                        })?;
                        existing.push((flat, length, slot));
                    }
                    None => {
                        let token = file.token.as_ref().ok_or_else(|| Error::MissingMetadata {
                            key: format!("file '{}'", file.name),
                        })?;
                        fresh.push((token.as_str().to_string(), slot));
                    }
                }
            }
        }
        existing.sort_by_key(|(flat, _, _)| *flat);

        for (flat, length, slot) in existing {
            let replaced = {
                let file = self.file_mut(&slot)?;
                file.payload.take()
            };
            sink.check_aligned(mul)?;
            let start = sink.position();
            match replaced {
                Some(mut payload) => {
                    payload.write_to(&mut sink)?;
                    summary.files_replaced += 1;
                }
                None => {
                    reader.skip_to(flat as u64 * mul as u64)?;
                    copy_n(&mut reader, &mut sink, length as u64)?;
                    summary.files_copied += 1;
                }
            }
            self.record_placement(&slot, &mut sink, start, mul)?;
        }

        for (token, slot) in fresh {
            let mut payload = {
                let file = self.file_mut(&slot)?;
                file.payload.take().ok_or(Error::MissingMetadata {
                    key: format!("file '{token}'"),
                })?
            };
            sink.check_aligned(mul)?;
            let start = sink.position();
            payload.write_to(&mut sink)?;
            summary.files_added += 1;
            self.record_placement(&slot, &mut sink, start, mul)?;
        }

        // Header pass: plan record addresses, serialize, then drop the
        // finished header into the space reserved up front.
        let layout = header_encode::plan(&self.archive)?;
        let records = header_encode::encode(&self.archive, &layout)?;
        let header_size = FIXED_HEADER_LEN + records.len() as u64;
        if header_size > data_offset {
            return Err(Error::IntegrityError {
                detail: format!(
                    "folder records end at {header_size:#x} but the data region starts at {data_offset:#x}"
                ),
            });
        }
        // The on-disk field is 32-bit; a huge data offset can pass the
        // overlap guard while the header end still does not fit.
        let header_size_field = u32::try_from(header_size).map_err(|_| Error::IntegrityError {
            detail: format!("header size {header_size:#x} does not fit the 32-bit field"),
        })?;
        let digest = checksum::header_digest(&records);

        sink.seek_to(0)?;
        sink.write_all(MAGIC)?;
        sink.write_all(&self.archive.val1.to_le_bytes())?;
        sink.write_all(&self.archive.val2.to_le_bytes())?;
        sink.write_all(&header_size_field.to_le_bytes())?;
        sink.write_all(&mul.to_le_bytes())?;
        sink.write_all(&digest)?;
        sink.write_all(&records)?;

        summary.total_bytes = sink.length();
        sink.into_inner()?;
        log::debug!(
            "rebuilt container: {} copied, {} replaced, {} added, {} folders, {} bytes",
            summary.files_copied,
            summary.files_replaced,
            summary.files_added,
            summary.folders,
            summary.total_bytes
        );
        Ok(summary)
    }

    fn file_mut(&mut self, slot: &Slot) -> Result<&mut crate::read::FileNode> {
        let node = self
            .archive
            .folders
            .get_mut(&slot.folder)
            .and_then(|f| f.entries.get_mut(slot.index));
        match node {
            Some(Node::File(file)) => Ok(file),
            _ => Err(Error::MissingMetadata {
                key: format!("entry {} of {}", slot.index, slot.folder),
            }),
        }
    }

    /// Stores the final address and measured length back into the tree and
    /// pads the sink to the next boundary.
    ///
    /// `start` is the aligned position the file began at.
    fn record_placement(
        &mut self,
        slot: &Slot,
        sink: &mut PositionTracker<impl Write + Seek>,
        start: u64,
        mul: u32,
    ) -> Result<()> {
        let flat = start / mul as u64;
        let written = sink.position() - start;
        if flat > u32::MAX as u64 || written > u32::MAX as u64 {
            return Err(Error::IntegrityError {
                detail: format!("file at {start:#x} exceeds the 32-bit address space"),
            });
        }
        let file = self.file_mut(slot)?;
        file.flat_offset = Some(flat as u32);
        file.length = Some(written as u32);
        sink.align_to(mul)?;
        Ok(())
    }
}

/// Copies exactly `n` bytes from the cursor to the sink in bounded chunks.
fn copy_n<R: Read, W: Write + Seek>(
    reader: &mut SequentialReader<R>,
    sink: &mut PositionTracker<W>,
    n: u64,
) -> Result<()> {
    let mut buf = [0u8; crate::READ_BUFFER_SIZE];
    let mut remaining = n;
    while remaining > 0 {
        let take = remaining.min(buf.len() as u64) as usize;
        reader.read_exact(&mut buf[..take])?;
        sink.write_all(&buf[..take])?;
        remaining -= take as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::{Folder, FolderNode};
    use crate::supply::BytesSupplier;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    /// A root-only archive with no files and room for the header to grow.
    fn empty_archive() -> Archive {
        let root = Folder {
            entries: vec![
                Node::Folder(FolderNode {
                    name: ".".into(),
                    key: FolderKey::ROOT,
                    length: None,
                }),
                Node::Folder(FolderNode {
                    name: "..".into(),
                    key: FolderKey::ROOT,
                    length: None,
                }),
            ],
        };
        let mut folders = BTreeMap::new();
        folders.insert(FolderKey::ROOT, root);
        Archive {
            val1: 1,
            val2: 2,
            header_start: 32,
            offset_mul: 16,
            least_flat_offset: 16,
            folders,
        }
    }

    #[test]
    fn test_write_patched_in_file() {
        let mut archive = empty_archive();
        archive
            .apply_patch(&["f.bin"], Box::new(BytesSupplier::new(b"payload".to_vec())))
            .unwrap();

        let mut out = Cursor::new(Vec::new());
        let summary = Writer::new(archive)
            .write(Cursor::new(Vec::new()), &mut out)
            .unwrap();
        assert_eq!(summary.files_added, 1);
        assert_eq!(summary.files_copied, 0);
        assert_eq!(summary.folders, 1);

        let bytes = out.into_inner();
        assert_eq!(&bytes[..4], MAGIC);

        let reparsed = Archive::open(Cursor::new(bytes.clone())).unwrap();
        let file = reparsed.root().unwrap().get("f.bin").unwrap().as_file().unwrap();
        let flat = file.flat_offset.unwrap();
        assert_eq!(flat, 16); // data region starts at 16 * 16 = 256
        assert_eq!(file.length, Some(7));
        let at = flat as usize * 16;
        assert_eq!(&bytes[at..at + 7], b"payload");
    }

    #[test]
    fn test_header_checksum_covers_records() {
        let mut archive = empty_archive();
        archive
            .apply_patch(&["f.bin"], Box::new(BytesSupplier::new(vec![0xAB; 3])))
            .unwrap();

        let mut out = Cursor::new(Vec::new());
        Writer::new(archive)
            .write(Cursor::new(Vec::new()), &mut out)
            .unwrap();
        let bytes = out.into_inner();

        let header_size = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let digest = checksum::header_digest(&bytes[32..header_size]);
        assert_eq!(&bytes[16..32], &digest);
    }

    #[test]
    fn test_pending_file_without_payload_fails() {
        let mut archive = empty_archive();
        if let Some(root) = archive.folders.get_mut(&FolderKey::ROOT) {
            root.insert_sorted(Node::File(crate::read::FileNode {
                name: "ghost".into(),
                flat_offset: None,
                length: None,
                token: Some(crate::read::Token::from_components(&["ghost"])),
                payload: None,
            }));
        }
        let err = Writer::new(archive)
            .write(Cursor::new(Vec::new()), Cursor::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::MissingMetadata { .. }));
    }

    #[test]
    fn test_header_overflow_is_detected() {
        let mut archive = empty_archive();
        // data region at 16 * 16 = 256; a long enough name overruns it
        let long = "n".repeat(300);
        archive
            .apply_patch(&[long.as_str()], Box::new(BytesSupplier::new(vec![1])))
            .unwrap();
        let err = Writer::new(archive)
            .write(Cursor::new(Vec::new()), Cursor::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::IntegrityError { .. }));
    }

    #[test]
    fn test_added_files_are_laid_out_in_tree_order() {
        let mut archive = empty_archive();
        archive
            .apply_patch(&["z.bin"], Box::new(BytesSupplier::new(b"ZZ".to_vec())))
            .unwrap();
        archive
            .apply_patch(&["a.bin"], Box::new(BytesSupplier::new(b"AA".to_vec())))
            .unwrap();

        let mut out = Cursor::new(Vec::new());
        Writer::new(archive)
            .write(Cursor::new(Vec::new()), &mut out)
            .unwrap();
        let bytes = out.into_inner();

        let reparsed = Archive::open(Cursor::new(bytes)).unwrap();
        let root = reparsed.root().unwrap();
        let a = root.get("a.bin").unwrap().as_file().unwrap();
        let z = root.get("z.bin").unwrap().as_file().unwrap();
        assert!(a.flat_offset.unwrap() < z.flat_offset.unwrap());
        assert_eq!(a.flat_offset, Some(16));
    }
}
