//! Archive reading API for ROM2 containers.
//!
//! [`Archive::open`] streams the container header through a forward-only
//! cursor and produces the in-memory tree. The archive itself is pure data:
//! it holds no reader, so the same tree can be inspected, patched (see
//! [`crate::edit`]) and handed to a [`Writer`](crate::Writer) together with
//! a second cursor over the original bytes.

mod entry;

pub use entry::{FileNode, Folder, FolderKey, FolderNode, Node, Token, RESERVED_ENTRIES};

use std::collections::BTreeMap;
use std::io::Read;

use crate::error::{Error, Result};
use crate::format::parser;
use crate::format::reader::SequentialReader;

/// A parsed ROM2 container.
///
/// Constructed exactly once by parsing; patch operations mutate the tree in
/// memory; a rebuild serializes it exactly once into an entirely new byte
/// sequence. The original source is never altered.
#[derive(Debug)]
pub struct Archive {
    /// Opaque engine metadata, passed through unchanged.
    pub val1: u16,
    /// Opaque engine metadata, passed through unchanged.
    pub val2: u16,
    pub(crate) header_start: u64,
    pub(crate) offset_mul: u32,
    pub(crate) least_flat_offset: u32,
    pub(crate) folders: BTreeMap<FolderKey, Folder>,
}

impl Archive {
    /// Parses a ROM2 container from any byte source.
    ///
    /// The source is consumed forward-only through the header and left
    /// positioned at the start of the data region; it is not retained.
    ///
    /// # Errors
    ///
    /// [`Error::BadMagic`] if the signature is wrong, and
    /// [`Error::UnexpectedEnd`]/[`Error::IntegrityError`] for truncated or
    /// malformed folder records.
    pub fn open<R: Read>(source: R) -> Result<Self> {
        let mut reader = SequentialReader::new(source);
        parser::parse(&mut reader)
    }

    /// The container-wide scale factor for flat offsets.
    pub fn offset_mul(&self) -> u32 {
        self.offset_mul
    }

    /// The smallest nonzero file `flat_offset`, marking the data region.
    pub fn least_flat_offset(&self) -> u32 {
        self.least_flat_offset
    }

    /// Byte offset where the folder records begin.
    pub fn header_start(&self) -> u64 {
        self.header_start
    }

    /// Byte offset where the data region begins.
    pub fn data_offset(&self) -> u64 {
        self.least_flat_offset as u64 * self.offset_mul as u64
    }

    /// Looks up a folder by key.
    pub fn folder(&self, key: FolderKey) -> Option<&Folder> {
        self.folders.get(&key)
    }

    /// Returns the root folder.
    ///
    /// # Errors
    ///
    /// [`Error::MissingMetadata`] if the container declared no folders.
    pub fn root(&self) -> Result<&Folder> {
        self.folders
            .get(&FolderKey::ROOT)
            .ok_or(Error::MissingMetadata {
                key: FolderKey::ROOT.to_string(),
            })
    }

    /// Iterates over all folders in key order.
    pub fn folders(&self) -> impl Iterator<Item = (FolderKey, &Folder)> {
        self.folders.iter().map(|(k, v)| (*k, v))
    }

    /// Returns the number of folders in the container.
    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }
}
