//! The in-memory folder/file model of a parsed ROM2 container.
//!
//! Entries are a tagged variant rather than one struct with presence-based
//! meaning: a [`FolderNode`] structurally cannot carry a token or payload,
//! which enforces the format rule that tokens identify file replacements
//! only.

use std::fmt;

use crate::supply::PayloadSupplier;

/// Identifies a folder by its position, independent of its byte address.
///
/// For parsed folders this is the record's offset from the header start in
/// `offset_mul` units (the value a folder entry stores in its
/// `flat_offset` field). Folders added by patches get the next free key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FolderKey(pub u32);

impl FolderKey {
    /// The root folder's key.
    pub const ROOT: FolderKey = FolderKey(0);
}

impl fmt::Display for FolderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "folder #{}", self.0)
    }
}

/// Opaque identifier for a freshly patched file.
///
/// New files have no original `flat_offset` to key their rebuild metadata
/// by, so the patch assigns them a token derived deterministically from the
/// joined path. The same path always yields the same token, which is what
/// makes repeated patches idempotent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(String);

impl Token {
    /// Derives the token for a patch path.
    pub fn from_components(components: &[&str]) -> Self {
        Token(components.join("/"))
    }

    /// Returns the token's string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file entry in a folder.
pub struct FileNode {
    /// Entry name.
    pub name: String,
    /// Address in `offset_mul` units, `None` for pending new files.
    pub flat_offset: Option<u32>,
    /// Payload length in bytes, `None` until first written.
    pub length: Option<u32>,
    /// Set when this file was the target of a patch.
    pub token: Option<Token>,
    /// Replacement payload; present when this file's bytes come from a
    /// collaborator instead of the original archive.
    pub payload: Option<Box<dyn PayloadSupplier>>,
}

impl FileNode {
    /// Returns whether this file's bytes will come from a supplier rather
    /// than being copied from the original container.
    pub fn is_replaced(&self) -> bool {
        self.payload.is_some()
    }
}

impl fmt::Debug for FileNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileNode")
            .field("name", &self.name)
            .field("flat_offset", &self.flat_offset)
            .field("length", &self.length)
            .field("token", &self.token)
            .field("payload", &self.payload.as_ref().map(|_| "..."))
            .finish()
    }
}

/// A folder reference entry in a folder.
///
/// This is the entry as it appears in its parent's listing; the referenced
/// folder's own contents live in the archive's folder map under `key`.
#[derive(Debug)]
pub struct FolderNode {
    /// Entry name (`.` and `..` for the two reserved references).
    pub name: String,
    /// Key of the referenced folder.
    pub key: FolderKey,
    /// Serialized record length from the source, `None` for new folders.
    /// The rebuild recomputes this; it is kept for inspection only.
    pub length: Option<u32>,
}

/// A single directory entry: either a file or a folder reference.
#[derive(Debug)]
pub enum Node {
    /// A file carrying payload bytes.
    File(FileNode),
    /// A reference to another folder.
    Folder(FolderNode),
}

impl Node {
    /// Returns the entry name.
    pub fn name(&self) -> &str {
        match self {
            Node::File(f) => &f.name,
            Node::Folder(d) => &d.name,
        }
    }

    /// Returns `true` for folder references.
    pub fn is_folder(&self) -> bool {
        matches!(self, Node::Folder(_))
    }

    /// Returns the file node, if this entry is a file.
    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Node::File(f) => Some(f),
            Node::Folder(_) => None,
        }
    }

    /// Returns the folder node, if this entry is a folder reference.
    pub fn as_folder(&self) -> Option<&FolderNode> {
        match self {
            Node::File(_) => None,
            Node::Folder(d) => Some(d),
        }
    }
}

/// An ordered sequence of directory entries.
///
/// The first two entries are the reserved self (`.`) and parent (`..`)
/// references; every entry after them is kept in strictly ascending name
/// order.
#[derive(Debug, Default)]
pub struct Folder {
    pub(crate) entries: Vec<Node>,
}

/// Number of reserved entries (`.` and `..`) at the front of every folder.
pub const RESERVED_ENTRIES: usize = 2;

impl Folder {
    /// Returns all entries, reserved references included.
    pub fn entries(&self) -> &[Node] {
        &self.entries
    }

    /// Returns the entries after the reserved `.` and `..` references.
    pub fn tail(&self) -> &[Node] {
        if self.entries.len() < RESERVED_ENTRIES {
            &[]
        } else {
            &self.entries[RESERVED_ENTRIES..]
        }
    }

    /// Returns the number of entries, reserved references included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the folder has no entries at all.
    ///
    /// A well-formed folder always carries its two reserved references, so
    /// this is only `true` for a folder under construction.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by name.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.entries.iter_mut().find(|e| e.name() == name)
    }
}
