//! Error types for ROM2 archive operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when parsing, patching, or rebuilding a ROM2 container,
//! along with a convenient [`Result<T>`] type alias.
//!
//! Every error here is fatal for the operation in progress: the engine never
//! retries and never partially commits. The container format stores offsets
//! that downstream tools read literally, so any disagreement between
//! precomputed and actual positions is reported as a hard failure rather
//! than a warning.
//!
//! ```rust,no_run
//! use rompack::{Archive, Error, Result};
//!
//! fn open(path: &str) -> Result<Archive> {
//!     match Archive::open(std::fs::File::open(path)?) {
//!         Err(Error::BadMagic { found }) => {
//!             eprintln!("{} is not a ROM2 container (magic {:02x?})", path, found);
//!             Err(Error::BadMagic { found })
//!         }
//!         other => other,
//!     }
//! }
//! ```

use std::io;

/// The main error type for ROM2 archive operations.
///
/// Errors fall into three groups:
///
/// | Group | Variants | Raised by |
/// |-------|----------|-----------|
/// | Parse / read order | [`BadMagic`][Self::BadMagic], [`UnexpectedEnd`][Self::UnexpectedEnd], [`OutOfOrder`][Self::OutOfOrder] | header parsing, forward-only cursor |
/// | Patch navigation | [`NotADirectory`][Self::NotADirectory], [`FileIsDirectory`][Self::FileIsDirectory] | [`Archive::apply_patch`](crate::Archive::apply_patch) |
/// | Rebuild consistency | [`AlignmentError`][Self::AlignmentError], [`MissingMetadata`][Self::MissingMetadata], [`IntegrityError`][Self::IntegrityError] | [`Writer::write`](crate::Writer::write) |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred on the underlying source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with the `ROM2` signature.
    ///
    /// Either the file is not a ROM2 container at all, or it uses the older
    /// `ROM ` layout which this crate does not read.
    #[error("not a ROM2 container: found magic {found:02x?}")]
    BadMagic {
        /// The four bytes found where the signature was expected.
        found: [u8; 4],
    },

    /// The source ended before a read could be satisfied.
    ///
    /// The header declared more data than the file contains, or a payload
    /// copy ran past the end of the source.
    #[error("unexpected end of input at offset {position:#x} (needed {needed} more bytes)")]
    UnexpectedEnd {
        /// Bytes consumed when the source ran dry.
        position: u64,
        /// Bytes still required by the failed read.
        needed: u64,
    },

    /// A forward-only cursor was asked to move backward.
    ///
    /// The parser and the rebuild data pass both visit addresses in strictly
    /// non-decreasing order; a target behind the current position means the
    /// offsets in the tree are inconsistent (for example, a file's length
    /// grew without a replacement payload being attached). This guards
    /// against engine bugs and is never recoverable.
    #[error("out-of-order access: at offset {position:#x}, requested {requested:#x}")]
    OutOfOrder {
        /// Current cursor position in bytes.
        position: u64,
        /// The requested (earlier) byte address.
        requested: u64,
    },

    /// A patch path tried to descend through an existing file.
    #[error("path component '{name}' is a file, not a folder")]
    NotADirectory {
        /// The entry name that was expected to be a folder.
        name: String,
    },

    /// A patch tried to overwrite an existing folder with a file.
    #[error("cannot overwrite folder '{name}' with a file")]
    FileIsDirectory {
        /// The folder name the patch targeted.
        name: String,
    },

    /// An output position is not a multiple of the container's scale factor.
    ///
    /// Every file and folder address in a ROM2 container must sit on an
    /// `offset_mul` boundary. The rebuild checks this before recording each
    /// new offset; a misaligned position means padding got lost somewhere.
    #[error("writer position {position:#x} is not aligned to {alignment}")]
    AlignmentError {
        /// The misaligned byte position.
        position: u64,
        /// The required alignment in bytes.
        alignment: u32,
    },

    /// A rebuild lookup found no metadata for an entry.
    ///
    /// Every entry emitted into the new header must have been assigned a
    /// fresh offset and length during the data or layout pass. A miss means
    /// the tree references a file or folder the rebuild never saw, such as
    /// a dangling folder key, or a pending new file with no
    /// [`PayloadSupplier`](crate::PayloadSupplier) attached.
    #[error("no rebuild metadata for {key}")]
    MissingMetadata {
        /// Description of the entry whose metadata is missing.
        key: String,
    },

    /// Precomputed and actual offsets disagree during the rebuild.
    #[error("archive integrity violated: {detail}")]
    IntegrityError {
        /// What disagreed, with both values where known.
        detail: String,
    },
}

/// A specialized `Result` type for ROM2 archive operations.
pub type Result<T> = std::result::Result<T, Error>;
