//! # rompack
//!
//! A pure-Rust library for reading, patching, and rebuilding ROM2 game
//! archive containers.
//!
//! A ROM2 container bundles a visual novel engine's assets (scripts,
//! backgrounds, audio, voices, character art) into one binary file with an
//! internal pseudo-filesystem of nested folders addressed by scaled offsets.
//! This crate parses such a container into an in-memory tree, lets callers
//! add or replace files and folders, and rebuilds a complete new container
//! while copying untouched payload data unmodified.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use rompack::{Archive, Result};
//!
//! fn main() -> Result<()> {
//!     // Parse the container into an in-memory tree
//!     let archive = Archive::open(File::open("game.rom")?)?;
//!
//!     // Inspect the root folder
//!     for node in archive.root()?.entries() {
//!         println!("{}", node.name());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Patching and Rebuilding
//!
//! ```rust,no_run
//! use std::fs::File;
//! use rompack::{Archive, BytesSupplier, Writer, Result};
//!
//! fn main() -> Result<()> {
//!     let mut archive = Archive::open(File::open("game.rom")?)?;
//!
//!     // Replace a voice clip; missing intermediate folders are created
//!     archive.apply_patch(
//!         &["voice", "27", "bea_03700_.nxa"],
//!         Box::new(BytesSupplier::new(std::fs::read("bea_03700_.nxa")?)),
//!     )?;
//!
//!     // Rebuild into a brand-new file. The source is read again through a
//!     // second cursor but never modified.
//!     let summary = Writer::new(archive)
//!         .write(File::open("game.rom")?, File::create("game.patched.rom")?)?;
//!     println!("copied {}, replaced {}, added {}",
//!         summary.files_copied, summary.files_replaced, summary.files_added);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - Parsing is forward-only and streaming: the source is consumed through
//!   [`SequentialReader`], which never seeks backward. Only the header is
//!   buffered in memory; payload data is copied in bounded chunks.
//! - Rebuilding is a strict two-phase emit (data region first, then a
//!   collect-then-fix-up header pass). Any disagreement between precomputed
//!   and actual offsets is a hard failure; downstream engines read the
//!   offsets literally, so there is zero tolerance for silent drift.
//! - New file content comes from external collaborators (font rasterizers,
//!   script compilers, text converters) through the single-method
//!   [`PayloadSupplier`] contract; the engine never inspects those bytes.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. Every failure aborts the operation in
//! progress; there is no partial-write recovery. Rebuilds must target a
//! fresh output and discard it on any error, never overwrite the source in
//! place.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

/// Default buffer size for chunked read operations (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod checksum;
pub mod edit;
pub mod error;
pub mod format;
pub mod read;
pub mod sink;
pub mod supply;
pub mod write;

pub use error::{Error, Result};

// Re-export the reading API at the crate root for convenience
pub use read::{Archive, FileNode, Folder, FolderKey, FolderNode, Node, Token};

// Re-export the low-level cursor for callers that feed non-file sources
pub use format::reader::SequentialReader;

// Re-export the payload supplier contract
pub use supply::{BytesSupplier, PayloadSupplier, ReaderSupplier};

// Re-export the writing API
pub use sink::PositionTracker;
pub use write::{WriteSummary, Writer};
