//! Position-tracking output sink for the rebuild.
//!
//! [`PositionTracker`] wraps any `Write + Seek` target and keeps the current
//! byte position and high-water length in step with every write and seek.
//! The rebuild derives all recorded offsets and lengths from these counters
//! instead of asking the target, so the same arithmetic holds for files,
//! in-memory buffers, and anything else the caller supplies.
//!
//! Alignment padding is written as literal zero bytes, never produced by
//! seeking past the end. Holes in the output would otherwise depend on the
//! target's sparse-file behavior.

use std::io::{self, Seek, SeekFrom, Write};

use crate::error::{Error, Result};
use crate::format::align_up;

/// An output sink that tracks its own position and total length.
pub struct PositionTracker<W> {
    target: W,
    position: u64,
    length: u64,
}

impl<W: Write + Seek> PositionTracker<W> {
    /// Wraps `target`, assuming it is empty and positioned at byte 0.
    pub fn new(target: W) -> Self {
        Self {
            target,
            position: 0,
            length: 0,
        }
    }

    /// Returns the current write position in bytes.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the total length written so far (the high-water mark).
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Writes `buf` in full at the current position.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.target.write_all(buf)?;
        self.position += buf.len() as u64;
        self.length = self.length.max(self.position);
        Ok(())
    }

    /// Pads with zero bytes up to the next `alignment` boundary.
    ///
    /// Returns the aligned position. A position already on the boundary is
    /// left untouched.
    pub fn align_to(&mut self, alignment: u32) -> Result<u64> {
        self.write_zeros(align_up(self.position, alignment) - self.position)?;
        Ok(self.position)
    }

    /// Pads with zero bytes up to the absolute byte address `target`.
    ///
    /// Fails with [`Error::OutOfOrder`] if `target` is behind the current
    /// position.
    pub fn pad_to(&mut self, target: u64) -> Result<()> {
        if target < self.position {
            return Err(Error::OutOfOrder {
                position: self.position,
                requested: target,
            });
        }
        self.write_zeros(target - self.position)
    }

    fn write_zeros(&mut self, mut remaining: u64) -> Result<()> {
        let zeros = [0u8; 256];
        while remaining > 0 {
            let n = remaining.min(zeros.len() as u64) as usize;
            self.write_all(&zeros[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }

    /// Fails unless the current position sits on an `alignment` boundary.
    pub fn check_aligned(&self, alignment: u32) -> Result<()> {
        if self.position % alignment as u64 != 0 {
            return Err(Error::AlignmentError {
                position: self.position,
                alignment,
            });
        }
        Ok(())
    }

    /// Moves the write position to the absolute byte address `target`.
    ///
    /// Used by the header pass to fix up reserved entry blocks and the
    /// finalize step to rewrite the fixed header. The high-water length is
    /// unaffected.
    pub fn seek_to(&mut self, target: u64) -> Result<()> {
        self.target.seek(SeekFrom::Start(target))?;
        self.position = target;
        Ok(())
    }

    /// Flushes the underlying target and returns it.
    pub fn into_inner(mut self) -> Result<W> {
        self.target.flush()?;
        Ok(self.target)
    }
}

// Suppliers drain into `&mut dyn Write`, so the tracker is itself a writer.
impl<W: Write + Seek> Write for PositionTracker<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.target.write(buf)?;
        self.position += n as u64;
        self.length = self.length.max(self.position);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.target.flush()
    }
}
