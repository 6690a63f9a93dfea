//! Forward-only binary cursor for ROM2 parsing.
//!
//! [`SequentialReader`] wraps any [`Read`] source and consumes it in
//! buffered chunks, tracking the number of bytes consumed so far. It
//! deliberately exposes no backward seek: both the header parser and the
//! rebuild's data pass depend on visiting addresses in non-decreasing order
//! for correctness, not just efficiency, so the ordering contract is part
//! of the interface.

use std::io::Read;

use crate::error::{Error, Result};
use crate::READ_BUFFER_SIZE;

/// A forward-only, chunk-buffered binary cursor over a byte source.
///
/// Suspension happens only at the "request more bytes" boundary: the reader
/// pulls one buffer-sized chunk at a time from the source and serves reads
/// and skips out of it.
///
/// # Example
///
/// ```rust
/// use rompack::SequentialReader;
/// use std::io::Cursor;
///
/// let mut r = SequentialReader::new(Cursor::new(b"ROM2\x01\x00".to_vec()));
/// let magic = r.read_bytes(4).unwrap();
/// assert_eq!(&magic, b"ROM2");
/// assert_eq!(r.read_u16_le().unwrap(), 1);
/// assert_eq!(r.position(), 6);
/// ```
pub struct SequentialReader<R> {
    source: R,
    chunk: Box<[u8]>,
    /// Valid bytes in `chunk`.
    chunk_len: usize,
    /// Next unread byte within `chunk`.
    chunk_pos: usize,
    position: u64,
}

impl<R: Read> SequentialReader<R> {
    /// Creates a new reader over `source`, positioned at byte 0.
    pub fn new(source: R) -> Self {
        Self {
            source,
            chunk: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
            chunk_len: 0,
            chunk_pos: 0,
            position: 0,
        }
    }

    /// Returns the number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Pulls the next chunk from the source.
    ///
    /// Fails with [`Error::UnexpectedEnd`] if the source is exhausted while
    /// `needed` more bytes are still required.
    fn refill(&mut self, needed: u64) -> Result<()> {
        let n = self.source.read(&mut self.chunk)?;
        if n == 0 {
            return Err(Error::UnexpectedEnd {
                position: self.position,
                needed,
            });
        }
        self.chunk_len = n;
        self.chunk_pos = 0;
        Ok(())
    }

    /// Reads exactly `buf.len()` bytes, advancing the position.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.chunk_pos >= self.chunk_len {
                self.refill((buf.len() - filled) as u64)?;
            }
            let take = (self.chunk_len - self.chunk_pos).min(buf.len() - filled);
            buf[filled..filled + take]
                .copy_from_slice(&self.chunk[self.chunk_pos..self.chunk_pos + take]);
            self.chunk_pos += take;
            self.position += take as u64;
            filled += take;
        }
        Ok(())
    }

    /// Reads exactly `n` bytes into a new vector.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads an unsigned 16-bit little-endian integer.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Reads an unsigned 32-bit little-endian integer.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads bytes up to (and consuming) a NUL terminator, decoding the
    /// rest as UTF-8.
    ///
    /// Invalid sequences are replaced rather than rejected; shipped
    /// containers occasionally carry names in legacy encodings.
    pub fn read_cstr(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let b = self.read_u8()?;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Discards `n` bytes without materializing them.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let mut remaining = n;
        while remaining > 0 {
            if self.chunk_pos >= self.chunk_len {
                self.refill(remaining)?;
            }
            let take = ((self.chunk_len - self.chunk_pos) as u64).min(remaining);
            self.chunk_pos += take as usize;
            self.position += take;
            remaining -= take;
        }
        Ok(())
    }

    /// Advances to the absolute byte address `target`.
    ///
    /// Fails with [`Error::OutOfOrder`] if `target` is behind the current
    /// position. That situation means a caller computed inconsistent
    /// offsets; it is a parser/rebuild bug, not a recoverable condition.
    pub fn skip_to(&mut self, target: u64) -> Result<()> {
        if target < self.position {
            return Err(Error::OutOfOrder {
                position: self.position,
                requested: target,
            });
        }
        self.skip(target - self.position)
    }
}
