//! The payload supplier contract for new and replaced file content.
//!
//! The engine never interprets replacement bytes. External collaborators
//! (font rasterizers, script compilers, text converters) hand content over
//! as a [`PayloadSupplier`], and the rebuild drains it straight into the
//! output, measuring the written length through the position-tracking sink.
//!
//! Two ready-made suppliers cover the common cases: [`BytesSupplier`] for
//! content already in memory and [`ReaderSupplier`] for streaming from any
//! [`Read`] source in bounded chunks.

use std::io::{self, Read, Write};

use crate::READ_BUFFER_SIZE;

/// A source of replacement payload bytes.
///
/// Implementations write their entire content to `out` exactly once. The
/// engine derives the file's recorded length from the sink position before
/// and after the call, so suppliers do not need to know their own length up
/// front.
pub trait PayloadSupplier {
    /// Writes the full payload to `out`.
    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()>;
}

/// Supplies a payload from an in-memory byte buffer.
///
/// ```rust
/// use rompack::{BytesSupplier, PayloadSupplier};
///
/// let mut supplier = BytesSupplier::new(b"patched script".to_vec());
/// let mut out = Vec::new();
/// supplier.write_to(&mut out).unwrap();
/// assert_eq!(out, b"patched script");
/// ```
#[derive(Debug, Clone)]
pub struct BytesSupplier {
    bytes: Vec<u8>,
}

impl BytesSupplier {
    /// Creates a supplier over `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl PayloadSupplier for BytesSupplier {
    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(&self.bytes)
    }
}

/// Supplies a payload by streaming from a [`Read`] source in 8 KiB chunks.
///
/// Suited to large assets (audio, art) that should not be buffered whole.
pub struct ReaderSupplier<R> {
    source: R,
}

impl<R: Read> ReaderSupplier<R> {
    /// Creates a supplier that drains `source` to the output.
    pub fn new(source: R) -> Self {
        Self { source }
    }
}

impl<R: Read> PayloadSupplier for ReaderSupplier<R> {
    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = self.source.read(&mut buf)?;
            if n == 0 {
                return Ok(());
            }
            out.write_all(&buf[..n])?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_bytes_supplier() {
        let mut s = BytesSupplier::new(vec![1, 2, 3]);
        let mut out = Vec::new();
        s.write_to(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_reader_supplier_streams_large_input() {
        let data: Vec<u8> = (0..READ_BUFFER_SIZE * 3 + 17).map(|i| i as u8).collect();
        let mut s = ReaderSupplier::new(Cursor::new(data.clone()));
        let mut out = Vec::new();
        s.write_to(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_empty_payload() {
        let mut s = BytesSupplier::new(Vec::new());
        let mut out = Vec::new();
        s.write_to(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
