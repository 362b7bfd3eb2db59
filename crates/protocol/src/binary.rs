//! Binary reading and writing utilities for the snapshot protocol.
//!
//! All values are little-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ProtocolError;

/// A reader for parsing binary protocol messages.
///
/// Every read is bounds-checked; running out of data yields
/// [`ProtocolError::UnexpectedEof`] and leaves the cursor untouched.
#[derive(Debug)]
pub struct BinaryReader {
    buf: Bytes,
    consumed: usize,
}

impl BinaryReader {
    /// Create a new reader from raw bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            buf: data.into(),
            consumed: 0,
        }
    }

    /// Returns remaining bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Returns true once every byte has been consumed.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// Number of bytes read so far.
    #[inline]
    pub fn offset(&self) -> usize {
        self.consumed
    }

    #[inline]
    fn ensure(&self, n: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() >= n {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedEof)
        }
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        self.consumed += 1;
        Ok(self.buf.get_u8())
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        self.ensure(2)?;
        self.consumed += 2;
        Ok(self.buf.get_u16_le())
    }

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        self.ensure(4)?;
        self.consumed += 4;
        Ok(self.buf.get_f32_le())
    }
}

/// A writer for building binary protocol messages.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the current length.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    #[inline]
    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    /// Write raw bytes.
    pub fn put_slice(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Consume the writer and return the built buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    /// Get current buffer as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian() {
        let mut r = BinaryReader::new(vec![0x34, 0x12, 0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_f32().unwrap(), 1.0);
        assert!(r.is_exhausted());
        assert_eq!(r.offset(), 6);
    }

    #[test]
    fn test_short_read_is_an_error_not_a_panic() {
        let mut r = BinaryReader::new(vec![0x01, 0x02, 0x03]);
        assert_eq!(r.read_f32(), Err(ProtocolError::UnexpectedEof));
        // Cursor is left where it was.
        assert_eq!(r.remaining(), 3);
        assert_eq!(r.read_u16().unwrap(), 0x0201);
        assert_eq!(r.read_u16(), Err(ProtocolError::UnexpectedEof));
        assert_eq!(r.read_u8().unwrap(), 0x03);
    }

    #[test]
    fn test_writer_layout() {
        let mut w = BinaryWriter::new();
        w.put_u16(2);
        w.put_u8(1);
        w.put_f32(-0.5);
        assert_eq!(w.as_slice(), &[0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0xbf]);
    }
}
