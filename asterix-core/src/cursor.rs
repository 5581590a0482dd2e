//! Bounded byte cursor for decoding and a capped writer for encoding.
//!
//! Every read checks the remaining length first and fails with
//! [`AsterixError::Underrun`] instead of panicking. All multi-byte integers
//! are big-endian, as everywhere in ASTERIX.

use crate::types::{AsterixError, Result};

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Read position over a borrowed byte span.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    /// Absolute offset of the next byte to be read.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn underrun(&self, needed: usize) -> AsterixError {
        AsterixError::Underrun {
            offset: self.pos,
            needed,
            remaining: self.remaining(),
        }
    }

    /// Fail with `Underrun` unless at least `n` bytes remain.
    pub fn require(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(self.underrun(n));
        }
        Ok(())
    }

    /// Return exactly `n` bytes and advance past them.
    pub fn read(&mut self, n: usize) -> Result<&'a [u8]> {
        self.require(n)?;
        let data: &'a [u8] = self.data;
        let out = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read(N)?);
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Read a 3-byte big-endian unsigned integer.
    pub fn read_u24(&mut self) -> Result<u32> {
        let b: [u8; 3] = self.read_array()?;
        Ok(((b[0] as u32) << 16) | ((b[1] as u32) << 8) | b[2] as u32)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.require(1)?;
        Ok(self.data[self.pos])
    }

    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.require(n)?;
        self.pos += n;
        Ok(())
    }

    /// Bytes consumed since `start` (an earlier [`Cursor::position`]).
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        &data[start..self.pos]
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Append-only output buffer with an optional hard size cap.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
    limit: Option<usize>,
}

impl Writer {
    pub fn new() -> Self {
        Writer::default()
    }

    /// Writer that refuses to grow past `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Writer {
            buf: Vec::with_capacity(limit),
            limit: Some(limit),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, b: u8) -> Result<()> {
        self.write_bytes(&[b])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Low 24 bits of `v`, big-endian.
    pub fn write_u24(&mut self, v: u32) -> Result<()> {
        self.write_bytes(&v.to_be_bytes()[1..])
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    /// Append all of `bytes` or nothing.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(max) = self.limit {
            let len = self.buf.len() + bytes.len();
            if len > max {
                return Err(AsterixError::TooLarge { len, max });
            }
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_integers() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A];
        let mut c = Cursor::new(&data);
        assert_eq!(c.read_u8().unwrap(), 0x01);
        assert_eq!(c.read_u16().unwrap(), 0x0203);
        assert_eq!(c.read_u24().unwrap(), 0x040506);
        assert_eq!(c.read_u32().unwrap(), 0x0708090A);
        assert!(c.is_empty());
    }

    #[test]
    fn test_underrun_reports_offset() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut c = Cursor::new(&data);
        c.advance(1).unwrap();
        let err = c.read_u32().unwrap_err();
        match err {
            AsterixError::Underrun {
                offset,
                needed,
                remaining,
            } => {
                assert_eq!(offset, 1);
                assert_eq!(needed, 4);
                assert_eq!(remaining, 2);
            }
            other => panic!("expected underrun, got {other:?}"),
        }
        // A failed read does not move the cursor
        assert_eq!(c.position(), 1);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0x81, 0x00];
        let mut c = Cursor::new(&data);
        assert_eq!(c.peek_u8().unwrap(), 0x81);
        assert_eq!(c.position(), 0);
        c.read_u8().unwrap();
        assert_eq!(c.consumed_since(0), &[0x81]);
    }

    #[test]
    fn test_writer_limit_is_atomic() {
        let mut w = Writer::with_limit(3);
        w.write_bytes(&[1, 2]).unwrap();
        assert!(matches!(
            w.write_bytes(&[3, 4]),
            Err(AsterixError::TooLarge { len: 4, max: 3 })
        ));
        assert_eq!(w.as_slice(), &[1, 2]);
        w.write_u8(3).unwrap();
        assert_eq!(w.into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn test_write_integers() {
        let mut w = Writer::new();
        w.write_u16(0x0203).unwrap();
        w.write_u24(0xFF040506).unwrap();
        w.write_u32(0x0708090A).unwrap();
        assert_eq!(
            w.as_slice(),
            &[0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A]
        );
    }
}
