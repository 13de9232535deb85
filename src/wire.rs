//! Bounds-checked big-endian reader over a borrowed buffer.
//!
//! Every parser in the crate walks attacker-influenced bytes through a
//! [`Reader`]. Each read checks the requested length against what is left
//! before touching the slice, so a declared length that overruns the input
//! surfaces as [`Error::InsufficientData`] instead of a panic or a short copy.

use crate::error::{Error, Result};

/// Cursor over a byte slice. `pos <= buf.len()` always holds.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unconsumed tail of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Take the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if n > available {
            return Err(Error::short(n, available));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Take the next `N` bytes as an owned array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Advance past `n` bytes without looking at them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// 24-bit length as used by TLS handshake headers.
    pub fn read_u24(&mut self) -> Result<u32> {
        let [a, b, c] = self.read_array::<3>()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Split off the next `n` bytes as an independent reader.
    pub fn sub_reader(&mut self, n: usize) -> Result<Reader<'a>> {
        self.read_bytes(n).map(Reader::new)
    }
}
