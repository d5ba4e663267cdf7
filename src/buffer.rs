//! Growable byte buffer — the append-only container the codec and framing
//! layers build PDUs in.
//!
//! `GrowBuf` is the write side (geometric growth via `Vec<u8>`); `Cursor`
//! is the read side, a position into an immutable byte slice that the
//! codec advances as it deserializes primitives.

use crate::error::{RemoteError, Result};

/// An append-only byte buffer. A region returned by [`GrowBuf::allocate`]
/// stays valid until the next `allocate` or `clear` call, since growth may
/// reallocate the backing storage.
#[derive(Debug, Default, Clone)]
pub struct GrowBuf {
    bytes: Vec<u8>,
}

impl GrowBuf {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Discards all content without releasing capacity.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Appends `n` bytes at the tail, zero-initialized, and returns a
    /// writable region into them.
    pub fn allocate(&mut self, n: usize) -> &mut [u8] {
        let start = self.bytes.len();
        self.bytes.resize(start + n, 0);
        &mut self.bytes[start..]
    }

    /// Appends `src` verbatim.
    pub fn extend(&mut self, src: &[u8]) {
        self.bytes.extend_from_slice(src);
    }

    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for GrowBuf {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// A read cursor over an immutable byte slice, advanced sequentially by
/// the deserializer. Every read is bounds-checked; nothing is ever read
/// past the end of the slice.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Consumes and returns exactly `n` bytes, or a protocol error on
    /// short read.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(RemoteError::Protocol(format!(
                "short read: wanted {n} bytes, {} remaining",
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_grows_and_is_writable() {
        let mut buf = GrowBuf::new();
        let region = buf.allocate(4);
        region.copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(buf.data(), &[1, 2, 3, 4]);
        assert_eq!(buf.size(), 4);
    }

    #[test]
    fn clear_resets_size_not_capacity() {
        let mut buf = GrowBuf::new();
        buf.allocate(16);
        buf.clear();
        assert_eq!(buf.size(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn cursor_take_bounds_checked() {
        let data = [1u8, 2, 3];
        let mut cur = Cursor::new(&data);
        assert_eq!(cur.take(2).unwrap(), &[1, 2]);
        assert!(cur.take(2).is_err());
        assert_eq!(cur.take(1).unwrap(), &[3]);
    }
}
