//! Wire primitive encoding/decoding: integers, floats, a frequency type,
//! booleans, length-prefixed strings and blobs.
//!
//! Encoding is positional and type-directed: every primitive has exactly
//! one canonical representation (§6 of the design notes). Integers are
//! big-endian. Floats are encoded as the big-endian bit pattern of their
//! IEEE-754 representation. Strings and blobs are a `u32` length prefix
//! followed by exactly that many bytes.

use crate::buffer::{Cursor, GrowBuf};
use crate::error::{RemoteError, Result};

/// Maximum length accepted for a single string/blob prefix. Guards
/// against a corrupt or hostile length field forcing an enormous
/// allocation before the short-read check would otherwise catch it.
const MAX_PREFIXED_LEN: u32 = 64 * 1024 * 1024;

/// Serializes primitive and composite values into a [`GrowBuf`].
pub trait WireWrite {
    fn put_u8(&mut self, v: u8);
    fn put_u16(&mut self, v: u16);
    fn put_u32(&mut self, v: u32);
    fn put_u64(&mut self, v: u64);
    fn put_i8(&mut self, v: i8);
    fn put_i16(&mut self, v: i16);
    fn put_i32(&mut self, v: i32);
    fn put_i64(&mut self, v: i64);
    fn put_f32(&mut self, v: f32);
    fn put_f64(&mut self, v: f64);
    /// The `freq` wire type: an IEEE-754 double, same encoding as `f64`.
    fn put_freq(&mut self, v: f64) {
        self.put_f64(v);
    }
    fn put_bool(&mut self, v: bool);
    fn put_str(&mut self, v: &str);
    fn put_blob(&mut self, v: &[u8]);
}

impl WireWrite for GrowBuf {
    fn put_u8(&mut self, v: u8) {
        self.allocate(1)[0] = v;
    }

    fn put_u16(&mut self, v: u16) {
        self.allocate(2).copy_from_slice(&v.to_be_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.allocate(4).copy_from_slice(&v.to_be_bytes());
    }

    fn put_u64(&mut self, v: u64) {
        self.allocate(8).copy_from_slice(&v.to_be_bytes());
    }

    fn put_i8(&mut self, v: i8) {
        self.put_u8(v as u8);
    }

    fn put_i16(&mut self, v: i16) {
        self.put_u16(v as u16);
    }

    fn put_i32(&mut self, v: i32) {
        self.put_u32(v as u32);
    }

    fn put_i64(&mut self, v: i64) {
        self.put_u64(v as u64);
    }

    fn put_f32(&mut self, v: f32) {
        self.put_u32(v.to_bits());
    }

    fn put_f64(&mut self, v: f64) {
        self.put_u64(v.to_bits());
    }

    fn put_bool(&mut self, v: bool) {
        self.put_u8(if v { 1 } else { 0 });
    }

    fn put_str(&mut self, v: &str) {
        self.put_blob(v.as_bytes());
    }

    fn put_blob(&mut self, v: &[u8]) {
        self.put_u32(v.len() as u32);
        self.extend(v);
    }
}

/// Deserializes primitive and composite values from a [`Cursor`].
///
/// Deserialization is total on well-formed inputs: every method returns a
/// typed [`RemoteError::Protocol`] on short read or an over-long length
/// prefix, and never reads past the cursor's declared bounds.
pub trait WireRead<'a> {
    fn get_u8(&mut self) -> Result<u8>;
    fn get_u16(&mut self) -> Result<u16>;
    fn get_u32(&mut self) -> Result<u32>;
    fn get_u64(&mut self) -> Result<u64>;
    fn get_i8(&mut self) -> Result<i8>;
    fn get_i16(&mut self) -> Result<i16>;
    fn get_i32(&mut self) -> Result<i32>;
    fn get_i64(&mut self) -> Result<i64>;
    fn get_f32(&mut self) -> Result<f32>;
    fn get_f64(&mut self) -> Result<f64>;
    fn get_freq(&mut self) -> Result<f64> {
        self.get_f64()
    }
    fn get_bool(&mut self) -> Result<bool>;
    fn get_str(&mut self) -> Result<String>;
    fn get_blob(&mut self) -> Result<Vec<u8>>;
}

impl<'a> WireRead<'a> for Cursor<'a> {
    fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn get_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn get_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn get_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes(b.try_into().unwrap()))
    }

    fn get_i8(&mut self) -> Result<i8> {
        Ok(self.get_u8()? as i8)
    }

    fn get_i16(&mut self) -> Result<i16> {
        Ok(self.get_u16()? as i16)
    }

    fn get_i32(&mut self) -> Result<i32> {
        Ok(self.get_u32()? as i32)
    }

    fn get_i64(&mut self) -> Result<i64> {
        Ok(self.get_u64()? as i64)
    }

    fn get_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.get_u32()?))
    }

    fn get_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.get_u64()?))
    }

    fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8()? != 0)
    }

    fn get_str(&mut self) -> Result<String> {
        let bytes = self.get_blob()?;
        String::from_utf8(bytes)
            .map_err(|e| RemoteError::Protocol(format!("invalid utf-8 string: {e}")))
    }

    fn get_blob(&mut self) -> Result<Vec<u8>> {
        let len = self.get_u32()?;
        if len > MAX_PREFIXED_LEN {
            return Err(RemoteError::Protocol(format!(
                "length prefix {len} exceeds maximum {MAX_PREFIXED_LEN}"
            )));
        }
        if len as usize > self.remaining() {
            return Err(RemoteError::Protocol(format!(
                "length prefix {len} exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        Ok(self.take(len as usize)?.to_vec())
    }
}
