//! Primitive reads over a byte stream
//!
//! All fixed-width integers and floats are little-endian. Variable-length
//! unsigned integers use LEB128: 7-bit groups, least significant first,
//! high bit set on every byte except the last.

use crate::error::{Result, WireError};
use std::io::Read;

/// Length-prefixed strings larger than this are treated as corruption.
const MAX_STRING_LEN: u64 = 1 << 20;

/// A LEB128 encoding of a u64 never exceeds ten bytes.
const MAX_VAR_UINT_LEN: usize = 10;

/// Reads protocol primitives from an underlying byte stream.
///
/// Reads block until the requested bytes are available or the stream's
/// deadline expires; a deadline expiry maps to [`WireError::Timeout`] and
/// end-of-stream mid-primitive to [`WireError::MalformedFrame`].
pub struct WireReader<R> {
    inner: R,
}

macro_rules! read_le {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            self.inner.read_exact(&mut buf)?;
            Ok(<$ty>::from_le_bytes(buf))
        }
    };
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Access the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    read_le!(read_u16, u16);
    read_le!(read_u32, u32);
    read_le!(read_u64, u64);
    read_le!(read_i16, i16);
    read_le!(read_i32, i32);
    read_le!(read_i64, i64);
    read_le!(read_f32, f32);
    read_le!(read_f64, f64);

    /// Read a LEB128-encoded unsigned integer.
    pub fn read_var_uint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        for i in 0..MAX_VAR_UINT_LEN {
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(WireError::MalformedFrame(
            "variable-length integer exceeds ten bytes".to_string(),
        ))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_byte_string()?;
        String::from_utf8(bytes)
            .map_err(|_| WireError::MalformedFrame("string is not valid UTF-8".to_string()))
    }

    /// Read a length-prefixed run of raw bytes.
    pub fn read_byte_string(&mut self) -> Result<Vec<u8>> {
        let len = self.read_var_uint()?;
        if len > MAX_STRING_LEN {
            return Err(WireError::MalformedFrame(format!(
                "string length {} exceeds limit",
                len
            )));
        }
        self.read_fixed(len as usize)
    }

    /// Read exactly `len` raw bytes. Trailing NULs are retained verbatim.
    pub fn read_fixed(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Fill `buf` with raw bytes from the stream.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        Ok(())
    }
}
