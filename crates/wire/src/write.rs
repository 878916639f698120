//! Primitive writes over a byte stream
//!
//! Mirror of the read side: little-endian fixed-width values, LEB128
//! variable-length unsigned integers, length-prefixed strings.

use crate::error::Result;
use std::io::Write;

/// Writes protocol primitives to an underlying byte stream.
pub struct WireWriter<W> {
    inner: W,
}

macro_rules! write_le {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) -> Result<()> {
            self.inner.write_all(&value.to_le_bytes())?;
            Ok(())
        }
    };
}

impl<W: Write> WireWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Access the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    write_le!(write_u8, u8);
    write_le!(write_u16, u16);
    write_le!(write_u32, u32);
    write_le!(write_u64, u64);
    write_le!(write_i8, i8);
    write_le!(write_i16, i16);
    write_le!(write_i32, i32);
    write_le!(write_i64, i64);
    write_le!(write_f32, f32);
    write_le!(write_f64, f64);

    /// Write a LEB128-encoded unsigned integer.
    pub fn write_var_uint(&mut self, mut value: u64) -> Result<()> {
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.inner.write_all(&[byte])?;
            if value == 0 {
                return Ok(());
            }
        }
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_byte_string(value.as_bytes())
    }

    /// Write a length-prefixed run of raw bytes.
    pub fn write_byte_string(&mut self, value: &[u8]) -> Result<()> {
        self.write_var_uint(value.len() as u64)?;
        self.write_bytes(value)
    }

    /// Write raw bytes with no prefix.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.inner.write_all(value)?;
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}
