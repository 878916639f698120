//! Compressed-frame codec for data-carrying packet bodies
//!
//! Frame layout:
//!
//! ```text
//! [checksum: 16B CityHash128] [method: u8] [compressed_size: u32] [uncompressed_size: u32] [payload]
//! ```
//!
//! `compressed_size` counts the method byte, both size fields and the
//! payload (`9 + payload.len()`). The checksum covers exactly those
//! `compressed_size` bytes and is written as the 16 little-endian bytes of
//! the CityHash128 digest. The outer control framing (packet tag, table
//! name, block-info tags) is never compressed.

use crate::error::{Result, WireError};
use crate::read::WireReader;
use crate::write::WireWriter;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

const METHOD_LZ4: u8 = 0x82;
const METHOD_ZSTD: u8 = 0x90;

/// Method byte + compressed size + uncompressed size.
const FRAME_HEADER_LEN: usize = 9;

/// Decompressed bodies larger than this are treated as corruption.
const MAX_FRAME_LEN: u32 = 256 << 20;

const ZSTD_LEVEL: i32 = 3;

/// Compression algorithm negotiated for data packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionMethod {
    Lz4,
    Zstd,
}

impl CompressionMethod {
    pub fn method_byte(self) -> u8 {
        match self {
            CompressionMethod::Lz4 => METHOD_LZ4,
            CompressionMethod::Zstd => METHOD_ZSTD,
        }
    }

    fn from_method_byte(byte: u8) -> Result<Self> {
        match byte {
            METHOD_LZ4 => Ok(CompressionMethod::Lz4),
            METHOD_ZSTD => Ok(CompressionMethod::Zstd),
            other => Err(WireError::MalformedFrame(format!(
                "unknown compression method byte 0x{:02x}",
                other
            ))),
        }
    }
}

/// Compress `body` and write it as one checksummed frame.
pub fn write_compressed<W: Write>(
    writer: &mut WireWriter<W>,
    method: CompressionMethod,
    body: &[u8],
) -> Result<()> {
    let payload = match method {
        CompressionMethod::Lz4 => lz4_flex::block::compress(body),
        CompressionMethod::Zstd => zstd::stream::encode_all(body, ZSTD_LEVEL)
            .map_err(|e| WireError::MalformedFrame(format!("zstd compression failed: {}", e)))?,
    };

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.push(method.method_byte());
    frame.extend_from_slice(&((FRAME_HEADER_LEN + payload.len()) as u32).to_le_bytes());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);

    let checksum = cityhash_rs::cityhash_102_128(&frame);
    writer.write_bytes(&checksum.to_le_bytes())?;
    writer.write_bytes(&frame)
}

/// Read one compressed frame, verify its checksum and return the
/// decompressed body.
pub fn read_compressed<R: Read>(reader: &mut WireReader<R>) -> Result<Vec<u8>> {
    let mut checksum = [0u8; 16];
    reader.read_bytes(&mut checksum)?;

    let mut frame = vec![0u8; FRAME_HEADER_LEN];
    reader.read_bytes(&mut frame)?;

    let compressed_size = u32::from_le_bytes(frame[1..5].try_into().unwrap_or_default());
    let uncompressed_size = u32::from_le_bytes(frame[5..9].try_into().unwrap_or_default());
    if compressed_size < FRAME_HEADER_LEN as u32
        || compressed_size > MAX_FRAME_LEN
        || uncompressed_size > MAX_FRAME_LEN
    {
        return Err(WireError::MalformedFrame(format!(
            "implausible compressed frame sizes ({} compressed, {} uncompressed)",
            compressed_size, uncompressed_size
        )));
    }

    frame.resize(compressed_size as usize, 0);
    reader.read_bytes(&mut frame[FRAME_HEADER_LEN..])?;

    if cityhash_rs::cityhash_102_128(&frame).to_le_bytes() != checksum {
        return Err(WireError::ChecksumMismatch);
    }

    let method = CompressionMethod::from_method_byte(frame[0])?;
    let payload = &frame[FRAME_HEADER_LEN..];
    let body = match method {
        CompressionMethod::Lz4 => {
            lz4_flex::block::decompress(payload, uncompressed_size as usize)
                .map_err(|e| WireError::MalformedFrame(format!("lz4 payload invalid: {}", e)))?
        }
        CompressionMethod::Zstd => zstd::stream::decode_all(payload)
            .map_err(|e| WireError::MalformedFrame(format!("zstd payload invalid: {}", e)))?,
    };
    if body.len() != uncompressed_size as usize {
        return Err(WireError::MalformedFrame(format!(
            "decompressed size {} disagrees with header {}",
            body.len(),
            uncompressed_size
        )));
    }
    Ok(body)
}
