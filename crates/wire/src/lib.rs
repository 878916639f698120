//! Byte-stream codec for the native wire protocol
//!
//! This crate provides the two lowest layers of the protocol stack:
//! - primitive reads/writes over any byte stream: little-endian fixed-width
//!   integers and floats, LEB128 variable-length unsigned integers, and
//!   length-prefixed strings;
//! - the compressed-frame codec used for data-carrying packet bodies
//!   (LZ4 or ZSTD payloads guarded by a CityHash128 checksum).

pub mod compress;
pub mod error;
pub mod read;
pub mod write;

pub use compress::{CompressionMethod, read_compressed, write_compressed};
pub use error::{Result, WireError};
pub use read::WireReader;
pub use write::WireWriter;
