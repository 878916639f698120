//! Error types for the wire codec

use thiserror::Error;

/// Result type for wire operations
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors surfaced by the byte-stream and compressed-frame codecs
#[derive(Debug, Error)]
pub enum WireError {
    /// Truncated or structurally invalid wire bytes
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Compressed frame failed CityHash128 verification
    #[error("compressed frame checksum mismatch")]
    ChecksumMismatch,

    /// Blocking socket operation exceeded its deadline
    #[error("operation timed out")]
    Timeout,

    /// Socket closed by the peer or the connection marked closed
    #[error("connection closed")]
    ConnectionClosed,
}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            // Read timeouts surface as TimedOut on most platforms and
            // WouldBlock on others.
            ErrorKind::TimedOut | ErrorKind::WouldBlock => WireError::Timeout,
            ErrorKind::UnexpectedEof => {
                WireError::MalformedFrame("unexpected end of stream".to_string())
            }
            _ => WireError::ConnectionClosed,
        }
    }
}
