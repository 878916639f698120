//! Error types for packet codecs

use thiserror::Error;

/// Result type for packet operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding packets
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Server tag not in the expected set
    #[error("unknown server packet tag {0}")]
    UnknownPacket(u64),

    /// Error from the data layer (blocks, column types)
    #[error(transparent)]
    Data(#[from] clickhouse_native_data::DataError),

    /// Error from the wire codec
    #[error(transparent)]
    Wire(#[from] clickhouse_native_wire::WireError),
}
