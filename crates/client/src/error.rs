//! Error types surfaced by the client
//!
//! The lower layers keep their own error enums; this one flattens them so
//! callers see the protocol's closed error set in a single place. Frame and
//! protocol errors mark the connection closed; a [`ClientError::Server`]
//! does not, the connection returns to idle after consuming it.

use clickhouse_native_protocol::{ProtocolError, ServerException};
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised by connections and the statement drivers
#[derive(Debug, Error)]
pub enum ClientError {
    /// Error from the wire codec (malformed frames, checksum failures,
    /// timeouts, closed sockets)
    #[error(transparent)]
    Wire(#[from] clickhouse_native_wire::WireError),

    /// Error from the data layer (unknown types, mismatched values)
    #[error(transparent)]
    Data(#[from] clickhouse_native_data::DataError),

    /// Server tag not in the expected set
    #[error("unknown server packet tag {0}")]
    UnknownPacket(u64),

    /// Error reported by the server; the connection stays usable
    #[error("server exception: {0}")]
    Server(#[from] ServerException),

    /// State-machine invariant breached
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownPacket(tag) => ClientError::UnknownPacket(tag),
            ProtocolError::Data(data) => ClientError::Data(data),
            ProtocolError::Wire(wire) => ClientError::Wire(wire),
        }
    }
}

impl ClientError {
    /// Whether the error invalidates the connection. Server exceptions are
    /// consumed in-stream and leave the connection idle; everything else
    /// closes it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ClientError::Server(_))
    }
}
