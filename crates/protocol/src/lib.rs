//! Packet-level definitions of the native wire protocol
//!
//! This crate defines the typed client requests and server responses
//! exchanged after a TCP connection is established: the packet tag
//! constants, the revision thresholds that gate optional fields, and the
//! encoders/decoders for each packet body. Connection sequencing lives in
//! the client crate; everything here is stateless.

pub mod error;
pub mod info;
pub mod messages;
pub mod responses;

pub use error::{ProtocolError, Result};
pub use info::{ClientInfo, ServerInfo};
pub use messages::{HelloRequest, QueryRequest, write_cancel, write_data, write_ping};
pub use responses::{Progress, ProfileInfo, ServerException, ServerPacket, read_packet};

/// Client → server packet tags
pub mod client_packet {
    pub const HELLO: u64 = 0;
    pub const QUERY: u64 = 1;
    pub const DATA: u64 = 2;
    pub const CANCEL: u64 = 3;
    pub const PING: u64 = 4;
}

/// Server → client packet tags
pub mod server_packet {
    pub const HELLO: u64 = 0;
    pub const DATA: u64 = 1;
    pub const EXCEPTION: u64 = 2;
    pub const PROGRESS: u64 = 3;
    pub const PONG: u64 = 4;
    pub const END_OF_STREAM: u64 = 5;
    pub const PROFILE_INFO: u64 = 6;
    pub const TOTALS: u64 = 7;
    pub const EXTREMES: u64 = 8;
}

/// Wire-format capability thresholds. Optional fields are gated on the
/// server revision reported in its Hello.
pub mod revision {
    pub const MIN_REVISION_WITH_CLIENT_INFO: u64 = 54032;
    pub const MIN_REVISION_WITH_SERVER_TIMEZONE: u64 = 54058;
    pub const MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO: u64 = 54060;
    pub const MIN_REVISION_WITH_SERVER_DISPLAY_NAME: u64 = 54372;
    pub const MIN_REVISION_WITH_VERSION_PATCH: u64 = 54401;
}

pub const CLIENT_NAME: &str = "clickhouse-native";
pub const CLIENT_VERSION_MAJOR: u64 = 1;
pub const CLIENT_VERSION_MINOR: u64 = 1;
pub const CLIENT_REVISION: u64 = 54380;

/// Query processing stage requested by this client: run to completion.
pub const COMPLETE_STAGE: u64 = 2;
