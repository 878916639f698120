//! Server → client packet decoders
//!
//! [`read_packet`] dispatches on the tag var_uint and decodes one complete
//! packet body. Data, Totals and Extremes carry blocks (compressed when
//! negotiated); the exception packet carries a nested chain of server-side
//! errors.

use crate::error::{ProtocolError, Result};
use crate::info::ServerInfo;
use crate::{revision, server_packet};
use clickhouse_native_data::Block;
use clickhouse_native_wire::WireReader;
use std::fmt;
use std::io::Read;

/// Exception chains longer than this are treated as corruption.
const MAX_EXCEPTION_DEPTH: usize = 64;

/// One decoded server packet
#[derive(Debug)]
pub enum ServerPacket {
    Hello(ServerInfo),
    Data(Block),
    Exception(ServerException),
    Progress(Progress),
    Pong,
    EndOfStream,
    ProfileInfo(ProfileInfo),
    Totals(Block),
    Extremes(Block),
}

impl ServerPacket {
    /// Packet name for logging and state-machine diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerPacket::Hello(_) => "Hello",
            ServerPacket::Data(_) => "Data",
            ServerPacket::Exception(_) => "Exception",
            ServerPacket::Progress(_) => "Progress",
            ServerPacket::Pong => "Pong",
            ServerPacket::EndOfStream => "EndOfStream",
            ServerPacket::ProfileInfo(_) => "ProfileInfo",
            ServerPacket::Totals(_) => "Totals",
            ServerPacket::Extremes(_) => "Extremes",
        }
    }
}

/// Server-side error, possibly chained through `has_nested`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerException {
    pub code: i32,
    pub name: String,
    pub message: String,
    pub stack_trace: String,
    pub nested: Option<Box<ServerException>>,
}

impl fmt::Display for ServerException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.code, self.message)?;
        if let Some(nested) = &self.nested {
            write!(f, "; caused by: {}", nested)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServerException {}

/// Rows/bytes processed so far, as reported by the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub rows: u64,
    pub bytes: u64,
    pub total_rows: u64,
}

impl Progress {
    /// Fold another progress report into this one.
    pub fn accumulate(&mut self, other: Progress) {
        self.rows += other.rows;
        self.bytes += other.bytes;
        self.total_rows = self.total_rows.max(other.total_rows);
    }
}

/// Execution profile reported at the end of a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileInfo {
    pub rows: u64,
    pub blocks: u64,
    pub bytes: u64,
    pub applied_limit: bool,
    pub rows_before_limit: u64,
    pub calculated_rows_before_limit: bool,
}

/// Decode one server packet. `compressed_data` reflects the negotiated
/// compression setting and applies to block-carrying packets only.
pub fn read_packet<R: Read>(
    reader: &mut WireReader<R>,
    compressed_data: bool,
) -> Result<ServerPacket> {
    let tag = reader.read_var_uint()?;
    match tag {
        server_packet::HELLO => Ok(ServerPacket::Hello(read_hello(reader)?)),
        server_packet::DATA => Ok(ServerPacket::Data(read_block(reader, compressed_data)?)),
        server_packet::EXCEPTION => Ok(ServerPacket::Exception(read_exception(reader)?)),
        server_packet::PROGRESS => Ok(ServerPacket::Progress(Progress {
            rows: reader.read_var_uint()?,
            bytes: reader.read_var_uint()?,
            total_rows: reader.read_var_uint()?,
        })),
        server_packet::PONG => Ok(ServerPacket::Pong),
        server_packet::END_OF_STREAM => Ok(ServerPacket::EndOfStream),
        server_packet::PROFILE_INFO => Ok(ServerPacket::ProfileInfo(ProfileInfo {
            rows: reader.read_var_uint()?,
            blocks: reader.read_var_uint()?,
            bytes: reader.read_var_uint()?,
            applied_limit: reader.read_u8()? != 0,
            rows_before_limit: reader.read_var_uint()?,
            calculated_rows_before_limit: reader.read_u8()? != 0,
        })),
        server_packet::TOTALS => Ok(ServerPacket::Totals(read_block(reader, compressed_data)?)),
        server_packet::EXTREMES => {
            Ok(ServerPacket::Extremes(read_block(reader, compressed_data)?))
        }
        other => Err(ProtocolError::UnknownPacket(other)),
    }
}

fn read_hello<R: Read>(reader: &mut WireReader<R>) -> Result<ServerInfo> {
    let name = reader.read_string()?;
    let version_major = reader.read_var_uint()?;
    let version_minor = reader.read_var_uint()?;
    let server_revision = reader.read_var_uint()?;

    let timezone = if server_revision >= revision::MIN_REVISION_WITH_SERVER_TIMEZONE {
        Some(reader.read_string()?)
    } else {
        None
    };
    let display_name = if server_revision >= revision::MIN_REVISION_WITH_SERVER_DISPLAY_NAME {
        Some(reader.read_string()?)
    } else {
        None
    };
    let version_patch = if server_revision >= revision::MIN_REVISION_WITH_VERSION_PATCH {
        Some(reader.read_var_uint()?)
    } else {
        None
    };

    Ok(ServerInfo {
        name,
        version_major,
        version_minor,
        revision: server_revision,
        timezone,
        display_name,
        version_patch,
    })
}

fn read_block<R: Read>(reader: &mut WireReader<R>, compressed_data: bool) -> Result<Block> {
    let _table_name = reader.read_string()?;
    Ok(Block::read(reader, compressed_data)?)
}

fn read_exception<R: Read>(reader: &mut WireReader<R>) -> Result<ServerException> {
    read_exception_link(reader, 0)
}

fn read_exception_link<R: Read>(
    reader: &mut WireReader<R>,
    depth: usize,
) -> Result<ServerException> {
    if depth >= MAX_EXCEPTION_DEPTH {
        return Err(ProtocolError::Wire(
            clickhouse_native_wire::WireError::MalformedFrame(
                "exception chain exceeds depth limit".to_string(),
            ),
        ));
    }
    let code = reader.read_i32()?;
    let name = reader.read_string()?;
    let message = reader.read_string()?;
    let stack_trace = reader.read_string()?;
    let nested = if reader.read_u8()? != 0 {
        Some(Box::new(read_exception_link(reader, depth + 1)?))
    } else {
        None
    };
    Ok(ServerException {
        code,
        name,
        message,
        stack_trace,
        nested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clickhouse_native_data::{Value, parse_type};
    use clickhouse_native_wire::WireWriter;
    use std::io::Cursor;

    fn packet_from(bytes: Vec<u8>) -> Result<ServerPacket> {
        let mut reader = WireReader::new(Cursor::new(bytes));
        read_packet(&mut reader, false)
    }

    fn write_hello(writer: &mut WireWriter<Vec<u8>>, server_revision: u64) {
        writer.write_var_uint(server_packet::HELLO).unwrap();
        writer.write_string("ClickHouse").unwrap();
        writer.write_var_uint(21).unwrap();
        writer.write_var_uint(8).unwrap();
        writer.write_var_uint(server_revision).unwrap();
        if server_revision >= revision::MIN_REVISION_WITH_SERVER_TIMEZONE {
            writer.write_string("UTC").unwrap();
        }
        if server_revision >= revision::MIN_REVISION_WITH_SERVER_DISPLAY_NAME {
            writer.write_string("analytics-1").unwrap();
        }
        if server_revision >= revision::MIN_REVISION_WITH_VERSION_PATCH {
            writer.write_var_uint(3).unwrap();
        }
    }

    #[test]
    fn test_hello_with_all_optional_fields() {
        let mut writer = WireWriter::new(Vec::new());
        write_hello(&mut writer, 54441);
        match packet_from(writer.into_inner()).unwrap() {
            ServerPacket::Hello(info) => {
                assert_eq!(info.name, "ClickHouse");
                assert_eq!(info.revision, 54441);
                assert_eq!(info.timezone.as_deref(), Some("UTC"));
                assert_eq!(info.display_name.as_deref(), Some("analytics-1"));
                assert_eq!(info.version_patch, Some(3));
            }
            other => panic!("expected Hello, got {}", other.kind()),
        }
    }

    #[test]
    fn test_hello_from_old_revision() {
        let mut writer = WireWriter::new(Vec::new());
        write_hello(&mut writer, revision::MIN_REVISION_WITH_SERVER_TIMEZONE);
        match packet_from(writer.into_inner()).unwrap() {
            ServerPacket::Hello(info) => {
                assert_eq!(info.timezone.as_deref(), Some("UTC"));
                assert_eq!(info.display_name, None);
                assert_eq!(info.version_patch, None);
            }
            other => panic!("expected Hello, got {}", other.kind()),
        }
    }

    #[test]
    fn test_progress_and_control_packets() {
        let mut writer = WireWriter::new(Vec::new());
        writer.write_var_uint(server_packet::PROGRESS).unwrap();
        writer.write_var_uint(100).unwrap();
        writer.write_var_uint(4096).unwrap();
        writer.write_var_uint(1000).unwrap();
        match packet_from(writer.into_inner()).unwrap() {
            ServerPacket::Progress(progress) => {
                assert_eq!(
                    progress,
                    Progress {
                        rows: 100,
                        bytes: 4096,
                        total_rows: 1000
                    }
                );
            }
            other => panic!("expected Progress, got {}", other.kind()),
        }

        assert!(matches!(
            packet_from(vec![server_packet::PONG as u8]).unwrap(),
            ServerPacket::Pong
        ));
        assert!(matches!(
            packet_from(vec![server_packet::END_OF_STREAM as u8]).unwrap(),
            ServerPacket::EndOfStream
        ));
    }

    #[test]
    fn test_exception_chain_decoding() {
        let mut writer = WireWriter::new(Vec::new());
        writer.write_var_uint(server_packet::EXCEPTION).unwrap();
        writer.write_i32(60).unwrap();
        writer.write_string("DB::Exception").unwrap();
        writer.write_string("Table default.t does not exist").unwrap();
        writer.write_string("<stack>").unwrap();
        writer.write_u8(1).unwrap();
        writer.write_i32(16).unwrap();
        writer.write_string("DB::Exception").unwrap();
        writer.write_string("No such table").unwrap();
        writer.write_string("<stack>").unwrap();
        writer.write_u8(0).unwrap();

        match packet_from(writer.into_inner()).unwrap() {
            ServerPacket::Exception(exception) => {
                assert_eq!(exception.code, 60);
                let nested = exception.nested.as_ref().unwrap();
                assert_eq!(nested.code, 16);
                assert!(nested.nested.is_none());
                assert!(exception.to_string().contains("caused by"));
            }
            other => panic!("expected Exception, got {}", other.kind()),
        }
    }

    #[test]
    fn test_data_packet_carries_block() {
        let mut block = Block::new();
        block
            .append_column(
                "n",
                parse_type("UInt16").unwrap(),
                vec![Value::UInt16(1), Value::UInt16(2)],
            )
            .unwrap();

        let mut writer = WireWriter::new(Vec::new());
        writer.write_var_uint(server_packet::DATA).unwrap();
        writer.write_string("").unwrap();
        block.write(&mut writer, None).unwrap();

        match packet_from(writer.into_inner()).unwrap() {
            ServerPacket::Data(decoded) => assert_eq!(decoded, block),
            other => panic!("expected Data, got {}", other.kind()),
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(
            packet_from(vec![42]),
            Err(ProtocolError::UnknownPacket(42))
        ));
    }
}
