//! Client → server packet encoders
//!
//! Every request starts with its packet tag as a var_uint. The Query packet
//! carries the client identity block and the settings map when the server
//! revision supports them; Data packets wrap a block body which is the only
//! compressible region of the stream.

use crate::error::Result;
use crate::info::ClientInfo;
use crate::{
    CLIENT_NAME, CLIENT_REVISION, CLIENT_VERSION_MAJOR, CLIENT_VERSION_MINOR, COMPLETE_STAGE,
    client_packet, revision,
};
use clickhouse_native_data::Block;
use clickhouse_native_wire::{CompressionMethod, WireWriter};
use std::collections::HashMap;
use std::io::Write;

/// Interface tag reported in the client identity block: native TCP.
const INTERFACE_TCP: u8 = 1;

/// Query kind reported in the client identity block: initial query.
const QUERY_KIND_INITIAL: u8 = 1;

/// Handshake request sent once per connection
#[derive(Debug)]
pub struct HelloRequest<'a> {
    pub database: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

impl HelloRequest<'_> {
    pub fn write<W: Write>(&self, writer: &mut WireWriter<W>) -> Result<()> {
        writer.write_var_uint(client_packet::HELLO)?;
        writer.write_string(CLIENT_NAME)?;
        writer.write_var_uint(CLIENT_VERSION_MAJOR)?;
        writer.write_var_uint(CLIENT_VERSION_MINOR)?;
        writer.write_var_uint(CLIENT_REVISION)?;
        writer.write_string(self.database)?;
        writer.write_string(self.username)?;
        writer.write_string(self.password)?;
        Ok(())
    }
}

/// One query (SELECT, DDL, or the INSERT prefix) with its settings
#[derive(Debug)]
pub struct QueryRequest<'a> {
    pub query_id: &'a str,
    pub client_info: &'a ClientInfo,
    pub settings: &'a HashMap<String, String>,
    pub compression: bool,
    pub query: &'a str,
}

impl QueryRequest<'_> {
    pub fn write<W: Write>(&self, writer: &mut WireWriter<W>, server_revision: u64) -> Result<()> {
        writer.write_var_uint(client_packet::QUERY)?;
        writer.write_string(self.query_id)?;

        if server_revision >= revision::MIN_REVISION_WITH_CLIENT_INFO {
            self.write_client_info(writer, server_revision)?;
        }

        for (name, value) in self.settings {
            writer.write_string(name)?;
            writer.write_string(value)?;
        }
        // Empty name terminates the settings sequence.
        writer.write_string("")?;

        writer.write_var_uint(COMPLETE_STAGE)?;
        writer.write_u8(u8::from(self.compression))?;
        writer.write_string(self.query)?;
        Ok(())
    }

    fn write_client_info<W: Write>(
        &self,
        writer: &mut WireWriter<W>,
        server_revision: u64,
    ) -> Result<()> {
        writer.write_u8(QUERY_KIND_INITIAL)?;
        writer.write_string("")?; // initial user
        writer.write_string("")?; // initial query id
        writer.write_string(&self.client_info.initial_address)?;
        writer.write_u8(INTERFACE_TCP)?;
        writer.write_string(&os_user())?;
        writer.write_string(&self.client_info.hostname)?;
        writer.write_string(&self.client_info.client_name)?;
        writer.write_var_uint(CLIENT_VERSION_MAJOR)?;
        writer.write_var_uint(CLIENT_VERSION_MINOR)?;
        writer.write_var_uint(CLIENT_REVISION)?;
        if server_revision >= revision::MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO {
            writer.write_string("")?; // quota key
        }
        Ok(())
    }
}

/// Write one Data packet: tag, table name, then the block body. The same
/// encoding with an empty block serves as both the end-of-query marker and
/// the insert terminator.
pub fn write_data<W: Write>(
    writer: &mut WireWriter<W>,
    block: &Block,
    compression: Option<CompressionMethod>,
) -> Result<()> {
    writer.write_var_uint(client_packet::DATA)?;
    writer.write_string("")?; // temporary table name
    block.write(writer, compression)?;
    Ok(())
}

pub fn write_ping<W: Write>(writer: &mut WireWriter<W>) -> Result<()> {
    writer.write_var_uint(client_packet::PING)?;
    Ok(())
}

pub fn write_cancel<W: Write>(writer: &mut WireWriter<W>) -> Result<()> {
    writer.write_var_uint(client_packet::CANCEL)?;
    Ok(())
}

fn os_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clickhouse_native_wire::WireReader;
    use std::io::Cursor;

    #[test]
    fn test_hello_request_layout() {
        let mut writer = WireWriter::new(Vec::new());
        HelloRequest {
            database: "analytics",
            username: "default",
            password: "",
        }
        .write(&mut writer)
        .unwrap();

        let mut reader = WireReader::new(Cursor::new(writer.into_inner()));
        assert_eq!(reader.read_var_uint().unwrap(), client_packet::HELLO);
        assert_eq!(reader.read_string().unwrap(), CLIENT_NAME);
        assert_eq!(reader.read_var_uint().unwrap(), CLIENT_VERSION_MAJOR);
        assert_eq!(reader.read_var_uint().unwrap(), CLIENT_VERSION_MINOR);
        assert_eq!(reader.read_var_uint().unwrap(), CLIENT_REVISION);
        assert_eq!(reader.read_string().unwrap(), "analytics");
        assert_eq!(reader.read_string().unwrap(), "default");
        assert_eq!(reader.read_string().unwrap(), "");
    }

    #[test]
    fn test_query_request_layout() {
        let info = ClientInfo::new("db.local", 9000);
        let mut settings = HashMap::new();
        settings.insert("max_threads".to_string(), "4".to_string());

        let mut writer = WireWriter::new(Vec::new());
        QueryRequest {
            query_id: "",
            client_info: &info,
            settings: &settings,
            compression: true,
            query: "SELECT 1",
        }
        .write(&mut writer, CLIENT_REVISION)
        .unwrap();

        let mut reader = WireReader::new(Cursor::new(writer.into_inner()));
        assert_eq!(reader.read_var_uint().unwrap(), client_packet::QUERY);
        assert_eq!(reader.read_string().unwrap(), "");

        // Client identity block.
        assert_eq!(reader.read_u8().unwrap(), QUERY_KIND_INITIAL);
        assert_eq!(reader.read_string().unwrap(), "");
        assert_eq!(reader.read_string().unwrap(), "");
        assert_eq!(reader.read_string().unwrap(), "db.local:9000");
        assert_eq!(reader.read_u8().unwrap(), INTERFACE_TCP);
        let _os_user = reader.read_string().unwrap();
        assert_eq!(reader.read_string().unwrap(), "db.local");
        let _client_name = reader.read_string().unwrap();
        assert_eq!(reader.read_var_uint().unwrap(), CLIENT_VERSION_MAJOR);
        assert_eq!(reader.read_var_uint().unwrap(), CLIENT_VERSION_MINOR);
        assert_eq!(reader.read_var_uint().unwrap(), CLIENT_REVISION);
        assert_eq!(reader.read_string().unwrap(), ""); // quota key

        // Settings, then the empty-name terminator.
        assert_eq!(reader.read_string().unwrap(), "max_threads");
        assert_eq!(reader.read_string().unwrap(), "4");
        assert_eq!(reader.read_string().unwrap(), "");

        assert_eq!(reader.read_var_uint().unwrap(), COMPLETE_STAGE);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert_eq!(reader.read_string().unwrap(), "SELECT 1");
    }

    #[test]
    fn test_old_server_gets_no_client_info() {
        let info = ClientInfo::new("db.local", 9000);
        let settings = HashMap::new();

        let mut writer = WireWriter::new(Vec::new());
        QueryRequest {
            query_id: "q1",
            client_info: &info,
            settings: &settings,
            compression: false,
            query: "SELECT 1",
        }
        .write(&mut writer, revision::MIN_REVISION_WITH_CLIENT_INFO - 1)
        .unwrap();

        let mut reader = WireReader::new(Cursor::new(writer.into_inner()));
        assert_eq!(reader.read_var_uint().unwrap(), client_packet::QUERY);
        assert_eq!(reader.read_string().unwrap(), "q1");
        // Straight to the settings terminator.
        assert_eq!(reader.read_string().unwrap(), "");
        assert_eq!(reader.read_var_uint().unwrap(), COMPLETE_STAGE);
    }

    #[test]
    fn test_control_packets_are_bare_tags() {
        let mut writer = WireWriter::new(Vec::new());
        write_ping(&mut writer).unwrap();
        assert_eq!(writer.into_inner(), vec![client_packet::PING as u8]);

        let mut writer = WireWriter::new(Vec::new());
        write_cancel(&mut writer).unwrap();
        assert_eq!(writer.into_inner(), vec![client_packet::CANCEL as u8]);
    }

    #[test]
    fn test_empty_data_packet_bytes_are_stable() {
        // The end-of-query marker and the insert terminator must encode
        // identically.
        let mut first = WireWriter::new(Vec::new());
        write_data(&mut first, &Block::new(), None).unwrap();
        let mut second = WireWriter::new(Vec::new());
        write_data(&mut second, &Block::new(), None).unwrap();
        assert_eq!(first.into_inner(), second.into_inner());
    }
}
