//! Common test utilities: a scripted in-process server speaking the
//! native wire format

// Each integration-test binary compiles this module; not every binary
// uses every helper.
#![allow(dead_code)]

use clickhouse_native_data::Block;
use clickhouse_native_protocol::{client_packet, server_packet};
use clickhouse_native_wire::{WireReader, WireWriter};
use std::io::{BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;

pub const SERVER_REVISION: u64 = 54441;

/// A listener plus the thread running the test's server script. Scripts
/// accept sessions, assert on what the client sent, and reply with
/// hand-encoded packets.
pub struct MockServer {
    port: u16,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub fn start<F>(script: F) -> MockServer
    where
        F: FnOnce(&TcpListener) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || script(&listener));
        MockServer { port, handle }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the script to finish, propagating its assertion failures.
    pub fn join(self) {
        if let Err(panic) = self.handle.join() {
            std::panic::resume_unwind(panic);
        }
    }
}

/// One accepted connection, seen from the server side
pub struct ServerSession {
    reader: WireReader<BufReader<TcpStream>>,
    writer: WireWriter<BufWriter<TcpStream>>,
    /// Set from the Query packet's compression flag
    compressed: bool,
}

impl ServerSession {
    pub fn accept(listener: &TcpListener) -> ServerSession {
        let (stream, _) = listener.accept().unwrap();
        ServerSession {
            reader: WireReader::new(BufReader::new(stream.try_clone().unwrap())),
            writer: WireWriter::new(BufWriter::new(stream)),
            compressed: false,
        }
    }

    pub fn accept_and_handshake(listener: &TcpListener) -> ServerSession {
        let mut session = ServerSession::accept(listener);
        session.handshake();
        session
    }

    /// Consume the client Hello and reply with a fully featured server
    /// Hello.
    pub fn handshake(&mut self) {
        assert_eq!(self.reader.read_var_uint().unwrap(), client_packet::HELLO);
        let _client_name = self.reader.read_string().unwrap();
        let _version_major = self.reader.read_var_uint().unwrap();
        let _version_minor = self.reader.read_var_uint().unwrap();
        let _client_revision = self.reader.read_var_uint().unwrap();
        let _database = self.reader.read_string().unwrap();
        let _username = self.reader.read_string().unwrap();
        let _password = self.reader.read_string().unwrap();

        self.writer.write_var_uint(server_packet::HELLO).unwrap();
        self.writer.write_string("MockHouse").unwrap();
        self.writer.write_var_uint(23).unwrap();
        self.writer.write_var_uint(8).unwrap();
        self.writer.write_var_uint(SERVER_REVISION).unwrap();
        self.writer.write_string("UTC").unwrap();
        self.writer.write_string("mock-1").unwrap();
        self.writer.write_var_uint(1).unwrap();
        self.writer.flush().unwrap();
    }

    /// Consume one Query packet (identity block, settings, stage, flags)
    /// plus its empty-Data terminator, returning the query text.
    pub fn read_query(&mut self) -> String {
        assert_eq!(self.reader.read_var_uint().unwrap(), client_packet::QUERY);
        let _query_id = self.reader.read_string().unwrap();

        // Client identity block; present because our Hello advertised a
        // modern revision.
        let _query_kind = self.reader.read_u8().unwrap();
        let _initial_user = self.reader.read_string().unwrap();
        let _initial_query_id = self.reader.read_string().unwrap();
        let _initial_address = self.reader.read_string().unwrap();
        let _interface = self.reader.read_u8().unwrap();
        let _os_user = self.reader.read_string().unwrap();
        let _hostname = self.reader.read_string().unwrap();
        let _client_name = self.reader.read_string().unwrap();
        let _version_major = self.reader.read_var_uint().unwrap();
        let _version_minor = self.reader.read_var_uint().unwrap();
        let _client_revision = self.reader.read_var_uint().unwrap();
        let _quota_key = self.reader.read_string().unwrap();

        loop {
            let name = self.reader.read_string().unwrap();
            if name.is_empty() {
                break;
            }
            let _value = self.reader.read_string().unwrap();
        }

        let _stage = self.reader.read_var_uint().unwrap();
        self.compressed = self.reader.read_u8().unwrap() == 1;
        let query = self.reader.read_string().unwrap();

        let terminator = self.read_data();
        assert!(terminator.is_empty());
        query
    }

    /// Consume one client Data packet and return its block.
    pub fn read_data(&mut self) -> Block {
        assert_eq!(self.reader.read_var_uint().unwrap(), client_packet::DATA);
        let _table_name = self.reader.read_string().unwrap();
        Block::read(&mut self.reader, self.compressed).unwrap()
    }

    pub fn send_data(&mut self, block: &Block) {
        self.send_block_packet(server_packet::DATA, block);
    }

    pub fn send_totals(&mut self, block: &Block) {
        self.send_block_packet(server_packet::TOTALS, block);
    }

    fn send_block_packet(&mut self, tag: u64, block: &Block) {
        let compression = self
            .compressed
            .then_some(clickhouse_native_wire::CompressionMethod::Lz4);
        self.writer.write_var_uint(tag).unwrap();
        self.writer.write_string("").unwrap();
        block.write(&mut self.writer, compression).unwrap();
        self.writer.flush().unwrap();
    }

    pub fn send_progress(&mut self, rows: u64, bytes: u64, total_rows: u64) {
        self.writer.write_var_uint(server_packet::PROGRESS).unwrap();
        self.writer.write_var_uint(rows).unwrap();
        self.writer.write_var_uint(bytes).unwrap();
        self.writer.write_var_uint(total_rows).unwrap();
        self.writer.flush().unwrap();
    }

    pub fn send_profile_info(&mut self, rows: u64, blocks: u64, bytes: u64) {
        self.writer
            .write_var_uint(server_packet::PROFILE_INFO)
            .unwrap();
        self.writer.write_var_uint(rows).unwrap();
        self.writer.write_var_uint(blocks).unwrap();
        self.writer.write_var_uint(bytes).unwrap();
        self.writer.write_u8(0).unwrap();
        self.writer.write_var_uint(rows).unwrap();
        self.writer.write_u8(1).unwrap();
        self.writer.flush().unwrap();
    }

    pub fn send_end_of_stream(&mut self) {
        self.writer
            .write_var_uint(server_packet::END_OF_STREAM)
            .unwrap();
        self.writer.flush().unwrap();
    }

    pub fn send_exception(&mut self, code: i32, message: &str) {
        self.writer.write_var_uint(server_packet::EXCEPTION).unwrap();
        self.writer.write_i32(code).unwrap();
        self.writer.write_string("DB::Exception").unwrap();
        self.writer.write_string(message).unwrap();
        self.writer.write_string("").unwrap();
        self.writer.write_u8(0).unwrap();
        self.writer.flush().unwrap();
    }

    /// Answer one liveness probe.
    pub fn expect_ping(&mut self) {
        assert_eq!(self.reader.read_var_uint().unwrap(), client_packet::PING);
        self.writer.write_var_uint(server_packet::PONG).unwrap();
        self.writer.flush().unwrap();
    }

    /// Write raw bytes, bypassing packet encoding.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_bytes(bytes).unwrap();
        self.writer.flush().unwrap();
    }
}
