//! One physical connection and its protocol state machine
//!
//! A connection moves through a fixed set of states; every server packet
//! is consumed in arrival order and checked against the current state.
//! Frame-level and protocol-level failures close the connection; a server
//! exception is consumed and returns the machine to idle.

use crate::error::{ClientError, Result};
use crate::options::ClientOptions;
use crate::response::{QueryResponse, ResponseItem};
use clickhouse_native_data::Block;
use clickhouse_native_protocol::{
    ClientInfo, HelloRequest, QueryRequest, ServerInfo, ServerPacket, read_packet, write_data,
    write_ping,
};
use clickhouse_native_wire::{CompressionMethod, WireError, WireReader, WireWriter};
use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

/// Protocol position of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Handshaking,
    Idle,
    AwaitingSampleHeader,
    SendingInsertData,
    AwaitingEndOfStream,
    AwaitingResponseStream,
}

/// A single TCP session with the server. Not safe for concurrent use;
/// callers serialise operations per connection.
pub struct Connection {
    state: ConnectionState,
    reader: WireReader<BufReader<TcpStream>>,
    writer: WireWriter<BufWriter<TcpStream>>,
    server_info: ServerInfo,
    client_info: ClientInfo,
    options: ClientOptions,
}

impl Connection {
    /// Dial the endpoint and run the handshake.
    pub fn open(options: &ClientOptions) -> Result<Connection> {
        let stream = dial(options)?;
        stream
            .set_read_timeout(Some(options.query_timeout()))
            .map_err(WireError::from)?;
        stream
            .set_write_timeout(Some(options.query_timeout()))
            .map_err(WireError::from)?;
        let _ = stream.set_nodelay(true);

        let mut reader = WireReader::new(BufReader::new(
            stream.try_clone().map_err(WireError::from)?,
        ));
        let mut writer = WireWriter::new(BufWriter::new(stream));

        HelloRequest {
            database: options.database(),
            username: options.username(),
            password: options.password(),
        }
        .write(&mut writer)?;
        writer.flush()?;

        let server_info = match read_packet(&mut reader, false)? {
            ServerPacket::Hello(info) => info,
            ServerPacket::Exception(exception) => return Err(ClientError::Server(exception)),
            other => {
                return Err(ClientError::ProtocolViolation(format!(
                    "unexpected {} packet during handshake",
                    other.kind()
                )));
            }
        };
        tracing::debug!(
            "handshake complete with {} (revision {})",
            server_info.name,
            server_info.revision
        );

        Ok(Connection {
            state: ConnectionState::Idle,
            reader,
            writer,
            server_info,
            client_info: ClientInfo::new(options.host(), options.port()),
            options: options.clone(),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Send a query and drain its full response stream.
    pub fn send_query(&mut self, query: &str) -> Result<QueryResponse> {
        self.expect_idle()?;
        self.state = ConnectionState::AwaitingResponseStream;
        if let Err(error) = self.write_query(query) {
            return self.fail(error);
        }

        let mut response = QueryResponse::default();
        loop {
            match self.receive_packet() {
                Ok(ServerPacket::Data(block)) => response.push(ResponseItem::Data(block)),
                Ok(ServerPacket::Totals(block)) => response.push(ResponseItem::Totals(block)),
                Ok(ServerPacket::Extremes(block)) => response.push(ResponseItem::Extremes(block)),
                Ok(ServerPacket::ProfileInfo(profile)) => {
                    response.push(ResponseItem::Profile(profile));
                }
                Ok(ServerPacket::Progress(progress)) => response.record_progress(progress),
                Ok(ServerPacket::EndOfStream) => {
                    self.state = ConnectionState::Idle;
                    return Ok(response);
                }
                Ok(ServerPacket::Exception(exception)) => {
                    return self.fail(ClientError::Server(exception));
                }
                Ok(other) => return self.fail(self.unexpected(&other)),
                Err(error) => return self.fail(error),
            }
        }
    }

    /// Send an insert query (the prefix up to `VALUES`) and wait for the
    /// server's sample header describing the target schema.
    pub fn send_insert_query(&mut self, query: &str) -> Result<Block> {
        self.expect_idle()?;
        self.state = ConnectionState::AwaitingSampleHeader;
        if let Err(error) = self.write_query(query) {
            return self.fail(error);
        }

        loop {
            match self.receive_packet() {
                Ok(ServerPacket::Data(header)) => {
                    self.state = ConnectionState::SendingInsertData;
                    return Ok(header);
                }
                Ok(ServerPacket::Progress(_)) => continue,
                Ok(ServerPacket::Exception(exception)) => {
                    return self.fail(ClientError::Server(exception));
                }
                Ok(other) => return self.fail(self.unexpected(&other)),
                Err(error) => return self.fail(error),
            }
        }
    }

    /// Stream one non-empty block of insert data.
    pub fn send_insert_block(&mut self, block: &Block) -> Result<()> {
        self.expect_state(ConnectionState::SendingInsertData)?;
        if block.is_empty() {
            return Err(ClientError::ProtocolViolation(
                "an empty block terminates the insert; use finish_insert".to_string(),
            ));
        }
        if let Err(error) = self.write_block(block) {
            return self.fail(error);
        }
        Ok(())
    }

    /// Send the empty terminator block and wait for end-of-stream.
    pub fn finish_insert(&mut self) -> Result<()> {
        self.expect_state(ConnectionState::SendingInsertData)?;
        self.state = ConnectionState::AwaitingEndOfStream;
        if let Err(error) = self.write_block(&Block::new()) {
            return self.fail(error);
        }

        loop {
            match self.receive_packet() {
                Ok(ServerPacket::EndOfStream) => {
                    self.state = ConnectionState::Idle;
                    return Ok(());
                }
                Ok(ServerPacket::Progress(_)) => continue,
                Ok(ServerPacket::Exception(exception)) => {
                    return self.fail(ClientError::Server(exception));
                }
                Ok(other) => return self.fail(self.unexpected(&other)),
                Err(error) => return self.fail(error),
            }
        }
    }

    /// Liveness probe. Failure is silent: the connection is marked closed
    /// and the caller is expected to replace it.
    pub fn ping(&mut self) -> bool {
        if self.state != ConnectionState::Idle {
            return false;
        }
        if write_ping(&mut self.writer).is_err() || self.writer.flush().is_err() {
            self.close();
            return false;
        }
        let has_compression = self.compression().is_some();
        loop {
            match read_packet(&mut self.reader, has_compression) {
                Ok(ServerPacket::Pong) => return true,
                Ok(ServerPacket::Progress(_)) => continue,
                _ => {
                    self.close();
                    return false;
                }
            }
        }
    }

    /// Close the connection. Idempotent; any pending operation on another
    /// handle fails with `ConnectionClosed`.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        let _ = self.writer.get_mut().get_ref().shutdown(Shutdown::Both);
    }

    fn write_query(&mut self, query: &str) -> Result<()> {
        QueryRequest {
            query_id: "",
            client_info: &self.client_info,
            settings: self.options.settings(),
            compression: self.compression().is_some(),
            query,
        }
        .write(&mut self.writer, self.server_info.revision)?;
        // An empty Data packet marks the end of the query body.
        let compression = self.compression();
        write_data(&mut self.writer, &Block::new(), compression)?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_block(&mut self, block: &Block) -> Result<()> {
        let compression = self.compression();
        write_data(&mut self.writer, block, compression)?;
        self.writer.flush()?;
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<ServerPacket> {
        let has_compression = self.compression().is_some();
        let packet = read_packet(&mut self.reader, has_compression)?;
        tracing::debug!("received {} packet", packet.kind());
        Ok(packet)
    }

    fn compression(&self) -> Option<CompressionMethod> {
        self.options.compression()
    }

    fn expect_idle(&self) -> Result<()> {
        self.expect_state(ConnectionState::Idle)
    }

    fn expect_state(&self, expected: ConnectionState) -> Result<()> {
        match self.state {
            state if state == expected => Ok(()),
            ConnectionState::Closed => Err(WireError::ConnectionClosed.into()),
            other => Err(ClientError::ProtocolViolation(format!(
                "connection is {:?}, expected {:?}",
                other, expected
            ))),
        }
    }

    fn unexpected(&self, packet: &ServerPacket) -> ClientError {
        ClientError::ProtocolViolation(format!(
            "unexpected {} packet in state {:?}",
            packet.kind(),
            self.state
        ))
    }

    /// Surface `error`, updating the state machine: server exceptions
    /// return the connection to idle, everything else closes it.
    fn fail<T>(&mut self, error: ClientError) -> Result<T> {
        if error.is_fatal() {
            self.close();
        } else {
            self.state = ConnectionState::Idle;
        }
        Err(error)
    }
}

fn dial(options: &ClientOptions) -> Result<TcpStream> {
    let addrs = options
        .address()
        .to_socket_addrs()
        .map_err(WireError::from)?;
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, options.connect_timeout()) {
            Ok(stream) => return Ok(stream),
            Err(error) => last_error = Some(error),
        }
    }
    Err(match last_error {
        Some(error) => WireError::from(error).into(),
        None => WireError::ConnectionClosed.into(),
    })
}
