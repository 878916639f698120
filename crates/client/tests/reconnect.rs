//! Connection lifecycle: reconnect swaps, closed sockets, timeouts

mod common;

use common::{MockServer, ServerSession};
use clickhouse_native_client::{
    Client, ClientError, ClientOptions, Connection, ConnectionState,
};
use clickhouse_native_data::{Block, Value, parse_type};
use clickhouse_native_wire::WireError;
use std::time::Duration;

fn one_row_block() -> Block {
    let mut block = Block::new();
    block
        .append_column("x", parse_type("UInt8").unwrap(), vec![Value::UInt8(1)])
        .unwrap();
    block
}

#[test]
fn test_failed_ping_swaps_in_fresh_connection() {
    let server = MockServer::start(|listener| {
        // First session dies right after the handshake.
        let session = ServerSession::accept_and_handshake(listener);
        drop(session);

        // The replacement serves the statement.
        let mut session = ServerSession::accept_and_handshake(listener);
        session.read_query();
        session.send_data(&one_row_block());
        session.send_end_of_stream();
    });

    let client = Client::connect(
        ClientOptions::new("127.0.0.1").with_port(server.port()),
    )
    .unwrap();

    // The dead socket fails the pre-statement ping, triggering the swap;
    // the statement itself runs on the fresh connection without another
    // probe.
    let response = client.send_query("SELECT 1").unwrap();
    assert_eq!(response.row_count(), 1);

    server.join();
}

#[test]
fn test_socket_closed_mid_read_never_returns_to_idle() {
    let server = MockServer::start(|listener| {
        let mut session = ServerSession::accept_and_handshake(listener);
        session.read_query();
        // A Data tag with nothing behind it, then a dead socket.
        session.send_raw(&[1]);
        drop(session);
    });

    let options = ClientOptions::new("127.0.0.1").with_port(server.port());
    let mut connection = Connection::open(&options).unwrap();

    assert!(connection.send_query("SELECT 1").is_err());
    assert_eq!(connection.state(), ConnectionState::Closed);

    // Every further operation reports the closed connection.
    match connection.send_query("SELECT 1") {
        Err(ClientError::Wire(WireError::ConnectionClosed)) => {}
        other => panic!("expected ConnectionClosed, got {:?}", other.err()),
    }
    assert!(!connection.ping());

    server.join();
}

#[test]
fn test_stalled_server_times_out() {
    let server = MockServer::start(|listener| {
        let mut session = ServerSession::accept_and_handshake(listener);
        session.read_query();
        // Say nothing; let the client's deadline expire.
        std::thread::sleep(Duration::from_millis(600));
    });

    let options = ClientOptions::new("127.0.0.1")
        .with_port(server.port())
        .with_query_timeout(Duration::from_millis(150));
    let mut connection = Connection::open(&options).unwrap();

    match connection.send_query("SELECT sleep(10)") {
        Err(ClientError::Wire(WireError::Timeout)) => {}
        other => panic!("expected Timeout, got {:?}", other.err()),
    }
    assert_eq!(connection.state(), ConnectionState::Closed);

    server.join();
}

#[test]
fn test_close_is_idempotent() {
    let server = MockServer::start(|listener| {
        let _session = ServerSession::accept_and_handshake(listener);
    });

    let client = Client::connect(
        ClientOptions::new("127.0.0.1").with_port(server.port()),
    )
    .unwrap();
    client.close();
    client.close();
    assert!(!client.ping());

    server.join();
}

#[test]
fn test_handshake_against_closed_port_fails() {
    // Bind then drop a listener to obtain a port that refuses connections.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let options = ClientOptions::new("127.0.0.1")
        .with_port(port)
        .with_connect_timeout(Duration::from_millis(500));
    assert!(Connection::open(&options).is_err());
}
