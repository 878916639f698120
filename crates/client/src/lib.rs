//! Native TCP client: connection state machine and statement drivers
//!
//! This crate owns the stateful side of the protocol. A [`Connection`] is a
//! single TCP session: handshake, queries, insert streaming, ping. A
//! [`Client`] wraps one connection with the health-check/reconnect policy
//! and exposes the statement-level API: `send_query`, `send_insert`,
//! `ping`, `close`.
//!
//! Connections are deliberately single-threaded: the socket and codecs are
//! not safe for concurrent use, and callers needing parallelism open more
//! clients.

pub mod client;
pub mod connection;
pub mod error;
pub mod insert;
pub mod options;
pub mod response;

pub use client::Client;
pub use connection::{Connection, ConnectionState};
pub use error::{ClientError, Result};
pub use insert::{RowInput, Rows, ValuesInput};
pub use options::ClientOptions;
pub use response::{QueryResponse, ResponseItem};
