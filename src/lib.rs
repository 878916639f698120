//! Native TCP client for columnar analytic databases
//!
//! This crate re-exports the public surface of the protocol stack:
//!
//! - connection and statement API: [`Client`], [`Connection`],
//!   [`ClientOptions`], [`QueryResponse`];
//! - the data model: [`Block`], [`Value`], [`ColumnType`] and the type
//!   descriptor parser;
//! - insert sources: [`Rows`], [`ValuesInput`] and the [`RowInput`] trait.
//!
//! ```no_run
//! use clickhouse_native::{Client, ClientOptions};
//!
//! # fn main() -> clickhouse_native::Result<()> {
//! let client = Client::connect(ClientOptions::new("localhost"))?;
//! let response = client.send_query("SELECT number FROM system.numbers LIMIT 10")?;
//! for row in response.rows() {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```

pub use clickhouse_native_client::{
    Client, ClientError, ClientOptions, Connection, ConnectionState, QueryResponse, ResponseItem,
    Result, RowInput, Rows, ValuesInput,
};
pub use clickhouse_native_data::{
    Block, BlockInfo, Column, ColumnType, DataError, Row, SqlType, Value, parse_type,
};
pub use clickhouse_native_protocol::{
    ClientInfo, Progress, ProfileInfo, ServerException, ServerInfo,
};
pub use clickhouse_native_wire::{CompressionMethod, WireError};
