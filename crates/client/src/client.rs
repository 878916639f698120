//! Statement-level client with health-checked reconnect
//!
//! A [`Client`] owns one physical connection behind a mutex. Before every
//! statement it pings the connection and, on failure, swaps in a freshly
//! opened one and closes the old; this is the sole reconnect path. Callers
//! needing concurrency open multiple clients.

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::insert::{self, RowInput, ValuesInput};
use crate::options::ClientOptions;
use crate::response::QueryResponse;
use clickhouse_native_protocol::ServerInfo;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::OnceLock;

/// Marker splitting an INSERT statement into its wire query and the
/// literal rows. Case-insensitive, optional whitespace before `(`.
const VALUES_MARKER: &str = r"[Vv][Aa][Ll][Uu][Ee][Ss]\s*\(";

fn values_marker() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(VALUES_MARKER).expect("marker pattern is well-formed"))
}

/// Statement-level handle over one reconnecting connection
pub struct Client {
    options: ClientOptions,
    connection: Mutex<Connection>,
}

impl Client {
    /// Open a connection and hand back the client wrapping it.
    pub fn connect(options: ClientOptions) -> Result<Client> {
        let connection = Connection::open(&options)?;
        Ok(Client {
            options,
            connection: Mutex::new(connection),
        })
    }

    /// Run a statement that produces a response stream: any non-INSERT
    /// statement, or an INSERT without inline VALUES.
    pub fn send_query(&self, sql: &str) -> Result<QueryResponse> {
        let mut connection = self.connection.lock();
        self.ensure_healthy(&mut connection)?;
        connection.send_query(sql)
    }

    /// Run an INSERT whose rows come from `input`. The statement is split
    /// at the `VALUES (` marker; the prefix travels as the wire query and
    /// the literal tail is ignored in favour of `input`.
    pub fn send_insert(&self, sql: &str, input: &mut dyn RowInput) -> Result<u64> {
        let query = self.split_insert(sql)?.0;
        let mut connection = self.connection.lock();
        self.ensure_healthy(&mut connection)?;
        run_insert(
            &mut connection,
            query,
            input,
            self.options.insert_batch_size(),
        )
    }

    /// Run an INSERT taking its rows from the statement's own literal
    /// VALUES tail.
    pub fn send_prepared_insert(&self, sql: &str) -> Result<u64> {
        let (query, tail) = self.split_insert(sql)?;
        let mut input = ValuesInput::new(tail);
        let mut connection = self.connection.lock();
        self.ensure_healthy(&mut connection)?;
        run_insert(
            &mut connection,
            query,
            &mut input,
            self.options.insert_batch_size(),
        )
    }

    /// Probe the current connection without replacing it.
    pub fn ping(&self) -> bool {
        self.connection.lock().ping()
    }

    /// Close the underlying connection. Idempotent.
    pub fn close(&self) {
        self.connection.lock().close();
    }

    /// What the server reported about itself at handshake.
    pub fn server_info(&self) -> ServerInfo {
        self.connection.lock().server_info().clone()
    }

    /// Split an INSERT at the VALUES marker: wire query prefix (up to but
    /// not including the opening parenthesis) and the literal tail after
    /// it.
    fn split_insert<'a>(&self, sql: &'a str) -> Result<(&'a str, &'a str)> {
        match values_marker().find(sql) {
            Some(found) => Ok((&sql[..found.end() - 1], &sql[found.end()..])),
            None => Err(ClientError::ProtocolViolation(
                "INSERT statement has no VALUES clause".to_string(),
            )),
        }
    }

    /// Replace the connection with a fresh one if it fails a ping.
    fn ensure_healthy(&self, connection: &mut Connection) -> Result<()> {
        if connection.ping() {
            return Ok(());
        }
        tracing::warn!("connection to {} unhealthy, reopening", self.options.address());
        let fresh = Connection::open(&self.options)?;
        let mut stale = std::mem::replace(connection, fresh);
        stale.close();
        Ok(())
    }
}

fn run_insert(
    connection: &mut Connection,
    query: &str,
    input: &mut dyn RowInput,
    batch_size: usize,
) -> Result<u64> {
    let header = connection.send_insert_query(query)?;
    let mut rows_written = 0u64;
    loop {
        let block = insert::next_block(&header, input, batch_size)?;
        if block.is_empty() {
            break;
        }
        rows_written += block.row_count() as u64;
        connection.send_insert_block(&block)?;
    }
    connection.finish_insert()?;
    Ok(rows_written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_marker_variants() {
        let pattern = values_marker();
        for sql in [
            "INSERT INTO t VALUES (1)",
            "insert into t values(1)",
            "INSERT INTO t Values  \t(1)",
        ] {
            assert!(pattern.find(sql).is_some(), "no match in {}", sql);
        }
        assert!(pattern.find("SELECT values_column FROM t").is_none());
    }

    #[test]
    fn test_split_positions() {
        let sql = "INSERT INTO t (a, b) VALUES (1, 'x'), (2, 'y')";
        let found = values_marker().find(sql).unwrap();
        assert_eq!(&sql[..found.end() - 1], "INSERT INTO t (a, b) VALUES ");
        assert_eq!(&sql[found.end()..], "1, 'x'), (2, 'y')");
    }
}
