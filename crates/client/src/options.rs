//! Client configuration
//!
//! Immutable once a connection is opened. Connection-string parsing is a
//! caller concern; this is the object such a parser produces.

use clickhouse_native_wire::CompressionMethod;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_USERNAME: &str = "default";
pub const DEFAULT_DATABASE: &str = "default";
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Rows drawn from an insert source per data block.
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 8192;

/// Configuration for a client and its connections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    host: String,
    port: u16,
    username: String,
    /// Never serialised; deserialisation without the field yields an
    /// empty password.
    #[serde(skip_serializing, default)]
    password: String,
    database: String,
    /// Deadline for each blocking socket operation, not for a whole query
    query_timeout: Duration,
    connect_timeout: Duration,
    compression: Option<CompressionMethod>,
    settings: HashMap<String, String>,
    insert_batch_size: usize,
}

impl ClientOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            password: String::new(),
            database: DEFAULT_DATABASE.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            compression: None,
            settings: HashMap::new(),
            insert_batch_size: DEFAULT_INSERT_BATCH_SIZE,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_compression(mut self, method: CompressionMethod) -> Self {
        self.compression = Some(method);
        self
    }

    /// Add one server setting forwarded verbatim in every Query packet.
    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    pub fn with_insert_batch_size(mut self, batch_size: usize) -> Self {
        self.insert_batch_size = batch_size.max(1);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn compression(&self) -> Option<CompressionMethod> {
        self.compression
    }

    pub fn settings(&self) -> &HashMap<String, String> {
        &self.settings
    }

    pub fn insert_batch_size(&self) -> usize {
        self.insert_batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::new("db.local");
        assert_eq!(options.address(), "db.local:9000");
        assert_eq!(options.username(), "default");
        assert_eq!(options.database(), "default");
        assert_eq!(options.insert_batch_size(), 8192);
        assert!(options.compression().is_none());
    }

    #[test]
    fn test_serialisation_omits_password() {
        let options = ClientOptions::new("db.local")
            .with_credentials("writer", "secret")
            .with_compression(CompressionMethod::Zstd);
        let json = serde_json::to_string(&options).unwrap();
        assert!(!json.contains("password"), "json: {}", json);
        assert!(!json.contains("secret"), "json: {}", json);

        let restored: ClientOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.username(), "writer");
        assert_eq!(restored.password(), "");
        assert_eq!(restored.compression(), Some(CompressionMethod::Zstd));
    }

    #[test]
    fn test_builder_chain() {
        let options = ClientOptions::new("db.local")
            .with_port(9440)
            .with_credentials("writer", "secret")
            .with_database("metrics")
            .with_compression(CompressionMethod::Lz4)
            .with_setting("max_threads", "8");
        assert_eq!(options.address(), "db.local:9440");
        assert_eq!(options.username(), "writer");
        assert_eq!(options.settings().get("max_threads").unwrap(), "8");
        assert_eq!(options.compression(), Some(CompressionMethod::Lz4));
    }
}
