//! Connection identity exchanged during and after the handshake

use crate::CLIENT_NAME;

/// What the server reported about itself in its Hello. Immutable for the
/// lifetime of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version_major: u64,
    pub version_minor: u64,
    pub revision: u64,
    /// Reported when the server revision supports it
    pub timezone: Option<String>,
    pub display_name: Option<String>,
    pub version_patch: Option<u64>,
}

/// What this client reports about itself in every Query packet. Built
/// once at connection construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// `host:port` of the endpoint this client dialled
    pub initial_address: String,
    pub hostname: String,
    pub client_name: String,
}

impl ClientInfo {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            initial_address: format!("{}:{}", host, port),
            hostname: host.to_string(),
            client_name: format!("{} client", CLIENT_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_info_address() {
        let info = ClientInfo::new("analytics.internal", 9000);
        assert_eq!(info.initial_address, "analytics.internal:9000");
        assert_eq!(info.hostname, "analytics.internal");
        assert!(info.client_name.contains("client"));
    }
}
