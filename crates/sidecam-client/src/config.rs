//! Endpoint configuration.

use serde::{Deserialize, Serialize};

use crate::{ClientError, ClientResult};

/// Identifies the remote inference service. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Service hostname or IP address.
    pub host: String,

    /// Service port (1-65535).
    pub port: u16,

    /// Whether to negotiate TLS on the transport.
    pub use_tls: bool,
}

impl Endpoint {
    /// Create an endpoint, validating the host and port.
    pub fn new(host: impl Into<String>, port: u16, use_tls: bool) -> ClientResult<Self> {
        let host = host.into();
        if host.is_empty() {
            return Err(ClientError::InvalidEndpoint("empty host".to_string()));
        }
        if port == 0 {
            return Err(ClientError::InvalidEndpoint("port must be 1-65535".to_string()));
        }
        Ok(Self { host, port, use_tls })
    }

    /// URI used to build the transport channel.
    pub fn uri(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
