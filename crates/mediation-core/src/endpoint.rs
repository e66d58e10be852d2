//! Where and as whom to connect.
//!
//! An endpoint is fixed for the lifetime of the process. The server URL is
//! always `ws://<server_address>/vmturbo/remoteMediation`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

/// Fixed path of the mediation endpoint on the server.
const MEDIATION_PATH: &str = "/vmturbo/remoteMediation";

/// Connection target and credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    server_address: String,
    local_address: String,
    username: String,
    password: String,
}

impl Endpoint {
    /// Create a new endpoint.
    ///
    /// `server_address` is `host[:port]`, `local_address` is sent as the
    /// handshake origin.
    pub fn new(
        server_address: impl Into<String>,
        local_address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, EndpointError> {
        let server_address = server_address.into();
        let username = username.into();

        if server_address.trim().is_empty() {
            return Err(EndpointError::EmptyServerAddress);
        }
        if username.is_empty() {
            return Err(EndpointError::EmptyUsername);
        }

        Ok(Self {
            server_address,
            local_address: local_address.into(),
            username,
            password: password.into(),
        })
    }

    /// The server's `host[:port]`.
    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    /// The local address used as the handshake origin.
    pub fn local_address(&self) -> &str {
        &self.local_address
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The WebSocket URL to dial.
    pub fn server_url(&self) -> String {
        format!("ws://{}{}", self.server_address, MEDIATION_PATH)
    }

    /// Value for the handshake `Origin` header.
    pub fn origin(&self) -> &str {
        &self.local_address
    }

    /// Value for the handshake `Authorization` header.
    pub fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("server_address", &self.server_address)
            .field("local_address", &self.local_address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Error constructing an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("server address cannot be empty")]
    EmptyServerAddress,
    #[error("username cannot be empty")]
    EmptyUsername,
}
