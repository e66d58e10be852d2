//! Error types.
//!
//! Connect and transport failures are recoverable: the supervisor closes the
//! session and retries. A request that cannot be built, and encode or decode
//! failures, are fatal and surface as [`FatalError`].

use mediation_core::{DecodeError, EncodeError};
use tokio_tungstenite::tungstenite;

/// Dialing or authenticating failed.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("invalid connection request for {url}: {reason}")]
    InvalidRequest { url: String, reason: String },
    #[error("handshake with {url} failed")]
    Handshake {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
}

/// Reading or writing an open session failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("websocket error")]
    WebSocket(#[from] tungstenite::Error),
}

/// Sending an envelope failed.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Unrecoverable condition that stops the supervisor.
///
/// The embedding application decides how to terminate.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("connection request cannot be built; check the server address")]
    InvalidRequest(#[source] ConnectError),
    #[error("registration envelope could not be encoded")]
    Encode(#[source] EncodeError),
    #[error("server sent a message this client cannot decode; check server version")]
    Decode(#[source] DecodeError),
}
