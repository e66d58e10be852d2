//! Core types for the remote mediation protocol.
//!
//! This crate provides the protocol primitives: where to connect, what goes
//! over the wire, and how it is encoded. The connection lifecycle lives in
//! `mediation-client`.

mod codec;
mod endpoint;
mod message;

pub use codec::{BoxError, Codec, DecodeError, EncodeError, JsonCodec};
pub use endpoint::{Endpoint, EndpointError};
pub use message::{
    AccountDefEntry, AccountValue, ActionRequest, ClientMessage, ContainerInfo, DiscoveryRequest,
    ProbeInfo, ResponseBody, ServerMessage, ServerRequest, ValidationRequest,
};

use std::fmt;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Dialing and authenticating.
    Connecting,
    /// Sending the registration envelope.
    Registering,
    /// Reading server messages.
    Listening,
    /// Releasing the transport after a failure.
    Closing,
    /// Waiting before the next connection attempt.
    Backoff,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Registering => "registering",
            Self::Listening => "listening",
            Self::Closing => "closing",
            Self::Backoff => "backoff",
        };
        f.write_str(name)
    }
}
