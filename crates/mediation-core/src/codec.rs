//! Envelope encoding.
//!
//! The connection layer only sees bytes; a [`Codec`] turns them into
//! envelopes and back. [`JsonCodec`] is the default.

use crate::message::{
    ActionRequest, ClientMessage, DiscoveryRequest, ServerMessage, ServerRequest,
    ValidationRequest,
};
use serde::{Deserialize, Serialize};

/// Boxed error used as the source of codec failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Converts envelopes to and from frame bytes.
pub trait Codec: Send + Sync {
    /// Serialize an outbound envelope.
    fn encode(&self, msg: &ClientMessage) -> Result<Vec<u8>, EncodeError>;

    /// Parse one inbound frame.
    fn decode(&self, bytes: &[u8]) -> Result<ServerMessage, DecodeError>;
}

/// Outbound envelope could not be serialized.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode client message")]
pub struct EncodeError {
    #[source]
    source: BoxError,
}

impl EncodeError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Inbound frame is malformed or from an incompatible server.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode server message ({len} bytes)")]
pub struct DecodeError {
    len: usize,
    #[source]
    source: BoxError,
}

impl DecodeError {
    pub fn new(len: usize, source: impl Into<BoxError>) -> Self {
        Self {
            len,
            source: source.into(),
        }
    }

    /// Length of the frame that failed to decode.
    pub fn frame_len(&self) -> usize {
        self.len
    }
}

/// JSON envelopes.
///
/// Server messages arrive with one optional field per request kind. When
/// more than one is set, the first in the order ack, validation, discovery,
/// action wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Serialize a server message in the wire form [`Codec::decode`] reads.
    pub fn encode_server(&self, msg: &ServerMessage) -> Result<Vec<u8>, EncodeError> {
        let mut wire = ServerWire {
            message_id: msg.message_id,
            ack: None,
            validation_request: None,
            discovery_request: None,
            action_request: None,
        };
        match &msg.request {
            ServerRequest::Ack => wire.ack = Some(Ack {}),
            ServerRequest::Validation(r) => wire.validation_request = Some(r.clone()),
            ServerRequest::Discovery(r) => wire.discovery_request = Some(r.clone()),
            ServerRequest::Action(r) => wire.action_request = Some(r.clone()),
            ServerRequest::Unrecognized => {}
        }
        serde_json::to_vec(&wire).map_err(EncodeError::new)
    }
}

impl Codec for JsonCodec {
    fn encode(&self, msg: &ClientMessage) -> Result<Vec<u8>, EncodeError> {
        serde_json::to_vec(msg).map_err(EncodeError::new)
    }

    fn decode(&self, bytes: &[u8]) -> Result<ServerMessage, DecodeError> {
        let wire: ServerWire =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::new(bytes.len(), e))?;
        Ok(wire.into())
    }
}

/// Server message as it appears on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerWire {
    #[serde(rename = "messageID")]
    message_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ack: Option<Ack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validation_request: Option<ValidationRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    discovery_request: Option<DiscoveryRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action_request: Option<ActionRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Ack {}

impl From<ServerWire> for ServerMessage {
    fn from(wire: ServerWire) -> Self {
        let request = if wire.ack.is_some() {
            ServerRequest::Ack
        } else if let Some(r) = wire.validation_request {
            ServerRequest::Validation(r)
        } else if let Some(r) = wire.discovery_request {
            ServerRequest::Discovery(r)
        } else if let Some(r) = wire.action_request {
            ServerRequest::Action(r)
        } else {
            ServerRequest::Unrecognized
        };
        Self {
            message_id: wire.message_id,
            request,
        }
    }
}
