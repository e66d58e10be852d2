//! Protocol messages.
//!
//! One outbound envelope ([`ClientMessage`]) and one inbound envelope
//! ([`ServerMessage`]). The inbound request is a sum type, so exactly one
//! variant is ever active.

use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Registration: the probes this client offers.
    ContainerInfo(ContainerInfo),
    /// Liveness signal.
    KeepAlive,
    /// Result of a validation request.
    ValidationResponse(ResponseBody),
    /// Result of a discovery request.
    DiscoveryResponse(ResponseBody),
    /// Progress of a running action.
    ActionProgress(ResponseBody),
    /// Final result of an action.
    ActionResponse(ResponseBody),
}

impl ClientMessage {
    /// Whether this is the registration envelope.
    ///
    /// Acknowledgements from the server only mean something in reply to one.
    pub fn is_registration(&self) -> bool {
        matches!(self, Self::ContainerInfo(_))
    }
}

/// Registration payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    pub probes: Vec<ProbeInfo>,
}

/// A probe (target type) offered by this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeInfo {
    /// e.g. "Kubernetes".
    pub probe_type: String,
    /// e.g. "Container".
    pub probe_category: String,
    /// Fields a target of this type must supply.
    #[serde(default)]
    pub account_definitions: Vec<AccountDefEntry>,
}

/// One field of a probe's account definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDefEntry {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub secret: bool,
}

/// Reply to a server request. The body is produced by the handler set and
/// is opaque to the protocol layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(rename = "messageID")]
    pub message_id: i32,
    #[serde(default)]
    pub body: serde_json::Value,
}

/// Message received from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerMessage {
    /// Server-assigned correlation id.
    pub message_id: i32,
    /// The single active request.
    pub request: ServerRequest,
}

/// The request carried by a [`ServerMessage`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServerRequest {
    /// The server accepted the last envelope.
    Ack,
    /// Check that a target's account values work.
    Validation(ValidationRequest),
    /// Discover a target's topology.
    Discovery(DiscoveryRequest),
    /// Execute an action against a target.
    Action(ActionRequest),
    /// No request this client understands.
    Unrecognized,
}

impl ServerRequest {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Validation(_) => "validation",
            Self::Discovery(_) => "discovery",
            Self::Action(_) => "action",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Probe type the request targets, if any.
    pub fn probe_type(&self) -> Option<&str> {
        match self {
            Self::Validation(r) => Some(&r.probe_type),
            Self::Discovery(r) => Some(&r.probe_type),
            Self::Action(r) => Some(&r.probe_type),
            Self::Ack | Self::Unrecognized => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub probe_type: String,
    #[serde(default)]
    pub account_values: Vec<AccountValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRequest {
    pub probe_type: String,
    #[serde(default)]
    pub account_values: Vec<AccountValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub probe_type: String,
    #[serde(default)]
    pub account_values: Vec<AccountValue>,
    /// What to execute. Interpreted by the handler set.
    #[serde(default)]
    pub action_execution: serde_json::Value,
}

/// A key/value pair identifying a target account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountValue {
    pub key: String,
    #[serde(default)]
    pub string_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_container_info_is_registration() {
        assert!(ClientMessage::ContainerInfo(ContainerInfo::default()).is_registration());
        assert!(!ClientMessage::KeepAlive.is_registration());
        let response = ResponseBody {
            message_id: 3,
            body: serde_json::Value::Null,
        };
        assert!(!ClientMessage::ValidationResponse(response).is_registration());
    }

    #[test]
    fn client_message_is_type_tagged() {
        let msg = ClientMessage::ContainerInfo(ContainerInfo {
            probes: vec![ProbeInfo {
                probe_type: "Kubernetes".into(),
                probe_category: "Container".into(),
                account_definitions: Vec::new(),
            }],
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "container_info");
        assert_eq!(json["probes"][0]["probeType"], "Kubernetes");
    }

    #[test]
    fn probe_type_of_requests() {
        let req = ServerRequest::Discovery(DiscoveryRequest {
            probe_type: "Kubernetes".into(),
            account_values: Vec::new(),
        });
        assert_eq!(req.probe_type(), Some("Kubernetes"));
        assert_eq!(req.kind(), "discovery");
        assert_eq!(ServerRequest::Ack.probe_type(), None);
    }
}
