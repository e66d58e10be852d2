//! Handler capabilities supplied by the embedding application.

use crate::outbox::Outbox;
use async_trait::async_trait;
use mediation_core::ServerMessage;

/// Business responses to server requests.
///
/// Each call runs on its own task. Calls for different messages may overlap
/// and complete in any order, and a call may outlive the connection its
/// message arrived on. Replies go through `outbox`.
#[async_trait]
pub trait HandlerCapabilitySet: Send + Sync + 'static {
    /// The server acknowledged registration; add this client's target.
    async fn register_target(&self, outbox: Outbox);

    async fn validate(&self, msg: ServerMessage, outbox: Outbox);

    async fn discover_topology(&self, msg: ServerMessage, outbox: Outbox);

    async fn handle_action(&self, msg: ServerMessage, outbox: Outbox);
}
