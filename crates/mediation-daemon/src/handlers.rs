//! Default handler set.

use async_trait::async_trait;
use mediation_client::{HandlerCapabilitySet, Outbox};
use mediation_core::ServerMessage;

/// Logs every server request without acting on it or replying.
#[derive(Debug, Default)]
pub struct LoggingHandlers;

fn log_request(operation: &str, msg: &ServerMessage) {
    tracing::info!(
        message_id = msg.message_id,
        probe_type = msg.request.probe_type().unwrap_or("-"),
        "{operation} requested"
    );
}

#[async_trait]
impl HandlerCapabilitySet for LoggingHandlers {
    async fn register_target(&self, _outbox: Outbox) {
        tracing::info!("registration acknowledged, target add requested");
    }

    async fn validate(&self, msg: ServerMessage, _outbox: Outbox) {
        log_request("validation", &msg);
    }

    async fn discover_topology(&self, msg: ServerMessage, _outbox: Outbox) {
        log_request("discovery", &msg);
    }

    async fn handle_action(&self, msg: ServerMessage, _outbox: Outbox) {
        log_request("action", &msg);
    }
}
