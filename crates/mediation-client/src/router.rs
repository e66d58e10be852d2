//! Decoding and dispatch of server messages.

use crate::handler::HandlerCapabilitySet;
use crate::outbox::Outbox;
use mediation_core::{ClientMessage, Codec, DecodeError, ServerMessage, ServerRequest};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The handler operation a message maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    RegisterTarget,
    Validate,
    DiscoverTopology,
    HandleAction,
}

/// Pick the handler operation for `msg`.
///
/// An acknowledgement only counts when `origin`, the envelope that opened
/// this session, was a registration.
pub fn dispatch_target(msg: &ServerMessage, origin: &ClientMessage) -> Option<Dispatch> {
    match msg.request {
        ServerRequest::Ack if origin.is_registration() => Some(Dispatch::RegisterTarget),
        ServerRequest::Ack => None,
        ServerRequest::Validation(_) => Some(Dispatch::Validate),
        ServerRequest::Discovery(_) => Some(Dispatch::DiscoverTopology),
        ServerRequest::Action(_) => Some(Dispatch::HandleAction),
        ServerRequest::Unrecognized => None,
    }
}

/// Routes decoded server messages to the handler set.
pub struct MessageRouter {
    codec: Arc<dyn Codec>,
    handlers: Option<Arc<dyn HandlerCapabilitySet>>,
    outbox: Outbox,
}

impl MessageRouter {
    /// Without handlers every message is dropped. Each handler call gets a
    /// clone of `outbox` for its replies.
    pub fn new(
        codec: Arc<dyn Codec>,
        handlers: Option<Arc<dyn HandlerCapabilitySet>>,
        outbox: Outbox,
    ) -> Self {
        Self {
            codec,
            handlers,
            outbox,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<ServerMessage, DecodeError> {
        self.codec.decode(bytes)
    }

    /// Spawn the one handler call `msg` maps to.
    ///
    /// Returns immediately. The handle may be dropped; the call keeps
    /// running. `None` means nothing was dispatched.
    pub fn route(&self, msg: ServerMessage, origin: &ClientMessage) -> Option<JoinHandle<()>> {
        let Some(handlers) = &self.handlers else {
            tracing::debug!(
                message_id = msg.message_id,
                kind = msg.request.kind(),
                "no handler set configured, dropping server message"
            );
            return None;
        };

        let Some(dispatch) = dispatch_target(&msg, origin) else {
            tracing::debug!(
                message_id = msg.message_id,
                kind = msg.request.kind(),
                "nothing to dispatch"
            );
            return None;
        };

        tracing::debug!(message_id = msg.message_id, ?dispatch, "dispatching");
        let handlers = Arc::clone(handlers);
        let outbox = self.outbox.clone();
        Some(tokio::spawn(async move {
            match dispatch {
                Dispatch::RegisterTarget => {
                    tracing::info!("server acknowledged registration, adding target");
                    handlers.register_target(outbox).await;
                }
                Dispatch::Validate => handlers.validate(msg, outbox).await,
                Dispatch::DiscoverTopology => handlers.discover_topology(msg, outbox).await,
                Dispatch::HandleAction => handlers.handle_action(msg, outbox).await,
            }
        }))
    }
}

impl fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRouter")
            .field("handlers", &self.handlers.is_some())
            .finish_non_exhaustive()
    }
}
