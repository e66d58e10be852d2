//! Outbound queue for replies.
//!
//! Handlers never touch the transport. They push envelopes into an
//! [`Outbox`] and the supervisor writes them on the live session, after the
//! registration envelope. Envelopes queued while disconnected wait for the
//! next session.

use mediation_core::ClientMessage;
use tokio::sync::mpsc;

/// The supervisor that owned the queue has stopped.
#[derive(Debug, thiserror::Error)]
#[error("mediation client has stopped, envelope not sent")]
pub struct OutboxClosed(pub ClientMessage);

/// Cloneable handle for sending envelopes to the server.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl Outbox {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue `msg`. Does not wait for the write.
    pub fn send(&self, msg: ClientMessage) -> Result<(), OutboxClosed> {
        self.tx.send(msg).map_err(|e| OutboxClosed(e.0))
    }
}
