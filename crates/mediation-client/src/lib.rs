//! Client side of the remote mediation protocol.
//!
//! A [`ConnectionSupervisor`] keeps exactly one WebSocket session to the
//! mediation server open. It registers on every connect, reads server
//! messages, and hands each one to the [`HandlerCapabilitySet`] on its own
//! task. Handlers reply through an [`Outbox`]. When the transport fails it
//! closes, waits a fixed delay, and reconnects, indefinitely.
//!
//! ```no_run
//! use std::sync::Arc;
//! use mediation_client::{ConnectionSupervisor, SupervisorConfig, WsConnector};
//! use mediation_core::{ClientMessage, ContainerInfo, Endpoint, JsonCodec};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = Endpoint::new("10.0.0.5:8080", "http://127.0.0.1", "admin", "pw")?;
//! let registration = ClientMessage::ContainerInfo(ContainerInfo::default());
//! let supervisor = ConnectionSupervisor::new(
//!     WsConnector,
//!     endpoint,
//!     registration,
//!     Arc::new(JsonCodec),
//!     None,
//!     SupervisorConfig::default(),
//! );
//! let fatal = supervisor.run().await.unwrap_err();
//! # Err(fatal.into())
//! # }
//! ```

mod error;
mod handler;
mod outbox;
mod router;
mod session;
mod supervisor;
mod ws;

#[cfg(test)]
mod testing;

pub use error::{ConnectError, FatalError, SendError, TransportError};
pub use handler::HandlerCapabilitySet;
pub use outbox::{Outbox, OutboxClosed};
pub use router::{Dispatch, MessageRouter, dispatch_target};
pub use session::{Connection, Connector, Session};
pub use supervisor::{ConnectionSupervisor, DEFAULT_BACKOFF, SupervisorConfig};
pub use ws::{WsConnection, WsConnector, handshake_request};
