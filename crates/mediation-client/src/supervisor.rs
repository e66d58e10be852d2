//! Connection lifecycle: connect, register, listen, reconnect.
//!
//! ```text
//!   Connecting ──ok──► Registering ──ok──► Listening
//!       │                   │                  │
//!     error            transport err      transport err
//!       │                   ▼                  ▼
//!       │               Closing ◄──────────────┘
//!       ▼                   │
//!   Backoff ◄───────────────┘
//!       │
//!       └── fixed delay ──► Connecting
//! ```
//!
//! The loop never exits on its own. Only a connection request that cannot
//! be built, or an encode or decode failure, stops it; that is returned to
//! the caller as a [`FatalError`].
//!
//! While listening, envelopes queued on the [`Outbox`] are written between
//! reads.

use crate::error::{ConnectError, FatalError, SendError};
use crate::handler::HandlerCapabilitySet;
use crate::outbox::Outbox;
use crate::router::MessageRouter;
use crate::session::{Connector, Session};
use mediation_core::{ClientMessage, Codec, ConnectionState, Endpoint};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Delay between a failed or closed connection and the next attempt.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Fixed reconnect delay. No jitter, no growth.
    pub backoff: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF,
        }
    }
}

enum State<C> {
    Connecting,
    Registering(Session<C>),
    Listening(Session<C>),
    Closing(Session<C>),
    Backoff,
}

impl<C> State<C> {
    fn kind(&self) -> ConnectionState {
        match self {
            Self::Connecting => ConnectionState::Connecting,
            Self::Registering(_) => ConnectionState::Registering,
            Self::Listening(_) => ConnectionState::Listening,
            Self::Closing(_) => ConnectionState::Closing,
            Self::Backoff => ConnectionState::Backoff,
        }
    }
}

/// Keeps one registered session alive for the life of the process.
pub struct ConnectionSupervisor<K> {
    connector: K,
    endpoint: Endpoint,
    registration: Arc<ClientMessage>,
    codec: Arc<dyn Codec>,
    router: MessageRouter,
    outbox: Outbox,
    outbound: mpsc::UnboundedReceiver<ClientMessage>,
    config: SupervisorConfig,
    state: watch::Sender<ConnectionState>,
}

impl<K: Connector> ConnectionSupervisor<K> {
    /// `registration` is sent unchanged after every successful dial.
    pub fn new(
        connector: K,
        endpoint: Endpoint,
        registration: ClientMessage,
        codec: Arc<dyn Codec>,
        handlers: Option<Arc<dyn HandlerCapabilitySet>>,
        config: SupervisorConfig,
    ) -> Self {
        let (outbox, outbound) = Outbox::channel();
        let router = MessageRouter::new(Arc::clone(&codec), handlers, outbox.clone());
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            connector,
            endpoint,
            registration: Arc::new(registration),
            codec,
            router,
            outbox,
            outbound,
            config,
            state,
        }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Handle for sending envelopes outside a handler call, e.g. keep-alives.
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Drive the lifecycle until a fatal error.
    pub async fn run(mut self) -> Result<Infallible, FatalError> {
        let mut state = State::Connecting;
        let mut attempt: u64 = 0;

        loop {
            let kind = state.kind();
            tracing::debug!(state = %kind, "connection state changed");
            self.state.send_replace(kind);

            state = match state {
                State::Connecting => {
                    attempt += 1;
                    tracing::debug!(url = %self.endpoint.server_url(), attempt, "dialing server");
                    match Session::open(&self.connector, &self.endpoint, Arc::clone(&self.codec))
                        .await
                    {
                        Ok(session) => State::Registering(session),
                        Err(e @ ConnectError::InvalidRequest { .. }) => {
                            return Err(FatalError::InvalidRequest(e));
                        }
                        Err(e) => {
                            tracing::warn!(attempt, "connect failed: {}", error_chain(&e));
                            State::Backoff
                        }
                    }
                }

                State::Registering(mut session) => match session.send(&self.registration).await {
                    Ok(()) => {
                        tracing::info!(
                            server = self.endpoint.server_address(),
                            attempt,
                            "registered with mediation server"
                        );
                        attempt = 0;
                        State::Listening(session)
                    }
                    Err(SendError::Encode(e)) => {
                        session.close().await;
                        return Err(FatalError::Encode(e));
                    }
                    Err(SendError::Transport(e)) => {
                        tracing::warn!("sending registration failed: {}", error_chain(&e));
                        State::Closing(session)
                    }
                },

                State::Listening(mut session) => match self.listen(&mut session).await {
                    Ok(()) => State::Closing(session),
                    Err(fatal) => {
                        session.close().await;
                        return Err(fatal);
                    }
                },

                State::Closing(mut session) => {
                    session.close().await;
                    State::Backoff
                }

                State::Backoff => {
                    tracing::info!(
                        delay_secs = self.config.backoff.as_secs_f64(),
                        "reconnecting after delay"
                    );
                    tokio::time::sleep(self.config.backoff).await;
                    State::Connecting
                }
            };
        }
    }

    /// Read until the transport fails, writing queued envelopes in between.
    /// Handler calls are spawned, never awaited.
    async fn listen(&mut self, session: &mut Session<K::Connection>) -> Result<(), FatalError> {
        loop {
            tokio::select! {
                received = session.receive() => {
                    let frame = match received {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("connection lost: {}", error_chain(&e));
                            return Ok(());
                        }
                    };
                    self.dispatch(&frame)?;
                }
                Some(envelope) = self.outbound.recv() => {
                    match session.send(&envelope).await {
                        Ok(()) => {}
                        Err(SendError::Encode(e)) => {
                            tracing::warn!("dropping unencodable envelope: {}", error_chain(&e));
                        }
                        Err(SendError::Transport(e)) => {
                            tracing::warn!("sending envelope failed: {}", error_chain(&e));
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn dispatch(&self, frame: &[u8]) -> Result<(), FatalError> {
        let msg = match self.router.decode(frame) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!(len = e.frame_len(), "undecodable server message");
                return Err(FatalError::Decode(e));
            }
        };
        tracing::debug!(
            message_id = msg.message_id,
            kind = msg.request.kind(),
            len = frame.len(),
            "received server message"
        );
        self.router.route(msg, &self.registration);
        Ok(())
    }
}

/// Render an error with its sources, `outer: inner: root`.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}
