//! Scripted transport and recording handler set for tests.

use crate::error::{ConnectError, TransportError};
use crate::handler::HandlerCapabilitySet;
use crate::outbox::Outbox;
use crate::session::{Connection, Connector};
use async_trait::async_trait;
use mediation_core::{
    ClientMessage, ContainerInfo, Endpoint, JsonCodec, ProbeInfo, ResponseBody, ServerMessage,
    ServerRequest,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite;

pub(crate) fn endpoint() -> Endpoint {
    Endpoint::new("mediation.test:8080", "http://probe.test", "probe", "secret").unwrap()
}

pub(crate) fn registration() -> ClientMessage {
    ClientMessage::ContainerInfo(ContainerInfo {
        probes: vec![ProbeInfo {
            probe_type: "Kubernetes".into(),
            probe_category: "Container".into(),
            account_definitions: Vec::new(),
        }],
    })
}

/// Encode a server message the way the server would.
pub(crate) fn frame(message_id: i32, request: ServerRequest) -> Vec<u8> {
    JsonCodec
        .encode_server(&ServerMessage {
            message_id,
            request,
        })
        .unwrap()
}

/// What the scripted transport observed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Open,
    Sent(Vec<u8>),
    Receive,
    Closed,
}

#[derive(Debug)]
pub(crate) struct Record {
    pub at: Instant,
    pub event: Event,
}

/// Ordered view of transport events.
pub(crate) struct EventLog {
    rx: mpsc::UnboundedReceiver<Record>,
}

impl EventLog {
    pub async fn next_record(&mut self) -> Record {
        self.rx.recv().await.expect("transport dropped")
    }

    pub async fn next(&mut self) -> Event {
        self.next_record().await.event
    }

    pub fn try_next(&mut self) -> Option<Event> {
        self.rx.try_recv().ok().map(|r| r.event)
    }
}

/// Outcome of one dial.
pub(crate) enum Dial {
    Refuse,
    /// The request could not even be built.
    Invalid,
    Accept {
        inbound: Vec<Inbound>,
        send_fails: bool,
    },
}

impl Dial {
    pub fn accept(inbound: Vec<Inbound>) -> Self {
        Self::Accept {
            inbound,
            send_fails: false,
        }
    }

    pub fn broken_send() -> Self {
        Self::Accept {
            inbound: Vec::new(),
            send_fails: true,
        }
    }
}

/// One scripted `recv_frame` result. Once the script runs out the
/// connection stays silent forever.
pub(crate) enum Inbound {
    Frame(Vec<u8>),
    Fail,
}

pub(crate) struct ScriptedConnector {
    dials: Mutex<VecDeque<Dial>>,
    events: mpsc::UnboundedSender<Record>,
}

impl ScriptedConnector {
    /// Dials beyond the script are accepted and idle.
    pub fn new(dials: Vec<Dial>) -> (Self, EventLog) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            dials: Mutex::new(dials.into()),
            events: tx,
        };
        (connector, EventLog { rx })
    }
}

fn record(events: &mpsc::UnboundedSender<Record>, event: Event) {
    let _ = events.send(Record {
        at: Instant::now(),
        event,
    });
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Connection = ScriptedConnection;

    async fn open(&self, endpoint: &Endpoint) -> Result<ScriptedConnection, ConnectError> {
        record(&self.events, Event::Open);
        let dial = self
            .dials
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Dial::accept(Vec::new()));

        match dial {
            Dial::Refuse => Err(ConnectError::Handshake {
                url: endpoint.server_url(),
                source: tungstenite::Error::ConnectionClosed,
            }),
            Dial::Invalid => Err(ConnectError::InvalidRequest {
                url: endpoint.server_url(),
                reason: "invalid uri character".into(),
            }),
            Dial::Accept {
                inbound,
                send_fails,
            } => Ok(ScriptedConnection {
                inbound: inbound.into(),
                send_fails,
                events: self.events.clone(),
            }),
        }
    }
}

pub(crate) struct ScriptedConnection {
    inbound: VecDeque<Inbound>,
    send_fails: bool,
    events: mpsc::UnboundedSender<Record>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.send_fails {
            return Err(TransportError::Closed);
        }
        record(&self.events, Event::Sent(frame));
        Ok(())
    }

    async fn recv_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        record(&self.events, Event::Receive);
        match self.inbound.pop_front() {
            Some(Inbound::Frame(bytes)) => Ok(bytes),
            Some(Inbound::Fail) => Err(TransportError::Closed),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        record(&self.events, Event::Closed);
    }
}

/// A handler capability invocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    RegisterTarget,
    Validate(ServerMessage),
    DiscoverTopology(ServerMessage),
    HandleAction(ServerMessage),
}

/// The validation reply sent by [`RecordingHandlers::answering_validation`].
pub(crate) fn validation_reply(message_id: i32) -> ClientMessage {
    ClientMessage::ValidationResponse(ResponseBody {
        message_id,
        body: serde_json::json!({ "valid": true }),
    })
}

/// Records every call. With `stall_validation`, validate never returns.
/// With `answer_validation`, validate replies through the outbox.
pub(crate) struct RecordingHandlers {
    calls: mpsc::UnboundedSender<Call>,
    stall_validation: bool,
    answer_validation: bool,
}

impl RecordingHandlers {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Call>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                calls: tx,
                stall_validation: false,
                answer_validation: false,
            },
            rx,
        )
    }

    pub fn stalling_validation() -> (Self, mpsc::UnboundedReceiver<Call>) {
        let (mut handlers, rx) = Self::new();
        handlers.stall_validation = true;
        (handlers, rx)
    }

    pub fn answering_validation() -> (Self, mpsc::UnboundedReceiver<Call>) {
        let (mut handlers, rx) = Self::new();
        handlers.answer_validation = true;
        (handlers, rx)
    }
}

#[async_trait]
impl HandlerCapabilitySet for RecordingHandlers {
    async fn register_target(&self, _outbox: Outbox) {
        let _ = self.calls.send(Call::RegisterTarget);
    }

    async fn validate(&self, msg: ServerMessage, outbox: Outbox) {
        let message_id = msg.message_id;
        let _ = self.calls.send(Call::Validate(msg));
        if self.stall_validation {
            std::future::pending::<()>().await;
        }
        if self.answer_validation {
            outbox.send(validation_reply(message_id)).unwrap();
        }
    }

    async fn discover_topology(&self, msg: ServerMessage, _outbox: Outbox) {
        let _ = self.calls.send(Call::DiscoverTopology(msg));
    }

    async fn handle_action(&self, msg: ServerMessage, _outbox: Outbox) {
        let _ = self.calls.send(Call::HandleAction(msg));
    }
}
