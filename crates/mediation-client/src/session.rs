//! A single live connection to the mediation server.
//!
//! [`Connector`] and [`Connection`] are the transport seam: the WebSocket
//! implementation lives in [`crate::ws`], tests plug in scripted ones.
//! [`Session`] adds envelope encoding on top of raw frames.

use crate::error::{ConnectError, SendError, TransportError};
use async_trait::async_trait;
use mediation_core::{ClientMessage, Codec, Endpoint};
use std::fmt;
use std::sync::Arc;

/// Dials and authenticates a new connection.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Connection;

    async fn open(&self, endpoint: &Endpoint) -> Result<Self::Connection, ConnectError>;
}

/// A duplex stream of whole message frames.
#[async_trait]
pub trait Connection: Send {
    /// Write one frame.
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Wait for the next complete frame.
    async fn recv_frame(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Release the connection. Must not fail.
    async fn close(&mut self);
}

/// Owns at most one open connection.
pub struct Session<C> {
    conn: Option<C>,
    codec: Arc<dyn Codec>,
}

impl<C: Connection> Session<C> {
    /// Dial `endpoint` and wrap the resulting connection.
    pub async fn open<K>(
        connector: &K,
        endpoint: &Endpoint,
        codec: Arc<dyn Codec>,
    ) -> Result<Self, ConnectError>
    where
        K: Connector<Connection = C>,
    {
        let conn = connector.open(endpoint).await?;
        Ok(Self {
            conn: Some(conn),
            codec,
        })
    }

    /// Encode `msg` and write it as one frame.
    pub async fn send(&mut self, msg: &ClientMessage) -> Result<(), SendError> {
        let frame = self.codec.encode(msg)?;
        let conn = self.conn.as_mut().ok_or(TransportError::Closed)?;
        conn.send_frame(frame).await?;
        Ok(())
    }

    /// Wait for the next inbound frame.
    pub async fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        match self.conn.as_mut() {
            Some(conn) => conn.recv_frame().await,
            None => Err(TransportError::Closed),
        }
    }

    /// Close the connection. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close().await;
        }
    }
}

impl<C> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("open", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}
