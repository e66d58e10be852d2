//! WebSocket transport.
//!
//! Thin wrapper around `tokio-tungstenite`. Authentication happens in the
//! upgrade request: Basic credentials in `Authorization`, the local address
//! in `Origin`. Frames are whole messages; tungstenite reassembles
//! fragments, so inbound size is bounded only by its maximum message size.

use crate::error::{ConnectError, TransportError};
use crate::session::{Connection, Connector};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use mediation_core::Endpoint;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, ORIGIN};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dials the mediation server over WebSocket.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Connection = WsConnection;

    async fn open(&self, endpoint: &Endpoint) -> Result<WsConnection, ConnectError> {
        let request = handshake_request(endpoint)?;
        let url = endpoint.server_url();

        let (stream, response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|source| ConnectError::Handshake { url, source })?;
        tracing::debug!(status = %response.status(), "websocket handshake complete");

        Ok(WsConnection { stream })
    }
}

/// Build the upgrade request for `endpoint`.
pub fn handshake_request(endpoint: &Endpoint) -> Result<Request, ConnectError> {
    let url = endpoint.server_url();
    let invalid = |reason: String| ConnectError::InvalidRequest {
        url: url.clone(),
        reason,
    };

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| invalid(e.to_string()))?;

    let mut authorization =
        HeaderValue::from_str(&endpoint.authorization()).map_err(|e| invalid(e.to_string()))?;
    authorization.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, authorization);

    if !endpoint.origin().is_empty() {
        let origin = HeaderValue::from_str(endpoint.origin())
            .map_err(|e| invalid(format!("origin: {e}")))?;
        request.headers_mut().insert(ORIGIN, origin);
    }

    Ok(request)
}

/// An open WebSocket to the mediation server.
#[derive(Debug)]
pub struct WsConnection {
    stream: WsStream,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.stream.send(Message::Binary(frame.into())).await?;
        Ok(())
    }

    async fn recv_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(data.to_vec()),
                Some(Ok(Message::Text(text))) => return Ok(text.as_bytes().to_vec()),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "server closed websocket");
                    return Err(TransportError::Closed);
                }
                // Pings are answered by tungstenite.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(TransportError::Closed),
            }
        }
    }

    async fn close(&mut self) {
        match self.stream.close(None).await {
            Ok(()) | Err(tungstenite::Error::AlreadyClosed | tungstenite::Error::ConnectionClosed) => {}
            Err(e) => tracing::debug!("websocket close failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{Request as HandshakeRequest, Response};

    #[test]
    fn request_carries_credentials_and_origin() {
        let endpoint = Endpoint::new("10.0.0.5:8080", "http://probe.local", "probe", "secret").unwrap();
        let request = handshake_request(&endpoint).unwrap();

        assert_eq!(request.uri(), "ws://10.0.0.5:8080/vmturbo/remoteMediation");
        assert_eq!(request.headers()[AUTHORIZATION], "Basic cHJvYmU6c2VjcmV0");
        assert!(request.headers()[AUTHORIZATION].is_sensitive());
        assert_eq!(request.headers()[ORIGIN], "http://probe.local");
    }

    #[test]
    fn empty_origin_is_omitted() {
        let endpoint = Endpoint::new("10.0.0.5:8080", "", "probe", "secret").unwrap();
        let request = handshake_request(&endpoint).unwrap();
        assert!(request.headers().get(ORIGIN).is_none());
    }

    #[test]
    fn unparseable_url_is_invalid_request() {
        let endpoint = Endpoint::new("bad host", "", "probe", "secret").unwrap();
        assert!(matches!(
            handshake_request(&endpoint),
            Err(ConnectError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn exchanges_whole_frames_with_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Far larger than a single socket read.
        let large = vec![0x5a_u8; 256 * 1024];
        let outbound = large.clone();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut seen = None;
            let mut ws = tokio_tungstenite::accept_hdr_async(
                tcp,
                |req: &HandshakeRequest, resp: Response| {
                    seen = Some((
                        req.uri().path().to_string(),
                        req.headers().get(AUTHORIZATION).cloned(),
                    ));
                    Ok(resp)
                },
            )
            .await
            .unwrap();

            let registration = ws.next().await.unwrap().unwrap().into_data();
            ws.send(Message::Binary(outbound.into())).await.unwrap();
            ws.close(None).await.unwrap();
            (seen.unwrap(), registration.to_vec())
        });

        let endpoint = Endpoint::new(addr.to_string(), "http://probe.local", "probe", "secret").unwrap();
        let mut conn = WsConnector.open(&endpoint).await.unwrap();
        conn.send_frame(b"register".to_vec()).await.unwrap();

        let frame = conn.recv_frame().await.unwrap();
        assert_eq!(frame, large);
        assert!(matches!(conn.recv_frame().await, Err(TransportError::Closed)));
        conn.close().await;

        let ((path, authorization), registration) = server.await.unwrap();
        assert_eq!(path, "/vmturbo/remoteMediation");
        assert_eq!(authorization.unwrap(), "Basic cHJvYmU6c2VjcmV0");
        assert_eq!(registration, b"register".to_vec());
    }

    #[tokio::test]
    async fn refused_connection_is_handshake_error() {
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let endpoint = Endpoint::new(addr.to_string(), "", "probe", "secret").unwrap();
        assert!(matches!(
            WsConnector.open(&endpoint).await,
            Err(ConnectError::Handshake { .. })
        ));
    }
}
