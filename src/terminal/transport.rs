// ABOUTME: Duplex transport abstraction for exec sessions
// The WebSocket implementation dials the pod/container-scoped exec endpoint

use crate::terminal::session::SessionId;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("{0}")]
    Other(String),
}

/// One received unit from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Text payload: either a JSON control frame or process output.
    Text(String),
    /// Raw process output bytes.
    Binary(Vec<u8>),
    /// Orderly close from the remote side (or EOF).
    Closed,
    /// Stream failure.
    Error(String),
}

/// Bidirectional framed stream carrying one session's traffic.
///
/// The session driver owns its transport exclusively; there is no sharing
/// or pooling across sessions. Tests substitute an in-memory fake.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next inbound event. Must be cancel-safe: the driver polls this
    /// inside a `select!` alongside commands and timers.
    async fn recv(&mut self) -> TransportEvent;

    /// Close the underlying stream. Closing an already-closed transport is
    /// a no-op, never an error.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Path of the exec endpoint for a session, scoped by pod and container.
pub fn exec_url(ws_base: &str, id: &SessionId) -> String {
    format!(
        "{}/api/pod/{}/{}/exec",
        ws_base.trim_end_matches('/'),
        id.pod,
        id.container
    )
}

/// WebSocket-backed transport.
pub struct WsTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    pub async fn dial(url: &str) -> Result<Self, TransportError> {
        debug!(url, "dialing exec endpoint");
        let (ws, response) = connect_async(url).await?;
        debug!(status = ?response.status(), "exec handshake complete");
        Ok(Self { ws })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.ws.send(tungstenite::Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.ws.next().await {
                None | Some(Ok(tungstenite::Message::Close(_))) => return TransportEvent::Closed,
                Some(Ok(tungstenite::Message::Text(text))) => return TransportEvent::Text(text),
                Some(Ok(tungstenite::Message::Binary(bytes))) => {
                    return TransportEvent::Binary(bytes)
                }
                // Ping/pong are answered by the library; frames of other
                // kinds carry nothing for the session.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return TransportEvent::Error(e.to_string()),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.ws.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
