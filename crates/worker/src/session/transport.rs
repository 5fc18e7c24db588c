// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The wire under a signaling session.
//!
//! [`SignalingSession`](super::SignalingSession) only ever sees whole frames.
//! [`WebSocketTransport`] speaks to the event bridge; tests swap in a
//! scripted transport behind the same trait.

use std::future::Future;
use std::pin::Pin;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use tl_core::protocol::{ClientFrame, PushFrame};

/// Why the wire failed.
///
/// Everything except [`TransportError::Malformed`] means the connection is
/// gone and the session has to reconnect.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not reach the event bridge: {0}")]
    ConnectionFailed(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("could not encode outbound frame: {0}")]
    Serialization(String),

    /// One inbound frame was unreadable; the connection itself is fine.
    #[error("malformed frame: {0}")]
    Malformed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// A frame-oriented, reconnectable connection to the event bridge.
pub trait Transport: Send + Sync {
    /// Opens a fresh connection to `url`, replacing any previous one.
    fn connect(&mut self, url: &str) -> BoxFuture<'_, ()>;

    /// Closes the connection. Closing a closed transport is a no-op.
    fn disconnect(&mut self) -> BoxFuture<'_, ()>;

    fn send(&mut self, frame: ClientFrame) -> BoxFuture<'_, ()>;

    /// Next inbound frame, or `None` once the peer has closed.
    ///
    /// Must be cancel-safe: the session drops this future whenever a timer
    /// wins the race.
    fn recv(&mut self) -> BoxFuture<'_, Option<PushFrame>>;

    fn is_connected(&self) -> bool;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// [`Transport`] over a WebSocket, via tokio-tungstenite.
#[derive(Default)]
pub struct WebSocketTransport {
    link: Option<Link>,
}

struct Link {
    sink: futures_util::stream::SplitSink<WsStream, Message>,
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    async fn write(&mut self, message: Message) -> TransportResult<()> {
        let link = self.link.as_mut().ok_or(TransportError::ConnectionClosed)?;
        let sent = match link.sink.send(message).await {
            Ok(()) => link.sink.flush().await,
            Err(e) => Err(e),
        };
        sent.map_err(|e| {
            self.link = None;
            TransportError::SendFailed(e.to_string())
        })
    }
}

/// Event bridge frames are JSON, sent as text or occasionally as binary.
fn decoded(parsed: serde_json::Result<PushFrame>) -> TransportResult<Option<PushFrame>> {
    parsed
        .map(Some)
        .map_err(|e| TransportError::Malformed(e.to_string()))
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> BoxFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            let (socket, _) = tokio_tungstenite::connect_async(&url)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let (sink, stream) = socket.split();
            self.link = Some(Link { sink, stream });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut link) = self.link.take() {
                // The peer may already be gone.
                let _ = link.sink.close().await;
            }
            Ok(())
        })
    }

    fn send(&mut self, frame: ClientFrame) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let json = frame
                .to_json()
                .map_err(|e| TransportError::Serialization(e.to_string()))?;
            self.write(Message::Text(json.into())).await
        })
    }

    fn recv(&mut self) -> BoxFuture<'_, Option<PushFrame>> {
        Box::pin(async move {
            let link = self.link.as_mut().ok_or(TransportError::ConnectionClosed)?;
            loop {
                let message = match link.stream.next().await {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        self.link = None;
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                    None => {
                        self.link = None;
                        return Ok(None);
                    }
                };
                match message {
                    Message::Text(text) => return decoded(PushFrame::from_json(&text)),
                    Message::Binary(bytes) => return decoded(serde_json::from_slice(&bytes)),
                    Message::Close(_) => {
                        self.link = None;
                        return Ok(None);
                    }
                    // tungstenite answers pings itself.
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}
