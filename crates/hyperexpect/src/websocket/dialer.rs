//! Dialers over `tokio-tungstenite`.

use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use http::header::SEC_WEBSOCKET_PROTOCOL;
use http::HeaderValue;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio_tungstenite::WebSocketStream;
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::server::{
    ErrorResponse, Request as ServerRequest, Response as ServerResponse,
};

use super::error::{WsError, WsResult};
use super::message::WsMessage;
use super::{Dialer, WsConnection};
use crate::error::TransportError;

/// A [`WsConnection`] over a `tokio-tungstenite` stream.
pub struct StreamConnection<S> {
    stream: WebSocketStream<S>,
}

impl<S> StreamConnection<S> {
    /// Wrap an established stream.
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }

    /// The underlying stream.
    pub fn into_inner(self) -> WebSocketStream<S> {
        self.stream
    }
}

impl<S> fmt::Debug for StreamConnection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConnection").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> WsConnection for StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_message(&mut self) -> WsResult<WsMessage> {
        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Frame(_))) => continue,
                Some(Ok(msg)) => return Ok(WsMessage::from(msg)),
                Some(Err(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                ))
                | None => return Err(WsError::connection_closed(None, "stream ended")),
                Some(Err(e)) => return Err(WsError::receive_failed(e.to_string())),
            }
        }
    }

    async fn write_message(&mut self, message: WsMessage) -> WsResult<()> {
        self.stream
            .send(tungstenite::Message::from(message))
            .await
            .map_err(|e| WsError::send_failed(e.to_string()))
    }

    async fn disconnect(&mut self) -> WsResult<()> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }
}

/// Build a complete client handshake request from `request`.
///
/// Handshake headers are generated from the URI; every other header of
/// `request` is carried over.
fn client_request(
    request: &http::Request<()>,
) -> Result<tungstenite::handshake::client::Request, TransportError> {
    let mut ws_request = request
        .uri()
        .clone()
        .into_client_request()
        .map_err(|e| TransportError::other(format!("invalid WebSocket URL: {e}")))?;
    for (name, value) in request.headers() {
        if !ws_request.headers().contains_key(name) {
            ws_request.headers_mut().append(name.clone(), value.clone());
        }
    }
    Ok(ws_request)
}

fn map_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::Io(e) => match e.kind() {
            ErrorKind::TimedOut => TransportError::timeout(e.to_string()),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::Interrupted => TransportError::temporary(e.to_string()),
            _ => TransportError::other(e.to_string()),
        },
        tungstenite::Error::Http(response) => TransportError::other(format!(
            "WebSocket handshake rejected with status {}",
            response.status()
        )),
        other => TransportError::other(other.to_string()),
    }
}

/// Dials live servers with `tokio_tungstenite::connect_async`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteDialer;

#[async_trait]
impl Dialer for TungsteniteDialer {
    async fn dial(
        &self,
        request: http::Request<()>,
    ) -> Result<(Box<dyn WsConnection>, http::Response<()>), TransportError> {
        let ws_request = client_request(&request)?;
        let (stream, response) = tokio_tungstenite::connect_async(ws_request)
            .await
            .map_err(map_error)?;
        tracing::debug!(uri = %request.uri(), status = %response.status(), "websocket connected");
        Ok((Box::new(StreamConnection::new(stream)), response.map(|_| ())))
    }
}

/// Server-side handler run by [`LocalDialer`].
pub type WsHandler = Arc<
    dyn Fn(WebSocketStream<DuplexStream>) -> Pin<Box<dyn Future<Output = ()> + Send>>
        + Send
        + Sync,
>;

/// Dials an in-process handler over an in-memory duplex pipe.
///
/// Each dial spawns the handler with the server half of a fresh pipe. The
/// first subprotocol requested by the client, if any, is accepted.
///
/// # Example
///
/// ```rust,ignore
/// use futures_util::StreamExt;
/// use hyperexpect::websocket::LocalDialer;
///
/// let echo = LocalDialer::new(|ws| async move {
///     let (sink, stream) = ws.split();
///     let _ = stream.forward(sink).await;
/// });
/// ```
#[derive(Clone)]
pub struct LocalDialer {
    handler: WsHandler,
    buffer_size: usize,
}

impl LocalDialer {
    /// Create a dialer running `handler` for every connection.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(WebSocketStream<DuplexStream>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |ws| Box::pin(handler(ws))),
            buffer_size: 64 * 1024,
        }
    }

    /// Set the in-memory pipe capacity.
    #[must_use]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

impl fmt::Debug for LocalDialer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalDialer")
            .field("buffer_size", &self.buffer_size)
            .finish_non_exhaustive()
    }
}

fn accept_first_subprotocol(
    request: &ServerRequest,
    mut response: ServerResponse,
) -> Result<ServerResponse, ErrorResponse> {
    let first = request
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .and_then(|v| HeaderValue::from_str(v).ok());
    if let Some(protocol) = first {
        response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocol);
    }
    Ok(response)
}

#[async_trait]
impl Dialer for LocalDialer {
    async fn dial(
        &self,
        request: http::Request<()>,
    ) -> Result<(Box<dyn WsConnection>, http::Response<()>), TransportError> {
        let ws_request = client_request(&request)?;
        let (client, server) = tokio::io::duplex(self.buffer_size);

        let handler = Arc::clone(&self.handler);
        tokio::spawn(async move {
            match tokio_tungstenite::accept_hdr_async(server, accept_first_subprotocol).await {
                Ok(ws) => handler(ws).await,
                Err(e) => tracing::warn!(error = %e, "local websocket handshake failed"),
            }
        });

        let (stream, response) = tokio_tungstenite::client_async(ws_request, client)
            .await
            .map_err(map_error)?;
        Ok((Box::new(StreamConnection::new(stream)), response.map(|_| ())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> LocalDialer {
        LocalDialer::new(|ws| async move {
            let (sink, stream) = ws.split();
            let _ = stream.forward(sink).await;
        })
    }

    #[test]
    fn test_client_request_keeps_custom_headers() {
        let request = http::Request::get("ws://localhost/chat")
            .header("x-token", "abc")
            .body(())
            .unwrap();
        let ws_request = client_request(&request).unwrap();
        assert_eq!(ws_request.headers()["x-token"], "abc");
        assert!(ws_request.headers().contains_key("sec-websocket-key"));
        assert_eq!(ws_request.headers()["host"], "localhost");
    }

    #[tokio::test]
    async fn test_local_dialer_echo() {
        let request = http::Request::get("ws://localhost/echo").body(()).unwrap();
        let (mut conn, response) = echo().dial(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::SWITCHING_PROTOCOLS);

        conn.write_message(WsMessage::text("ping")).await.unwrap();
        let reply = conn.read_message().await.unwrap();
        assert_eq!(reply, WsMessage::text("ping"));
    }

    #[tokio::test]
    async fn test_local_dialer_subprotocol() {
        let request = http::Request::get("ws://localhost/echo")
            .header(SEC_WEBSOCKET_PROTOCOL, "chat, superchat")
            .body(())
            .unwrap();
        let (_conn, response) = echo().dial(request).await.unwrap();
        assert_eq!(response.headers()[SEC_WEBSOCKET_PROTOCOL], "chat");
    }

    #[test]
    fn test_map_error_classification() {
        let refused = std::io::Error::new(ErrorKind::ConnectionRefused, "refused");
        assert!(map_error(tungstenite::Error::Io(refused)).is_timeout_or_temporary());
        assert!(!map_error(tungstenite::Error::AlreadyClosed).is_timeout_or_temporary());
    }
}
