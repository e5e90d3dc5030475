//! Assertion chain over an established WebSocket connection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::{CloseCode, MessageType, WsConnection, WsError, WsMessage, WsResult};
use crate::chain::Chain;
use crate::failure::{AssertionFailure, FailureKind};
use crate::printer::Printer;
use crate::value::{StringValue, Value};

/// A WebSocket connection under test.
///
/// Obtained from [`Response::websocket`](crate::Response::websocket).
/// Reads and writes report failures through the chain instead of
/// returning errors; once the chain failed, further operations are no-ops.
///
/// # Example
///
/// ```rust,ignore
/// let mut ws = e.get("/chat")
///     .with_websocket_upgrade()
///     .expect()
///     .await
///     .status(StatusCode::SWITCHING_PROTOCOLS)
///     .websocket();
///
/// ws.write_text("hi").await;
/// ws.expect().await.is_text().body().is_equal("hi");
/// ws.close().await;
/// ```
pub struct Websocket {
    chain: Chain,
    conn: Option<Box<dyn WsConnection>>,
    subprotocol: Option<String>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    closed: bool,
    printers: Vec<Arc<dyn Printer>>,
}

impl Websocket {
    pub(crate) fn new(
        chain: Chain,
        conn: Option<Box<dyn WsConnection>>,
        subprotocol: Option<String>,
        printers: Vec<Arc<dyn Printer>>,
    ) -> Self {
        Self {
            chain,
            conn,
            subprotocol,
            read_timeout: None,
            write_timeout: None,
            closed: false,
            printers,
        }
    }

    /// The underlying connection, until it was disconnected.
    pub fn raw(&mut self) -> Option<&mut (dyn WsConnection + 'static)> {
        self.conn.as_deref_mut()
    }

    /// Report later failures under `name` instead of the full path.
    #[must_use]
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    /// Fail reads that take longer than `timeout`.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Fail writes that take longer than `timeout`.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub(crate) fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) {
        self.read_timeout = read;
        self.write_timeout = write;
    }

    /// Subprotocol negotiated during the handshake; fails if none was.
    pub fn subprotocol(&self) -> StringValue {
        let chain = self.chain.child("subprotocol()");
        if self.subprotocol.is_none() {
            chain.fail(
                AssertionFailure::new(FailureKind::NotNull)
                    .error("expected: a subprotocol was negotiated"),
            );
        }
        StringValue::new(chain, self.subprotocol.clone().unwrap_or_default())
    }

    fn connection(&mut self, segment: &str) -> Option<&mut Box<dyn WsConnection>> {
        if self.chain.is_failed() {
            return None;
        }
        if self.conn.is_none() {
            self.chain.fail_at(
                segment,
                AssertionFailure::new(FailureKind::InvalidRequest)
                    .error("unexpected use of a disconnected websocket"),
            );
        }
        self.conn.as_mut()
    }

    fn report(&self, segment: &str, error: &WsError) {
        let kind = if error.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Transport
        };
        self.chain
            .fail_at(segment, AssertionFailure::new(kind).error(error.to_string()));
    }

    /// Read the next message.
    pub async fn expect(&mut self) -> WebsocketMessage {
        let chain = self.chain.child("expect()");
        let read_timeout = self.read_timeout;
        let Some(conn) = self.connection("expect()") else {
            chain.set_failed();
            return WebsocketMessage::new(chain, WsMessage::close_normal());
        };
        let result = with_timeout("read", read_timeout, conn.read_message()).await;
        match result {
            Ok(message) => {
                tracing::debug!(kind = %message.kind, len = message.data.len(), "websocket read");
                for printer in &self.printers {
                    printer.websocket_read(&message);
                }
                WebsocketMessage::new(chain, message)
            }
            Err(e) => {
                chain.fail(
                    AssertionFailure::new(if e.is_timeout() {
                        FailureKind::Timeout
                    } else {
                        FailureKind::Transport
                    })
                    .error(e.to_string()),
                );
                WebsocketMessage::new(chain, WsMessage::close_normal())
            }
        }
    }

    async fn write(&mut self, segment: &str, message: WsMessage) -> &mut Self {
        let write_timeout = self.write_timeout;
        if self.closed && !self.chain.is_failed() {
            self.chain.fail_at(
                segment,
                AssertionFailure::new(FailureKind::InvalidRequest)
                    .error("unexpected write after close"),
            );
            return self;
        }
        if self.connection(segment).is_none() {
            return self;
        }
        for printer in &self.printers {
            printer.websocket_write(&message);
        }
        let Some(conn) = self.conn.as_mut() else {
            return self;
        };
        let is_close = message.is_close();
        let result = with_timeout("write", write_timeout, conn.write_message(message)).await;
        match result {
            Ok(()) => {
                self.closed |= is_close;
                self.chain.pass_at(segment);
            }
            Err(e) => self.report(segment, &e),
        }
        self
    }

    /// Send a text message.
    pub async fn write_text(&mut self, text: &str) -> &mut Self {
        self.write(&format!("write_text({text:?})"), WsMessage::text(text))
            .await
    }

    /// Send a binary message.
    pub async fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.write(
            &format!("write_bytes({} bytes)", data.len()),
            WsMessage::binary(data.to_vec()),
        )
        .await
    }

    /// Send `value` serialized as a JSON text message.
    pub async fn write_json<T: Serialize>(&mut self, value: &T) -> &mut Self {
        match WsMessage::json(value) {
            Ok(message) => self.write("write_json()", message).await,
            Err(e) => {
                self.chain.fail_at(
                    "write_json()",
                    AssertionFailure::new(FailureKind::InvalidRequest).error(e.to_string()),
                );
                self
            }
        }
    }

    /// Send an arbitrary message.
    pub async fn write_message(&mut self, message: WsMessage) -> &mut Self {
        let segment = format!("write_message({})", message.kind);
        self.write(&segment, message).await
    }

    /// Send a normal close frame.
    pub async fn close(&mut self) -> &mut Self {
        self.write("close()", WsMessage::close_normal()).await
    }

    /// Send a close frame with `code`.
    pub async fn close_with_code(&mut self, code: impl Into<u16>) -> &mut Self {
        let code = code.into();
        self.write(
            &format!("close_with_code({code})"),
            WsMessage::close(code, String::new()),
        )
        .await
    }

    /// Send a close frame with `code` and a reason text.
    pub async fn close_with_text(&mut self, code: impl Into<u16>, text: &str) -> &mut Self {
        let code = code.into();
        self.write(
            &format!("close_with_text({code}, {text:?})"),
            WsMessage::close(code, text),
        )
        .await
    }

    /// Drop the connection without a close handshake.
    pub async fn disconnect(&mut self) -> &mut Self {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.disconnect().await {
                tracing::debug!(error = %e, "websocket disconnect failed");
            }
        }
        self.closed = true;
        self
    }
}

impl std::fmt::Debug for Websocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Websocket")
            .field("chain", &self.chain)
            .field("connected", &self.conn.is_some())
            .field("subprotocol", &self.subprotocol)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

async fn with_timeout<T>(
    operation: &'static str,
    timeout: Option<Duration>,
    future: impl Future<Output = WsResult<T>>,
) -> WsResult<T> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, future)
            .await
            .map_err(|_| WsError::Timeout { operation, timeout })?,
        None => future.await,
    }
}

/// Assertions on one received WebSocket message.
#[derive(Debug, Clone)]
pub struct WebsocketMessage {
    chain: Chain,
    message: WsMessage,
}

impl WebsocketMessage {
    pub(crate) fn new(chain: Chain, message: WsMessage) -> Self {
        Self { chain, message }
    }

    /// The received message.
    pub fn raw(&self) -> &WsMessage {
        &self.message
    }

    /// Report later failures under `name` instead of the full path.
    #[must_use]
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    fn type_failure(&self, expected: &str) -> AssertionFailure {
        AssertionFailure::new(FailureKind::Type)
            .actual(self.message.kind.to_string())
            .expected(expected)
            .error(format!("expected: message type is {expected}"))
    }

    /// Message is of type `kind`.
    pub fn message_type(&self, kind: MessageType) -> &Self {
        self.chain.check(format!("message_type({kind})"), || {
            (self.message.kind != kind).then(|| self.type_failure(&kind.to_string()))
        });
        self
    }

    /// Message is not of type `kind`.
    pub fn not_message_type(&self, kind: MessageType) -> &Self {
        self.chain.check(format!("not_message_type({kind})"), || {
            (self.message.kind == kind).then(|| {
                AssertionFailure::new(FailureKind::Type)
                    .actual(self.message.kind.to_string())
                    .error(format!("expected: message type is not {kind}"))
            })
        });
        self
    }

    /// Message is a text frame.
    pub fn is_text(&self) -> &Self {
        self.chain.check("is_text()", || {
            (!self.message.is_text()).then(|| self.type_failure("text"))
        });
        self
    }

    /// Message is a binary frame.
    pub fn is_binary(&self) -> &Self {
        self.chain.check("is_binary()", || {
            (!self.message.is_binary()).then(|| self.type_failure("binary"))
        });
        self
    }

    /// Message is a close frame.
    pub fn is_close(&self) -> &Self {
        self.chain.check("is_close()", || {
            (!self.message.is_close()).then(|| self.type_failure("close"))
        });
        self
    }

    /// Message is not a close frame.
    pub fn not_close(&self) -> &Self {
        self.chain.check("not_close()", || {
            self.message.is_close().then(|| {
                AssertionFailure::new(FailureKind::Type)
                    .actual(self.message.kind.to_string())
                    .error("expected: message is not a close frame")
            })
        });
        self
    }

    /// Close frame carries `code`.
    pub fn code(&self, code: impl Into<u16>) -> &Self {
        let code = code.into();
        self.chain.check(format!("code({code})"), || {
            if !self.message.is_close() {
                return Some(self.type_failure("close"));
            }
            (self.message.close_code != Some(code)).then(|| {
                let actual = self
                    .message
                    .close_code
                    .map_or(JsonValue::Null, JsonValue::from);
                let mut failure = AssertionFailure::new(FailureKind::Equal)
                    .actual(actual)
                    .expected(code)
                    .error("expected: close codes are equal");
                if let Some(known) = CloseCode::from_u16(code) {
                    failure = failure.error(format!("expected code: {known}"));
                }
                failure
            })
        });
        self
    }

    /// Close frame does not carry `code`.
    pub fn not_code(&self, code: impl Into<u16>) -> &Self {
        let code = code.into();
        self.chain.check(format!("not_code({code})"), || {
            (self.message.close_code == Some(code)).then(|| {
                AssertionFailure::new(FailureKind::NotEqual)
                    .actual(code)
                    .error("expected: close codes are not equal")
            })
        });
        self
    }

    /// Payload is empty.
    pub fn no_content(&self) -> &Self {
        self.chain.check("no_content()", || {
            (!self.message.data.is_empty()).then(|| {
                AssertionFailure::new(FailureKind::Empty)
                    .actual(self.message.text_lossy())
                    .error("expected: message has no content")
            })
        });
        self
    }

    /// Payload as text, or the reason of a close frame.
    pub fn body(&self) -> StringValue {
        StringValue::new(self.chain.child("body()"), self.message.text_lossy())
    }

    /// Payload decoded as JSON.
    pub fn json(&self) -> Value {
        let chain = self.chain.child("json()");
        match serde_json::from_slice::<JsonValue>(&self.message.data) {
            Ok(value) => Value::new(chain, value),
            Err(e) => {
                chain.fail(
                    AssertionFailure::new(FailureKind::Decode)
                        .actual(self.message.text_lossy())
                        .error("expected: message payload is JSON")
                        .error(e.to_string()),
                );
                Value::new(chain, JsonValue::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::chain;
    use crate::websocket::{Dialer, LocalDialer};
    use futures_util::{SinkExt, StreamExt};

    async fn echo_socket(root: &str) -> (Websocket, crate::reporter::CollectReporter) {
        let dialer = LocalDialer::new(|ws| async move {
            let (sink, stream) = ws.split();
            let _ = stream.forward(sink).await;
        });
        let request = http::Request::get("ws://localhost/echo").body(()).unwrap();
        let (conn, _) = dialer.dial(request).await.unwrap();
        let (chain, reporter) = chain(root);
        (Websocket::new(chain, Some(conn), None, Vec::new()), reporter)
    }

    #[tokio::test]
    async fn test_echo_roundtrip() {
        let (mut ws, reporter) = echo_socket("Websocket()").await;
        ws.write_text("hello").await;
        ws.expect().await.is_text().not_close().body().is_equal("hello");

        ws.write_json(&serde_json::json!({"n": 1})).await;
        ws.expect().await.json().object().value("n").number().is_equal(1);

        ws.write_bytes(&[1, 2, 3]).await;
        ws.expect()
            .await
            .is_binary()
            .message_type(MessageType::Binary);
        assert!(reporter.is_empty(), "{:?}", reporter.messages());
    }

    #[tokio::test]
    async fn test_close_echo_carries_code() {
        let (mut ws, reporter) = echo_socket("Websocket()").await;
        ws.close_with_text(CloseCode::GoingAway, "bye").await;
        let reply = ws.expect().await;
        reply.is_close().code(CloseCode::GoingAway);
        reply.body().is_equal("bye");
        assert!(reporter.is_empty(), "{:?}", reporter.messages());

        ws.write_text("late").await;
        assert_eq!(reporter.len(), 1);
        assert!(reporter.messages()[0].contains("unexpected write after close"));
    }

    #[tokio::test]
    async fn test_read_timeout_reports_timeout() {
        let dialer = LocalDialer::new(|mut ws| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let _ = ws.send(tungstenite::Message::text("late")).await;
        });
        let request = http::Request::get("ws://localhost/slow").body(()).unwrap();
        let (conn, _) = dialer.dial(request).await.unwrap();
        let (chain, reporter) = chain("Websocket()");
        let mut ws = Websocket::new(chain, Some(conn), None, Vec::new())
            .with_read_timeout(Duration::from_millis(20));

        ws.expect().await.body().is_equal("late");
        assert_eq!(reporter.len(), 1);
        assert!(reporter.messages()[0].contains("response before the deadline"));
        assert!(reporter.messages()[0].contains("Websocket().expect()"));
    }

    #[tokio::test]
    async fn test_subprotocol_and_disconnect() {
        let (mut ws, reporter) = echo_socket("Websocket()").await;
        ws.subprotocol();
        assert_eq!(reporter.len(), 1);

        let (mut ws2, reporter2) = echo_socket("Websocket()").await;
        ws2.disconnect().await;
        assert!(ws2.raw().is_none());
        ws2.write_text("x").await;
        assert_eq!(reporter2.len(), 1);
        ws.disconnect().await;
    }

    #[test]
    fn test_message_assertions() {
        let (chain, reporter) = chain("WebsocketMessage()");
        let msg = WebsocketMessage::new(chain, WsMessage::text("not json"));
        msg.is_text().not_message_type(MessageType::Close);
        msg.json();
        assert_eq!(reporter.len(), 1);
        assert!(reporter.messages()[0].contains("WebsocketMessage().json()"));
    }
}
