//! WebSocket support.
//!
//! A request built with `with_websocket_upgrade` is dialed through a
//! [`Dialer`] instead of a [`Client`](crate::transport::Client). The
//! resulting [`WsConnection`] is wrapped in a [`Websocket`] assertion chain
//! by [`Response::websocket`](crate::Response::websocket).
//!
//! - [`TungsteniteDialer`] connects to live servers.
//! - [`LocalDialer`] runs an in-process handler over a duplex pipe.

mod assertions;
mod dialer;
mod error;
mod message;

use async_trait::async_trait;

pub use assertions::{Websocket, WebsocketMessage};
pub use dialer::{LocalDialer, StreamConnection, TungsteniteDialer, WsHandler};
pub use error::{CloseCode, WsError, WsResult};
pub use message::{MessageType, WsMessage};

use crate::error::TransportError;

/// An established WebSocket connection.
#[async_trait]
pub trait WsConnection: Send {
    /// Read the next message.
    ///
    /// Fails with [`WsError::ConnectionClosed`] once the stream ended.
    async fn read_message(&mut self) -> WsResult<WsMessage>;

    /// Write one message.
    async fn write_message(&mut self, message: WsMessage) -> WsResult<()>;

    /// Drop the underlying transport without a close handshake.
    async fn disconnect(&mut self) -> WsResult<()>;
}

/// Opens WebSocket connections.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Perform the opening handshake for `request`.
    ///
    /// The request URI uses the `ws` or `wss` scheme.
    async fn dial(
        &self,
        request: http::Request<()>,
    ) -> Result<(Box<dyn WsConnection>, http::Response<()>), TransportError>;
}
