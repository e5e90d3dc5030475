//! Errors of an established WebSocket, and RFC 6455 close codes.
//!
//! Handshake failures are not listed here: a dial that fails surfaces as a
//! [`TransportError`](crate::TransportError) from the request.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result of a read, write, or disconnect.
pub type WsResult<T> = Result<T, WsError>;

/// Why a [`WsConnection`](super::WsConnection) operation failed.
#[derive(Debug, Error)]
pub enum WsError {
    /// The peer closed the stream, or it ended.
    #[error("websocket closed: {reason}")]
    ConnectionClosed {
        /// Close code sent by the peer.
        code: Option<u16>,
        /// Close reason or a description of how the stream ended.
        reason: String,
    },

    /// Writing a frame failed.
    #[error("websocket write failed: {0}")]
    SendFailed(String),

    /// Reading a frame failed.
    #[error("websocket read failed: {0}")]
    ReceiveFailed(String),

    /// A value could not be turned into a frame.
    #[error("cannot encode websocket message: {0}")]
    EncodeFailed(String),

    /// A read or write missed its deadline.
    #[error("WebSocket {operation} timed out after {timeout:?}")]
    Timeout {
        /// `"read"` or `"write"`.
        operation: &'static str,
        /// The deadline that passed.
        timeout: Duration,
    },

    /// Shutting down the transport failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WsError {
    /// The stream is closed with an optional peer `code`.
    pub fn connection_closed(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            code,
            reason: reason.into(),
        }
    }

    /// Writing failed with `reason`.
    pub fn send_failed(reason: impl Into<String>) -> Self {
        Self::SendFailed(reason.into())
    }

    /// Reading failed with `reason`.
    pub fn receive_failed(reason: impl Into<String>) -> Self {
        Self::ReceiveFailed(reason.into())
    }

    /// The peer's close code, for [`WsError::ConnectionClosed`].
    pub fn close_code(&self) -> Option<u16> {
        if let Self::ConnectionClosed { code, .. } = self {
            *code
        } else {
            None
        }
    }

    /// Returns true if a read or write deadline passed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Close codes defined by RFC 6455, section 7.4.1.
///
/// Assertions take any `u16`; these names only make reports readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CloseCode {
    /// 1000: the purpose of the connection was fulfilled.
    Normal = 1000,
    /// 1001: an endpoint is going away.
    GoingAway = 1001,
    /// 1002: protocol error.
    Protocol = 1002,
    /// 1003: a data type the endpoint cannot accept.
    Unsupported = 1003,
    /// 1005: no code was present in the close frame.
    NoStatus = 1005,
    /// 1006: closed without a close frame.
    Abnormal = 1006,
    /// 1007: data inconsistent with the message type.
    InvalidPayload = 1007,
    /// 1008: a policy was violated.
    PolicyViolation = 1008,
    /// 1009: a message was too big to process.
    MessageTooBig = 1009,
    /// 1010: the client expected an extension the server did not negotiate.
    ExtensionRequired = 1010,
    /// 1011: the server hit an unexpected condition.
    InternalError = 1011,
}

impl CloseCode {
    const KNOWN: [Self; 11] = [
        Self::Normal,
        Self::GoingAway,
        Self::Protocol,
        Self::Unsupported,
        Self::NoStatus,
        Self::Abnormal,
        Self::InvalidPayload,
        Self::PolicyViolation,
        Self::MessageTooBig,
        Self::ExtensionRequired,
        Self::InternalError,
    ];

    /// The named code for `code`, if RFC 6455 defines one.
    pub fn from_u16(code: u16) -> Option<Self> {
        Self::KNOWN.into_iter().find(|known| known.as_u16() == code)
    }

    /// Wire value.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.as_u16())
    }
}
