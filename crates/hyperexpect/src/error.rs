//! Error types for request execution.
//!
//! [`ExpectError`] is the taxonomy of everything that can go wrong between
//! building a request and holding a decoded response. None of these reach
//! the caller directly: the chain converts them into an
//! [`AssertionFailure`](crate::failure::AssertionFailure) and hands them to
//! the reporting pipeline.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed error used at transport and body boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for execution operations.
pub type ExpectResult<T> = Result<T, ExpectError>;

/// Classification of a transport failure, used by retry policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The transport gave up waiting (connect or read timeout).
    Timeout,
    /// A transient network condition (connection refused or reset).
    Temporary,
    /// Anything else.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Temporary => write!(f, "temporary"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A failure reported by a [`Client`](crate::transport::Client) or
/// [`Dialer`](crate::websocket::Dialer).
#[derive(Debug, Clone, Error)]
#[error("{kind} transport error: {message}")]
pub struct TransportError {
    /// Failure classification.
    pub kind: TransportErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl TransportError {
    /// Create a transport error of the given kind.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a timeout transport error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// Create a temporary (transient) transport error.
    pub fn temporary(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Temporary, message)
    }

    /// Create a non-transient transport error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    /// Returns true for timeouts and transient network conditions.
    pub fn is_timeout_or_temporary(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::Temporary
        )
    }
}

/// Errors produced while building or executing a request.
#[derive(Debug, Clone, Error)]
pub enum ExpectError {
    /// The builder was misused (unbound path parameters, conflicting bodies).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The transport failed to complete the round trip.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The per-request deadline elapsed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request was cancelled through its cancellation token.
    #[error("request cancelled")]
    Cancelled,

    /// A body could not be decoded as the requested type.
    #[error("failed to decode {what}: {message}")]
    Decode {
        /// What was being decoded (e.g. "JSON", "form").
        what: &'static str,
        /// Decoder message.
        message: String,
    },

    /// The redirect hop budget was exhausted.
    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),
}

impl ExpectError {
    /// Create an invalid request error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    /// Create a decode error.
    pub fn decode(what: &'static str, message: impl fmt::Display) -> Self {
        Self::Decode {
            what,
            message: message.to_string(),
        }
    }

    /// Returns true if this is a deadline expiry, either ours or the transport's.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Transport(e) => e.kind == TransportErrorKind::Timeout,
            _ => false,
        }
    }

    /// Returns true if the request was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
