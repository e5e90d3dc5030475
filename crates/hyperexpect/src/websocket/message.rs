//! WebSocket message representation.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use super::error::{CloseCode, WsError, WsResult};

/// Frame type of a [`WsMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Binary,
    /// Close frame.
    Close,
    /// Ping frame.
    Ping,
    /// Pong frame.
    Pong,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
        };
        f.write_str(name)
    }
}

/// One WebSocket message.
///
/// For close frames `data` holds the reason and `close_code` the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsMessage {
    /// Frame type.
    pub kind: MessageType,
    /// Payload.
    pub data: Bytes,
    /// Close code, for close frames that carry one.
    pub close_code: Option<u16>,
}

impl WsMessage {
    fn new(kind: MessageType, data: Bytes) -> Self {
        Self {
            kind,
            data,
            close_code: None,
        }
    }

    /// A text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MessageType::Text, Bytes::from(text.into()))
    }

    /// A binary message.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(MessageType::Binary, data.into())
    }

    /// A ping message.
    pub fn ping(data: impl Into<Bytes>) -> Self {
        Self::new(MessageType::Ping, data.into())
    }

    /// A pong message.
    pub fn pong(data: impl Into<Bytes>) -> Self {
        Self::new(MessageType::Pong, data.into())
    }

    /// A close message with a code and reason.
    pub fn close(code: impl Into<u16>, reason: impl Into<String>) -> Self {
        Self {
            kind: MessageType::Close,
            data: Bytes::from(reason.into()),
            close_code: Some(code.into()),
        }
    }

    /// A normal close.
    pub fn close_normal() -> Self {
        Self::close(CloseCode::Normal, "")
    }

    /// A text message holding `value` as JSON.
    pub fn json<T: Serialize>(value: &T) -> WsResult<Self> {
        let text =
            serde_json::to_string(value).map_err(|e| WsError::EncodeFailed(e.to_string()))?;
        Ok(Self::text(text))
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Returns true for text frames.
    pub fn is_text(&self) -> bool {
        self.kind == MessageType::Text
    }

    /// Returns true for binary frames.
    pub fn is_binary(&self) -> bool {
        self.kind == MessageType::Binary
    }

    /// Returns true for close frames.
    pub fn is_close(&self) -> bool {
        self.kind == MessageType::Close
    }
}

impl From<tungstenite::Message> for WsMessage {
    fn from(msg: tungstenite::Message) -> Self {
        match msg {
            tungstenite::Message::Text(s) => Self::text(s.as_str()),
            tungstenite::Message::Binary(b) => Self::binary(b),
            tungstenite::Message::Ping(b) => Self::ping(b),
            tungstenite::Message::Pong(b) => Self::pong(b),
            tungstenite::Message::Close(Some(frame)) => {
                Self::close(u16::from(frame.code), frame.reason.as_str())
            }
            tungstenite::Message::Close(None) => Self::new(MessageType::Close, Bytes::new()),
            tungstenite::Message::Frame(frame) => {
                Self::binary(Bytes::copy_from_slice(frame.payload()))
            }
        }
    }
}

impl From<WsMessage> for tungstenite::Message {
    fn from(msg: WsMessage) -> Self {
        match msg.kind {
            MessageType::Text => {
                Self::Text(String::from_utf8_lossy(&msg.data).into_owned().into())
            }
            MessageType::Binary => Self::Binary(msg.data),
            MessageType::Ping => Self::Ping(msg.data),
            MessageType::Pong => Self::Pong(msg.data),
            MessageType::Close => Self::Close(msg.close_code.map(|code| {
                tungstenite::protocol::CloseFrame {
                    code: code.into(),
                    reason: String::from_utf8_lossy(&msg.data).into_owned().into(),
                }
            })),
        }
    }
}
