//! Transport adapters.
//!
//! The engine never speaks HTTP itself. It hands an [`HttpRequest`] to a
//! [`Client`] and gets an [`HttpResponse`] with a streaming body back.
//!
//! - [`Binder`] calls an in-process handler directly.
//! - [`NetworkClient`] sends the request over the network with `reqwest`.

mod binder;
mod network;

use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use http_body::{Body, Frame, SizeHint};
use http_body_util::combinators::{BoxBody, UnsyncBoxBody};
use http_body_util::{BodyExt, StreamBody};

pub use binder::{Binder, Handler};
pub use network::NetworkClient;

use crate::error::{BoxError, TransportError};

/// Request body handed to a [`Client`].
///
/// A streaming body is read once; the engine never re-sends it.
#[derive(Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A body of known length.
    Full(Bytes),
    /// A body sent in chunks with no declared length.
    Streaming(BoxBody<Bytes, BoxError>),
}

impl RequestBody {
    /// A chunked body that pulls its data from `stream`.
    pub fn stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        let frames = stream
            .map_ok(Frame::data)
            .map_err(|e| -> BoxError { e.into() });
        Self::Streaming(StreamBody::new(frames).boxed())
    }

    /// A chunked body from pieces already in memory.
    pub fn chunked(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        let chunks: Vec<Bytes> = chunks.into_iter().collect();
        Self::stream(futures_util::stream::iter(
            chunks.into_iter().map(Ok::<_, Infallible>),
        ))
    }

    /// Returns true if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Full(bytes) => bytes.is_empty(),
            Self::Streaming(_) => false,
        }
    }

    /// Returns true for chunked bodies.
    pub fn is_chunked(&self) -> bool {
        matches!(self, Self::Streaming(_))
    }

    /// The buffered body, or `None` while it is still a stream.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Empty => Some(&[]),
            Self::Full(bytes) => Some(bytes),
            Self::Streaming(_) => None,
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::Full(bytes)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Full(Bytes::from(text))
    }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self {
        Self::Full(Bytes::from_static(text.as_bytes()))
    }
}

impl Body for RequestBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match this {
            Self::Empty => Poll::Ready(None),
            Self::Full(bytes) => {
                let data = std::mem::take(bytes);
                *this = Self::Empty;
                if data.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(Frame::data(data))))
                }
            }
            Self::Streaming(body) => Pin::new(body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Full(bytes) => bytes.is_empty(),
            Self::Streaming(body) => body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Self::Empty => SizeHint::with_exact(0),
            Self::Full(bytes) => SizeHint::with_exact(bytes.len() as u64),
            Self::Streaming(body) => body.size_hint(),
        }
    }
}

/// Streaming response body returned by a [`Client`].
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

/// Request type handed to a [`Client`].
pub type HttpRequest = http::Request<RequestBody>;

/// Response type returned by a [`Client`].
pub type HttpResponse = http::Response<ResponseBody>;

/// Performs one HTTP round trip.
///
/// Implementations must not follow redirects or retry; the engine does both.
#[async_trait]
pub trait Client: Send + Sync {
    /// Send `request` and return the response head with a streaming body.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_body_single_frame() {
        let body = RequestBody::from("hello");
        assert_eq!(body.size_hint().exact(), Some(5));
        assert_eq!(body.as_bytes(), Some(&b"hello"[..]));
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from("hello"));
    }

    #[tokio::test]
    async fn test_chunked_body_frames() {
        let mut body = RequestBody::chunked([Bytes::from("ab"), Bytes::from("cd")]);
        assert_eq!(body.size_hint().exact(), None);
        assert!(body.is_chunked());
        assert!(body.as_bytes().is_none());

        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(first, Bytes::from("ab"));
        let second = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(second, Bytes::from("cd"));
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_error_surfaces() {
        let chunks = futures_util::stream::iter(vec![
            Ok(Bytes::from("ok")),
            Err(std::io::Error::other("disk gone")),
        ]);
        let err = RequestBody::stream(chunks).collect().await.unwrap_err();
        assert_eq!(err.to_string(), "disk gone");
    }

    #[test]
    fn test_emptiness() {
        assert!(RequestBody::Empty.is_empty());
        assert!(RequestBody::Full(Bytes::new()).is_empty());
        assert!(!RequestBody::chunked(Vec::new()).is_empty());
        assert_eq!(format!("{:?}", RequestBody::from("abc")), "Full(3)");
    }
}
