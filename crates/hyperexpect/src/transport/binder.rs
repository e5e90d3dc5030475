//! In-process transport over a handler function.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderValue, Request, Response};
use http_body::Body;
use http_body_util::BodyExt;

use super::{Client, HttpRequest, HttpResponse, RequestBody, ResponseBody};
use crate::error::{BoxError, TransportError};

/// Type-erased handler used by [`Binder`].
pub type Handler = Arc<
    dyn Fn(Request<RequestBody>) -> Pin<Box<dyn Future<Output = Response<ResponseBody>> + Send>>
        + Send
        + Sync,
>;

/// A [`Client`] that invokes a handler function in-process.
///
/// The handler sees a request as a server would: `Host` is set from the
/// URL, and the body is framed with `Content-Length` or
/// `Transfer-Encoding: chunked`. The handler's response body is passed to
/// the engine unbuffered; bodies of unknown length are marked
/// `Transfer-Encoding: chunked`.
///
/// # Example
///
/// ```rust,ignore
/// use hyperexpect::transport::Binder;
///
/// let binder = Binder::new(|req| async move {
///     http::Response::new(Full::new(Bytes::from(req.uri().path().to_string())))
/// });
/// ```
#[derive(Clone)]
pub struct Binder {
    handler: Handler,
}

impl Binder {
    /// Creates a binder from an async handler function.
    pub fn new<F, Fut, B>(handler: F) -> Self
    where
        F: Fn(Request<RequestBody>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response<B>> + Send + 'static,
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let handler = Arc::new(handler);
        Self {
            handler: Arc::new(move |req| {
                let fut = handler(req);
                Box::pin(async move {
                    let response = fut.await;
                    response.map(|body| body.map_err(|e| -> BoxError { e.into() }).boxed_unsync())
                })
            }),
        }
    }

    /// Creates a binder from an already type-erased handler.
    pub fn from_handler(handler: Handler) -> Self {
        Self { handler }
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder").finish_non_exhaustive()
    }
}

fn frame_request(request: &mut HttpRequest) -> Result<(), TransportError> {
    if !request.headers().contains_key(HOST) {
        if let Some(authority) = request.uri().authority() {
            let host = HeaderValue::from_str(authority.as_str())
                .map_err(|e| TransportError::other(format!("invalid host: {e}")))?;
            request.headers_mut().insert(HOST, host);
        }
    }

    let framing = match request.body() {
        RequestBody::Empty => None,
        RequestBody::Full(bytes) => Some((CONTENT_LENGTH, HeaderValue::from(bytes.len()))),
        RequestBody::Streaming(_) => {
            Some((TRANSFER_ENCODING, HeaderValue::from_static("chunked")))
        }
    };
    if let Some((name, value)) = framing {
        if !request.headers().contains_key(CONTENT_LENGTH)
            && !request.headers().contains_key(TRANSFER_ENCODING)
        {
            request.headers_mut().insert(name, value);
        }
    }
    Ok(())
}

fn frame_response(response: &mut HttpResponse) {
    let headers = response.headers();
    if headers.contains_key(CONTENT_LENGTH) || headers.contains_key(TRANSFER_ENCODING) {
        return;
    }
    match response.body().size_hint().exact() {
        Some(len) => {
            response
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from(len));
        }
        None => {
            response
                .headers_mut()
                .insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        }
    }
}

#[async_trait]
impl Client for Binder {
    async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        frame_request(&mut request)?;
        tracing::trace!(method = %request.method(), uri = %request.uri(), "binder dispatch");
        let mut response = (self.handler)(request).await;
        frame_response(&mut response);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{Full, StreamBody};

    fn echo_headers() -> Binder {
        Binder::new(|req: Request<RequestBody>| async move {
            let mut response = Response::builder();
            for (name, value) in req.headers() {
                response = response.header(format!("x-echo-{name}"), value);
            }
            response.body(Full::new(Bytes::new())).unwrap()
        })
    }

    #[tokio::test]
    async fn test_binder_sets_host_and_length() {
        let request = Request::post("http://example.com:8080/items")
            .body(RequestBody::from("abc"))
            .unwrap();
        let response = echo_headers().execute(request).await.unwrap();

        assert_eq!(response.headers()["x-echo-host"], "example.com:8080");
        assert_eq!(response.headers()["x-echo-content-length"], "3");
        assert_eq!(response.headers()[CONTENT_LENGTH], "0");
    }

    #[tokio::test]
    async fn test_binder_chunked_request() {
        let request = Request::post("http://localhost/upload")
            .body(RequestBody::chunked([Bytes::from("a"), Bytes::from("b")]))
            .unwrap();
        let response = echo_headers().execute(request).await.unwrap();

        assert_eq!(response.headers()["x-echo-transfer-encoding"], "chunked");
        assert!(!response.headers().contains_key("x-echo-content-length"));
    }

    #[tokio::test]
    async fn test_binder_streams_unknown_length() {
        let binder = Binder::new(|_req| async {
            let chunks = futures_util::stream::iter(vec![
                Ok::<_, std::io::Error>(http_body::Frame::data(Bytes::from("hello "))),
                Ok(http_body::Frame::data(Bytes::from("world"))),
            ]);
            Response::new(StreamBody::new(chunks))
        });
        let request = Request::get("http://localhost/")
            .body(RequestBody::Empty)
            .unwrap();
        let response = binder.execute(request).await.unwrap();

        assert_eq!(response.headers()[TRANSFER_ENCODING], "chunked");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from("hello world"));
    }
}
