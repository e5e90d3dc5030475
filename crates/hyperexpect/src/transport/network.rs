//! Network transport over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body::Frame;
use http_body_util::{BodyExt, StreamBody};

use super::{Client, HttpRequest, HttpResponse, RequestBody};
use crate::error::{BoxError, TransportError};

/// A [`Client`] that talks to a live server.
///
/// Redirects are never followed by the underlying client; the engine
/// applies its own redirect policy.
#[derive(Debug, Clone)]
pub struct NetworkClient {
    client: reqwest::Client,
}

impl NetworkClient {
    /// Creates a client with default settings.
    pub fn new() -> Result<Self, TransportError> {
        Self::builder(reqwest::Client::builder())
    }

    /// Creates a client with a connect timeout.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Self::builder(reqwest::Client::builder().connect_timeout(timeout))
    }

    /// Creates a client from a customized `reqwest` builder.
    ///
    /// The redirect policy is always overridden to never follow.
    pub fn builder(builder: reqwest::ClientBuilder) -> Result<Self, TransportError> {
        let client = builder
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    ///
    /// The client should be built with `redirect::Policy::none()`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn map_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::temporary(error.to_string())
    } else {
        TransportError::other(error.to_string())
    }
}

fn into_reqwest_body(body: RequestBody) -> reqwest::Body {
    match body {
        RequestBody::Empty => reqwest::Body::from(Bytes::new()),
        RequestBody::Full(bytes) => reqwest::Body::from(bytes),
        RequestBody::Streaming(body) => reqwest::Body::wrap_stream(body.into_data_stream()),
    }
}

#[async_trait]
impl Client for NetworkClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let (parts, body) = request.into_parts();
        let url = reqwest::Url::parse(&parts.uri.to_string())
            .map_err(|e| TransportError::other(format!("invalid URL {}: {e}", parts.uri)))?;

        let mut builder = self
            .client
            .request(parts.method, url)
            .headers(parts.headers)
            .version(parts.version);
        if !body.is_empty() {
            builder = builder.body(into_reqwest_body(body));
        }

        let response = builder.send().await.map_err(|e| {
            let error = map_error(&e);
            tracing::warn!(error = %error, "network request failed");
            error
        })?;

        let mut http_response = http::Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = http_response.headers_mut() {
            headers.extend(
                response
                    .headers()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }

        let stream = response
            .bytes_stream()
            .map_ok(Frame::data)
            .map_err(|e| -> BoxError { Box::new(map_error(&e)) });
        http_response
            .body(StreamBody::new(stream).boxed_unsync())
            .map_err(|e| TransportError::other(format!("invalid response: {e}")))
    }
}
