//! The attempt loop.
//!
//! An [`ExecutionPlan`] is sent hop by hop. After every response the
//! redirect policy is consulted first; a followed redirect starts a new hop.
//! Otherwise the retry policy decides whether the hop is sent again after a
//! backoff delay. One retry budget covers the whole exchange, redirects
//! included. A chunked body is sent once: it is never retried, and a
//! redirect that would re-send it is returned as the response.
//!
//! ```text
//! Sending ──► response ──► redirect? ──yes──► Redirecting ──► Sending
//!    │                        │ no
//!    │                        ▼
//!    └──► error ─────────► retry? ──yes──► backoff ──► Sending
//!                             │ no
//!                             ▼
//!                      Success | Failed
//! ```
//!
//! Each send runs under the plan's timeout and cancellation token. The
//! token is polled first, so a cancellation that fires before the deadline
//! is reported as [`ExpectError::Cancelled`], never as a timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, LOCATION, SEC_WEBSOCKET_PROTOCOL,
    TRANSFER_ENCODING,
};
use http::{HeaderMap, HeaderValue, Method};
use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::cancel::CancelToken;
use crate::cookie::CookieJar;
use crate::error::{BoxError, ExpectError, TransportError};
use crate::failure::RequestInfo;
use crate::policy::{Backoff, Outcome, RedirectAction, RedirectPolicy, RetryPolicy};
use crate::printer::Printer;
use crate::transport::{Client, HttpRequest, RequestBody};
use crate::websocket::{Dialer, WsConnection};

/// Mutates every outgoing request just before it is sent.
pub(crate) type Transformer = Arc<dyn Fn(&mut HttpRequest) + Send + Sync>;

/// The body of a plan.
#[derive(Clone, Default)]
pub(crate) enum Payload {
    #[default]
    Empty,
    Full(Bytes),
    /// Taken by the first send.
    Stream(Arc<Mutex<Option<BoxBody<Bytes, BoxError>>>>),
}

impl Payload {
    fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Full(bytes) => bytes.is_empty(),
            Self::Stream(_) => false,
        }
    }

    fn is_replayable(&self) -> bool {
        !matches!(self, Self::Stream(_))
    }

    fn take(&self) -> Result<RequestBody, ExpectError> {
        match self {
            Self::Empty => Ok(RequestBody::Empty),
            Self::Full(bytes) => Ok(RequestBody::Full(bytes.clone())),
            Self::Stream(slot) => slot.lock().take().map(RequestBody::Streaming).ok_or_else(|| {
                ExpectError::invalid_request("chunked request body was already sent")
            }),
        }
    }
}

impl From<RequestBody> for Payload {
    fn from(body: RequestBody) -> Self {
        match body {
            RequestBody::Empty => Self::Empty,
            RequestBody::Full(bytes) => Self::Full(bytes),
            RequestBody::Streaming(stream) => Self::Stream(Arc::new(Mutex::new(Some(stream)))),
        }
    }
}

/// Everything needed to execute a request, fixed once built.
#[derive(Clone)]
pub(crate) struct ExecutionPlan {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Payload,
    pub(crate) websocket: bool,
    pub(crate) timeout: Option<Duration>,
    pub(crate) cancel: Option<CancelToken>,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) max_retries: u32,
    pub(crate) backoff: Backoff,
    pub(crate) redirect_policy: RedirectPolicy,
    pub(crate) max_redirects: Option<usize>,
    pub(crate) transformers: Vec<Transformer>,
}

/// An established WebSocket and its negotiated subprotocol.
pub(crate) struct Upgraded {
    pub(crate) conn: Box<dyn WsConnection>,
    pub(crate) subprotocol: Option<String>,
}

/// The canonical (last) attempt of a successful execution.
pub(crate) struct Reply {
    pub(crate) response: http::Response<Bytes>,
    pub(crate) rtt: Duration,
    pub(crate) websocket: Option<Upgraded>,
}

/// Outcome of [`Engine::execute`] with the last request sent.
pub(crate) struct Exchange {
    pub(crate) request: RequestInfo,
    pub(crate) result: Result<Reply, ExpectError>,
}

/// One request of a redirect chain.
#[derive(Clone)]
struct Hop {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Payload,
}

impl Hop {
    fn info(&self) -> RequestInfo {
        RequestInfo {
            method: self.method.clone(),
            url: self.url.to_string(),
            headers: self.headers.clone(),
        }
    }

    fn redirect(&self, url: Url, method: Method, keep_body: bool) -> Self {
        let mut headers = self.headers.clone();
        if !same_origin(&self.url, &url) {
            headers.remove(AUTHORIZATION);
            headers.remove(COOKIE);
            headers.remove(HOST);
        }
        let body = if keep_body {
            self.body.clone()
        } else {
            headers.remove(CONTENT_TYPE);
            headers.remove(CONTENT_LENGTH);
            headers.remove(TRANSFER_ENCODING);
            Payload::Empty
        };
        Self {
            method,
            url,
            headers,
            body,
        }
    }
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

fn location(base: &Url, headers: &HeaderMap) -> Option<Url> {
    let value = headers.get(LOCATION)?.to_str().ok()?;
    base.join(value).ok()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs `fut` under an optional deadline and cancellation token.
///
/// The token is polled first.
async fn guarded<T>(
    fut: impl Future<Output = Result<T, ExpectError>>,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
) -> Result<T, ExpectError> {
    let timed = async {
        match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(ExpectError::Timeout(timeout)),
            },
            None => fut.await,
        }
    };
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(ExpectError::Cancelled),
                result = timed => result,
            }
        }
        None => timed.await,
    }
}

/// Sends plans through a [`Client`] or a [`Dialer`].
pub(crate) struct Engine {
    pub(crate) client: Option<Arc<dyn Client>>,
    pub(crate) dialer: Option<Arc<dyn Dialer>>,
    pub(crate) printers: Vec<Arc<dyn Printer>>,
    pub(crate) cookie_jar: Option<CookieJar>,
}

impl Engine {
    /// Execute `plan` to completion.
    pub(crate) async fn execute(&self, plan: &ExecutionPlan) -> Exchange {
        let hop = Hop {
            method: plan.method.clone(),
            url: plan.url.clone(),
            headers: plan.headers.clone(),
            body: plan.body.clone(),
        };
        if plan.websocket {
            self.upgrade(plan, hop).await
        } else {
            self.send(plan, hop).await
        }
    }

    fn build(&self, plan: &ExecutionPlan, hop: &Hop) -> Result<HttpRequest, ExpectError> {
        let mut request = http::Request::builder()
            .method(hop.method.clone())
            .uri(hop.url.as_str())
            .body(hop.body.take()?)
            .map_err(|e| ExpectError::invalid_request(format!("invalid request: {e}")))?;
        *request.headers_mut() = hop.headers.clone();

        if let Some(stored) = self.cookie_jar.as_ref().and_then(|jar| jar.header_value(&hop.url)) {
            let merged = match request.headers().get(COOKIE).and_then(|v| v.to_str().ok()) {
                Some(own) => format!("{own}; {stored}"),
                None => stored,
            };
            let value = HeaderValue::from_str(&merged)
                .map_err(|e| ExpectError::invalid_request(format!("invalid cookie header: {e}")))?;
            request.headers_mut().insert(COOKIE, value);
        }

        for transform in &plan.transformers {
            transform(&mut request);
        }
        Ok(request)
    }

    async fn attempt(
        &self,
        plan: &ExecutionPlan,
        request: HttpRequest,
    ) -> Result<(http::Response<Bytes>, Duration), ExpectError> {
        let Some(client) = &self.client else {
            return Err(ExpectError::invalid_request("no HTTP client configured"));
        };
        for printer in &self.printers {
            printer.request(&request);
        }

        let started = Instant::now();
        let round_trip = async {
            let response = client.execute(request).await?;
            let (parts, body) = response.into_parts();
            let bytes = body
                .collect()
                .await
                .map_err(|e| {
                    TransportError::other(format!("failed to read response body: {e}"))
                })?
                .to_bytes();
            Ok::<_, ExpectError>(http::Response::from_parts(parts, bytes))
        };
        let response = guarded(round_trip, plan.timeout, plan.cancel.as_ref()).await?;
        let rtt = started.elapsed();

        for printer in &self.printers {
            printer.response(&response, rtt);
        }
        Ok((response, rtt))
    }

    async fn backoff(&self, plan: &ExecutionPlan, delay: Duration) -> Result<(), ExpectError> {
        match &plan.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => Err(ExpectError::Cancelled),
                    () = tokio::time::sleep(delay) => Ok(()),
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    async fn send(&self, plan: &ExecutionPlan, mut hop: Hop) -> Exchange {
        let mut info = hop.info();
        let mut retries: u32 = 0;
        let mut redirects: usize = 0;

        loop {
            if plan.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return Exchange {
                    request: info,
                    result: Err(ExpectError::Cancelled),
                };
            }

            let result = match self.build(plan, &hop) {
                Ok(request) => {
                    info = RequestInfo {
                        method: request.method().clone(),
                        url: request.uri().to_string(),
                        headers: request.headers().clone(),
                    };
                    debug!(method = %info.method, url = %info.url, attempt = retries + 1, "sending request");
                    self.attempt(plan, request).await
                }
                Err(e) => Err(e),
            };

            if let Ok((response, _)) = &result {
                if let Some(jar) = &self.cookie_jar {
                    jar.store(&hop.url, response.headers());
                }
                debug!(status = %response.status(), url = %hop.url, "received response");

                let action = plan.redirect_policy.decide(
                    response.status(),
                    &hop.method,
                    !hop.body.is_empty(),
                );
                if let RedirectAction::Follow { method, keep_body } = action {
                    match location(&hop.url, response.headers()) {
                        Some(next) if keep_body && !hop.body.is_replayable() => {
                            debug!(status = %response.status(), from = %hop.url, to = %next, "chunked body already sent, not following redirect");
                        }
                        Some(next) => {
                            if plan.max_redirects.is_some_and(|max| redirects >= max) {
                                return Exchange {
                                    request: info,
                                    result: Err(ExpectError::TooManyRedirects(redirects)),
                                };
                            }
                            redirects += 1;
                            debug!(status = %response.status(), from = %hop.url, to = %next, redirects, "following redirect");
                            hop = hop.redirect(next, method, keep_body);
                            continue;
                        }
                        None => {}
                    }
                }
            }

            let outcome = match &result {
                Ok((response, _)) => Outcome::Status(response.status()),
                Err(e) => Outcome::Error(e),
            };
            if retries < plan.max_retries
                && hop.body.is_replayable()
                && plan.retry_policy.should_retry(outcome)
            {
                let delay = plan.backoff.delay(retries);
                retries += 1;
                match &result {
                    Ok((response, _)) => {
                        warn!(method = %hop.method, url = %hop.url, status = %response.status(), attempt = retries, delay_ms = millis(delay), "retrying request");
                    }
                    Err(e) => {
                        warn!(method = %hop.method, url = %hop.url, error = %e, attempt = retries, delay_ms = millis(delay), "retrying request");
                    }
                }
                if let Err(e) = self.backoff(plan, delay).await {
                    return Exchange {
                        request: info,
                        result: Err(e),
                    };
                }
                continue;
            }

            if let Err(e) = &result {
                warn!(method = %hop.method, url = %hop.url, error = %e, "request failed");
            }
            return Exchange {
                request: info,
                result: result.map(|(response, rtt)| Reply {
                    response,
                    rtt,
                    websocket: None,
                }),
            };
        }
    }

    async fn upgrade(&self, plan: &ExecutionPlan, mut hop: Hop) -> Exchange {
        let scheme = match hop.url.scheme() {
            "http" => Some("ws"),
            "https" => Some("wss"),
            _ => None,
        };
        if let Some(scheme) = scheme {
            if hop.url.set_scheme(scheme).is_err() {
                let error = ExpectError::invalid_request(format!(
                    "cannot dial {} as {scheme}",
                    hop.url
                ));
                return Exchange {
                    request: hop.info(),
                    result: Err(error),
                };
            }
        }
        let mut info = hop.info();

        let result = async {
            let Some(dialer) = &self.dialer else {
                return Err(ExpectError::invalid_request("no websocket dialer configured"));
            };
            if plan.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return Err(ExpectError::Cancelled);
            }
            let request = self.build(plan, &hop)?;
            info = RequestInfo {
                method: request.method().clone(),
                url: request.uri().to_string(),
                headers: request.headers().clone(),
            };
            for printer in &self.printers {
                printer.request(&request);
            }
            let (parts, _) = request.into_parts();
            let request = http::Request::from_parts(parts, ());

            debug!(url = %hop.url, "dialing websocket");
            let started = Instant::now();
            let dial = async { dialer.dial(request).await.map_err(ExpectError::from) };
            let (conn, response) = guarded(dial, plan.timeout, plan.cancel.as_ref()).await?;
            let rtt = started.elapsed();

            let response = response.map(|()| Bytes::new());
            for printer in &self.printers {
                printer.response(&response, rtt);
            }
            if let Some(jar) = &self.cookie_jar {
                jar.store(&hop.url, response.headers());
            }
            let subprotocol = response
                .headers()
                .get(SEC_WEBSOCKET_PROTOCOL)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok(Reply {
                response,
                rtt,
                websocket: Some(Upgraded { conn, subprotocol }),
            })
        }
        .await;

        if let Err(e) = &result {
            warn!(url = %hop.url, error = %e, "websocket dial failed");
        }
        Exchange {
            request: info,
            result,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::StatusCode;
    use http_body_util::Full;

    use crate::transport::Binder;
    use crate::websocket::LocalDialer;

    fn plan(method: Method, url: &str, body: Payload) -> ExecutionPlan {
        ExecutionPlan {
            method,
            url: Url::parse(url).unwrap(),
            headers: HeaderMap::new(),
            body,
            websocket: false,
            timeout: None,
            cancel: None,
            retry_policy: RetryPolicy::DontRetry,
            max_retries: 0,
            backoff: Backoff::new(Duration::from_millis(1), Duration::from_millis(1)),
            redirect_policy: RedirectPolicy::FollowRedirectsWithoutBody,
            max_redirects: None,
            transformers: Vec::new(),
        }
    }

    fn engine(client: impl Client + 'static) -> Engine {
        Engine {
            client: Some(Arc::new(client)),
            dialer: None,
            printers: Vec::new(),
            cookie_jar: None,
        }
    }

    fn redirecting() -> Binder {
        Binder::new(|req: http::Request<RequestBody>| async move {
            let status = match req.uri().path() {
                "/a" => StatusCode::FOUND,
                "/b" => StatusCode::SEE_OTHER,
                _ => StatusCode::OK,
            };
            let next = if req.uri().path() == "/a" { "/b" } else { "/c" };
            http::Response::builder()
                .status(status)
                .header(LOCATION, next)
                .body(Full::new(Bytes::from(format!(
                    "{} {}",
                    req.method(),
                    req.uri().path()
                ))))
                .unwrap()
        })
    }

    #[tokio::test]
    async fn test_follows_redirect_chain() {
        let engine = engine(redirecting());
        let exchange = engine
            .execute(&plan(Method::GET, "http://localhost/a", Payload::Empty))
            .await;
        let reply = exchange.result.unwrap();
        assert_eq!(reply.response.status(), StatusCode::OK);
        assert_eq!(reply.response.body(), &Bytes::from("GET /c"));
        assert_eq!(exchange.request.url, "http://localhost/c");
    }

    #[tokio::test]
    async fn test_redirect_budget() {
        let engine = engine(redirecting());
        let mut limited = plan(Method::GET, "http://localhost/a", Payload::Empty);
        limited.max_redirects = Some(1);
        let exchange = engine.execute(&limited).await;
        assert!(matches!(
            exchange.result,
            Err(ExpectError::TooManyRedirects(1))
        ));

        limited.max_redirects = Some(2);
        assert!(engine.execute(&limited).await.result.is_ok());
    }

    #[tokio::test]
    async fn test_dont_follow_returns_redirect() {
        let engine = engine(redirecting());
        let mut plan = plan(Method::GET, "http://localhost/a", Payload::Empty);
        plan.redirect_policy = RedirectPolicy::DontFollowRedirects;
        let reply = engine.execute(&plan).await.result.unwrap();
        assert_eq!(reply.response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let engine = engine(Binder::new(move |_req| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let status = if n < 2 {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::OK
                };
                http::Response::builder()
                    .status(status)
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            }
        }));

        let mut retrying = plan(Method::GET, "http://localhost/", Payload::Empty);
        retrying.retry_policy = RetryPolicy::RetryTimeoutAndServerErrors;
        retrying.max_retries = 1;
        let reply = engine.execute(&retrying).await.result.unwrap();
        assert_eq!(reply.response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        calls.store(0, Ordering::SeqCst);
        retrying.max_retries = 5;
        let reply = engine.execute(&retrying).await.result.unwrap();
        assert_eq!(reply.response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_chunked_body_sent_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let engine = engine(Binder::new(move |req: http::Request<RequestBody>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let status = match req.uri().path() {
                    "/moved" => StatusCode::TEMPORARY_REDIRECT,
                    _ => StatusCode::SERVICE_UNAVAILABLE,
                };
                http::Response::builder()
                    .status(status)
                    .header(LOCATION, "/elsewhere")
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            }
        }));
        let chunked = || Payload::from(RequestBody::chunked([Bytes::from("part")]));

        let mut retrying = plan(Method::PUT, "http://localhost/busy", chunked());
        retrying.retry_policy = RetryPolicy::RetryAllErrors;
        retrying.max_retries = 3;
        let reply = engine.execute(&retrying).await.result.unwrap();
        assert_eq!(reply.response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        calls.store(0, Ordering::SeqCst);
        let mut moved = plan(Method::POST, "http://localhost/moved", chunked());
        moved.redirect_policy = RedirectPolicy::FollowAllRedirects;
        let exchange = engine.execute(&moved).await;
        assert_eq!(
            exchange.result.unwrap().response.status(),
            StatusCode::TEMPORARY_REDIRECT
        );
        assert_eq!(exchange.request.url, "http://localhost/moved");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stream_payload_taken_once() {
        let payload = Payload::from(RequestBody::chunked([Bytes::from("x")]));
        let copy = payload.clone();
        assert!(!payload.is_replayable());
        assert!(payload.take().unwrap().is_chunked());
        assert!(matches!(copy.take(), Err(ExpectError::InvalidRequest(_))));
        assert!(Payload::Full(Bytes::from("y")).is_replayable());
    }

    #[tokio::test]
    async fn test_upgrade_uses_websocket_scheme() {
        let engine = Engine {
            client: None,
            dialer: Some(Arc::new(LocalDialer::new(|_ws| async {}))),
            printers: Vec::new(),
            cookie_jar: None,
        };
        let mut upgrade = plan(Method::GET, "http://localhost/ws", Payload::Empty);
        upgrade.websocket = true;
        let exchange = engine.execute(&upgrade).await;
        assert_eq!(exchange.request.url, "ws://localhost/ws");
        let reply = exchange.result.unwrap();
        assert_eq!(reply.response.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert!(reply.websocket.is_some());
    }

    #[tokio::test]
    async fn test_timeout() {
        let engine = engine(Binder::new(|_req| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            http::Response::new(Full::new(Bytes::new()))
        }));
        let mut slow = plan(Method::GET, "http://localhost/", Payload::Empty);
        slow.timeout = Some(Duration::from_millis(20));
        let exchange = engine.execute(&slow).await;
        assert!(matches!(exchange.result, Err(ExpectError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_cancel_before_send() {
        let engine = engine(Binder::new(|_req| async {
            http::Response::new(Full::new(Bytes::new()))
        }));
        let token = CancelToken::new();
        token.cancel();
        let mut cancelled = plan(Method::GET, "http://localhost/", Payload::Empty);
        cancelled.cancel = Some(token);
        let exchange = engine.execute(&cancelled).await;
        assert!(matches!(exchange.result, Err(ExpectError::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_client() {
        let engine = Engine {
            client: None,
            dialer: None,
            printers: Vec::new(),
            cookie_jar: None,
        };
        let exchange = engine
            .execute(&plan(Method::GET, "http://localhost/", Payload::Empty))
            .await;
        assert!(matches!(exchange.result, Err(ExpectError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_cookie_jar_round_trip() {
        let jar = CookieJar::new();
        let engine = Engine {
            cookie_jar: Some(jar.clone()),
            ..engine(Binder::new(|req: http::Request<RequestBody>| async move {
                let seen = req
                    .headers()
                    .get(COOKIE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                http::Response::builder()
                    .header("set-cookie", "session=abc; Path=/")
                    .body(Full::new(Bytes::from(seen)))
                    .unwrap()
            }))
        };
        let get = plan(Method::GET, "http://localhost/", Payload::Empty);
        let first = engine.execute(&get).await.result.unwrap();
        assert_eq!(first.response.body(), &Bytes::new());
        assert_eq!(jar.len(), 1);
        let second = engine.execute(&get).await.result.unwrap();
        assert_eq!(second.response.body(), &Bytes::from("session=abc"));
    }

    #[test]
    fn test_cross_origin_redirect_drops_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let hop = Hop {
            method: Method::POST,
            url: Url::parse("http://a.test/x").unwrap(),
            headers,
            body: Payload::Full(Bytes::from("payload")),
        };

        let same = hop.redirect(Url::parse("http://a.test/y").unwrap(), Method::POST, true);
        assert!(same.headers.contains_key(AUTHORIZATION));
        assert!(matches!(same.body, Payload::Full(ref b) if b == "payload"));

        let other = hop.redirect(Url::parse("http://b.test/y").unwrap(), Method::GET, false);
        assert!(!other.headers.contains_key(AUTHORIZATION));
        assert!(!other.headers.contains_key(CONTENT_TYPE));
        assert!(other.body.is_empty());
    }
}
