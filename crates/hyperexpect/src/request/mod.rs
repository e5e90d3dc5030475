//! Fluent request building.
//!
//! A [`Request`] is created by an [`Expect`](crate::Expect) session and
//! configured with `with_*` calls. Misuse (an unknown path parameter,
//! conflicting bodies, an invalid header) is reported through the
//! request's chain at the offending call; [`Request::expect`] then returns
//! a failed [`Response`] without sending anything.
//!
//! # Example
//!
//! ```rust,ignore
//! let resp = e.post("/repos/{owner}/{repo}/issues")
//!     .with_path_args(["octo", "hello"])
//!     .with_query("draft", true)
//!     .with_bearer_token("secret")
//!     .with_json(&json!({"title": "bug"}))
//!     .expect()
//!     .await;
//! ```

mod body;
mod path;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use futures_util::Stream;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use url::Url;

use body::Body;
use path::PathTemplate;

use crate::cancel::CancelToken;
use crate::chain::Chain;
use crate::config::RequestDefaults;
use crate::engine::{Engine, ExecutionPlan, Transformer};
use crate::error::{BoxError, ExpectError};
use crate::expect::{ResponseMatcher, Session};
use crate::failure::{AssertionFailure, ResponseInfo};
use crate::policy::{Backoff, RedirectPolicy, RetryPolicy};
use crate::response::Response;
use crate::transport::{Binder, Client, HttpRequest, RequestBody};
use crate::websocket::Dialer;

/// A request under construction.
#[must_use]
pub struct Request {
    session: Arc<Session>,
    chain: Chain,
    method: Method,
    template: PathTemplate,
    base_url: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    body: Body,
    client: Option<Arc<dyn Client>>,
    dialer: Option<Arc<dyn Dialer>>,
    options: RequestDefaults,
    cancel: Option<CancelToken>,
    transformers: Vec<Transformer>,
    matchers: Vec<ResponseMatcher>,
}

fn pairs(encoded: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect()
}

fn url_pairs(object: impl Serialize) -> Result<Vec<(String, String)>, ExpectError> {
    let encoded = serde_urlencoded::to_string(object)
        .map_err(|e| ExpectError::invalid_request(format!("cannot encode object: {e}")))?;
    Ok(pairs(&encoded))
}

fn header_name(name: &str) -> Result<HeaderName, ExpectError> {
    HeaderName::try_from(name)
        .map_err(|e| ExpectError::invalid_request(format!("invalid header name {name:?}: {e}")))
}

fn header_value(value: &str) -> Result<HeaderValue, ExpectError> {
    HeaderValue::try_from(value)
        .map_err(|e| ExpectError::invalid_request(format!("invalid header value {value:?}: {e}")))
}

/// Joins a base URL and a path; an absolute `path` wins.
fn join_url(base: &str, path: &str) -> Result<Url, ExpectError> {
    if let Ok(url) = Url::parse(path) {
        if url.has_host() {
            return Ok(url);
        }
    }
    if base.is_empty() {
        return Err(ExpectError::invalid_request(format!(
            "relative path {path:?} without a base URL"
        )));
    }
    let joined = if path.is_empty() {
        base.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };
    Url::parse(&joined).map_err(|e| ExpectError::invalid_request(format!("invalid URL {joined:?}: {e}")))
}

fn path_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Request {
    pub(crate) fn new(session: Arc<Session>, method: Method, path: &str) -> Self {
        let chain = Chain::new(
            session.context(),
            format!("Request({:?}, {path:?})", method.as_str()),
        );
        let template = PathTemplate::parse(path).unwrap_or_else(|e| {
            chain.fail(AssertionFailure::from_error(&e));
            PathTemplate::default()
        });
        let request = Self {
            chain,
            method,
            template,
            base_url: session.base_url.clone(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            body: Body::None,
            client: None,
            dialer: None,
            options: session.defaults.clone(),
            cancel: session.cancel.clone(),
            transformers: Vec::new(),
            matchers: Vec::new(),
            session: Arc::clone(&session),
        };
        session
            .builders
            .iter()
            .fold(request, |request, build| build(request))
    }

    /// Run `update`, reporting its error at the builder call `segment`.
    fn apply(
        mut self,
        segment: impl FnOnce() -> String,
        update: impl FnOnce(&mut Self) -> Result<(), ExpectError>,
    ) -> Self {
        if self.chain.is_failed() {
            return self;
        }
        if let Err(e) = update(&mut self) {
            self.chain
                .fail_at(segment(), AssertionFailure::from_error(&e));
        }
        self
    }

    /// Name shown in failure reports for this request.
    pub fn with_name(mut self, name: &str) -> Self {
        let name = name.to_string();
        self.chain
            .update_context(|context| context.request_name = Some(name));
        self
    }

    /// Bind the placeholder `{key}` (ignoring case).
    pub fn with_path(self, key: &str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        self.apply(
            || format!("with_path({key:?}, {value:?})"),
            |r| r.template.bind_name(key, &value),
        )
    }

    /// Bind placeholders in order of appearance.
    pub fn with_path_args<I, T>(self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        let args: Vec<String> = args.into_iter().map(|arg| arg.to_string()).collect();
        self.apply(
            || format!("with_path_args({args:?})"),
            |r| args.iter().try_for_each(|arg| r.template.bind_next(arg)),
        )
    }

    /// Bind placeholders from the fields of a struct or map.
    pub fn with_path_object(self, object: impl Serialize) -> Self {
        self.apply(
            || "with_path_object(..)".to_string(),
            |r| {
                let value = serde_json::to_value(object)
                    .map_err(|e| ExpectError::invalid_request(format!("cannot encode object: {e}")))?;
                let serde_json::Value::Object(fields) = value else {
                    return Err(ExpectError::invalid_request(
                        "path object must serialize to a map",
                    ));
                };
                fields
                    .iter()
                    .try_for_each(|(key, value)| r.template.bind_name(key, &path_value(value)))
            },
        )
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append the fields of a struct or map as query parameters.
    pub fn with_query_object(self, object: impl Serialize) -> Self {
        self.apply(
            || "with_query_object(..)".to_string(),
            |r| {
                r.query.extend(url_pairs(object)?);
                Ok(())
            },
        )
    }

    /// Append the parameters of an encoded query string such as `a=1&b=2`.
    pub fn with_query_string(mut self, query: &str) -> Self {
        self.query
            .extend(pairs(query.strip_prefix('?').unwrap_or(query)));
        self
    }

    /// Send this request relative to `url` instead of the session base URL.
    pub fn with_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Override the `Host` header.
    pub fn with_host(self, host: &str) -> Self {
        self.apply(
            || format!("with_host({host:?})"),
            |r| {
                r.headers.insert(HOST, header_value(host)?);
                Ok(())
            },
        )
    }

    /// Append a header.
    pub fn with_header(self, key: &str, value: &str) -> Self {
        self.apply(
            || format!("with_header({key:?}, {value:?})"),
            |r| {
                r.headers.append(header_name(key)?, header_value(value)?);
                Ok(())
            },
        )
    }

    /// Append several headers.
    pub fn with_headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        headers.into_iter().fold(self, |request, (key, value)| {
            request.with_header(key.as_ref(), value.as_ref())
        })
    }

    /// Send a cookie.
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    /// Send several cookies.
    pub fn with_cookies<I, K, V>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.cookies.extend(
            cookies
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
        );
        self
    }

    /// Set `Authorization: Basic ...`.
    pub fn with_basic_auth(self, user: &str, password: &str) -> Self {
        let credentials = STANDARD.encode(format!("{user}:{password}"));
        self.apply(
            || format!("with_basic_auth({user:?}, ..)"),
            |r| {
                r.headers
                    .insert(AUTHORIZATION, header_value(&format!("Basic {credentials}"))?);
                Ok(())
            },
        )
    }

    /// Set `Authorization: Bearer <token>`.
    pub fn with_bearer_token(self, token: &str) -> Self {
        self.apply(
            || "with_bearer_token(..)".to_string(),
            |r| {
                r.headers
                    .insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
                Ok(())
            },
        )
    }

    // ------------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------------

    /// Send raw bytes.
    pub fn with_bytes(self, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        self.apply(
            || "with_bytes(..)".to_string(),
            |r| r.body.set(Body::Bytes(bytes)),
        )
    }

    /// Send text as `text/plain; charset=utf-8`.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.apply(
            || format!("with_text({text:?})"),
            |r| r.body.set(Body::Text(text.clone())),
        )
    }

    /// Send `value` as `application/json; charset=utf-8`.
    pub fn with_json(self, value: impl Serialize) -> Self {
        self.apply(
            || "with_json(..)".to_string(),
            |r| {
                let encoded = serde_json::to_vec(&value)
                    .map_err(|e| ExpectError::invalid_request(format!("cannot encode JSON: {e}")))?;
                r.body.set(Body::Json(Bytes::from(encoded)))
            },
        )
    }

    /// Send the fields of a struct or map as a URL-encoded form.
    ///
    /// Fields go into the multipart body once
    /// [`with_multipart`](Self::with_multipart) was called.
    pub fn with_form(self, object: impl Serialize) -> Self {
        self.apply(
            || "with_form(..)".to_string(),
            |r| {
                url_pairs(object)?
                    .into_iter()
                    .try_for_each(|(key, value)| r.body.add_field(key, value))
            },
        )
    }

    /// Add one form field.
    pub fn with_form_field(self, key: &str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        self.apply(
            || format!("with_form_field({key:?}, {value:?})"),
            |r| r.body.add_field(key.to_string(), value.clone()),
        )
    }

    /// Send form fields and files as `multipart/form-data`.
    pub fn with_multipart(self) -> Self {
        self.apply(|| "with_multipart()".to_string(), |r| r.body.start_multipart())
    }

    /// Add a file part; requires [`with_multipart`](Self::with_multipart).
    pub fn with_file(self, key: &str, filename: &str, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        self.apply(
            || format!("with_file({key:?}, {filename:?})"),
            |r| {
                r.body
                    .add_file(key.to_string(), filename.to_string(), content)
            },
        )
    }

    /// Stream the body from `chunks` with `Transfer-Encoding: chunked`.
    ///
    /// The stream is read while the request is sent, and only once: the
    /// request is not retried, and a 307 or 308 redirect is returned as the
    /// response instead of being followed.
    pub fn with_chunked<S, E>(self, chunks: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        let body = RequestBody::stream(chunks);
        self.apply(
            || "with_chunked(..)".to_string(),
            |r| r.body.set(Body::Chunked(body)),
        )
    }

    /// Dial a WebSocket instead of sending a plain request.
    pub fn with_websocket_upgrade(self) -> Self {
        self.apply(
            || "with_websocket_upgrade()".to_string(),
            |r| r.body.set(Body::WebsocketUpgrade),
        )
    }

    // ------------------------------------------------------------------------
    // Execution options
    // ------------------------------------------------------------------------

    /// Dial WebSockets through `dialer`.
    pub fn with_websocket_dialer(mut self, dialer: impl Dialer + 'static) -> Self {
        self.dialer = Some(Arc::new(dialer));
        self
    }

    /// Send through `client`.
    pub fn with_client(mut self, client: impl Client + 'static) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// Send to an in-process handler.
    pub fn with_handler<F, Fut, B>(self, handler: F) -> Self
    where
        F: Fn(http::Request<RequestBody>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = http::Response<B>> + Send + 'static,
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        self.with_client(Binder::new(handler))
    }

    /// Deadline for each attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Cancel through `token` instead of the session token.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Which failed attempts are retried.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.options.retry_policy = policy;
        self
    }

    /// Retry budget of the final hop.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.options.max_retries = retries;
        self
    }

    /// Backoff bounds between retries.
    pub fn with_retry_delay(mut self, min: Duration, max: Duration) -> Self {
        self.options.backoff = Backoff::new(min, max);
        self
    }

    /// Which redirects are followed.
    pub fn with_redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.options.redirect_policy = policy;
        self
    }

    /// Bound the number of followed redirects.
    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.options.max_redirects = Some(max);
        self
    }

    /// Mutate every outgoing attempt just before it is sent.
    pub fn with_transformer(
        mut self,
        transform: impl Fn(&mut HttpRequest) + Send + Sync + 'static,
    ) -> Self {
        self.transformers.push(Arc::new(transform));
        self
    }

    /// Run `matcher` on the response once it arrived.
    pub fn with_matcher(mut self, matcher: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        self.matchers.push(Arc::new(matcher));
        self
    }

    fn plan(&mut self) -> Result<ExecutionPlan, ExpectError> {
        let path = self.template.render()?;
        let mut url = join_url(&self.base_url, &path)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }

        let mut headers = self.headers.clone();
        if !self.cookies.is_empty() {
            let mut cookies: Vec<String> = headers
                .get_all(COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok().map(str::to_string))
                .collect();
            cookies.extend(self.cookies.iter().map(|(k, v)| format!("{k}={v}")));
            headers.insert(COOKIE, header_value(&cookies.join("; "))?);
        }
        if !headers.contains_key(CONTENT_TYPE) {
            if let Some(content_type) = self.body.content_type() {
                headers.insert(CONTENT_TYPE, header_value(&content_type)?);
            }
        }

        let websocket = self.body.is_websocket();
        let body = std::mem::take(&mut self.body).encode()?;
        Ok(ExecutionPlan {
            method: self.method.clone(),
            url,
            headers,
            body,
            websocket,
            timeout: self.options.timeout,
            cancel: self.cancel.clone(),
            retry_policy: self.options.retry_policy,
            max_retries: self.options.max_retries,
            backoff: self.options.backoff,
            redirect_policy: self.options.redirect_policy,
            max_redirects: self.options.max_redirects,
            transformers: std::mem::take(&mut self.transformers),
        })
    }

    /// Send the request and wrap the outcome for assertions.
    ///
    /// Retries, redirects, timeouts and cancellation are resolved here; a
    /// request that never produced a response yields a failed [`Response`].
    pub async fn expect(mut self) -> Response {
        let mut chain = self.chain.clone();
        let session = Arc::clone(&self.session);
        let ws_timeouts = (
            self.options.websocket_read_timeout,
            self.options.websocket_write_timeout,
        );
        if chain.is_failed() {
            return Response::failed(chain.child("expect()"));
        }

        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                chain.fail_at("expect()", AssertionFailure::from_error(&e));
                return Response::failed(chain.child("expect()"));
            }
        };

        let engine = Engine {
            client: self.client.clone().or_else(|| session.client.clone()),
            dialer: self.dialer.clone().or_else(|| session.dialer.clone()),
            printers: session.printers.clone(),
            cookie_jar: session.cookie_jar.clone(),
        };
        let exchange = engine.execute(&plan).await;

        let request = exchange.request;
        chain.update_context(|context| context.request = Some(request));
        let response = match exchange.result {
            Ok(reply) => {
                let info = ResponseInfo {
                    status: reply.response.status(),
                    headers: reply.response.headers().clone(),
                    body: reply.response.body().clone(),
                    rtt: Some(reply.rtt),
                };
                chain.update_context(|context| context.response = Some(info));
                Response::new(chain.child("expect()"), reply, engine.printers, ws_timeouts)
            }
            Err(e) => {
                let chain = chain.child("expect()");
                chain.fail(AssertionFailure::from_error(&e));
                Response::failed(chain)
            }
        };

        for matcher in session.matchers.iter().chain(&self.matchers) {
            matcher(&response);
        }
        response
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use serde_json::json;

    use crate::config::Config;
    use crate::expect::Expect;
    use crate::reporter::CollectReporter;

    /// A session whose handler echoes the request as JSON.
    fn echo() -> (Expect, CollectReporter) {
        let reporter = CollectReporter::new();
        let config = Config::new("http://localhost")
            .reporter(reporter.clone())
            .client(Binder::new(|req: http::Request<RequestBody>| async move {
                let (parts, body) = req.into_parts();
                let body = body.collect().await.unwrap().to_bytes();
                let headers: serde_json::Map<String, serde_json::Value> = parts
                    .headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), json!(v.to_str().unwrap_or_default())))
                    .collect();
                let echoed = json!({
                    "method": parts.method.as_str(),
                    "uri": parts.uri.to_string(),
                    "headers": headers,
                    "body": String::from_utf8_lossy(&body),
                });
                http::Response::builder()
                    .header(CONTENT_TYPE, "application/json")
                    .body(Full::new(Bytes::from(echoed.to_string())))
                    .unwrap()
            }));
        (Expect::new(config), reporter)
    }

    #[tokio::test]
    async fn test_path_query_and_headers() {
        let (e, reporter) = echo();
        let resp = e
            .get("/repos/{owner}/{repo}")
            .with_path_args(["octo cat"])
            .with_path("REPO", "hello")
            .with_query("page", 2)
            .with_query_string("?sort=asc")
            .with_header("X-Trace", "abc")
            .with_cookie("a", "1")
            .with_cookie("b", "2")
            .expect()
            .await;

        let echoed = resp.json().object();
        echoed
            .value("uri")
            .string()
            .is_equal("http://localhost/repos/octo%20cat/hello?page=2&sort=asc");
        let headers = echoed.value("headers").object();
        headers.value("x-trace").string().is_equal("abc");
        headers.value("cookie").string().is_equal("a=1; b=2");
        headers.value("host").string().is_equal("localhost");
        assert!(reporter.is_empty(), "{:?}", reporter.messages());
    }

    #[tokio::test]
    async fn test_json_body_sets_content_type() {
        let (e, reporter) = echo();
        let resp = e
            .post("/items")
            .with_json(json!({"name": "a"}))
            .expect()
            .await;
        let echoed = resp.json().object();
        echoed.value("method").string().is_equal("POST");
        echoed.value("body").string().is_equal(r#"{"name":"a"}"#);
        echoed
            .value("headers")
            .object()
            .value("content-type")
            .string()
            .is_equal("application/json; charset=utf-8");
        assert!(reporter.is_empty(), "{:?}", reporter.messages());
    }

    #[tokio::test]
    async fn test_explicit_content_type_is_kept() {
        let (e, reporter) = echo();
        let resp = e
            .post("/items")
            .with_header("Content-Type", "application/vnd.test+json")
            .with_text("{}")
            .expect()
            .await;
        resp.json()
            .object()
            .value("headers")
            .object()
            .value("content-type")
            .string()
            .is_equal("application/vnd.test+json");
        assert!(reporter.is_empty(), "{:?}", reporter.messages());
    }

    #[tokio::test]
    async fn test_auth_headers() {
        let (e, reporter) = echo();
        let resp = e.get("/").with_basic_auth("user", "pass").expect().await;
        resp.json()
            .object()
            .value("headers")
            .object()
            .value("authorization")
            .string()
            .is_equal("Basic dXNlcjpwYXNz");

        let resp = e.get("/").with_bearer_token("t0k").expect().await;
        resp.json()
            .object()
            .value("headers")
            .object()
            .value("authorization")
            .string()
            .is_equal("Bearer t0k");
        assert!(reporter.is_empty(), "{:?}", reporter.messages());
    }

    #[tokio::test]
    async fn test_form_body() {
        let (e, reporter) = echo();
        let resp = e
            .post("/login")
            .with_form(json!({"user": "ann"}))
            .with_form_field("remember", true)
            .expect()
            .await;
        resp.json()
            .object()
            .value("body")
            .string()
            .is_equal("user=ann&remember=true");
        assert!(reporter.is_empty(), "{:?}", reporter.messages());
    }

    #[tokio::test]
    async fn test_conflicting_bodies_fail_once() {
        let (e, reporter) = echo();
        let resp = e
            .post("/x")
            .with_text("a")
            .with_form_field("k", "v")
            .with_json(json!(1))
            .expect()
            .await;
        resp.status(200u16);
        let messages = reporter.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("with_form_field(\"k\", \"v\")"));
        assert!(messages[0].contains("conflicting request bodies"));
    }

    #[tokio::test]
    async fn test_unbound_path_parameter() {
        let (e, reporter) = echo();
        e.get("/users/{id}").expect().await.status(200u16);
        let messages = reporter.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Request(\"GET\", \"/users/{id}\").expect()"));
        assert!(messages[0].contains("unbound path parameter"));
    }

    #[tokio::test]
    async fn test_too_many_path_args() {
        let (e, reporter) = echo();
        e.get("/users/{id}")
            .with_path_args([1, 2])
            .expect()
            .await;
        assert_eq!(reporter.len(), 1);
    }

    #[tokio::test]
    async fn test_path_object() {
        #[derive(Serialize)]
        struct Params {
            user: &'static str,
            id: u32,
        }
        let (e, reporter) = echo();
        e.get("/users/{user}/posts/{id}")
            .with_path_object(Params { user: "ann", id: 7 })
            .expect()
            .await
            .json()
            .object()
            .value("uri")
            .string()
            .has_suffix("/users/ann/posts/7");
        assert!(reporter.is_empty(), "{:?}", reporter.messages());
    }

    #[tokio::test]
    async fn test_transformer_and_name() {
        let (e, reporter) = echo();
        let resp = e
            .get("/")
            .with_name("probe")
            .with_transformer(|req| {
                req.headers_mut()
                    .insert("x-added", HeaderValue::from_static("yes"));
            })
            .expect()
            .await;
        let headers = resp.json().object().value("headers").object();
        headers.value("x-added").string().is_equal("yes");
        headers.value("x-missing");
        let messages = reporter.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("request name: probe"));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://h/api/", "/users").unwrap().as_str(),
            "http://h/api/users"
        );
        assert_eq!(
            join_url("http://h", "http://other/x").unwrap().as_str(),
            "http://other/x"
        );
        assert!(join_url("", "/x").is_err());
    }
}
