//! The session entry point.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::cancel::CancelToken;
use crate::chain::{Chain, ChainContext};
use crate::config::{Config, RequestDefaults};
use crate::cookie::CookieJar;
use crate::environment::Environment;
use crate::error::BoxError;
use crate::failure::{AssertionFailure, FailureKind};
use crate::printer::Printer;
use crate::reporter::AssertionHandler;
use crate::request::Request;
use crate::response::Response;
use crate::transport::{Binder, Client, NetworkClient, RequestBody};
use crate::value::{Array, Boolean, Number, Object, StringValue, Value};
use crate::websocket::{Dialer, TungsteniteDialer};

/// Applied to every new request of a session, before request-specific calls.
pub(crate) type RequestFactory = Arc<dyn Fn(Request) -> Request + Send + Sync>;

/// Runs on every response of a session or request.
pub(crate) type ResponseMatcher = Arc<dyn Fn(&Response) + Send + Sync>;

/// State shared by every request of a session.
#[derive(Clone)]
pub(crate) struct Session {
    pub(crate) base_url: String,
    pub(crate) test_name: Option<String>,
    pub(crate) handler: Arc<dyn AssertionHandler>,
    pub(crate) client: Option<Arc<dyn Client>>,
    pub(crate) dialer: Option<Arc<dyn Dialer>>,
    pub(crate) printers: Vec<Arc<dyn Printer>>,
    pub(crate) environment: Environment,
    pub(crate) cookie_jar: Option<CookieJar>,
    pub(crate) cancel: Option<CancelToken>,
    pub(crate) defaults: RequestDefaults,
    pub(crate) builders: Vec<RequestFactory>,
    pub(crate) matchers: Vec<ResponseMatcher>,
}

impl Session {
    pub(crate) fn context(&self) -> ChainContext {
        let mut context = ChainContext::new(Arc::clone(&self.handler));
        context.test_name.clone_from(&self.test_name);
        context
    }
}

/// An assertion session: creates requests and standalone value wrappers.
///
/// Cloning is cheap; clones share configuration, environment, and cookies.
///
/// # Example
///
/// ```rust,ignore
/// use hyperexpect::Expect;
///
/// let e = Expect::with_handler(|_req| async {
///     http::Response::new(Full::new(Bytes::from("pong")))
/// });
///
/// e.get("/ping").expect().await.status(200).text().is_equal("pong");
/// ```
#[derive(Clone)]
pub struct Expect {
    session: Arc<Session>,
}

impl Expect {
    /// Create a session from `config`.
    ///
    /// Without a configured client, requests go over the network through
    /// [`NetworkClient`]; without a dialer, WebSockets are dialed with
    /// [`TungsteniteDialer`]. A session without an environment gets a fresh
    /// one of its own.
    pub fn new(config: Config) -> Self {
        let handler = config.assertion_handler_or_default();
        let client = config.client.or_else(|| match NetworkClient::new() {
            Ok(client) => Some(Arc::new(client) as Arc<dyn Client>),
            Err(e) => {
                tracing::warn!(error = %e, "failed to create network client");
                None
            }
        });
        let dialer = config
            .dialer
            .unwrap_or_else(|| Arc::new(TungsteniteDialer) as Arc<dyn Dialer>);
        Self {
            session: Arc::new(Session {
                base_url: config.base_url,
                test_name: config.test_name,
                handler,
                client,
                dialer: Some(dialer),
                printers: config.printers,
                environment: config.environment.unwrap_or_default(),
                cookie_jar: config.cookie_jar,
                cancel: config.cancel,
                defaults: config.defaults,
                builders: Vec::new(),
                matchers: Vec::new(),
            }),
        }
    }

    /// Session against a live server at `base_url`, with a cookie jar and
    /// panicking reporter.
    pub fn default(base_url: &str) -> Self {
        Self::new(Config::new(base_url).cookie_jar(CookieJar::new()))
    }

    /// Session against an in-process handler, with a cookie jar and
    /// panicking reporter.
    pub fn with_handler<F, Fut, B>(handler: F) -> Self
    where
        F: Fn(http::Request<RequestBody>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = http::Response<B>> + Send + 'static,
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self::new(
            Config::new("http://localhost")
                .client(Binder::new(handler))
                .cookie_jar(CookieJar::new()),
        )
    }

    fn derive(&self, update: impl FnOnce(&mut Session)) -> Self {
        let mut session = (*self.session).clone();
        update(&mut session);
        Self {
            session: Arc::new(session),
        }
    }

    /// A session whose requests are first passed through `build`.
    ///
    /// The new session shares this one's environment and cookies.
    #[must_use]
    pub fn builder(&self, build: impl Fn(Request) -> Request + Send + Sync + 'static) -> Self {
        self.derive(|session| session.builders.push(Arc::new(build)))
    }

    /// A session running `matcher` on every response.
    ///
    /// The new session shares this one's environment and cookies.
    #[must_use]
    pub fn matcher(&self, matcher: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        self.derive(|session| session.matchers.push(Arc::new(matcher)))
    }

    /// The session environment.
    pub fn env(&self) -> &Environment {
        &self.session.environment
    }

    /// The session cookie jar, if any.
    pub fn cookie_jar(&self) -> Option<&CookieJar> {
        self.session.cookie_jar.as_ref()
    }

    /// Start a request with an arbitrary method.
    pub fn request(&self, method: Method, path: &str) -> Request {
        Request::new(Arc::clone(&self.session), method, path)
    }

    /// Start a `GET` request.
    pub fn get(&self, path: &str) -> Request {
        self.request(Method::GET, path)
    }

    /// Start a `POST` request.
    pub fn post(&self, path: &str) -> Request {
        self.request(Method::POST, path)
    }

    /// Start a `PUT` request.
    pub fn put(&self, path: &str) -> Request {
        self.request(Method::PUT, path)
    }

    /// Start a `PATCH` request.
    pub fn patch(&self, path: &str) -> Request {
        self.request(Method::PATCH, path)
    }

    /// Start a `DELETE` request.
    pub fn delete(&self, path: &str) -> Request {
        self.request(Method::DELETE, path)
    }

    /// Start a `HEAD` request.
    pub fn head(&self, path: &str) -> Request {
        self.request(Method::HEAD, path)
    }

    /// Start an `OPTIONS` request.
    pub fn options(&self, path: &str) -> Request {
        self.request(Method::OPTIONS, path)
    }

    // ------------------------------------------------------------------------
    // Standalone values
    // ------------------------------------------------------------------------

    fn root(&self, name: &str) -> Chain {
        Chain::new(self.session.context(), name)
    }

    fn to_json(chain: &Chain, value: impl Serialize) -> JsonValue {
        serde_json::to_value(value).unwrap_or_else(|e| {
            chain.fail(
                AssertionFailure::new(FailureKind::InvalidRequest)
                    .error(format!("value is not serializable: {e}")),
            );
            JsonValue::Null
        })
    }

    /// Assert on any serializable value.
    pub fn value(&self, value: impl Serialize) -> Value {
        let chain = self.root("Value()");
        let json = Self::to_json(&chain, value);
        Value::new(chain, json)
    }

    /// Assert on a value that must serialize to a JSON object.
    pub fn object(&self, value: impl Serialize) -> Object {
        self.value(value).alias("Object()").object()
    }

    /// Assert on a value that must serialize to a JSON array.
    pub fn array(&self, value: impl Serialize) -> Array {
        self.value(value).alias("Array()").array()
    }

    /// Assert on a string.
    pub fn string(&self, value: &str) -> StringValue {
        StringValue::new(self.root("String()"), value.to_string())
    }

    /// Assert on a number.
    pub fn number(&self, value: f64) -> Number {
        Number::new(self.root("Number()"), value)
    }

    /// Assert on a boolean.
    pub fn boolean(&self, value: bool) -> Boolean {
        Boolean::new(self.root("Boolean()"), value)
    }
}

impl fmt::Debug for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expect")
            .field("base_url", &self.session.base_url)
            .field("test_name", &self.session.test_name)
            .field("defaults", &self.session.defaults)
            .finish_non_exhaustive()
    }
}
