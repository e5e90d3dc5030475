//! # hyperexpect
//!
//! Fluent HTTP and WebSocket assertions for tests.
//!
//! A session ([`Expect`]) builds requests, sends them to an in-process
//! handler or a live server, and wraps the outcome in a chain of typed
//! assertion wrappers. A failed assertion never panics by itself: it is
//! formatted with the full path of calls that led to it and handed to a
//! [`Reporter`]. The default [`PanicReporter`] makes the test fail; a
//! [`CollectReporter`] gathers failures for soft assertions.
//!
//! ## Key Features
//!
//! - **Request builder**: path templates, query, headers, cookies, and
//!   text, JSON, form, multipart, or chunked bodies
//! - **Execution engine**: retry policies with exponential backoff, redirect
//!   policies, per-request timeouts and cancellation
//! - **Assertion tree**: status, headers, cookies, JSON values, strings,
//!   numbers, arrays, objects, regex matches, durations, and date-times
//! - **WebSocket**: upgrade, read and write frames, close handshakes
//! - **Transports**: in-process [`Binder`] over a handler function and
//!   [`NetworkClient`] for live servers
//!
//! ## Example
//!
//! ```ignore
//! use hyperexpect::{Expect, StatusRange};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_user() {
//!     let e = Expect::with_handler(app);
//!
//!     let user = e.post("/users")
//!         .with_json(json!({"name": "Alice"}))
//!         .expect()
//!         .await
//!         .status_range(StatusRange::Success)
//!         .json()
//!         .object();
//!
//!     user.value("name").string().is_equal("Alice");
//!     user.value("id").number().gt(0);
//! }
//! ```
//!
//! A failure report names the whole chain:
//!
//! ```text
//! assertion failed: values equal
//!
//! assertion: Request("POST", "/users").expect().json().object().value("name").string().is_equal("Alice")
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cancel;
mod chain;
mod config;
mod cookie;
mod engine;
mod environment;
mod error;
mod expect;
mod failure;
mod policy;
mod request;
mod response;

pub mod printer;
pub mod reporter;
pub mod transport;
pub mod value;
pub mod websocket;

pub use cancel::CancelToken;
pub use chain::{AssertionPath, Chain, ChainState};
pub use config::{Config, ConfigError, RequestDefaults, ENV_PREFIX};
pub use cookie::{CookieJar, SameSite, SetCookie};
pub use environment::Environment;
pub use error::{BoxError, ExpectError, ExpectResult, TransportError, TransportErrorKind};
pub use expect::Expect;
pub use failure::{
    AssertionContext, AssertionFailure, Expected, FailureKind, RequestInfo, ResponseInfo,
};
pub use policy::{
    is_redirect, Backoff, Outcome, ParsePolicyError, RedirectAction, RedirectPolicy, RetryPolicy,
};
pub use printer::{CompactPrinter, CurlPrinter, DebugPrinter, Printer};
pub use reporter::{
    AssertionHandler, CollectReporter, DefaultAssertionHandler, DefaultFormatter, Formatter,
    Logger, PanicReporter, Reporter, TracingLogger, TracingReporter,
};
pub use request::Request;
pub use response::{Response, StatusRange};
pub use transport::{Binder, Client, NetworkClient};
pub use websocket::{LocalDialer, TungsteniteDialer, Websocket, WebsocketMessage};
