//! Assertions on a received response.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE, TRANSFER_ENCODING};
use http::StatusCode;
use serde_json::{Map, Value as JsonValue};

use crate::chain::Chain;
use crate::cookie::SetCookie;
use crate::engine::{Reply, Upgraded};
use crate::failure::{AssertionFailure, FailureKind};
use crate::printer::Printer;
use crate::value::{Array, Cookie, DurationValue, Object, StringValue, Value};
use crate::websocket::Websocket;

/// A class of status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusRange {
    /// 1xx
    Informational,
    /// 2xx
    Success,
    /// 3xx
    Redirect,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
}

impl StatusRange {
    /// Returns true if `status` belongs to this class.
    pub fn contains(self, status: StatusCode) -> bool {
        match self {
            Self::Informational => status.is_informational(),
            Self::Success => status.is_success(),
            Self::Redirect => status.is_redirection(),
            Self::ClientError => status.is_client_error(),
            Self::ServerError => status.is_server_error(),
        }
    }
}

impl fmt::Display for StatusRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Informational => "1xx Informational",
            Self::Success => "2xx Success",
            Self::Redirect => "3xx Redirect",
            Self::ClientError => "4xx Client Error",
            Self::ServerError => "5xx Server Error",
        };
        f.write_str(name)
    }
}

fn status_text(code: u16) -> String {
    StatusCode::from_u16(code).map_or_else(|_| code.to_string(), |s| s.to_string())
}

type Decoded<T> = OnceCell<Result<T, AssertionFailure>>;

/// The response of [`Request::expect`](crate::Request::expect).
///
/// If the request never produced a response (a builder error, a transport
/// failure, a timeout, a cancellation) the failure was already reported and
/// every assertion on this wrapper is a no-op.
///
/// `text()`, `json()` and `form()` decode the body once; a decode failure
/// is reported once and fails the response chain.
pub struct Response {
    chain: Chain,
    response: http::Response<Bytes>,
    rtt: Option<Duration>,
    upgraded: bool,
    websocket: RefCell<Option<Upgraded>>,
    printers: Vec<Arc<dyn Printer>>,
    ws_timeouts: (Option<Duration>, Option<Duration>),
    text: Decoded<String>,
    json: Decoded<JsonValue>,
    form: Decoded<Map<String, JsonValue>>,
}

impl Response {
    pub(crate) fn new(
        chain: Chain,
        reply: Reply,
        printers: Vec<Arc<dyn Printer>>,
        ws_timeouts: (Option<Duration>, Option<Duration>),
    ) -> Self {
        Self {
            chain,
            response: reply.response,
            rtt: Some(reply.rtt),
            upgraded: reply.websocket.is_some(),
            websocket: RefCell::new(reply.websocket),
            printers,
            ws_timeouts,
            text: OnceCell::new(),
            json: OnceCell::new(),
            form: OnceCell::new(),
        }
    }

    pub(crate) fn failed(chain: Chain) -> Self {
        chain.set_failed();
        Self {
            chain,
            response: http::Response::new(Bytes::new()),
            rtt: None,
            upgraded: false,
            websocket: RefCell::new(None),
            printers: Vec::new(),
            ws_timeouts: (None, None),
            text: OnceCell::new(),
            json: OnceCell::new(),
            form: OnceCell::new(),
        }
    }

    /// The buffered response.
    pub fn raw(&self) -> &http::Response<Bytes> {
        &self.response
    }

    /// Round-trip time of the final attempt, if a response arrived.
    pub fn rtt(&self) -> Option<Duration> {
        self.rtt
    }

    /// Returns true if a failure was reported on this response.
    pub fn is_failed(&self) -> bool {
        self.chain.is_failed()
    }

    /// Report later failures under `name` instead of the full path.
    #[must_use]
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    // ------------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------------

    /// Status equals `status`.
    pub fn status(&self, status: impl Into<u16>) -> &Self {
        let expected = status.into();
        self.chain.check(format!("status({expected})"), || {
            let actual = self.response.status().as_u16();
            (actual != expected).then(|| {
                AssertionFailure::new(FailureKind::Equal)
                    .actual(status_text(actual))
                    .expected(status_text(expected))
                    .error(format!("expected: status equal to {}", status_text(expected)))
            })
        });
        self
    }

    /// Status differs from `status`.
    pub fn not_status(&self, status: impl Into<u16>) -> &Self {
        let other = status.into();
        self.chain.check(format!("not_status({other})"), || {
            (self.response.status().as_u16() == other).then(|| {
                AssertionFailure::new(FailureKind::NotEqual)
                    .actual(status_text(other))
                    .error(format!("expected: status not equal to {}", status_text(other)))
            })
        });
        self
    }

    /// Status belongs to `range`.
    pub fn status_range(&self, range: StatusRange) -> &Self {
        self.chain.check(format!("status_range({range:?})"), || {
            let status = self.response.status();
            (!range.contains(status)).then(|| {
                AssertionFailure::new(FailureKind::InRange)
                    .actual(status.to_string())
                    .expected(range.to_string())
                    .error(format!("expected: status in range {range}"))
            })
        });
        self
    }

    /// Status is one of `codes`.
    pub fn status_list(&self, codes: &[u16]) -> &Self {
        self.chain.check(format!("status_list({codes:?})"), || {
            if codes.is_empty() {
                return Some(
                    AssertionFailure::new(FailureKind::InvalidRequest)
                        .error("unexpected empty list argument"),
                );
            }
            let actual = self.response.status().as_u16();
            (!codes.contains(&actual)).then(|| {
                AssertionFailure::new(FailureKind::InList)
                    .actual(status_text(actual))
                    .expected_list(codes.iter().map(|&c| status_text(c).into()).collect())
                    .error("expected: status equal to one of the list elements")
            })
        });
        self
    }

    // ------------------------------------------------------------------------
    // Headers and cookies
    // ------------------------------------------------------------------------

    /// All headers, as a map from lowercase name to the list of values.
    pub fn headers(&self) -> Object {
        let mut map = Map::new();
        for name in self.response.headers().keys() {
            let values = self
                .response
                .headers()
                .get_all(name)
                .iter()
                .map(|v| JsonValue::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
                .collect();
            map.insert(name.to_string(), JsonValue::Array(values));
        }
        Object::new(self.chain.child("headers()"), map)
    }

    /// Values of header `name`, joined with `", "`; fails if missing.
    pub fn header(&self, name: &str) -> StringValue {
        let chain = self.chain.child(format!("header({name:?})"));
        let values: Vec<String> = self
            .response
            .headers()
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        if values.is_empty() {
            chain.fail(
                AssertionFailure::new(FailureKind::ContainsKey)
                    .expected(name)
                    .error(format!("expected: response has header {name:?}")),
            );
        }
        StringValue::new(chain, values.join(", "))
    }

    /// Names of the cookies set by the response.
    pub fn cookies(&self) -> Array {
        let names = SetCookie::parse_all(self.response.headers())
            .iter()
            .map(|c| JsonValue::String(c.name().to_string()))
            .collect();
        Array::new(self.chain.child("cookies()"), names)
    }

    /// The cookie called `name`; fails if the response does not set it.
    pub fn cookie(&self, name: &str) -> Cookie {
        let chain = self.chain.child(format!("cookie({name:?})"));
        let found = SetCookie::parse_all(self.response.headers())
            .into_iter()
            .rev()
            .find(|c| c.name() == name);
        match found {
            Some(cookie) => Cookie::new(chain, cookie),
            None => {
                chain.fail(
                    AssertionFailure::new(FailureKind::ContainsKey)
                        .expected(name)
                        .error(format!("expected: response sets cookie {name:?}")),
                );
                Cookie::new(chain, SetCookie::new(name, ""))
            }
        }
    }

    fn media_type(&self) -> Option<mime::Mime> {
        self.response
            .headers()
            .get(CONTENT_TYPE)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }

    fn content_type_failure(&self, expected: &str) -> AssertionFailure {
        let actual = self
            .response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        let failure = AssertionFailure::new(FailureKind::MatchFormat)
            .expected(expected)
            .error(format!("expected: Content-Type {expected}"));
        match actual {
            Some(actual) => failure.actual(actual),
            None => failure.error("Content-Type header is missing"),
        }
    }

    /// `Content-Type` has the media type `media`, e.g. `application/json`.
    pub fn has_content_type(&self, media: &str) -> &Self {
        self.chain.check(format!("has_content_type({media:?})"), || {
            let ok = self
                .media_type()
                .is_some_and(|m| m.essence_str().eq_ignore_ascii_case(media));
            (!ok).then(|| self.content_type_failure(media))
        });
        self
    }

    /// `Content-Type` has the media type `media` and the charset `charset`.
    pub fn has_content_type_charset(&self, media: &str, charset: &str) -> &Self {
        self.chain
            .check(format!("has_content_type_charset({media:?}, {charset:?})"), || {
                let ok = self.media_type().is_some_and(|m| {
                    m.essence_str().eq_ignore_ascii_case(media)
                        && m
                            .get_param(mime::CHARSET)
                            .is_some_and(|c| c.as_str().eq_ignore_ascii_case(charset))
                });
                (!ok).then(|| self.content_type_failure(&format!("{media}; charset={charset}")))
            });
        self
    }

    fn tokens(&self, name: &http::HeaderName) -> Vec<String> {
        self.response
            .headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn check_tokens(&self, segment: String, name: &http::HeaderName, expected: &[&str]) {
        self.chain.check(segment, || {
            let actual = self.tokens(name);
            let expected: Vec<String> = expected.iter().map(|e| e.to_ascii_lowercase()).collect();
            (actual != expected).then(|| {
                AssertionFailure::new(FailureKind::Equal)
                    .actual(actual)
                    .expected(expected)
                    .error(format!("expected: {name} equal to the given list"))
            })
        });
    }

    /// `Content-Encoding` lists exactly `encodings`, in order; an empty
    /// list means the header is absent.
    pub fn has_content_encoding(&self, encodings: &[&str]) -> &Self {
        self.check_tokens(
            format!("has_content_encoding({encodings:?})"),
            &CONTENT_ENCODING,
            encodings,
        );
        self
    }

    /// `Transfer-Encoding` lists exactly `encodings`, in order; an empty
    /// list means the header is absent.
    pub fn has_transfer_encoding(&self, encodings: &[&str]) -> &Self {
        self.check_tokens(
            format!("has_transfer_encoding({encodings:?})"),
            &TRANSFER_ENCODING,
            encodings,
        );
        self
    }

    // ------------------------------------------------------------------------
    // Body
    // ------------------------------------------------------------------------

    /// Raw body as a string; invalid UTF-8 is replaced.
    pub fn body(&self) -> StringValue {
        StringValue::new(
            self.chain.child("body()"),
            String::from_utf8_lossy(self.response.body()).into_owned(),
        )
    }

    /// Body is empty and no `Content-Type` is set.
    pub fn no_content(&self) -> &Self {
        self.chain.check("no_content()", || {
            let body = self.response.body();
            let content_type = self.response.headers().get(CONTENT_TYPE);
            if body.is_empty() && content_type.is_none() {
                return None;
            }
            let mut failure = AssertionFailure::new(FailureKind::Empty)
                .actual(String::from_utf8_lossy(body).into_owned())
                .error("expected: response has no content");
            if let Some(content_type) = content_type {
                failure = failure.error(format!(
                    "unexpected Content-Type: {}",
                    String::from_utf8_lossy(content_type.as_bytes())
                ));
            }
            Some(failure)
        });
        self
    }

    /// Decode once through `cell`; report a failure at `segment` once.
    fn decoded<T: Clone + Default>(
        &self,
        cell: &Decoded<T>,
        segment: &str,
        decode: impl FnOnce() -> Result<T, AssertionFailure>,
    ) -> (Chain, T) {
        if self.chain.is_failed() {
            return (self.chain.child(segment), T::default());
        }
        match cell.get_or_init(decode) {
            Ok(value) => {
                self.chain.pass_at(segment);
                (self.chain.child(segment), value.clone())
            }
            Err(failure) => {
                self.chain.fail_at(segment, failure.clone());
                (self.chain.child(segment), T::default())
            }
        }
    }

    fn decode_text(&self) -> Result<String, AssertionFailure> {
        String::from_utf8(self.response.body().to_vec()).map_err(|e| {
            let offset = e.utf8_error().valid_up_to();
            AssertionFailure::new(FailureKind::Decode)
                .error(format!("expected: UTF-8 body, found invalid byte at offset {offset}"))
        })
    }

    fn check_charset(media: &mime::Mime) -> Result<(), AssertionFailure> {
        match media.get_param(mime::CHARSET) {
            Some(charset) if !charset.as_str().eq_ignore_ascii_case("utf-8") => Err(
                AssertionFailure::new(FailureKind::MatchFormat)
                    .actual(charset.as_str())
                    .expected("utf-8")
                    .error("expected: Content-Type charset utf-8"),
            ),
            _ => Ok(()),
        }
    }

    fn decode_json(&self) -> Result<JsonValue, AssertionFailure> {
        let is_json = self.media_type().filter(|m| {
            m.type_() == mime::APPLICATION
                && (m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
        });
        let Some(media) = is_json else {
            return Err(self.content_type_failure("application/json"));
        };
        Self::check_charset(&media)?;
        serde_json::from_slice(self.response.body()).map_err(|e| {
            AssertionFailure::new(FailureKind::Decode)
                .actual(String::from_utf8_lossy(self.response.body()).into_owned())
                .error(format!("expected: valid JSON body: {e}"))
        })
    }

    fn decode_form(&self) -> Result<Map<String, JsonValue>, AssertionFailure> {
        let is_form = self
            .media_type()
            .is_some_and(|m| m.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str());
        if !is_form {
            return Err(self.content_type_failure("application/x-www-form-urlencoded"));
        }
        let mut map = Map::new();
        for (key, value) in url::form_urlencoded::parse(self.response.body()).into_owned() {
            let value = JsonValue::String(value);
            match map.get_mut(&key) {
                Some(JsonValue::Array(values)) => values.push(value),
                Some(first) => {
                    let first = first.take();
                    map.insert(key, JsonValue::Array(vec![first, value]));
                }
                None => {
                    map.insert(key, value);
                }
            }
        }
        Ok(map)
    }

    /// Body as text, whatever the `Content-Type`; fails on invalid UTF-8.
    pub fn text(&self) -> StringValue {
        let (chain, text) = self.decoded(&self.text, "text()", || self.decode_text());
        StringValue::new(chain, text)
    }

    /// Body decoded as JSON.
    ///
    /// Requires `application/json` (or a `+json` type) with no charset or
    /// `utf-8`.
    pub fn json(&self) -> Value {
        let (chain, value) = self.decoded(&self.json, "json()", || self.decode_json());
        Value::new(chain, value)
    }

    /// Body of an `application/javascript` JSONP response calling `callback`.
    pub fn jsonp(&self, callback: &str) -> Value {
        let segment = format!("jsonp({callback:?})");
        let chain = self.chain.child(&segment);
        if self.chain.is_failed() {
            return Value::new(chain, JsonValue::Null);
        }
        let result = self.decode_jsonp(callback);
        match result {
            Ok(value) => {
                self.chain.pass_at(&segment);
                Value::new(chain, value)
            }
            Err(failure) => {
                self.chain.fail_at(&segment, failure);
                chain.set_failed();
                Value::new(chain, JsonValue::Null)
            }
        }
    }

    fn decode_jsonp(&self, callback: &str) -> Result<JsonValue, AssertionFailure> {
        let is_script = self.media_type().is_some_and(|m| {
            m.subtype() == mime::JAVASCRIPT
                && (m.type_() == mime::APPLICATION || m.type_() == mime::TEXT)
        });
        let Some(media) = self.media_type().filter(|_| is_script) else {
            return Err(self.content_type_failure("application/javascript"));
        };
        Self::check_charset(&media)?;

        let text = self.decode_text()?;
        let body = text.trim();
        let inner = body
            .strip_prefix(callback)
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('('))
            .map(|rest| rest.trim_end().trim_end_matches(';').trim_end())
            .and_then(|rest| rest.strip_suffix(')'));
        let Some(inner) = inner else {
            return Err(AssertionFailure::new(FailureKind::Decode)
                .actual(body)
                .error(format!("expected: body is a call to {callback}(...)")));
        };
        serde_json::from_str(inner).map_err(|e| {
            AssertionFailure::new(FailureKind::Decode)
                .actual(inner)
                .error(format!("expected: valid JSON argument: {e}"))
        })
    }

    /// Body decoded as an `application/x-www-form-urlencoded` form.
    ///
    /// Repeated keys become arrays.
    pub fn form(&self) -> Object {
        let (chain, map) = self.decoded(&self.form, "form()", || self.decode_form());
        Object::new(chain, map)
    }

    /// Round-trip time of the final attempt.
    pub fn round_trip_time(&self) -> DurationValue {
        DurationValue::new(self.chain.child("round_trip_time()"), self.rtt)
    }

    /// The WebSocket opened by a `with_websocket_upgrade` request.
    ///
    /// The connection can be taken once.
    pub fn websocket(&self) -> Websocket {
        let chain = self.chain.child("websocket()");
        let upgraded = if self.chain.is_failed() {
            None
        } else if !self.upgraded {
            chain.fail(
                AssertionFailure::new(FailureKind::InvalidRequest)
                    .error("expected: request was sent with with_websocket_upgrade()"),
            );
            None
        } else {
            let taken = self.websocket.borrow_mut().take();
            if taken.is_none() {
                chain.fail(
                    AssertionFailure::new(FailureKind::InvalidRequest)
                        .error("websocket() was already called on this response"),
                );
            }
            taken
        };
        let (conn, subprotocol) = match upgraded {
            Some(Upgraded { conn, subprotocol }) => (Some(conn), subprotocol),
            None => (None, None),
        };
        let mut ws = Websocket::new(chain, conn, subprotocol, self.printers.clone());
        ws.set_timeouts(self.ws_timeouts.0, self.ws_timeouts.1);
        ws
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.response.status())
            .field("headers", self.response.headers())
            .field("body_len", &self.response.body().len())
            .field("rtt", &self.rtt)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
