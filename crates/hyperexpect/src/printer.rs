//! Request and response printers.
//!
//! A [`Printer`] observes every attempt the engine makes: the request just
//! before it is sent and the buffered response with its round-trip time.
//! WebSocket frames are passed to the optional `websocket_*` hooks.
//!
//! The bundled printers write through `tracing` under the
//! `hyperexpect::printer` target, so they show up in test output once
//! `hyperexpect_telemetry::init_test_logging` (or any subscriber) is
//! installed.
//!
//! | Printer | Output |
//! |---------|--------|
//! | [`CompactPrinter`] | one line per request and response |
//! | [`DebugPrinter`] | headers, and bodies when enabled |
//! | [`CurlPrinter`] | an equivalent `curl` command per request |

use std::fmt::Write as _;
use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;

use crate::transport::HttpRequest;
use crate::websocket::WsMessage;

/// Observer of requests, responses and WebSocket frames.
///
/// Printers receive shared references only and cannot alter traffic.
pub trait Printer: Send + Sync {
    /// Called before a request is sent.
    fn request(&self, request: &HttpRequest);

    /// Called once a response was received and buffered.
    fn response(&self, response: &http::Response<Bytes>, rtt: Duration);

    /// Called for every WebSocket message read.
    fn websocket_read(&self, _message: &WsMessage) {}

    /// Called for every WebSocket message written.
    fn websocket_write(&self, _message: &WsMessage) {}
}

fn emit(text: &str) {
    tracing::info!(target: "hyperexpect::printer", "{text}");
}

fn render_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let _ = writeln!(out, "{name}: {}", String::from_utf8_lossy(value.as_bytes()));
    }
}

fn render_body(out: &mut String, body: &[u8], limit: usize) {
    if body.is_empty() {
        return;
    }
    let text = String::from_utf8_lossy(body);
    out.push('\n');
    if text.len() > limit {
        let cut = (0..=limit).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
        let _ = write!(out, "{}... ({} bytes total)", &text[..cut], body.len());
    } else {
        out.push_str(&text);
    }
}

// ============================================================================
// Compact
// ============================================================================

/// One line per request and response: `GET http://host/path` and
/// `200 OK 12ms`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactPrinter;

impl CompactPrinter {
    /// Create a compact printer.
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn render_request(request: &HttpRequest) -> String {
        format!("{} {}", request.method(), request.uri())
    }

    pub(crate) fn render_response(response: &http::Response<Bytes>, rtt: Duration) -> String {
        format!("{} {}ms", response.status(), rtt.as_millis())
    }
}

impl Printer for CompactPrinter {
    fn request(&self, request: &HttpRequest) {
        emit(&Self::render_request(request));
    }

    fn response(&self, response: &http::Response<Bytes>, rtt: Duration) {
        emit(&Self::render_response(response, rtt));
    }

    fn websocket_read(&self, message: &WsMessage) {
        emit(&format!("<- {} ({} bytes)", message.kind, message.data.len()));
    }

    fn websocket_write(&self, message: &WsMessage) {
        emit(&format!("-> {} ({} bytes)", message.kind, message.data.len()));
    }
}

// ============================================================================
// Debug
// ============================================================================

/// Request and response heads, optionally with bodies.
#[derive(Debug, Clone, Copy)]
pub struct DebugPrinter {
    body: bool,
    body_limit: usize,
}

impl Default for DebugPrinter {
    fn default() -> Self {
        Self {
            body: true,
            body_limit: 4096,
        }
    }
}

impl DebugPrinter {
    /// Print heads and bodies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Print heads only.
    pub fn without_body() -> Self {
        Self {
            body: false,
            ..Self::default()
        }
    }

    /// Truncate bodies after `limit` bytes.
    #[must_use]
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub(crate) fn render_request(&self, request: &HttpRequest) -> String {
        let mut out = format!("{} {} {:?}\n", request.method(), request.uri(), request.version());
        render_headers(&mut out, request.headers());
        if self.body {
            match request.body().as_bytes() {
                Some(body) => render_body(&mut out, body, self.body_limit),
                None => out.push_str("\n<chunked body>"),
            }
        }
        out.trim_end().to_string()
    }

    pub(crate) fn render_response(&self, response: &http::Response<Bytes>, rtt: Duration) -> String {
        let mut out = format!("{:?} {} ({rtt:?})\n", response.version(), response.status());
        render_headers(&mut out, response.headers());
        if self.body {
            render_body(&mut out, response.body(), self.body_limit);
        }
        out.trim_end().to_string()
    }
}

impl Printer for DebugPrinter {
    fn request(&self, request: &HttpRequest) {
        emit(&self.render_request(request));
    }

    fn response(&self, response: &http::Response<Bytes>, rtt: Duration) {
        emit(&self.render_response(response, rtt));
    }

    fn websocket_read(&self, message: &WsMessage) {
        let mut out = format!("<- {}", message.kind);
        if let Some(code) = message.close_code {
            let _ = write!(out, " {code}");
        }
        if self.body {
            render_body(&mut out, &message.data, self.body_limit);
        }
        emit(&out);
    }

    fn websocket_write(&self, message: &WsMessage) {
        let mut out = format!("-> {}", message.kind);
        if let Some(code) = message.close_code {
            let _ = write!(out, " {code}");
        }
        if self.body {
            render_body(&mut out, &message.data, self.body_limit);
        }
        emit(&out);
    }
}

// ============================================================================
// Curl
// ============================================================================

/// Prints a `curl` command reproducing each request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlPrinter;

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

impl CurlPrinter {
    /// Create a curl printer.
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn render_request(request: &HttpRequest) -> String {
        let mut out = String::from("curl");
        if request.method() != http::Method::GET {
            let _ = write!(out, " -X {}", request.method());
        }
        for (name, value) in request.headers() {
            let header = format!("{name}: {}", String::from_utf8_lossy(value.as_bytes()));
            let _ = write!(out, " -H {}", shell_quote(&header));
        }
        match request.body().as_bytes() {
            Some(body) if !body.is_empty() => {
                let _ = write!(
                    out,
                    " --data-binary {}",
                    shell_quote(&String::from_utf8_lossy(body))
                );
            }
            Some(_) => {}
            None => out.push_str(" -H 'Transfer-Encoding: chunked' --data-binary @-"),
        }
        let _ = write!(out, " {}", shell_quote(&request.uri().to_string()));
        out
    }
}

impl Printer for CurlPrinter {
    fn request(&self, request: &HttpRequest) {
        emit(&Self::render_request(request));
    }

    fn response(&self, _response: &http::Response<Bytes>, _rtt: Duration) {}
}

// ============================================================================
// Tests
// ============================================================================
