//! The reporting pipeline.
//!
//! Every failed assertion ends up in an [`AssertionHandler`]. The default
//! handler renders the failure with a [`Formatter`] and passes the text to a
//! [`Reporter`]; successful assertions optionally go to a [`Logger`].
//!
//! ```text
//! Chain::fail ──► AssertionHandler::failure ──► Formatter ──► Reporter
//! Chain::pass ──► AssertionHandler::success ──► Formatter ──► Logger
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::failure::{AssertionContext, AssertionFailure, Expected};

/// Receives formatted failure messages.
pub trait Reporter: Send + Sync {
    /// Report one failure.
    fn report(&self, message: &str);
}

/// Receives formatted success messages.
pub trait Logger: Send + Sync {
    /// Log one message.
    fn log(&self, message: &str);
}

/// Renders failures and successes into text.
pub trait Formatter: Send + Sync {
    /// Render a failed assertion.
    fn format_failure(&self, ctx: &AssertionContext, failure: &AssertionFailure) -> String;

    /// Render a successful assertion.
    fn format_success(&self, ctx: &AssertionContext) -> String {
        format!("assertion passed: {}", ctx.display_path())
    }
}

/// Structured access to every assertion outcome.
///
/// Implement this directly to inspect failures before formatting; most
/// callers only need to swap the [`Reporter`] inside
/// [`DefaultAssertionHandler`].
pub trait AssertionHandler: Send + Sync {
    /// Called once per failed assertion lineage.
    fn failure(&self, ctx: &AssertionContext, failure: &AssertionFailure);

    /// Called for every passed assertion.
    fn success(&self, _ctx: &AssertionContext) {}
}

/// Formats with a [`Formatter`], reports with a [`Reporter`], and optionally
/// logs successes.
#[derive(Clone)]
pub struct DefaultAssertionHandler {
    formatter: Arc<dyn Formatter>,
    reporter: Arc<dyn Reporter>,
    logger: Option<Arc<dyn Logger>>,
}

impl DefaultAssertionHandler {
    /// Create a handler around `reporter` with the [`DefaultFormatter`].
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            formatter: Arc::new(DefaultFormatter::default()),
            reporter,
            logger: None,
        }
    }

    /// Replace the formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Route successful assertions to `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }
}

impl AssertionHandler for DefaultAssertionHandler {
    fn failure(&self, ctx: &AssertionContext, failure: &AssertionFailure) {
        let message = self.formatter.format_failure(ctx, failure);
        self.reporter.report(&message);
    }

    fn success(&self, ctx: &AssertionContext) {
        if let Some(logger) = &self.logger {
            logger.log(&self.formatter.format_success(ctx));
        }
    }
}

/// Deterministic plain-text formatter.
///
/// Output shape:
///
/// ```text
/// assertion failed: values equal
///
/// test name: my_test
/// request name: login
/// assertion: Request("GET", "/user").expect().json().object().value("id").number().is_equal(1)
///
/// errors:
///   expected: numbers are equal
///
/// expected:
///   1
///
/// actual:
///   2
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultFormatter {
    /// Also print the request line and response status when available.
    pub print_http: bool,
}

impl DefaultFormatter {
    /// Formatter that includes request and response summaries.
    pub fn with_http() -> Self {
        Self { print_http: true }
    }
}

fn indent_json(value: &JsonValue) -> String {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Formatter for DefaultFormatter {
    fn format_failure(&self, ctx: &AssertionContext, failure: &AssertionFailure) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "assertion failed: {}", failure.kind);
        out.push('\n');

        if let Some(test_name) = &ctx.test_name {
            let _ = writeln!(out, "test name: {test_name}");
        }
        if let Some(request_name) = &ctx.request_name {
            let _ = writeln!(out, "request name: {request_name}");
        }
        let _ = writeln!(out, "assertion: {}", ctx.display_path());
        if ctx.alias_path.is_some() {
            let _ = writeln!(out, "full path: {}", ctx.path);
        }

        if !failure.errors.is_empty() {
            out.push_str("\nerrors:\n");
            for error in &failure.errors {
                let _ = writeln!(out, "  {error}");
            }
        }

        if let Some(expected) = &failure.expected {
            let label = match expected {
                Expected::Value(_) => "expected",
                Expected::List(_) => "expected one of",
                Expected::Range { .. } => "expected range",
            };
            let _ = write!(out, "\n{label}:\n{}\n", indent_json(&expected.to_json()));
        }

        if let Some(reference) = &failure.reference {
            let _ = write!(out, "\nreference:\n{}\n", indent_json(reference));
        }

        if let Some(delta) = failure.delta {
            let _ = write!(out, "\ndelta:\n  {delta}\n");
        }

        if let Some(actual) = &failure.actual {
            let _ = write!(out, "\nactual:\n{}\n", indent_json(actual));
        }

        if self.print_http {
            if let Some(request) = &ctx.request {
                let _ = write!(out, "\nrequest:\n  {} {}\n", request.method, request.url);
            }
            if let Some(response) = &ctx.response {
                let _ = write!(
                    out,
                    "\nresponse:\n  {} ({} bytes)\n",
                    response.status,
                    response.body.len()
                );
            }
        }

        out.trim_end().to_string()
    }
}

/// Panics with the failure message, failing the current test immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicReporter;

impl Reporter for PanicReporter {
    fn report(&self, message: &str) {
        panic!("{message}");
    }
}

/// Collects failure messages for soft assertions.
///
/// Clones share the same buffer.
///
/// # Example
///
/// ```rust,ignore
/// let reporter = CollectReporter::new();
/// let e = Expect::new(Config::new(client).reporter(reporter.clone()));
/// // ... assertions
/// assert!(reporter.is_empty(), "{:#?}", reporter.messages());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CollectReporter {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectReporter {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected messages.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Number of collected messages.
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Drop every collected message.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Reporter for CollectReporter {
    fn report(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// Emits failures as `tracing` error events without stopping the test.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, message: &str) {
        tracing::error!(target: "hyperexpect::report", "{message}");
    }
}

/// Emits successes as `tracing` debug events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::debug!(target: "hyperexpect::report", "{message}");
    }
}
