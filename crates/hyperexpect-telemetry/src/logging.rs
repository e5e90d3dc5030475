//! Structured logging for hyperexpect test suites.
//!
//! This module installs a `tracing-subscriber` registry with an
//! [`EnvFilter`], in either human-readable or JSON format.
//!
//! # Example
//!
//! ```rust,ignore
//! use hyperexpect_telemetry::logging::{LogConfig, init_logging};
//!
//! let config = LogConfig::development();
//! init_logging(&config)?;
//!
//! tracing::debug!(method = "GET", url = "http://localhost/users", "sending request");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::TestWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// How test-suite logging is installed.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Install nothing when false.
    pub enabled: bool,

    /// Filter directive, e.g. `"info"` or `"hyperexpect=debug,reqwest=warn"`.
    pub level: String,

    /// Emit JSON lines instead of compact text.
    pub json_format: bool,

    /// Annotate events with source file and line.
    pub file_line_info: bool,

    /// Annotate events with their module path.
    pub include_target: bool,

    /// Write through libtest's capture buffer instead of stderr.
    pub test_writer: bool,

    /// Let a set `RUST_LOG` take precedence over `level`.
    pub respect_env: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: false,
            file_line_info: false,
            include_target: true,
            test_writer: false,
            respect_env: true,
        }
    }
}

impl LogConfig {
    /// Debug-level compact output with source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            file_line_info: true,
            ..Self::default()
        }
    }

    /// Debug output from hyperexpect only, captured by libtest.
    #[must_use]
    pub fn test() -> Self {
        Self {
            level: "hyperexpect=debug".to_string(),
            test_writer: true,
            ..Self::default()
        }
    }

    /// Info-level JSON lines, for CI log collectors.
    #[must_use]
    pub fn json() -> Self {
        Self {
            json_format: true,
            ..Self::default()
        }
    }

    fn filter(&self) -> TelemetryResult<EnvFilter> {
        if self.respect_env {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        create_env_filter(&self.level)
    }

    fn writer(&self) -> BoxMakeWriter {
        if self.test_writer {
            BoxMakeWriter::new(TestWriter::new())
        } else {
            BoxMakeWriter::new(std::io::stderr)
        }
    }
}

/// Install a global subscriber described by `config`.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` for a malformed level and
/// `TelemetryError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = config.filter()?;
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(config.writer())
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_target(config.include_target);
    let layer = if config.json_format {
        layer.json().with_filter(filter).boxed()
    } else {
        layer.compact().with_filter(filter).boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Installs [`LogConfig::test`] logging, ignoring an already-installed subscriber.
///
/// Safe to call at the top of every test.
pub fn init_test_logging() {
    // Another test in the same binary may have installed the subscriber.
    let _ = init_logging(&LogConfig::test());
}

/// Parse `filter` as an [`EnvFilter`] directive.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` if a directive does not parse.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter(e.to_string()))
}
