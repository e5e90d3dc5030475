//! Logging setup for hyperexpect.
//!
//! `hyperexpect` reports engine progress (attempts, retries, redirects) and
//! printer output through `tracing`. This crate wires a `tracing-subscriber`
//! registry for test binaries so that output lands in the libtest capture
//! buffer and only shows up for failing tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use hyperexpect_telemetry::init_test_logging;
//!
//! #[tokio::test]
//! async fn test_get_user() {
//!     init_test_logging();
//!     // ... requests made here log through tracing
//! }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, init_test_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
