//! Errors from installing a subscriber.

use thiserror::Error;

/// Why logging setup failed.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber could not be installed.
    #[error("cannot install log subscriber: {0}")]
    LoggingInit(String),

    /// A filter directive did not parse.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::LoggingInit("failed".to_string());
        assert_eq!(err.to_string(), "cannot install log subscriber: failed");

        let err = TelemetryError::InvalidFilter("=bad".to_string());
        assert_eq!(err.to_string(), "invalid log filter: =bad");
    }
}
