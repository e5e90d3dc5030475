//! Retry and redirect decisions.
//!
//! Everything in this module is a pure function of policy and outcome. The
//! attempt and hop budgets are enforced by the engine.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use http::{Method, StatusCode};
use thiserror::Error;

use crate::error::ExpectError;

/// A policy name that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePolicyError {
    /// Not a [`RetryPolicy`] name.
    #[error("unknown retry policy: {0}")]
    Retry(String),

    /// Not a [`RedirectPolicy`] name.
    #[error("unknown redirect policy: {0}")]
    Redirect(String),
}

/// Which failed attempts are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetryPolicy {
    /// Never retry.
    DontRetry,
    /// Retry timeouts and transient network errors.
    RetryTimeoutErrors,
    /// Also retry 5xx responses.
    #[default]
    RetryTimeoutAndServerErrors,
    /// Also retry 4xx responses and every transport error.
    RetryAllErrors,
}

/// The result of one attempt, as seen by the retry policy.
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    /// A response with this status arrived.
    Status(StatusCode),
    /// The attempt failed.
    Error(&'a ExpectError),
}

impl RetryPolicy {
    /// Returns true if `outcome` should be retried under this policy.
    ///
    /// Cancellation and builder errors are never retried.
    pub fn should_retry(self, outcome: Outcome<'_>) -> bool {
        match outcome {
            Outcome::Status(status) => match self {
                Self::DontRetry | Self::RetryTimeoutErrors => false,
                Self::RetryTimeoutAndServerErrors => status.is_server_error(),
                Self::RetryAllErrors => status.is_server_error() || status.is_client_error(),
            },
            Outcome::Error(error) => match error {
                ExpectError::Cancelled
                | ExpectError::InvalidRequest(_)
                | ExpectError::Decode { .. }
                | ExpectError::TooManyRedirects(_) => false,
                ExpectError::Timeout(_) => self != Self::DontRetry,
                ExpectError::Transport(e) => match self {
                    Self::DontRetry => false,
                    Self::RetryTimeoutErrors | Self::RetryTimeoutAndServerErrors => {
                        e.is_timeout_or_temporary()
                    }
                    Self::RetryAllErrors => true,
                },
            },
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DontRetry => "dont_retry",
            Self::RetryTimeoutErrors => "retry_timeout_errors",
            Self::RetryTimeoutAndServerErrors => "retry_timeout_and_server_errors",
            Self::RetryAllErrors => "retry_all_errors",
        };
        f.write_str(name)
    }
}

impl FromStr for RetryPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "dont_retry" | "none" => Ok(Self::DontRetry),
            "retry_timeout_errors" | "timeout" => Ok(Self::RetryTimeoutErrors),
            "retry_timeout_and_server_errors" | "server" => Ok(Self::RetryTimeoutAndServerErrors),
            "retry_all_errors" | "all" => Ok(Self::RetryAllErrors),
            other => Err(ParsePolicyError::Retry(other.to_string())),
        }
    }
}

/// Exponential backoff bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    /// Create backoff bounds; `max_delay` is raised to `min_delay` if lower.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    /// Delay before retry number `retry` (0-based): `min_delay * 2^retry`, capped.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.min_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Which redirects are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RedirectPolicy {
    /// Return redirect responses as is.
    DontFollowRedirects,
    /// Follow every redirect, re-sending method and body verbatim.
    FollowAllRedirects,
    /// Follow only hops whose request has no body.
    #[default]
    FollowRedirectsWithoutBody,
}

/// What to do with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectAction {
    /// Treat the response as final.
    Stop,
    /// Send the next hop with this method, keeping or dropping the body.
    Follow {
        /// Method of the next hop.
        method: Method,
        /// Whether the body is re-sent.
        keep_body: bool,
    },
}

/// Returns true for the statuses that redirect.
pub fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

impl RedirectPolicy {
    /// Decide how to continue after a response with `status` to a request
    /// sent with `method` and, if `has_body`, a body.
    ///
    /// The `Location` header is not examined here.
    pub fn decide(self, status: StatusCode, method: &Method, has_body: bool) -> RedirectAction {
        if !is_redirect(status) {
            return RedirectAction::Stop;
        }
        match self {
            Self::DontFollowRedirects => RedirectAction::Stop,
            Self::FollowAllRedirects => RedirectAction::Follow {
                method: method.clone(),
                keep_body: true,
            },
            Self::FollowRedirectsWithoutBody => {
                if has_body {
                    return RedirectAction::Stop;
                }
                let keeps_method = matches!(
                    status,
                    StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
                );
                let method = if keeps_method || *method == Method::GET || *method == Method::HEAD
                {
                    method.clone()
                } else {
                    Method::GET
                };
                RedirectAction::Follow {
                    method,
                    keep_body: false,
                }
            }
        }
    }
}

impl fmt::Display for RedirectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DontFollowRedirects => "dont_follow_redirects",
            Self::FollowAllRedirects => "follow_all_redirects",
            Self::FollowRedirectsWithoutBody => "follow_redirects_without_body",
        };
        f.write_str(name)
    }
}

impl FromStr for RedirectPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "dont_follow_redirects" | "none" => Ok(Self::DontFollowRedirects),
            "follow_all_redirects" | "all" => Ok(Self::FollowAllRedirects),
            "follow_redirects_without_body" | "without_body" => {
                Ok(Self::FollowRedirectsWithoutBody)
            }
            other => Err(ParsePolicyError::Redirect(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    fn error(e: ExpectError) -> bool {
        RetryPolicy::RetryAllErrors.should_retry(Outcome::Error(&e))
    }

    #[test]
    fn test_dont_retry() {
        let policy = RetryPolicy::DontRetry;
        assert!(!policy.should_retry(Outcome::Status(StatusCode::SERVICE_UNAVAILABLE)));
        assert!(!policy.should_retry(Outcome::Error(&ExpectError::Timeout(
            Duration::from_secs(1)
        ))));
        assert!(!policy.should_retry(Outcome::Error(&TransportError::temporary("reset").into())));
    }

    #[test]
    fn test_retry_timeout_errors() {
        let policy = RetryPolicy::RetryTimeoutErrors;
        assert!(policy.should_retry(Outcome::Error(&ExpectError::Timeout(
            Duration::from_secs(1)
        ))));
        assert!(policy.should_retry(Outcome::Error(&TransportError::temporary("reset").into())));
        assert!(!policy.should_retry(Outcome::Error(&TransportError::other("tls").into())));
        assert!(!policy.should_retry(Outcome::Status(StatusCode::BAD_GATEWAY)));
    }

    #[test]
    fn test_retry_server_errors() {
        let policy = RetryPolicy::RetryTimeoutAndServerErrors;
        assert!(policy.should_retry(Outcome::Status(StatusCode::BAD_GATEWAY)));
        assert!(!policy.should_retry(Outcome::Status(StatusCode::NOT_FOUND)));
        assert!(!policy.should_retry(Outcome::Status(StatusCode::OK)));
    }

    #[test]
    fn test_retry_all_errors() {
        let policy = RetryPolicy::RetryAllErrors;
        assert!(policy.should_retry(Outcome::Status(StatusCode::NOT_FOUND)));
        assert!(policy.should_retry(Outcome::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        assert!(!policy.should_retry(Outcome::Status(StatusCode::CREATED)));
        assert!(!policy.should_retry(Outcome::Status(StatusCode::MOVED_PERMANENTLY)));
        assert!(error(TransportError::other("tls").into()));
    }

    #[test]
    fn test_cancellation_never_retried() {
        assert!(!error(ExpectError::Cancelled));
        assert!(!error(ExpectError::invalid_request("unbound")));
        assert!(!error(ExpectError::TooManyRedirects(3)));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(500));
        assert_eq!(backoff.delay(64), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_max_below_min() {
        let backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(backoff.max_delay, Duration::from_secs(2));
        assert_eq!(backoff.delay(5), Duration::from_secs(2));
    }

    #[test]
    fn test_dont_follow() {
        assert_eq!(
            RedirectPolicy::DontFollowRedirects.decide(StatusCode::FOUND, &Method::GET, false),
            RedirectAction::Stop
        );
    }

    #[test]
    fn test_follow_all_preserves_method_and_body() {
        for status in [
            StatusCode::MOVED_PERMANENTLY,
            StatusCode::FOUND,
            StatusCode::SEE_OTHER,
            StatusCode::TEMPORARY_REDIRECT,
            StatusCode::PERMANENT_REDIRECT,
        ] {
            assert_eq!(
                RedirectPolicy::FollowAllRedirects.decide(status, &Method::POST, true),
                RedirectAction::Follow {
                    method: Method::POST,
                    keep_body: true
                }
            );
        }
    }

    #[test]
    fn test_follow_without_body() {
        let policy = RedirectPolicy::FollowRedirectsWithoutBody;
        assert_eq!(
            policy.decide(StatusCode::MOVED_PERMANENTLY, &Method::POST, true),
            RedirectAction::Stop
        );
        assert_eq!(
            policy.decide(StatusCode::SEE_OTHER, &Method::POST, false),
            RedirectAction::Follow {
                method: Method::GET,
                keep_body: false
            }
        );
        assert_eq!(
            policy.decide(StatusCode::FOUND, &Method::HEAD, false),
            RedirectAction::Follow {
                method: Method::HEAD,
                keep_body: false
            }
        );
        assert_eq!(
            policy.decide(StatusCode::TEMPORARY_REDIRECT, &Method::DELETE, false),
            RedirectAction::Follow {
                method: Method::DELETE,
                keep_body: false
            }
        );
    }

    #[test]
    fn test_non_redirect_stops() {
        assert_eq!(
            RedirectPolicy::FollowAllRedirects.decide(StatusCode::OK, &Method::GET, false),
            RedirectAction::Stop
        );
        assert_eq!(
            RedirectPolicy::FollowAllRedirects.decide(
                StatusCode::NOT_MODIFIED,
                &Method::GET,
                false
            ),
            RedirectAction::Stop
        );
    }

    #[test]
    fn test_parse_policies() {
        assert_eq!(
            "retry-all-errors".parse::<RetryPolicy>(),
            Ok(RetryPolicy::RetryAllErrors)
        );
        assert_eq!("none".parse::<RetryPolicy>(), Ok(RetryPolicy::DontRetry));
        assert_eq!(
            "sometimes".parse::<RetryPolicy>(),
            Err(ParsePolicyError::Retry("sometimes".to_string()))
        );
        let err = "Sideways".parse::<RedirectPolicy>().unwrap_err();
        assert_eq!(err.to_string(), "unknown redirect policy: sideways");
        assert_eq!(
            "FOLLOW_ALL_REDIRECTS".parse::<RedirectPolicy>(),
            Ok(RedirectPolicy::FollowAllRedirects)
        );
        assert_eq!(
            RedirectPolicy::default().to_string(),
            "follow_redirects_without_body"
        );
    }
}
