//! Session configuration.
//!
//! A [`Config`] describes everything an [`Expect`](crate::Expect) session
//! shares between its requests: where requests go, how they are sent, how
//! failures are reported, and the per-request defaults that
//! `Request::with_*` calls override.
//!
//! # Example
//!
//! ```rust,ignore
//! use hyperexpect::{Config, Expect, NetworkClient, RetryPolicy};
//!
//! let config = Config::new("http://127.0.0.1:8080")
//!     .test_name("create_user")
//!     .client(NetworkClient::new()?)
//!     .retry_policy(RetryPolicy::RetryAllErrors)
//!     .max_retries(2)
//!     .with_env_overrides()?;
//!
//! let e = Expect::new(config);
//! ```
//!
//! # Environment Variables
//!
//! [`Config::with_env_overrides`] layers these over the configured values:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `HYPEREXPECT_BASE_URL` | base URL |
//! | `HYPEREXPECT_TIMEOUT_MS` | per-request timeout in milliseconds |
//! | `HYPEREXPECT_MAX_RETRIES` | retry budget per hop |
//! | `HYPEREXPECT_RETRY_POLICY` | e.g. `retry_all_errors` |
//! | `HYPEREXPECT_REDIRECT_POLICY` | e.g. `follow_all_redirects` |

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cancel::CancelToken;
use crate::cookie::CookieJar;
use crate::environment::Environment;
use crate::policy::{Backoff, RedirectPolicy, RetryPolicy};
use crate::printer::Printer;
use crate::reporter::{
    AssertionHandler, DefaultAssertionHandler, DefaultFormatter, Formatter, Logger, PanicReporter,
    Reporter,
};
use crate::transport::Client;
use crate::websocket::Dialer;

/// Prefix of every environment variable read by [`Config::with_env_overrides`].
pub const ENV_PREFIX: &str = "HYPEREXPECT_";

/// Errors raised while building a [`Config`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },
}

impl ConfigError {
    /// Create an environment parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

/// Execution settings applied to every request unless overridden.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestDefaults {
    /// Deadline for each attempt (default: none).
    pub timeout: Option<Duration>,
    /// Retry policy (default: retry timeouts and 5xx).
    pub retry_policy: RetryPolicy,
    /// Retries per hop (default: 0).
    pub max_retries: u32,
    /// Backoff bounds (default: 50ms to 5s).
    pub backoff: Backoff,
    /// Redirect policy (default: follow body-less hops).
    pub redirect_policy: RedirectPolicy,
    /// Maximum followed redirects (default: unlimited).
    pub max_redirects: Option<usize>,
    /// WebSocket read timeout (default: none).
    pub websocket_read_timeout: Option<Duration>,
    /// WebSocket write timeout (default: none).
    pub websocket_write_timeout: Option<Duration>,
}

/// Configuration of an [`Expect`](crate::Expect) session.
#[derive(Clone)]
pub struct Config {
    pub(crate) base_url: String,
    pub(crate) test_name: Option<String>,
    pub(crate) client: Option<Arc<dyn Client>>,
    pub(crate) dialer: Option<Arc<dyn Dialer>>,
    pub(crate) reporter: Arc<dyn Reporter>,
    pub(crate) formatter: Arc<dyn Formatter>,
    pub(crate) logger: Option<Arc<dyn Logger>>,
    pub(crate) handler: Option<Arc<dyn AssertionHandler>>,
    pub(crate) printers: Vec<Arc<dyn Printer>>,
    pub(crate) environment: Option<Environment>,
    pub(crate) cookie_jar: Option<CookieJar>,
    pub(crate) cancel: Option<CancelToken>,
    pub(crate) defaults: RequestDefaults,
}

impl Config {
    /// Create a configuration sending requests relative to `base_url`.
    ///
    /// Failures panic through [`PanicReporter`] until another reporter is set.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            test_name: None,
            client: None,
            dialer: None,
            reporter: Arc::new(PanicReporter),
            formatter: Arc::new(DefaultFormatter::default()),
            logger: None,
            handler: None,
            printers: Vec::new(),
            environment: None,
            cookie_jar: None,
            cancel: None,
            defaults: RequestDefaults::default(),
        }
    }

    /// Base URL prepended to request paths.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-request defaults.
    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Name shown in every failure report.
    #[must_use]
    pub fn test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = Some(name.into());
        self
    }

    /// Transport for plain HTTP requests.
    #[must_use]
    pub fn client(mut self, client: impl Client + 'static) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// Dialer for WebSocket upgrades.
    #[must_use]
    pub fn dialer(mut self, dialer: impl Dialer + 'static) -> Self {
        self.dialer = Some(Arc::new(dialer));
        self
    }

    /// Destination of formatted failures.
    #[must_use]
    pub fn reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Renderer of failures and successes.
    #[must_use]
    pub fn formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    /// Destination of successful assertions.
    #[must_use]
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Replace the whole reporting pipeline.
    ///
    /// The reporter, formatter, and logger settings are ignored once a
    /// handler is set.
    #[must_use]
    pub fn assertion_handler(mut self, handler: impl AssertionHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Add a printer.
    #[must_use]
    pub fn printer(mut self, printer: impl Printer + 'static) -> Self {
        self.printers.push(Arc::new(printer));
        self
    }

    /// Share `environment` with this session.
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Store and send cookies through `jar`.
    #[must_use]
    pub fn cookie_jar(mut self, jar: CookieJar) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Cancel every request of the session through `token`.
    #[must_use]
    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Replace every per-request default.
    #[must_use]
    pub fn request_defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.defaults.retry_policy = policy;
        self
    }

    /// Set the retry budget per hop.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.defaults.max_retries = retries;
        self
    }

    /// Set the backoff bounds.
    #[must_use]
    pub fn retry_delay(mut self, min: Duration, max: Duration) -> Self {
        self.defaults.backoff = Backoff::new(min, max);
        self
    }

    /// Set the redirect policy.
    #[must_use]
    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.defaults.redirect_policy = policy;
        self
    }

    /// Bound the number of followed redirects.
    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.defaults.max_redirects = Some(max);
        self
    }

    /// Set the WebSocket read timeout.
    #[must_use]
    pub fn websocket_read_timeout(mut self, timeout: Duration) -> Self {
        self.defaults.websocket_read_timeout = Some(timeout);
        self
    }

    /// Set the WebSocket write timeout.
    #[must_use]
    pub fn websocket_write_timeout(mut self, timeout: Duration) -> Self {
        self.defaults.websocket_write_timeout = Some(timeout);
        self
    }

    /// Layer `HYPEREXPECT_*` environment variables over this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvParseError`] for a variable with an
    /// unusable value.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .collect();
        self.with_overrides(vars)
    }

    pub(crate) fn with_overrides(
        mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        for (key, value) in vars {
            self.apply_env_var(&key, &value)?;
        }
        Ok(self)
    }

    fn apply_env_var(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            return Ok(());
        };
        match name {
            "BASE_URL" => {
                url::Url::parse(value)
                    .map_err(|e| ConfigError::env_parse_error(key, format!("expected URL: {e}")))?;
                self.base_url = value.to_string();
            }
            "TIMEOUT_MS" => {
                let millis: u64 = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
                self.defaults.timeout = Some(Duration::from_millis(millis));
            }
            "MAX_RETRIES" => {
                self.defaults.max_retries = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            "RETRY_POLICY" => {
                self.defaults.retry_policy = value
                    .parse::<RetryPolicy>()
                    .map_err(|e| ConfigError::env_parse_error(key, e.to_string()))?;
            }
            "REDIRECT_POLICY" => {
                self.defaults.redirect_policy = value
                    .parse::<RedirectPolicy>()
                    .map_err(|e| ConfigError::env_parse_error(key, e.to_string()))?;
            }
            other => tracing::debug!(var = %other, "ignoring unknown environment variable"),
        }
        Ok(())
    }

    pub(crate) fn assertion_handler_or_default(&self) -> Arc<dyn AssertionHandler> {
        if let Some(handler) = &self.handler {
            return Arc::clone(handler);
        }
        let mut handler = DefaultAssertionHandler::new(Arc::clone(&self.reporter))
            .with_formatter(Arc::clone(&self.formatter));
        if let Some(logger) = &self.logger {
            handler = handler.with_logger(Arc::clone(logger));
        }
        Arc::new(handler)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("test_name", &self.test_name)
            .field("has_client", &self.client.is_some())
            .field("has_dialer", &self.dialer.is_some())
            .field("printers", &self.printers.len())
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::new("http://localhost");
        let defaults = config.defaults();
        assert_eq!(defaults.retry_policy, RetryPolicy::RetryTimeoutAndServerErrors);
        assert_eq!(defaults.max_retries, 0);
        assert_eq!(defaults.backoff, Backoff::default());
        assert_eq!(
            defaults.redirect_policy,
            RedirectPolicy::FollowRedirectsWithoutBody
        );
        assert_eq!(defaults.max_redirects, None);
        assert_eq!(defaults.timeout, None);
    }

    #[test]
    fn test_builder_methods() {
        let config = Config::new("http://localhost")
            .timeout(Duration::from_secs(2))
            .max_retries(3)
            .retry_delay(Duration::from_millis(10), Duration::from_millis(5))
            .max_redirects(4)
            .websocket_read_timeout(Duration::from_secs(1));
        assert_eq!(config.defaults.timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.defaults.max_retries, 3);
        assert_eq!(config.defaults.backoff.max_delay, Duration::from_millis(10));
        assert_eq!(config.defaults.max_redirects, Some(4));
        assert_eq!(
            config.defaults.websocket_read_timeout,
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::new("http://localhost")
            .with_overrides(vars(&[
                ("HYPEREXPECT_BASE_URL", "http://127.0.0.1:9000"),
                ("HYPEREXPECT_TIMEOUT_MS", "250"),
                ("HYPEREXPECT_MAX_RETRIES", "2"),
                ("HYPEREXPECT_RETRY_POLICY", "retry_all_errors"),
                ("HYPEREXPECT_REDIRECT_POLICY", "dont_follow_redirects"),
            ]))
            .unwrap();
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
        assert_eq!(config.defaults.timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.defaults.max_retries, 2);
        assert_eq!(config.defaults.retry_policy, RetryPolicy::RetryAllErrors);
        assert_eq!(
            config.defaults.redirect_policy,
            RedirectPolicy::DontFollowRedirects
        );
    }

    #[test]
    fn test_env_override_errors() {
        let err = Config::new("http://localhost")
            .with_overrides(vars(&[("HYPEREXPECT_MAX_RETRIES", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("HYPEREXPECT_MAX_RETRIES"));

        let err = Config::new("http://localhost")
            .with_overrides(vars(&[("HYPEREXPECT_RETRY_POLICY", "sometimes")]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown retry policy"));

        assert!(Config::new("http://localhost")
            .with_overrides(vars(&[("HYPEREXPECT_BASE_URL", "not a url")]))
            .is_err());
    }
}
