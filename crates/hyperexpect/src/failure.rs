//! Structured failure data handed to the reporting pipeline.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value as JsonValue;

use crate::error::ExpectError;

/// What kind of expectation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FailureKind {
    /// The builder or an assertion was called with invalid arguments.
    InvalidRequest,
    /// The transport failed.
    Transport,
    /// The per-request deadline elapsed.
    Timeout,
    /// The request was cancelled.
    Cancelled,
    /// A body did not decode as the requested type.
    Decode,
    /// More redirects than allowed.
    TooManyRedirects,
    /// Value has the wrong type.
    Type,
    /// Value is null when it should not be.
    NotNull,
    /// Value is not null when it should be.
    Null,
    /// Value should be empty.
    Empty,
    /// Value should not be empty.
    NotEmpty,
    /// Values should be equal.
    Equal,
    /// Values should differ.
    NotEqual,
    /// Value should be less than the reference.
    Lt,
    /// Value should be less than or equal to the reference.
    Le,
    /// Value should be greater than the reference.
    Gt,
    /// Value should be greater than or equal to the reference.
    Ge,
    /// Value should be in range.
    InRange,
    /// Value should be out of range.
    NotInRange,
    /// Value should be within delta of the reference.
    InDelta,
    /// Value should be outside delta of the reference.
    NotInDelta,
    /// Value should belong to a list.
    InList,
    /// Value should not belong to a list.
    NotInList,
    /// Value should match a JSON schema.
    MatchSchema,
    /// Value should not match a JSON schema.
    NotMatchSchema,
    /// Value should match a regular expression.
    MatchRegex,
    /// Value should not match a regular expression.
    NotMatchRegex,
    /// Value should match a format (number, boolean, date).
    MatchFormat,
    /// Container should contain a key.
    ContainsKey,
    /// Container should not contain a key.
    NotContainsKey,
    /// Container should contain an element.
    ContainsElement,
    /// Container should not contain an element.
    NotContainsElement,
    /// Container should contain a subset.
    ContainsSubset,
    /// Container should not contain a subset.
    NotContainsSubset,
    /// Elements should be ordered.
    Ordered,
    /// Elements should not be ordered.
    NotOrdered,
}

impl FailureKind {
    /// Short human description of the expectation.
    pub fn describe(self) -> &'static str {
        match self {
            Self::InvalidRequest => "valid request or assertion arguments",
            Self::Transport => "successful round trip",
            Self::Timeout => "response before the deadline",
            Self::Cancelled => "request not cancelled",
            Self::Decode => "decodable body",
            Self::TooManyRedirects => "redirect count within the limit",
            Self::Type => "value of the given type",
            Self::NotNull => "non-null value",
            Self::Null => "null value",
            Self::Empty => "empty value",
            Self::NotEmpty => "non-empty value",
            Self::Equal => "values equal",
            Self::NotEqual => "values not equal",
            Self::Lt => "value less than reference",
            Self::Le => "value less than or equal to reference",
            Self::Gt => "value greater than reference",
            Self::Ge => "value greater than or equal to reference",
            Self::InRange => "value in range",
            Self::NotInRange => "value not in range",
            Self::InDelta => "value within delta of reference",
            Self::NotInDelta => "value not within delta of reference",
            Self::InList => "value equal to one of the list elements",
            Self::NotInList => "value not equal to any list element",
            Self::MatchSchema => "value matching schema",
            Self::NotMatchSchema => "value not matching schema",
            Self::MatchRegex => "value matching regex",
            Self::NotMatchRegex => "value not matching regex",
            Self::MatchFormat => "value matching format",
            Self::ContainsKey => "container containing key",
            Self::NotContainsKey => "container not containing key",
            Self::ContainsElement => "container containing element",
            Self::NotContainsElement => "container not containing element",
            Self::ContainsSubset => "container containing subset",
            Self::NotContainsSubset => "container not containing subset",
            Self::Ordered => "elements ordered",
            Self::NotOrdered => "elements not ordered",
        }
    }

    /// Map an execution error onto its failure kind.
    pub fn from_error(error: &ExpectError) -> Self {
        match error {
            ExpectError::InvalidRequest(_) => Self::InvalidRequest,
            ExpectError::Transport(_) => Self::Transport,
            ExpectError::Timeout(_) => Self::Timeout,
            ExpectError::Cancelled => Self::Cancelled,
            ExpectError::Decode { .. } => Self::Decode,
            ExpectError::TooManyRedirects(_) => Self::TooManyRedirects,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// The expected side of a failed comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// A single value.
    Value(JsonValue),
    /// Any of a list of values.
    List(Vec<JsonValue>),
    /// An inclusive range.
    Range {
        /// Lower bound.
        min: JsonValue,
        /// Upper bound.
        max: JsonValue,
    },
}

impl Expected {
    /// Render as JSON for formatting.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Value(v) => v.clone(),
            Self::List(items) => JsonValue::Array(items.clone()),
            Self::Range { min, max } => JsonValue::Array(vec![min.clone(), max.clone()]),
        }
    }
}

/// A failed expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionFailure {
    /// Failure kind.
    pub kind: FailureKind,
    /// Human-readable error lines.
    pub errors: Vec<String>,
    /// The value that was observed.
    pub actual: Option<JsonValue>,
    /// What was expected instead.
    pub expected: Option<Expected>,
    /// Reference value for comparisons (e.g. the center of a delta check).
    pub reference: Option<JsonValue>,
    /// Allowed numeric delta.
    pub delta: Option<f64>,
}

impl AssertionFailure {
    /// Create a failure of the given kind.
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            errors: Vec::new(),
            actual: None,
            expected: None,
            reference: None,
            delta: None,
        }
    }

    /// Create a failure from an execution error.
    pub fn from_error(error: &ExpectError) -> Self {
        Self::new(FailureKind::from_error(error)).error(error.to_string())
    }

    /// Add an error line.
    #[must_use]
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }

    /// Set the observed value.
    #[must_use]
    pub fn actual(mut self, actual: impl Into<JsonValue>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// Set a single expected value.
    #[must_use]
    pub fn expected(mut self, expected: impl Into<JsonValue>) -> Self {
        self.expected = Some(Expected::Value(expected.into()));
        self
    }

    /// Set an expected list.
    #[must_use]
    pub fn expected_list(mut self, expected: Vec<JsonValue>) -> Self {
        self.expected = Some(Expected::List(expected));
        self
    }

    /// Set an expected range.
    #[must_use]
    pub fn expected_range(mut self, min: impl Into<JsonValue>, max: impl Into<JsonValue>) -> Self {
        self.expected = Some(Expected::Range {
            min: min.into(),
            max: max.into(),
        });
        self
    }

    /// Set the reference value.
    #[must_use]
    pub fn reference(mut self, reference: impl Into<JsonValue>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Set the allowed delta.
    #[must_use]
    pub fn delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }
}

/// Snapshot of the request that produced an assertion's data.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Request method.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
}

/// Snapshot of the response under assertion.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
    /// Round-trip time of the final attempt.
    pub rtt: Option<Duration>,
}

/// Where a failure happened, passed alongside every [`AssertionFailure`].
#[derive(Debug, Clone)]
pub struct AssertionContext {
    /// Name of the test, if configured.
    pub test_name: Option<String>,
    /// Name of the request, if set with `with_name`.
    pub request_name: Option<String>,
    /// Full path of calls leading to the failing assertion.
    pub path: String,
    /// Path rendered from the nearest alias, if any.
    pub alias_path: Option<String>,
    /// Request snapshot, once the request was built.
    pub request: Option<RequestInfo>,
    /// Response snapshot, once a response was received.
    pub response: Option<ResponseInfo>,
}

impl AssertionContext {
    /// The path to show to humans: the alias path when set.
    pub fn display_path(&self) -> &str {
        self.alias_path.as_deref().unwrap_or(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_builder() {
        let failure = AssertionFailure::new(FailureKind::InRange)
            .actual(json!(12))
            .expected_range(1, 10)
            .error("expected: value is in range");

        assert_eq!(failure.kind, FailureKind::InRange);
        assert_eq!(failure.actual, Some(json!(12)));
        assert_eq!(
            failure.expected,
            Some(Expected::Range {
                min: json!(1),
                max: json!(10)
            })
        );
        assert_eq!(failure.errors.len(), 1);
    }

    #[test]
    fn test_kind_from_error() {
        assert_eq!(
            FailureKind::from_error(&ExpectError::Cancelled),
            FailureKind::Cancelled
        );
        assert_eq!(
            FailureKind::from_error(&ExpectError::Timeout(Duration::from_secs(1))),
            FailureKind::Timeout
        );
        assert_eq!(
            FailureKind::from_error(&ExpectError::TooManyRedirects(2)),
            FailureKind::TooManyRedirects
        );
    }

    #[test]
    fn test_expected_to_json() {
        assert_eq!(Expected::Value(json!("a")).to_json(), json!("a"));
        assert_eq!(
            Expected::List(vec![json!(1), json!(2)]).to_json(),
            json!([1, 2])
        );
        assert_eq!(
            Expected::Range {
                min: json!(1),
                max: json!(2)
            }
            .to_json(),
            json!([1, 2])
        );
    }

    #[test]
    fn test_display_path_prefers_alias() {
        let mut ctx = AssertionContext {
            test_name: None,
            request_name: None,
            path: "Request(\"GET\", \"/\").expect()".to_string(),
            alias_path: None,
            request: None,
            response: None,
        };
        assert_eq!(ctx.display_path(), "Request(\"GET\", \"/\").expect()");
        ctx.alias_path = Some("user.value(\"id\")".to_string());
        assert_eq!(ctx.display_path(), "user.value(\"id\")");
    }
}
