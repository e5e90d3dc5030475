use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::chain::Chain;
use crate::failure::{AssertionFailure, FailureKind};

fn render(d: Duration) -> JsonValue {
    JsonValue::String(format!("{d:?}"))
}

/// Assertions on a duration, such as a round-trip time or cookie max age.
#[derive(Debug, Clone)]
pub struct DurationValue {
    chain: Chain,
    value: Option<Duration>,
}

impl DurationValue {
    /// `None` represents a missing duration; every assertion on it fails.
    pub(crate) fn new(chain: Chain, value: Option<Duration>) -> Self {
        Self { chain, value }
    }

    /// The wrapped duration.
    pub fn raw(&self) -> Option<Duration> {
        self.value
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    fn compare(
        &self,
        segment: String,
        kind: FailureKind,
        message: &str,
        reference: Duration,
        ok: impl FnOnce(Duration) -> bool,
    ) {
        self.chain.check(segment, || match self.value {
            None => Some(
                AssertionFailure::new(FailureKind::NotNull)
                    .error("expected: duration is present"),
            ),
            Some(value) => (!ok(value)).then(|| {
                AssertionFailure::new(kind)
                    .actual(render(value))
                    .expected(render(reference))
                    .error(format!("expected: {message}"))
            }),
        });
    }

    /// Duration is present.
    pub fn is_set(&self) -> &Self {
        self.chain.check("is_set()", || {
            self.value.is_none().then(|| {
                AssertionFailure::new(FailureKind::NotNull).error("expected: duration is present")
            })
        });
        self
    }

    /// Duration is absent.
    pub fn not_set(&self) -> &Self {
        self.chain.check("not_set()", || {
            self.value.map(|value| {
                AssertionFailure::new(FailureKind::Null)
                    .actual(render(value))
                    .error("expected: duration is absent")
            })
        });
        self
    }

    /// Duration equals `expected`.
    pub fn is_equal(&self, expected: Duration) -> &Self {
        self.compare(
            format!("is_equal({expected:?})"),
            FailureKind::Equal,
            "durations are equal",
            expected,
            |v| v == expected,
        );
        self
    }

    /// Duration differs from `other`.
    pub fn not_equal(&self, other: Duration) -> &Self {
        self.compare(
            format!("not_equal({other:?})"),
            FailureKind::NotEqual,
            "durations are not equal",
            other,
            |v| v != other,
        );
        self
    }

    /// Duration is longer than `other`.
    pub fn gt(&self, other: Duration) -> &Self {
        self.compare(
            format!("gt({other:?})"),
            FailureKind::Gt,
            "duration is greater than reference",
            other,
            |v| v > other,
        );
        self
    }

    /// Duration is at least `other`.
    pub fn ge(&self, other: Duration) -> &Self {
        self.compare(
            format!("ge({other:?})"),
            FailureKind::Ge,
            "duration is greater than or equal to reference",
            other,
            |v| v >= other,
        );
        self
    }

    /// Duration is shorter than `other`.
    pub fn lt(&self, other: Duration) -> &Self {
        self.compare(
            format!("lt({other:?})"),
            FailureKind::Lt,
            "duration is less than reference",
            other,
            |v| v < other,
        );
        self
    }

    /// Duration is at most `other`.
    pub fn le(&self, other: Duration) -> &Self {
        self.compare(
            format!("le({other:?})"),
            FailureKind::Le,
            "duration is less than or equal to reference",
            other,
            |v| v <= other,
        );
        self
    }

    /// `min <= duration <= max`.
    pub fn in_range(&self, min: Duration, max: Duration) -> &Self {
        self.chain
            .check(format!("in_range({min:?}, {max:?})"), || match self.value {
                None => Some(
                    AssertionFailure::new(FailureKind::NotNull)
                        .error("expected: duration is present"),
                ),
                Some(value) => (!(min..=max).contains(&value)).then(|| {
                    AssertionFailure::new(FailureKind::InRange)
                        .actual(render(value))
                        .expected_range(render(min), render(max))
                        .error("expected: duration is in range")
                }),
            });
        self
    }

    /// Duration is outside `min..=max`.
    pub fn not_in_range(&self, min: Duration, max: Duration) -> &Self {
        self.chain
            .check(format!("not_in_range({min:?}, {max:?})"), || {
                match self.value {
                    None => Some(
                        AssertionFailure::new(FailureKind::NotNull)
                            .error("expected: duration is present"),
                    ),
                    Some(value) => (min..=max).contains(&value).then(|| {
                        AssertionFailure::new(FailureKind::NotInRange)
                            .actual(render(value))
                            .expected_range(render(min), render(max))
                            .error("expected: duration is not in range")
                    }),
                }
            });
        self
    }
}
