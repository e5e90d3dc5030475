use chrono::Utc;
use serde_json::Value as JsonValue;

use crate::chain::Chain;
use crate::failure::{AssertionFailure, FailureKind};

type Timestamp = chrono::DateTime<Utc>;

fn render(t: Timestamp) -> JsonValue {
    JsonValue::String(t.to_rfc3339())
}

/// Assertions on a point in time.
#[derive(Debug, Clone)]
pub struct DateTime {
    chain: Chain,
    value: Timestamp,
}

impl DateTime {
    pub(crate) fn new(chain: Chain, value: Timestamp) -> Self {
        Self { chain, value }
    }

    /// The wrapped timestamp.
    pub fn raw(&self) -> Timestamp {
        self.value
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    fn compare(
        &self,
        method: &str,
        other: Timestamp,
        kind: FailureKind,
        message: &str,
        ok: bool,
    ) -> &Self {
        self.chain
            .check(format!("{method}({})", other.to_rfc3339()), || {
                (!ok).then(|| {
                    AssertionFailure::new(kind)
                        .actual(render(self.value))
                        .expected(render(other))
                        .error(format!("expected: {message}"))
                })
            });
        self
    }

    /// Same instant as `expected`.
    pub fn is_equal(&self, expected: Timestamp) -> &Self {
        self.compare(
            "is_equal",
            expected,
            FailureKind::Equal,
            "times are equal",
            self.value == expected,
        )
    }

    /// Different instant than `other`.
    pub fn not_equal(&self, other: Timestamp) -> &Self {
        self.compare(
            "not_equal",
            other,
            FailureKind::NotEqual,
            "times are not equal",
            self.value != other,
        )
    }

    /// Later than `other`.
    pub fn gt(&self, other: Timestamp) -> &Self {
        self.compare(
            "gt",
            other,
            FailureKind::Gt,
            "time is after reference",
            self.value > other,
        )
    }

    /// Not earlier than `other`.
    pub fn ge(&self, other: Timestamp) -> &Self {
        self.compare(
            "ge",
            other,
            FailureKind::Ge,
            "time is after or equal to reference",
            self.value >= other,
        )
    }

    /// Earlier than `other`.
    pub fn lt(&self, other: Timestamp) -> &Self {
        self.compare(
            "lt",
            other,
            FailureKind::Lt,
            "time is before reference",
            self.value < other,
        )
    }

    /// Not later than `other`.
    pub fn le(&self, other: Timestamp) -> &Self {
        self.compare(
            "le",
            other,
            FailureKind::Le,
            "time is before or equal to reference",
            self.value <= other,
        )
    }

    /// `min <= time <= max`.
    pub fn in_range(&self, min: Timestamp, max: Timestamp) -> &Self {
        self.chain.check(
            format!("in_range({}, {})", min.to_rfc3339(), max.to_rfc3339()),
            || {
                (!(min..=max).contains(&self.value)).then(|| {
                    AssertionFailure::new(FailureKind::InRange)
                        .actual(render(self.value))
                        .expected_range(render(min), render(max))
                        .error("expected: time is in range")
                })
            },
        );
        self
    }

    /// Time is outside `min..=max`.
    pub fn not_in_range(&self, min: Timestamp, max: Timestamp) -> &Self {
        self.chain.check(
            format!("not_in_range({}, {})", min.to_rfc3339(), max.to_rfc3339()),
            || {
                (min..=max).contains(&self.value).then(|| {
                    AssertionFailure::new(FailureKind::NotInRange)
                        .actual(render(self.value))
                        .expected_range(render(min), render(max))
                        .error("expected: time is not in range")
                })
            },
        );
        self
    }
}
