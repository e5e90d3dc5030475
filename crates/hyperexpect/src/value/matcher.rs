use serde_json::Value as JsonValue;

use super::{Number, StringValue};
use crate::chain::Chain;
use crate::failure::{AssertionFailure, FailureKind};

/// Capture groups of one regular expression match.
///
/// Index 0 is the whole match. Groups that did not participate are `None`.
///
/// # Example
///
/// ```rust,ignore
/// let m = e.string("user-42").matches(r"(?P<kind>\w+)-(\d+)");
/// m.index(2).is_equal("42");
/// m.name("kind").is_equal("user");
/// m.values(&["user", "42"]);
/// ```
#[derive(Debug, Clone)]
pub struct Match {
    chain: Chain,
    captures: Vec<Option<String>>,
    names: Vec<Option<String>>,
}

impl Match {
    pub(crate) fn new(chain: Chain, captures: Vec<Option<String>>, names: Vec<Option<String>>) -> Self {
        Self {
            chain,
            captures,
            names,
        }
    }

    pub(crate) fn from_captures(chain: Chain, regex: &regex::Regex, caps: &regex::Captures<'_>) -> Self {
        let captures = caps
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()))
            .collect();
        let names = regex
            .capture_names()
            .map(|name| name.map(str::to_string))
            .collect();
        Self::new(chain, captures, names)
    }

    /// All capture groups, the whole match first.
    pub fn raw(&self) -> &[Option<String>] {
        &self.captures
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    fn to_json(&self) -> JsonValue {
        JsonValue::Array(
            self.captures
                .iter()
                .map(|c| c.clone().map_or(JsonValue::Null, JsonValue::String))
                .collect(),
        )
    }

    /// Number of groups, including the whole match.
    pub fn length(&self) -> Number {
        #[allow(clippy::cast_precision_loss)]
        Number::new(self.chain.child("length()"), self.captures.len() as f64)
    }

    /// There are no groups (the match failed).
    pub fn is_empty(&self) -> &Self {
        self.chain.check("is_empty()", || {
            (!self.captures.is_empty()).then(|| {
                AssertionFailure::new(FailureKind::Empty)
                    .actual(self.to_json())
                    .error("expected: match is empty")
            })
        });
        self
    }

    /// There is at least one group.
    pub fn not_empty(&self) -> &Self {
        self.chain.check("not_empty()", || {
            self.captures.is_empty().then(|| {
                AssertionFailure::new(FailureKind::NotEmpty).error("expected: match is not empty")
            })
        });
        self
    }

    /// Group number `index`.
    ///
    /// An out-of-range index, or a group that did not participate, fails.
    pub fn index(&self, index: usize) -> StringValue {
        let chain = self.chain.child(format!("index({index})"));
        match self.captures.get(index) {
            Some(Some(value)) => StringValue::new(chain, value.clone()),
            _ => {
                chain.fail(
                    AssertionFailure::new(FailureKind::InRange)
                        .actual(self.to_json())
                        .expected_range(0, self.captures.len().saturating_sub(1))
                        .error(format!("expected: capture group {index} is present")),
                );
                StringValue::new(chain, String::new())
            }
        }
    }

    /// Named group `name`.
    pub fn name(&self, name: &str) -> StringValue {
        let chain = self.chain.child(format!("name({name:?})"));
        let position = self
            .names
            .iter()
            .position(|n| n.as_deref() == Some(name));
        match position.and_then(|i| self.captures.get(i)) {
            Some(Some(value)) => StringValue::new(chain, value.clone()),
            _ => {
                chain.fail(
                    AssertionFailure::new(FailureKind::ContainsKey)
                        .actual(self.to_json())
                        .expected(name)
                        .error(format!("expected: named capture group {name:?} is present")),
                );
                StringValue::new(chain, String::new())
            }
        }
    }

    fn submatches(&self) -> Vec<JsonValue> {
        self.to_json()
            .as_array()
            .map(|groups| groups.iter().skip(1).cloned().collect())
            .unwrap_or_default()
    }

    /// The groups after the whole match equal `values`, in order.
    pub fn values(&self, values: &[&str]) -> &Self {
        self.chain.check(format!("values({values:?})"), || {
            let expected: Vec<JsonValue> = values.iter().map(|v| JsonValue::from(*v)).collect();
            let actual = self.submatches();
            (actual != expected).then(|| {
                AssertionFailure::new(FailureKind::Equal)
                    .actual(actual)
                    .expected(expected)
                    .error("expected: capture groups are equal")
            })
        });
        self
    }

    /// The groups after the whole match differ from `values`.
    pub fn not_values(&self, values: &[&str]) -> &Self {
        self.chain.check(format!("not_values({values:?})"), || {
            let expected: Vec<JsonValue> = values.iter().map(|v| JsonValue::from(*v)).collect();
            let actual = self.submatches();
            (actual == expected).then(|| {
                AssertionFailure::new(FailureKind::NotEqual)
                    .actual(actual)
                    .expected(expected)
                    .error("expected: capture groups are not equal")
            })
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::chain;

    fn matcher(pattern: &str, text: &str) -> (Match, crate::reporter::CollectReporter) {
        let (chain, reporter) = chain("Match()");
        let regex = regex::Regex::new(pattern).unwrap();
        let caps = regex.captures(text).unwrap();
        (Match::from_captures(chain, &regex, &caps), reporter)
    }

    #[test]
    fn test_indexed_and_named_groups() {
        let (m, reporter) = matcher(r"(?P<kind>\w+)-(\d+)", "user-42");
        m.not_empty().values(&["user", "42"]);
        m.index(0).is_equal("user-42");
        m.index(2).is_equal("42");
        m.name("kind").is_equal("user");
        m.length().is_equal(3);
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_missing_group_fails_once() {
        let (m, reporter) = matcher(r"(\d+)", "42");
        let missing = m.index(5);
        missing.is_equal("x");
        m.name("nope");
        assert_eq!(reporter.len(), 2);
        assert!(reporter.messages()[0].contains("Match().index(5)"));
    }
}
