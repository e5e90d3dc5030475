use chrono::{NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value as JsonValue;

use super::{Boolean, DateTime, Match, Number};
use crate::chain::Chain;
use crate::failure::{AssertionFailure, FailureKind};

/// Assertions on a string.
///
/// # Example
///
/// ```rust,ignore
/// e.get("/greeting").expect().await
///     .text()
///     .not_empty()
///     .has_prefix("Hello")
///     .contains_fold("WORLD");
/// ```
#[derive(Debug, Clone)]
pub struct StringValue {
    chain: Chain,
    value: String,
}

impl StringValue {
    pub(crate) fn new(chain: Chain, value: String) -> Self {
        Self { chain, value }
    }

    /// The wrapped string.
    pub fn raw(&self) -> &str {
        &self.value
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    fn failure(&self, kind: FailureKind, message: &str) -> AssertionFailure {
        AssertionFailure::new(kind)
            .actual(self.value.as_str())
            .error(format!("expected: {message}"))
    }

    fn check_str(
        &self,
        method: &str,
        arg: &str,
        kind: FailureKind,
        message: &str,
        ok: impl FnOnce(&str) -> bool,
    ) -> &Self {
        self.chain.check(format!("{method}({arg:?})"), || {
            (!ok(&self.value)).then(|| self.failure(kind, message).expected(arg))
        });
        self
    }

    /// Length in characters.
    pub fn length(&self) -> Number {
        #[allow(clippy::cast_precision_loss)]
        Number::new(
            self.chain.child("length()"),
            self.value.chars().count() as f64,
        )
    }

    /// String is empty.
    pub fn is_empty(&self) -> &Self {
        self.chain.check("is_empty()", || {
            (!self.value.is_empty()).then(|| self.failure(FailureKind::Empty, "string is empty"))
        });
        self
    }

    /// String is not empty.
    pub fn not_empty(&self) -> &Self {
        self.chain.check("not_empty()", || {
            self.value
                .is_empty()
                .then(|| self.failure(FailureKind::NotEmpty, "string is not empty"))
        });
        self
    }

    /// String equals `expected`.
    pub fn is_equal(&self, expected: &str) -> &Self {
        self.check_str(
            "is_equal",
            expected,
            FailureKind::Equal,
            "strings are equal",
            |v| v == expected,
        )
    }

    /// String differs from `other`.
    pub fn not_equal(&self, other: &str) -> &Self {
        self.check_str(
            "not_equal",
            other,
            FailureKind::NotEqual,
            "strings are not equal",
            |v| v != other,
        )
    }

    /// String equals `expected`, ignoring case.
    pub fn is_equal_fold(&self, expected: &str) -> &Self {
        self.check_str(
            "is_equal_fold",
            expected,
            FailureKind::Equal,
            "strings are equal (case-insensitive)",
            |v| v.to_lowercase() == expected.to_lowercase(),
        )
    }

    /// String differs from `other`, ignoring case.
    pub fn not_equal_fold(&self, other: &str) -> &Self {
        self.check_str(
            "not_equal_fold",
            other,
            FailureKind::NotEqual,
            "strings are not equal (case-insensitive)",
            |v| v.to_lowercase() != other.to_lowercase(),
        )
    }

    /// String equals one of `values`.
    pub fn in_list(&self, values: &[&str]) -> &Self {
        let segment = format!("in_list({values:?})");
        if values.is_empty() {
            self.chain.fail_at(segment, empty_list());
            return self;
        }
        self.chain.check(segment, || {
            (!values.contains(&self.value.as_str())).then(|| {
                self.failure(FailureKind::InList, "string is equal to one of the values")
                    .expected_list(values.iter().map(|v| JsonValue::from(*v)).collect())
            })
        });
        self
    }

    /// String equals none of `values`.
    pub fn not_in_list(&self, values: &[&str]) -> &Self {
        let segment = format!("not_in_list({values:?})");
        if values.is_empty() {
            self.chain.fail_at(segment, empty_list());
            return self;
        }
        self.chain.check(segment, || {
            values.contains(&self.value.as_str()).then(|| {
                self.failure(
                    FailureKind::NotInList,
                    "string is not equal to any of the values",
                )
                .expected_list(values.iter().map(|v| JsonValue::from(*v)).collect())
            })
        });
        self
    }

    /// String contains `substring`.
    pub fn contains(&self, substring: &str) -> &Self {
        self.check_str(
            "contains",
            substring,
            FailureKind::ContainsSubset,
            "string contains sub-string",
            |v| v.contains(substring),
        )
    }

    /// String does not contain `substring`.
    pub fn not_contains(&self, substring: &str) -> &Self {
        self.check_str(
            "not_contains",
            substring,
            FailureKind::NotContainsSubset,
            "string does not contain sub-string",
            |v| !v.contains(substring),
        )
    }

    /// String contains `substring`, ignoring case.
    pub fn contains_fold(&self, substring: &str) -> &Self {
        self.check_str(
            "contains_fold",
            substring,
            FailureKind::ContainsSubset,
            "string contains sub-string (case-insensitive)",
            |v| v.to_lowercase().contains(&substring.to_lowercase()),
        )
    }

    /// String does not contain `substring`, ignoring case.
    pub fn not_contains_fold(&self, substring: &str) -> &Self {
        self.check_str(
            "not_contains_fold",
            substring,
            FailureKind::NotContainsSubset,
            "string does not contain sub-string (case-insensitive)",
            |v| !v.to_lowercase().contains(&substring.to_lowercase()),
        )
    }

    /// String starts with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> &Self {
        self.check_str(
            "has_prefix",
            prefix,
            FailureKind::ContainsSubset,
            "string has prefix",
            |v| v.starts_with(prefix),
        )
    }

    /// String does not start with `prefix`.
    pub fn not_has_prefix(&self, prefix: &str) -> &Self {
        self.check_str(
            "not_has_prefix",
            prefix,
            FailureKind::NotContainsSubset,
            "string does not have prefix",
            |v| !v.starts_with(prefix),
        )
    }

    /// String ends with `suffix`.
    pub fn has_suffix(&self, suffix: &str) -> &Self {
        self.check_str(
            "has_suffix",
            suffix,
            FailureKind::ContainsSubset,
            "string has suffix",
            |v| v.ends_with(suffix),
        )
    }

    /// String does not end with `suffix`.
    pub fn not_has_suffix(&self, suffix: &str) -> &Self {
        self.check_str(
            "not_has_suffix",
            suffix,
            FailureKind::NotContainsSubset,
            "string does not have suffix",
            |v| !v.ends_with(suffix),
        )
    }

    /// Match `pattern` and return the first match's capture groups.
    ///
    /// Fails if the pattern is invalid or does not match.
    pub fn matches(&self, pattern: &str) -> Match {
        let segment = format!("matches({pattern:?})");
        let chain = self.chain.child(segment.clone());
        if self.chain.is_failed() {
            return Match::new(chain, Vec::new(), Vec::new());
        }
        let regex = match compile(pattern) {
            Ok(regex) => regex,
            Err(failure) => {
                chain.fail(failure);
                return Match::new(chain, Vec::new(), Vec::new());
            }
        };
        match regex.captures(&self.value) {
            Some(caps) => {
                self.chain.pass_at(&segment);
                Match::from_captures(chain, &regex, &caps)
            }
            None => {
                chain.fail(
                    self.failure(FailureKind::MatchRegex, "string matches regular expression")
                        .expected(pattern),
                );
                Match::new(chain, Vec::new(), Vec::new())
            }
        }
    }

    /// Match `pattern` repeatedly and return every match.
    ///
    /// Fails if the pattern is invalid or does not match at all.
    pub fn match_all(&self, pattern: &str) -> Vec<Match> {
        let segment = format!("match_all({pattern:?})");
        if self.chain.is_failed() {
            return Vec::new();
        }
        let regex = match compile(pattern) {
            Ok(regex) => regex,
            Err(failure) => {
                self.chain.fail_at(segment, failure);
                return Vec::new();
            }
        };
        let matches: Vec<Match> = regex
            .captures_iter(&self.value)
            .enumerate()
            .map(|(i, caps)| {
                Match::from_captures(self.chain.child(format!("{segment}[{i}]")), &regex, &caps)
            })
            .collect();
        if matches.is_empty() {
            self.chain.fail_at(
                segment,
                self.failure(FailureKind::MatchRegex, "string matches regular expression")
                    .expected(pattern),
            );
        } else {
            self.chain.pass_at(segment);
        }
        matches
    }

    /// String does not match `pattern`.
    pub fn not_match(&self, pattern: &str) -> &Self {
        let segment = format!("not_match({pattern:?})");
        self.chain.check(segment, || match compile(pattern) {
            Ok(regex) => regex.is_match(&self.value).then(|| {
                self.failure(
                    FailureKind::NotMatchRegex,
                    "string does not match regular expression",
                )
                .expected(pattern)
            }),
            Err(failure) => Some(failure),
        });
        self
    }

    /// Parse the string as a number.
    pub fn as_number(&self) -> Number {
        let chain = self.chain.child("as_number()");
        match self.value.trim().parse::<f64>() {
            Ok(value) => Number::new(chain, value),
            Err(_) => {
                chain.fail(self.failure(FailureKind::MatchFormat, "string is a number"));
                Number::new(chain, 0.0)
            }
        }
    }

    /// Parse `"true"` or `"false"` as a boolean.
    pub fn as_boolean(&self) -> Boolean {
        let chain = self.chain.child("as_boolean()");
        match self.value.as_str() {
            "true" => Boolean::new(chain, true),
            "false" => Boolean::new(chain, false),
            _ => {
                chain.fail(self.failure(
                    FailureKind::MatchFormat,
                    "string is \"true\" or \"false\"",
                ));
                Boolean::new(chain, false)
            }
        }
    }

    /// Parse the string as RFC 3339, or failing that, as an RFC 2822 / HTTP date.
    pub fn as_datetime(&self) -> DateTime {
        let chain = self.chain.child("as_datetime()");
        let parsed = chrono::DateTime::parse_from_rfc3339(&self.value)
            .or_else(|_| chrono::DateTime::parse_from_rfc2822(&self.value))
            .map(|t| t.with_timezone(&Utc));
        match parsed {
            Ok(value) => DateTime::new(chain, value),
            Err(e) => {
                chain.fail(
                    self.failure(FailureKind::MatchFormat, "string is an RFC 3339 or RFC 2822 date")
                        .error(e.to_string()),
                );
                DateTime::new(chain, chrono::DateTime::<Utc>::UNIX_EPOCH)
            }
        }
    }

    /// Parse the string with a `chrono` format string.
    ///
    /// Formats without a time zone are read as UTC.
    pub fn as_datetime_format(&self, format: &str) -> DateTime {
        let chain = self.chain.child(format!("as_datetime_format({format:?})"));
        let parsed = chrono::DateTime::parse_from_str(&self.value, format)
            .map(|t| t.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(&self.value, format).map(|t| Utc.from_utc_datetime(&t))
            });
        match parsed {
            Ok(value) => DateTime::new(chain, value),
            Err(e) => {
                chain.fail(
                    self.failure(FailureKind::MatchFormat, "string matches the date format")
                        .expected(format)
                        .error(e.to_string()),
                );
                DateTime::new(chain, chrono::DateTime::<Utc>::UNIX_EPOCH)
            }
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, AssertionFailure> {
    Regex::new(pattern).map_err(|e| {
        AssertionFailure::new(FailureKind::InvalidRequest)
            .error(format!("invalid regular expression: {e}"))
    })
}

fn empty_list() -> AssertionFailure {
    AssertionFailure::new(FailureKind::InvalidRequest).error("unexpected empty list argument")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::chain;
    use crate::reporter::CollectReporter;

    fn string(value: &str) -> (StringValue, CollectReporter) {
        let (chain, reporter) = chain("String()");
        (StringValue::new(chain, value.to_string()), reporter)
    }

    #[test]
    fn test_equality_and_fold() {
        let (s, reporter) = string("Hello World");
        s.is_equal("Hello World")
            .not_equal("hello world")
            .is_equal_fold("HELLO world")
            .contains("World")
            .contains_fold("WORLD")
            .not_contains("bye")
            .has_prefix("Hello")
            .has_suffix("World")
            .in_list(&["a", "Hello World"])
            .not_empty();
        s.length().is_equal(11);
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_failure_reports_path() {
        let (s, reporter) = string("abc");
        s.has_prefix("x");
        assert_eq!(reporter.len(), 1);
        assert!(reporter.messages()[0].contains("String().has_prefix(\"x\")"));
    }

    #[test]
    fn test_matches() {
        let (s, reporter) = string("order-17 order-18");
        s.matches(r"order-(\d+)").index(1).is_equal("17");
        let all = s.match_all(r"order-(\d+)");
        assert_eq!(all.len(), 2);
        all[1].index(1).is_equal("18");
        s.not_match(r"^\d+$");
        assert!(reporter.is_empty());

        let m = s.matches(r"^invoice");
        m.index(1).is_equal("x");
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn test_invalid_regex() {
        let (s, reporter) = string("abc");
        s.not_match("(");
        assert_eq!(reporter.len(), 1);
        assert!(reporter.messages()[0].contains("invalid regular expression"));
    }

    #[test]
    fn test_conversions() {
        let (s, reporter) = string("42.5");
        s.as_number().is_equal(42.5);
        let (b, _) = string("true");
        b.as_boolean().is_true();
        let (d, _) = string("2024-05-01T12:00:00Z");
        assert_eq!(d.as_datetime().raw().to_rfc3339(), "2024-05-01T12:00:00+00:00");
        let (h, _) = string("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(h.as_datetime().raw().timestamp(), 1_445_412_480);
        let (f, _) = string("2024-05-01 12:00");
        assert_eq!(
            f.as_datetime_format("%Y-%m-%d %H:%M").raw().to_rfc3339(),
            "2024-05-01T12:00:00+00:00"
        );
        assert!(reporter.is_empty());

        let (bad, reporter) = string("soon");
        bad.as_number().is_equal(1);
        bad.as_datetime();
        assert_eq!(reporter.len(), 2);
    }
}
