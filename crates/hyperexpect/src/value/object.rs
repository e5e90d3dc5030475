use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::{json_contains_subset, json_eq, segment, Array, Value};
use crate::chain::Chain;
use crate::failure::{AssertionFailure, FailureKind};

/// Assertions on a JSON object.
#[derive(Debug, Clone)]
pub struct Object {
    chain: Chain,
    value: Map<String, JsonValue>,
}

impl Object {
    pub(crate) fn new(chain: Chain, value: Map<String, JsonValue>) -> Self {
        Self { chain, value }
    }

    /// The wrapped map.
    pub fn raw(&self) -> &Map<String, JsonValue> {
        &self.value
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    fn json(&self) -> JsonValue {
        JsonValue::Object(self.value.clone())
    }

    /// Deserialize into `T`; reports [`FailureKind::Decode`] on mismatch.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        Value::new(self.chain.clone(), self.json()).decode()
    }

    /// Object has no keys.
    pub fn is_empty(&self) -> &Self {
        self.chain.check("is_empty()", || {
            (!self.value.is_empty()).then(|| {
                AssertionFailure::new(FailureKind::Empty)
                    .actual(self.json())
                    .error("expected: object is empty")
            })
        });
        self
    }

    /// Object has at least one key.
    pub fn not_empty(&self) -> &Self {
        self.chain.check("not_empty()", || {
            self.value.is_empty().then(|| {
                AssertionFailure::new(FailureKind::NotEmpty).error("expected: object is not empty")
            })
        });
        self
    }

    /// Object equals `expected`; numbers compare as `f64`.
    pub fn is_equal(&self, expected: impl Serialize) -> &Self {
        self.chain.check_arg("is_equal", expected, |expected| {
            (!json_eq(&self.json(), &expected)).then(|| {
                AssertionFailure::new(FailureKind::Equal)
                    .actual(self.json())
                    .expected(expected)
                    .error("expected: objects are equal")
            })
        });
        self
    }

    /// Object differs from `other`.
    pub fn not_equal(&self, other: impl Serialize) -> &Self {
        self.chain.check_arg("not_equal", other, |other| {
            json_eq(&self.json(), &other).then(|| {
                AssertionFailure::new(FailureKind::NotEqual)
                    .actual(self.json())
                    .expected(other)
                    .error("expected: objects are not equal")
            })
        });
        self
    }

    /// Object equals one of `values`.
    pub fn in_list<T: Serialize>(&self, values: &[T]) -> &Self {
        self.chain.check_arg("in_list", values, |list| {
            let items = list.as_array().cloned().unwrap_or_default();
            if items.is_empty() {
                return Some(empty_list());
            }
            let actual = self.json();
            (!items.iter().any(|item| json_eq(&actual, item))).then(|| {
                AssertionFailure::new(FailureKind::InList)
                    .actual(actual)
                    .expected_list(items)
                    .error("expected: object is equal to one of the values")
            })
        });
        self
    }

    /// Object equals none of `values`.
    pub fn not_in_list<T: Serialize>(&self, values: &[T]) -> &Self {
        self.chain.check_arg("not_in_list", values, |list| {
            let items = list.as_array().cloned().unwrap_or_default();
            if items.is_empty() {
                return Some(empty_list());
            }
            let actual = self.json();
            items.iter().any(|item| json_eq(&actual, item)).then(|| {
                AssertionFailure::new(FailureKind::NotInList)
                    .actual(actual)
                    .expected_list(items)
                    .error("expected: object is not equal to any of the values")
            })
        });
        self
    }

    /// Keys, in map order.
    pub fn keys(&self) -> Array {
        Array::new(
            self.chain.child("keys()"),
            self.value.keys().cloned().map(JsonValue::String).collect(),
        )
    }

    /// Values, in map order.
    pub fn values(&self) -> Array {
        Array::new(
            self.chain.child("values()"),
            self.value.values().cloned().collect(),
        )
    }

    /// Value under `key`; fails if missing.
    pub fn value(&self, key: &str) -> Value {
        let chain = self.chain.child(format!("value({key:?})"));
        match self.value.get(key) {
            Some(v) => Value::new(chain, v.clone()),
            None => {
                chain.fail(
                    AssertionFailure::new(FailureKind::ContainsKey)
                        .actual(self.json())
                        .expected(key)
                        .error(format!("expected: object contains key {key:?}")),
                );
                Value::new(chain, JsonValue::Null)
            }
        }
    }

    /// Object has `key`.
    pub fn contains_key(&self, key: &str) -> &Self {
        self.chain.check(format!("contains_key({key:?})"), || {
            (!self.value.contains_key(key)).then(|| {
                AssertionFailure::new(FailureKind::ContainsKey)
                    .actual(self.json())
                    .expected(key)
                    .error("expected: object contains key")
            })
        });
        self
    }

    /// Object lacks `key`.
    pub fn not_contains_key(&self, key: &str) -> &Self {
        self.chain.check(format!("not_contains_key({key:?})"), || {
            self.value.contains_key(key).then(|| {
                AssertionFailure::new(FailureKind::NotContainsKey)
                    .actual(self.json())
                    .expected(key)
                    .error("expected: object does not contain key")
            })
        });
        self
    }

    /// Some key holds `value`.
    pub fn contains_value(&self, value: impl Serialize) -> &Self {
        self.chain.check_arg("contains_value", value, |value| {
            (!self.value.values().any(|v| json_eq(v, &value))).then(|| {
                AssertionFailure::new(FailureKind::ContainsElement)
                    .actual(self.json())
                    .expected(value)
                    .error("expected: object contains value")
            })
        });
        self
    }

    /// No key holds `value`.
    pub fn not_contains_value(&self, value: impl Serialize) -> &Self {
        self.chain.check_arg("not_contains_value", value, |value| {
            self.value.values().any(|v| json_eq(v, &value)).then(|| {
                AssertionFailure::new(FailureKind::NotContainsElement)
                    .actual(self.json())
                    .expected(value)
                    .error("expected: object does not contain value")
            })
        });
        self
    }

    /// Every key of `subset` is present with a matching value, recursively.
    pub fn contains_subset(&self, subset: impl Serialize) -> &Self {
        self.chain.check_arg("contains_subset", subset, |subset| {
            (!json_contains_subset(&self.json(), &subset)).then(|| {
                AssertionFailure::new(FailureKind::ContainsSubset)
                    .actual(self.json())
                    .expected(subset)
                    .error("expected: object contains sub-object")
            })
        });
        self
    }

    /// Object does not contain `subset`.
    pub fn not_contains_subset(&self, subset: impl Serialize) -> &Self {
        self.chain.check_arg("not_contains_subset", subset, |subset| {
            json_contains_subset(&self.json(), &subset).then(|| {
                AssertionFailure::new(FailureKind::NotContainsSubset)
                    .actual(self.json())
                    .expected(subset)
                    .error("expected: object does not contain sub-object")
            })
        });
        self
    }

    /// `key` is present and holds `value`.
    pub fn has_value(&self, key: &str, value: impl Serialize) -> &Self {
        self.chain
            .check_arg_with(value, |v| segment("has_value", key, v), |value| {
                match self.value.get(key) {
                    None => Some(
                        AssertionFailure::new(FailureKind::ContainsKey)
                            .actual(self.json())
                            .expected(key)
                            .error("expected: object contains key"),
                    ),
                    Some(actual) => (!json_eq(actual, &value)).then(|| {
                        AssertionFailure::new(FailureKind::Equal)
                            .actual(actual.clone())
                            .expected(value)
                            .error(format!("expected: value under {key:?} is equal"))
                    }),
                }
            });
        self
    }

    /// `key` is missing or holds something other than `value`.
    pub fn not_has_value(&self, key: &str, value: impl Serialize) -> &Self {
        self.chain
            .check_arg_with(value, |v| segment("not_has_value", key, v), |value| {
                self.value
                    .get(key)
                    .filter(|actual| json_eq(actual, &value))
                    .map(|actual| {
                        AssertionFailure::new(FailureKind::NotEqual)
                            .actual(actual.clone())
                            .expected(value)
                            .error(format!("expected: value under {key:?} is not equal"))
                    })
            });
        self
    }

    /// Call `f` with every key and its wrapped value.
    pub fn every(&self, mut f: impl FnMut(&str, Value)) -> &Self {
        for (key, value) in &self.value {
            f(
                key,
                Value::new(self.chain.child(format!("value({key:?})")), value.clone()),
            );
        }
        self
    }
}

fn empty_list() -> AssertionFailure {
    AssertionFailure::new(FailureKind::InvalidRequest).error("unexpected empty list argument")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::chain;
    use crate::reporter::CollectReporter;
    use serde_json::json;

    fn object(v: JsonValue) -> (Object, CollectReporter) {
        let (chain, reporter) = chain("Object()");
        let map = v.as_object().cloned().unwrap();
        (Object::new(chain, map), reporter)
    }

    #[test]
    fn test_keys_and_values() {
        let (o, reporter) = object(json!({"a": 1, "b": {"c": true}}));
        o.not_empty()
            .contains_key("a")
            .not_contains_key("z")
            .contains_value(1.0)
            .not_contains_value("x")
            .has_value("a", 1)
            .not_has_value("a", 2)
            .contains_subset(json!({"b": {"c": true}}))
            .not_contains_subset(json!({"b": {"c": false}}));
        o.keys().consists_of(&["a", "b"]);
        o.values().length().is_equal(2);
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_missing_key_path() {
        let (o, reporter) = object(json!({"foo": {}}));
        o.value("foo").object().contains_key("bar");
        assert_eq!(reporter.len(), 1);
        assert!(reporter.messages()[0]
            .contains("Object().value(\"foo\").object().contains_key(\"bar\")"));

        o.value("missing").string().is_equal("x");
        assert_eq!(reporter.len(), 2);
    }

    #[test]
    fn test_every() {
        let (o, reporter) = object(json!({"a": 1, "b": 2}));
        let mut seen = Vec::new();
        o.every(|key, value| {
            seen.push(key.to_string());
            value.number().gt(0);
        });
        assert_eq!(seen, vec!["a", "b"]);
        assert!(reporter.is_empty());
    }
}
