use std::cmp::Ordering;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::{json_eq, segment, type_name, Number, Value};
use crate::chain::Chain;
use crate::failure::{AssertionFailure, FailureKind};

/// Assertions on a JSON array.
///
/// # Example
///
/// ```rust,ignore
/// let items = e.get("/items").expect().await.json().array();
/// items.length().is_equal(3);
/// items.contains_all(&[1, 2]).is_ordered();
/// items.first().number().is_equal(1);
/// ```
#[derive(Debug, Clone)]
pub struct Array {
    chain: Chain,
    value: Vec<JsonValue>,
}

impl Array {
    pub(crate) fn new(chain: Chain, value: Vec<JsonValue>) -> Self {
        Self { chain, value }
    }

    /// The wrapped elements.
    pub fn raw(&self) -> &[JsonValue] {
        &self.value
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    fn json(&self) -> JsonValue {
        JsonValue::Array(self.value.clone())
    }

    fn contains(&self, item: &JsonValue) -> bool {
        self.value.iter().any(|v| json_eq(v, item))
    }

    /// Deserialize into `T`; reports [`FailureKind::Decode`] on mismatch.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        Value::new(self.chain.clone(), self.json()).decode()
    }

    /// Number of elements.
    pub fn length(&self) -> Number {
        #[allow(clippy::cast_precision_loss)]
        Number::new(self.chain.child("length()"), self.value.len() as f64)
    }

    /// Array has no elements.
    pub fn is_empty(&self) -> &Self {
        self.chain.check("is_empty()", || {
            (!self.value.is_empty()).then(|| {
                AssertionFailure::new(FailureKind::Empty)
                    .actual(self.json())
                    .error("expected: array is empty")
            })
        });
        self
    }

    /// Array has at least one element.
    pub fn not_empty(&self) -> &Self {
        self.chain.check("not_empty()", || {
            self.value.is_empty().then(|| {
                AssertionFailure::new(FailureKind::NotEmpty).error("expected: array is not empty")
            })
        });
        self
    }

    fn element(&self, segment: String, index: Option<usize>) -> Value {
        let chain = self.chain.child(segment);
        match index.and_then(|i| self.value.get(i)) {
            Some(v) => Value::new(chain, v.clone()),
            None => {
                chain.fail(match index {
                    Some(i) => AssertionFailure::new(FailureKind::InRange)
                        .actual(i)
                        .expected_range(0, self.value.len().saturating_sub(1))
                        .error("expected: index is in bounds"),
                    None => AssertionFailure::new(FailureKind::NotEmpty)
                        .error("expected: array is not empty"),
                });
                Value::new(chain, JsonValue::Null)
            }
        }
    }

    /// Element at `index`; fails when out of bounds.
    pub fn value(&self, index: usize) -> Value {
        self.element(format!("value({index})"), Some(index))
    }

    /// First element; fails when empty.
    pub fn first(&self) -> Value {
        self.element("first()".to_string(), (!self.value.is_empty()).then_some(0))
    }

    /// Last element; fails when empty.
    pub fn last(&self) -> Value {
        self.element("last()".to_string(), self.value.len().checked_sub(1))
    }

    /// Call `f` with every index and wrapped element.
    pub fn every(&self, mut f: impl FnMut(usize, Value)) -> &Self {
        for (i, v) in self.value.iter().enumerate() {
            f(i, Value::new(self.chain.child(format!("value({i})")), v.clone()));
        }
        self
    }

    /// Elements for which `predicate` returns true.
    pub fn filter(&self, predicate: impl Fn(usize, &JsonValue) -> bool) -> Array {
        let kept = self
            .value
            .iter()
            .enumerate()
            .filter(|(i, v)| predicate(*i, v))
            .map(|(_, v)| v.clone())
            .collect();
        Array::new(self.chain.child("filter()"), kept)
    }

    /// First element for which `predicate` returns true; fails if none does.
    pub fn find(&self, predicate: impl Fn(usize, &JsonValue) -> bool) -> Value {
        let chain = self.chain.child("find()");
        match self.value.iter().enumerate().find(|(i, v)| predicate(*i, v)) {
            Some((_, v)) => Value::new(chain, v.clone()),
            None => {
                chain.fail(
                    AssertionFailure::new(FailureKind::ContainsElement)
                        .actual(self.json())
                        .error("expected: array contains an element matching the predicate"),
                );
                Value::new(chain, JsonValue::Null)
            }
        }
    }

    /// Array equals `expected` element by element.
    pub fn is_equal<T: Serialize>(&self, expected: &[T]) -> &Self {
        self.chain.check_arg("is_equal", expected, |expected| {
            (!json_eq(&self.json(), &expected)).then(|| {
                AssertionFailure::new(FailureKind::Equal)
                    .actual(self.json())
                    .expected(expected)
                    .error("expected: arrays are equal")
            })
        });
        self
    }

    /// Array differs from `other`.
    pub fn not_equal<T: Serialize>(&self, other: &[T]) -> &Self {
        self.chain.check_arg("not_equal", other, |other| {
            json_eq(&self.json(), &other).then(|| {
                AssertionFailure::new(FailureKind::NotEqual)
                    .actual(self.json())
                    .expected(other)
                    .error("expected: arrays are not equal")
            })
        });
        self
    }

    /// Same elements as `expected`, in any order, with equal multiplicity.
    pub fn is_equal_unordered<T: Serialize>(&self, expected: &[T]) -> &Self {
        self.chain.check_arg("is_equal_unordered", expected, |expected| {
            (!same_multiset(&self.value, as_items(&expected))).then(|| {
                AssertionFailure::new(FailureKind::Equal)
                    .actual(self.json())
                    .expected(expected)
                    .error("expected: arrays are equal ignoring order")
            })
        });
        self
    }

    /// Elements differ from `other` even ignoring order.
    pub fn not_equal_unordered<T: Serialize>(&self, other: &[T]) -> &Self {
        self.chain.check_arg("not_equal_unordered", other, |other| {
            same_multiset(&self.value, as_items(&other)).then(|| {
                AssertionFailure::new(FailureKind::NotEqual)
                    .actual(self.json())
                    .expected(other)
                    .error("expected: arrays are not equal ignoring order")
            })
        });
        self
    }

    /// Array equals one of `values`.
    pub fn in_list<T: Serialize>(&self, values: &[T]) -> &Self {
        self.chain.check_arg("in_list", values, |list| {
            let items = as_items(&list);
            if items.is_empty() {
                return Some(empty_list());
            }
            let actual = self.json();
            (!items.iter().any(|item| json_eq(&actual, item))).then(|| {
                AssertionFailure::new(FailureKind::InList)
                    .actual(actual)
                    .expected_list(items.to_vec())
                    .error("expected: array is equal to one of the values")
            })
        });
        self
    }

    /// Array equals none of `values`.
    pub fn not_in_list<T: Serialize>(&self, values: &[T]) -> &Self {
        self.chain.check_arg("not_in_list", values, |list| {
            let items = as_items(&list);
            if items.is_empty() {
                return Some(empty_list());
            }
            let actual = self.json();
            items.iter().any(|item| json_eq(&actual, item)).then(|| {
                AssertionFailure::new(FailureKind::NotInList)
                    .actual(actual)
                    .expected_list(items.to_vec())
                    .error("expected: array is not equal to any of the values")
            })
        });
        self
    }

    /// Every one of `items` is present.
    pub fn contains_all<T: Serialize>(&self, items: &[T]) -> &Self {
        self.chain.check_arg("contains_all", items, |items| {
            let missing: Vec<JsonValue> = as_items(&items)
                .iter()
                .filter(|item| !self.contains(item))
                .cloned()
                .collect();
            (!missing.is_empty()).then(|| {
                AssertionFailure::new(FailureKind::ContainsElement)
                    .actual(self.json())
                    .expected(items.clone())
                    .error("expected: array contains all elements")
                    .error(format!("missing: {}", JsonValue::Array(missing)))
            })
        });
        self
    }

    /// At least one of `items` is missing.
    pub fn not_contains_all<T: Serialize>(&self, items: &[T]) -> &Self {
        self.chain.check_arg("not_contains_all", items, |items| {
            as_items(&items).iter().all(|item| self.contains(item)).then(|| {
                AssertionFailure::new(FailureKind::NotContainsElement)
                    .actual(self.json())
                    .expected(items.clone())
                    .error("expected: array does not contain all elements")
            })
        });
        self
    }

    /// At least one of `items` is present.
    pub fn contains_any<T: Serialize>(&self, items: &[T]) -> &Self {
        self.chain.check_arg("contains_any", items, |items| {
            (!as_items(&items).iter().any(|item| self.contains(item))).then(|| {
                AssertionFailure::new(FailureKind::ContainsElement)
                    .actual(self.json())
                    .expected(items.clone())
                    .error("expected: array contains any of the elements")
            })
        });
        self
    }

    /// None of `items` is present.
    pub fn not_contains_any<T: Serialize>(&self, items: &[T]) -> &Self {
        self.chain.check_arg("not_contains_any", items, |items| {
            as_items(&items).iter().any(|item| self.contains(item)).then(|| {
                AssertionFailure::new(FailureKind::NotContainsElement)
                    .actual(self.json())
                    .expected(items.clone())
                    .error("expected: array does not contain any of the elements")
            })
        });
        self
    }

    /// Every element is one of `items` and every one of `items` is present.
    ///
    /// Order and repetition are ignored.
    pub fn contains_only<T: Serialize>(&self, items: &[T]) -> &Self {
        self.chain.check_arg("contains_only", items, |items| {
            (!same_set(&self.value, as_items(&items))).then(|| {
                AssertionFailure::new(FailureKind::ContainsElement)
                    .actual(self.json())
                    .expected(items.clone())
                    .error("expected: array contains only the given elements")
            })
        });
        self
    }

    /// Opposite of [`contains_only`](Self::contains_only).
    pub fn not_contains_only<T: Serialize>(&self, items: &[T]) -> &Self {
        self.chain.check_arg("not_contains_only", items, |items| {
            same_set(&self.value, as_items(&items)).then(|| {
                AssertionFailure::new(FailureKind::NotContainsElement)
                    .actual(self.json())
                    .expected(items.clone())
                    .error("expected: array does not contain only the given elements")
            })
        });
        self
    }

    /// Array consists of exactly `items`, in order.
    pub fn consists_of<T: Serialize>(&self, items: &[T]) -> &Self {
        self.chain.check_arg("consists_of", items, |items| {
            (!json_eq(&self.json(), &items)).then(|| {
                AssertionFailure::new(FailureKind::Equal)
                    .actual(self.json())
                    .expected(items)
                    .error("expected: array consists of the given elements in order")
            })
        });
        self
    }

    /// Opposite of [`consists_of`](Self::consists_of).
    pub fn not_consists_of<T: Serialize>(&self, items: &[T]) -> &Self {
        self.chain.check_arg("not_consists_of", items, |items| {
            json_eq(&self.json(), &items).then(|| {
                AssertionFailure::new(FailureKind::NotEqual)
                    .actual(self.json())
                    .expected(items)
                    .error("expected: array does not consist of the given elements in order")
            })
        });
        self
    }

    /// Element at `index` equals `value`.
    pub fn has_value(&self, index: usize, value: impl Serialize) -> &Self {
        self.chain
            .check_arg_with(value, |v| segment("has_value", index, v), |value| {
                match self.value.get(index) {
                    None => Some(
                        AssertionFailure::new(FailureKind::InRange)
                            .actual(index)
                            .expected_range(0, self.value.len().saturating_sub(1))
                            .error("expected: index is in bounds"),
                    ),
                    Some(actual) => (!json_eq(actual, &value)).then(|| {
                        AssertionFailure::new(FailureKind::Equal)
                            .actual(actual.clone())
                            .expected(value)
                            .error(format!("expected: element {index} is equal"))
                    }),
                }
            });
        self
    }

    /// Element at `index` is missing or differs from `value`.
    pub fn not_has_value(&self, index: usize, value: impl Serialize) -> &Self {
        self.chain
            .check_arg_with(value, |v| segment("not_has_value", index, v), |value| {
                self.value
                    .get(index)
                    .filter(|actual| json_eq(actual, &value))
                    .map(|actual| {
                        AssertionFailure::new(FailureKind::NotEqual)
                            .actual(actual.clone())
                            .expected(value)
                            .error(format!("expected: element {index} is not equal"))
                    })
            });
        self
    }

    /// Elements are in non-decreasing order.
    ///
    /// Works for arrays of numbers, strings, or booleans; mixed or other
    /// element types are an [`FailureKind::InvalidRequest`].
    pub fn is_ordered(&self) -> &Self {
        self.chain.check("is_ordered()", || match self.default_order() {
            Err(failure) => Some(failure),
            Ok(ordered) => (!ordered).then(|| self.order_failure(FailureKind::Ordered)),
        });
        self
    }

    /// Elements are not in non-decreasing order.
    pub fn not_ordered(&self) -> &Self {
        self.chain.check("not_ordered()", || match self.default_order() {
            Err(failure) => Some(failure),
            Ok(ordered) => ordered.then(|| self.order_failure(FailureKind::NotOrdered)),
        });
        self
    }

    /// Elements are ordered by `less`: no element is less than its predecessor.
    pub fn is_ordered_by(&self, less: impl Fn(&JsonValue, &JsonValue) -> bool) -> &Self {
        self.chain.check("is_ordered_by()", || {
            (!self.ordered_by(less)).then(|| self.order_failure(FailureKind::Ordered))
        });
        self
    }

    /// Opposite of [`is_ordered_by`](Self::is_ordered_by).
    pub fn not_ordered_by(&self, less: impl Fn(&JsonValue, &JsonValue) -> bool) -> &Self {
        self.chain.check("not_ordered_by()", || {
            self.ordered_by(less)
                .then(|| self.order_failure(FailureKind::NotOrdered))
        });
        self
    }

    fn ordered_by(&self, less: impl Fn(&JsonValue, &JsonValue) -> bool) -> bool {
        self.value.windows(2).all(|pair| !less(&pair[1], &pair[0]))
    }

    fn default_order(&self) -> Result<bool, AssertionFailure> {
        let mut ordered = true;
        for pair in self.value.windows(2) {
            match compare(&pair[0], &pair[1]) {
                Some(Ordering::Greater) => ordered = false,
                Some(_) => {}
                None => {
                    return Err(AssertionFailure::new(FailureKind::InvalidRequest)
                        .actual(self.json())
                        .error(format!(
                            "cannot order {} and {} without a comparator",
                            type_name(&pair[0]),
                            type_name(&pair[1])
                        )))
                }
            }
        }
        Ok(ordered)
    }

    fn order_failure(&self, kind: FailureKind) -> AssertionFailure {
        let message = match kind {
            FailureKind::Ordered => "expected: array is ordered",
            _ => "expected: array is not ordered",
        };
        AssertionFailure::new(kind).actual(self.json()).error(message)
    }
}

fn compare(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn as_items(value: &JsonValue) -> &[JsonValue] {
    value.as_array().map_or(&[], Vec::as_slice)
}

fn same_multiset(actual: &[JsonValue], expected: &[JsonValue]) -> bool {
    if actual.len() != expected.len() {
        return false;
    }
    let mut used = vec![false; expected.len()];
    actual.iter().all(|a| {
        let slot = expected
            .iter()
            .enumerate()
            .find(|(i, e)| !used[*i] && json_eq(a, e))
            .map(|(i, _)| i);
        slot.map(|i| used[i] = true).is_some()
    })
}

fn same_set(actual: &[JsonValue], expected: &[JsonValue]) -> bool {
    actual
        .iter()
        .all(|a| expected.iter().any(|e| json_eq(a, e)))
        && expected.iter().all(|e| actual.iter().any(|a| json_eq(a, e)))
}

fn empty_list() -> AssertionFailure {
    AssertionFailure::new(FailureKind::InvalidRequest).error("unexpected empty list argument")
}
