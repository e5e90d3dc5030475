//! Typed assertion wrappers.
//!
//! Decoded JSON enters the tree as a [`Value`] and is narrowed with
//! `object()`, `array()`, `string()`, `number()`, `boolean()`, or `null()`.
//! A narrowing call on the wrong type reports one [`FailureKind::Type`]
//! failure and returns a failed wrapper holding a default value, so the
//! rest of the chain stays silent.
//!
//! Numbers are compared as `f64`: `1` equals `1.0`.
//!
//! [`FailureKind::Type`]: crate::failure::FailureKind::Type

mod array;
mod boolean;
mod cookie;
mod datetime;
mod duration;
mod json;
mod matcher;
mod null;
mod number;
mod object;
mod string;

pub use array::Array;
pub use boolean::Boolean;
pub use cookie::Cookie;
pub use datetime::DateTime;
pub use duration::DurationValue;
pub use json::Value;
pub use matcher::Match;
pub use null::Null;
pub use number::{IntoF64, Number};
pub use object::Object;
pub use string::StringValue;

use std::fmt;

use serde_json::Value as JsonValue;

use crate::failure::{AssertionFailure, FailureKind};

/// Deep equality where numbers compare as `f64`.
pub(crate) fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| json_eq(v, other)))
        }
        _ => a == b,
    }
}

/// Returns true if `outer` contains `inner`.
///
/// Objects match when every key of `inner` is present in `outer` with a
/// matching value, recursing into nested objects. Any other value must be
/// equal.
pub(crate) fn json_contains_subset(outer: &JsonValue, inner: &JsonValue) -> bool {
    match (outer, inner) {
        (JsonValue::Object(outer), JsonValue::Object(inner)) => inner.iter().all(|(k, iv)| {
            outer
                .get(k)
                .is_some_and(|ov| json_contains_subset(ov, iv))
        }),
        _ => json_eq(outer, inner),
    }
}

/// JSON type name used in failure messages.
pub(crate) fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// A [`FailureKind::Type`] failure for `actual` when `expected` was wanted.
pub(crate) fn type_failure(expected: &str, actual: &JsonValue) -> AssertionFailure {
    AssertionFailure::new(FailureKind::Type)
        .actual(actual.clone())
        .error(format!(
            "expected: value is {expected}, but it is {}",
            type_name(actual)
        ))
}

/// Render `method(key, arg)` for two-argument assertions.
pub(crate) fn segment(method: &str, key: impl fmt::Debug, arg: Option<&JsonValue>) -> String {
    match arg {
        Some(arg) => format!("{method}({key:?}, {arg})"),
        None => format!("{method}({key:?}, ?)"),
    }
}

/// Float as JSON; non-finite values become strings.
pub(crate) fn f64_json(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map_or_else(|| JsonValue::String(value.to_string()), JsonValue::Number)
}
