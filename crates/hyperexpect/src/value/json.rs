use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::{
    json_contains_subset, json_eq, type_failure, Array, Boolean, Null, Number, Object,
    StringValue,
};
use crate::chain::Chain;
use crate::failure::{AssertionFailure, FailureKind};

/// Assertions on an arbitrary JSON value.
///
/// Narrow it to a concrete type with [`object`](Self::object),
/// [`array`](Self::array), [`string`](Self::string),
/// [`number`](Self::number), [`boolean`](Self::boolean), or
/// [`null`](Self::null).
///
/// # Example
///
/// ```rust,ignore
/// let user = e.get("/users/1").expect().await.json();
/// user.schema(json!({"type": "object", "required": ["id"]}));
/// user.object().value("id").number().is_equal(1);
/// ```
#[derive(Debug, Clone)]
pub struct Value {
    chain: Chain,
    value: JsonValue,
}

impl Value {
    pub(crate) fn new(chain: Chain, value: JsonValue) -> Self {
        Self { chain, value }
    }

    /// The wrapped JSON value.
    pub fn raw(&self) -> &JsonValue {
        &self.value
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    /// Deserialize into `T`.
    ///
    /// Returns `None` and reports a [`FailureKind::Decode`] failure if the
    /// value does not fit.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        if self.chain.is_failed() {
            return None;
        }
        match serde_json::from_value(self.value.clone()) {
            Ok(decoded) => {
                self.chain.pass_at("decode()");
                Some(decoded)
            }
            Err(e) => {
                self.chain.fail_at(
                    "decode()",
                    AssertionFailure::new(FailureKind::Decode)
                        .actual(self.value.clone())
                        .error(format!(
                            "expected: value decodes as {}",
                            std::any::type_name::<T>()
                        ))
                        .error(e.to_string()),
                );
                None
            }
        }
    }

    fn narrow<T>(
        &self,
        segment: &str,
        expected: &str,
        extract: impl FnOnce(&JsonValue) -> Option<T>,
        default: T,
    ) -> (Chain, T) {
        let chain = self.chain.child(segment);
        if chain.is_failed() {
            return (chain, default);
        }
        match extract(&self.value) {
            Some(value) => (chain, value),
            None => {
                chain.fail(type_failure(expected, &self.value));
                (chain, default)
            }
        }
    }

    /// Narrow to an object.
    pub fn object(&self) -> Object {
        let (chain, map) = self.narrow(
            "object()",
            "an object",
            |v| v.as_object().cloned(),
            serde_json::Map::new(),
        );
        Object::new(chain, map)
    }

    /// Narrow to an array.
    pub fn array(&self) -> Array {
        let (chain, items) = self.narrow(
            "array()",
            "an array",
            |v| v.as_array().cloned(),
            Vec::new(),
        );
        Array::new(chain, items)
    }

    /// Narrow to a string.
    pub fn string(&self) -> StringValue {
        let (chain, s) = self.narrow(
            "string()",
            "a string",
            |v| v.as_str().map(str::to_string),
            String::new(),
        );
        StringValue::new(chain, s)
    }

    /// Narrow to a number.
    pub fn number(&self) -> Number {
        let (chain, n) = self.narrow("number()", "a number", JsonValue::as_f64, 0.0);
        Number::new(chain, n)
    }

    /// Narrow to a boolean.
    pub fn boolean(&self) -> Boolean {
        let (chain, b) = self.narrow("boolean()", "a boolean", JsonValue::as_bool, false);
        Boolean::new(chain, b)
    }

    /// Narrow to null.
    pub fn null(&self) -> Null {
        let (chain, ()) = self.narrow("null()", "null", |v| v.is_null().then_some(()), ());
        Null::new(chain)
    }

    fn check_type(&self, segment: &str, expected: &str, ok: bool) -> &Self {
        self.chain
            .check(segment, || (!ok).then(|| type_failure(expected, &self.value)));
        self
    }

    /// Value is null.
    pub fn is_null(&self) -> &Self {
        self.check_type("is_null()", "null", self.value.is_null())
    }

    /// Value is not null.
    pub fn not_null(&self) -> &Self {
        self.chain.check("not_null()", || {
            self.value.is_null().then(|| {
                AssertionFailure::new(FailureKind::NotNull).error("expected: value is not null")
            })
        });
        self
    }

    /// Value is an object.
    pub fn is_object(&self) -> &Self {
        self.check_type("is_object()", "an object", self.value.is_object())
    }

    /// Value is an array.
    pub fn is_array(&self) -> &Self {
        self.check_type("is_array()", "an array", self.value.is_array())
    }

    /// Value is a string.
    pub fn is_string(&self) -> &Self {
        self.check_type("is_string()", "a string", self.value.is_string())
    }

    /// Value is a number.
    pub fn is_number(&self) -> &Self {
        self.check_type("is_number()", "a number", self.value.is_number())
    }

    /// Value is a boolean.
    pub fn is_boolean(&self) -> &Self {
        self.check_type("is_boolean()", "a boolean", self.value.is_boolean())
    }

    /// Value equals `expected`; numbers compare as `f64`.
    pub fn is_equal(&self, expected: impl Serialize) -> &Self {
        self.chain.check_arg("is_equal", expected, |expected| {
            (!json_eq(&self.value, &expected)).then(|| {
                AssertionFailure::new(FailureKind::Equal)
                    .actual(self.value.clone())
                    .expected(expected)
                    .error("expected: values are equal")
            })
        });
        self
    }

    /// Value differs from `other`.
    pub fn not_equal(&self, other: impl Serialize) -> &Self {
        self.chain.check_arg("not_equal", other, |other| {
            json_eq(&self.value, &other).then(|| {
                AssertionFailure::new(FailureKind::NotEqual)
                    .actual(self.value.clone())
                    .expected(other)
                    .error("expected: values are not equal")
            })
        });
        self
    }

    /// Value equals one of `values`.
    pub fn in_list<T: Serialize>(&self, values: &[T]) -> &Self {
        self.chain.check_arg("in_list", values, |list| {
            let items = list.as_array().cloned().unwrap_or_default();
            if items.is_empty() {
                return Some(
                    AssertionFailure::new(FailureKind::InvalidRequest)
                        .error("unexpected empty list argument"),
                );
            }
            (!items.iter().any(|item| json_eq(&self.value, item))).then(|| {
                AssertionFailure::new(FailureKind::InList)
                    .actual(self.value.clone())
                    .expected_list(items)
                    .error("expected: value is equal to one of the values")
            })
        });
        self
    }

    /// Value equals none of `values`.
    pub fn not_in_list<T: Serialize>(&self, values: &[T]) -> &Self {
        self.chain.check_arg("not_in_list", values, |list| {
            let items = list.as_array().cloned().unwrap_or_default();
            if items.is_empty() {
                return Some(
                    AssertionFailure::new(FailureKind::InvalidRequest)
                        .error("unexpected empty list argument"),
                );
            }
            items.iter().any(|item| json_eq(&self.value, item)).then(|| {
                AssertionFailure::new(FailureKind::NotInList)
                    .actual(self.value.clone())
                    .expected_list(items)
                    .error("expected: value is not equal to any of the values")
            })
        });
        self
    }

    /// Value contains `subset`: objects recursively by key, anything else by equality.
    pub fn contains_subset(&self, subset: impl Serialize) -> &Self {
        self.chain.check_arg("contains_subset", subset, |subset| {
            (!json_contains_subset(&self.value, &subset)).then(|| {
                AssertionFailure::new(FailureKind::ContainsSubset)
                    .actual(self.value.clone())
                    .expected(subset)
                    .error("expected: value contains sub-value")
            })
        });
        self
    }

    /// Value does not contain `subset`.
    pub fn not_contains_subset(&self, subset: impl Serialize) -> &Self {
        self.chain.check_arg("not_contains_subset", subset, |subset| {
            json_contains_subset(&self.value, &subset).then(|| {
                AssertionFailure::new(FailureKind::NotContainsSubset)
                    .actual(self.value.clone())
                    .expected(subset)
                    .error("expected: value does not contain sub-value")
            })
        });
        self
    }

    /// Value validates against the JSON schema `schema`.
    ///
    /// A JSON string argument is parsed as schema text.
    pub fn schema(&self, schema: impl Serialize) -> &Self {
        self.chain.check_arg("schema", schema, |schema| {
            let validator = match compile_schema(&schema) {
                Ok(validator) => validator,
                Err(failure) => return Some(failure),
            };
            let errors: Vec<String> = validator
                .iter_errors(&self.value)
                .map(|e| e.to_string())
                .collect();
            (!errors.is_empty()).then(|| {
                errors.into_iter().fold(
                    AssertionFailure::new(FailureKind::MatchSchema)
                        .actual(self.value.clone())
                        .expected(schema)
                        .error("expected: value matches schema"),
                    AssertionFailure::error,
                )
            })
        });
        self
    }

    /// Value does not validate against `schema`.
    pub fn not_schema(&self, schema: impl Serialize) -> &Self {
        self.chain.check_arg("not_schema", schema, |schema| {
            let validator = match compile_schema(&schema) {
                Ok(validator) => validator,
                Err(failure) => return Some(failure),
            };
            validator.is_valid(&self.value).then(|| {
                AssertionFailure::new(FailureKind::NotMatchSchema)
                    .actual(self.value.clone())
                    .expected(schema)
                    .error("expected: value does not match schema")
            })
        });
        self
    }
}

fn compile_schema(schema: &JsonValue) -> Result<jsonschema::Validator, AssertionFailure> {
    let invalid = |message: String| {
        AssertionFailure::new(FailureKind::InvalidRequest)
            .error(format!("invalid JSON schema: {message}"))
    };
    let parsed;
    let schema = match schema {
        JsonValue::String(text) => {
            parsed = serde_json::from_str::<JsonValue>(text).map_err(|e| invalid(e.to_string()))?;
            &parsed
        }
        other => other,
    };
    jsonschema::validator_for(schema).map_err(|e| invalid(e.to_string()))
}
