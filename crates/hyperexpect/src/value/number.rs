use super::f64_json;
use crate::chain::Chain;
use crate::failure::{AssertionFailure, FailureKind};

/// Numeric types accepted by [`Number`] assertions.
pub trait IntoF64: Copy {
    /// Convert to `f64`, rounding large integers.
    fn into_f64(self) -> f64;
}

macro_rules! impl_into_f64 {
    ($($ty:ty),*) => {
        $(
            impl IntoF64 for $ty {
                #[allow(clippy::cast_lossless, clippy::cast_precision_loss)]
                fn into_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_into_f64!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Assertions on a number.
///
/// # Example
///
/// ```rust,ignore
/// e.get("/stats").expect().await
///     .json().object().value("ratio").number()
///     .in_delta(0.5, 0.01)
///     .lt(1);
/// ```
#[derive(Debug, Clone)]
pub struct Number {
    chain: Chain,
    value: f64,
}

impl Number {
    pub(crate) fn new(chain: Chain, value: f64) -> Self {
        Self { chain, value }
    }

    /// The wrapped number.
    pub fn raw(&self) -> f64 {
        self.value
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    fn fail(&self, kind: FailureKind, message: &str) -> AssertionFailure {
        AssertionFailure::new(kind)
            .actual(f64_json(self.value))
            .error(format!("expected: {message}"))
    }

    fn compare(&self, method: &str, other: f64, kind: FailureKind, ok: bool, message: &str) {
        self.chain.check(format!("{method}({other})"), || {
            (!ok).then(|| self.fail(kind, message).expected(f64_json(other)))
        });
    }

    /// Number equals `expected`.
    pub fn is_equal(&self, expected: impl IntoF64) -> &Self {
        let expected = expected.into_f64();
        #[allow(clippy::float_cmp)]
        let ok = self.value == expected;
        self.compare("is_equal", expected, FailureKind::Equal, ok, "numbers are equal");
        self
    }

    /// Number differs from `expected`.
    pub fn not_equal(&self, expected: impl IntoF64) -> &Self {
        let expected = expected.into_f64();
        #[allow(clippy::float_cmp)]
        let ok = self.value != expected;
        self.compare(
            "not_equal",
            expected,
            FailureKind::NotEqual,
            ok,
            "numbers are not equal",
        );
        self
    }

    /// `|number - reference| <= delta`.
    pub fn in_delta(&self, reference: impl IntoF64, delta: impl IntoF64) -> &Self {
        let (reference, delta) = (reference.into_f64(), delta.into_f64());
        self.chain.check(
            format!("in_delta({reference}, {delta})"),
            || {
                ((self.value - reference).abs() > delta || self.value.is_nan()).then(|| {
                    self.fail(FailureKind::InDelta, "number is within delta of reference")
                        .reference(f64_json(reference))
                        .delta(delta)
                })
            },
        );
        self
    }

    /// `|number - reference| > delta`.
    pub fn not_in_delta(&self, reference: impl IntoF64, delta: impl IntoF64) -> &Self {
        let (reference, delta) = (reference.into_f64(), delta.into_f64());
        self.chain.check(
            format!("not_in_delta({reference}, {delta})"),
            || {
                ((self.value - reference).abs() <= delta).then(|| {
                    self.fail(
                        FailureKind::NotInDelta,
                        "number is not within delta of reference",
                    )
                    .reference(f64_json(reference))
                    .delta(delta)
                })
            },
        );
        self
    }

    /// `min <= number <= max`.
    pub fn in_range(&self, min: impl IntoF64, max: impl IntoF64) -> &Self {
        let (min, max) = (min.into_f64(), max.into_f64());
        self.chain.check(
            format!("in_range({min}, {max})"),
            || {
                (!(min..=max).contains(&self.value)).then(|| {
                    self.fail(FailureKind::InRange, "number is in range")
                        .expected_range(f64_json(min), f64_json(max))
                })
            },
        );
        self
    }

    /// Number is outside `min..=max`.
    pub fn not_in_range(&self, min: impl IntoF64, max: impl IntoF64) -> &Self {
        let (min, max) = (min.into_f64(), max.into_f64());
        self.chain.check(
            format!("not_in_range({min}, {max})"),
            || {
                (min..=max).contains(&self.value).then(|| {
                    self.fail(FailureKind::NotInRange, "number is not in range")
                        .expected_range(f64_json(min), f64_json(max))
                })
            },
        );
        self
    }

    fn list_segment<T: IntoF64>(method: &str, values: &[T]) -> (String, Vec<f64>) {
        let values: Vec<f64> = values.iter().map(|v| v.into_f64()).collect();
        let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        (format!("{method}([{}])", rendered.join(", ")), values)
    }

    /// Number equals one of `values`.
    pub fn in_list<T: IntoF64>(&self, values: &[T]) -> &Self {
        let (segment, values) = Self::list_segment("in_list", values);
        if values.is_empty() {
            self.chain.fail_at(
                segment,
                AssertionFailure::new(FailureKind::InvalidRequest)
                    .error("unexpected empty list argument"),
            );
            return self;
        }
        self.chain.check(segment, || {
            #[allow(clippy::float_cmp)]
            let found = values.iter().any(|v| *v == self.value);
            (!found).then(|| {
                self.fail(FailureKind::InList, "number is equal to one of the values")
                    .expected_list(values.iter().map(|v| f64_json(*v)).collect())
            })
        });
        self
    }

    /// Number equals none of `values`.
    pub fn not_in_list<T: IntoF64>(&self, values: &[T]) -> &Self {
        let (segment, values) = Self::list_segment("not_in_list", values);
        if values.is_empty() {
            self.chain.fail_at(
                segment,
                AssertionFailure::new(FailureKind::InvalidRequest)
                    .error("unexpected empty list argument"),
            );
            return self;
        }
        self.chain.check(segment, || {
            #[allow(clippy::float_cmp)]
            let found = values.iter().any(|v| *v == self.value);
            found.then(|| {
                self.fail(
                    FailureKind::NotInList,
                    "number is not equal to any of the values",
                )
                .expected_list(values.iter().map(|v| f64_json(*v)).collect())
            })
        });
        self
    }

    /// Number is greater than `other`.
    pub fn gt(&self, other: impl IntoF64) -> &Self {
        let other = other.into_f64();
        let ok = self.value > other;
        self.compare("gt", other, FailureKind::Gt, ok, "number is greater than reference");
        self
    }

    /// Number is greater than or equal to `other`.
    pub fn ge(&self, other: impl IntoF64) -> &Self {
        let other = other.into_f64();
        let ok = self.value >= other;
        self.compare(
            "ge",
            other,
            FailureKind::Ge,
            ok,
            "number is greater than or equal to reference",
        );
        self
    }

    /// Number is less than `other`.
    pub fn lt(&self, other: impl IntoF64) -> &Self {
        let other = other.into_f64();
        let ok = self.value < other;
        self.compare("lt", other, FailureKind::Lt, ok, "number is less than reference");
        self
    }

    /// Number is less than or equal to `other`.
    pub fn le(&self, other: impl IntoF64) -> &Self {
        let other = other.into_f64();
        let ok = self.value <= other;
        self.compare(
            "le",
            other,
            FailureKind::Le,
            ok,
            "number is less than or equal to reference",
        );
        self
    }

    /// Number is finite and has no fractional part.
    pub fn is_int(&self) -> &Self {
        self.chain.check("is_int()", || {
            (!(self.value.is_finite() && self.value.fract() == 0.0))
                .then(|| self.fail(FailureKind::MatchFormat, "number is an integer"))
        });
        self
    }

    /// Number has a fractional part or is not finite.
    pub fn not_int(&self) -> &Self {
        self.chain.check("not_int()", || {
            (self.value.is_finite() && self.value.fract() == 0.0)
                .then(|| self.fail(FailureKind::MatchFormat, "number is not an integer"))
        });
        self
    }

    /// Number is neither infinite nor NaN.
    pub fn is_finite(&self) -> &Self {
        self.chain.check("is_finite()", || {
            (!self.value.is_finite())
                .then(|| self.fail(FailureKind::MatchFormat, "number is finite"))
        });
        self
    }

    /// Number is infinite or NaN.
    pub fn not_finite(&self) -> &Self {
        self.chain.check("not_finite()", || {
            self.value
                .is_finite()
                .then(|| self.fail(FailureKind::MatchFormat, "number is not finite"))
        });
        self
    }
}
