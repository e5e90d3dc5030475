use crate::chain::Chain;
use crate::failure::{AssertionFailure, FailureKind};

/// Assertions on a boolean.
#[derive(Debug, Clone)]
pub struct Boolean {
    chain: Chain,
    value: bool,
}

impl Boolean {
    pub(crate) fn new(chain: Chain, value: bool) -> Self {
        Self { chain, value }
    }

    /// The wrapped boolean.
    pub fn raw(&self) -> bool {
        self.value
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    fn expect(&self, segment: String, expected: bool, kind: FailureKind) {
        self.chain.check(segment, || {
            (self.value != expected).then(|| {
                AssertionFailure::new(kind)
                    .actual(self.value)
                    .expected(expected)
                    .error(format!("expected: boolean is {expected}"))
            })
        });
    }

    /// Boolean is `true`.
    pub fn is_true(&self) -> &Self {
        self.expect("is_true()".to_string(), true, FailureKind::Equal);
        self
    }

    /// Boolean is `false`.
    pub fn is_false(&self) -> &Self {
        self.expect("is_false()".to_string(), false, FailureKind::Equal);
        self
    }

    /// Boolean equals `expected`.
    pub fn is_equal(&self, expected: bool) -> &Self {
        self.expect(format!("is_equal({expected})"), expected, FailureKind::Equal);
        self
    }

    /// Boolean differs from `value`.
    pub fn not_equal(&self, value: bool) -> &Self {
        self.expect(format!("not_equal({value})"), !value, FailureKind::NotEqual);
        self
    }
}
