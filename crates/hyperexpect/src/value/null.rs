use crate::chain::Chain;

/// A JSON `null`.
///
/// Produced by [`Value::null`](super::Value::null) after checking the type;
/// there is nothing further to assert.
#[derive(Debug, Clone)]
pub struct Null {
    chain: Chain,
}

impl Null {
    pub(crate) fn new(chain: Chain) -> Self {
        Self { chain }
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    /// Returns true if the type check that produced this wrapper failed.
    pub fn is_failed(&self) -> bool {
        self.chain.is_failed()
    }
}
