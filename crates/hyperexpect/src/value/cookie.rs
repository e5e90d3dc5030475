use std::time::Duration;

use chrono::Utc;

use super::{DateTime, DurationValue, StringValue};
use crate::chain::Chain;
use crate::cookie::SetCookie;
use crate::failure::{AssertionFailure, FailureKind};

/// Assertions on one `Set-Cookie` entry of a response.
///
/// # Example
///
/// ```rust,ignore
/// let session = resp.cookie("session");
/// session.value().not_empty();
/// session.path().is_equal("/");
/// session.max_age().gt(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct Cookie {
    chain: Chain,
    cookie: SetCookie,
}

impl Cookie {
    pub(crate) fn new(chain: Chain, cookie: SetCookie) -> Self {
        Self { chain, cookie }
    }

    /// The parsed cookie.
    pub fn raw(&self) -> &SetCookie {
        &self.cookie
    }

    /// Report later failures under `name` instead of the full path.
    pub fn alias(mut self, name: &str) -> Self {
        self.chain.set_alias(name);
        self
    }

    /// Cookie name.
    pub fn name(&self) -> StringValue {
        StringValue::new(self.chain.child("name()"), self.cookie.name().to_string())
    }

    /// Cookie value.
    pub fn value(&self) -> StringValue {
        StringValue::new(self.chain.child("value()"), self.cookie.value().to_string())
    }

    fn attribute(&self, segment: &str, attribute: &str, value: Option<&str>) -> StringValue {
        let chain = self.chain.child(segment);
        if value.is_none() {
            chain.fail(
                AssertionFailure::new(FailureKind::NotNull)
                    .error(format!("expected: cookie has {attribute} attribute")),
            );
        }
        StringValue::new(chain, value.unwrap_or_default().to_string())
    }

    /// `Domain` attribute; fails when absent.
    pub fn domain(&self) -> StringValue {
        self.attribute("domain()", "Domain", self.cookie.domain())
    }

    /// `Path` attribute; fails when absent.
    pub fn path(&self) -> StringValue {
        self.attribute("path()", "Path", self.cookie.path())
    }

    /// `Expires` attribute; fails when absent.
    pub fn expires(&self) -> DateTime {
        let chain = self.chain.child("expires()");
        match self.cookie.expires() {
            Some(expires) => DateTime::new(chain, expires),
            None => {
                chain.fail(
                    AssertionFailure::new(FailureKind::NotNull)
                        .error("expected: cookie has Expires attribute"),
                );
                DateTime::new(chain, chrono::DateTime::<Utc>::UNIX_EPOCH)
            }
        }
    }

    /// Cookie carries `Max-Age`.
    pub fn has_max_age(&self) -> &Self {
        self.chain.check("has_max_age()", || {
            self.cookie.max_age().is_none().then(|| {
                AssertionFailure::new(FailureKind::NotNull)
                    .error("expected: cookie has Max-Age attribute")
            })
        });
        self
    }

    /// Cookie carries no `Max-Age`.
    pub fn not_has_max_age(&self) -> &Self {
        self.chain.check("not_has_max_age()", || {
            self.cookie.max_age().map(|seconds| {
                AssertionFailure::new(FailureKind::Null)
                    .actual(seconds)
                    .error("expected: cookie has no Max-Age attribute")
            })
        });
        self
    }

    /// `Max-Age` as a duration; negative values read as zero.
    ///
    /// A missing attribute yields an unset [`DurationValue`].
    pub fn max_age(&self) -> DurationValue {
        let max_age = self
            .cookie
            .max_age()
            .map(|seconds| Duration::from_secs(u64::try_from(seconds).unwrap_or(0)));
        DurationValue::new(self.chain.child("max_age()"), max_age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::chain;

    #[test]
    fn test_cookie_attributes() {
        let (chain, reporter) = chain("Cookie(\"session\")");
        let parsed =
            SetCookie::parse("session=abc; Path=/; Max-Age=3600; Expires=Wed, 21 Oct 2037 07:28:00 GMT")
                .unwrap();
        let cookie = Cookie::new(chain, parsed);
        cookie.name().is_equal("session");
        cookie.value().is_equal("abc");
        cookie.path().is_equal("/");
        cookie.has_max_age();
        cookie.max_age().is_equal(Duration::from_secs(3600));
        cookie.expires().gt(Utc::now());
        assert!(reporter.is_empty());

        cookie.domain().is_equal("example.com");
        assert_eq!(reporter.len(), 1);
        assert!(reporter.messages()[0].contains("Cookie(\"session\").domain()"));
    }

    #[test]
    fn test_missing_max_age() {
        let (chain, reporter) = chain("Cookie(\"a\")");
        let cookie = Cookie::new(chain, SetCookie::new("a", "1"));
        cookie.not_has_max_age();
        cookie.max_age().not_set();
        assert!(reporter.is_empty());
        cookie.has_max_age();
        assert_eq!(reporter.len(), 1);
    }
}
