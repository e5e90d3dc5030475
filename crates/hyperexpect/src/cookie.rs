//! Cookie parsing and the session cookie jar.
//!
//! [`SetCookie::parse`] reads one `Set-Cookie` response header.
//! [`CookieJar`] stores cookies from responses and attaches the matching
//! ones to later requests of the same session.
//!
//! # Example
//!
//! ```rust
//! use hyperexpect::SetCookie;
//!
//! let cookie = SetCookie::parse("session=abc123; Path=/; Max-Age=3600; HttpOnly").unwrap();
//! assert_eq!(cookie.name(), "session");
//! assert_eq!(cookie.value(), "abc123");
//! assert_eq!(cookie.path(), Some("/"));
//! assert_eq!(cookie.max_age(), Some(3600));
//! assert!(cookie.is_http_only());
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use http::header::SET_COOKIE;
use http::HeaderMap;
use parking_lot::Mutex;
use url::Url;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// Sent with cross-site requests.
    None,
    /// Sent with same-site requests and top-level navigations.
    Lax,
    /// Sent with same-site requests only.
    Strict,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Lax => write!(f, "Lax"),
            Self::Strict => write!(f, "Strict"),
        }
    }
}

/// A cookie set by a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    max_age: Option<i64>,
    expires: Option<DateTime<Utc>>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl SetCookie {
    /// Create a cookie with no attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            max_age: None,
            expires: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// Parse a `Set-Cookie` header value.
    ///
    /// Returns `None` if there is no `name=value` pair. Unknown attributes
    /// and malformed attribute values are ignored.
    pub fn parse(header_value: &str) -> Option<Self> {
        let mut parts = header_value.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut cookie = Self::new(name, value.trim().trim_matches('"'));

        for attribute in parts {
            let attribute = attribute.trim();
            let (key, value) = match attribute.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (attribute, ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "domain" if !value.is_empty() => {
                    cookie.domain = Some(value.trim_start_matches('.').to_ascii_lowercase());
                }
                "path" if value.starts_with('/') => cookie.path = Some(value.to_string()),
                "max-age" => cookie.max_age = value.parse().ok(),
                "expires" => {
                    cookie.expires = DateTime::parse_from_rfc2822(value)
                        .ok()
                        .map(|date| date.with_timezone(&Utc));
                }
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                "samesite" => {
                    cookie.same_site = match value.to_ascii_lowercase().as_str() {
                        "none" => Some(SameSite::None),
                        "lax" => Some(SameSite::Lax),
                        "strict" => Some(SameSite::Strict),
                        _ => None,
                    };
                }
                _ => {}
            }
        }
        Some(cookie)
    }

    /// Parse every `Set-Cookie` header in `headers`.
    pub fn parse_all(headers: &HeaderMap) -> Vec<Self> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(Self::parse)
            .collect()
    }

    /// Set the Domain attribute.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the Path attribute.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the Max-Age attribute in seconds.
    #[must_use]
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Set the Expires attribute.
    #[must_use]
    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Domain attribute, without a leading dot.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Path attribute.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Max-Age attribute in seconds.
    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    /// Expires attribute.
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    /// Secure attribute.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// HttpOnly attribute.
    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    /// SameSite attribute.
    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    /// When the cookie expires, relative to `now`. Max-Age wins over Expires.
    fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.max_age {
            Some(seconds) if seconds <= 0 => Some(now),
            Some(seconds) => {
                TimeDelta::try_seconds(seconds).and_then(|delta| now.checked_add_signed(delta))
            }
            None => self.expires,
        }
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];
        if let Some(domain) = &self.domain {
            parts.push(format!("Domain={domain}"));
        }
        if let Some(path) = &self.path {
            parts.push(format!("Path={path}"));
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={max_age}"));
        }
        if let Some(expires) = self.expires {
            parts.push(format!(
                "Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={same_site}"));
        }
        parts.join("; ")
    }
}

#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    domain: String,
    host_only: bool,
    path: String,
    secure: bool,
    expiry: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn matches(&self, url: &Url, now: DateTime<Utc>) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain_match = if self.host_only {
            host == self.domain
        } else {
            host == self.domain || host.ends_with(&format!(".{}", self.domain))
        };
        domain_match
            && path_matches(url.path(), &self.path)
            && (!self.secure || matches!(url.scheme(), "https" | "wss"))
            && self.expiry.map_or(true, |expiry| expiry > now)
    }
}

fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// Cookie storage shared by every request of a session.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Arc<Mutex<Vec<StoredCookie>>>,
}

impl CookieJar {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store every `Set-Cookie` of a response received from `url`.
    ///
    /// A cookie whose Max-Age is zero or negative, or whose Expires is in
    /// the past, removes the stored cookie with the same name, domain, and
    /// path.
    pub fn store(&self, url: &Url, headers: &HeaderMap) {
        let Some(host) = url.host_str() else {
            return;
        };
        let host = host.to_ascii_lowercase();
        let now = Utc::now();
        let mut cookies = self.cookies.lock();

        for cookie in SetCookie::parse_all(headers) {
            let (domain, host_only) = match cookie.domain() {
                Some(domain) if host == domain || host.ends_with(&format!(".{domain}")) => {
                    (domain.to_string(), false)
                }
                Some(domain) => {
                    tracing::debug!(cookie = cookie.name(), domain, host = %host, "rejecting cookie for foreign domain");
                    continue;
                }
                None => (host.clone(), true),
            };
            let path = cookie
                .path()
                .map_or_else(|| default_path(url), str::to_string);
            let expiry = cookie.expiry(now);

            cookies.retain(|c| !(c.name == cookie.name && c.domain == domain && c.path == path));
            if expiry.is_some_and(|expiry| expiry <= now) {
                continue;
            }
            cookies.push(StoredCookie {
                name: cookie.name,
                value: cookie.value,
                domain,
                host_only,
                path,
                secure: cookie.secure,
                expiry,
            });
        }
    }

    /// Cookies to send to `url`, as name/value pairs, longest path first.
    pub fn cookies_for(&self, url: &Url) -> Vec<(String, String)> {
        let now = Utc::now();
        let cookies = self.cookies.lock();
        let mut matching: Vec<&StoredCookie> =
            cookies.iter().filter(|c| c.matches(url, now)).collect();
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching
            .into_iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }

    /// The `Cookie` header value for `url`, if any cookie matches.
    pub fn header_value(&self, url: &Url) -> Option<String> {
        let pairs = self.cookies_for(url);
        if pairs.is_empty() {
            return None;
        }
        Some(
            pairs
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Number of stored cookies, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.cookies.lock().len()
    }

    /// Returns true if no cookie is stored.
    pub fn is_empty(&self) -> bool {
        self.cookies.lock().is_empty()
    }

    /// Remove every cookie.
    pub fn clear(&self) {
        self.cookies.lock().clear();
    }
}
