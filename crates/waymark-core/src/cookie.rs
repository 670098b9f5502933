//! Response cookies.
//!
//! A terminal response may carry cookie instructions keyed by cookie name.
//! The dispatcher hands each one to the [`ResponseWriter`]; writers that
//! produce raw HTTP use [`set_cookie_header`] and [`clear_cookie_header`] to
//! render `Set-Cookie` values.
//!
//! [`ResponseWriter`]: crate::ResponseWriter

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// What to do with one named cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCookie {
    /// Remove the cookie from the client.
    Clear,
    /// Set the cookie to a plain string value.
    Value(String),
    /// Set the cookie with attributes.
    WithOptions {
        /// Cookie value.
        value: String,
        /// Cookie attributes.
        options: CookieOptions,
    },
}

impl From<&str> for ResponseCookie {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for ResponseCookie {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<Option<String>> for ResponseCookie {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Clear, Self::Value)
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    /// Cookie is sent with cross-site requests.
    None,
    /// Cookie is sent with same-site and cross-site top-level navigations.
    #[default]
    Lax,
    /// Cookie is only sent with same-site requests.
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

/// `Priority` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookiePriority {
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

impl fmt::Display for CookiePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Attributes for a cookie being set.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use waymark_core::{set_cookie_header, CookieOptions, SameSite};
///
/// let options = CookieOptions::new()
///     .path("/")
///     .http_only(true)
///     .secure(true)
///     .same_site(SameSite::Strict)
///     .max_age(Duration::from_secs(3600));
///
/// let header = set_cookie_header("session", "abc123", Some(&options));
/// assert_eq!(
///     header,
///     "session=abc123; Path=/; Max-Age=3600; Secure; HttpOnly; SameSite=Strict"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    /// Absolute expiry.
    pub expires: Option<DateTime<Utc>>,
    /// `Path` attribute.
    pub path: Option<String>,
    /// `Domain` attribute.
    pub domain: Option<String>,
    /// `Secure` flag.
    pub secure: bool,
    /// `HttpOnly` flag.
    pub http_only: bool,
    /// `SameSite` attribute.
    pub same_site: Option<SameSite>,
    /// Relative expiry.
    pub max_age: Option<Duration>,
    /// `Priority` attribute.
    pub priority: Option<CookiePriority>,
    /// `Partitioned` flag.
    pub partitioned: bool,
    /// Whether the transport should sign the value.
    ///
    /// Signing needs a secret the transport owns; writers without one
    /// ignore this flag.
    pub signed: bool,
}

impl CookieOptions {
    /// Creates empty cookie options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `Expires` attribute.
    #[must_use]
    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Sets the `Path` attribute.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the `Domain` attribute.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the `Secure` flag.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the `HttpOnly` flag.
    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Sets the `SameSite` attribute.
    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Sets the `Max-Age` attribute.
    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Sets the `Priority` attribute.
    #[must_use]
    pub fn priority(mut self, priority: CookiePriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the `Partitioned` flag.
    #[must_use]
    pub fn partitioned(mut self, partitioned: bool) -> Self {
        self.partitioned = partitioned;
        self
    }

    /// Requests a signed cookie.
    #[must_use]
    pub fn signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }
}

fn http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Renders a `Set-Cookie` header value.
pub fn set_cookie_header(name: &str, value: &str, options: Option<&CookieOptions>) -> String {
    let mut parts = vec![format!("{name}={value}")];

    let Some(options) = options else {
        return parts.join("; ");
    };

    if let Some(ref domain) = options.domain {
        parts.push(format!("Domain={domain}"));
    }

    if let Some(ref path) = options.path {
        parts.push(format!("Path={path}"));
    }

    if let Some(max_age) = options.max_age {
        parts.push(format!("Max-Age={}", max_age.as_secs()));
    }

    if let Some(ref expires) = options.expires {
        parts.push(format!("Expires={}", http_date(expires)));
    }

    if options.secure {
        parts.push("Secure".to_string());
    }

    if options.http_only {
        parts.push("HttpOnly".to_string());
    }

    if let Some(same_site) = options.same_site {
        parts.push(format!("SameSite={same_site}"));
    }

    if let Some(priority) = options.priority {
        parts.push(format!("Priority={priority}"));
    }

    if options.partitioned {
        parts.push("Partitioned".to_string());
    }

    parts.join("; ")
}

/// Renders a `Set-Cookie` header value that removes the cookie.
pub fn clear_cookie_header(name: &str) -> String {
    format!("{name}=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
}
