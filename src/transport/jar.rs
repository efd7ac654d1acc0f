//! Cookie jar shared between requests.
//!
//! # Responsibilities
//! - Parse `Set-Cookie` values and store them per domain/path
//! - Produce the `Cookie` header for a URL
//! - Delegate storage to a pluggable `CookieStore`
//!
//! # Design Decisions
//! - `Max-Age <= 0` deletes; `Expires` is not interpreted (session cookie)
//! - Public-suffix rejection is opt-in and uses a short built-in list plus
//!   the "no dot" rule for top-level labels

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use url::Url;

/// Multi-label public suffixes rejected as cookie domains.
const KNOWN_PUBLIC_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "org.au", "co.jp", "co.nz",
    "com.br", "com.cn", "github.io",
];

/// Why a cookie was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CookieError {
    #[error("invalid cookie url: {0}")]
    InvalidUrl(String),

    #[error("malformed cookie: {0}")]
    Malformed(String),

    #[error("cookie domain {0} is a public suffix")]
    PublicSuffix(String),

    #[error("cookie domain {domain} does not match host {host}")]
    DomainMismatch { domain: String, host: String },
}

/// A cookie as kept by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Set when no `Domain` attribute was given: only the exact host matches.
    pub host_only: bool,
    pub secure: bool,
    pub http_only: bool,
    pub expires: Option<SystemTime>,
}

impl StoredCookie {
    fn is_expired(&self, now: SystemTime) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    fn matches(&self, host: &str, path: &str, secure: bool) -> bool {
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(host, &self.domain)
        };
        domain_ok && path_matches(path, &self.path) && (!self.secure || secure)
    }
}

/// Storage backend for a `CookieJar`.
pub trait CookieStore: Send + Sync {
    /// Insert or replace the cookie with the same name, domain and path.
    fn put(&self, cookie: StoredCookie);

    /// Delete a cookie.
    fn remove(&self, domain: &str, path: &str, name: &str);

    /// Unexpired cookies applicable to a request.
    fn matching(&self, host: &str, path: &str, secure: bool) -> Vec<StoredCookie>;
}

/// Process-memory store.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<Vec<StoredCookie>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cookies, expired ones included.
    pub fn len(&self) -> usize {
        self.cookies.lock().expect("cookie store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for MemoryCookieStore {
    fn put(&self, cookie: StoredCookie) {
        let mut cookies = self.cookies.lock().expect("cookie store poisoned");
        cookies.retain(|c| !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path));
        cookies.push(cookie);
    }

    fn remove(&self, domain: &str, path: &str, name: &str) {
        let mut cookies = self.cookies.lock().expect("cookie store poisoned");
        cookies.retain(|c| !(c.name == name && c.domain == domain && c.path == path));
    }

    fn matching(&self, host: &str, path: &str, secure: bool) -> Vec<StoredCookie> {
        let now = SystemTime::now();
        let mut cookies = self.cookies.lock().expect("cookie store poisoned");
        cookies.retain(|c| !c.is_expired(now));
        cookies
            .iter()
            .filter(|c| c.matches(host, path, secure))
            .cloned()
            .collect()
    }
}

/// Options for `CookieJar::with_options`.
#[derive(Clone, Default)]
pub struct JarOptions {
    /// Custom backend; memory when unset.
    pub store: Option<Arc<dyn CookieStore>>,
    /// Refuse cookies scoped to a public suffix.
    pub reject_public_suffixes: bool,
}

impl fmt::Debug for JarOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JarOptions")
            .field("custom_store", &self.store.is_some())
            .field("reject_public_suffixes", &self.reject_public_suffixes)
            .finish()
    }
}

/// Cookie jar handed to the transport through the `jar` option.
pub struct CookieJar {
    store: Arc<dyn CookieStore>,
    reject_public_suffixes: bool,
}

impl CookieJar {
    /// Jar backed by memory.
    pub fn new() -> Self {
        Self::with_options(JarOptions::default())
    }

    pub fn with_options(options: JarOptions) -> Self {
        Self {
            store: options
                .store
                .unwrap_or_else(|| Arc::new(MemoryCookieStore::new())),
            reject_public_suffixes: options.reject_public_suffixes,
        }
    }

    /// Store a `Set-Cookie` value received from (or destined for) `url`.
    pub fn set_cookie(&self, cookie: &str, url: &str) -> Result<(), CookieError> {
        let url = Url::parse(url).map_err(|e| CookieError::InvalidUrl(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| CookieError::InvalidUrl(url.to_string()))?
            .to_ascii_lowercase();

        let mut fragments = cookie.split(';');
        let (name, value) = fragments
            .next()
            .and_then(|pair| pair.split_once('='))
            .ok_or_else(|| CookieError::Malformed(cookie.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CookieError::Malformed(cookie.to_string()));
        }

        let mut stored = StoredCookie {
            name: name.to_string(),
            value: value.trim().to_string(),
            domain: host.clone(),
            path: default_path(url.path()),
            host_only: true,
            secure: false,
            http_only: false,
            expires: None,
        };
        let mut max_age: Option<i64> = None;

        for attribute in fragments {
            let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
            let val = val.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "domain" if !val.is_empty() => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    if self.reject_public_suffixes && is_public_suffix(&domain) {
                        return Err(CookieError::PublicSuffix(domain));
                    }
                    if !domain_matches(&host, &domain) {
                        return Err(CookieError::DomainMismatch { domain, host });
                    }
                    stored.domain = domain;
                    stored.host_only = false;
                }
                "path" if val.starts_with('/') => stored.path = val.to_string(),
                "secure" => stored.secure = true,
                "httponly" => stored.http_only = true,
                "max-age" => max_age = val.parse().ok(),
                _ => {}
            }
        }

        match max_age {
            Some(seconds) if seconds <= 0 => {
                self.store.remove(&stored.domain, &stored.path, &stored.name);
                return Ok(());
            }
            Some(seconds) => {
                // past the representable range means no expiry
                stored.expires = SystemTime::now().checked_add(Duration::from_secs(seconds as u64));
            }
            None => {}
        }

        tracing::trace!(name = %stored.name, domain = %stored.domain, "Storing cookie");
        self.store.put(stored);
        Ok(())
    }

    /// Alias of `set_cookie`.
    pub fn add(&self, cookie: &str, url: &str) -> Result<(), CookieError> {
        self.set_cookie(cookie, url)
    }

    /// `Cookie` header value for a request to `url` (empty when none apply).
    pub fn get_cookie_string(&self, url: &str) -> String {
        let Ok(url) = Url::parse(url) else {
            return String::new();
        };
        let Some(host) = url.host_str() else {
            return String::new();
        };
        let host = host.to_ascii_lowercase();
        let secure = url.scheme() == "https";

        let mut cookies = self.store.matching(&host, url.path(), secure);
        // longer paths first
        cookies.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Alias of `get_cookie_string`.
    pub fn cookie_string(&self, url: &str) -> String {
        self.get_cookie_string(url)
    }
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("reject_public_suffixes", &self.reject_public_suffixes)
            .finish_non_exhaustive()
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// Directory of the request path, per RFC 6265 default-path.
fn default_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

fn is_public_suffix(domain: &str) -> bool {
    !domain.contains('.') || KNOWN_PUBLIC_SUFFIXES.contains(&domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_for_matching_url() {
        let jar = CookieJar::new();
        jar.set_cookie("sid=abc; Path=/", "http://example.com/login").unwrap();
        jar.add("theme=dark", "http://example.com/app/settings").unwrap();

        assert_eq!(jar.get_cookie_string("http://example.com/"), "sid=abc");
        assert_eq!(jar.cookie_string("http://example.com/app/x"), "theme=dark; sid=abc");
        assert_eq!(jar.get_cookie_string("http://other.com/"), "");
    }

    #[test]
    fn test_domain_cookies_reach_subdomains() {
        let jar = CookieJar::new();
        jar.set_cookie("a=1; Domain=.example.com", "http://www.example.com/").unwrap();
        jar.set_cookie("b=2", "http://www.example.com/").unwrap();
        assert_eq!(jar.get_cookie_string("http://api.example.com/"), "a=1");
        assert_eq!(jar.get_cookie_string("http://notexample.com/"), "");
    }

    #[test]
    fn test_secure_and_max_age() {
        let jar = CookieJar::new();
        jar.set_cookie("s=1; Secure", "https://example.com/").unwrap();
        assert_eq!(jar.get_cookie_string("http://example.com/"), "");
        assert_eq!(jar.get_cookie_string("https://example.com/"), "s=1");

        jar.set_cookie("s=1; Secure; Max-Age=0", "https://example.com/").unwrap();
        assert_eq!(jar.get_cookie_string("https://example.com/"), "");
    }

    #[test]
    fn test_huge_max_age_never_expires() {
        let jar = CookieJar::new();
        jar.set_cookie("a=1; Max-Age=9223372036854775807", "http://example.com/").unwrap();
        assert_eq!(jar.get_cookie_string("http://example.com/"), "a=1");
    }

    #[test]
    fn test_rejections() {
        let strict = CookieJar::with_options(JarOptions {
            reject_public_suffixes: true,
            ..JarOptions::default()
        });
        assert_eq!(
            strict.set_cookie("a=1; Domain=co.uk", "http://shop.co.uk/"),
            Err(CookieError::PublicSuffix("co.uk".into()))
        );
        assert!(matches!(
            strict.set_cookie("a=1; Domain=evil.com", "http://shop.co.uk/"),
            Err(CookieError::DomainMismatch { .. })
        ));
        assert!(matches!(strict.set_cookie("novalue", "http://x.com/"), Err(CookieError::Malformed(_))));
        assert!(matches!(strict.set_cookie("a=1", "not a url"), Err(CookieError::InvalidUrl(_))));

        let lenient = CookieJar::new();
        assert!(lenient.set_cookie("a=1; Domain=co.uk", "http://shop.co.uk/").is_ok());
    }

    #[test]
    fn test_custom_store_is_used() {
        let store = Arc::new(MemoryCookieStore::new());
        let jar = CookieJar::with_options(JarOptions {
            store: Some(store.clone()),
            reject_public_suffixes: false,
        });
        jar.set_cookie("a=1", "http://x.com/").unwrap();
        jar.set_cookie("a=2", "http://x.com/").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(jar.get_cookie_string("http://x.com/"), "a=2");
    }

    #[test]
    fn test_default_path() {
        assert_eq!(default_path("/"), "/");
        assert_eq!(default_path("/login"), "/");
        assert_eq!(default_path("/app/settings"), "/app");
        assert!(path_matches("/app/x", "/app"));
        assert!(!path_matches("/application", "/app"));
    }
}
