//! Transport-ready request options.
//!
//! # Responsibilities
//! - Carry everything a transport needs for one call
//! - Seed per-request values from the client's configured defaults
//!
//! # Design Decisions
//! - Options the built-in transport does not interpret (oauth, hawk, aws,
//!   ...) travel untyped in `extra` so custom transports can read them

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::auth::Auth;
use super::body::Body;
use super::multipart::{MultipartForm, RelatedPart};
use crate::collections::{Headers, Query};
use crate::config::RequestDefaults;
use crate::transport::CookieJar;

/// Redirect hop limit when nothing else is configured.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// How the response body is turned into text, if at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseEncoding {
    /// Decode as UTF-8 (invalid sequences replaced).
    #[default]
    Utf8,
    /// Decode as ISO-8859-1.
    Latin1,
    /// Keep raw bytes.
    Binary,
}

/// Options handed to `Transport::perform`.
#[derive(Debug)]
pub struct TransportOptions {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    /// Extra query parameters appended by the transport.
    pub qs: Query,
    pub body: Body,
    /// Encode a structured body as JSON.
    pub json: bool,
    /// Urlencoded form payload.
    pub form: Option<Value>,
    /// Streaming `multipart/form-data` parts, written by the transport.
    pub form_data: Option<MultipartForm>,
    /// `multipart/related` segments.
    pub multipart: Vec<RelatedPart>,
    pub auth: Option<Auth>,
    pub timeout: Option<Duration>,
    pub proxy: Option<String>,
    /// Follow redirects for GET and HEAD.
    pub follow_redirect: bool,
    /// Follow redirects for every method.
    pub follow_all_redirects: bool,
    pub max_redirects: usize,
    pub encoding: ResponseEncoding,
    /// Idle connections kept per host.
    pub pool: Option<usize>,
    pub jar: Option<Arc<CookieJar>>,
    pub strict_ssl: bool,
    pub local_address: Option<IpAddr>,
    /// Pass-through options for custom transports.
    pub extra: BTreeMap<String, Value>,
}

impl TransportOptions {
    /// Options with stock defaults.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Headers::new(),
            qs: Query::new(),
            body: Body::Empty,
            json: false,
            form: None,
            form_data: None,
            multipart: Vec::new(),
            auth: None,
            timeout: None,
            proxy: None,
            follow_redirect: true,
            follow_all_redirects: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            encoding: ResponseEncoding::Utf8,
            pool: None,
            jar: None,
            strict_ssl: true,
            local_address: None,
            extra: BTreeMap::new(),
        }
    }

    /// Options seeded from configured defaults.
    pub fn from_defaults(method: Method, url: impl Into<String>, defaults: &RequestDefaults) -> Self {
        let mut options = Self::new(method, url);
        options.headers.put_all(defaults.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        options.timeout = defaults.timeout_ms.map(Duration::from_millis);
        options.proxy = defaults.proxy.clone();
        options.follow_redirect = defaults.follow_redirect;
        options.follow_all_redirects = defaults.follow_all_redirects;
        options.max_redirects = defaults.max_redirects;
        options.encoding = defaults.encoding;
        options.pool = defaults.pool_max_idle;
        options.strict_ssl = defaults.strict_ssl;
        options
    }

    /// Whether redirects are followed for this request's method.
    pub fn follows_redirects(&self) -> bool {
        if self.method == Method::GET || self.method == Method::HEAD {
            self.follow_redirect
        } else {
            self.follow_all_redirects
        }
    }

    /// True when every payload can be rebuilt for a second attempt.
    pub fn is_replayable(&self) -> bool {
        self.body.is_replayable()
            && self.form_data.is_none()
            && self.multipart.iter().all(|part| part.body.is_replayable())
    }
}
