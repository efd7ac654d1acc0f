//! Transport collaborator: the part that actually talks to the network.
//!
//! # Data Flow
//! ```text
//! Request::end()
//!     ├── perform(TransportOptions)  → generic.rs (reqwest: redirects, proxy, TLS, jar)
//!     └── dispatch(RawRequest)       → direct.rs  (hyper-util: buffered body, title-cased headers)
//!             ↓
//!     Option<RawResponse { head, body: ByteStream }>
//! ```
//!
//! # Design Decisions
//! - One object-safe trait so tests can swap in a recording transport
//! - `Ok(None)` is how a transport reports "finished without a response"
//! - Bodies stay as raw byte streams; decoding happens in `response`

pub mod direct;
pub mod generic;
pub mod jar;

use std::fmt;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::Stream;
use http::Version;
use thiserror::Error;
use url::Url;

use crate::request::TransportOptions;

pub use direct::DirectClient;
pub use generic::HttpTransport;
pub use jar::{CookieJar, CookieStore, JarOptions, MemoryCookieStore};

/// Chunked byte stream used for request uploads and response bodies.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Result of a transport call.
pub type TransportResult = Result<Option<RawResponse>, TransportError>;

/// Network-level failures. No response exists when one of these is returned.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote end refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// DNS, TLS or socket setup failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The URL could not be parsed or has no host.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("io error: {0}")]
    Io(io::Error),

    /// Protocol-level failure reported by the HTTP client.
    #[error("http error: {0}")]
    Http(String),

    /// Reading or writing a body stream failed.
    #[error("body error: {0}")]
    Body(String),

    /// The content-encoding stream could not be inflated.
    #[error("decompression failed: {0}")]
    Decompress(String),
}

impl TransportError {
    /// Stable errno-style code for matching on failure kinds.
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::ConnectionRefused(_) => "ECONNREFUSED",
            TransportError::Connect(_) => "ECONNFAILED",
            TransportError::Timeout => "ETIMEDOUT",
            TransportError::InvalidUrl { .. } => "EINVALIDURL",
            TransportError::InvalidHeader(_) => "EINVALIDHEADER",
            TransportError::Io(_) => "EIO",
            TransportError::Http(_) => "EPROTO",
            TransportError::Body(_) => "EBODY",
            TransportError::Decompress(_) => "EDECOMPRESS",
        }
    }

    pub(crate) fn invalid_url(url: &str, reason: impl fmt::Display) -> Self {
        TransportError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => TransportError::ConnectionRefused(err.to_string()),
            io::ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Io(err),
        }
    }
}

/// True when an `io::Error` with kind `ConnectionRefused` sits in the source chain.
pub(crate) fn is_connection_refused(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<io::Error>() {
            if io.kind() == io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub reason: Option<String>,
    pub version: Version,
    /// Final URL after any redirects.
    pub url: String,
    /// Header pairs in arrival order; repeated names appear repeatedly.
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn new(status: u16, url: impl Into<String>) -> Self {
        Self {
            status,
            reason: http::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string),
            version: Version::HTTP_11,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a header, in order.
    pub fn header_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as handed over by the transport: head plus undecoded body.
pub struct RawResponse {
    pub head: ResponseHead,
    pub body: ByteStream,
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// A fully built request for the direct path: options plus the exact body bytes.
#[derive(Debug)]
pub struct RawRequest {
    pub options: TransportOptions,
    pub body: Bytes,
}

impl RawRequest {
    /// Fold the body back into generic options.
    pub fn into_options(self) -> TransportOptions {
        let mut options = self.options;
        options.body = crate::request::Body::Bytes(self.body);
        options
    }
}

/// The network collaborator consumed by `Request::end`.
pub trait Transport: Send + Sync {
    /// Issue a request from accumulated options.
    fn perform(&self, options: TransportOptions) -> BoxFuture<'_, TransportResult>;

    /// Issue a pre-built request whose headers must go out as given.
    fn dispatch(&self, request: RawRequest) -> BoxFuture<'_, TransportResult> {
        self.perform(request.into_options())
    }
}

/// Parse the request URL and append the `qs` option.
pub(crate) fn build_url(options: &TransportOptions) -> Result<Url, TransportError> {
    let mut url = Url::parse(&options.url).map_err(|e| TransportError::invalid_url(&options.url, e))?;
    if !options.qs.is_empty() {
        let encoded = options.qs.to_string();
        let query = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{}&{}", existing, encoded),
            _ => encoded,
        };
        url.set_query(Some(&query));
    }
    Ok(url)
}
