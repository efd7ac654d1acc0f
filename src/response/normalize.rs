//! Response normalization.
//!
//! # Responsibilities
//! - Wrap raw headers in a case-insensitive map
//! - Extract cookies from `cookie` then `set-cookie` (later wins)
//! - Parse the body with the codec registered for its content type
//! - Classify the status and attach a non-fatal error for 4xx/5xx
//!
//! # Design Decisions
//! - Built once from head + collected body, never mutated afterwards
//! - Unparseable or unregistered bodies stay raw instead of failing

use std::borrow::Cow;

use bytes::Bytes;
use http::Version;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::decompress::ResponseStream;
use super::status::{StatusError, StatusInfo};
use crate::collections::{Headers, ValueMap};
use crate::marshal::{cookie, BodyMarshals};
use crate::transport::ResponseHead;

/// Content type reported when a response has none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Collected body before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBody {
    Bytes(Bytes),
    Text(String),
}

impl RawBody {
    /// Body as text, lossily decoding bytes.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RawBody::Bytes(b) => String::from_utf8_lossy(b),
            RawBody::Text(t) => Cow::Borrowed(t),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawBody::Bytes(b) => b.is_empty(),
            RawBody::Text(t) => t.is_empty(),
        }
    }
}

impl Default for RawBody {
    fn default() -> Self {
        RawBody::Bytes(Bytes::new())
    }
}

/// Body after content-type parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Bytes(Bytes),
    Text(String),
    /// Decoded by the registered codec.
    Parsed(Value),
}

impl ResponseBody {
    /// The body as a JSON value (text becomes a string).
    pub fn to_value(&self) -> Value {
        match self {
            ResponseBody::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            ResponseBody::Text(t) => Value::String(t.clone()),
            ResponseBody::Parsed(v) => v.clone(),
        }
    }

    pub fn as_parsed(&self) -> Option<&Value> {
        match self {
            ResponseBody::Parsed(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl From<&RawBody> for ResponseBody {
    fn from(raw: &RawBody) -> Self {
        match raw {
            RawBody::Bytes(b) => ResponseBody::Bytes(b.clone()),
            RawBody::Text(t) => ResponseBody::Text(t.clone()),
        }
    }
}

/// A completed request's normalized result.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusInfo,
    pub status_text: Option<String>,
    /// Final URL after redirects.
    pub url: String,
    pub version: Version,
    /// Headers; repeated names are joined with `, `.
    pub headers: Headers,
    /// Header pairs exactly as received.
    pub raw_headers: Vec<(String, String)>,
    pub cookies: ValueMap,
    pub raw_body: RawBody,
    pub body: ResponseBody,
    /// Present for 4xx and 5xx responses.
    pub error: Option<StatusError>,
}

impl Response {
    /// Build the normalized response from a head and its collected body.
    pub fn normalize(head: ResponseHead, raw_body: RawBody, marshals: &BodyMarshals) -> Self {
        let headers = wrap_headers(&head.headers);
        let cookies = extract_cookies(&head);
        let body = parse_body(&raw_body, headers.content_type(), marshals);
        let status = StatusInfo::classify(head.status);
        let error = status
            .is_error()
            .then(|| StatusError::new(head.status, Some(&body.to_value())));

        Self {
            status,
            status_text: head.reason,
            url: head.url,
            version: head.version,
            headers,
            raw_headers: head.headers,
            cookies,
            raw_body,
            body,
            error,
        }
    }

    /// Status code.
    pub fn code(&self) -> u16 {
        self.status.code
    }

    /// `code / 100`.
    pub fn status_range(&self) -> u16 {
        self.status.range
    }

    /// 2xx.
    pub fn ok(&self) -> bool {
        self.status.ok
    }

    /// Content type, or its base mimetype when `parse` is set.
    /// Defaults to `application/octet-stream`.
    pub fn content_type(&self, parse: bool) -> String {
        let value = self.headers.content_type().unwrap_or(DEFAULT_CONTENT_TYPE);
        if parse {
            crate::marshal::body::base_type(value)
        } else {
            value.to_string()
        }
    }

    /// A cookie from the response.
    pub fn cookie(&self, name: &str) -> Option<&Value> {
        self.cookies.get(name)
    }

    /// Raw body as text.
    pub fn text(&self) -> Cow<'_, str> {
        self.raw_body.as_text()
    }

    /// Deserialize the parsed body.
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        self.body
            .as_parsed()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

/// A response whose body is consumed incrementally.
#[derive(Debug)]
pub struct StreamedResponse {
    /// Everything but the body, normalized; `body` and `raw_body` are empty.
    pub head: Response,
    /// Decompressing body stream. Call `set_encoding` for text chunks.
    pub body: ResponseStream,
}

impl StreamedResponse {
    pub fn new(head: ResponseHead, body: ResponseStream, marshals: &BodyMarshals) -> Self {
        Self {
            head: Response::normalize(head, RawBody::default(), marshals),
            body,
        }
    }

    /// Collect the rest of the body into a full response.
    pub async fn into_response(self, marshals: &BodyMarshals) -> Result<Response, crate::transport::TransportError> {
        let raw_body = self.body.collect().await?;
        let mut response = self.head;
        response.body = parse_body(&raw_body, response.headers.content_type(), marshals);
        if response.status.is_error() {
            response.error = Some(StatusError::new(response.status.code, Some(&response.body.to_value())));
        }
        response.raw_body = raw_body;
        Ok(response)
    }
}

fn wrap_headers(raw: &[(String, String)]) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in raw {
        headers.append(name, value);
    }
    headers
}

/// `cookie` header first, then every `set-cookie` on top. Only the leading
/// `name=value` of a `set-cookie` is a cookie; the rest are attributes.
fn extract_cookies(head: &ResponseHead) -> ValueMap {
    let mut cookies = ValueMap::new();
    cookies.put_all(cookie::marshal_all(head.header_all("cookie")));
    let set_cookies = head
        .header_all("set-cookie")
        .map(|value| value.split(';').next().unwrap_or_default());
    cookies.put_all(cookie::marshal_all(set_cookies));
    cookies
}

fn parse_body(raw: &RawBody, content_type: Option<&str>, marshals: &BodyMarshals) -> ResponseBody {
    let Some(codec) = content_type.and_then(|ct| marshals.lookup(ct)) else {
        return ResponseBody::from(raw);
    };
    let text = raw.as_text();
    if text.trim().is_empty() {
        return ResponseBody::from(raw);
    }
    match codec.marshal(&text) {
        Some(value) => ResponseBody::Parsed(value),
        None => ResponseBody::from(raw),
    }
}
