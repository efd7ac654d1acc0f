//! Multipart parts: form fields, attachments and related segments.
//!
//! # Responsibilities
//! - Normalize field values (arrays expand, objects become JSON)
//! - Represent attachments before and after resolution to byte streams
//! - Serialize `multipart/form-data` and `multipart/related` payloads
//!
//! # Design Decisions
//! - Attachments are resolved (file open, remote GET) by the builder at
//!   `end()`, so parts only ever hold paths/URLs until then
//! - Unknown scalar values are stringified rather than rejected

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use rand::Rng;
use serde_json::Value;

use super::body::{collect_stream, Body};
use crate::marshal::{body::JSON, form, json};
use crate::transport::{ByteStream, TransportError};

/// Content type used for attachments of unknown type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Per-part options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartOptions {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub known_length: Option<u64>,
    /// The value is already encoded; skip JSON encoding.
    pub marshalled: bool,
}

impl PartOptions {
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Value of a `field()` call before normalization.
pub enum FieldValue {
    Text(String),
    Bytes(Bytes),
    Stream(ByteStream),
    Json(Value),
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Bytes> for FieldValue {
    fn from(b: Bytes) -> Self {
        FieldValue::Bytes(b)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Bytes(Bytes::from(b))
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Json(v)
    }
}

impl From<ByteStream> for FieldValue {
    fn from(stream: ByteStream) -> Self {
        FieldValue::Stream(stream)
    }
}

/// Source of an `attach()` call.
pub enum Attachment {
    /// Local file, opened through the file collaborator.
    Path(PathBuf),
    /// `http(s)://` resource, fetched through the transport.
    Url(String),
    Bytes(Bytes),
    Stream(ByteStream),
}

impl Attachment {
    fn from_location(location: String) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Attachment::Url(location)
        } else {
            Attachment::Path(PathBuf::from(location))
        }
    }
}

impl From<&str> for Attachment {
    fn from(location: &str) -> Self {
        Attachment::from_location(location.to_string())
    }
}

impl From<String> for Attachment {
    fn from(location: String) -> Self {
        Attachment::from_location(location)
    }
}

impl From<PathBuf> for Attachment {
    fn from(path: PathBuf) -> Self {
        Attachment::Path(path)
    }
}

impl From<&Path> for Attachment {
    fn from(path: &Path) -> Self {
        Attachment::Path(path.to_path_buf())
    }
}

impl From<Bytes> for Attachment {
    fn from(b: Bytes) -> Self {
        Attachment::Bytes(b)
    }
}

impl From<ByteStream> for Attachment {
    fn from(stream: ByteStream) -> Self {
        Attachment::Stream(stream)
    }
}

/// Stored value of a part.
pub enum PartValue {
    Text(String),
    Bytes(Bytes),
    Stream(ByteStream),
    /// Unresolved local file.
    File(PathBuf),
    /// Unresolved remote resource.
    Remote(String),
}

impl PartValue {
    /// True once the value no longer needs a collaborator to produce bytes.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, PartValue::File(_) | PartValue::Remote(_))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, PartValue::Stream(_))
    }

    async fn into_bytes(self) -> Result<Bytes, TransportError> {
        match self {
            PartValue::Text(s) => Ok(Bytes::from(s)),
            PartValue::Bytes(b) => Ok(b),
            PartValue::Stream(stream) => collect_stream(stream).await,
            PartValue::File(path) => Err(TransportError::Body(format!(
                "attachment {} was not opened",
                path.display()
            ))),
            PartValue::Remote(url) => Err(TransportError::Body(format!(
                "attachment {} was not fetched",
                url
            ))),
        }
    }
}

impl fmt::Debug for PartValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            PartValue::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            PartValue::Stream(_) => f.write_str("Stream(..)"),
            PartValue::File(p) => f.debug_tuple("File").field(p).finish(),
            PartValue::Remote(u) => f.debug_tuple("Remote").field(u).finish(),
        }
    }
}

/// One named multipart field or attachment.
#[derive(Debug)]
pub struct Part {
    pub name: String,
    pub value: PartValue,
    pub attachment: bool,
    pub options: PartOptions,
}

/// Normalize a field value into zero or more parts.
pub(crate) fn expand_field(name: &str, value: FieldValue, options: PartOptions, out: &mut Vec<Part>) {
    let mut options = options;
    let value = match value {
        FieldValue::Text(s) => PartValue::Text(s),
        FieldValue::Bytes(b) => PartValue::Bytes(b),
        FieldValue::Stream(s) => PartValue::Stream(s),
        FieldValue::Json(Value::Array(items)) => {
            for item in items {
                expand_field(name, FieldValue::Json(item), options.clone(), out);
            }
            return;
        }
        FieldValue::Json(Value::Null) => return,
        FieldValue::Json(value @ Value::Object(_)) if !options.marshalled => {
            options.content_type.get_or_insert_with(|| JSON.to_string());
            PartValue::Text(json::unmarshal(&value))
        }
        FieldValue::Json(other) => PartValue::Text(form::scalar(&other)),
    };
    out.push(Part {
        name: name.to_string(),
        value,
        attachment: false,
        options,
    });
}

/// A `multipart/form-data` payload.
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl MultipartForm {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            boundary: generate_boundary(),
            parts,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `Content-Type` header value carrying the boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    /// Serialize every part, draining streams.
    pub async fn into_bytes(self) -> Result<Bytes, TransportError> {
        let mut out = BytesMut::new();
        for part in self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", escape_quotes(&part.name));
            if let Some(filename) = &part.options.filename {
                disposition.push_str(&format!("; filename=\"{}\"", escape_quotes(filename)));
            }
            out.extend_from_slice(disposition.as_bytes());
            out.extend_from_slice(b"\r\n");

            let content_type = match (&part.options.content_type, part.attachment) {
                (Some(ct), _) => Some(ct.as_str()),
                (None, true) => Some(OCTET_STREAM),
                (None, false) => None,
            };
            if let Some(ct) = content_type {
                out.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.value.into_bytes().await?);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Ok(out.freeze())
    }
}

impl fmt::Debug for MultipartForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartForm")
            .field("boundary", &self.boundary)
            .field("parts", &self.parts)
            .finish()
    }
}

/// One `multipart/related` segment added with `part()`.
#[derive(Debug)]
pub struct RelatedPart {
    pub content_type: Option<String>,
    pub body: Body,
}

impl RelatedPart {
    pub fn new(body: impl Into<Body>) -> Self {
        Self {
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_type(content_type: impl Into<String>, body: impl Into<Body>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            body: body.into(),
        }
    }
}

/// Serialize related parts under the given boundary.
pub async fn encode_related(parts: Vec<RelatedPart>, boundary: &str) -> Result<Bytes, TransportError> {
    let mut out = BytesMut::new();
    for part in parts {
        out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        if let Some(ct) = &part.content_type {
            out.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&part.body.into_bytes().await?);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    Ok(out.freeze())
}

/// Dashes followed by 24 random digits.
pub fn generate_boundary() -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..24)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    format!("--------------------------{}", digits)
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "%22")
}
