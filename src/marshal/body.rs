//! Content-type keyed body codec registry.
//!
//! # Responsibilities
//! - Map a response or request content type to the codec that reads it
//! - Encode structured request bodies for the selected content type
//!
//! # Design Decisions
//! - Lookup uses the base mimetype (before `;`), compared lowercase
//! - Any `+json` structured-syntax type falls back to the JSON codec
//! - The registry is built once and shared read-only through the client

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{form, json};

/// `application/x-www-form-urlencoded`.
pub const FORM: &str = "application/x-www-form-urlencoded";

/// `application/json`.
pub const JSON: &str = "application/json";

/// A string/structure codec for a body content type.
pub trait BodyCodec: Send + Sync {
    /// Decode wire text into a structure. `None` when the text is unreadable.
    fn marshal(&self, input: &str) -> Option<Value>;

    /// Encode a structure into wire text.
    fn unmarshal(&self, value: &Value) -> String;
}

/// Form codec for `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl BodyCodec for FormCodec {
    fn marshal(&self, input: &str) -> Option<Value> {
        Some(form::marshal(input))
    }

    fn unmarshal(&self, value: &Value) -> String {
        form::unmarshal(value)
    }
}

/// JSON codec for `application/json` and friends.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BodyCodec for JsonCodec {
    fn marshal(&self, input: &str) -> Option<Value> {
        json::marshal(input)
    }

    fn unmarshal(&self, value: &Value) -> String {
        json::unmarshal(value)
    }
}

/// Registry of body codecs by content type.
#[derive(Clone)]
pub struct BodyMarshals {
    by_type: Vec<(String, Arc<dyn BodyCodec>)>,
}

impl BodyMarshals {
    /// An empty registry. Only the `+json` suffix rule applies.
    pub fn empty() -> Self {
        Self { by_type: Vec::new() }
    }

    /// Register (or replace) the codec for a mimetype.
    pub fn register(&mut self, mime: impl Into<String>, codec: Arc<dyn BodyCodec>) {
        let mime = mime.into().to_ascii_lowercase();
        match self.by_type.iter_mut().find(|(m, _)| *m == mime) {
            Some(entry) => entry.1 = codec,
            None => self.by_type.push((mime, codec)),
        }
    }

    /// Codec for a full content-type header value, if one is registered.
    pub fn lookup(&self, content_type: &str) -> Option<&dyn BodyCodec> {
        let base = base_type(content_type);
        if let Some((_, codec)) = self.by_type.iter().find(|(m, _)| *m == base) {
            return Some(codec.as_ref());
        }
        if base.ends_with("+json") {
            return Some(&JsonCodec);
        }
        None
    }

    /// True when the content type decodes as JSON.
    pub fn is_json(&self, content_type: &str) -> bool {
        let base = base_type(content_type);
        base == JSON || base.ends_with("+json") || base == "text/javascript"
    }

    /// True when the content type is the urlencoded form type.
    pub fn is_form(&self, content_type: &str) -> bool {
        base_type(content_type) == FORM
    }
}

impl Default for BodyMarshals {
    fn default() -> Self {
        let mut marshals = Self::empty();
        marshals.register(FORM, Arc::new(FormCodec));
        marshals.register(JSON, Arc::new(JsonCodec));
        marshals.register("text/javascript", Arc::new(JsonCodec));
        marshals
    }
}

impl fmt::Debug for BodyMarshals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.by_type.iter().map(|(mime, _)| mime))
            .finish()
    }
}

/// Base mimetype of a content-type value: `Text/HTML; charset=x` → `text/html`.
pub fn base_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
