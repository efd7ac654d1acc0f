//! Case-insensitive header map.
//!
//! Lookups ignore ASCII case, storage keeps the casing of the first
//! insertion, and rendering produces a `Field-Name: value\r\n` block.

use serde_json::Value;

use super::map::{MapStrategy, OrderedMap};
use crate::marshal::header;

/// Case-insensitive keys and values, header-block codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderStrategy;

impl MapStrategy for HeaderStrategy {
    type Value = String;

    fn key_matches(stored: &str, key: &str) -> bool {
        stored.eq_ignore_ascii_case(key)
    }

    fn value_matches(stored: &String, value: &String) -> bool {
        stored.eq_ignore_ascii_case(value)
    }

    fn from_json(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(crate::marshal::form::scalar)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            other => Some(other.to_string()),
        }
    }

    fn to_json(value: &String) -> Value {
        Value::String(value.clone())
    }

    fn decode(input: &str) -> Vec<(String, String)> {
        header::marshal(input)
    }

    fn encode(entries: &[(String, String)]) -> String {
        header::unmarshal(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// Request and response headers.
pub type Headers = OrderedMap<HeaderStrategy>;

impl OrderedMap<HeaderStrategy> {
    /// The `Content-Type` value, if set.
    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type").map(String::as_str)
    }

    /// Append to an existing value with `, `, or insert.
    pub fn append(&mut self, key: &str, value: &str) {
        let merged = match self.get(key) {
            Some(existing) if !existing.is_empty() => format!("{}, {}", existing, value),
            _ => value.to_string(),
        };
        self.put(key, merged);
    }
}
