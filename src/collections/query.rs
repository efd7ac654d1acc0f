//! Query-parameter map: case-sensitive keys, rendered as a form string.

use serde_json::Value;

use super::map::{MapStrategy, OrderedMap};
use crate::marshal::form;

/// Exact key matching, form codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStrategy;

impl MapStrategy for QueryStrategy {
    type Value = Value;

    fn key_matches(stored: &str, key: &str) -> bool {
        stored == key
    }

    fn from_json(value: &Value) -> Option<Value> {
        Some(value.clone())
    }

    fn to_json(value: &Value) -> Value {
        value.clone()
    }

    fn decode(input: &str) -> Vec<(String, Value)> {
        match form::marshal(input) {
            Value::Object(map) => map.into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn encode(entries: &[(String, Value)]) -> String {
        form::unmarshal_pairs(entries.iter().map(|(k, v)| (k, v)))
    }
}

/// URL query parameters.
pub type Query = OrderedMap<QueryStrategy>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Headers;
    use serde_json::json;

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut query = Query::new();
        query.put("page", 1);
        query.put("Page", 2);
        assert_eq!(query.len(), 2);
        assert_eq!(query.contains_key("PAGE"), None);
    }

    #[test]
    fn test_encoding_keeps_insertion_order() {
        let mut query = Query::new();
        query.put("z", "last word");
        query.put("a", json!(["1", "2"]));
        assert_eq!(query.to_string(), "z=last%20word&a=1&a=2");
    }

    #[test]
    fn test_merge_from_string_and_other_maps() {
        let mut query = Query::from_encoded("q=rust&lang=en");
        let mut headers = Headers::new();
        headers.put("lang", "fr");
        query.put_map(&headers);
        assert_eq!(query.get("lang"), Some(&json!("fr")));
        assert_eq!(query.get("q"), Some(&json!("rust")));
    }
}
