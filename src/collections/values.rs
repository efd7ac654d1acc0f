//! Case-sensitive map of JSON values, rendered as JSON.

use serde_json::Value;

use super::map::{MapStrategy, OrderedMap};
use crate::marshal::json;

/// Exact key matching, JSON codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainStrategy;

impl MapStrategy for PlainStrategy {
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
        match json::marshal(input) {
            Some(Value::Object(map)) => map.into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn encode(entries: &[(String, Value)]) -> String {
        json::unmarshal(&Value::Object(entries.iter().cloned().collect()))
    }
}

/// General purpose map (response cookies, ad-hoc collections).
pub type ValueMap = OrderedMap<PlainStrategy>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_get_and_overwrite() {
        let mut map = ValueMap::new();
        assert_eq!(map.put("a", 1), None);
        assert_eq!(map.put("a", 2), Some(json!(1)));
        assert_eq!(map.get("a"), Some(&json!(2)));
        assert_eq!(map.get("A"), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_contains_and_remove_sentinels() {
        let mut map: ValueMap = [("key", json!("v"))].into_iter().collect();
        assert_eq!(map.contains_key("key"), Some("key"));
        assert_eq!(map.contains_key("KEY"), None);
        assert_eq!(map.contains_value(&json!("v")), Some(&json!("v")));
        assert_eq!(map.contains_value(&json!("x")), None);
        assert_eq!(map.remove("missing"), None);
        assert_eq!(map.remove("key"), Some(json!("v")));
        assert!(map.is_empty());
    }

    #[test]
    fn test_put_collection_variants() {
        let mut map = ValueMap::new();
        map.put_collection(&json!({"a": 1, "b": [1, 2]}));
        map.put_collection(&json!(r#"{"c": true}"#));
        map.put_collection(&json!(42));
        map.put_collection(&Value::Null);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("c"), Some(&json!(true)));
    }

    #[test]
    fn test_put_all_is_idempotent() {
        let source = json!({"x": "1", "y": "2"});
        let mut once = ValueMap::new();
        once.put_collection(&source);
        let mut twice = once.clone();
        twice.put_collection(&source);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_display_renders_json() {
        let mut map = ValueMap::new();
        map.put("b", "x");
        map.put("a", 1);
        let rendered = map.to_string();
        assert_eq!(json::marshal(&rendered), Some(json!({"a": 1, "b": "x"})));
    }

    #[test]
    fn test_clear_makes_reusable() {
        let mut map = ValueMap::from_json(&json!({"a": 1}));
        map.clear();
        assert!(map.is_empty());
        map.put("a", 3);
        assert_eq!(map.get("a"), Some(&json!(3)));
    }
}
