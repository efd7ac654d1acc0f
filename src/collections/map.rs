//! Ordered key/value container parameterized by a matching strategy.
//!
//! # Responsibilities
//! - Store entries in insertion order with unique keys
//! - Resolve keys through the strategy (exact or case-insensitive)
//! - Merge from other maps, JSON objects and encoded strings
//! - Render through the strategy's wire encoder
//!
//! # Design Decisions
//! - One container, many strategies: headers and query maps are the same
//!   type with a different `MapStrategy`
//! - A matched key keeps its first-seen casing; `put` only swaps the value
//! - No operation fails: unusable merge input is ignored

use std::fmt;
use std::marker::PhantomData;
use std::mem;

use serde_json::{Map, Value};

/// Key matching, value conversion and wire codec for an `OrderedMap`.
pub trait MapStrategy {
    /// Stored value type.
    type Value: Clone + fmt::Debug + PartialEq;

    /// Does a stored key answer to a lookup key?
    fn key_matches(stored: &str, key: &str) -> bool;

    /// Does a stored value answer to a lookup value?
    fn value_matches(stored: &Self::Value, value: &Self::Value) -> bool {
        stored == value
    }

    /// Convert a JSON value into a stored value. `None` skips the entry.
    fn from_json(value: &Value) -> Option<Self::Value>;

    /// Convert a stored value to JSON.
    fn to_json(value: &Self::Value) -> Value;

    /// Decode a wire string into entries.
    fn decode(input: &str) -> Vec<(String, Self::Value)>;

    /// Encode entries into a wire string.
    fn encode(entries: &[(String, Self::Value)]) -> String;
}

/// Insertion-ordered map with strategy-defined key matching.
pub struct OrderedMap<S: MapStrategy> {
    entries: Vec<(String, S::Value)>,
    _strategy: PhantomData<S>,
}

impl<S: MapStrategy> OrderedMap<S> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            _strategy: PhantomData,
        }
    }

    /// Build a map from a wire string.
    pub fn from_encoded(input: &str) -> Self {
        let mut map = Self::new();
        map.put_encoded(input);
        map
    }

    /// Build a map from a JSON collection (object or encoded string).
    pub fn from_json(value: &Value) -> Self {
        let mut map = Self::new();
        map.put_collection(value);
        map
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(stored, _)| S::key_matches(stored, key))
    }

    /// Set a value, reusing the stored key when one matches.
    /// Returns the previous value.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<S::Value>) -> Option<S::Value> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(index) => Some(mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Merge key/value pairs, later pairs overwriting earlier ones.
    pub fn put_all<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<S::Value>,
    {
        for (key, value) in entries {
            self.put(key, value);
        }
    }

    /// Merge every entry of another map, whatever its strategy.
    pub fn put_map<T: MapStrategy>(&mut self, other: &OrderedMap<T>) {
        for (key, value) in &other.entries {
            if let Some(value) = S::from_json(&T::to_json(value)) {
                self.put(key.clone(), value);
            }
        }
    }

    /// Merge entries decoded from a wire string.
    pub fn put_encoded(&mut self, input: &str) {
        self.put_all(S::decode(input));
    }

    /// Merge a dynamic collection: objects merge entry by entry, strings are
    /// decoded, anything else is ignored.
    pub fn put_collection(&mut self, collection: &Value) {
        match collection {
            Value::Object(map) => {
                for (key, value) in map {
                    if let Some(value) = S::from_json(value) {
                        self.put(key.clone(), value);
                    }
                }
            }
            Value::String(encoded) => self.put_encoded(encoded),
            _ => {}
        }
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&S::Value> {
        self.position(key).map(|index| &self.entries[index].1)
    }

    /// The stored key answering to `key`, in its stored casing.
    pub fn contains_key(&self, key: &str) -> Option<&str> {
        self.position(key).map(|index| self.entries[index].0.as_str())
    }

    /// The first stored value answering to `value`.
    pub fn contains_value(&self, value: &S::Value) -> Option<&S::Value> {
        self.entries
            .iter()
            .map(|(_, stored)| stored)
            .find(|stored| S::value_matches(stored, value))
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<S::Value> {
        self.position(key).map(|index| self.entries.remove(index).1)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &S::Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Stored keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// JSON object view of the map.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), S::to_json(value)))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl<S: MapStrategy> Default for OrderedMap<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MapStrategy> Clone for OrderedMap<S> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            _strategy: PhantomData,
        }
    }
}

impl<S: MapStrategy> fmt::Debug for OrderedMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<S: MapStrategy> PartialEq for OrderedMap<S> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<S: MapStrategy> fmt::Display for OrderedMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&S::encode(&self.entries))
    }
}

impl<S, K, V> FromIterator<(K, V)> for OrderedMap<S>
where
    S: MapStrategy,
    K: Into<String>,
    V: Into<S::Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.put_all(iter);
        map
    }
}

impl<S, K, V> Extend<(K, V)> for OrderedMap<S>
where
    S: MapStrategy,
    K: Into<String>,
    V: Into<S::Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.put_all(iter);
    }
}

impl<S: MapStrategy> IntoIterator for OrderedMap<S> {
    type Item = (String, S::Value);
    type IntoIter = std::vec::IntoIter<(String, S::Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
