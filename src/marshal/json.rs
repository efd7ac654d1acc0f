//! JSON codec. Decoding never fails loudly: malformed input yields `None`.

use serde_json::Value;

/// Decode JSON text. Parse errors are logged at debug level and swallowed.
pub fn marshal(input: &str) -> Option<Value> {
    match serde_json::from_str(input) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "Discarding unparseable JSON payload");
            None
        }
    }
}

/// Encode a value as compact JSON text.
pub fn unmarshal(value: &Value) -> String {
    value.to_string()
}
