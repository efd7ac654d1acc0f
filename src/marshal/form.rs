//! `application/x-www-form-urlencoded` codec.
//!
//! # Design Decisions
//! - Decoding treats `+` as a space and percent-decodes keys and values
//! - Repeated keys collect into an array, `a[b]=c` builds nested objects
//! - Encoding flattens nested objects as `parent[child]` and arrays as
//!   repeated keys, so simple inputs survive a decode/encode cycle

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

/// Characters left untouched by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Decode a form string into an object.
pub fn marshal(input: &str) -> Value {
    let mut out = Map::new();
    for pair in input.trim_start_matches('?').split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        let path = key_path(&key);
        assign(&mut out, &path, Value::String(decode_component(value)));
    }
    Value::Object(out)
}

/// Encode a structure into a form string. Strings pass through as-is.
pub fn unmarshal(value: &Value) -> String {
    match value {
        Value::Object(map) => unmarshal_pairs(map.iter()),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

/// Encode ordered pairs, keeping their order in the output.
pub fn unmarshal_pairs<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut out = Vec::new();
    for (key, value) in pairs {
        flatten(key, value, &mut out);
    }
    out.join("&")
}

/// Percent-encode a single key or value.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

/// Percent-decode a single key or value.
pub fn decode_component(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// String form of a scalar: strings unquoted, everything else as JSON text.
pub fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(&format!("{}[{}]", prefix, key), child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten(prefix, item, out);
            }
        }
        Value::Null => out.push(format!("{}=", encode_component(prefix))),
        other => out.push(format!(
            "{}={}",
            encode_component(prefix),
            encode_component(&scalar(other))
        )),
    }
}

/// Split `a[b][c]` into `["a", "b", "c"]`. `a[]` yields `["a", ""]`.
fn key_path(key: &str) -> Vec<&str> {
    match key.find('[') {
        Some(open) if open > 0 && key.ends_with(']') => {
            let mut path = vec![&key[..open]];
            path.extend(key[open + 1..key.len() - 1].split("]["));
            path
        }
        _ => vec![key],
    }
}

fn assign(target: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    let leaf = rest.is_empty() || (rest.len() == 1 && rest[0].is_empty());
    if leaf {
        let force_array = !rest.is_empty();
        match target.get_mut(*head) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
            None => {
                let value = if force_array { Value::Array(vec![value]) } else { value };
                target.insert(head.to_string(), value);
            }
        }
        return;
    }

    let entry = target
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(child) = entry {
        assign(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_simple_pairs() {
        let decoded = marshal("a=1&b=hello%20world&c=x+y");
        assert_eq!(decoded, json!({"a": "1", "b": "hello world", "c": "x y"}));
    }

    #[test]
    fn test_decode_repeated_and_nested() {
        let decoded = marshal("tag=a&tag=b&user[name]=ann&user[role]=admin&ids[]=7");
        assert_eq!(
            decoded,
            json!({
                "tag": ["a", "b"],
                "user": {"name": "ann", "role": "admin"},
                "ids": ["7"]
            })
        );
    }

    #[test]
    fn test_decode_skips_empty_fragments() {
        assert_eq!(marshal("&&=x&flag"), json!({"flag": ""}));
    }

    #[test]
    fn test_encode_flattens_with_parent_key() {
        let encoded = unmarshal(&json!({"user": {"name": "a b"}, "tags": ["x", "y"], "n": 3}));
        assert_eq!(encoded, "n=3&tags=x&tags=y&user%5Bname%5D=a%20b");
    }

    #[test]
    fn test_round_trip_simple_object() {
        let input = json!({"foo": "bar", "baz": "q&x=1"});
        assert_eq!(marshal(&unmarshal(&input)), input);
    }

    #[test]
    fn test_encode_component_matches_uri_component() {
        assert_eq!(encode_component("a b&c/d!*'()~"), "a%20b%26c%2Fd!*'()~");
    }
}
