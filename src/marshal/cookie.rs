//! Cookie string codec.
//!
//! Decodes `a=1; b=2` (or several such strings) into ordered pairs. A
//! fragment with an empty value decodes to `true`; a fragment without `=`
//! is skipped. Keys and values are trimmed.

use serde_json::Value;

/// Decode a single `;`-delimited cookie string.
pub fn marshal(input: &str) -> Vec<(String, Value)> {
    marshal_all([input])
}

/// Decode several cookie strings, in order.
pub fn marshal_all<'a, I>(inputs: I) -> Vec<(String, Value)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = Vec::new();
    for input in inputs {
        for fragment in input.split(';') {
            let Some((key, value)) = fragment.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let value = value.trim();
            let value = if value.is_empty() {
                Value::Bool(true)
            } else {
                Value::String(value.to_string())
            };
            out.push((key.to_string(), value));
        }
    }
    out
}

/// Encode pairs back into a cookie string. `true` encodes as an empty value.
pub fn unmarshal<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| match value {
            Value::Bool(true) => format!("{}=", key),
            Value::String(s) => format!("{}={}", key, s),
            other => format!("{}={}", key, other),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_fragments() {
        let pairs = marshal(" session = abc ; flag=; junk ; theme=dark");
        assert_eq!(
            pairs,
            vec![
                ("session".to_string(), json!("abc")),
                ("flag".to_string(), json!(true)),
                ("theme".to_string(), json!("dark")),
            ]
        );
    }

    #[test]
    fn test_decode_list_keeps_order() {
        let pairs = marshal_all(["a=1; Path=/", "a=2"]);
        assert_eq!(pairs.last(), Some(&("a".to_string(), json!("2"))));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_encode() {
        let flag = json!(true);
        let sid = json!("x");
        assert_eq!(unmarshal([("sid", &sid), ("flag", &flag)]), "sid=x; flag=");
    }
}
