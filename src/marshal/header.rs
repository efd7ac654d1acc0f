//! Raw header-block codec.
//!
//! Decoding lowercases field names and trims values; encoding emits
//! `Field-Name: value\r\n` lines with each `-` segment capitalized.

/// Decode a CRLF-separated header block.
pub fn marshal(block: &str) -> Vec<(String, String)> {
    let block = block.strip_suffix("\r\n").unwrap_or(block);
    block
        .lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

/// Encode name/value pairs as a header block.
pub fn unmarshal<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    entries
        .into_iter()
        .map(|(name, value)| format!("{}: {}\r\n", normalize_name(name), value))
        .collect()
}

/// `content-TYPE` becomes `Content-Type`.
pub fn normalize_name(name: &str) -> String {
    name.split('-').map(capitalize).collect::<Vec<_>>().join("-")
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_block() {
        let block = "Content-Type: text/html; charset=utf-8\r\nX-Trace:  abc \r\nbroken line\r\nLocation: http://x/y\r\n";
        assert_eq!(
            marshal(block),
            vec![
                ("content-type".to_string(), "text/html; charset=utf-8".to_string()),
                ("x-trace".to_string(), "abc".to_string()),
                ("location".to_string(), "http://x/y".to_string()),
            ]
        );
    }

    #[test]
    fn test_encode_block() {
        let block = unmarshal([("content-type", "application/json"), ("x-REQUEST-id", "7")]);
        assert_eq!(block, "Content-Type: application/json\r\nX-Request-Id: 7\r\n");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("www-authenticate"), "Www-Authenticate");
        assert_eq!(normalize_name("etag"), "Etag");
        assert_eq!(normalize_name("a--b"), "A--B");
    }
}
