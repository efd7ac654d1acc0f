//! Status classification and the attached HTTP-level error.

use serde_json::Value;
use thiserror::Error;

/// Flags derived from a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInfo {
    pub code: u16,
    /// `code / 100`.
    pub range: u16,
    pub info: bool,
    pub ok: bool,
    pub redirection: bool,
    pub client_error: bool,
    pub server_error: bool,
    pub accepted: bool,
    /// 204, or 1223 (a 204 as mangled by some Windows stacks).
    pub no_content: bool,
    pub bad_request: bool,
    pub unauthorized: bool,
    pub not_acceptable: bool,
    pub not_found: bool,
    pub forbidden: bool,
}

impl StatusInfo {
    pub fn classify(code: u16) -> Self {
        let range = code / 100;
        Self {
            code,
            range,
            info: range == 1,
            ok: range == 2,
            redirection: range == 3,
            client_error: range == 4,
            server_error: range == 5,
            accepted: code == 202,
            no_content: code == 204 || code == 1223,
            bad_request: code == 400,
            unauthorized: code == 401,
            not_acceptable: code == 406,
            not_found: code == 404,
            forbidden: code == 403,
        }
    }

    /// True for 4xx and 5xx.
    pub fn is_error(&self) -> bool {
        self.client_error || self.server_error
    }
}

/// Non-fatal error attached to 4xx/5xx responses.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("got {status} response: {message}")]
pub struct StatusError {
    pub status: u16,
    /// Parsed body rendered as text.
    pub message: String,
}

impl StatusError {
    pub fn new(status: u16, body: Option<&Value>) -> Self {
        let message = match body {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Self { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_not_found_flags() {
        let s = StatusInfo::classify(404);
        assert_eq!(s.range, 4);
        assert!(s.not_found && s.client_error && s.is_error());
        assert!(!s.ok && !s.server_error && !s.forbidden);
    }

    #[test]
    fn test_no_content_variants() {
        assert!(StatusInfo::classify(204).no_content);
        let quirk = StatusInfo::classify(1223);
        assert!(quirk.no_content);
        assert_eq!(quirk.range, 12);
        assert!(!quirk.ok);
    }

    #[test]
    fn test_ranges() {
        assert!(StatusInfo::classify(101).info);
        assert!(StatusInfo::classify(202).accepted);
        assert!(StatusInfo::classify(302).redirection);
        assert!(StatusInfo::classify(503).server_error);
        assert!(StatusInfo::classify(406).not_acceptable);
        assert!(StatusInfo::classify(401).unauthorized);
        assert!(StatusInfo::classify(400).bad_request);
    }

    #[test]
    fn test_status_error_message() {
        let err = StatusError::new(500, Some(&json!({"error": "boom"})));
        assert_eq!(err.to_string(), r#"got 500 response: {"error":"boom"}"#);
        assert_eq!(StatusError::new(404, Some(&json!("missing"))).message, "missing");
    }
}
