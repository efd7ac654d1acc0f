//! Authentication descriptor carried to the transport.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Credentials for a request. Not validated by the builder.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub user: Option<String>,
    pub password: Option<String>,
    /// Send credentials up front. When false, they are only sent after a
    /// `401` challenge.
    pub send_immediately: bool,
    pub bearer: Option<String>,
}

impl Auth {
    /// HTTP basic credentials, sent immediately.
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
            ..Self::default()
        }
    }

    /// `Authorization` header value for these credentials.
    pub fn header_value(&self) -> Option<String> {
        if let Some(token) = &self.bearer {
            return Some(format!("Bearer {}", token));
        }
        let user = self.user.as_deref()?;
        let credentials = format!("{}:{}", user, self.password.as_deref().unwrap_or_default());
        Some(format!("Basic {}", STANDARD.encode(credentials)))
    }
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            send_immediately: true,
            bearer: None,
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("send_immediately", &self.send_immediately)
            .field("bearer", &self.bearer.as_ref().map(|_| "***"))
            .finish()
    }
}
