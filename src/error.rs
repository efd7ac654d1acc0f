//! Crate-level error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::transport::TransportError;

/// Errors returned by `Request::end` and client construction.
///
/// HTTP error statuses are not errors here: they arrive as a normal
/// `Response` with its `error` field set.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport failed before producing a response.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The transport reported success without a response.
    #[error("Transport returned no response")]
    NoResponse,

    /// A local attachment could not be opened.
    #[error("Attachment {} could not be opened: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Client configuration was rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Stable errno-like code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Transport(e) => e.code(),
            Error::NoResponse => "ENORESPONSE",
            Error::Attachment { .. } => "ENOENT",
            Error::Config(_) => "ECONFIG",
        }
    }

    /// The transport error, if this is one.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pass_through() {
        assert_eq!(Error::from(TransportError::Timeout).code(), "ETIMEDOUT");
        assert_eq!(Error::NoResponse.code(), "ENORESPONSE");

        let err = Error::Attachment {
            path: PathBuf::from("/tmp/missing.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/missing.txt"));
        assert!(err.transport().is_none());
    }
}
