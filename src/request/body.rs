//! Tagged request body.

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde_json::Value;

use crate::transport::{ByteStream, TransportError};

/// A request payload. Builder policy branches on the variant, never on
/// runtime type probing.
#[derive(Default)]
pub enum Body {
    /// No payload.
    #[default]
    Empty,
    /// Raw bytes, sent as-is.
    Bytes(Bytes),
    /// Text, possibly already encoded for its content type.
    Text(String),
    /// Structured data, encoded at send time.
    Json(Value),
    /// A non-rewindable byte stream.
    Stream(ByteStream),
}

impl Body {
    /// Wrap a byte stream.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Body::Stream(Box::pin(stream))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// True for payloads that can be sent twice.
    pub fn is_replayable(&self) -> bool {
        !matches!(self, Body::Stream(_))
    }

    /// Copy the body unless it is a stream.
    pub fn try_clone(&self) -> Option<Body> {
        match self {
            Body::Empty => Some(Body::Empty),
            Body::Bytes(b) => Some(Body::Bytes(b.clone())),
            Body::Text(s) => Some(Body::Text(s.clone())),
            Body::Json(v) => Some(Body::Json(v.clone())),
            Body::Stream(_) => None,
        }
    }

    /// Buffer the whole payload. Structured data is written as JSON.
    pub async fn into_bytes(self) -> Result<Bytes, TransportError> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(b) => Ok(b),
            Body::Text(s) => Ok(Bytes::from(s)),
            Body::Json(v) => Ok(Bytes::from(v.to_string())),
            Body::Stream(stream) => collect_stream(stream).await,
        }
    }
}

/// Drain a byte stream into one buffer.
pub async fn collect_stream(mut stream: ByteStream) -> Result<Bytes, TransportError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Body::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Body::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<Value> for Body {
    fn from(v: Value) -> Self {
        Body::Json(v)
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(b))
    }
}

impl From<&'static [u8]> for Body {
    fn from(b: &'static [u8]) -> Self {
        Body::Bytes(Bytes::from_static(b))
    }
}

impl From<ByteStream> for Body {
    fn from(stream: ByteStream) -> Self {
        Body::Stream(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use serde_json::json;

    #[tokio::test]
    async fn test_stream_body_is_buffered() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let body = Body::stream(stream::iter(chunks));
        assert!(!body.is_replayable());
        assert!(body.try_clone().is_none());
        assert_eq!(body.into_bytes().await.unwrap(), Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn test_structured_body_buffers_as_json() {
        let body = Body::from(json!({"a": 1}));
        assert_eq!(body.into_bytes().await.unwrap(), Bytes::from_static(b"{\"a\":1}"));
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Err(TransportError::Body("cut".into()))];
        let body = Body::stream(stream::iter(chunks));
        assert_eq!(body.into_bytes().await.unwrap_err().code(), "EBODY");
    }
}
