//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::Json;
use futures_util::future::BoxFuture;
use futures_util::stream;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use unirest::collections::Headers;
use unirest::files::FileOpener;
use unirest::transport::{ByteStream, RawRequest, RawResponse, ResponseHead, TransportResult};
use unirest::request::TransportOptions;
use unirest::Transport;

/// Build a raw HTTP/1.1 response with `Content-Length` and `Connection: close`.
pub fn raw_response(status_line: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {}\r\n", status_line);
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", body.len()));
    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// Gzip a payload for `Content-Encoding: gzip` fixtures.
pub fn gzip(payload: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap()
}

/// Start a mock backend on an ephemeral port that answers every
/// connection with the same raw bytes.
pub async fn start_raw_backend(response: Vec<u8>) -> SocketAddr {
    start_delayed_backend(response, Duration::ZERO).await
}

/// Like `start_raw_backend`, but waits before answering.
pub async fn start_delayed_backend(response: Vec<u8>, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = Arc::new(response);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let response = response.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 16 * 1024];
                        let _ = socket.read(&mut buf).await;
                        tokio::time::sleep(delay).await;
                        let _ = socket.write_all(&response).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// Like `start_raw_backend`, but pauses between the head and the body.
pub async fn start_slow_body_backend(head: Vec<u8>, body: Vec<u8>, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let parts = Arc::new((head, body));

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let parts = parts.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16 * 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(&parts.0).await;
                let _ = socket.flush().await;
                tokio::time::sleep(delay).await;
                let _ = socket.write_all(&parts.1).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Start a server answering `401` unless basic credentials are present.
/// Returns the address and a hit counter.
pub async fn start_basic_auth_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = axum::Router::new()
        .fallback(basic_auth)
        .with_state(hits.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, hits)
}

async fn basic_auth(State(hits): State<Arc<AtomicUsize>>, headers: HeaderMap) -> StatusCode {
    hits.fetch_add(1, Ordering::SeqCst);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if authorized {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start an axum server echoing the request back as JSON. `x-*` request
/// headers are also copied onto the response.
pub async fn start_echo_server() -> SocketAddr {
    let app = axum::Router::new().fallback(echo);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> (HeaderMap, Json<Value>) {
    let mut echoed = HeaderMap::new();
    let mut seen = Map::new();
    for (name, value) in &headers {
        let text = value.to_str().unwrap_or_default().to_string();
        if name.as_str().starts_with("x-") {
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(name.as_str().as_bytes()),
                HeaderValue::from_str(&text),
            ) {
                echoed.insert(n, v);
            }
        }
        seen.insert(name.as_str().to_string(), Value::String(text));
    }
    let body = json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query().unwrap_or_default(),
        "headers": seen,
        "body": String::from_utf8_lossy(&body),
    });
    (echoed, Json(body))
}

/// What a recording transport saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: http::Method,
    pub url: String,
    pub headers: Headers,
    /// `true` when the request came through `dispatch`.
    pub direct: bool,
    /// Exact body bytes of a dispatched request.
    pub body: Option<bytes::Bytes>,
    pub parts: Vec<RecordedPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPart {
    pub name: String,
    pub attachment: bool,
    pub is_stream: bool,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// Transport double that records calls and answers with a canned response.
#[derive(Clone, Default)]
pub struct MockTransport {
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
    /// Answer `Ok(None)` instead of a response.
    pub no_response: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn silent() -> Self {
        Self {
            no_response: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RecordedCall) -> BoxFuture<'_, TransportResult> {
        let url = call.url.clone();
        self.calls.lock().unwrap().push(call);
        let no_response = self.no_response;
        Box::pin(async move {
            if no_response {
                return Ok(None);
            }
            let mut head = ResponseHead::new(200, url);
            head.headers.push(("content-type".into(), "application/json".into()));
            let body: ByteStream = Box::pin(stream::iter(vec![Ok(bytes::Bytes::from_static(b"{\"ok\":true}"))]));
            Ok(Some(RawResponse { head, body }))
        })
    }
}

impl Transport for MockTransport {
    fn perform(&self, options: TransportOptions) -> BoxFuture<'_, TransportResult> {
        let parts = options
            .form_data
            .as_ref()
            .map(|form| {
                form.parts()
                    .iter()
                    .map(|part| RecordedPart {
                        name: part.name.clone(),
                        attachment: part.attachment,
                        is_stream: part.value.is_stream(),
                        filename: part.options.filename.clone(),
                        content_type: part.options.content_type.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.record(RecordedCall {
            method: options.method.clone(),
            url: options.url.clone(),
            headers: options.headers.clone(),
            direct: false,
            body: None,
            parts,
        })
    }

    fn dispatch(&self, request: RawRequest) -> BoxFuture<'_, TransportResult> {
        self.record(RecordedCall {
            method: request.options.method.clone(),
            url: request.options.url.clone(),
            headers: request.options.headers.clone(),
            direct: true,
            body: Some(request.body),
            parts: Vec::new(),
        })
    }
}

/// File collaborator double serving fixed contents for any path.
#[derive(Clone, Default)]
pub struct MockFiles {
    pub opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl FileOpener for MockFiles {
    fn open(&self, path: &Path) -> BoxFuture<'_, std::io::Result<ByteStream>> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        Box::pin(async move {
            let chunks = vec![
                Ok(bytes::Bytes::from_static(b"mock ")),
                Ok(bytes::Bytes::from_static(b"file")),
            ];
            Ok(Box::pin(stream::iter(chunks)) as ByteStream)
        })
    }
}
