//! Direct path: a pre-built request written with hyper-util's client.
//!
//! # Responsibilities
//! - Send a fully materialized request (multipart bodies) with the builder's headers
//! - Apply timeout, auth and cookie jar the same way the generic path does
//! - Answer a `401` challenge once; the buffered body is always replayable
//!
//! # Design Decisions
//! - Header names go out title-cased (`X-API-Key` becomes `X-Api-Key`);
//!   hyper has no public way to keep the caller's exact casing
//! - The timeout is one deadline covering the exchange and the body read
//! - No redirect following, proxying or TLS: plain `http://` only; the
//!   generic path handles everything else

use bytes::Bytes;
use futures_util::{future, stream, StreamExt, TryStreamExt};
use http_body_util::{BodyStream, Full};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::Instant;

use super::{
    build_url, is_connection_refused, ByteStream, RawRequest, RawResponse, ResponseHead, TransportError,
};
use crate::request::TransportOptions;

/// hyper-util client used for direct dispatch.
#[derive(Clone)]
pub struct DirectClient {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl DirectClient {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .http1_title_case_headers(true)
            .build(HttpConnector::new());
        Self { client }
    }

    /// True when the URL can go through this client.
    pub fn supports(url: &url::Url) -> bool {
        url.scheme() == "http"
    }

    /// Send a raw request.
    pub async fn send(&self, request: RawRequest) -> Result<Option<RawResponse>, TransportError> {
        let RawRequest { options, body } = request;
        let url = build_url(&options)?;
        let deadline = options.timeout.map(|limit| Instant::now() + limit);

        let challenge = options.auth.as_ref().is_some_and(|a| !a.send_immediately);
        let mut response = self
            .exchange(build_request(&options, &url, body.clone(), !challenge)?, deadline)
            .await?;
        if challenge && response.status() == http::StatusCode::UNAUTHORIZED {
            tracing::debug!(url = %url, "Answering authentication challenge");
            response = self
                .exchange(build_request(&options, &url, body, true)?, deadline)
                .await?;
        }

        let (parts, incoming) = response.into_parts();
        let head = ResponseHead {
            status: parts.status.as_u16(),
            reason: parts.status.canonical_reason().map(str::to_string),
            version: parts.version,
            url: url.to_string(),
            headers: super::generic::collect_headers(&parts.headers),
        };
        if let Some(jar) = &options.jar {
            for value in head.header_all("set-cookie") {
                if let Err(e) = jar.set_cookie(value, &head.url) {
                    tracing::debug!(error = %e, "Ignoring response cookie");
                }
            }
        }

        let body = BodyStream::new(incoming)
            .map_err(|e| TransportError::Body(e.to_string()))
            .try_filter_map(|frame| future::ready(Ok(frame.into_data().ok())))
            .boxed();
        Ok(Some(RawResponse {
            head,
            body: with_deadline(body, deadline),
        }))
    }

    async fn exchange(
        &self,
        request: http::Request<Full<Bytes>>,
        deadline: Option<Instant>,
    ) -> Result<hyper::Response<hyper::body::Incoming>, TransportError> {
        let call = self.client.request(request);
        let result = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, call)
                .await
                .map_err(|_| TransportError::Timeout)?,
            None => call.await,
        };
        result.map_err(TransportError::from)
    }
}

fn build_request(
    options: &TransportOptions,
    url: &url::Url,
    body: Bytes,
    send_auth: bool,
) -> Result<http::Request<Full<Bytes>>, TransportError> {
    let mut builder = http::Request::builder()
        .method(options.method.clone())
        .uri(url.as_str());
    for (name, value) in options.headers.iter() {
        if name.eq_ignore_ascii_case("cookie") && options.jar.is_some() {
            continue;
        }
        builder = builder.header(name, value.as_str());
    }
    if let Some(auth) = options.auth.as_ref().filter(|_| send_auth) {
        if options.headers.contains_key("authorization").is_none() {
            if let Some(value) = auth.header_value() {
                builder = builder.header(http::header::AUTHORIZATION, value);
            }
        }
    }
    if let Some(jar) = &options.jar {
        let cookies = jar.get_cookie_string(url.as_str());
        let value = match (options.headers.get("cookie"), cookies.is_empty()) {
            (Some(existing), false) => Some(format!("{}; {}", existing, cookies)),
            (Some(existing), true) => Some(existing.clone()),
            (None, false) => Some(cookies),
            (None, true) => None,
        };
        if let Some(value) = value {
            builder = builder.header(http::header::COOKIE, value);
        }
    }
    builder
        .body(Full::new(body))
        .map_err(|e| TransportError::InvalidHeader(e.to_string()))
}

/// Fail the body stream with `Timeout` once `deadline` passes.
fn with_deadline(body: ByteStream, deadline: Option<Instant>) -> ByteStream {
    let Some(deadline) = deadline else {
        return body;
    };
    stream::unfold(Some(body), move |state| async move {
        let mut body = state?;
        match tokio::time::timeout_at(deadline, body.next()).await {
            Ok(Some(item)) => Some((item, Some(body))),
            Ok(None) => None,
            Err(_) => Some((Err(TransportError::Timeout), None)),
        }
    })
    .boxed()
}

impl Default for DirectClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DirectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectClient").finish_non_exhaustive()
    }
}

impl From<hyper_util::client::legacy::Error> for TransportError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        if is_connection_refused(&err) {
            TransportError::ConnectionRefused(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}
