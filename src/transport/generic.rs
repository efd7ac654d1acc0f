//! Generic path: `reqwest`-backed transport.
//!
//! # Responsibilities
//! - Translate `TransportOptions` into a reqwest request
//! - Apply redirect policy, proxy, TLS strictness, local address, pool size
//! - Feed the cookie jar in both directions
//! - Answer a `401` challenge when credentials are not sent up front
//!
//! # Design Decisions
//! - Two shared clients (redirects on/off) cover the common case; options
//!   that change connection setup get a dedicated client
//! - Transparent decompression stays off: the response interceptor owns it

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::TryStreamExt;
use http::header::{HeaderMap, CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::StatusCode;
use reqwest::redirect::Policy;
use url::Url;

use super::{
    build_url, is_connection_refused, DirectClient, RawRequest, RawResponse, ResponseHead, Transport,
    TransportError, TransportResult,
};
use crate::marshal::{body::FORM, form};
use crate::request::multipart::{encode_related, generate_boundary, MultipartForm, PartValue, OCTET_STREAM};
use crate::request::{Auth, Body, TransportOptions, DEFAULT_MAX_REDIRECTS};

/// Default transport: reqwest for accumulated options, hyper-util for
/// pre-built requests.
#[derive(Clone)]
pub struct HttpTransport {
    following: reqwest::Client,
    not_following: reqwest::Client,
    direct: DirectClient,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            following: reqwest::Client::new(),
            not_following: reqwest::Client::builder()
                .redirect(Policy::none())
                .build()
                .unwrap_or_default(),
            direct: DirectClient::new(),
        }
    }

    /// Pick a shared client or build a dedicated one.
    fn client_for(&self, options: &TransportOptions) -> Result<reqwest::Client, TransportError> {
        let follows = options.follows_redirects();
        let dedicated = options.proxy.is_some()
            || options.local_address.is_some()
            || options.pool.is_some()
            || !options.strict_ssl
            || (follows && options.max_redirects != DEFAULT_MAX_REDIRECTS);
        if !dedicated {
            return Ok(if follows {
                self.following.clone()
            } else {
                self.not_following.clone()
            });
        }

        let policy = if follows {
            Policy::limited(options.max_redirects)
        } else {
            Policy::none()
        };
        let mut builder = reqwest::Client::builder()
            .redirect(policy)
            .danger_accept_invalid_certs(!options.strict_ssl);
        if let Some(proxy) = &options.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| TransportError::invalid_url(proxy, e))?;
            builder = builder.proxy(proxy);
        }
        if let Some(address) = options.local_address {
            builder = builder.local_address(address);
        }
        if let Some(max_idle) = options.pool {
            builder = builder.pool_max_idle_per_host(max_idle);
        }
        builder
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))
    }

    async fn execute(&self, mut options: TransportOptions) -> TransportResult {
        let client = self.client_for(&options)?;
        let url = build_url(&options)?;

        let challenge = options.auth.as_ref().is_some_and(|a| !a.send_immediately);
        let replay = if challenge && options.is_replayable() {
            Some((options.body.try_clone(), options.form.clone()))
        } else {
            None
        };

        let payload = Payload::take(&mut options).await?;
        let request = prepare(&client, &url, &options, payload, !challenge)?;
        let mut response = request.send().await.map_err(TransportError::from)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some((Some(body), form)) = replay {
                tracing::debug!(url = %url, "Answering authentication challenge");
                let payload = Payload {
                    body,
                    form,
                    form_data: None,
                    related: None,
                };
                let request = prepare(&client, &url, &options, payload, true)?;
                response = request.send().await.map_err(TransportError::from)?;
            }
        }

        if let Some(jar) = &options.jar {
            let final_url = response.url().to_string();
            for value in response.headers().get_all(SET_COOKIE) {
                let Ok(value) = value.to_str() else { continue };
                if let Err(e) = jar.set_cookie(value, &final_url) {
                    tracing::debug!(error = %e, "Ignoring response cookie");
                }
            }
        }

        Ok(Some(into_raw(response)))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl Transport for HttpTransport {
    fn perform(&self, options: TransportOptions) -> BoxFuture<'_, TransportResult> {
        Box::pin(self.execute(options))
    }

    fn dispatch(&self, request: RawRequest) -> BoxFuture<'_, TransportResult> {
        let direct = Url::parse(&request.options.url)
            .map(|url| DirectClient::supports(&url))
            .unwrap_or(false);
        if direct {
            Box::pin(self.direct.send(request))
        } else {
            Box::pin(self.execute(request.into_options()))
        }
    }
}

/// Body-bearing options, moved out so the rest can be borrowed.
struct Payload {
    body: Body,
    form: Option<serde_json::Value>,
    form_data: Option<MultipartForm>,
    /// Boundary and encoded `multipart/related` segments.
    related: Option<(String, Bytes)>,
}

impl Payload {
    async fn take(options: &mut TransportOptions) -> Result<Self, TransportError> {
        let parts = std::mem::take(&mut options.multipart);
        let related = if parts.is_empty() {
            None
        } else {
            let boundary = generate_boundary();
            let bytes = encode_related(parts, &boundary).await?;
            Some((boundary, bytes))
        };
        Ok(Self {
            body: std::mem::take(&mut options.body),
            form: options.form.take(),
            form_data: options.form_data.take(),
            related,
        })
    }
}

fn prepare(
    client: &reqwest::Client,
    url: &Url,
    options: &TransportOptions,
    payload: Payload,
    send_auth: bool,
) -> Result<reqwest::RequestBuilder, TransportError> {
    let mut request = client.request(options.method.clone(), url.clone());
    for (name, value) in options.headers.iter() {
        request = request.header(name, value.as_str());
    }
    if let Some(limit) = options.timeout {
        request = request.timeout(limit);
    }
    if send_auth {
        if let Some(auth) = &options.auth {
            request = apply_auth(request, auth);
        }
    }
    if let Some(jar) = &options.jar {
        let cookies = jar.get_cookie_string(url.as_str());
        if !cookies.is_empty() {
            let value = match options.headers.get("cookie") {
                Some(existing) => format!("{}; {}", existing, cookies),
                None => cookies,
            };
            request = request.header(COOKIE, value);
        }
    }

    let has_type = options.headers.content_type().is_some();
    if let Some(form_data) = payload.form_data {
        return Ok(request.multipart(into_reqwest_form(form_data)?));
    }
    if let Some((boundary, bytes)) = payload.related {
        if !has_type {
            request = request.header(CONTENT_TYPE, format!("multipart/related; boundary={}", boundary));
        }
        return Ok(request.body(bytes));
    }
    if let Some(form_value) = payload.form {
        if !has_type {
            request = request.header(CONTENT_TYPE, FORM);
        }
        return Ok(request.body(form::unmarshal(&form_value)));
    }
    Ok(match payload.body {
        Body::Empty => request,
        Body::Bytes(bytes) => request.body(bytes),
        Body::Text(text) => request.body(text),
        Body::Json(value) if options.json => request.json(&value),
        Body::Json(value) => request.body(value.to_string()),
        Body::Stream(stream) => request.body(reqwest::Body::wrap_stream(stream)),
    })
}

fn apply_auth(request: reqwest::RequestBuilder, auth: &Auth) -> reqwest::RequestBuilder {
    match (&auth.bearer, &auth.user) {
        (Some(token), _) => request.bearer_auth(token),
        (None, Some(user)) => request.basic_auth(user, auth.password.as_ref()),
        (None, None) => request,
    }
}

fn into_reqwest_form(form: MultipartForm) -> Result<reqwest::multipart::Form, TransportError> {
    let mut out = reqwest::multipart::Form::new();
    for part in form.into_parts() {
        let mut piece = match part.value {
            PartValue::Text(text) => reqwest::multipart::Part::text(text),
            PartValue::Bytes(bytes) => reqwest::multipart::Part::bytes(bytes.to_vec()),
            PartValue::Stream(stream) => match part.options.known_length {
                Some(length) => reqwest::multipart::Part::stream_with_length(
                    reqwest::Body::wrap_stream(stream),
                    length,
                ),
                None => reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(stream)),
            },
            PartValue::File(path) => {
                return Err(TransportError::Body(format!(
                    "attachment {} was not opened",
                    path.display()
                )))
            }
            PartValue::Remote(url) => {
                return Err(TransportError::Body(format!("attachment {} was not fetched", url)))
            }
        };
        if let Some(filename) = part.options.filename {
            piece = piece.file_name(filename);
        }
        let content_type = part
            .options
            .content_type
            .or_else(|| part.attachment.then(|| OCTET_STREAM.to_string()));
        if let Some(content_type) = content_type {
            piece = piece
                .mime_str(&content_type)
                .map_err(|e| TransportError::InvalidHeader(e.to_string()))?;
        }
        out = out.part(part.name, piece);
    }
    Ok(out)
}

fn into_raw(response: reqwest::Response) -> RawResponse {
    let status = response.status();
    let head = ResponseHead {
        status: status.as_u16(),
        reason: status.canonical_reason().map(str::to_string),
        version: response.version(),
        url: response.url().to_string(),
        headers: collect_headers(response.headers()),
    };
    let body = response.bytes_stream().map_err(TransportError::from);
    RawResponse {
        head,
        body: Box::pin(body),
    }
}

/// Header pairs in arrival order, values decoded lossily.
pub(crate) fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if is_connection_refused(&err) {
            TransportError::ConnectionRefused(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidHeader(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

/// Shared handle type used by the client context.
pub type SharedTransport = Arc<dyn Transport>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_shared_clients_cover_defaults() {
        let transport = HttpTransport::new();
        let options = TransportOptions::new(Method::GET, "http://x");
        assert!(transport.client_for(&options).is_ok());

        let mut options = TransportOptions::new(Method::GET, "http://x");
        options.proxy = Some("not a proxy url".into());
        assert_eq!(transport.client_for(&options).unwrap_err().code(), "EINVALIDURL");
    }

    #[test]
    fn test_unresolved_parts_are_rejected() {
        let form = MultipartForm::new(vec![crate::request::multipart::Part {
            name: "f".into(),
            value: PartValue::Remote("http://x/a.png".into()),
            attachment: true,
            options: Default::default(),
        }]);
        assert_eq!(into_reqwest_form(form).unwrap_err().code(), "EBODY");
    }
}
