//! Fluent request builder.
//!
//! # Responsibilities
//! - Accumulate headers, query, body and multipart parts into `TransportOptions`
//! - Infer content types and apply the body accumulation policy
//! - Resolve attachments and hand the request to the transport at `end()`
//! - Run the response through decompression and normalization
//!
//! # Data Flow
//! ```text
//! Unirest::get(url)
//!     → Request (Building): header / query / send / field / attach / part
//!     → end()
//!         → resolve attachments (file collaborator, remote GET)
//!         → multipart buffered?  dispatch(RawRequest)   (direct path)
//!           multipart streamed?  perform(form_data)     (transport form writer)
//!           otherwise            perform(options)
//!         → ResponseStream (inflate, decode)
//!         → Response::normalize
//! ```
//!
//! # Design Decisions
//! - `end()` consumes the builder, so the Sent state cannot be mutated
//! - HTTP error statuses are returned as `Ok(Response)` with `error` set;
//!   only transport failures and missing responses are `Err`

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use serde_json::Value;
use tracing::Instrument;

use super::auth::Auth;
use super::body::Body;
use super::multipart::{expand_field, Attachment, FieldValue, MultipartForm, Part, PartOptions, PartValue, RelatedPart};
use super::options::{ResponseEncoding, TransportOptions};
use crate::client::Context;
use crate::collections::Query;
use crate::error::Error;
use crate::marshal::body::{base_type, FORM};
use crate::marshal::form;
use crate::observability::{metrics, tracing::request_span};
use crate::response::{Response, ResponseStream, StreamedResponse};
use crate::transport::{CookieJar, RawRequest, RawResponse};

/// A request being built. Consumed by `end()`.
pub struct Request {
    pub(crate) ctx: Arc<Context>,
    options: TransportOptions,
    query: Query,
    parts: Vec<Part>,
    stream_mode: bool,
}

impl Request {
    pub(crate) fn new(ctx: Arc<Context>, method: Method, url: impl Into<String>) -> Self {
        let options = TransportOptions::from_defaults(method, url, &ctx.defaults);
        Self {
            ctx,
            options,
            query: Query::new(),
            parts: Vec::new(),
            stream_mode: false,
        }
    }

    // ---- headers ----

    /// Set a header. An existing header with the same name (any casing)
    /// keeps its stored casing.
    pub fn header(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.put(field, value.into());
        self
    }

    /// Merge several headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.options.headers.put_all(headers);
        self
    }

    /// Alias of `header`.
    pub fn set(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.header(field, value)
    }

    /// Set `Content-Type`. Values without a `/` are short names resolved
    /// through the mime table (`json`, `html`, `form`).
    pub fn content_type(self, type_or_mime: &str) -> Self {
        let mime = if type_or_mime.contains('/') {
            type_or_mime.to_string()
        } else {
            self.ctx.mime.lookup(type_or_mime)
        };
        self.header("Content-Type", mime)
    }

    // ---- query ----

    /// Append query parameters to the URL. Objects are form-encoded, strings
    /// are appended as given. Empty input is ignored.
    pub fn query(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        let encoded = match &value {
            Value::String(s) => s.trim_start_matches('?').to_string(),
            Value::Object(_) => form::unmarshal(&value),
            Value::Null => String::new(),
            other => form::scalar(other),
        };
        if encoded.is_empty() {
            return self;
        }
        self.query.put_collection(&Value::String(encoded.clone()));
        let url = &mut self.options.url;
        if !(url.ends_with('?') || url.ends_with('&')) {
            url.push(if url.contains('?') { '&' } else { '?' });
        }
        url.push_str(&encoded);
        self
    }

    // ---- auth ----

    /// Basic credentials.
    pub fn auth(mut self, user: impl Into<String>, password: impl Into<String>, send_immediately: bool) -> Self {
        let mut auth = Auth::basic(user, password);
        auth.send_immediately = send_immediately;
        self.options.auth = Some(auth);
        self
    }

    /// Any credentials descriptor, including bearer tokens.
    pub fn auth_with(mut self, auth: Auth) -> Self {
        self.options.auth = Some(auth);
        self
    }

    // ---- body ----

    /// Add to the request body.
    ///
    /// - structured data with no content type sets the form type and is
    ///   form-encoded; with a JSON type it is shallow-merged into the body
    /// - text joins with `&` for form bodies and concatenates otherwise
    /// - bytes and streams replace the body
    pub fn send(mut self, data: impl Into<Body>) -> Self {
        let data = data.into();
        let content_type = self.options.headers.content_type().map(base_type);
        match data {
            Body::Empty => {}
            Body::Json(value) => self.send_structured(value, content_type),
            Body::Text(text) => {
                let content_type = match content_type {
                    Some(ct) => ct,
                    None => {
                        self.options.headers.put("Content-Type", FORM);
                        FORM.to_string()
                    }
                };
                let separator = if content_type == FORM { "&" } else { "" };
                self.append_text(&text, separator);
            }
            other => self.options.body = other,
        }
        self
    }

    /// Alias of `send`.
    pub fn body(self, data: impl Into<Body>) -> Self {
        self.send(data)
    }

    /// Alias of `send`.
    pub fn payload(self, data: impl Into<Body>) -> Self {
        self.send(data)
    }

    fn send_structured(&mut self, value: Value, content_type: Option<String>) {
        let content_type = match content_type {
            Some(ct) => ct,
            None => {
                self.options.headers.put("Content-Type", FORM);
                FORM.to_string()
            }
        };
        if self.ctx.marshals.is_json(&content_type) {
            self.options.json = true;
            match (&mut self.options.body, value) {
                (Body::Json(Value::Object(existing)), Value::Object(incoming)) => {
                    for (key, value) in incoming {
                        existing.insert(key, value);
                    }
                }
                (body, value) => *body = Body::Json(value),
            }
            return;
        }
        let encoded = match self.ctx.marshals.lookup(&content_type) {
            Some(codec) => codec.unmarshal(&value),
            None => form::unmarshal(&value),
        };
        let separator = if self.ctx.marshals.is_form(&content_type) { "&" } else { "" };
        self.append_text(&encoded, separator);
    }

    fn append_text(&mut self, text: &str, separator: &str) {
        let joined = match std::mem::take(&mut self.options.body) {
            Body::Text(existing) if !existing.is_empty() => format!("{}{}{}", existing, separator, text),
            Body::Json(existing) => format!("{}{}", existing, text),
            Body::Bytes(existing) if !existing.is_empty() => {
                format!("{}{}", String::from_utf8_lossy(&existing), text)
            }
            _ => text.to_string(),
        };
        self.options.body = Body::Text(joined);
    }

    // ---- multipart ----

    /// Add a form field. Arrays expand into repeated fields; objects are
    /// sent as JSON.
    pub fn field(self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.field_with(name, value, PartOptions::default())
    }

    /// Add a form field with part options.
    pub fn field_with(mut self, name: &str, value: impl Into<FieldValue>, options: PartOptions) -> Self {
        expand_field(name, value.into(), options, &mut self.parts);
        self
    }

    /// Add several form fields.
    pub fn fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        for (name, value) in fields {
            expand_field(name.as_ref(), value.into(), PartOptions::default(), &mut self.parts);
        }
        self
    }

    /// Attach a file, remote resource, buffer or stream.
    pub fn attach(self, name: &str, source: impl Into<Attachment>) -> Self {
        self.attach_with(name, source, PartOptions::default())
    }

    /// Attach with explicit part options. Filename and content type default
    /// to the basename and its mimetype.
    pub fn attach_with(mut self, name: &str, source: impl Into<Attachment>, mut options: PartOptions) -> Self {
        let (value, basename) = match source.into() {
            Attachment::Path(path) => {
                let basename = path.file_name().map(|n| n.to_string_lossy().into_owned());
                (PartValue::File(path), basename)
            }
            Attachment::Url(url) => {
                let basename = url::Url::parse(&url)
                    .ok()
                    .and_then(|u| u.path_segments().and_then(|s| s.last().map(str::to_string)))
                    .filter(|s| !s.is_empty());
                (PartValue::Remote(url), basename)
            }
            Attachment::Bytes(bytes) => (PartValue::Bytes(bytes), None),
            Attachment::Stream(stream) => (PartValue::Stream(stream), None),
        };
        if options.filename.is_none() {
            options.filename = basename;
        }
        if options.content_type.is_none() {
            if let Some(filename) = &options.filename {
                options.content_type = Some(self.ctx.mime.for_path(Path::new(filename)));
            }
        }
        self.parts.push(Part {
            name: name.to_string(),
            value,
            attachment: true,
            options,
        });
        self
    }

    /// Add a `multipart/related` segment.
    pub fn part(mut self, body: impl Into<Body>) -> Self {
        self.options.multipart.push(RelatedPart::new(body));
        self
    }

    /// Add a `multipart/related` segment with its content type.
    pub fn part_with(mut self, content_type: &str, body: impl Into<Body>) -> Self {
        self.options.multipart.push(RelatedPart::with_type(content_type, body));
        self
    }

    /// Hand multipart parts to the transport's form writer instead of
    /// buffering the payload. Needed for non-rewindable streams.
    pub fn stream(mut self) -> Self {
        self.stream_mode = true;
        self
    }

    // ---- cookies ----

    /// Add a cookie for `url`, creating a jar for this request if needed.
    pub fn cookie(mut self, name: &str, value: &str, url: &str) -> Self {
        let jar = self.options.jar.get_or_insert_with(|| Arc::new(CookieJar::new()));
        if let Err(e) = jar.add(&format!("{}={}", name, value), url) {
            tracing::debug!(cookie = %name, error = %e, "Cookie rejected");
        }
        self
    }

    /// Use a shared cookie jar.
    pub fn jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.options.jar = Some(jar);
        self
    }

    /// Alias of `jar`.
    pub fn cookies(self, jar: Arc<CookieJar>) -> Self {
        self.jar(jar)
    }

    // ---- transport options ----

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.options.url = url.into();
        self
    }

    /// Alias of `url`.
    pub fn uri(self, url: impl Into<String>) -> Self {
        self.url(url)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.options.method = method;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.options.proxy = Some(proxy.into());
        self
    }

    pub fn follow_redirect(mut self, follow: bool) -> Self {
        self.options.follow_redirect = follow;
        self
    }

    /// Alias of `follow_redirect`.
    pub fn redirect(self, follow: bool) -> Self {
        self.follow_redirect(follow)
    }

    pub fn follow_all_redirects(mut self, follow: bool) -> Self {
        self.options.follow_all_redirects = follow;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.options.max_redirects = max;
        self
    }

    /// Alias of `max_redirects`.
    pub fn redirects(self, max: usize) -> Self {
        self.max_redirects(max)
    }

    pub fn encoding(mut self, encoding: ResponseEncoding) -> Self {
        self.options.encoding = encoding;
        self
    }

    /// Idle connections kept per host.
    pub fn pool(mut self, max_idle: usize) -> Self {
        self.options.pool = Some(max_idle);
        self
    }

    pub fn strict_ssl(mut self, strict: bool) -> Self {
        self.options.strict_ssl = strict;
        self
    }

    /// Alias of `strict_ssl`.
    pub fn ssl(self, strict: bool) -> Self {
        self.strict_ssl(strict)
    }

    pub fn local_address(mut self, address: IpAddr) -> Self {
        self.options.local_address = Some(address);
        self
    }

    /// Alias of `local_address`.
    pub fn ip(self, address: IpAddr) -> Self {
        self.local_address(address)
    }

    /// Encode a structured body as JSON.
    pub fn json(mut self, json: bool) -> Self {
        self.options.json = json;
        self
    }

    /// Urlencoded form payload, encoded by the transport.
    pub fn form(mut self, form: Value) -> Self {
        self.options.form = Some(form);
        self
    }

    /// Query parameters appended by the transport.
    pub fn qs(mut self, qs: &Value) -> Self {
        self.options.qs.put_collection(qs);
        self
    }

    pub fn secure_protocol(self, protocol: &str) -> Self {
        self.option("secure_protocol", Value::String(protocol.to_string()))
    }

    pub fn oauth(self, oauth: Value) -> Self {
        self.option("oauth", oauth)
    }

    pub fn hawk(self, hawk: Value) -> Self {
        self.option("hawk", hawk)
    }

    pub fn aws(self, aws: Value) -> Self {
        self.option("aws", aws)
    }

    pub fn http_signature(self, signature: Value) -> Self {
        self.option("http_signature", signature)
    }

    pub fn tunnel(self, tunnel: bool) -> Self {
        self.option("tunnel", Value::Bool(tunnel))
    }

    pub fn har(self, har: Value) -> Self {
        self.option("har", har)
    }

    pub fn forever(self, forever: bool) -> Self {
        self.option("forever", Value::Bool(forever))
    }

    /// Pass an option through to the transport untouched.
    pub fn option(mut self, name: &str, value: Value) -> Self {
        self.options.extra.insert(name.to_string(), value);
        self
    }

    // ---- inspection ----

    /// Current URL, including appended query.
    pub fn current_url(&self) -> &str {
        &self.options.url
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Every parameter added with `query()`.
    pub fn query_map(&self) -> &Query {
        &self.query
    }

    /// Multipart fields and attachments, in order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn is_streaming(&self) -> bool {
        self.stream_mode
    }

    // ---- dispatch ----

    /// Send the request and normalize the response.
    pub async fn end(self) -> Result<Response, Error> {
        let ctx = self.ctx.clone();
        let method = self.options.method.to_string();
        let encoding = self.options.encoding;
        let (_, span) = request_span(&method, &self.options.url);
        let start = Instant::now();

        async move {
            let RawResponse { head, body } = self.dispatch().await?;
            let mut stream = ResponseStream::new(body, head.header("content-encoding"));
            stream.set_encoding(encoding);
            let raw_body = stream.collect().await.map_err(|e| ctx.transport_failure(e))?;

            let response = Response::normalize(head, raw_body, &ctx.marshals);
            tracing::debug!(status = response.code(), "Response received");
            if ctx.metrics_enabled {
                metrics::record_request(&method, response.code(), start);
            }
            Ok(response)
        }
        .instrument(span)
        .await
    }

    /// Send the request and return the normalized head with a body stream.
    /// The stream yields decompressed bytes until `set_encoding` is called.
    pub async fn end_stream(self) -> Result<StreamedResponse, Error> {
        let ctx = self.ctx.clone();
        let method = self.options.method.to_string();
        let (_, span) = request_span(&method, &self.options.url);
        let start = Instant::now();

        async move {
            let RawResponse { head, body } = self.dispatch().await?;
            let stream = ResponseStream::new(body, head.header("content-encoding"));
            let response = StreamedResponse::new(head, stream, &ctx.marshals);
            if ctx.metrics_enabled {
                metrics::record_request(&method, response.head.code(), start);
            }
            Ok(response)
        }
        .instrument(span)
        .await
    }

    async fn dispatch(self) -> Result<RawResponse, Error> {
        let Request {
            ctx,
            mut options,
            parts,
            stream_mode,
            ..
        } = self;

        let mut resolved = Vec::with_capacity(parts.len());
        for part in parts {
            resolved.push(resolve_part(&ctx, part).await?);
        }

        let result = if resolved.is_empty() {
            ctx.transport.perform(options).await
        } else if stream_mode {
            tracing::debug!(parts = resolved.len(), "Streaming multipart form");
            if options
                .headers
                .content_type()
                .is_some_and(|ct| base_type(ct) == "multipart/form-data")
            {
                options.headers.remove("content-type");
            }
            options.form_data = Some(MultipartForm::new(resolved));
            ctx.transport.perform(options).await
        } else {
            let form = MultipartForm::new(resolved);
            options.headers.put("Content-Type", form.content_type());
            let body = form.into_bytes().await.map_err(|e| ctx.transport_failure(e))?;
            ctx.transport.dispatch(RawRequest { options, body }).await
        };

        match result {
            Ok(Some(raw)) => Ok(raw),
            Ok(None) => {
                tracing::error!("Transport completed without an error or a response");
                Err(Error::NoResponse)
            }
            Err(e) => Err(ctx.transport_failure(e)),
        }
    }
}

/// Turn an unresolved attachment into a byte stream.
async fn resolve_part(ctx: &Context, part: Part) -> Result<Part, Error> {
    let value = match part.value {
        PartValue::File(path) => match ctx.files.open(&path).await {
            Ok(stream) => PartValue::Stream(stream),
            Err(source) => return Err(Error::Attachment { path, source }),
        },
        PartValue::Remote(url) => {
            tracing::debug!(url = %url, "Fetching remote attachment");
            let options = TransportOptions::from_defaults(Method::GET, url, &ctx.defaults);
            match ctx.transport.perform(options).await {
                Ok(Some(raw)) => PartValue::Stream(raw.body),
                Ok(None) => return Err(Error::NoResponse),
                Err(e) => return Err(ctx.transport_failure(e)),
            }
        }
        resolved => resolved,
    };
    Ok(Part { value, ..part })
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("options", &self.options)
            .field("parts", &self.parts)
            .field("stream_mode", &self.stream_mode)
            .finish_non_exhaustive()
    }
}
