//! Client entry point.
//!
//! # Responsibilities
//! - Hold the process-wide, read-only context every request shares:
//!   transport, file and mime collaborators, body codecs, request defaults
//! - Create one `Request` builder per HTTP verb
//!
//! # Design Decisions
//! - Collaborators are injected through `UnirestBuilder` so tests can
//!   swap the transport and file opener
//! - The context is immutable once built; new config means a new client

use std::sync::Arc;

use http::Method;

use crate::collections::Headers;
use crate::config::validation::validate_config;
use crate::config::{ClientConfig, ConfigError, RequestDefaults};
use crate::error::Error;
use crate::files::{FileOpener, TokioFiles};
use crate::marshal::{BodyCodec, BodyMarshals};
use crate::mime::{MimeLookup, MimeTable};
use crate::observability::metrics;
use crate::request::{Body, Request};
use crate::transport::{CookieJar, HttpTransport, JarOptions, Transport, TransportError};

/// Shared, read-only state behind every request of a client.
pub(crate) struct Context {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) files: Arc<dyn FileOpener>,
    pub(crate) mime: Arc<dyn MimeLookup>,
    pub(crate) marshals: BodyMarshals,
    pub(crate) defaults: RequestDefaults,
    pub(crate) metrics_enabled: bool,
}

impl Context {
    /// Log and count a transport failure, then wrap it.
    pub(crate) fn transport_failure(&self, err: TransportError) -> Error {
        tracing::warn!(code = err.code(), error = %err, "Request failed");
        if self.metrics_enabled {
            metrics::record_transport_error(err.code());
        }
        Error::Transport(err)
    }
}

/// HTTP client handing out request builders.
#[derive(Clone)]
pub struct Unirest {
    ctx: Arc<Context>,
}

impl Unirest {
    /// Client with the built-in transport and stock defaults.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> UnirestBuilder {
        UnirestBuilder::default()
    }

    /// Client from a configuration, validated first.
    pub fn from_config(config: ClientConfig) -> Result<Self, Error> {
        validate_config(&config).map_err(|errors| Error::Config(ConfigError::Validation(errors)))?;
        Ok(Self::builder().config(config).build())
    }

    /// Start a request.
    pub fn request(&self, method: Method, url: impl Into<String>) -> Request {
        Request::new(self.ctx.clone(), method, url)
    }

    pub fn get(&self, url: impl Into<String>) -> Request {
        self.request(Method::GET, url)
    }

    pub fn head(&self, url: impl Into<String>) -> Request {
        self.request(Method::HEAD, url)
    }

    pub fn put(&self, url: impl Into<String>) -> Request {
        self.request(Method::PUT, url)
    }

    pub fn post(&self, url: impl Into<String>) -> Request {
        self.request(Method::POST, url)
    }

    pub fn patch(&self, url: impl Into<String>) -> Request {
        self.request(Method::PATCH, url)
    }

    pub fn delete(&self, url: impl Into<String>) -> Request {
        self.request(Method::DELETE, url)
    }

    pub fn options(&self, url: impl Into<String>) -> Request {
        self.request(Method::OPTIONS, url)
    }

    /// Verb call with optional headers and body in one step.
    pub fn call(&self, method: Method, url: impl Into<String>, headers: Option<Headers>, body: Option<Body>) -> Request {
        let mut request = self.request(method, url);
        if let Some(headers) = headers {
            request = request.headers(headers);
        }
        if let Some(body) = body {
            request = request.send(body);
        }
        request
    }

    /// A cookie jar to share between requests.
    pub fn jar(options: JarOptions) -> Arc<CookieJar> {
        Arc::new(CookieJar::with_options(options))
    }

    /// Defaults every request starts from.
    pub fn defaults(&self) -> &RequestDefaults {
        &self.ctx.defaults
    }
}

impl Default for Unirest {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Unirest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unirest")
            .field("defaults", &self.ctx.defaults)
            .field("marshals", &self.ctx.marshals)
            .finish_non_exhaustive()
    }
}

/// Builder for `Unirest`.
#[derive(Default)]
pub struct UnirestBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    files: Option<Arc<dyn FileOpener>>,
    mime: Option<Arc<dyn MimeLookup>>,
    marshals: Option<BodyMarshals>,
}

impl UnirestBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn defaults(mut self, defaults: RequestDefaults) -> Self {
        self.config.defaults = defaults;
        self
    }

    /// Replace the network collaborator.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the file collaborator used for attachments.
    pub fn files(mut self, files: Arc<dyn FileOpener>) -> Self {
        self.files = Some(files);
        self
    }

    /// Replace the mime-lookup collaborator.
    pub fn mime(mut self, mime: Arc<dyn MimeLookup>) -> Self {
        self.mime = Some(mime);
        self
    }

    /// Register a body codec for a mimetype.
    pub fn marshal(mut self, mime: &str, codec: Arc<dyn BodyCodec>) -> Self {
        self.marshals.get_or_insert_with(BodyMarshals::default).register(mime, codec);
        self
    }

    pub fn build(self) -> Unirest {
        let mime = self
            .mime
            .unwrap_or_else(|| Arc::new(MimeTable::from_config(&self.config.mime)) as Arc<dyn MimeLookup>);
        let ctx = Context {
            transport: self.transport
                .unwrap_or_else(|| Arc::new(HttpTransport::new()) as Arc<dyn Transport>),
            files: self.files.unwrap_or_else(|| Arc::new(TokioFiles) as Arc<dyn FileOpener>),
            mime,
            marshals: self.marshals.unwrap_or_default(),
            defaults: self.config.defaults,
            metrics_enabled: self.config.observability.metrics_enabled,
        };
        Unirest { ctx: Arc::new(ctx) }
    }
}
