//! Fluent HTTP request builder with normalized responses.

pub mod client;
pub mod collections;
pub mod config;
pub mod error;
pub mod files;
pub mod marshal;
pub mod mime;
pub mod observability;
pub mod request;
pub mod response;
pub mod transport;

use std::sync::OnceLock;

pub use client::{Unirest, UnirestBuilder};
pub use collections::{Headers, OrderedMap, Query, ValueMap};
pub use config::ClientConfig;
pub use error::Error;
pub use request::{Auth, Body, Request};
pub use response::{Response, StreamedResponse};
pub use transport::{CookieJar, JarOptions, Transport, TransportError};

fn shared() -> &'static Unirest {
    static CLIENT: OnceLock<Unirest> = OnceLock::new();
    CLIENT.get_or_init(Unirest::new)
}

/// `GET` through the shared default client.
pub fn get(url: impl Into<String>) -> Request {
    shared().get(url)
}

/// `HEAD` through the shared default client.
pub fn head(url: impl Into<String>) -> Request {
    shared().head(url)
}

/// `PUT` through the shared default client.
pub fn put(url: impl Into<String>) -> Request {
    shared().put(url)
}

/// `POST` through the shared default client.
pub fn post(url: impl Into<String>) -> Request {
    shared().post(url)
}

/// `PATCH` through the shared default client.
pub fn patch(url: impl Into<String>) -> Request {
    shared().patch(url)
}

/// `DELETE` through the shared default client.
pub fn delete(url: impl Into<String>) -> Request {
    shared().delete(url)
}

/// `OPTIONS` through the shared default client.
pub fn options(url: impl Into<String>) -> Request {
    shared().options(url)
}
