//! Configuration schema definitions.
//!
//! This module defines the configuration structure for a client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::request::options::{ResponseEncoding, DEFAULT_MAX_REDIRECTS};

/// Root configuration for a client.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Values every request starts from.
    pub defaults: RequestDefaults,

    /// Mime-type lookup table extensions.
    pub mime: MimeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Per-request defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RequestDefaults {
    /// Headers added to every request.
    pub headers: BTreeMap<String, String>,

    /// Request timeout in milliseconds (unset = no timeout).
    pub timeout_ms: Option<u64>,

    /// Follow redirects for GET/HEAD.
    pub follow_redirect: bool,

    /// Follow redirects for every method.
    pub follow_all_redirects: bool,

    /// Maximum redirect hops.
    pub max_redirects: usize,

    /// Verify TLS certificates.
    pub strict_ssl: bool,

    /// Proxy URL for every request.
    pub proxy: Option<String>,

    /// Response body decoding.
    pub encoding: ResponseEncoding,

    /// Idle connections kept per host.
    pub pool_max_idle: Option<usize>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            timeout_ms: None,
            follow_redirect: true,
            follow_all_redirects: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            strict_ssl: true,
            proxy: None,
            encoding: ResponseEncoding::Utf8,
            pool_max_idle: None,
        }
    }
}

/// Mime-type lookup configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MimeConfig {
    /// Short name to mimetype, e.g. `yaml = "application/yaml"`.
    pub aliases: BTreeMap<String, String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record request metrics through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(config.defaults.follow_redirect);
        assert_eq!(config.defaults.max_redirects, 10);
    }

    #[test]
    fn test_full_config() {
        let config: ClientConfig = toml::from_str(
            r#"
            [defaults]
            timeout_ms = 2500
            encoding = "binary"
            strict_ssl = false

            [defaults.headers]
            "User-Agent" = "unirest-rs"

            [mime.aliases]
            yaml = "application/yaml"

            [observability]
            log_level = "debug"
            metrics_enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.defaults.timeout_ms, Some(2500));
        assert_eq!(config.defaults.encoding, ResponseEncoding::Binary);
        assert!(!config.defaults.strict_ssl);
        assert_eq!(config.defaults.headers["User-Agent"], "unirest-rs");
        assert_eq!(config.mime.aliases["yaml"], "application/yaml");
        assert!(!config.observability.metrics_enabled);
    }
}
