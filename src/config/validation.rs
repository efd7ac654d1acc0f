//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, redirect limits)
//! - Check header names/values and proxy URLs are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use http::header::{HeaderName, HeaderValue};

use crate::config::schema::ClientConfig;

/// Upper bound accepted for `max_redirects`.
pub const MAX_REDIRECT_LIMIT: usize = 100;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let defaults = &config.defaults;

    if defaults.timeout_ms == Some(0) {
        errors.push(ValidationError::new("defaults.timeout_ms", "must be greater than 0"));
    }

    if defaults.max_redirects > MAX_REDIRECT_LIMIT {
        errors.push(ValidationError::new(
            "defaults.max_redirects",
            format!("must be at most {}", MAX_REDIRECT_LIMIT),
        ));
    }

    if defaults.pool_max_idle == Some(0) {
        errors.push(ValidationError::new("defaults.pool_max_idle", "must be greater than 0"));
    }

    if let Some(proxy) = &defaults.proxy {
        match url::Url::parse(proxy) {
            Ok(parsed) if parsed.host_str().is_some() => {}
            Ok(_) => errors.push(ValidationError::new("defaults.proxy", "proxy URL has no host")),
            Err(e) => errors.push(ValidationError::new("defaults.proxy", format!("invalid URL: {}", e))),
        }
    }

    for (name, value) in &defaults.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("defaults.headers.{}", name),
                "invalid header name",
            ));
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(
                format!("defaults.headers.{}", name),
                "invalid header value",
            ));
        }
    }

    for (alias, mime) in &config.mime.aliases {
        if !mime.contains('/') {
            errors.push(ValidationError::new(
                format!("mime.aliases.{}", alias),
                "mimetype must contain '/'",
            ));
        }
    }

    if config.observability.log_level.parse::<tracing::Level>().is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            "must be one of trace, debug, info, warn, error",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ClientConfig::default();
        config.defaults.timeout_ms = Some(0);
        config.defaults.max_redirects = 1000;
        config.defaults.proxy = Some("::not a url".into());
        config.defaults.headers.insert("Bad Header".into(), "ok".into());
        config.defaults.headers.insert("X-Ok".into(), "line\nbreak".into());
        config.mime.aliases.insert("yaml".into(), "yaml".into());
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "defaults.timeout_ms",
                "defaults.max_redirects",
                "defaults.proxy",
                "defaults.headers.Bad Header",
                "defaults.headers.X-Ok",
                "mime.aliases.yaml",
                "observability.log_level",
            ]
        );
    }
}
