//! Mime-type lookup collaborator.

use std::collections::HashMap;
use std::path::Path;

use crate::config::MimeConfig;
use crate::marshal::body::FORM;

/// Fallback for names nothing knows about.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Resolves short names and extensions to mimetypes.
pub trait MimeLookup: Send + Sync {
    /// `json` → `application/json`, `form` → urlencoded, unknown → octet-stream.
    fn lookup(&self, name: &str) -> String;

    /// Mimetype for a file path, by extension.
    fn for_path(&self, path: &Path) -> String {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.lookup(ext),
            None => DEFAULT_MIME.to_string(),
        }
    }
}

/// Alias table in front of `mime_guess`'s extension database.
#[derive(Debug, Clone)]
pub struct MimeTable {
    aliases: HashMap<String, String>,
}

impl MimeTable {
    /// Table with the built-in form aliases.
    pub fn new() -> Self {
        let mut table = Self {
            aliases: HashMap::new(),
        };
        for alias in ["form", "urlencoded", "form-data"] {
            table.define(alias, FORM);
        }
        table
    }

    /// Built-in aliases plus configured ones.
    pub fn from_config(config: &MimeConfig) -> Self {
        let mut table = Self::new();
        for (alias, mime) in &config.aliases {
            table.define(alias, mime);
        }
        table
    }

    /// Add or replace an alias.
    pub fn define(&mut self, alias: &str, mime: &str) {
        self.aliases.insert(alias.to_ascii_lowercase(), mime.to_string());
    }
}

impl Default for MimeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MimeLookup for MimeTable {
    fn lookup(&self, name: &str) -> String {
        let key = name.trim().trim_start_matches('.').to_ascii_lowercase();
        if let Some(mime) = self.aliases.get(&key) {
            return mime.clone();
        }
        mime_guess::from_ext(&key)
            .first_raw()
            .unwrap_or(DEFAULT_MIME)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_aliases() {
        let table = MimeTable::new();
        assert_eq!(table.lookup("form"), FORM);
        assert_eq!(table.lookup("Form-Data"), FORM);
        assert_eq!(table.lookup("json"), "application/json");
        assert_eq!(table.lookup(".html"), "text/html");
        assert_eq!(table.lookup("no-such-thing"), DEFAULT_MIME);
    }

    #[test]
    fn test_configured_aliases_and_paths() {
        let mut config = MimeConfig::default();
        config.aliases.insert("hal".into(), "application/hal+json".into());
        let table = MimeTable::from_config(&config);
        assert_eq!(table.lookup("hal"), "application/hal+json");
        assert_eq!(table.for_path(Path::new("/tmp/photo.PNG")), "image/png");
        assert_eq!(table.for_path(Path::new("/tmp/README")), DEFAULT_MIME);
    }
}
