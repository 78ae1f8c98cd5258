//! Document configuration.
//!
//! [`DocumentConfig`] can be built in code or deserialized from application
//! settings:
//!
//! ```
//! use horizon_weave_dom::DocumentConfig;
//!
//! let config = DocumentConfig::new()
//!     .with_trim_text(false)
//!     .with_body_tag("main");
//! assert_eq!(config.body_tag, "main");
//! ```

use serde::Deserialize;

/// Settings for an in-memory [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Drop whitespace-only text between tags. Other text is kept verbatim.
    pub trim_text: bool,
    /// Reject closing tags that do not match the open element.
    pub check_end_names: bool,
    /// Tag name of the document body element.
    pub body_tag: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            trim_text: true,
            check_end_names: true,
            body_tag: "body".to_string(),
        }
    }
}

impl DocumentConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether whitespace-only text is dropped while parsing.
    pub fn with_trim_text(mut self, trim: bool) -> Self {
        self.trim_text = trim;
        self
    }

    /// Set whether mismatched closing tags are rejected.
    pub fn with_check_end_names(mut self, check: bool) -> Self {
        self.check_end_names = check;
        self
    }

    /// Set the body element's tag name.
    pub fn with_body_tag(mut self, tag: impl Into<String>) -> Self {
        self.body_tag = tag.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocumentConfig::default();
        assert!(config.trim_text);
        assert!(config.check_end_names);
        assert_eq!(config.body_tag, "body");
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: DocumentConfig = serde_json::from_str(r#"{"trim_text": false}"#).unwrap();
        assert!(!config.trim_text);
        assert!(config.check_end_names);
        assert_eq!(config.body_tag, "body");
    }

    #[test]
    fn test_deserialize_from_toml() {
        let config: DocumentConfig = toml::from_str(
            r#"
            check_end_names = false
            body_tag = "main"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            DocumentConfig::new()
                .with_check_end_names(false)
                .with_body_tag("main")
        );
    }
}
