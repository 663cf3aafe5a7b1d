//! MIME content type handling.

use crate::error::{Error, Result};
use std::fmt;

/// Characters that force a parameter value to be quoted (RFC 2045 tspecials).
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// MIME content type with parameters.
///
/// Parameters keep their insertion order so the rendered header is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_ascii_lowercase(),
            sub_type: sub_type.into().to_ascii_lowercase(),
            parameters: Vec::new(),
        }
    }

    /// Creates a `text/<subtype>` content type with a charset parameter.
    #[must_use]
    pub fn text(sub_type: impl Into<String>, charset: impl Into<String>) -> Self {
        Self::new("text", sub_type).with_parameter("charset", charset)
    }

    /// Creates a `multipart/<subtype>` content type with a boundary.
    #[must_use]
    pub fn multipart(sub_type: impl Into<String>, boundary: impl Into<String>) -> Self {
        Self::new("multipart", sub_type).with_parameter("boundary", boundary)
    }

    /// Creates the `application/octet-stream` content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Adds a parameter, replacing any existing value for the same key.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_parameter(key, value);
        self
    }

    /// Sets a parameter, replacing any existing value for the same key.
    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().to_ascii_lowercase();
        let value = value.into();
        match self.parameters.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.parameters.push((key, value)),
        }
    }

    /// Returns a parameter value by (case-insensitive) key.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing or contains
    /// whitespace or control characters.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        let type_str = parts.next().unwrap_or_default().trim();
        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype in {s:?}")))?;

        let main_type = main_type.trim();
        let sub_type = sub_type.trim();
        for token in [main_type, sub_type] {
            if token.is_empty() || !token.chars().all(is_token_char) {
                return Err(Error::InvalidContentType(format!(
                    "Invalid token {token:?} in {s:?}"
                )));
            }
        }

        let mut content_type = Self::new(main_type, sub_type);

        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                let value = value.trim().trim_matches('"');
                content_type.set_parameter(key.trim(), value);
            }
        }

        Ok(content_type)
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !TSPECIALS.contains(c)
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            if value.is_empty() || value.contains(|c: char| c.is_whitespace() || TSPECIALS.contains(c)) {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {key}=\"{escaped}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_new() {
        let ct = ContentType::new("Image", "PNG");
        assert_eq!(ct.main_type, "image");
        assert_eq!(ct.sub_type, "png");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_text() {
        let ct = ContentType::text("plain", "utf-8");
        assert!(ct.is_text());
        assert_eq!(ct.essence(), "text/plain");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.to_string(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_multipart() {
        let ct = ContentType::multipart("mixed", "=_abc123");
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("=_abc123"));
        assert_eq!(ct.to_string(), "multipart/mixed; boundary=\"=_abc123\"");
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.sub_type, "mixed");
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_content_type_parse_rejects_malformed() {
        assert!(ContentType::parse("png").is_err());
        assert!(ContentType::parse("image/").is_err());
        assert!(ContentType::parse("/png").is_err());
        assert!(ContentType::parse("ima ge/png").is_err());
    }

    #[test]
    fn test_parameters_keep_order() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "iso-8859-1")
            .with_parameter("format", "flowed")
            .with_parameter("CHARSET", "utf-8");

        assert_eq!(ct.to_string(), "text/plain; charset=utf-8; format=flowed");
    }
}
