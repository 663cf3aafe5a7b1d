//! Message configuration.

use crate::error::Result;
use mailwright_mime::Charset;

/// Default charset for bodies and encoded header words.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Default right-hand side of generated Message-IDs.
pub const DEFAULT_MESSAGE_ID_DOMAIN: &str = "localhost";

/// Settings applied when a message is built and rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct MessageConfig {
    /// Charset label for text parts and RFC 2047 header words.
    pub charset: String,
    /// Domain used in generated Message-IDs.
    pub message_id_domain: String,
    /// Whether Bcc recipients are written into the header block.
    pub include_bcc_header: bool,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            charset: DEFAULT_CHARSET.to_string(),
            message_id_domain: DEFAULT_MESSAGE_ID_DOMAIN.to_string(),
            include_bcc_header: true,
        }
    }
}

impl MessageConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the charset label.
    #[must_use]
    pub fn charset_label(mut self, label: impl Into<String>) -> Self {
        self.charset = label.into();
        self
    }

    /// Sets the Message-ID domain.
    #[must_use]
    pub fn message_id_domain(mut self, domain: impl Into<String>) -> Self {
        self.message_id_domain = domain.into();
        self
    }

    /// Sets whether Bcc is written into the header block.
    #[must_use]
    pub const fn include_bcc_header(mut self, include: bool) -> Self {
        self.include_bcc_header = include;
        self
    }

    /// Resolves the configured charset label.
    ///
    /// # Errors
    ///
    /// Returns an error if the label is unknown or cannot be used for
    /// outgoing mail.
    pub fn charset(&self) -> Result<Charset> {
        Ok(Charset::for_label(&self.charset)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = MessageConfig::default();
        assert_eq!(config.charset, "utf-8");
        assert_eq!(config.message_id_domain, "localhost");
        assert!(config.include_bcc_header);
        assert!(config.charset().unwrap().is_utf8());
    }

    #[test]
    fn test_chained_setters() {
        let config = MessageConfig::new()
            .charset_label("ISO-8859-15")
            .message_id_domain("mail.example.com")
            .include_bcc_header(false);

        assert_eq!(config.charset().unwrap().name(), "iso-8859-15");
        assert_eq!(config.message_id_domain, "mail.example.com");
        assert!(!config.include_bcc_header);
    }

    #[test]
    fn test_unknown_charset() {
        let config = MessageConfig::new().charset_label("klingon");
        assert!(matches!(
            config.charset(),
            Err(Error::Mime(mailwright_mime::Error::UnknownCharset(_)))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_partial() {
        let config: MessageConfig =
            serde_json::from_str(r#"{"message_id_domain": "example.org"}"#).unwrap();
        assert_eq!(config.charset, "utf-8");
        assert_eq!(config.message_id_domain, "example.org");
        assert!(config.include_bcc_header);
    }
}
