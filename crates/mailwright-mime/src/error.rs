//! Error types for MIME operations.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Header value carries a line break that is not a legal fold.
    #[error("Header injection rejected in {name} header")]
    HeaderInjection {
        /// Name of the offending header.
        name: String,
    },

    /// Invalid or reserved header name.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Charset label not known to the encoder.
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    /// Text cannot be represented in the requested charset.
    #[error("Cannot encode content as {charset}: {reason}")]
    Encoding {
        /// Charset the content was encoded into.
        charset: String,
        /// Why the content was rejected.
        reason: String,
    },

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),
}

impl Error {
    /// Creates an encoding error for the given charset.
    #[must_use]
    pub fn encoding(charset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encoding {
            charset: charset.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error rejected a header line break.
    #[must_use]
    pub const fn is_header_injection(&self) -> bool {
        matches!(self, Self::HeaderInjection { .. })
    }
}
