//! Error types for message construction.

use std::io;

/// Result type alias for message operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message construction error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// MIME construction, header sanitizing or encoding failed.
    #[error(transparent)]
    Mime(#[from] mailwright_mime::Error),

    /// Reading an attachment file failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Attachment arguments cannot form a MIME part.
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),
}

impl Error {
    /// Returns true if a header value carried an injected line break.
    #[must_use]
    pub const fn is_header_injection(&self) -> bool {
        match self {
            Self::Mime(err) => err.is_header_injection(),
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_is_transparent() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing.pdf").into();
        assert_eq!(err.to_string(), "missing.pdf");
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn test_header_injection_detection() {
        let err: Error = mailwright_mime::Error::HeaderInjection {
            name: "Subject".into(),
        }
        .into();
        assert!(err.is_header_injection());
        assert!(!Error::InvalidAttachment("x".into()).is_header_injection());
    }
}
