//! Attachment parts.
//!
//! An [`Attachment`] is either a ready-made MIME part passed through as is,
//! or a content triple (filename, bytes, mimetype) turned into a leaf part
//! when the message is rendered.

use crate::error::{Error, Result};
use mailwright_mime::{Charset, ContentType, Part, SinglePart};

/// An attachment carried by a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Caller-built MIME part, emitted unchanged.
    Part(Part),
    /// Raw content to be wrapped into a leaf part.
    Content {
        /// Name shown to the recipient; `None` sends no disposition.
        filename: Option<String>,
        /// Payload bytes.
        content: Vec<u8>,
        /// Mimetype such as `image/png`; guessed from the filename when
        /// `None`.
        content_type: Option<String>,
    },
}

impl Attachment {
    /// Creates a content attachment.
    ///
    /// An empty filename counts as no filename.
    #[must_use]
    pub fn content(
        filename: Option<&str>,
        content: impl Into<Vec<u8>>,
        content_type: Option<&str>,
    ) -> Self {
        Self::Content {
            filename: filename.filter(|f| !f.is_empty()).map(String::from),
            content: content.into(),
            content_type: content_type.map(String::from),
        }
    }

    /// Builds the MIME part for this attachment.
    ///
    /// Text content is re-encoded in `charset` and never base64-encoded;
    /// everything else is sent as base64.
    ///
    /// # Errors
    ///
    /// Returns an error if the mimetype is malformed or multipart, if text
    /// content is not valid UTF-8 or not representable in `charset`, or if
    /// the filename carries a line break.
    pub fn to_part(&self, charset: Charset) -> Result<Part> {
        match self {
            Self::Part(part) => Ok(part.clone()),
            Self::Content {
                filename,
                content,
                content_type,
            } => build_leaf(filename.as_deref(), content, content_type.as_deref(), charset),
        }
    }
}

impl From<Part> for Attachment {
    fn from(part: Part) -> Self {
        Self::Part(part)
    }
}

impl From<SinglePart> for Attachment {
    fn from(part: SinglePart) -> Self {
        Self::Part(part.into())
    }
}

fn build_leaf(
    filename: Option<&str>,
    content: &[u8],
    content_type: Option<&str>,
    charset: Charset,
) -> Result<Part> {
    let content_type = match content_type {
        Some(mimetype) => ContentType::parse(mimetype)?,
        None => guess_content_type(filename),
    };

    if content_type.is_multipart() {
        return Err(Error::InvalidAttachment(format!(
            "{} content must be attached as a part",
            content_type.essence()
        )));
    }

    let mut part = if content_type.is_text() {
        let text = std::str::from_utf8(content)
            .map_err(|e| mailwright_mime::Error::encoding("utf-8", e.to_string()))?;
        SinglePart::text(&content_type.sub_type, text, charset)?
    } else {
        SinglePart::base64(content_type, content)
    };

    if let Some(filename) = filename {
        part.set_header("Content-Disposition", &content_disposition(filename, charset)?)?;
    }

    Ok(part.into())
}

/// Guesses a content type from the filename extension.
///
/// Falls back to `application/octet-stream`.
#[must_use]
pub fn guess_content_type(filename: Option<&str>) -> ContentType {
    let Some(filename) = filename else {
        return ContentType::octet_stream();
    };

    let mime = mime_guess::from_path(filename).first_or_octet_stream();
    tracing::trace!(filename, mimetype = %mime.essence_str(), "Guessed attachment type");
    ContentType::new(mime.type_().as_str(), mime.subtype().as_str())
}

/// Formats an attachment `Content-Disposition` value.
///
/// ASCII names are quoted; other names use RFC 2231 `filename*`.
fn content_disposition(filename: &str, charset: Charset) -> Result<String> {
    if filename.contains(['\r', '\n']) {
        return Err(mailwright_mime::Error::HeaderInjection {
            name: "Content-Disposition".to_string(),
        }
        .into());
    }

    if filename.is_ascii() {
        let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
        Ok(format!("attachment; filename=\"{escaped}\""))
    } else {
        let encoded = mailwright_mime::encoding::encode_rfc2231(filename, charset)?;
        Ok(format!("attachment; filename*={encoded}"))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use mailwright_mime::TransferEncoding;

    fn leaf(attachment: &Attachment) -> SinglePart {
        attachment
            .to_part(Charset::utf8())
            .unwrap()
            .as_single()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_guess_png() {
        let part = leaf(&Attachment::content(Some("logo.png"), vec![0x89, b'P'], None));
        assert_eq!(part.content_type().essence(), "image/png");
        assert_eq!(part.encoding(), TransferEncoding::Base64);
        assert_eq!(
            part.headers().get("Content-Disposition"),
            Some("attachment; filename=\"logo.png\"")
        );
    }

    #[test]
    fn test_unknown_extension_defaults_to_octet_stream() {
        let part = leaf(&Attachment::content(Some("data.zzqx"), b"x".to_vec(), None));
        assert_eq!(part.content_type().essence(), "application/octet-stream");

        let part = leaf(&Attachment::content(None, b"x".to_vec(), None));
        assert_eq!(part.content_type().essence(), "application/octet-stream");
        assert!(part.headers().get("Content-Disposition").is_none());
    }

    #[test]
    fn test_empty_filename_is_none() {
        let attachment = Attachment::content(Some(""), b"x".to_vec(), None);
        assert!(matches!(attachment, Attachment::Content { filename: None, .. }));
    }

    #[test]
    fn test_text_attachment_is_not_base64() {
        let part = leaf(&Attachment::content(
            Some("notes.txt"),
            "line one\nline two".as_bytes().to_vec(),
            None,
        ));
        assert_eq!(part.content_type().to_string(), "text/plain; charset=utf-8");
        assert_eq!(part.encoding(), TransferEncoding::SevenBit);
        assert_eq!(part.body_text().unwrap(), "line one\nline two");
    }

    #[test]
    fn test_text_attachment_in_message_charset() {
        let latin = Charset::for_label("iso-8859-15").unwrap();
        let attachment = Attachment::content(Some("menu.txt"), "café".as_bytes(), Some("text/plain"));
        let part = attachment.to_part(latin).unwrap();
        let part = part.as_single().unwrap();
        assert_eq!(part.content_type().charset(), Some("iso-8859-15"));
        assert_eq!(part.body(), b"caf\xe9");
    }

    #[test]
    fn test_text_attachment_rejects_invalid_utf8() {
        let attachment = Attachment::content(Some("x.csv"), vec![0xFF, 0xFE], Some("text/csv"));
        assert!(matches!(
            attachment.to_part(Charset::utf8()),
            Err(Error::Mime(mailwright_mime::Error::Encoding { .. }))
        ));
    }

    #[test]
    fn test_explicit_mimetype_wins() {
        let part = leaf(&Attachment::content(
            Some("report.bin"),
            b"%PDF".to_vec(),
            Some("application/pdf"),
        ));
        assert_eq!(part.content_type().essence(), "application/pdf");
    }

    #[test]
    fn test_malformed_and_multipart_mimetypes() {
        let malformed = Attachment::content(Some("a"), b"x".to_vec(), Some("nonsense"));
        assert!(matches!(
            malformed.to_part(Charset::utf8()),
            Err(Error::Mime(mailwright_mime::Error::InvalidContentType(_)))
        ));

        let multipart = Attachment::content(Some("a"), b"x".to_vec(), Some("multipart/mixed"));
        assert!(matches!(
            multipart.to_part(Charset::utf8()),
            Err(Error::InvalidAttachment(_))
        ));
    }

    #[test]
    fn test_filename_injection() {
        let attachment = Attachment::content(
            Some("a.txt\r\nBcc: victim@example.com"),
            b"x".to_vec(),
            None,
        );
        let err = attachment.to_part(Charset::utf8()).unwrap_err();
        assert!(err.is_header_injection());
    }

    #[test]
    fn test_non_ascii_filename() {
        let part = leaf(&Attachment::content(Some("résumé.pdf"), b"%PDF".to_vec(), None));
        assert_eq!(part.content_type().essence(), "application/pdf");
        assert_eq!(
            part.headers().get("Content-Disposition"),
            Some("attachment; filename*=utf-8''r%C3%A9sum%C3%A9.pdf")
        );
    }

    #[test]
    fn test_quoted_filename_is_escaped() {
        let part = leaf(&Attachment::content(Some("say \"hi\".bin"), b"x".to_vec(), None));
        assert_eq!(
            part.headers().get("Content-Disposition"),
            Some("attachment; filename=\"say \\\"hi\\\".bin\"")
        );
    }

    #[test]
    fn test_raw_part_passes_through() {
        let raw = SinglePart::base64(ContentType::new("image", "gif"), b"GIF89a".to_vec())
            .with_header("Content-ID", "<logo@example.com>")
            .unwrap();
        let attachment = Attachment::from(raw.clone());
        assert_eq!(attachment.to_part(Charset::utf8()).unwrap(), Part::from(raw));
    }
}
