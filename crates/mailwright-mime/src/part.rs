//! MIME part tree.
//!
//! A part is either a leaf ([`SinglePart`]) carrying a payload, or a
//! container ([`MultiPart`]) carrying an ordered list of child parts.

use crate::content_type::ContentType;
use crate::encoding::Charset;
use crate::error::Result;
use crate::header::Headers;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;

/// Longest line allowed in 7bit/8bit bodies, excluding CRLF (RFC 5322).
const MAX_LINE_OCTETS: usize = 998;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }

    /// Picks the encoding for a text payload already encoded in `charset`.
    ///
    /// ASCII stays 7bit, UTF-8 is sent as 8bit, anything else (or any line
    /// longer than 998 octets) becomes quoted-printable.
    #[must_use]
    pub fn for_text(body: &[u8], charset: Charset) -> Self {
        let long_lines = body
            .split(|&b| b == b'\n')
            .any(|line| line.len() > MAX_LINE_OCTETS);

        if long_lines {
            Self::QuotedPrintable
        } else if body.is_ascii() {
            Self::SevenBit
        } else if charset.is_utf8() {
            Self::EightBit
        } else {
            Self::QuotedPrintable
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// The kind of multipart container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MultiPartKind {
    /// Unrelated parts shown together, e.g. a body and its attachments.
    Mixed,
    /// Several renderings of the same content, e.g. plain text and HTML.
    Alternative,
    /// Content plus the resources it references.
    Related,
}

impl MultiPartKind {
    /// Returns the multipart subtype.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mixed => "mixed",
            Self::Alternative => "alternative",
            Self::Related => "related",
        }
    }
}

impl fmt::Display for MultiPartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates a random multipart boundary.
///
/// Boundaries start with `=_`, a sequence that cannot occur in Base64 or
/// Quoted-Printable output.
#[must_use]
pub fn generate_boundary() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(28)
        .map(char::from)
        .collect();
    format!("=_{token}")
}

/// MIME leaf part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinglePart {
    content_type: ContentType,
    encoding: TransferEncoding,
    headers: Headers,
    body: Vec<u8>,
}

impl SinglePart {
    /// Creates a leaf with an unencoded payload.
    ///
    /// The payload is encoded according to `encoding` when serialized.
    #[must_use]
    pub fn new(
        content_type: ContentType,
        encoding: TransferEncoding,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            content_type,
            encoding,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Creates a `text/<subtype>` leaf with the text encoded in `charset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be represented in `charset`.
    pub fn text(sub_type: &str, text: &str, charset: Charset) -> Result<Self> {
        let body = charset.encode(text)?;
        let encoding = TransferEncoding::for_text(&body, charset);

        Ok(Self {
            content_type: ContentType::text(sub_type, charset.name()),
            encoding,
            headers: Headers::with_charset(charset),
            body,
        })
    }

    /// Creates a Base64-encoded leaf for arbitrary bytes.
    #[must_use]
    pub fn base64(content_type: ContentType, body: impl Into<Vec<u8>>) -> Self {
        Self::new(content_type, TransferEncoding::Base64, body)
    }

    /// Gets the content type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub const fn encoding(&self) -> TransferEncoding {
        self.encoding
    }

    /// Get the headers from the part.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Sets a header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header fails sanitizing.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.headers.set(name, value)
    }

    /// Sets a header and moves the part.
    ///
    /// # Errors
    ///
    /// Returns an error if the header fails sanitizing.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Gets the unencoded payload.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decodes the payload as text using the declared charset.
    ///
    /// # Errors
    ///
    /// Returns an error if the charset is unknown or the payload is not
    /// valid in it.
    pub fn body_text(&self) -> Result<String> {
        let charset = match self.content_type.charset() {
            Some(label) => Charset::for_label(label)?,
            None => Charset::utf8(),
        };
        charset.decode(&self.body)
    }
}

/// MIME container part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPart {
    kind: MultiPartKind,
    boundary: String,
    headers: Headers,
    parts: Vec<Part>,
}

impl MultiPart {
    /// Creates an empty container with the given boundary.
    #[must_use]
    pub fn new(kind: MultiPartKind, boundary: impl Into<String>) -> Self {
        Self {
            kind,
            boundary: boundary.into(),
            headers: Headers::new(),
            parts: Vec::new(),
        }
    }

    /// Creates an empty container with a random boundary.
    #[must_use]
    pub fn with_random_boundary(kind: MultiPartKind) -> Self {
        Self::new(kind, generate_boundary())
    }

    /// Sets the charset used to encode header values and moves the part.
    ///
    /// Headers already set keep their encoding.
    #[must_use]
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.headers.set_charset(charset);
        self
    }

    /// Adds a sub-part and moves the container.
    #[must_use]
    pub fn part(mut self, part: impl Into<Part>) -> Self {
        self.push(part);
        self
    }

    /// Adds a sub-part.
    pub fn push(&mut self, part: impl Into<Part>) {
        self.parts.push(part.into());
    }

    /// Gets the multipart kind.
    #[must_use]
    pub const fn kind(&self) -> MultiPartKind {
        self.kind
    }

    /// Gets the boundary.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Gets the content type, including the boundary parameter.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        ContentType::multipart(self.kind.as_str(), self.boundary.as_str())
    }

    /// Get the headers from the container.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Sets a header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header fails sanitizing.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.headers.set(name, value)
    }

    /// Get the sub-parts.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

/// MIME part variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Single part with content.
    Single(SinglePart),
    /// Multiple parts of content.
    Multi(MultiPart),
}

impl Part {
    /// Gets the content type.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Single(part) => part.content_type().clone(),
            Self::Multi(part) => part.content_type(),
        }
    }

    /// Get the headers from the part.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        match self {
            Self::Single(part) => part.headers(),
            Self::Multi(part) => part.headers(),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name)
    }

    /// Sets a header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header fails sanitizing; the part is left
    /// unchanged.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        match self {
            Self::Single(part) => part.set_header(name, value),
            Self::Multi(part) => part.set_header(name, value),
        }
    }

    /// Checks if this is a container.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// Returns the leaf, if this is one.
    #[must_use]
    pub const fn as_single(&self) -> Option<&SinglePart> {
        match self {
            Self::Single(part) => Some(part),
            Self::Multi(_) => None,
        }
    }

    /// Returns the container, if this is one.
    #[must_use]
    pub const fn as_multi(&self) -> Option<&MultiPart> {
        match self {
            Self::Multi(part) => Some(part),
            Self::Single(_) => None,
        }
    }

    /// Returns the child parts (empty for a leaf).
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        match self {
            Self::Single(_) => &[],
            Self::Multi(part) => part.parts(),
        }
    }
}

impl From<SinglePart> for Part {
    fn from(part: SinglePart) -> Self {
        Self::Single(part)
    }
}

impl From<MultiPart> for Part {
    fn from(part: MultiPart) -> Self {
        Self::Multi(part)
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

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("base64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_transfer_encoding_for_text() {
        let utf8 = Charset::utf8();
        let latin = Charset::for_label("iso-8859-1").unwrap();

        assert_eq!(TransferEncoding::for_text(b"plain", utf8), TransferEncoding::SevenBit);
        assert_eq!(
            TransferEncoding::for_text("héllo".as_bytes(), utf8),
            TransferEncoding::EightBit
        );
        assert_eq!(
            TransferEncoding::for_text(b"h\xe9llo", latin),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(
            TransferEncoding::for_text("a".repeat(1200).as_bytes(), utf8),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_text_part() {
        let part = SinglePart::text("plain", "Hello, World!", Charset::utf8()).unwrap();
        assert_eq!(part.content_type().to_string(), "text/plain; charset=utf-8");
        assert_eq!(part.encoding(), TransferEncoding::SevenBit);
        assert_eq!(part.body(), b"Hello, World!");
        assert_eq!(part.body_text().unwrap(), "Hello, World!");
    }

    #[test]
    fn test_text_part_in_other_charset() {
        let latin = Charset::for_label("iso-8859-15").unwrap();
        let part = SinglePart::text("plain", "café", latin).unwrap();
        assert_eq!(part.body(), b"caf\xe9");
        assert_eq!(part.content_type().charset(), Some("iso-8859-15"));
        assert_eq!(part.body_text().unwrap(), "café");
    }

    #[test]
    fn test_base64_part() {
        let part = SinglePart::base64(ContentType::new("image", "png"), vec![0x89, b'P']);
        assert_eq!(part.encoding(), TransferEncoding::Base64);
        assert_eq!(part.body(), &[0x89, b'P']);
    }

    #[test]
    fn test_generate_boundary() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert!(a.starts_with("=_"));
        assert_eq!(a.len(), 30);
        assert_ne!(a, b);
    }

    #[test]
    fn test_multipart_tree() {
        let text = SinglePart::text("plain", "Plain", Charset::utf8()).unwrap();
        let html = SinglePart::text("html", "<p>Html</p>", Charset::utf8()).unwrap();
        let part: Part = MultiPart::new(MultiPartKind::Alternative, "=_b1")
            .part(text)
            .part(html)
            .into();

        assert!(part.is_multipart());
        assert_eq!(
            part.content_type().to_string(),
            "multipart/alternative; boundary=\"=_b1\""
        );
        assert_eq!(part.parts().len(), 2);
        assert_eq!(part.parts()[0].content_type().sub_type, "plain");
        assert_eq!(part.parts()[1].content_type().sub_type, "html");
    }

    #[test]
    fn test_part_set_header() {
        let mut part: Part = SinglePart::text("plain", "x", Charset::utf8()).unwrap().into();
        part.set_header("Subject", "Hi").unwrap();
        assert_eq!(part.header("subject"), Some("Hi"));

        assert!(part.set_header("Subject", "Hi\nBcc: x@example.com").is_err());
        assert_eq!(part.header("subject"), Some("Hi"));
    }

    #[test]
    fn test_multipart_with_charset_keeps_headers() {
        let mut multi = MultiPart::new(MultiPartKind::Mixed, "=_b");
        multi.set_header("X-Tag", "one").unwrap();
        let multi = multi.with_charset(Charset::for_label("iso-8859-15").unwrap());

        assert_eq!(multi.headers().get("X-Tag"), Some("one"));
        assert_eq!(multi.headers().charset().name(), "iso-8859-15");
    }

    #[test]
    fn test_multipart_with_charset_keeps_encoded_values() {
        let mut multi = MultiPart::new(MultiPartKind::Mixed, "=_b");
        multi.set_header("Subject", "日本語").unwrap();
        multi
            .set_header("To", "Jürgen <jürgen@example.com>, b@example.com")
            .unwrap();
        let before: Vec<(String, String)> = multi
            .headers()
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();

        let mut multi = multi.with_charset(Charset::for_label("iso-8859-15").unwrap());
        let after: Vec<(String, String)> = multi
            .headers()
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        assert_eq!(before, after);

        multi.set_header("X-Note", "café").unwrap();
        assert_eq!(multi.headers().get("X-Note"), Some("=?iso-8859-15?B?Y2Fm6Q==?="));
    }
}
