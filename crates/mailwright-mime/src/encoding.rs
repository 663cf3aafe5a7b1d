//! MIME encoding utilities.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 header words, RFC 2231
//! parameter values, and charset conversion for text payloads.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use encoding_rs::Encoding;
use std::fmt;
use std::fmt::Write as _;

/// Maximum line length for Base64 and Quoted-Printable bodies (RFC 2045).
const MAX_LINE_LENGTH: usize = 76;

/// Maximum length of a single RFC 2047 encoded word.
const ENCODED_WORD_MAX: usize = 75;

/// Character set used to turn text into payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// The UTF-8 charset.
    #[must_use]
    pub fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    /// Resolves a charset label such as `utf-8` or `iso-8859-15`.
    ///
    /// # Errors
    ///
    /// Returns an error if the label is unknown, or names an encoding that
    /// cannot be produced for outgoing mail (UTF-16, `replacement`).
    pub fn for_label(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| Error::UnknownCharset(label.to_string()))?;

        if encoding.output_encoding() != encoding {
            return Err(Error::encoding(
                label,
                "charset cannot be used for outgoing mail",
            ));
        }

        Ok(Self(encoding))
    }

    /// Returns the canonical lowercase charset name (e.g. `utf-8`).
    #[must_use]
    pub fn name(&self) -> String {
        self.0.name().to_ascii_lowercase()
    }

    /// Checks if this is UTF-8.
    #[must_use]
    pub fn is_utf8(&self) -> bool {
        self.0 == encoding_rs::UTF_8
    }

    /// Encodes text into this charset.
    ///
    /// # Errors
    ///
    /// Returns an error if the text contains characters the charset cannot
    /// represent.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        if self.is_utf8() {
            return Ok(text.as_bytes().to_vec());
        }

        let (bytes, _, had_errors) = self.0.encode(text);
        if had_errors {
            return Err(Error::encoding(
                self.name(),
                "text contains unmappable characters",
            ));
        }

        Ok(bytes.into_owned())
    }

    /// Decodes payload bytes produced by [`Charset::encode`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed for this charset.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        if self.is_utf8() {
            return String::from_utf8(bytes.to_vec()).map_err(Into::into);
        }

        let (text, had_errors) = self.0.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(Error::encoding(self.name(), "malformed byte sequence"));
        }

        Ok(text.into_owned())
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into CRLF-separated 76-column lines.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);

    for (i, line) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        result.extend(line.iter().copied().map(char::from));
    }

    result
}

/// Encodes bytes using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input (LF or CRLF) become hard CRLF breaks; encoded
/// lines are kept within 76 columns using soft breaks.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() + data.len() / 2);
    let mut line_length = 0;
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];

        if byte == b'\n' || (byte == b'\r' && data.get(i + 1) == Some(&b'\n')) {
            result.push_str("\r\n");
            line_length = 0;
            i += if byte == b'\r' { 2 } else { 1 };
            continue;
        }

        let at_line_end = match data.get(i + 1) {
            None | Some(b'\n') => true,
            Some(b'\r') => data.get(i + 2) == Some(&b'\n'),
            Some(_) => false,
        };

        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            // Trailing whitespace would be stripped in transit
            b' ' | b'\t' => !at_line_end,
            _ => false,
        };

        let width = if literal { 1 } else { 3 };
        let limit = if at_line_end {
            MAX_LINE_LENGTH
        } else {
            MAX_LINE_LENGTH - 1
        };

        if line_length + width > limit {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
        i += 1;
    }

    result
}

/// Encodes a header value using RFC 2047 `B` encoded words.
///
/// Format: `=?charset?B?encoded-text?=`. Plain ASCII passes through
/// unchanged. Long values are split into several words separated by a
/// space so the serializer can fold between them.
///
/// # Errors
///
/// Returns an error if the text cannot be represented in `charset`.
pub fn encode_rfc2047(text: &str, charset: Charset) -> Result<String> {
    if text.is_ascii() && !text.contains("=?") {
        return Ok(text.to_string());
    }

    let name = charset.name();
    let overhead = "=?".len() + name.len() + "?B?".len() + "?=".len();
    let max_bytes = (ENCODED_WORD_MAX.saturating_sub(overhead) / 4 * 3).max(3);

    let mut words = Vec::new();
    let mut chunk: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4];

    for c in text.chars() {
        let bytes = charset.encode(c.encode_utf8(&mut buf))?;
        if !chunk.is_empty() && chunk.len() + bytes.len() > max_bytes {
            words.push(format!("=?{name}?B?{}?=", encode_base64(&chunk)));
            chunk.clear();
        }
        chunk.extend_from_slice(&bytes);
    }

    if !chunk.is_empty() {
        words.push(format!("=?{name}?B?{}?=", encode_base64(&chunk)));
    }

    Ok(words.join(" "))
}

/// Encodes a MIME parameter value as an RFC 2231 extended value.
///
/// Format: `charset''percent-encoded`.
///
/// # Errors
///
/// Returns an error if the value cannot be represented in `charset`.
pub fn encode_rfc2231(value: &str, charset: Charset) -> Result<String> {
    let bytes = charset.encode(value)?;
    let mut result = format!("{}''", charset.name());

    for byte in bytes {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "%{byte:02X}");
        }
    }

    Ok(result)
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
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
    }

    #[test]
    fn test_base64_lines_wrap_at_76() {
        let data = vec![0xAB_u8; 200];
        let encoded = encode_base64_lines(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[..3].iter().all(|l| l.len() == 76));
        assert_eq!(lines.concat(), encode_base64(&data));
    }

    #[test]
    fn test_quoted_printable_encode() {
        assert_eq!(encode_quoted_printable(b"Hello, World!"), "Hello, World!");

        let encoded = encode_quoted_printable("Héllo, Wørld!".as_bytes());
        assert!(encoded.contains("=C3=A9"));
    }

    #[test]
    fn test_quoted_printable_line_breaks() {
        assert_eq!(encode_quoted_printable(b"a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(encode_quoted_printable(b"trailing \nx"), "trailing=20\r\nx");
        assert_eq!(encode_quoted_printable(b"a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let text = "x".repeat(200);
        let encoded = encode_quoted_printable(text.as_bytes());
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76, "line too long: {}", line.len());
        }
        assert_eq!(encoded.replace("=\r\n", ""), text);
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello", Charset::utf8()).unwrap(), "Hello");
        assert_eq!(
            encode_rfc2047("Héllo", Charset::utf8()).unwrap(),
            "=?utf-8?B?SMOpbGxv?="
        );
    }

    #[test]
    fn test_rfc2047_splits_long_values() {
        let text = "é".repeat(60);
        let encoded = encode_rfc2047(&text, Charset::utf8()).unwrap();
        let words: Vec<&str> = encoded.split(' ').collect();
        assert!(words.len() > 1);
        for word in words {
            assert!(word.len() <= 75);
            assert!(word.starts_with("=?utf-8?B?") && word.ends_with("?="));
        }
    }

    #[test]
    fn test_rfc2231_encode() {
        assert_eq!(
            encode_rfc2231("résumé.pdf", Charset::utf8()).unwrap(),
            "utf-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[test]
    fn test_charset_labels() {
        assert!(Charset::for_label("UTF-8").unwrap().is_utf8());
        assert_eq!(Charset::for_label("iso-8859-15").unwrap().name(), "iso-8859-15");
        assert!(matches!(
            Charset::for_label("klingon"),
            Err(Error::UnknownCharset(_))
        ));
        assert!(matches!(
            Charset::for_label("utf-16"),
            Err(Error::Encoding { .. })
        ));
    }

    #[test]
    fn test_charset_unmappable() {
        let latin = Charset::for_label("iso-8859-15").unwrap();
        assert_eq!(latin.encode("café").unwrap(), b"caf\xe9");
        assert!(matches!(latin.encode("日本"), Err(Error::Encoding { .. })));
    }

    proptest! {
        #[test]
        fn prop_base64_lines_are_bounded(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let encoded = encode_base64_lines(&data);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= 76);
            }
        }

        #[test]
        fn prop_quoted_printable_is_ascii_and_bounded(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let encoded = encode_quoted_printable(&data);
            prop_assert!(encoded.is_ascii());
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= 76);
            }
        }
    }
}
