//! Header sanitizing and the ordered header collection.
//!
//! Every header value stored in [`Headers`] goes through [`sanitize`], which
//! rejects line breaks that are not legal folding and RFC 2047-encodes
//! non-ASCII text.

use crate::encoding::{Charset, encode_rfc2047};
use crate::error::{Error, Result};
use std::fmt;

/// Preferred maximum width of a header line before folding (RFC 5322).
const MAX_HEADER_WIDTH: usize = 78;

/// Headers whose value is a list of mailboxes.
const ADDRESS_HEADERS: &[&str] = &[
    "from",
    "sender",
    "reply-to",
    "to",
    "cc",
    "bcc",
    "resent-from",
    "resent-sender",
    "resent-to",
    "resent-cc",
    "resent-bcc",
];

/// Headers owned by the part structure itself.
const STRUCTURAL_HEADERS: &[&str] = &[
    "content-type",
    "content-transfer-encoding",
    "mime-version",
];

/// Checks if a header is derived from the part structure (`Content-Type`,
/// `Content-Transfer-Encoding`, `MIME-Version`).
#[must_use]
pub fn is_structural(name: &str) -> bool {
    STRUCTURAL_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

fn is_address_header(name: &str) -> bool {
    ADDRESS_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Validates a header and prepares its value for the wire.
///
/// A line break is only accepted as folding: it must be followed by a space
/// or tab and by more text on the continuation line. Folds are normalized to
/// CRLF. Non-ASCII values are RFC 2047-encoded in `charset`; for address
/// headers only the display names are encoded.
///
/// # Errors
///
/// Returns [`Error::HeaderInjection`] for an illegal line break,
/// [`Error::InvalidHeader`] for a malformed name, or an encoding error if
/// the value cannot be represented in `charset`.
pub fn sanitize(name: &str, value: &str, charset: Charset) -> Result<(String, String)> {
    validate_name(name)?;
    let value = normalize_folding(name, value)?;

    let value = if value.is_ascii() {
        value
    } else {
        let unfolded = value.replace("\r\n", "");
        if is_address_header(name) {
            encode_address_list(&unfolded, charset)?
        } else {
            encode_rfc2047(&unfolded, charset)?
        }
    };

    Ok((name.to_string(), value))
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidHeader("Header name cannot be empty".into()));
    }

    if !name.bytes().all(|b| (33..=126).contains(&b) && b != b':') {
        return Err(Error::InvalidHeader(format!(
            "Header name {name:?} contains illegal characters"
        )));
    }

    Ok(())
}

fn normalize_folding(name: &str, value: &str) -> Result<String> {
    if !value.contains(['\r', '\n']) {
        return Ok(value.to_string());
    }

    let mut lines = Vec::new();
    let mut rest = value;
    while let Some(pos) = rest.find(['\r', '\n']) {
        lines.push(&rest[..pos]);
        let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[pos + skip..];
    }
    lines.push(rest);

    for line in &lines[1..] {
        if !line.starts_with([' ', '\t']) || line.trim().is_empty() {
            return Err(Error::HeaderInjection {
                name: name.to_string(),
            });
        }
    }

    Ok(lines.join("\r\n"))
}

fn encode_address_list(value: &str, charset: Charset) -> Result<String> {
    let encoded = split_addresses(value)
        .into_iter()
        .map(|addr| encode_address(addr.trim(), charset))
        .collect::<Result<Vec<_>>>()?;

    Ok(encoded.join(", "))
}

fn encode_address(addr: &str, charset: Charset) -> Result<String> {
    match addr.rfind('<') {
        Some(pos) if addr.ends_with('>') => {
            let name = addr[..pos].trim();
            let mailbox = &addr[pos..];
            if name.is_empty() {
                Ok(mailbox.to_string())
            } else if name.is_ascii() {
                Ok(format!("{name} {mailbox}"))
            } else {
                let name = encode_rfc2047(name.trim_matches('"'), charset)?;
                Ok(format!("{name} {mailbox}"))
            }
        }
        _ => Ok(addr.to_string()),
    }
}

/// Splits a mailbox list on commas outside quotes and angle brackets.
fn split_addresses(value: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut depth = 0_u32;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => depth += 1,
            '>' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 => {
                result.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    result.push(&value[start..]);

    result.retain(|s| !s.trim().is_empty());
    result
}

/// Writes `Name: value` plus CRLF, folding long unfolded values at spaces.
pub(crate) fn write_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");

    if value.contains('\n') || name.len() + 2 + value.len() <= MAX_HEADER_WIDTH {
        out.push_str(value);
        out.push_str("\r\n");
        return;
    }

    let mut width = name.len() + 2;
    for (i, word) in value.split(' ').enumerate() {
        if i > 0 {
            if !word.is_empty() && width + 1 + word.len() > MAX_HEADER_WIDTH {
                out.push_str("\r\n ");
                width = 1;
            } else {
                out.push(' ');
                width += 1;
            }
        }
        out.push_str(word);
        width += word.len();
    }
    out.push_str("\r\n");
}

/// Ordered collection of email headers.
///
/// Lookups are case-insensitive; the original spelling and insertion order
/// are kept for serialization. Values are sanitized on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
    charset: Charset,
}

impl Headers {
    /// Creates a new empty header collection encoding values as UTF-8.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty header collection encoding values in `charset`.
    #[must_use]
    pub fn with_charset(charset: Charset) -> Self {
        Self {
            entries: Vec::new(),
            charset,
        }
    }

    /// Returns the charset used for RFC 2047 encoding.
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// Changes the charset used for values set from now on.
    ///
    /// Stored values are already sanitized and stay as they are.
    pub(crate) const fn set_charset(&mut self, charset: Charset) {
        self.charset = charset;
    }

    fn prepare(&self, name: &str, value: &str) -> Result<(String, String)> {
        if is_structural(name) {
            return Err(Error::InvalidHeader(format!(
                "{name} is derived from the part structure"
            )));
        }
        sanitize(name, value, self.charset)
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// The header keeps the position of its first occurrence.
    ///
    /// # Errors
    ///
    /// Returns an error if the header fails sanitizing; the collection is
    /// left unchanged.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = self.prepare(name, value)?;

        match self
            .entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(pos) => {
                let mut index = 0;
                self.entries.retain(|(n, _)| {
                    let keep = index <= pos || !n.eq_ignore_ascii_case(&name);
                    index += 1;
                    keep
                });
                self.entries[pos] = (name, value);
            }
            None => self.entries.push((name, value)),
        }

        Ok(())
    }

    /// Adds a header value after any existing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the header fails sanitizing; the collection is
    /// left unchanged.
    pub fn add(&mut self, name: &str, value: &str) -> Result<()> {
        let entry = self.prepare(name, value)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Checks if a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (name, value) in self.iter() {
            write_header(&mut out, name, value);
        }
        f.write_str(&out)
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
    use proptest::prelude::*;

    fn utf8() -> Charset {
        Charset::utf8()
    }

    #[test]
    fn test_sanitize_plain_value() {
        let (name, value) = sanitize("Subject", "Hello", utf8()).unwrap();
        assert_eq!(name, "Subject");
        assert_eq!(value, "Hello");
    }

    #[test]
    fn test_sanitize_rejects_line_breaks() {
        for value in [
            "Hello\nBcc: victim@example.com",
            "Hello\r\nBcc: victim@example.com",
            "Hello\rWorld",
            "Hello\n",
            "Hello\r\n",
            "Hello\r\n \r\n",
            "\n",
        ] {
            let err = sanitize("Subject", value, utf8()).unwrap_err();
            assert!(err.is_header_injection(), "accepted {value:?}");
        }
    }

    #[test]
    fn test_sanitize_accepts_folding() {
        let (_, value) = sanitize("X-Long", "first\r\n second", utf8()).unwrap();
        assert_eq!(value, "first\r\n second");

        let (_, value) = sanitize("X-Long", "first\n\tsecond", utf8()).unwrap();
        assert_eq!(value, "first\r\n\tsecond");
    }

    #[test]
    fn test_sanitize_encodes_non_ascii() {
        let (_, value) = sanitize("Subject", "Héllo", utf8()).unwrap();
        assert_eq!(value, "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_sanitize_encodes_only_display_names() {
        let (_, value) = sanitize(
            "To",
            "Zoë <zoe@example.com>, \"Doe, John\" <john@example.com>, plain@example.com",
            utf8(),
        )
        .unwrap();
        assert_eq!(
            value,
            "=?utf-8?B?Wm/Dqw==?= <zoe@example.com>, \"Doe, John\" <john@example.com>, plain@example.com"
        );
    }

    #[test]
    fn test_sanitize_rejects_bad_names() {
        assert!(matches!(
            sanitize("", "x", utf8()),
            Err(Error::InvalidHeader(_))
        ));
        assert!(matches!(
            sanitize("X Bad", "x", utf8()),
            Err(Error::InvalidHeader(_))
        ));
        assert!(matches!(
            sanitize("X-Bad:", "x", utf8()),
            Err(Error::InvalidHeader(_))
        ));
        assert!(matches!(
            sanitize("X-Bad\n", "x", utf8()),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_headers_set_get() {
        let mut headers = Headers::new();
        headers.set("X-Mailer", "mailwright").unwrap();
        assert_eq!(headers.get("X-Mailer"), Some("mailwright"));
        assert_eq!(headers.get("x-mailer"), Some("mailwright"));
    }

    #[test]
    fn test_headers_set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com").unwrap();
        headers.add("Subject", "Test").unwrap();
        headers.add("to", "bob@example.com").unwrap();
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("TO", "charlie@example.com").unwrap();
        let entries: Vec<_> = headers.iter().collect();
        assert_eq!(
            entries,
            vec![("TO", "charlie@example.com"), ("Subject", "Test")]
        );
    }

    #[test]
    fn test_headers_rejection_leaves_collection_unchanged() {
        let mut headers = Headers::new();
        headers.set("Subject", "Safe").unwrap();

        assert!(headers.set("Subject", "Evil\r\nBcc: x@example.com").is_err());
        assert!(headers.add("X-Evil", "a\nb").is_err());

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Subject"), Some("Safe"));
    }

    #[test]
    fn test_headers_reject_structural() {
        let mut headers = Headers::new();
        assert!(matches!(
            headers.set("Content-Type", "text/html"),
            Err(Error::InvalidHeader(_))
        ));
        assert!(matches!(
            headers.add("mime-version", "1.0"),
            Err(Error::InvalidHeader(_))
        ));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test").unwrap();
        assert!(headers.contains("subject"));

        headers.remove("SUBJECT");
        assert!(!headers.contains("Subject"));
    }

    #[test]
    fn test_headers_display_keeps_order() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test").unwrap();
        headers.add("From", "sender@example.com").unwrap();

        assert_eq!(
            headers.to_string(),
            "Subject: Test\r\nFrom: sender@example.com\r\n"
        );
    }

    #[test]
    fn test_write_header_folds_long_values() {
        let value = "word ".repeat(30);
        let mut out = String::new();
        write_header(&mut out, "Subject", value.trim_end());

        let lines: Vec<&str> = out.trim_end_matches("\r\n").split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 78));
        assert!(lines[1..].iter().all(|l| l.starts_with(' ')));
        assert_eq!(lines.join(""), format!("Subject: {}", value.trim_end()));
    }

    proptest! {
        #[test]
        fn prop_unfolded_line_breaks_are_rejected(
            before in "[a-zA-Z0-9 ]{0,20}",
            brk in prop::sample::select(vec!["\n", "\r", "\r\n"]),
            after in "[a-zA-Z0-9][a-zA-Z0-9 :]{0,20}",
        ) {
            let value = format!("{before}{brk}{after}");
            let result = sanitize("X-Test", &value, Charset::utf8());
            prop_assert!(matches!(result, Err(Error::HeaderInjection { .. })), "expected HeaderInjection, got {:?}", result);
        }

        #[test]
        fn prop_sanitized_values_have_only_folded_breaks(value in "[a-z: \\t\\r\\n]{0,40}") {
            if let Ok((_, clean)) = sanitize("X-Test", &value, Charset::utf8()) {
                for line in clean.split("\r\n").skip(1) {
                    prop_assert!(line.starts_with([' ', '\t']));
                }
                prop_assert!(!clean.replace("\r\n", "").contains(['\r', '\n']));
            }
        }
    }
}
