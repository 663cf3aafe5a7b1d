//! Wire serialization of a MIME part tree.
//!
//! Output uses CRLF line endings. Headers are written in the order
//! `Content-Type`, `MIME-Version` (root only), `Content-Transfer-Encoding`
//! (leaves only), then the part's own headers in insertion order. Body lines
//! are never escaped, so a line starting with `From ` survives unchanged.

use crate::encoding::{encode_base64_lines, encode_quoted_printable};
use crate::error::Result;
use crate::header::write_header;
use crate::part::{Part, SinglePart, TransferEncoding};
use chrono::{DateTime, Local, TimeZone};

/// Serializes a part tree to its wire text.
///
/// With `include_unix_from`, an mbox `From nobody <date>` envelope line is
/// written first.
///
/// # Errors
///
/// Returns an error if an 8bit or binary payload is not valid UTF-8.
pub fn serialize(part: &Part, include_unix_from: bool) -> Result<String> {
    String::from_utf8(serialize_bytes(part, include_unix_from)).map_err(Into::into)
}

/// Serializes a part tree to its wire bytes.
#[must_use]
pub fn serialize_bytes(part: &Part, include_unix_from: bool) -> Vec<u8> {
    let mut out = Vec::new();

    if include_unix_from {
        out.extend_from_slice(unix_from_line(&Local::now()).as_bytes());
    }

    write_part(&mut out, part, true);
    tracing::trace!(bytes = out.len(), "Serialized MIME tree");
    out
}

/// Formats the mbox envelope line the way `ctime(3)` renders dates.
fn unix_from_line<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("From nobody {}\r\n", now.format("%a %b %e %H:%M:%S %Y"))
}

fn write_part(out: &mut Vec<u8>, part: &Part, root: bool) {
    let mut head = String::new();
    write_header(&mut head, "Content-Type", &part.content_type().to_string());
    if root {
        write_header(&mut head, "MIME-Version", "1.0");
    }
    if let Part::Single(single) = part {
        write_header(
            &mut head,
            "Content-Transfer-Encoding",
            &single.encoding().to_string(),
        );
    }
    for (name, value) in part.headers().iter() {
        write_header(&mut head, name, value);
    }
    head.push_str("\r\n");
    out.extend_from_slice(head.as_bytes());

    match part {
        Part::Single(single) => write_body(out, single),
        Part::Multi(multi) => {
            let boundary = multi.boundary().as_bytes();
            for (i, child) in multi.parts().iter().enumerate() {
                if i > 0 {
                    out.extend_from_slice(b"\r\n");
                }
                out.extend_from_slice(b"--");
                out.extend_from_slice(boundary);
                out.extend_from_slice(b"\r\n");
                write_part(out, child, false);
            }
            out.extend_from_slice(b"\r\n--");
            out.extend_from_slice(boundary);
            out.extend_from_slice(b"--\r\n");
        }
    }
}

fn write_body(out: &mut Vec<u8>, part: &SinglePart) {
    let body = part.body();
    match part.encoding() {
        TransferEncoding::Base64 => out.extend_from_slice(encode_base64_lines(body).as_bytes()),
        TransferEncoding::QuotedPrintable => {
            out.extend_from_slice(encode_quoted_printable(body).as_bytes());
        }
        TransferEncoding::SevenBit | TransferEncoding::EightBit => write_crlf(out, body),
        TransferEncoding::Binary => out.extend_from_slice(body),
    }
}

/// Copies `body`, turning bare CR or LF into CRLF.
fn write_crlf(out: &mut Vec<u8>, body: &[u8]) {
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'\r' if body.get(i + 1) == Some(&b'\n') => {
                out.extend_from_slice(b"\r\n");
                i += 2;
                continue;
            }
            b'\r' | b'\n' => out.extend_from_slice(b"\r\n"),
            byte => out.push(byte),
        }
        i += 1;
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
    use crate::content_type::ContentType;
    use crate::encoding::Charset;
    use crate::part::{MultiPart, MultiPartKind};
    use chrono::Utc;
    use proptest::prelude::*;

    fn text(sub_type: &str, body: &str) -> SinglePart {
        SinglePart::text(sub_type, body, Charset::utf8()).unwrap()
    }

    #[test]
    fn test_single_part() {
        let mut part: Part = text("plain", "Hello\nWorld").into();
        part.set_header("Subject", "Greetings").unwrap();

        assert_eq!(
            serialize(&part, false).unwrap(),
            concat!(
                "Content-Type: text/plain; charset=utf-8\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "Subject: Greetings\r\n",
                "\r\n",
                "Hello\r\n",
                "World"
            )
        );
    }

    #[test]
    fn test_multi_part_alternative() {
        let part: Part = MultiPart::new(MultiPartKind::Alternative, "=_b1")
            .part(text("plain", "Текст"))
            .part(text("html", "<p>Текст</p>"))
            .into();

        assert_eq!(
            serialize(&part, false).unwrap(),
            concat!(
                "Content-Type: multipart/alternative; boundary=\"=_b1\"\r\n",
                "MIME-Version: 1.0\r\n",
                "\r\n",
                "--=_b1\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 8bit\r\n",
                "\r\n",
                "Текст\r\n",
                "--=_b1\r\n",
                "Content-Type: text/html; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 8bit\r\n",
                "\r\n",
                "<p>Текст</p>\r\n",
                "--=_b1--\r\n"
            )
        );
    }

    #[test]
    fn test_multi_part_mixed_with_base64() {
        let attachment = SinglePart::base64(
            ContentType::new("application", "octet-stream"),
            b"1234567890".to_vec(),
        )
        .with_header("Content-Disposition", "attachment; filename=\"n.bin\"")
        .unwrap();

        let part: Part = MultiPart::new(MultiPartKind::Mixed, "=_mix")
            .part(text("plain", "Body"))
            .part(attachment)
            .into();

        assert_eq!(
            serialize(&part, false).unwrap(),
            concat!(
                "Content-Type: multipart/mixed; boundary=\"=_mix\"\r\n",
                "MIME-Version: 1.0\r\n",
                "\r\n",
                "--=_mix\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Body\r\n",
                "--=_mix\r\n",
                "Content-Type: application/octet-stream\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "Content-Disposition: attachment; filename=\"n.bin\"\r\n",
                "\r\n",
                "MTIzNDU2Nzg5MA==\r\n",
                "--=_mix--\r\n"
            )
        );
    }

    #[test]
    fn test_from_line_is_not_mangled() {
        let part: Part = text("plain", "Hi,\nFrom the team\n>From quoted").into();
        let out = serialize(&part, false).unwrap();

        assert!(out.contains("\r\nFrom the team\r\n"));
        assert!(!out.contains(">From the team"));
        assert!(out.contains("\r\n>From quoted"));
    }

    #[test]
    fn test_unix_from_line() {
        let part: Part = text("plain", "x").into();
        let out = serialize(&part, true).unwrap();
        assert!(out.starts_with("From nobody "));
        assert!(out.lines().nth(1).unwrap().starts_with("Content-Type: "));

        let date = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(
            unix_from_line(&date),
            "From nobody Tue Mar  5 07:08:09 2024\r\n"
        );
    }

    #[test]
    fn test_quoted_printable_body() {
        let latin = Charset::for_label("iso-8859-15").unwrap();
        let part: Part = SinglePart::text("plain", "café", latin).unwrap().into();
        let out = serialize(&part, false).unwrap();

        assert!(out.contains("Content-Type: text/plain; charset=iso-8859-15\r\n"));
        assert!(out.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
        assert!(out.ends_with("\r\n\r\ncaf=E9"));
    }

    #[test]
    fn test_non_utf8_raw_payload() {
        let part: Part =
            SinglePart::new(ContentType::octet_stream(), TransferEncoding::Binary, vec![0xFF, 0xFE])
                .into();

        assert!(serialize(&part, false).is_err());
        assert!(serialize_bytes(&part, false).ends_with(&[0xFF, 0xFE]));
    }

    #[test]
    fn test_long_header_is_folded() {
        let mut part: Part = text("plain", "x").into();
        let subject = "lorem ipsum ".repeat(10);
        part.set_header("Subject", subject.trim_end()).unwrap();
        let out = serialize(&part, false).unwrap();

        let head = out.split("\r\n\r\n").next().unwrap();
        assert!(head.split("\r\n").all(|line| line.len() <= 78));
    }

    proptest! {
        #[test]
        fn prop_serialization_is_deterministic(
            body in "[a-zA-Z0-9 \n]{0,200}",
            html in "[a-zA-Z0-9 <>/]{0,200}",
            blob in proptest::collection::vec(any::<u8>(), 0..300),
        ) {
            let part: Part = MultiPart::new(MultiPartKind::Mixed, "=_outer")
                .part(
                    MultiPart::new(MultiPartKind::Alternative, "=_inner")
                        .part(text("plain", &body))
                        .part(text("html", &html)),
                )
                .part(SinglePart::base64(ContentType::octet_stream(), blob))
                .into();

            let first = serialize(&part, false).unwrap();
            let second = serialize(&part, false).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
