//! Integration tests for message construction, rendering and serialization.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use std::io::Write;

use mailwright::mime::{MultiPartKind, SinglePart, TransferEncoding};
use mailwright::{ContentType, Error, Message, MessageConfig, Part};
use proptest::prelude::*;

fn leaf(part: &Part) -> &SinglePart {
    part.as_single().unwrap()
}

#[test]
fn text_only_renders_a_single_plain_leaf() {
    let message = Message::builder()
        .subject("Hi")
        .to("a@example.com")
        .text("Just text")
        .build()
        .unwrap();

    let part = message.render().unwrap();
    assert!(!part.is_multipart());
    assert_eq!(leaf(&part).content_type().essence(), "text/plain");
    assert_eq!(leaf(&part).body_text().unwrap(), "Just text");
}

#[test]
fn text_and_html_render_an_alternative() {
    let message = Message::builder()
        .text("Plain")
        .html("<p>Rich</p>")
        .build()
        .unwrap();

    let part = message.render().unwrap();
    let multi = part.as_multi().unwrap();
    assert_eq!(multi.kind(), MultiPartKind::Alternative);

    let children = part.parts();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].content_type().essence(), "text/plain");
    assert_eq!(children[1].content_type().essence(), "text/html");
    assert_eq!(leaf(&children[1]).body_text().unwrap(), "<p>Rich</p>");
}

#[test]
fn attachments_render_a_mixed_container_in_call_order() {
    let mut message = Message::builder()
        .text("Plain")
        .html("<p>Rich</p>")
        .build()
        .unwrap();
    message.attach(Some("first.png"), vec![1, 2, 3], None).unwrap();
    message
        .attach(Some("second.csv"), "a,b\n1,2\n", Some("text/csv"))
        .unwrap();

    let part = message.render().unwrap();
    assert_eq!(part.as_multi().unwrap().kind(), MultiPartKind::Mixed);

    let children = part.parts();
    assert_eq!(children.len(), 3);
    assert_eq!(
        children[0].as_multi().unwrap().kind(),
        MultiPartKind::Alternative
    );
    assert_eq!(children[1].content_type().essence(), "image/png");
    assert_eq!(children[2].content_type().essence(), "text/csv");
}

#[test]
fn png_attachment_is_guessed_and_base64_encoded() {
    let mut message = Message::builder().text("See attached").build().unwrap();
    message.attach(Some("chart.png"), vec![0x89, b'P', b'N', b'G'], None).unwrap();

    let part = message.render().unwrap();
    let attachment = leaf(&part.parts()[1]);
    assert_eq!(attachment.content_type().essence(), "image/png");
    assert_eq!(attachment.encoding(), TransferEncoding::Base64);

    let wire = message.as_string(false).unwrap();
    assert!(wire.contains("Content-Type: image/png\r\nContent-Transfer-Encoding: base64\r\n"));
    assert!(wire.contains("Content-Disposition: attachment; filename=\"chart.png\"\r\n"));
    assert!(wire.contains("\r\niVBORw==\r\n"));
}

#[test]
fn rendering_twice_gives_identical_output() {
    let mut message = Message::builder()
        .subject("Stable")
        .from("me@example.com")
        .to("you@example.com")
        .text("Plain")
        .html("<p>Rich</p>")
        .build()
        .unwrap();
    message.attach(Some("data.bin"), vec![7; 100], None).unwrap();

    assert_eq!(message.render().unwrap(), message.render().unwrap());
    assert_eq!(
        message.as_string(false).unwrap(),
        message.as_string(false).unwrap()
    );
}

#[test]
fn header_injection_is_rejected_everywhere() {
    let custom = Message::builder()
        .header("X-Custom", "ok\r\nBcc: victim@example.com")
        .build()
        .unwrap_err();
    assert!(custom.is_header_injection());

    let subject = Message::builder()
        .subject("Hello\nBcc: victim@example.com")
        .build()
        .unwrap_err();
    assert!(subject.is_header_injection());

    let mut message = Message::builder().text("x").build().unwrap();
    let filename = message
        .attach(Some("evil.txt\r\nX-Injected: 1"), "x", None)
        .unwrap_err();
    assert!(filename.is_header_injection());
    assert!(message.attachments().is_empty());
}

#[test]
fn folded_custom_header_is_accepted() {
    let message = Message::builder()
        .header("X-Long", "first part\r\n second part")
        .text("x")
        .build()
        .unwrap();

    let wire = message.as_string(false).unwrap();
    assert!(wire.contains("X-Long: first part\r\n second part\r\n"));
}

#[test]
fn recipients_come_in_to_cc_bcc_order() {
    let message = Message::builder()
        .bcc("d@example.com")
        .cc(vec!["b@example.com", "c@example.com"])
        .to(" a@example.com ")
        .build()
        .unwrap();

    assert_eq!(
        message.get_recipients(),
        [
            "a@example.com",
            "b@example.com",
            "c@example.com",
            "d@example.com"
        ]
    );
}

#[test]
fn body_line_starting_with_from_is_not_escaped() {
    let message = Message::builder()
        .text("Hello,\nFrom here on, things change.\n")
        .build()
        .unwrap();

    let wire = message.as_string(false).unwrap();
    assert!(wire.contains("\r\nFrom here on, things change.\r\n"));
    assert!(!wire.contains(">From"));
}

#[test]
fn full_message_wire_format() {
    let message = Message::builder()
        .subject("Greetings")
        .from("Sender <sender@example.com>")
        .to("rcpt@example.com")
        .header("X-Priority", "3")
        .text("Hello\nWorld")
        .build()
        .unwrap();

    let expected = format!(
        concat!(
            "Content-Type: text/plain; charset=utf-8\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Transfer-Encoding: 7bit\r\n",
            "Subject: Greetings\r\n",
            "From: Sender <sender@example.com>\r\n",
            "To: rcpt@example.com\r\n",
            "Date: {}\r\n",
            "Message-ID: {}\r\n",
            "X-Priority: 3\r\n",
            "\r\n",
            "Hello\r\n",
            "World"
        ),
        message.date(),
        message.message_id()
    );
    assert_eq!(message.as_string(false).unwrap(), expected);
}

#[test]
fn non_ascii_headers_are_encoded() {
    let message = Message::builder()
        .subject("Grüße")
        .from("Jürgen <j@example.com>")
        .text("Grüße")
        .build()
        .unwrap();

    let wire = message.as_string(false).unwrap();
    assert!(wire.contains("Subject: =?utf-8?B?R3LDvMOfZQ==?=\r\n"));
    assert!(wire.contains("From: =?utf-8?B?SsO8cmdlbg==?= <j@example.com>\r\n"));
    assert!(wire.contains("Content-Transfer-Encoding: 8bit\r\n"));
    assert!(wire.ends_with("\r\n\r\nGrüße"));
}

#[test]
fn unix_from_line_is_prepended() {
    let message = Message::builder().text("x").build().unwrap();

    let wire = message.as_string(true).unwrap();
    assert!(wire.starts_with("From nobody "));
    let bytes = message.as_bytes(true).unwrap();
    assert!(bytes.starts_with(b"From nobody "));
    assert!(!message.as_string(false).unwrap().starts_with("From "));
}

#[test]
fn message_id_uses_configured_domain() {
    let message = Message::builder()
        .config(MessageConfig::new().message_id_domain("mail.example.org"))
        .build()
        .unwrap();

    assert!(message.message_id().ends_with("@mail.example.org>"));
}

#[test]
fn attach_file_reads_name_and_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"remember the milk").unwrap();
    drop(file);

    let mut message = Message::builder().text("See notes").build().unwrap();
    message.attach_file(&path, None).unwrap();

    let part = message.render().unwrap();
    let attachment = leaf(&part.parts()[1]);
    assert_eq!(attachment.content_type().essence(), "text/plain");
    assert_eq!(attachment.body_text().unwrap(), "remember the milk");
    assert_eq!(
        attachment.headers().get("Content-Disposition"),
        Some("attachment; filename=\"notes.txt\"")
    );
}

#[test]
fn attach_file_propagates_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut message = Message::builder().text("x").build().unwrap();

    let err = message
        .attach_file(dir.path().join("missing.pdf"), None)
        .unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    assert!(message.attachments().is_empty());
}

#[test]
fn raw_part_attachment_is_emitted_unchanged() {
    let inline = SinglePart::base64(ContentType::new("image", "gif"), b"GIF89a".to_vec())
        .with_header("Content-ID", "<logo@example.com>")
        .unwrap();

    let message = Message::builder()
        .text("x")
        .attachment(inline.clone())
        .build()
        .unwrap();

    let part = message.render().unwrap();
    assert_eq!(part.parts()[1], Part::from(inline));
    assert!(
        message
            .as_string(false)
            .unwrap()
            .contains("Content-ID: <logo@example.com>\r\n")
    );
}

#[test]
fn message_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Message>();
    assert_send_sync::<Part>();
}

proptest! {
    #[test]
    fn injected_subject_lines_never_reach_the_wire(
        prefix in "[a-zA-Z ]{0,20}",
        name in "[A-Z][a-z]{1,10}",
        value in "[a-z@.]{1,20}",
    ) {
        let subject = format!("{prefix}\r\n{name}: {value}");
        let result = Message::builder().subject(subject).text("x").build();
        prop_assert!(result.unwrap_err().is_header_injection());
    }

    #[test]
    fn rendering_is_idempotent(
        text in "[a-zA-Z0-9 \n]{0,200}",
        html in "[a-zA-Z0-9 ]{0,100}",
        blob in proptest::collection::vec(any::<u8>(), 0..200),
    ) {
        let mut message = Message::builder()
            .subject("Property")
            .text(text)
            .html(html)
            .build()
            .unwrap();
        message.attach(Some("blob.bin"), blob, None).unwrap();

        prop_assert_eq!(message.as_bytes(false).unwrap(), message.as_bytes(false).unwrap());
    }
}
