//! Message construction and rendering.
//!
//! A [`Message`] is built once through [`MessageBuilder`], may gain
//! attachments afterwards, and renders to a MIME tree on demand. Rendering
//! does not modify the message, so repeated calls give identical output.
//!
//! # Structure
//!
//! ```text
//! text only          text/plain
//! text + html        multipart/alternative [text/plain, text/html]
//! with attachments   multipart/mixed [<body tree>, attachment, ...]
//! ```

use crate::address::{Recipients, bare_address};
use crate::attachment::Attachment;
use crate::config::MessageConfig;
use crate::error::{Error, Result};
use crate::id::{generate_message_id, now_date};
use crate::text::{HtmlTextExtractor, TextExtractor};
use mailwright_mime::{
    Charset, Headers, MultiPart, MultiPartKind, Part, SinglePart, generate_boundary, sanitize,
    serialize, serialize_bytes,
};
use std::path::Path;

/// Headers rendered in fixed slots ahead of the remaining custom headers.
const STANDARD_HEADERS: &[&str] = &[
    "subject",
    "from",
    "to",
    "cc",
    "bcc",
    "reply-to",
    "date",
    "message-id",
];

fn is_standard(name: &str) -> bool {
    STANDARD_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// An email message ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    subject: String,
    from: Option<String>,
    to: Recipients,
    cc: Recipients,
    bcc: Recipients,
    reply_to: Recipients,
    text: String,
    html: String,
    headers: Headers,
    attachments: Vec<Attachment>,
    config: MessageConfig,
    charset: Charset,
    date: String,
    message_id: String,
    boundary: String,
}

impl Message {
    /// Creates a message builder.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Gets the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Gets the sender given to the builder.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Gets the To recipients.
    #[must_use]
    pub fn to(&self) -> &[String] {
        self.to.as_slice()
    }

    /// Gets the Cc recipients.
    #[must_use]
    pub fn cc(&self) -> &[String] {
        self.cc.as_slice()
    }

    /// Gets the Bcc recipients.
    #[must_use]
    pub fn bcc(&self) -> &[String] {
        self.bcc.as_slice()
    }

    /// Gets the Reply-To addresses.
    #[must_use]
    pub fn reply_to(&self) -> &[String] {
        self.reply_to.as_slice()
    }

    /// Gets the plain text body, derived from the HTML body if none was
    /// given.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Gets the HTML body.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Gets the custom headers, sanitized.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Gets the attachments in the order they were added.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Gets the configuration.
    #[must_use]
    pub const fn config(&self) -> &MessageConfig {
        &self.config
    }

    /// Gets the `Date` value fixed when the message was built.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Gets the `Message-ID` value fixed when the message was built.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Adds an attachment from content.
    ///
    /// The mimetype is guessed from the filename when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment cannot form a MIME part (see
    /// [`Attachment::to_part`]); nothing is attached in that case.
    pub fn attach(
        &mut self,
        filename: Option<&str>,
        content: impl Into<Vec<u8>>,
        mimetype: Option<&str>,
    ) -> Result<()> {
        let attachment = Attachment::content(filename, content, mimetype);
        attachment.to_part(self.charset)?;
        self.attachments.push(attachment);
        Ok(())
    }

    /// Adds a caller-built MIME part as an attachment.
    pub fn attach_part(&mut self, part: impl Into<Part>) {
        self.attachments.push(Attachment::Part(part.into()));
    }

    /// Adds an attachment read from a file.
    ///
    /// The file name becomes the attachment filename.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or an error from
    /// [`Message::attach`].
    pub fn attach_file(&mut self, path: impl AsRef<Path>, mimetype: Option<&str>) -> Result<()> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidAttachment(format!("{} has no file name", path.display()))
            })?;

        let content = std::fs::read(path)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "Read attachment file");

        self.attach(Some(&filename), content, mimetype)
    }

    /// Gets every recipient: To, then Cc, then Bcc. Duplicates are kept.
    #[must_use]
    pub fn get_recipients(&self) -> Vec<&str> {
        self.to
            .as_slice()
            .iter()
            .chain(self.cc.as_slice())
            .chain(self.bcc.as_slice())
            .map(String::as_str)
            .collect()
    }

    /// Gets the effective `From` value, a custom header taking precedence.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.headers.get("From").or(self.from.as_deref())
    }

    /// Gets the bare address of the sender, for use in an SMTP envelope.
    #[must_use]
    pub fn sender_address(&self) -> Option<&str> {
        self.sender().map(bare_address)
    }

    /// Builds the MIME tree for this message.
    ///
    /// # Errors
    ///
    /// Returns an error if a body or attachment cannot be encoded in the
    /// message charset, or a header fails sanitizing.
    pub fn render(&self) -> Result<Part> {
        let text = SinglePart::text("plain", &self.text, self.charset)?;

        let mut root: Part = if self.html.is_empty() {
            text.into()
        } else {
            let mut alternative =
                MultiPart::new(MultiPartKind::Alternative, format!("{}_alt", self.boundary))
                    .with_charset(self.charset);
            if !self.text.is_empty() {
                alternative.push(text);
            }
            alternative.push(SinglePart::text("html", &self.html, self.charset)?);
            alternative.into()
        };

        if !self.attachments.is_empty() {
            let mut mixed = MultiPart::new(MultiPartKind::Mixed, format!("{}_mix", self.boundary))
                .with_charset(self.charset);
            mixed.push(root);
            for attachment in &self.attachments {
                mixed.push(attachment.to_part(self.charset)?);
            }
            root = mixed.into();
        }

        for (name, value) in self.header_block()?.iter() {
            root.set_header(name, value)?;
        }

        tracing::debug!(
            structure = %root.content_type().essence(),
            attachments = self.attachments.len(),
            "Rendered message"
        );
        Ok(root)
    }

    /// Renders and serializes the message to text.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails, or if a raw attachment carries
    /// a payload that is not valid UTF-8.
    pub fn as_string(&self, include_unix_from: bool) -> Result<String> {
        Ok(serialize(&self.render()?, include_unix_from)?)
    }

    /// Renders and serializes the message to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn as_bytes(&self, include_unix_from: bool) -> Result<Vec<u8>> {
        Ok(serialize_bytes(&self.render()?, include_unix_from))
    }

    /// Collects the top-level headers in wire order.
    ///
    /// Standard headers come first; a custom header with the same name
    /// replaces the generated value in its slot. The remaining custom
    /// headers follow in insertion order.
    fn header_block(&self) -> Result<Headers> {
        let mut block = Headers::with_charset(self.charset);
        let include_bcc = self.config.include_bcc_header;

        self.put(&mut block, "Subject", Some(self.subject.as_str()))?;
        self.put(&mut block, "From", self.from.as_deref())?;
        for (name, list) in [
            ("To", &self.to),
            ("Cc", &self.cc),
            ("Bcc", &self.bcc),
            ("Reply-To", &self.reply_to),
        ] {
            if name == "Bcc" && !include_bcc {
                continue;
            }
            let value = list.to_header_value();
            self.put(&mut block, name, (!list.is_empty()).then_some(value.as_str()))?;
        }
        self.put(&mut block, "Date", Some(self.date.as_str()))?;
        self.put(&mut block, "Message-ID", Some(self.message_id.as_str()))?;

        for (name, value) in self.headers.iter() {
            if !is_standard(name) {
                block.add(name, value)?;
            }
        }

        Ok(block)
    }

    fn put(&self, block: &mut Headers, name: &str, default: Option<&str>) -> Result<()> {
        if let Some(value) = self.headers.get(name).or(default) {
            block.set(name, value)?;
        }
        Ok(())
    }
}

/// Builder for [`Message`].
///
/// Every field is optional and defaults to empty.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    subject: String,
    from: Option<String>,
    to: Recipients,
    cc: Recipients,
    bcc: Recipients,
    reply_to: Recipients,
    text: String,
    html: String,
    headers: Vec<(String, String)>,
    attachments: Vec<Attachment>,
    config: MessageConfig,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        let from = from.into();
        self.from = (!from.trim().is_empty()).then_some(from);
        self
    }

    /// Sets the To recipients from one address or a list.
    #[must_use]
    pub fn to(mut self, to: impl Into<Recipients>) -> Self {
        self.to = to.into();
        self
    }

    /// Sets the Cc recipients from one address or a list.
    #[must_use]
    pub fn cc(mut self, cc: impl Into<Recipients>) -> Self {
        self.cc = cc.into();
        self
    }

    /// Sets the Bcc recipients from one address or a list.
    #[must_use]
    pub fn bcc(mut self, bcc: impl Into<Recipients>) -> Self {
        self.bcc = bcc.into();
        self
    }

    /// Sets the Reply-To addresses from one address or a list.
    ///
    /// Non-empty Reply-To addresses are rendered as a `Reply-To` header
    /// right after `Bcc`.
    #[must_use]
    pub fn reply_to(mut self, reply_to: impl Into<Recipients>) -> Self {
        self.reply_to = reply_to.into();
        self
    }

    /// Adds a custom header. A later header with the same name replaces
    /// the earlier value.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attachment(mut self, attachment: impl Into<Attachment>) -> Self {
        self.attachments.push(attachment.into());
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: MessageConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the message, deriving a missing text body from the HTML body
    /// with [`HtmlTextExtractor`].
    ///
    /// # Errors
    ///
    /// Returns an error if the charset is unknown, a header fails
    /// sanitizing, or an attachment cannot form a MIME part.
    pub fn build(self) -> Result<Message> {
        self.build_with(&HtmlTextExtractor)
    }

    /// Builds the message, deriving a missing text body with `extractor`.
    ///
    /// # Errors
    ///
    /// Same as [`MessageBuilder::build`].
    pub fn build_with(self, extractor: &dyn TextExtractor) -> Result<Message> {
        let charset = self.config.charset()?;

        let text = if self.text.is_empty() && !self.html.is_empty() {
            extractor.extract_text(&self.html)
        } else {
            self.text
        };

        let mut headers = Headers::with_charset(charset);
        for (name, value) in &self.headers {
            headers.set(name, value)?;
        }

        let message = Message {
            subject: self.subject,
            from: self.from,
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            reply_to: self.reply_to,
            text,
            html: self.html,
            headers,
            attachments: self.attachments,
            message_id: generate_message_id(&self.config.message_id_domain),
            date: now_date(),
            boundary: generate_boundary(),
            config: self.config,
            charset,
        };

        message.header_block()?;
        // Bcc may be left out of the header block but still reaches the envelope.
        for (name, list) in [
            ("To", &message.to),
            ("Cc", &message.cc),
            ("Bcc", &message.bcc),
            ("Reply-To", &message.reply_to),
        ] {
            sanitize(name, &list.to_header_value(), charset)?;
        }
        for attachment in &message.attachments {
            attachment.to_part(charset)?;
        }

        tracing::debug!(
            message_id = %message.message_id,
            recipients = message.get_recipients().len(),
            attachments = message.attachments.len(),
            "Built message"
        );
        Ok(message)
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

    fn header_names(part: &Part) -> Vec<&str> {
        part.headers().iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn test_text_only_is_single_leaf() {
        let message = Message::builder().text("Hello").build().unwrap();
        let part = message.render().unwrap();

        let leaf = part.as_single().unwrap();
        assert_eq!(leaf.content_type().essence(), "text/plain");
        assert_eq!(leaf.body_text().unwrap(), "Hello");
    }

    #[test]
    fn test_standard_header_order() {
        let message = Message::builder()
            .subject("Hi")
            .from("me@example.com")
            .to("a@example.com")
            .cc(["b@example.com", "c@example.com"])
            .bcc("d@example.com")
            .reply_to("r@example.com")
            .header("X-Mailer", "mailwright")
            .text("Body")
            .build()
            .unwrap();
        let part = message.render().unwrap();

        assert_eq!(
            header_names(&part),
            [
                "Subject",
                "From",
                "To",
                "Cc",
                "Bcc",
                "Reply-To",
                "Date",
                "Message-ID",
                "X-Mailer"
            ]
        );
        assert_eq!(part.header("Cc"), Some("b@example.com, c@example.com"));
        assert_eq!(part.header("Message-ID"), Some(message.message_id()));
    }

    #[test]
    fn test_empty_lists_and_missing_from_are_omitted() {
        let message = Message::builder().subject("S").text("B").build().unwrap();
        let part = message.render().unwrap();

        assert_eq!(header_names(&part), ["Subject", "Date", "Message-ID"]);
    }

    #[test]
    fn test_custom_header_takes_default_slot() {
        let message = Message::builder()
            .from("builder@example.com")
            .to("a@example.com")
            .header("X-Early", "1")
            .header("message-id", "<fixed@example.com>")
            .header("FROM", "Header <header@example.com>")
            .text("Body")
            .build()
            .unwrap();
        let part = message.render().unwrap();

        assert_eq!(
            header_names(&part),
            ["Subject", "From", "To", "Date", "Message-ID", "X-Early"]
        );
        assert_eq!(part.header("From"), Some("Header <header@example.com>"));
        assert_eq!(part.header("Message-ID"), Some("<fixed@example.com>"));
        assert_eq!(message.sender_address(), Some("header@example.com"));
    }

    #[test]
    fn test_later_custom_header_replaces_earlier() {
        let message = Message::builder()
            .header("X-Tag", "one")
            .header("x-tag", "two")
            .build()
            .unwrap();

        assert_eq!(message.headers().get_all("X-Tag"), ["two"]);
    }

    #[test]
    fn test_bcc_header_can_be_omitted() {
        let message = Message::builder()
            .to("a@example.com")
            .bcc("hidden@example.com")
            .config(MessageConfig::new().include_bcc_header(false))
            .build()
            .unwrap();
        let part = message.render().unwrap();

        assert!(part.header("Bcc").is_none());
        assert_eq!(message.get_recipients(), ["a@example.com", "hidden@example.com"]);
    }

    #[test]
    fn test_structural_custom_header_rejected() {
        let result = Message::builder()
            .header("Content-Type", "text/html")
            .build();
        assert!(matches!(
            result,
            Err(Error::Mime(mailwright_mime::Error::InvalidHeader(_)))
        ));
    }

    #[test]
    fn test_injection_rejected_at_build() {
        let subject = Message::builder()
            .subject("Hi\r\nBcc: victim@example.com")
            .build()
            .unwrap_err();
        assert!(subject.is_header_injection());

        let to = Message::builder()
            .to("a@example.com\nBcc: victim@example.com")
            .build()
            .unwrap_err();
        assert!(to.is_header_injection());
    }

    #[test]
    fn test_recipient_line_breaks_rejected_at_build() {
        let builders = [
            Message::builder().to("a@example.com\r\n"),
            Message::builder().to("\r\na@example.com"),
            Message::builder().cc(["\nb@example.com"]),
            Message::builder().cc(["b@example.com\n"]),
            Message::builder().bcc("c@example.com\r"),
            Message::builder().bcc("\rc@example.com"),
            Message::builder().reply_to("r@example.com\n"),
            Message::builder().reply_to(vec!["\nr@example.com"]),
            Message::builder()
                .bcc("hidden@example.com\r\n")
                .config(MessageConfig::new().include_bcc_header(false)),
        ];

        for builder in builders {
            let err = builder.text("x").build().unwrap_err();
            assert!(err.is_header_injection(), "{err}");
        }
    }

    #[test]
    fn test_custom_date_takes_default_slot() {
        let message = Message::builder()
            .subject("S")
            .to("a@example.com")
            .header("X-Trace", "1")
            .header("date", "Tue, 5 Mar 2024 07:08:09 +0000")
            .text("Body")
            .build()
            .unwrap();
        let part = message.render().unwrap();

        assert_eq!(part.header("Date"), Some("Tue, 5 Mar 2024 07:08:09 +0000"));
        assert_eq!(part.headers().get_all("Date").len(), 1);
        assert_eq!(
            header_names(&part),
            ["Subject", "To", "Date", "Message-ID", "X-Trace"]
        );

        let wire = message.as_string(false).unwrap();
        assert_eq!(wire.matches("\r\nDate: ").count(), 1);
        assert!(wire.contains("\r\nDate: Tue, 5 Mar 2024 07:08:09 +0000\r\nMessage-ID: "));
    }

    #[test]
    fn test_html_derives_text() {
        let message = Message::builder()
            .html("<p>Hello <b>there</b></p>")
            .build()
            .unwrap();
        assert!(message.text().contains("Hello"));
        assert!(!message.text().contains('<'));

        let part = message.render().unwrap();
        let multi = part.as_multi().unwrap();
        assert_eq!(multi.kind(), MultiPartKind::Alternative);
        assert_eq!(multi.parts().len(), 2);
    }

    #[test]
    fn test_build_with_custom_extractor() {
        struct Fixed;
        impl TextExtractor for Fixed {
            fn extract_text(&self, _html: &str) -> String {
                "fixed".into()
            }
        }

        let message = Message::builder()
            .html("<p>ignored</p>")
            .build_with(&Fixed)
            .unwrap();
        assert_eq!(message.text(), "fixed");

        let explicit = Message::builder()
            .text("mine")
            .html("<p>x</p>")
            .build_with(&Fixed)
            .unwrap();
        assert_eq!(explicit.text(), "mine");
    }

    #[test]
    fn test_html_with_empty_extraction_has_only_html() {
        struct Empty;
        impl TextExtractor for Empty {
            fn extract_text(&self, _html: &str) -> String {
                String::new()
            }
        }

        let message = Message::builder().html("<br>").build_with(&Empty).unwrap();
        let part = message.render().unwrap();

        assert_eq!(part.parts().len(), 1);
        assert_eq!(part.parts()[0].content_type().sub_type, "html");
    }

    #[test]
    fn test_attach_validates_before_adding() {
        let mut message = Message::builder().text("x").build().unwrap();

        let err = message
            .attach(Some("a\nb.txt"), b"x".to_vec(), None)
            .unwrap_err();
        assert!(err.is_header_injection());
        assert!(message.attachments().is_empty());

        message.attach(Some("a.png"), vec![1, 2, 3], None).unwrap();
        assert_eq!(message.attachments().len(), 1);
    }

    #[test]
    fn test_attach_part_is_kept_verbatim() {
        let mut message = Message::builder().text("x").build().unwrap();
        let raw = SinglePart::new(
            mailwright_mime::ContentType::new("application", "json"),
            TransferEncoding::SevenBit,
            b"{}".to_vec(),
        );
        message.attach_part(raw.clone());

        let part = message.render().unwrap();
        assert_eq!(part.parts()[1], Part::from(raw));
    }

    #[test]
    fn test_render_does_not_consume_or_change() {
        let mut message = Message::builder().text("x").html("<p>x</p>").build().unwrap();
        message.attach(Some("a.bin"), vec![0; 10], None).unwrap();

        let before = message.clone();
        let first = message.render().unwrap();
        let second = message.render().unwrap();
        assert_eq!(first, second);
        assert_eq!(message, before);
    }

    #[test]
    fn test_latin_charset_body_and_subject() {
        let message = Message::builder()
            .subject("Café")
            .text("Crème brûlée")
            .config(MessageConfig::new().charset_label("iso-8859-1"))
            .build()
            .unwrap();
        let part = message.render().unwrap();

        assert_eq!(part.header("Subject"), Some("=?windows-1252?B?Q2Fm6Q==?="));
        let leaf = part.as_single().unwrap();
        assert_eq!(leaf.content_type().charset(), Some("windows-1252"));
        assert_eq!(leaf.encoding(), TransferEncoding::QuotedPrintable);
    }

    #[test]
    fn test_unrepresentable_body() {
        let message = Message::builder()
            .text("日本語")
            .config(MessageConfig::new().charset_label("iso-8859-1"))
            .build()
            .unwrap();
        assert!(matches!(
            message.render(),
            Err(Error::Mime(mailwright_mime::Error::Encoding { .. }))
        ));
    }
}
