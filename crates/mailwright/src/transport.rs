//! Hand-off to a mail transport.
//!
//! Delivery lives outside this crate. A [`Transport`] receives the SMTP
//! envelope and the serialized message bytes.

use crate::address::bare_address;
use crate::error::Error;
use crate::message::Message;

/// SMTP envelope: reverse path and forward paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    from: Option<String>,
    to: Vec<String>,
}

impl Envelope {
    /// Creates an envelope.
    #[must_use]
    pub const fn new(from: Option<String>, to: Vec<String>) -> Self {
        Self { from, to }
    }

    /// Gets the reverse path (`MAIL FROM`), if any.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Gets the forward paths (`RCPT TO`).
    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }
}

/// Delivers serialized messages.
pub trait Transport {
    /// Transport-specific error.
    type Error: std::error::Error + 'static;

    /// Sends `message` to the envelope recipients.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if delivery fails.
    fn send(&self, envelope: &Envelope, message: &[u8]) -> Result<(), Self::Error>;
}

/// Error from [`Message::send`].
#[derive(Debug, thiserror::Error)]
pub enum SendError<E>
where
    E: std::error::Error + 'static,
{
    /// The message could not be rendered.
    #[error(transparent)]
    Message(#[from] Error),

    /// The transport rejected the message.
    #[error("Transport error: {0}")]
    Transport(#[source] E),
}

impl Message {
    /// Gets the SMTP envelope: the bare sender address and every recipient
    /// (To, Cc and Bcc).
    #[must_use]
    pub fn envelope(&self) -> Envelope {
        Envelope::new(
            self.sender_address().map(String::from),
            self.get_recipients()
                .into_iter()
                .map(|r| bare_address(r).to_string())
                .collect(),
        )
    }

    /// Renders the message and hands it to `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Message`] if rendering fails, or
    /// [`SendError::Transport`] if the transport fails.
    pub fn send<T: Transport>(&self, transport: &T) -> Result<(), SendError<T::Error>> {
        let bytes = self.as_bytes(false)?;
        let envelope = self.envelope();
        tracing::debug!(
            recipients = envelope.to().len(),
            bytes = bytes.len(),
            "Handing message to transport"
        );
        transport
            .send(&envelope, &bytes)
            .map_err(SendError::Transport)
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
    use std::cell::RefCell;
    use std::io;

    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<(Envelope, Vec<u8>)>>,
    }

    impl Transport for Recorder {
        type Error = io::Error;

        fn send(&self, envelope: &Envelope, message: &[u8]) -> Result<(), Self::Error> {
            self.sent
                .borrow_mut()
                .push((envelope.clone(), message.to_vec()));
            Ok(())
        }
    }

    struct Refusing;

    impl Transport for Refusing {
        type Error = io::Error;

        fn send(&self, _envelope: &Envelope, _message: &[u8]) -> Result<(), Self::Error> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        }
    }

    #[test]
    fn test_envelope_uses_bare_addresses() {
        let message = Message::builder()
            .from("Sender <sender@example.com>")
            .to("Alice <alice@example.com>")
            .cc("bob@example.com")
            .bcc("carol@example.com")
            .text("x")
            .build()
            .unwrap();

        let envelope = message.envelope();
        assert_eq!(envelope.from(), Some("sender@example.com"));
        assert_eq!(
            envelope.to(),
            ["alice@example.com", "bob@example.com", "carol@example.com"]
        );
    }

    #[test]
    fn test_send_hands_over_rendered_bytes() {
        let message = Message::builder()
            .from("sender@example.com")
            .to("alice@example.com")
            .subject("Hello")
            .text("Body")
            .build()
            .unwrap();

        let transport = Recorder::default();
        message.send(&transport).unwrap();

        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, message.envelope());
        assert_eq!(sent[0].1, message.as_bytes(false).unwrap());
    }

    #[test]
    fn test_send_reports_transport_errors() {
        let message = Message::builder().to("a@example.com").text("x").build().unwrap();
        let err = message.send(&Refusing).unwrap_err();
        assert!(matches!(err, SendError::Transport(ref e) if e.kind() == io::ErrorKind::ConnectionRefused));
        assert_eq!(err.to_string(), "Transport error: refused");
    }

    #[test]
    fn test_send_reports_render_errors() {
        let message = Message::builder()
            .text("日本語")
            .config(crate::MessageConfig::new().charset_label("iso-8859-1"))
            .build()
            .unwrap();
        let err = message.send(&Recorder::default()).unwrap_err();
        assert!(matches!(err, SendError::Message(Error::Mime(_))));
    }
}
