//! # mailwright
//!
//! Builds well-formed email messages: subject, plain text and HTML bodies,
//! recipients, attachments and custom headers assembled into a single,
//! safely encoded MIME document.
//!
//! ## Features
//!
//! - **Structure selection**: a lone `text/plain` part, a
//!   `multipart/alternative` for text plus HTML, wrapped in
//!   `multipart/mixed` once attachments are added
//! - **Header safety**: every header, including attachment filenames, is
//!   checked for injected line breaks
//! - **Text fallback**: an HTML-only message gets a generated plain text
//!   alternative
//! - **Attachments**: mimetypes guessed from file extensions, text kept
//!   readable, everything else base64-encoded
//! - **Transport boundary**: an SMTP envelope plus serialized bytes handed
//!   to any [`Transport`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwright::Message;
//!
//! let mut message = Message::builder()
//!     .subject("Quarterly report")
//!     .from("Reports <reports@example.com>")
//!     .to(["alice@example.com", "bob@example.com"])
//!     .text("The report is attached.")
//!     .html("<p>The report is <b>attached</b>.</p>")
//!     .build()?;
//!
//! message.attach_file("report.pdf", None)?;
//!
//! let wire = message.as_string(false)?;
//! ```
//!
//! ## Modules
//!
//! The MIME layer (part tree, header sanitizing, serialization) is
//! re-exported as [`mime`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod config;
mod error;
mod id;
mod message;
mod text;
mod transport;

pub use mailwright_mime as mime;

pub use address::{Recipients, bare_address};
pub use attachment::{Attachment, guess_content_type};
pub use config::{DEFAULT_CHARSET, DEFAULT_MESSAGE_ID_DOMAIN, MessageConfig};
pub use error::{Error, Result};
pub use id::{format_date, generate_message_id};
pub use message::{Message, MessageBuilder};
pub use text::{HtmlTextExtractor, TagStripExtractor, TextExtractor};
pub use transport::{Envelope, SendError, Transport};

pub use mailwright_mime::{Charset, ContentType, Part};
