//! # mailwright-mime
//!
//! MIME part tree, header sanitizing and wire serialization for outgoing
//! email.
//!
//! ## Features
//!
//! - **Part tree**: leaves with a payload, containers (mixed, alternative,
//!   related) with ordered children
//! - **Header sanitizing**: every header write rejects injected line breaks
//!   and RFC 2047-encodes non-ASCII text
//! - **Encoding**: Base64, Quoted-Printable, RFC 2047 and RFC 2231, charset
//!   conversion through `encoding_rs`
//! - **Serialization**: deterministic CRLF wire text, no `From ` mangling
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwright_mime::{Charset, MultiPart, MultiPartKind, Part, SinglePart, serialize};
//!
//! let text = SinglePart::text("plain", "Plain text version", Charset::utf8())?;
//! let html = SinglePart::text("html", "<h1>HTML version</h1>", Charset::utf8())?;
//!
//! let mut message: Part = MultiPart::with_random_boundary(MultiPartKind::Alternative)
//!     .part(text)
//!     .part(html)
//!     .into();
//! message.set_header("Subject", "Test")?;
//!
//! println!("{}", serialize(&message, false)?);
//! ```
//!
//! ### Header sanitizing
//!
//! ```ignore
//! use mailwright_mime::{Charset, sanitize};
//!
//! // Folded values are accepted, injected headers are not.
//! assert!(sanitize("Subject", "long\r\n value", Charset::utf8()).is_ok());
//! assert!(sanitize("Subject", "x\r\nBcc: victim@example.com", Charset::utf8()).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod part;
mod serialize;

pub mod encoding;

pub use content_type::ContentType;
pub use encoding::Charset;
pub use error::{Error, Result};
pub use header::{Headers, is_structural, sanitize};
pub use part::{MultiPart, MultiPartKind, Part, SinglePart, TransferEncoding, generate_boundary};
pub use serialize::{serialize, serialize_bytes};
