//! missive is an email composition library. It builds RFC 5322 / MIME
//! messages in memory and streams them to any byte sink, ready for SMTP
//! transport. It provides:
//!
//! * Multi-valued headers with RFC 2047 encoded words for non-ASCII
//!   content, and structured address and date fields
//! * Streaming quoted-printable and base64 body encoders with exact
//!   line-length discipline
//! * Automatic `multipart/alternative` / `related` / `mixed` composition
//!   from the body parts, inline resources and attachments a message
//!   carries
//! * A transport-neutral send surface, plus a thin blocking SMTP dialer
//!
//! ## Example
//!
//! ```
//! use missive::{send, File, Message, SendFunc};
//!
//! # fn main() -> Result<(), missive::Error> {
//! let mut msg = Message::new();
//! msg.set_address_header("From", "alex@example.org", "Alex");
//! msg.set_header("To", ["dakota@example.net"]);
//! msg.set_header("Subject", ["Weekly report"]);
//! msg.set_body("text/plain", "Report attached.", []);
//! msg.add_alternative("text/html", "<p>Report <b>attached</b>.</p>", []);
//! msg.attach(File::new("report.pdf").copy_fn(|w| w.write_all(b"%PDF-1.4")));
//!
//! let mut relay = SendFunc(|from: &str, to: &[String], msg: &Message| {
//!     let bytes = msg.formatted()?;
//!     // hand `from`, `to` and `bytes` to the wire
//!     # let _ = (from, to, bytes);
//!     Ok(())
//! });
//! send(&mut relay, &[msg])?;
//! # Ok(())
//! # }
//! ```

#![deny(
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    unsafe_code
)]

pub mod message;
pub mod time;
pub mod transport;

mod encoder;
mod error;

pub use crate::{
    error::Error,
    message::{Encoding, File, Headers, Message, MessageSetting, PartSetting},
    transport::{send, smtp::SmtpDialer, SendFunc, Sender},
};
