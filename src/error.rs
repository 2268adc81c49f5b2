//! Error type shared by serialization and transport.

use std::io;

use thiserror::Error;

/// All errors produced by this crate.
///
/// Serialization stops at the first error; the sink may already have
/// received a prefix of the message.
#[derive(Debug, Error)]
pub enum Error {
    /// The output sink or the network stream failed.
    #[error("output error: {0}")]
    Io(#[from] io::Error),

    /// A user-supplied content writer failed while the message was being
    /// serialized.
    #[error("content writer for {part} failed")]
    PartWriter {
        /// Which part or file the failing writer belonged to.
        part: String,
        /// The error the writer returned.
        #[source]
        source: io::Error,
    },

    /// The SMTP server answered with a reply code the dialer did not
    /// expect at that point of the session.
    #[error("unexpected SMTP reply: {code} {text}")]
    UnexpectedReply {
        /// Three-digit reply code.
        code: u16,
        /// Reply text, continuation lines joined with spaces.
        text: String,
    },
}
