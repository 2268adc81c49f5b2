//! The message model: headers, body parts, attachments and the
//! configuration governing how they are encoded.

pub use self::{file::File, header::Headers};

mod address;
mod file;
mod header;
mod rfc2047;
pub(crate) mod writer;

use std::{fmt, io, time::SystemTime};

use self::rfc2047::WordEncoding;
use crate::error::Error;

/// Content-transfer-encoding applied to message bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Quoted-printable, best for mostly-ASCII text.
    QuotedPrintable,
    /// Base64, best for binary content.
    Base64,
    /// No transformation; bytes pass through and are declared `8bit`.
    Unencoded,
}

impl Encoding {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Encoding::QuotedPrintable => "quoted-printable",
            Encoding::Base64 => "base64",
            Encoding::Unencoded => "8bit",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message-wide construction option, applied by [`Message::with_settings`].
#[derive(Debug, Clone)]
pub enum MessageSetting {
    /// Charset announced in part `Content-Type` headers and used in
    /// encoded words. Defaults to `UTF-8`.
    Charset(String),
    /// Default content-transfer-encoding of body parts. Defaults to
    /// quoted-printable.
    Encoding(Encoding),
}

/// Per-part construction option.
#[derive(Debug, Clone, Copy)]
pub enum PartSetting {
    /// Overrides the message encoding for this part only.
    Encoding(Encoding),
}

pub(crate) type PartWriter = Box<dyn Fn(&mut dyn io::Write) -> io::Result<()> + Send + Sync>;

pub(crate) struct Part {
    pub(crate) content_type: String,
    pub(crate) writer: PartWriter,
    pub(crate) encoding: Option<Encoding>,
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("content_type", &self.content_type)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

/// An email message under construction.
///
/// A message is a mutable builder: set headers, add body parts and files,
/// then serialize it with [`write_to`](Message::write_to) or hand it to
/// [`send`](crate::send). It is not meant to be shared between threads
/// while being built, and [`reset`](Message::reset) makes it reusable for
/// the next send.
///
/// ```
/// use missive::Message;
///
/// let mut msg = Message::new();
/// msg.set_address_header("From", "alex@example.org", "Alex");
/// msg.set_header("To", ["dakota@example.net"]);
/// msg.set_header("Subject", ["Meeting notes"]);
/// msg.set_body("text/plain", "See the attached notes.", []);
/// ```
pub struct Message {
    pub(crate) header: Headers,
    pub(crate) parts: Vec<Part>,
    pub(crate) attachments: Vec<File>,
    pub(crate) embedded: Vec<File>,
    pub(crate) charset: String,
    pub(crate) encoding: Encoding,
    pub(crate) word_encoding: WordEncoding,
    buf: String,
}

impl Message {
    /// Creates a message with the `UTF-8` charset and quoted-printable
    /// body encoding.
    pub fn new() -> Self {
        Self::with_settings([])
    }

    /// Creates a message with the given settings.
    ///
    /// ```
    /// use missive::{Encoding, Message, MessageSetting};
    ///
    /// let msg = Message::with_settings([
    ///     MessageSetting::Charset("ISO-8859-1".into()),
    ///     MessageSetting::Encoding(Encoding::Base64),
    /// ]);
    /// ```
    pub fn with_settings(settings: impl IntoIterator<Item = MessageSetting>) -> Self {
        let mut msg = Message {
            header: Headers::new(),
            parts: Vec::new(),
            attachments: Vec::new(),
            embedded: Vec::new(),
            charset: "UTF-8".to_owned(),
            encoding: Encoding::QuotedPrintable,
            word_encoding: WordEncoding::Q,
            buf: String::new(),
        };
        for setting in settings {
            match setting {
                MessageSetting::Charset(charset) => msg.charset = charset,
                MessageSetting::Encoding(encoding) => msg.encoding = encoding,
            }
        }
        msg.word_encoding = if msg.charset.eq_ignore_ascii_case("UTF-8") {
            WordEncoding::Q
        } else {
            WordEncoding::B
        };
        msg
    }

    /// Replaces all values of a header field.
    ///
    /// Values are stored raw; non-ASCII content is turned into RFC 2047
    /// encoded words at serialization time.
    pub fn set_header<N, I, V>(&mut self, field: N, values: I)
    where
        N: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.header
            .set(field, values.into_iter().map(Into::into).collect());
    }

    /// Appends values to a header field, keeping any existing ones.
    pub fn add_header<N, I, V>(&mut self, field: N, values: I)
    where
        N: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.header
            .add(field, values.into_iter().map(Into::into).collect());
    }

    /// Calls [`set_header`](Message::set_header) for every entry.
    pub fn set_headers<N, I, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (N, Vec<V>)>,
        N: Into<String>,
        V: Into<String>,
    {
        for (field, values) in headers {
            self.set_header(field, values);
        }
    }

    /// Returns the stored values of a field, empty when it is not set.
    pub fn get_header(&self, field: &str) -> &[String] {
        self.header.get(field)
    }

    /// Sets an address header from an address and a display name.
    pub fn set_address_header(&mut self, field: impl Into<String>, address: &str, name: &str) {
        let value = self.format_address(address, name);
        self.header.set(field, vec![value]);
    }

    /// Formats `name <address>`, quoting or encoding the display name as
    /// the configured charset requires. An empty name yields the bare
    /// address.
    pub fn format_address(&mut self, address: &str, name: &str) -> String {
        address::format_address(&mut self.buf, &self.charset, self.word_encoding, address, name)
    }

    /// Sets a date header from a timestamp.
    pub fn set_date_header(&mut self, field: impl Into<String>, date: SystemTime) {
        let value = Self::format_date(date);
        self.header.set(field, vec![value]);
    }

    /// Formats a timestamp as an RFC 5322 date, rendered in UTC.
    pub fn format_date(date: SystemTime) -> String {
        let mut formatted = httpdate::fmt_http_date(date);
        // `GMT` is the obsolete zone form; email wants a numeric offset.
        if formatted.ends_with("GMT") {
            formatted.truncate(formatted.len() - "GMT".len());
            formatted.push_str("+0000");
        }
        formatted
    }

    /// Replaces all body parts with a single one.
    pub fn set_body(
        &mut self,
        content_type: impl Into<String>,
        body: impl Into<String>,
        settings: impl IntoIterator<Item = PartSetting>,
    ) {
        self.parts.clear();
        self.add_alternative(content_type, body, settings);
    }

    /// Appends an alternative rendering of the body.
    ///
    /// Parts are emitted in the order they were added and readers prefer
    /// the last one, so add the plain version before the HTML one.
    pub fn add_alternative(
        &mut self,
        content_type: impl Into<String>,
        body: impl Into<String>,
        settings: impl IntoIterator<Item = PartSetting>,
    ) {
        let body = body.into();
        self.add_alternative_writer(
            content_type,
            move |w: &mut dyn io::Write| w.write_all(body.as_bytes()),
            settings,
        );
    }

    /// Appends an alternative whose content comes from a callback.
    ///
    /// The callback may run once per serialization, so it must be callable
    /// repeatedly.
    pub fn add_alternative_writer<F>(
        &mut self,
        content_type: impl Into<String>,
        writer: F,
        settings: impl IntoIterator<Item = PartSetting>,
    ) where
        F: Fn(&mut dyn io::Write) -> io::Result<()> + Send + Sync + 'static,
    {
        let mut part = Part {
            content_type: content_type.into(),
            writer: Box::new(writer),
            encoding: None,
        };
        for setting in settings {
            match setting {
                PartSetting::Encoding(encoding) => part.encoding = Some(encoding),
            }
        }
        self.parts.push(part);
    }

    /// Adds an attachment.
    pub fn attach(&mut self, file: File) {
        self.attachments.push(file);
    }

    /// Adds an inline-embedded file, referenced from HTML content through
    /// its `Content-ID`.
    pub fn embed(&mut self, file: File) {
        self.embedded.push(file);
    }

    /// Clears headers, parts and files so the message can be reused.
    ///
    /// Charset and encoding settings survive, and so does the scratch
    /// buffer's allocation.
    pub fn reset(&mut self) {
        self.header.clear();
        self.parts.clear();
        self.attachments.clear();
        self.embedded.clear();
        self.buf.clear();
    }

    /// The envelope sender: the first `From` address, or an empty string
    /// when unset. Rejecting an empty sender is the transport's concern.
    pub fn envelope_sender(&self) -> String {
        self.header
            .get("From")
            .first()
            .map(|value| address::addr_spec(value))
            .unwrap_or_default()
    }

    /// The envelope recipients: every `To`, `Cc` and `Bcc` address, in
    /// that order. Duplicates are kept.
    pub fn envelope_recipients(&self) -> Vec<String> {
        let mut recipients = Vec::new();
        for field in ["To", "Cc", "Bcc"] {
            for value in self.header.get(field) {
                recipients.push(address::addr_spec(value));
            }
        }
        recipients
    }

    /// Serializes the message, returning the number of bytes written.
    ///
    /// `Mime-Version: 1.0` and a `Date` header are inserted first unless
    /// the caller set them; `Bcc` is left out of the output. The first
    /// sink error aborts serialization and is returned; the sink may
    /// already have received a prefix of the message.
    pub fn write_to(&self, sink: &mut dyn io::Write) -> Result<u64, Error> {
        let mut writer = writer::MessageWriter::new(self, sink);
        writer.write_message()?;
        Ok(writer.bytes_written())
    }

    /// Serializes the message into a freshly allocated vector.
    pub fn formatted(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

impl Default for Message {
    fn default() -> Self {
        Message::new()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("header", &self.header)
            .field("parts", &self.parts)
            .field("attachments", &self.attachments)
            .field("embedded", &self.embedded)
            .field("charset", &self.charset)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}
