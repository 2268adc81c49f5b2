//! Serialization of a message to its MIME wire form.
//!
//! The MIME structure is derived from what the message carries: at least
//! one attachment opens `multipart/mixed`, at least one embedded file
//! opens `multipart/related` inside it, and two or more body parts open
//! `multipart/alternative` innermost. A message with a single part and no
//! files is written flat.

use std::{
    io::{self, Write},
    iter,
};

use super::{header::Headers, rfc2047, Encoding, File, Message, Part, PartWriter};
use crate::{
    encoder::{Base64Writer, QpWriter},
    error::Error,
    time,
};

const BOUNDARY_LEN: usize = 30;

/// Creates a fresh boundary token: random hex, long enough that a
/// collision with encoded part content is not a practical concern.
fn make_boundary() -> String {
    iter::repeat_with(|| char::from_digit(fastrand::u32(..16), 16).unwrap_or('0'))
        .take(BOUNDARY_LEN)
        .collect()
}

#[derive(Clone, Copy)]
enum FileKind {
    Attachment,
    Embedded,
}

struct Boundary {
    token: String,
    has_parts: bool,
}

/// Streams one message to a sink, tracking multipart nesting, the byte
/// count and whether the sink has failed.
pub(crate) struct MessageWriter<'a, 'w> {
    msg: &'a Message,
    sink: &'w mut dyn io::Write,
    written: u64,
    sink_failed: bool,
    boundaries: Vec<Boundary>,
}

impl<'a, 'w> MessageWriter<'a, 'w> {
    pub(crate) fn new(msg: &'a Message, sink: &'w mut dyn io::Write) -> Self {
        MessageWriter {
            msg,
            sink,
            written: 0,
            sink_failed: false,
            boundaries: Vec::new(),
        }
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.written
    }

    pub(crate) fn write_message(&mut self) -> Result<(), Error> {
        if !self.msg.header.contains("Mime-Version") {
            self.write_str("Mime-Version: 1.0\r\n")?;
        }
        if !self.msg.header.contains("Date") {
            let date = Message::format_date(time::now());
            self.write_field("Date", &[date])?;
        }
        for (name, values) in self.msg.header.iter() {
            // Bcc recipients exist only in the envelope.
            if name.eq_ignore_ascii_case("Bcc") {
                continue;
            }
            self.write_field(name, values)?;
        }

        let mixed = !self.msg.attachments.is_empty();
        let related = !self.msg.embedded.is_empty();
        let alternative = self.msg.parts.len() > 1;

        if mixed {
            self.open_multipart("mixed")?;
        }
        if related {
            self.open_multipart("related")?;
        }
        if alternative {
            self.open_multipart("alternative")?;
        }

        for (index, part) in self.msg.parts.iter().enumerate() {
            self.write_part(index, part)?;
        }
        if alternative {
            self.close_multipart()?;
        }

        if related {
            for file in &self.msg.embedded {
                self.write_file(file, FileKind::Embedded)?;
            }
            self.close_multipart()?;
        }
        if mixed {
            for file in &self.msg.attachments {
                self.write_file(file, FileKind::Attachment)?;
            }
            self.close_multipart()?;
        }

        if self.msg.parts.is_empty() && !mixed && !related {
            // Headers only; the separator line is still expected.
            self.write_str("\r\n")?;
        }
        Ok(())
    }

    /// Emits `Name: value CRLF`, comma-joining multiple values and
    /// encoding each one that is not printable ASCII.
    fn write_field(&mut self, name: &str, values: &[String]) -> Result<(), Error> {
        self.write_str(name)?;
        self.write_str(": ")?;
        let mut first = true;
        for value in values {
            if !first {
                self.write_str(", ")?;
            }
            first = false;
            let encoded =
                rfc2047::encode_value(&self.msg.charset, self.msg.word_encoding, value);
            self.write_str(&encoded)?;
        }
        self.write_str("\r\n")
    }

    fn open_multipart(&mut self, subtype: &str) -> Result<(), Error> {
        let token = make_boundary();
        let content_type = format!("multipart/{}; boundary={}", subtype, token);
        if self.boundaries.is_empty() {
            self.write_str("Content-Type: ")?;
            self.write_str(&content_type)?;
            self.write_str("\r\n\r\n")?;
        } else {
            let mut headers = Headers::new();
            headers.set("Content-Type", vec![content_type]);
            self.create_part(&headers)?;
        }
        self.boundaries.push(Boundary {
            token,
            has_parts: false,
        });
        Ok(())
    }

    fn close_multipart(&mut self) -> Result<(), Error> {
        if let Some(boundary) = self.boundaries.pop() {
            self.write_str("\r\n--")?;
            self.write_str(&boundary.token)?;
            self.write_str("--\r\n")?;
        }
        Ok(())
    }

    /// Writes headers at the current nesting level: top-level fields when
    /// outside any multipart, a new delimited part inside one.
    fn write_headers(&mut self, headers: &Headers) -> Result<(), Error> {
        if self.boundaries.is_empty() {
            for (name, values) in headers.iter() {
                self.write_field(name, values)?;
            }
            Ok(())
        } else {
            self.create_part(headers)
        }
    }

    fn create_part(&mut self, headers: &Headers) -> Result<(), Error> {
        let (token, first) = match self.boundaries.last_mut() {
            Some(boundary) => {
                let first = !boundary.has_parts;
                boundary.has_parts = true;
                (boundary.token.clone(), first)
            }
            None => return Ok(()),
        };
        // A CRLF closes the previous sibling's content before the
        // delimiter line.
        if !first {
            self.write_str("\r\n")?;
        }
        self.write_str("--")?;
        self.write_str(&token)?;
        self.write_str("\r\n")?;
        for (name, values) in headers.iter() {
            self.write_field(name, values)?;
        }
        self.write_str("\r\n")
    }

    fn write_part(&mut self, index: usize, part: &Part) -> Result<(), Error> {
        let encoding = part.encoding.unwrap_or(self.msg.encoding);
        let mut headers = Headers::new();
        headers.set(
            "Content-Type",
            vec![format!("{}; charset={}", part.content_type, self.msg.charset)],
        );
        headers.set(
            "Content-Transfer-Encoding",
            vec![encoding.as_str().to_owned()],
        );
        self.write_headers(&headers)?;

        let label = format!("part {} ({})", index + 1, part.content_type);
        self.write_body(&part.writer, encoding, &label)
    }

    fn write_file(&mut self, file: &File, kind: FileKind) -> Result<(), Error> {
        let filename = file.filename().to_owned();
        let overrides = file.headers();

        let mut headers = Headers::new();

        match overrides.get("Content-Type") {
            [] => {
                let media_type = mime_guess::from_path(file.name()).first_or_octet_stream();
                headers.set(
                    "Content-Type",
                    vec![format!("{}; name=\"{}\"", media_type, filename)],
                );
            }
            values => headers.set("Content-Type", values.to_vec()),
        }

        match overrides.get("Content-Disposition") {
            [] => {
                let disposition = match kind {
                    FileKind::Attachment => "attachment",
                    FileKind::Embedded => "inline",
                };
                headers.set(
                    "Content-Disposition",
                    vec![format!("{}; filename=\"{}\"", disposition, filename)],
                );
            }
            values => headers.set("Content-Disposition", values.to_vec()),
        }

        match (kind, overrides.get("Content-ID")) {
            (FileKind::Embedded, []) => {
                headers.set("Content-ID", vec![format!("<{}>", filename)]);
            }
            (_, []) => {}
            (_, values) => headers.set("Content-ID", values.to_vec()),
        }

        let (declared, encoding) = match overrides.get("Content-Transfer-Encoding") {
            [] => (Encoding::Base64.as_str().to_owned(), Encoding::Base64),
            values => {
                let declared = values[0].clone();
                let encoding = match declared.as_str() {
                    "base64" => Encoding::Base64,
                    "quoted-printable" => Encoding::QuotedPrintable,
                    _ => Encoding::Unencoded,
                };
                (declared, encoding)
            }
        };
        headers.set("Content-Transfer-Encoding", vec![declared]);

        // Remaining caller-provided headers ride along unchanged.
        for (name, values) in overrides.iter() {
            if !headers.contains(name) {
                headers.set(name, values.to_vec());
            }
        }

        self.write_headers(&headers)?;

        let label = format!("file \"{}\"", filename);
        self.write_body(file.copier(), encoding, &label)
    }

    fn write_body(
        &mut self,
        writer: &PartWriter,
        encoding: Encoding,
        label: &str,
    ) -> Result<(), Error> {
        // At the top level the blank separator has not been written yet;
        // inside a multipart, `create_part` already emitted it.
        if self.boundaries.is_empty() {
            self.write_str("\r\n")?;
        }

        let result = match encoding {
            Encoding::QuotedPrintable => {
                let mut qp = QpWriter::new(&mut *self);
                writer(&mut qp).and_then(|()| qp.finish())
            }
            Encoding::Base64 => {
                let mut b64 = Base64Writer::new(&mut *self);
                writer(&mut b64).and_then(|()| b64.finish())
            }
            Encoding::Unencoded => writer(&mut *self),
        };

        match result {
            Ok(()) => Ok(()),
            Err(source) if self.sink_failed => Err(Error::Io(source)),
            Err(source) => Err(Error::PartWriter {
                part: label.to_owned(),
                source,
            }),
        }
    }

    fn write_str(&mut self, s: &str) -> Result<(), Error> {
        self.write_all(s.as_bytes()).map_err(Error::Io)
    }
}

impl io::Write for MessageWriter<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.sink.write_all(buf) {
            Ok(()) => {
                self.written += buf.len() as u64;
                Ok(buf.len())
            }
            Err(err) => {
                self.sink_failed = true;
                Err(err)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}
