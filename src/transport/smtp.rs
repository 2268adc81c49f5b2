//! A thin blocking SMTP dialer.
//!
//! One TCP connection per message, plain text only: TLS, authentication,
//! pipelining and connection reuse are out of scope. The dialer consumes
//! the same `(from, recipients, write_to)` surface as any other
//! [`Sender`].

use std::{
    io::{self, BufRead, BufReader, Write},
    net::TcpStream,
    time::Duration,
};

use crate::{error::Error, message::Message, transport::Sender};

/// Blocking SMTP client delivering one message per connection.
///
/// ```no_run
/// use missive::{send, Message, SmtpDialer};
///
/// # fn main() -> Result<(), missive::Error> {
/// let mut msg = Message::new();
/// msg.set_header("From", ["alex@example.org"]);
/// msg.set_header("To", ["dakota@example.net"]);
/// msg.set_body("text/plain", "Hello!", []);
///
/// let mut dialer = SmtpDialer::new("mail.example.org", 25);
/// send(&mut dialer, &[msg])?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SmtpDialer {
    server: String,
    port: u16,
    hello_name: String,
    timeout: Option<Duration>,
}

impl SmtpDialer {
    /// Creates a dialer for `server:port` with a 30 second timeout.
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        SmtpDialer {
            server: server.into(),
            port,
            hello_name: "localhost".to_owned(),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Sets the name announced in `EHLO`/`HELO`.
    pub fn hello_name(mut self, name: impl Into<String>) -> Self {
        self.hello_name = name.into();
        self
    }

    /// Sets the read/write timeout; `None` blocks indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn dial(&self) -> Result<SmtpConnection, Error> {
        let stream = TcpStream::connect((self.server.as_str(), self.port))?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        let mut conn = SmtpConnection {
            stream: BufReader::new(stream),
        };
        conn.expect(&[220])?;
        tracing::debug!(server = %self.server, port = self.port, "smtp session open");
        Ok(conn)
    }
}

impl Sender for SmtpDialer {
    fn send(&mut self, from: &str, to: &[String], msg: &Message) -> Result<(), Error> {
        let mut conn = self.dial()?;

        match conn.command(&format!("EHLO {}", self.hello_name), &[250]) {
            Ok(_) => {}
            Err(Error::UnexpectedReply { .. }) => {
                conn.command(&format!("HELO {}", self.hello_name), &[250])?;
            }
            Err(err) => return Err(err),
        }

        conn.command(&format!("MAIL FROM:<{}>", from), &[250])?;
        for rcpt in to {
            conn.command(&format!("RCPT TO:<{}>", rcpt), &[250, 251])?;
        }
        conn.command("DATA", &[354])?;

        {
            let mut body = DotStuffer::new(conn.stream.get_mut());
            msg.write_to(&mut body)?;
        }
        let stream = conn.stream.get_mut();
        stream.write_all(b"\r\n.\r\n")?;
        stream.flush()?;
        conn.expect(&[250])?;
        tracing::debug!(recipients = to.len(), "message accepted");

        // Session teardown failures do not unsend the message.
        let _ = conn.command("QUIT", &[221]);
        Ok(())
    }
}

struct SmtpConnection {
    stream: BufReader<TcpStream>,
}

struct Reply {
    code: u16,
    text: String,
}

impl SmtpConnection {
    fn command(&mut self, line: &str, accept: &[u16]) -> Result<Reply, Error> {
        tracing::trace!(command = line, "smtp send");
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\r\n")?;
        stream.flush()?;
        self.expect(accept)
    }

    fn expect(&mut self, accept: &[u16]) -> Result<Reply, Error> {
        let reply = self.read_reply()?;
        if accept.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(Error::UnexpectedReply {
                code: reply.code,
                text: reply.text,
            })
        }
    }

    /// Reads one reply, following `250-` continuation lines to the end.
    fn read_reply(&mut self) -> Result<Reply, Error> {
        let mut code = 0;
        let mut text = String::new();
        loop {
            let mut line = String::new();
            if self.stream.read_line(&mut line)? == 0 {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-reply",
                )));
            }
            let (line_code, more, line_text) = parse_reply_line(line.trim_end())?;
            code = line_code;
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(line_text);
            if !more {
                break;
            }
        }
        tracing::trace!(code, "smtp reply");
        Ok(Reply { code, text })
    }
}

fn parse_reply_line(line: &str) -> Result<(u16, bool, &str), Error> {
    let digits = line.as_bytes().get(..3).filter(|d| d.iter().all(u8::is_ascii_digit));
    let code = match digits.and_then(|_| line[..3].parse().ok()) {
        Some(code) => code,
        None => {
            return Err(Error::UnexpectedReply {
                code: 0,
                text: line.to_owned(),
            })
        }
    };
    let more = line.as_bytes().get(3) == Some(&b'-');
    let text = line.get(4..).unwrap_or("");
    Ok((code, more, text))
}

/// Makes message content transparent for the `DATA` phase by doubling
/// every dot that starts a line.
struct DotStuffer<W: Write> {
    sink: W,
    at_line_start: bool,
}

impl<W: Write> DotStuffer<W> {
    fn new(sink: W) -> Self {
        DotStuffer {
            sink,
            at_line_start: true,
        }
    }
}

impl<W: Write> Write for DotStuffer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;
        while !rest.is_empty() {
            if self.at_line_start && rest[0] == b'.' {
                self.sink.write_all(b".")?;
            }
            let line_end = rest
                .iter()
                .position(|&b| b == b'\n')
                .map(|i| i + 1)
                .unwrap_or(rest.len());
            self.sink.write_all(&rest[..line_end])?;
            self.at_line_start = rest[line_end - 1] == b'\n';
            rest = &rest[line_end..];
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::{parse_reply_line, DotStuffer};

    fn stuff(chunks: &[&[u8]]) -> String {
        let mut out = Vec::new();
        let mut w = DotStuffer::new(&mut out);
        for chunk in chunks {
            w.write_all(chunk).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn leading_dots_are_doubled() {
        assert_eq!(
            stuff(&[b"one\r\n.two\r\n..three\r\nfour."]),
            "one\r\n..two\r\n...three\r\nfour."
        );
    }

    #[test]
    fn dot_on_first_line_is_doubled() {
        assert_eq!(stuff(&[b".start"]), "..start");
    }

    #[test]
    fn line_state_survives_chunked_writes() {
        assert_eq!(stuff(&[b"one\r\n", b".two"]), "one\r\n..two");
        assert_eq!(stuff(&[b"one.", b"two"]), "one.two");
    }

    #[test]
    fn reply_lines_parse() {
        assert_eq!(parse_reply_line("250 OK").unwrap(), (250, false, "OK"));
        assert_eq!(
            parse_reply_line("250-PIPELINING").unwrap(),
            (250, true, "PIPELINING")
        );
        assert_eq!(parse_reply_line("354").unwrap(), (354, false, ""));
        assert!(parse_reply_line("nonsense").is_err());
    }
}
