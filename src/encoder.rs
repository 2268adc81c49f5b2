//! Streaming content-transfer-encoders.
//!
//! Each encoder wraps a downstream sink, accepts writes of any size and
//! keeps only a few bytes of state, so bodies of any size stream through
//! in constant memory. `finish` flushes whatever is pending; the last
//! output line is never terminated, the caller owns the framing.

use std::io::{self, Write};

/// Maximum output line length, soft-break column included.
const MAX_LINE_LEN: usize = 76;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Quoted-printable encoder (RFC 2045 §6.7).
///
/// Printable ASCII, space and tab pass through, everything else becomes
/// `=HH`. Lines are soft-wrapped with `=\r\n` before they would exceed 76
/// columns, and an `=HH` unit is never cut in half. CRLF and a bare LF in
/// the input are hard line breaks; a bare CR is data.
pub(crate) struct QpWriter<W: Write> {
    sink: W,
    line: [u8; MAX_LINE_LEN],
    len: usize,
    pending_cr: bool,
}

impl<W: Write> QpWriter<W> {
    pub(crate) fn new(sink: W) -> Self {
        QpWriter {
            sink,
            line: [0; MAX_LINE_LEN],
            len: 0,
            pending_cr: false,
        }
    }

    /// Flushes residual state and the unterminated last line.
    pub(crate) fn finish(mut self) -> io::Result<()> {
        if self.pending_cr {
            self.pending_cr = false;
            self.encode(b'\r')?;
        }
        self.encode_trailing_space()?;
        if self.len > 0 {
            self.sink.write_all(&self.line[..self.len])?;
            self.len = 0;
        }
        Ok(())
    }

    fn write_byte(&mut self, b: u8) -> io::Result<()> {
        if self.pending_cr {
            self.pending_cr = false;
            if b == b'\n' {
                return self.hard_break();
            }
            // A CR not followed by LF is data, not a line ending.
            self.encode(b'\r')?;
        }
        match b {
            b'\r' => {
                self.pending_cr = true;
                Ok(())
            }
            b'\n' => self.hard_break(),
            b'!'..=b'~' if b != b'=' => self.push_raw(b),
            b' ' | b'\t' => self.push_raw(b),
            _ => self.encode(b),
        }
    }

    fn hard_break(&mut self) -> io::Result<()> {
        self.encode_trailing_space()?;
        self.flush_line(b"\r\n")
    }

    // Space or tab must not end a line; re-encode it before breaking.
    fn encode_trailing_space(&mut self) -> io::Result<()> {
        if self.len > 0 {
            let last = self.line[self.len - 1];
            if last == b' ' || last == b'\t' {
                self.len -= 1;
                self.encode(last)?;
            }
        }
        Ok(())
    }

    fn push_raw(&mut self, b: u8) -> io::Result<()> {
        if self.len == MAX_LINE_LEN - 1 {
            self.soft_break()?;
        }
        self.line[self.len] = b;
        self.len += 1;
        Ok(())
    }

    fn encode(&mut self, b: u8) -> io::Result<()> {
        if MAX_LINE_LEN - 1 - self.len < 3 {
            self.soft_break()?;
        }
        self.line[self.len] = b'=';
        self.line[self.len + 1] = HEX[(b >> 4) as usize];
        self.line[self.len + 2] = HEX[(b & 0x0f) as usize];
        self.len += 3;
        Ok(())
    }

    fn soft_break(&mut self) -> io::Result<()> {
        self.flush_line(b"=\r\n")
    }

    fn flush_line(&mut self, ending: &[u8]) -> io::Result<()> {
        self.sink.write_all(&self.line[..self.len])?;
        self.sink.write_all(ending)?;
        self.len = 0;
        Ok(())
    }
}

impl<W: Write> Write for QpWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            self.write_byte(b)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Base64 encoder emitting a CRLF every 76 output characters.
///
/// Up to two residual input bytes are buffered between writes; `finish`
/// emits the final, possibly padded group.
pub(crate) struct Base64Writer<W: Write> {
    sink: LineWrapper<W>,
    rem: [u8; 3],
    rem_len: usize,
}

impl<W: Write> Base64Writer<W> {
    pub(crate) fn new(sink: W) -> Self {
        Base64Writer {
            sink: LineWrapper::new(sink, MAX_LINE_LEN),
            rem: [0; 3],
            rem_len: 0,
        }
    }

    pub(crate) fn finish(mut self) -> io::Result<()> {
        if self.rem_len > 0 {
            let mut group = [0u8; 4];
            let n = base64::encode_config_slice(
                &self.rem[..self.rem_len],
                base64::STANDARD,
                &mut group,
            );
            self.sink.write_all(&group[..n])?;
        }
        Ok(())
    }
}

impl<W: Write> Write for Base64Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut input = buf;

        if self.rem_len > 0 {
            let take = input.len().min(3 - self.rem_len);
            self.rem[self.rem_len..self.rem_len + take].copy_from_slice(&input[..take]);
            self.rem_len += take;
            input = &input[take..];

            if self.rem_len < 3 {
                return Ok(buf.len());
            }
            let mut group = [0u8; 4];
            base64::encode_config_slice(&self.rem, base64::STANDARD, &mut group);
            self.sink.write_all(&group)?;
            self.rem_len = 0;
        }

        let full = input.len() - input.len() % 3;
        let mut encoded = [0u8; 1024];
        for chunk in input[..full].chunks(768) {
            let n = base64::encode_config_slice(chunk, base64::STANDARD, &mut encoded);
            self.sink.write_all(&encoded[..n])?;
        }

        let rest = &input[full..];
        self.rem[..rest.len()].copy_from_slice(rest);
        self.rem_len = rest.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Inserts `\r\n` every `max` output bytes.
///
/// The separator is written lazily, when more output actually follows, so
/// the final line never picks up a stray terminator.
pub(crate) struct LineWrapper<W: Write> {
    sink: W,
    max: usize,
    line_len: usize,
}

impl<W: Write> LineWrapper<W> {
    pub(crate) fn new(sink: W, max: usize) -> Self {
        LineWrapper {
            sink,
            max,
            line_len: 0,
        }
    }
}

impl<W: Write> Write for LineWrapper<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;
        while self.line_len + rest.len() > self.max {
            let take = self.max - self.line_len;
            self.sink.write_all(&rest[..take])?;
            self.sink.write_all(b"\r\n")?;
            rest = &rest[take..];
            self.line_len = 0;
        }
        self.sink.write_all(rest)?;
        self.line_len += rest.len();
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

    use super::{Base64Writer, QpWriter};

    fn qp(input: &[u8]) -> String {
        let mut out = Vec::new();
        let mut w = QpWriter::new(&mut out);
        w.write_all(input).unwrap();
        w.finish().unwrap();
        String::from_utf8(out).unwrap()
    }

    fn b64(input: &[u8]) -> String {
        let mut out = Vec::new();
        let mut w = Base64Writer::new(&mut out);
        w.write_all(input).unwrap();
        w.finish().unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn qp_passthrough() {
        assert_eq!(qp(b"Hello, world!"), "Hello, world!");
    }

    #[test]
    fn qp_non_ascii() {
        assert_eq!(
            qp("¡Hola, señor!".as_bytes()),
            "=C2=A1Hola, se=C3=B1or!"
        );
    }

    #[test]
    fn qp_hard_break_preserved() {
        assert_eq!(qp(b"one\r\ntwo"), "one\r\ntwo");
    }

    #[test]
    fn qp_bare_lf_promoted() {
        assert_eq!(qp(b"one\ntwo"), "one\r\ntwo");
    }

    #[test]
    fn qp_bare_cr_is_data() {
        assert_eq!(qp(b"one\rtwo"), "one=0Dtwo");
        assert_eq!(qp(b"one\r"), "one=0D");
        assert_eq!(qp(b"one\r\rtwo"), "one=0D=0Dtwo");
    }

    #[test]
    fn qp_trailing_space_encoded() {
        assert_eq!(qp(b"a \r\nb"), "a=20\r\nb");
        assert_eq!(qp(b"a\t\r\nb"), "a=09\r\nb");
        assert_eq!(qp(b"a "), "a=20");
    }

    #[test]
    fn qp_soft_wrap_at_76() {
        let input = format!("{}\r\n", "0".repeat(76));
        assert_eq!(qp(input.as_bytes()), format!("{}=\r\n0\r\n", "0".repeat(75)));
    }

    #[test]
    fn qp_soft_wrap_keeps_multibyte_unit_whole() {
        let input = format!("{}à\r\n", "0".repeat(75));
        assert_eq!(
            qp(input.as_bytes()),
            format!("{}=\r\n=C3=A0\r\n", "0".repeat(75))
        );
    }

    #[test]
    fn qp_soft_wrap_between_units() {
        let input = format!("{}à", "0".repeat(72));
        assert_eq!(qp(input.as_bytes()), format!("{}=C3=\r\n=A0", "0".repeat(72)));
    }

    #[test]
    fn qp_chunked_writes_equal_one_shot() {
        let input = format!("{}à la carte\r\n", "0".repeat(70));
        let whole = qp(input.as_bytes());

        let mut out = Vec::new();
        let mut w = QpWriter::new(&mut out);
        for chunk in input.as_bytes().chunks(3) {
            w.write_all(chunk).unwrap();
        }
        w.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), whole);
    }

    #[test]
    fn qp_round_trip() {
        fn decode(s: &str) -> Vec<u8> {
            let b = s.as_bytes();
            let mut out = Vec::new();
            let mut i = 0;
            while i < b.len() {
                if b[i] == b'=' {
                    if &b[i + 1..i + 3] == b"\r\n" {
                        i += 3;
                    } else {
                        let hex = std::str::from_utf8(&b[i + 1..i + 3]).unwrap();
                        out.push(u8::from_str_radix(hex, 16).unwrap());
                        i += 3;
                    }
                } else {
                    out.push(b[i]);
                    i += 1;
                }
            }
            out
        }

        // Every byte value except the line-ending pair, which does not
        // survive newline canonicalization.
        let input: Vec<u8> = (0u8..=255).filter(|&b| b != b'\r' && b != b'\n').collect();
        assert_eq!(decode(&qp(&input)), input);
    }

    #[test]
    fn base64_pads_final_group() {
        assert_eq!(b64(b"Chunk."), "Q2h1bmsu");
        assert_eq!(b64(b"Chunk"), "Q2h1bms=");
        assert_eq!(b64(b"Chun"), "Q2h1bg==");
        assert_eq!(b64(b""), "");
    }

    #[test]
    fn base64_wraps_at_76() {
        assert_eq!(
            b64("0".repeat(58).as_bytes()),
            format!("{}\r\nMA==", "MDAw".repeat(19))
        );
    }

    #[test]
    fn base64_no_trailing_newline_on_exact_line() {
        // 57 input bytes encode to exactly one 76-character line.
        assert_eq!(b64(&[0u8; 57]), "AAAA".repeat(19));
    }

    #[test]
    fn base64_chunked_writes_equal_one_shot() {
        let input: Vec<u8> = (0u8..=255).collect();
        let whole = b64(&input);

        let mut out = Vec::new();
        let mut w = Base64Writer::new(&mut out);
        for chunk in input.chunks(5) {
            w.write_all(chunk).unwrap();
        }
        w.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), whole);
    }
}
