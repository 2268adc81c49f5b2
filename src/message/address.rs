//! Address formatting and the minimal parsing envelope extraction needs.

use super::rfc2047::{self, WordEncoding};

/// Characters that structure an address list; a display name containing
/// any of them cannot be emitted bare.
const SPECIALS: &[char] = &[
    '"', '(', ')', ',', ':', ';', '<', '>', '@', '[', '\\', ']',
];

/// Formats `name <addr>`, quoting or encoding the display name as needed.
///
/// An empty name yields the bare address. `buf` is scratch space owned by
/// the message; its capacity is kept across calls.
pub(crate) fn format_address(
    buf: &mut String,
    charset: &str,
    encoding: WordEncoding,
    addr: &str,
    name: &str,
) -> String {
    if name.is_empty() {
        return addr.to_owned();
    }

    buf.clear();
    let encoded = rfc2047::encode_value(charset, encoding, name);
    if encoded == name {
        if name.contains(SPECIALS) {
            quote(buf, name);
        } else {
            buf.push_str(name);
        }
    } else if name.contains(SPECIALS) {
        // A q word would leave specials such as `,` readable as list
        // separators inside the phrase, so these names are always base64.
        buf.push_str(&rfc2047::encode_word(charset, WordEncoding::B, name));
    } else {
        buf.push_str(&encoded);
    }
    buf.push_str(" <");
    buf.push_str(addr);
    buf.push('>');

    let formatted = buf.clone();
    buf.clear();
    formatted
}

fn quote(out: &mut String, name: &str) {
    out.push('"');
    for ch in name.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
}

/// Extracts the addr-spec from a `name <addr>` form.
///
/// The local and domain parts are not validated; rejecting a bad address
/// is left to the receiving server.
pub(crate) fn addr_spec(field: &str) -> String {
    match (field.rfind('<'), field.rfind('>')) {
        (Some(open), Some(close)) if open < close => field[open + 1..close].to_owned(),
        _ => field.trim().to_owned(),
    }
}
