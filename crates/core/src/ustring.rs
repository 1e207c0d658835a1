//! Immutable Unicode strings
//!
//! An `Ustring` is a sequence of 32-bit packed codepoints: each element
//! holds the raw UTF-8 bytes of one character, big-endian in the low bytes
//! (`é`, UTF-8 `C3 A9`, is stored as `0x0000C3A9`). Parsing consumes raw
//! source bytes and processes backslash escapes; printing emits the
//! non-zero bytes of each element most-significant first, which restores
//! the original UTF-8.
//!
//! Strings are immutable once parsed. Equality is elementwise over the
//! codepoint sequence.

use std::fmt;

/// One parsed string: packed codepoints plus the cached number of UTF-8
/// bytes the string re-encodes to.
#[derive(Clone, Default)]
pub struct Ustring {
    data: Vec<u32>,
    byte_length: usize,
}

impl PartialEq for Ustring {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Ustring {}

impl Ustring {
    /// Number of codepoints.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total UTF-8 bytes when re-encoded.
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// The packed codepoint at `index`.
    pub fn get(&self, index: usize) -> Option<u32> {
        self.data.get(index).copied()
    }

    /// Iterate the packed codepoints in order.
    pub fn chars(&self) -> impl Iterator<Item = u32> + '_ {
        self.data.iter().copied()
    }

    /// Parse raw source bytes (the contents of a string literal, quotes
    /// stripped) into an `Ustring`, processing escape sequences.
    ///
    /// Escapes: `\a \b \f \n \r \t \v \\ \' \"` have their usual meanings;
    /// a backslash before a newline suppresses the newline entirely. Any
    /// other `\X` passes `X` through verbatim with a warning.
    pub fn parse(bytes: &[u8]) -> Ustring {
        let mut data = Vec::with_capacity(bytes.len());
        let mut index = 0;

        while index < bytes.len() {
            let mut check = bytes[index];
            let mut char_length = 1;
            let mut extra = 0;
            if check == b'\\' {
                match bytes.get(index + 1) {
                    Some(&next) => {
                        check = next;
                        char_length = 2;
                        extra = 1;
                    }
                    None => {
                        eprintln!("Warning: dangling '\\' at end of string");
                        data.push(u32::from(b'\\'));
                        break;
                    }
                }
            }
            if is_u2(check) {
                char_length = 2 + extra;
            }
            if is_u3(check) {
                char_length = 3 + extra;
            }
            if is_u4(check) {
                char_length = 4 + extra;
            }

            let end = (index + char_length).min(bytes.len());
            let ch = char_parse(&bytes[index..end]);
            if ch != 0 {
                data.push(ch);
            }

            index += char_length;
        }

        let byte_length = data.iter().map(|&ch| char_byte_len(ch)).sum();
        Ustring { data, byte_length }
    }

    /// Convenience wrapper over [`Ustring::parse`] for test and embedder
    /// code that starts from Rust strings.
    pub fn from_str(text: &str) -> Ustring {
        Ustring::parse(text.as_bytes())
    }

    /// Re-encode the codepoints into the UTF-8 byte sequence they came
    /// from.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_length);
        for &ch in &self.data {
            encode_char(ch, &mut out);
        }
        out
    }

    /// Re-encode into an owned Rust string.
    pub fn unparse(&self) -> String {
        String::from_utf8_lossy(&self.encode()).into_owned()
    }
}

impl fmt::Display for Ustring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unparse())
    }
}

impl fmt::Debug for Ustring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ustring({:?})", self.unparse())
    }
}

fn is_u2(byte: u8) -> bool {
    (0xC2..=0xDF).contains(&byte)
}

fn is_u3(byte: u8) -> bool {
    (0xE0..=0xEF).contains(&byte)
}

fn is_u4(byte: u8) -> bool {
    (0xF0..=0xF4).contains(&byte)
}

/// Number of UTF-8 bytes a packed codepoint re-encodes to.
fn char_byte_len(ch: u32) -> usize {
    if ch == 0 {
        0
    } else {
        4 - ch.leading_zeros() as usize / 8
    }
}

/// Append the non-zero bytes of a packed codepoint, most-significant
/// first.
pub fn encode_char(ch: u32, out: &mut Vec<u8>) {
    for shift in (0..4).rev() {
        let byte = ((ch >> (8 * shift)) & 0xFF) as u8;
        if byte != 0 {
            out.push(byte);
        }
    }
}

/// Render a single packed codepoint as a Rust string.
pub fn char_to_string(ch: u32) -> String {
    let mut bytes = Vec::with_capacity(4);
    encode_char(ch, &mut bytes);
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse one character literal (escape sequence or 1-4 raw UTF-8 bytes)
/// into a packed codepoint. Returns 0 to mean "no character" (the
/// suppressed `\<newline>` continuation).
pub fn char_parse(bytes: &[u8]) -> u32 {
    if bytes.first() == Some(&b'\\') {
        if bytes.len() == 2 {
            match bytes[1] {
                b'a' => 0x07,
                b'b' => 0x08,
                b'f' => 0x0C,
                b'n' => 0x0A,
                b'r' => 0x0D,
                b't' => 0x09,
                b'v' => 0x0B,
                b'\\' => u32::from(b'\\'),
                b'\'' => u32::from(b'\''),
                b'"' => u32::from(b'"'),
                b'\n' => 0, // line continuation: no character
                other => {
                    eprintln!(
                        "Warning: unrecognized escape sequence \\{}",
                        char_to_string(u32::from(other))
                    );
                    u32::from(other)
                }
            }
        } else {
            eprintln!(
                "Warning: unrecognized escape sequence {}",
                String::from_utf8_lossy(bytes)
            );
            bytes.get(1).copied().map_or(0, u32::from)
        }
    } else {
        bytes.iter().fold(0u32, |total, &b| (total << 8) + u32::from(b))
    }
}
