//! DXF stream reader trait and common helpers

use crate::error::Result;
use crate::io::dxf::unicode::decode_unicode_escapes;
use crate::tags::Tag;
use encoding_rs::Encoding;

/// Trait for reading raw DXF tags from a stream
///
/// Coordinates come out as separate scalar tags, one per axis; the
/// [`TagCompiler`](super::tag_compiler::TagCompiler) joins them to points.
pub trait DxfStreamReader {
    /// Read the next tag, `None` at end of input
    fn read_tag(&mut self) -> Result<Option<Tag>>;

    /// Line number of the last tag read (the equivalent ASCII line for
    /// binary input)
    fn line_number(&self) -> usize;

    /// Set the text encoding used for string values
    fn set_encoding(&mut self, decoder: TextDecoder);
}

/// String decoding for tag values
///
/// Values are tried as UTF-8 first and fall back to the document code page.
/// Pre-R2007 documents also expand `\U+XXXX` escapes.
#[derive(Debug, Clone, Copy)]
pub struct TextDecoder {
    pub encoding: &'static Encoding,
    pub unicode_escapes: bool,
}

impl TextDecoder {
    pub fn new(encoding: &'static Encoding, unicode_escapes: bool) -> Self {
        Self {
            encoding,
            unicode_escapes,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        let text = match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                let (decoded, _, _) = self.encoding.decode(bytes);
                decoded.into_owned()
            }
        };
        if self.unicode_escapes {
            decode_unicode_escapes(&text).into_owned()
        } else {
            text
        }
    }
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self::new(encoding_rs::WINDOWS_1252, false)
    }
}

/// Control characters a DXF value line cannot hold and their caret letter
const CARET_ESCAPES: [(char, char); 3] = [('\n', 'J'), ('\r', 'M'), ('\t', 'I')];

fn caret_control(letter: char) -> Option<char> {
    CARET_ESCAPES
        .iter()
        .find(|(_, l)| *l == letter)
        .map(|(c, _)| *c)
}

fn caret_letter(control: char) -> Option<char> {
    CARET_ESCAPES
        .iter()
        .find(|(c, _)| *c == control)
        .map(|(_, l)| *l)
}

/// Expand caret notation: `^J` → LF, `^M` → CR, `^I` → TAB and `^ ` → `^`.
/// Any other caret is literal text.
pub fn decode_caret(text: &str) -> String {
    if !text.contains('^') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '^' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(' ') => {
                out.push('^');
                chars.next();
            }
            Some(next) => match caret_control(next) {
                Some(control) => {
                    out.push(control);
                    chars.next();
                }
                None => out.push('^'),
            },
            None => out.push('^'),
        }
    }
    out
}

/// Replace line breaks and tabs by caret notation, the inverse of
/// [`decode_caret`]. A caret is only escaped where it would otherwise
/// read back as an escape.
pub fn encode_caret(text: &str) -> String {
    if !text.contains(|c: char| c == '^' || caret_letter(c).is_some()) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 4);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(letter) = caret_letter(c) {
            out.push('^');
            out.push(letter);
            continue;
        }
        out.push(c);
        if c == '^' {
            let ambiguous = chars
                .peek()
                .map_or(false, |next| *next == ' ' || caret_control(*next).is_some());
            if ambiguous {
                out.push(' ');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_decoding() {
        assert_eq!(decode_caret("a^Jb"), "a\nb");
        assert_eq!(decode_caret("a^Mb^I"), "a\rb\t");
        assert_eq!(decode_caret("x^ y"), "x^y");
        assert_eq!(decode_caret("trailing^"), "trailing^");
    }

    #[test]
    fn test_caret_in_free_text_is_literal() {
        assert_eq!(decode_caret("A^B"), "A^B");
        assert_eq!(decode_caret("2^3=8"), "2^3=8");
        assert_eq!(encode_caret("2^3=8"), "2^3=8");
        assert_eq!(encode_caret("x^y"), "x^y");
    }

    #[test]
    fn test_caret_encoding_reverses_decoding() {
        let text = "line1\nline2\t^end";
        assert_eq!(encode_caret(text), "line1^Jline2^I^end");
        for text in [text, "^J literal", "a^ b", "^^M", "end^", "\r\n", "^"] {
            assert_eq!(decode_caret(&encode_caret(text)), text, "{:?}", text);
        }
    }

    #[test]
    fn test_decoder_falls_back_to_code_page() {
        let decoder = TextDecoder::new(encoding_rs::WINDOWS_1252, false);
        assert_eq!(decoder.decode(&[0x63, 0x61, 0x66, 0xE9]), "café");
        assert_eq!(decoder.decode("café".as_bytes()), "café");
    }

    #[test]
    fn test_decoder_unicode_escapes() {
        let legacy = TextDecoder::new(encoding_rs::WINDOWS_1252, true);
        assert_eq!(legacy.decode(b"\\U+03A9"), "Ω");
        let modern = TextDecoder::new(encoding_rs::UTF_8, false);
        assert_eq!(modern.decode(b"\\U+03A9"), "\\U+03A9");
    }
}
