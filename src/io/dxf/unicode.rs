//! `\U+XXXX` escapes of pre-R2007 DXF text
//!
//! Files older than R2007 are written in a single-byte or DBCS code page;
//! characters outside of it are stored as `\U+XXXX` (UTF-16 code units,
//! surrogate pairs as two escapes). R2007+ files are UTF-8 and never
//! carry the escape form, so both transforms are applied only to legacy
//! revisions.

use encoding_rs::Encoding;
use nom::bytes::complete::{tag_no_case, take_while_m_n};
use nom::combinator::map_opt;
use nom::sequence::preceded;
use nom::IResult;
use std::borrow::Cow;
use std::fmt::Write;

fn escape_unit(input: &str) -> IResult<&str, u32> {
    map_opt(
        preceded(
            tag_no_case("\\U+"),
            take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit()),
        ),
        |hex: &str| u32::from_str_radix(hex, 16).ok(),
    )(input)
}

pub fn has_unicode_escape(text: &str) -> bool {
    text.contains("\\U+") || text.contains("\\u+")
}

/// Replace `\U+XXXX` escapes by the characters they encode.
///
/// Malformed escapes and unpaired surrogates stay as literal text.
pub fn decode_unicode_escapes(text: &str) -> Cow<'_, str> {
    if !has_unicode_escape(text) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        if let Ok((tail, unit)) = escape_unit(rest) {
            if (0xD800..0xDC00).contains(&unit) {
                if let Ok((tail2, low)) = escape_unit(tail) {
                    if (0xDC00..0xE000).contains(&low) {
                        let code_point = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                        if let Some(c) = char::from_u32(code_point) {
                            out.push(c);
                            rest = tail2;
                            continue;
                        }
                    }
                }
            } else if let Some(c) = char::from_u32(unit) {
                out.push(c);
                rest = tail;
                continue;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    Cow::Owned(out)
}

/// Escape every character the target code page cannot represent.
pub fn encode_unicode_escapes<'a>(text: &'a str, encoding: &'static Encoding) -> Cow<'a, str> {
    if text.is_ascii() || encoding == encoding_rs::UTF_8 {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if c.is_ascii() || is_encodable(c, encoding, &mut buf) {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\U+{:04X}", unit);
            }
        }
    }
    Cow::Owned(out)
}

fn is_encodable(c: char, encoding: &'static Encoding, buf: &mut [u8; 4]) -> bool {
    let (_, _, had_errors) = encoding.encode(c.encode_utf8(buf));
    !had_errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic() {
        assert_eq!(decode_unicode_escapes("\\U+00E4bc"), "äbc");
        assert_eq!(decode_unicode_escapes("x\\u+03a9y"), "xΩy");
    }

    #[test]
    fn test_decode_leaves_plain_text_borrowed() {
        assert!(matches!(decode_unicode_escapes("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_malformed_escape_is_literal() {
        assert_eq!(decode_unicode_escapes("\\U+12"), "\\U+12");
        assert_eq!(decode_unicode_escapes("\\U+ZZZZ"), "\\U+ZZZZ");
    }

    #[test]
    fn test_surrogate_pair() {
        assert_eq!(decode_unicode_escapes("\\U+D83D\\U+DE00"), "😀");
        assert_eq!(
            encode_unicode_escapes("😀", encoding_rs::WINDOWS_1252),
            "\\U+D83D\\U+DE00"
        );
    }

    #[test]
    fn test_encode_keeps_code_page_characters() {
        let encoded = encode_unicode_escapes("café Ω", encoding_rs::WINDOWS_1252);
        assert_eq!(encoded, "café \\U+03A9");
        assert_eq!(decode_unicode_escapes(&encoded), "café Ω");
    }
}
