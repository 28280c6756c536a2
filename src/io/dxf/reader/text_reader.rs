//! DXF ASCII text reader

use super::stream_reader::{decode_caret, DxfStreamReader, TextDecoder};
use crate::error::{DxfError, Result};
use crate::tags::group_code::{is_valid_code, GroupCodeValueType, STRUCTURE_MARKER};
use crate::tags::{Tag, TagValue};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// DXF ASCII reader over an in-memory buffer
///
/// Code lines are trimmed; value lines keep leading and trailing blanks
/// except for structure tags (code 0). Both `\n` and `\r\n` terminate a
/// line.
pub struct DxfTextReader<'a> {
    data: &'a [u8],
    pos: usize,
    line_number: usize,
    decoder: TextDecoder,
}

impl<'a> DxfTextReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let pos = if data.starts_with(UTF8_BOM) {
            UTF8_BOM.len()
        } else {
            0
        };
        Self {
            data,
            pos,
            line_number: 0,
            decoder: TextDecoder::default(),
        }
    }

    fn read_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        self.line_number += 1;
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }

    fn at_blank_tail(&self) -> bool {
        self.data[self.pos.min(self.data.len())..]
            .iter()
            .all(|b| b.is_ascii_whitespace())
    }

    fn parse_code(&self, line: &[u8]) -> Result<i32> {
        let text = String::from_utf8_lossy(line);
        let code = text.trim().parse::<i32>().map_err(|_| {
            DxfError::parse(
                self.line_number,
                format!("invalid group code '{}'", text.trim()),
            )
        })?;
        if !is_valid_code(code) {
            return Err(DxfError::parse(
                self.line_number,
                format!("group code {} out of range", code),
            ));
        }
        Ok(code)
    }

    fn parse_value(&self, code: i32, raw: &[u8]) -> Result<TagValue> {
        let value_type = GroupCodeValueType::from_code(code);
        if value_type == GroupCodeValueType::String {
            let text = self.decoder.decode(raw);
            let text = if code == STRUCTURE_MARKER {
                text.trim().to_string()
            } else {
                text
            };
            return Ok(TagValue::String(decode_caret(&text)));
        }

        let text = String::from_utf8_lossy(raw);
        let text = text.trim();
        match value_type {
            GroupCodeValueType::Double => text.parse::<f64>().map(TagValue::Double).map_err(|_| {
                DxfError::parse(
                    self.line_number,
                    format!("invalid float '{}' for group code {}", text, code),
                )
            }),
            GroupCodeValueType::Binary => parse_hex(text).map(TagValue::Binary).ok_or_else(|| {
                DxfError::parse(
                    self.line_number,
                    format!("invalid hex data for group code {}", code),
                )
            }),
            _ => parse_int(text).map(TagValue::Integer).ok_or_else(|| {
                DxfError::parse(
                    self.line_number,
                    format!("invalid integer '{}' for group code {}", text, code),
                )
            }),
        }
    }
}

impl DxfStreamReader for DxfTextReader<'_> {
    fn read_tag(&mut self) -> Result<Option<Tag>> {
        let code_line = match self.read_line() {
            Some(line) => line,
            None => return Ok(None),
        };
        if code_line.iter().all(|b| b.is_ascii_whitespace()) && self.at_blank_tail() {
            return Ok(None);
        }
        let code = self.parse_code(code_line)?;

        let value_line = match self.read_line() {
            Some(line) => line,
            None => {
                return Err(DxfError::parse(
                    self.line_number,
                    format!("unexpected end of input after group code {}", code),
                ))
            }
        };
        let value = self.parse_value(code, value_line)?;
        Ok(Some(Tag { code, value }))
    }

    fn line_number(&self) -> usize {
        self.line_number
    }

    fn set_encoding(&mut self, decoder: TextDecoder) {
        self.decoder = decoder;
    }
}

/// Integer values written as floats by some exporters are truncated.
fn parse_int(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i64)
    })
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 || !text.is_ascii() {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}
