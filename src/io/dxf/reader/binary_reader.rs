//! Binary DXF reader

use super::stream_reader::{DxfStreamReader, TextDecoder};
use crate::error::{DxfError, Result};
use crate::tags::group_code::{is_valid_code, GroupCodeValueType};
use crate::tags::{Tag, TagValue};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Binary DXF sentinel
pub const BINARY_SENTINEL: &[u8] = b"AutoCAD Binary DXF\r\n\x1a\x00";

/// Binary DXF reader over an in-memory buffer
///
/// R13+ files store group codes as 16-bit little endian integers. R12
/// files use a single byte, with 255 announcing a following 16-bit code.
pub struct DxfBinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
    two_byte_codes: bool,
    tag_count: usize,
    decoder: TextDecoder,
}

impl<'a> DxfBinaryReader<'a> {
    /// Create a reader for `data` including the sentinel.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let body = data.strip_prefix(BINARY_SENTINEL).ok_or_else(|| {
            DxfError::Encoding("missing binary DXF sentinel".to_string())
        })?;
        // the first tag is always 0/SECTION: a 16-bit code 0 has a zero
        // high byte, a one-byte code is followed by 'S'
        let two_byte_codes = body.len() >= 2 && body[1] == 0;
        Ok(Self {
            cursor: Cursor::new(body),
            two_byte_codes,
            tag_count: 0,
            decoder: TextDecoder::default(),
        })
    }

    pub fn uses_two_byte_codes(&self) -> bool {
        self.two_byte_codes
    }

    fn offset(&self) -> u64 {
        self.cursor.position() + BINARY_SENTINEL.len() as u64
    }

    fn truncated(&self, what: &str) -> DxfError {
        DxfError::parse(
            self.line_number(),
            format!("truncated binary DXF reading {} at offset {}", what, self.offset()),
        )
    }

    fn read_code(&mut self) -> Result<Option<i32>> {
        if self.cursor.position() as usize >= self.cursor.get_ref().len() {
            return Ok(None);
        }
        let code = if self.two_byte_codes {
            self.cursor
                .read_i16::<LittleEndian>()
                .map_err(|_| self.truncated("group code"))? as i32
        } else {
            let byte = self
                .cursor
                .read_u8()
                .map_err(|_| self.truncated("group code"))?;
            if byte == 255 {
                self.cursor
                    .read_i16::<LittleEndian>()
                    .map_err(|_| self.truncated("group code"))? as i32
            } else {
                byte as i32
            }
        };
        Ok(Some(code))
    }

    fn read_cstring(&mut self) -> Result<String> {
        let data = *self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        let end = data[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|n| start + n)
            .ok_or_else(|| self.truncated("string"))?;
        self.cursor.set_position(end as u64 + 1);
        Ok(self.decoder.decode(&data[start..end]))
    }

    fn read_value(&mut self, code: i32) -> Result<TagValue> {
        let value = match GroupCodeValueType::from_code(code) {
            GroupCodeValueType::String => TagValue::String(self.read_cstring()?),
            GroupCodeValueType::Double => TagValue::Double(
                self.cursor
                    .read_f64::<LittleEndian>()
                    .map_err(|_| self.truncated("double"))?,
            ),
            GroupCodeValueType::Int16 => TagValue::Integer(
                self.cursor
                    .read_i16::<LittleEndian>()
                    .map_err(|_| self.truncated("int16"))? as i64,
            ),
            GroupCodeValueType::Int32 => TagValue::Integer(
                self.cursor
                    .read_i32::<LittleEndian>()
                    .map_err(|_| self.truncated("int32"))? as i64,
            ),
            GroupCodeValueType::Int64 => TagValue::Integer(
                self.cursor
                    .read_i64::<LittleEndian>()
                    .map_err(|_| self.truncated("int64"))?,
            ),
            GroupCodeValueType::Byte => TagValue::Integer(
                self.cursor
                    .read_u8()
                    .map_err(|_| self.truncated("byte"))? as i64,
            ),
            GroupCodeValueType::Binary => {
                let len = self
                    .cursor
                    .read_u8()
                    .map_err(|_| self.truncated("binary length"))?;
                let mut buf = vec![0u8; len as usize];
                self.cursor
                    .read_exact(&mut buf)
                    .map_err(|_| self.truncated("binary data"))?;
                TagValue::Binary(buf)
            }
        };
        Ok(value)
    }
}

impl DxfStreamReader for DxfBinaryReader<'_> {
    fn read_tag(&mut self) -> Result<Option<Tag>> {
        let code = match self.read_code()? {
            Some(code) => code,
            None => return Ok(None),
        };
        self.tag_count += 1;
        if !is_valid_code(code) {
            return Err(DxfError::parse(
                self.line_number(),
                format!("invalid group code {} at offset {}", code, self.offset()),
            ));
        }
        let value = self.read_value(code)?;
        Ok(Some(Tag { code, value }))
    }

    /// Binary input has no lines; report the line the tag would occupy in
    /// an ASCII file.
    fn line_number(&self) -> usize {
        self.tag_count * 2
    }

    fn set_encoding(&mut self, decoder: TextDecoder) {
        self.decoder = decoder;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(body: &[u8]) -> Vec<u8> {
        let mut data = BINARY_SENTINEL.to_vec();
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_two_byte_codes() {
        let mut body = vec![0, 0];
        body.extend_from_slice(b"SECTION\0");
        body.extend_from_slice(&[40, 0]);
        body.extend_from_slice(&2.5f64.to_le_bytes());
        body.extend_from_slice(&[70, 0, 5, 0]);
        let data = binary(&body);
        let mut reader = DxfBinaryReader::new(&data).unwrap();
        assert!(reader.uses_two_byte_codes());
        assert_eq!(reader.read_tag().unwrap(), Some(Tag::string(0, "SECTION")));
        assert_eq!(reader.read_tag().unwrap(), Some(Tag::double(40, 2.5)));
        assert_eq!(reader.read_tag().unwrap(), Some(Tag::int(70, 5)));
        assert_eq!(reader.read_tag().unwrap(), None);
    }

    #[test]
    fn test_one_byte_codes_with_escape() {
        let mut body = vec![0];
        body.extend_from_slice(b"SECTION\0");
        body.extend_from_slice(&[255, 0xE9, 0x03]);
        body.extend_from_slice(b"ACAD\0");
        let data = binary(&body);
        let mut reader = DxfBinaryReader::new(&data).unwrap();
        assert!(!reader.uses_two_byte_codes());
        assert_eq!(reader.read_tag().unwrap(), Some(Tag::string(0, "SECTION")));
        assert_eq!(reader.read_tag().unwrap(), Some(Tag::string(1001, "ACAD")));
    }

    #[test]
    fn test_binary_chunk_and_byte() {
        let mut body = vec![0, 0];
        body.extend_from_slice(b"X\0");
        body.extend_from_slice(&[0x36, 0x01, 2, 0xAB, 0xCD]);
        body.extend_from_slice(&[0x22, 0x01, 1]);
        let data = binary(&body);
        let mut reader = DxfBinaryReader::new(&data).unwrap();
        reader.read_tag().unwrap();
        assert_eq!(reader.read_tag().unwrap(), Some(Tag::binary(310, vec![0xAB, 0xCD])));
        assert_eq!(reader.read_tag().unwrap(), Some(Tag::int(290, 1)));
    }

    #[test]
    fn test_truncated_value() {
        let mut body = vec![0, 0];
        body.extend_from_slice(b"SECTION\0");
        body.extend_from_slice(&[40, 0, 1, 2]);
        let data = binary(&body);
        let mut reader = DxfBinaryReader::new(&data).unwrap();
        reader.read_tag().unwrap();
        let err = reader.read_tag().unwrap_err();
        assert!(matches!(err, DxfError::Parse { line: 4, .. }));
    }
}
