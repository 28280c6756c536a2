//! Binary DXF writer

use super::stream_writer::{DxfStreamWriter, TextEncoder};
use crate::error::{DxfError, Result};
use crate::io::dxf::reader::BINARY_SENTINEL;
use crate::types::Handle;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// Binary DXF stream writer
///
/// R13+ output stores group codes as 16-bit little endian integers; R12
/// output uses one byte, with 255 announcing a following 16-bit code.
pub struct DxfBinaryWriter<W: Write> {
    writer: W,
    encoder: TextEncoder,
    two_byte_codes: bool,
}

impl<W: Write> DxfBinaryWriter<W> {
    /// Create a new R13+ binary DXF writer; writes the sentinel.
    pub fn new(writer: W) -> Result<Self> {
        Self::with_options(writer, TextEncoder::default(), true)
    }

    pub fn with_options(mut writer: W, encoder: TextEncoder, two_byte_codes: bool) -> Result<Self> {
        writer.write_all(BINARY_SENTINEL)?;
        Ok(Self {
            writer,
            encoder,
            two_byte_codes,
        })
    }

    fn write_code(&mut self, code: i32) -> Result<()> {
        if self.two_byte_codes {
            self.writer.write_i16::<LittleEndian>(code as i16)?;
        } else if code < 255 {
            self.writer.write_u8(code as u8)?;
        } else {
            self.writer.write_u8(255)?;
            self.writer.write_i16::<LittleEndian>(code as i16)?;
        }
        Ok(())
    }

    /// Write a null-terminated string
    fn write_null_string(&mut self, value: &str) -> Result<()> {
        let bytes = self.encoder.encode(value);
        self.writer.write_all(&bytes)?;
        self.writer.write_u8(0)?;
        Ok(())
    }

    /// Get the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DxfStreamWriter for DxfBinaryWriter<W> {
    fn write_string(&mut self, code: i32, value: &str) -> Result<()> {
        self.write_code(code)?;
        self.write_null_string(value)
    }

    fn write_byte(&mut self, code: i32, value: u8) -> Result<()> {
        self.write_code(code)?;
        self.writer.write_u8(value)?;
        Ok(())
    }

    fn write_i16(&mut self, code: i32, value: i16) -> Result<()> {
        self.write_code(code)?;
        self.writer.write_i16::<LittleEndian>(value)?;
        Ok(())
    }

    fn write_i32(&mut self, code: i32, value: i32) -> Result<()> {
        self.write_code(code)?;
        self.writer.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    fn write_i64(&mut self, code: i32, value: i64) -> Result<()> {
        self.write_code(code)?;
        self.writer.write_i64::<LittleEndian>(value)?;
        Ok(())
    }

    fn write_double(&mut self, code: i32, value: f64) -> Result<()> {
        self.write_code(code)?;
        self.writer.write_f64::<LittleEndian>(value)?;
        Ok(())
    }

    fn write_handle(&mut self, code: i32, handle: Handle) -> Result<()> {
        // handles are hex strings in binary DXF as well
        self.write_code(code)?;
        self.write_null_string(&handle.to_hex())
    }

    fn write_binary(&mut self, code: i32, data: &[u8]) -> Result<()> {
        let len = u8::try_from(data.len()).map_err(|_| DxfError::InvalidValue {
            name: format!("group code {}", code),
            message: format!("binary chunk of {} bytes exceeds 255", data.len()),
        })?;
        self.write_code(code)?;
        self.writer.write_u8(len)?;
        self.writer.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(buf: &[u8]) -> &[u8] {
        &buf[BINARY_SENTINEL.len()..]
    }

    #[test]
    fn test_binary_sentinel() {
        let mut buf = Vec::new();
        DxfBinaryWriter::new(&mut buf).unwrap();
        assert_eq!(buf, BINARY_SENTINEL.to_vec());
    }

    #[test]
    fn test_write_string() {
        let mut buf = Vec::new();
        {
            let mut writer = DxfBinaryWriter::new(&mut buf).unwrap();
            writer.write_string(0, "LINE").unwrap();
        }
        assert_eq!(body(&buf), b"\0\0LINE\0");
    }

    #[test]
    fn test_write_double() {
        let mut buf = Vec::new();
        {
            let mut writer = DxfBinaryWriter::new(&mut buf).unwrap();
            writer.write_double(10, 1.5).unwrap();
        }
        let mut expected = vec![10, 0];
        expected.extend_from_slice(&1.5f64.to_le_bytes());
        assert_eq!(body(&buf), expected.as_slice());
    }

    #[test]
    fn test_one_byte_codes() {
        let mut buf = Vec::new();
        {
            let mut writer =
                DxfBinaryWriter::with_options(&mut buf, TextEncoder::default(), false).unwrap();
            writer.write_i16(62, 7).unwrap();
            writer.write_string(1001, "ACAD").unwrap();
        }
        assert_eq!(body(&buf), b"\x3E\x07\x00\xFF\xE9\x03ACAD\0");
    }

    #[test]
    fn test_oversized_chunk_is_rejected() {
        let mut buf = Vec::new();
        let mut writer = DxfBinaryWriter::new(&mut buf).unwrap();
        assert!(writer.write_binary(310, &[0u8; 256]).is_err());
    }
}
