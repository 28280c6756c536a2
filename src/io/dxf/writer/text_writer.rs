//! ASCII DXF writer

use super::stream_writer::{format_double, DxfStreamWriter, TextEncoder};
use crate::error::Result;
use crate::io::dxf::reader::encode_caret;
use crate::types::Handle;
use std::io::Write;

/// ASCII DXF stream writer
pub struct DxfTextWriter<W: Write> {
    writer: W,
    encoder: TextEncoder,
}

impl<W: Write> DxfTextWriter<W> {
    /// Create a new ASCII DXF writer producing UTF-8
    pub fn new(writer: W) -> Self {
        Self::with_encoder(writer, TextEncoder::default())
    }

    pub fn with_encoder(writer: W, encoder: TextEncoder) -> Self {
        Self { writer, encoder }
    }

    /// Write a DXF code right-aligned in a 3-character field
    fn write_code(&mut self, code: i32) -> Result<()> {
        writeln!(self.writer, "{:>3}", code)?;
        Ok(())
    }

    fn write_value(&mut self, code: i32, value: impl std::fmt::Display) -> Result<()> {
        self.write_code(code)?;
        writeln!(self.writer, "{}", value)?;
        Ok(())
    }

    /// Get the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DxfStreamWriter for DxfTextWriter<W> {
    fn write_string(&mut self, code: i32, value: &str) -> Result<()> {
        self.write_code(code)?;
        let bytes = self.encoder.encode(&encode_caret(value));
        self.writer.write_all(&bytes)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_byte(&mut self, code: i32, value: u8) -> Result<()> {
        self.write_value(code, value)
    }

    fn write_i16(&mut self, code: i32, value: i16) -> Result<()> {
        self.write_value(code, value)
    }

    fn write_i32(&mut self, code: i32, value: i32) -> Result<()> {
        self.write_value(code, value)
    }

    fn write_i64(&mut self, code: i32, value: i64) -> Result<()> {
        self.write_value(code, value)
    }

    fn write_double(&mut self, code: i32, value: f64) -> Result<()> {
        self.write_value(code, format_double(value))
    }

    fn write_handle(&mut self, code: i32, handle: Handle) -> Result<()> {
        self.write_value(code, format_args!("{:X}", handle.value()))
    }

    fn write_binary(&mut self, code: i32, data: &[u8]) -> Result<()> {
        self.write_code(code)?;
        for byte in data {
            write!(self.writer, "{:02X}", byte)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
