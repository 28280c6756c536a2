//! DXF stream writer trait and common types

use crate::error::{DxfError, Result};
use crate::io::dxf::unicode::encode_unicode_escapes;
use crate::tags::{GroupCodeValueType, Tag, TagValue};
use crate::types::{DxfVersion, Handle, Vector2, Vector3};
use encoding_rs::Encoding;

/// Trait for writing DXF code/value pairs
pub trait DxfStreamWriter {
    /// Write a code/value pair with a string value
    fn write_string(&mut self, code: i32, value: &str) -> Result<()>;

    /// Write a code/value pair with a byte value (codes 290-299)
    fn write_byte(&mut self, code: i32, value: u8) -> Result<()>;

    /// Write a code/value pair with an i16 value
    fn write_i16(&mut self, code: i32, value: i16) -> Result<()>;

    /// Write a code/value pair with an i32 value
    fn write_i32(&mut self, code: i32, value: i32) -> Result<()>;

    /// Write a code/value pair with an i64 value
    fn write_i64(&mut self, code: i32, value: i64) -> Result<()>;

    /// Write a code/value pair with a double value
    fn write_double(&mut self, code: i32, value: f64) -> Result<()>;

    /// Write a code/value pair with a handle value
    fn write_handle(&mut self, code: i32, handle: Handle) -> Result<()>;

    /// Write binary data
    fn write_binary(&mut self, code: i32, data: &[u8]) -> Result<()>;

    /// Flush the writer
    fn flush(&mut self) -> Result<()>;
}

/// Extension trait for convenient writing operations
pub trait DxfStreamWriterExt: DxfStreamWriter {
    /// Write a 2D point (codes 10/20 or similar)
    fn write_point2d(&mut self, x_code: i32, point: Vector2) -> Result<()> {
        self.write_double(x_code, point.x)?;
        self.write_double(x_code + 10, point.y)?;
        Ok(())
    }

    /// Write a 3D point (codes 10/20/30 or similar)
    fn write_point3d(&mut self, x_code: i32, point: Vector3) -> Result<()> {
        self.write_double(x_code, point.x)?;
        self.write_double(x_code + 10, point.y)?;
        self.write_double(x_code + 20, point.z)?;
        Ok(())
    }

    /// Write one tag in the storage type of its group code.
    ///
    /// Point tags are split into one tag per axis. Numbers stored as
    /// strings are parsed; a value that does not fit its group code is an
    /// `InvalidValue` error.
    fn write_tag(&mut self, tag: &Tag) -> Result<()> {
        let code = tag.code;
        let value_type = GroupCodeValueType::from_code(code);
        match &tag.value {
            TagValue::Point3(p) => self.write_point3d(code, *p),
            TagValue::Point2(p) => self.write_point2d(code, *p),
            TagValue::Binary(data) if value_type == GroupCodeValueType::Binary => {
                self.write_binary(code, data)
            }
            TagValue::Binary(_) => Err(mismatch(tag)),
            TagValue::String(s) => match value_type {
                GroupCodeValueType::String => self.write_string(code, s),
                GroupCodeValueType::Double => {
                    let value = s.trim().parse::<f64>().map_err(|_| mismatch(tag))?;
                    self.write_double(code, value)
                }
                GroupCodeValueType::Binary => Err(mismatch(tag)),
                _ => {
                    let value = s.trim().parse::<i64>().map_err(|_| mismatch(tag))?;
                    self.write_integer(code, value_type, value)
                }
            },
            TagValue::Integer(i) => match value_type {
                GroupCodeValueType::String => self.write_string(code, &i.to_string()),
                GroupCodeValueType::Double => self.write_double(code, *i as f64),
                GroupCodeValueType::Binary => Err(mismatch(tag)),
                _ => self.write_integer(code, value_type, *i),
            },
            TagValue::Double(d) => match value_type {
                GroupCodeValueType::Double => self.write_double(code, *d),
                GroupCodeValueType::String => self.write_string(code, &format_double(*d)),
                GroupCodeValueType::Binary => Err(mismatch(tag)),
                _ => self.write_integer(code, value_type, d.round() as i64),
            },
        }
    }

    /// Write an integer in the width of its group code; values outside
    /// that width are an `InvalidValue` error.
    fn write_integer(&mut self, code: i32, value_type: GroupCodeValueType, value: i64) -> Result<()> {
        let out_of_range = |width: &str| DxfError::InvalidValue {
            name: format!("group code {}", code),
            message: format!("{} does not fit into {}", value, width),
        };
        match value_type {
            GroupCodeValueType::Int16 => {
                let value = i16::try_from(value).map_err(|_| out_of_range("16 bits"))?;
                self.write_i16(code, value)
            }
            GroupCodeValueType::Int32 => {
                let value = i32::try_from(value).map_err(|_| out_of_range("32 bits"))?;
                self.write_i32(code, value)
            }
            GroupCodeValueType::Byte => {
                let value = u8::try_from(value).map_err(|_| out_of_range("a byte"))?;
                self.write_byte(code, value)
            }
            _ => self.write_i64(code, value),
        }
    }

    fn write_tags<'t>(&mut self, tags: impl IntoIterator<Item = &'t Tag>) -> Result<()> {
        for tag in tags {
            self.write_tag(tag)?;
        }
        Ok(())
    }

    /// Write section start
    fn write_section_start(&mut self, section_name: &str) -> Result<()> {
        self.write_string(0, "SECTION")?;
        self.write_string(2, section_name)?;
        Ok(())
    }

    /// Write section end
    fn write_section_end(&mut self) -> Result<()> {
        self.write_string(0, "ENDSEC")
    }

    /// Write end of file
    fn write_eof(&mut self) -> Result<()> {
        self.write_string(0, "EOF")
    }
}

// Auto-implement the extension trait for all stream writers
impl<T: DxfStreamWriter + ?Sized> DxfStreamWriterExt for T {}

fn mismatch(tag: &Tag) -> DxfError {
    DxfError::InvalidValue {
        name: format!("group code {}", tag.code),
        message: format!("{} value does not fit", tag.value.kind_name()),
    }
}

/// Shortest text that parses back to the same double, always with a
/// decimal point. Very large and very small magnitudes use the
/// `1.5E+300` exponent form.
pub fn format_double(value: f64) -> String {
    let text = format!("{:?}", value);
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text;
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.to_string()
    } else {
        format!("{}.0", mantissa)
    };
    match exponent.strip_prefix('-') {
        Some(exponent) => format!("{}E-{}", mantissa, exponent),
        None => format!("{}E+{}", mantissa, exponent),
    }
}

/// String encoding for tag values, the inverse of the reader's
/// `TextDecoder`
#[derive(Debug, Clone, Copy)]
pub struct TextEncoder {
    pub encoding: &'static Encoding,
    pub unicode_escapes: bool,
}

impl TextEncoder {
    pub fn new(encoding: &'static Encoding, unicode_escapes: bool) -> Self {
        Self {
            encoding,
            unicode_escapes,
        }
    }

    /// R2007+ output is always UTF-8; older revisions use `encoding` and
    /// escape what it cannot represent.
    pub fn for_version(version: DxfVersion, encoding: &'static Encoding) -> Self {
        if version.uses_utf8() {
            Self::new(encoding_rs::UTF_8, false)
        } else {
            Self::new(encoding, true)
        }
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        let text = if self.unicode_escapes {
            encode_unicode_escapes(text, self.encoding)
        } else {
            std::borrow::Cow::Borrowed(text)
        };
        if self.encoding == encoding_rs::UTF_8 {
            return text.as_bytes().to_vec();
        }
        let (bytes, _, _) = self.encoding.encode(&text);
        bytes.into_owned()
    }
}

impl Default for TextEncoder {
    fn default() -> Self {
        Self::new(encoding_rs::UTF_8, false)
    }
}
