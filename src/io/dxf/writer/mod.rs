//! DXF writer module

mod binary_writer;
mod section_writer;
mod stream_writer;
mod text_writer;

pub use binary_writer::DxfBinaryWriter;
pub use section_writer::SectionWriter;
pub use stream_writer::{format_double, DxfStreamWriter, DxfStreamWriterExt, TextEncoder};
pub use text_writer::DxfTextWriter;

use super::DxfFormat;
use crate::document::CadDocument;
use crate::error::Result;
use crate::tags::Tag;
use crate::types::DxfVersion;
use encoding_rs::Encoding;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// DXF file writer
///
/// Output revision and text encoding come from the document.
pub struct DxfWriter<'a> {
    document: &'a CadDocument,
    /// Whether to write binary DXF format
    pub binary: bool,
}

impl<'a> DxfWriter<'a> {
    /// Create a new DXF writer for ASCII output
    pub fn new(document: &'a CadDocument) -> Self {
        Self {
            document,
            binary: false,
        }
    }

    /// Create a new DXF writer for binary output
    pub fn new_binary(document: &'a CadDocument) -> Self {
        Self {
            document,
            binary: true,
        }
    }

    /// Set whether to write binary format
    pub fn set_binary(&mut self, binary: bool) {
        self.binary = binary;
    }

    /// Write to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        self.write_to_writer(writer)
    }

    /// Write to any writer
    pub fn write_to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let version = self.document.version;
        let encoder = TextEncoder::for_version(version, self.document.encoding);
        debug!(version = %version, binary = self.binary, "writing document");
        if self.binary {
            let mut stream_writer =
                DxfBinaryWriter::with_options(writer, encoder, !version.is_legacy())?;
            SectionWriter::new(&mut stream_writer, version).write_document(self.document)?;
            stream_writer.flush()
        } else {
            let mut stream_writer = DxfTextWriter::with_encoder(writer, encoder);
            SectionWriter::new(&mut stream_writer, version).write_document(self.document)?;
            stream_writer.flush()
        }
    }

    /// Write to a byte vector (useful for testing)
    pub fn write_to_vec(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_to_writer(&mut buffer)?;
        Ok(buffer)
    }

    /// Get a reference to the document
    pub fn document(&self) -> &CadDocument {
        self.document
    }
}

/// Convenience function to write a document to a file
pub fn write_dxf<P: AsRef<Path>>(document: &CadDocument, path: P) -> Result<()> {
    DxfWriter::new(document).write_to_file(path)
}

/// Convenience function to write a document to a binary DXF file
pub fn write_binary_dxf<P: AsRef<Path>>(document: &CadDocument, path: P) -> Result<()> {
    DxfWriter::new_binary(document).write_to_file(path)
}

/// Output settings of [`encode_tags`]
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    pub format: DxfFormat,
    /// Selects UTF-8 or the code page, and R12 binary group codes
    pub version: DxfVersion,
    /// Code page for pre-R2007 output
    pub encoding: &'static Encoding,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: DxfFormat::Ascii,
            version: DxfVersion::AC1032,
            encoding: encoding_rs::WINDOWS_1252,
        }
    }
}

/// Encode a raw tag stream, the inverse of
/// [`decode_tags`](crate::io::dxf::decode_tags).
pub fn encode_tags(tags: &[Tag], options: &EncodeOptions) -> Result<Vec<u8>> {
    let encoder = TextEncoder::for_version(options.version, options.encoding);
    let mut buffer = Vec::new();
    match options.format {
        DxfFormat::Ascii => {
            let mut writer = DxfTextWriter::with_encoder(&mut buffer, encoder);
            writer.write_tags(tags)?;
            writer.flush()?;
        }
        DxfFormat::Binary => {
            let mut writer = DxfBinaryWriter::with_options(
                &mut buffer,
                encoder,
                !options.version.is_legacy(),
            )?;
            writer.write_tags(tags)?;
            writer.flush()?;
        }
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::dxf::{decode_tags, DxfReaderConfiguration};
    use crate::types::Vector3;

    fn sample() -> Vec<Tag> {
        vec![
            Tag::string(0, "SECTION"),
            Tag::string(2, "HEADER"),
            Tag::string(9, "$ACADVER"),
            Tag::string(1, "AC1009"),
            Tag::string(0, "ENDSEC"),
            Tag::string(0, "SECTION"),
            Tag::string(2, "ENTITIES"),
            Tag::string(0, "TEXT"),
            Tag::string(8, "0"),
            Tag::point3(10, Vector3::new(1.0, 2.0, 0.0)),
            Tag::double(40, 2.5),
            Tag::string(1, "Ω one^two"),
            Tag::string(0, "ENDSEC"),
            Tag::string(0, "EOF"),
        ]
    }

    #[test]
    fn test_encode_decode_ascii_r12() {
        let options = EncodeOptions {
            version: DxfVersion::AC1009,
            ..EncodeOptions::default()
        };
        let data = encode_tags(&sample(), &options).unwrap();
        // Ω is not in Windows-1252
        assert!(String::from_utf8_lossy(&data).contains("\\U+03A9"));
        let decoded = decode_tags(&data, &DxfReaderConfiguration::default()).unwrap();
        assert_eq!(decoded.tags, sample());
        assert_eq!(decoded.format, DxfFormat::Ascii);
    }

    #[test]
    fn test_encode_decode_binary_r12() {
        let options = EncodeOptions {
            format: DxfFormat::Binary,
            version: DxfVersion::AC1009,
            ..EncodeOptions::default()
        };
        let data = encode_tags(&sample(), &options).unwrap();
        let decoded = decode_tags(&data, &DxfReaderConfiguration::default()).unwrap();
        assert_eq!(decoded.format, DxfFormat::Binary);
        assert_eq!(decoded.tags, sample());
    }

    #[test]
    fn test_write_new_document() {
        let document = CadDocument::new();
        let text = DxfWriter::new(&document).write_to_vec().unwrap();
        let binary = DxfWriter::new_binary(&document).write_to_vec().unwrap();
        assert!(text.starts_with(b"  0\nSECTION\n"));
        assert!(binary.starts_with(crate::io::dxf::reader::BINARY_SENTINEL));
    }
}
