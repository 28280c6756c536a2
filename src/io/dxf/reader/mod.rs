//! DXF file reader
//!
//! Loading runs through fixed stages: the bytes are decoded into tags,
//! the tags are partitioned into sections, sections are assembled into
//! entities, references are resolved and the document becomes ready.
//! Only decoding errors are always fatal; structure and reference
//! problems found later pass the [`Auditor`], which either raises them
//! (strict mode) or records them as notifications (failsafe mode).

mod binary_reader;
mod document_builder;
mod section_reader;
mod stream_reader;
mod tag_compiler;
mod text_reader;

pub use binary_reader::{DxfBinaryReader, BINARY_SENTINEL};
pub use stream_reader::{decode_caret, encode_caret, DxfStreamReader, TextDecoder};
pub use tag_compiler::TagCompiler;
pub use text_reader::DxfTextReader;

use super::code_page::encoding_from_code_page;
use super::DxfFormat;
use crate::document::CadDocument;
use crate::error::{DxfError, Result};
use crate::notification::{NotificationCollection, NotificationType};
use crate::tags::group_code::{STRUCTURE_MARKER, VARIABLE_NAME};
use crate::tags::Tag;
use crate::types::{DxfVersion, Handle};
use document_builder::DocumentBuilder;
use encoding_rs::Encoding;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration for the DXF reader.
#[derive(Debug, Clone, Default)]
pub struct DxfReaderConfiguration {
    /// When `true`, structure and reference errors are recorded as
    /// notifications instead of aborting the read.
    ///
    /// Default: `false` (strict mode, errors propagate).
    pub failsafe: bool,
    /// Keep 999 comment tags in the raw tag stream. They never reach
    /// entity assembly.
    pub keep_comments: bool,
}

/// Progress of a load
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadStage {
    Raw,
    TagsDecoded,
    SectionsPartitioned,
    EntitiesAssembled,
    HandlesResolved,
    Ready,
}

/// Gate for structural findings during a load
#[derive(Debug)]
pub struct Auditor {
    failsafe: bool,
    findings: NotificationCollection,
}

impl Auditor {
    pub fn new(failsafe: bool) -> Self {
        Self {
            failsafe,
            findings: NotificationCollection::new(),
        }
    }

    /// Raise `err` in strict mode, record it in failsafe mode.
    ///
    /// Errors other than structure and reference errors are always raised.
    pub fn report(&mut self, err: DxfError, handle: Option<Handle>) -> Result<()> {
        if !self.failsafe || !err.is_recoverable() {
            return Err(err);
        }
        match handle {
            Some(handle) => warn!(handle = %handle, "{}", err),
            None => warn!("{}", err),
        }
        self.findings.record(&err, handle);
        Ok(())
    }

    /// Record something that is kept but not interpreted; never raised.
    pub fn note(&mut self, message: impl Into<String>) {
        self.findings
            .notify(NotificationType::NotImplemented, message);
    }

    pub fn findings(&self) -> &NotificationCollection {
        &self.findings
    }

    pub fn into_findings(self) -> NotificationCollection {
        self.findings
    }
}

/// Output of the tag decoding stage
#[derive(Debug, Clone)]
pub struct DecodedTags {
    pub tags: Vec<Tag>,
    pub version: DxfVersion,
    pub encoding: &'static Encoding,
    pub format: DxfFormat,
}

const DWG_MAGIC: &[&[u8]] = &[b"AC10", b"AC1.", b"AC2."];
const UTF16_BOMS: &[&[u8]] = &[&[0xFF, 0xFE], &[0xFE, 0xFF]];
const BINARY_SIGNATURE: &[u8] = b"AutoCAD Binary DXF";

/// Tell ASCII from binary DXF by the sentinel.
///
/// Input that looks like a DWG file, UTF-16 text or a damaged binary
/// sentinel is an encoding error.
pub fn detect_format(data: &[u8]) -> Result<DxfFormat> {
    if data.starts_with(BINARY_SENTINEL) {
        return Ok(DxfFormat::Binary);
    }
    if data.starts_with(BINARY_SIGNATURE) || (!data.is_empty() && BINARY_SENTINEL.starts_with(data)) {
        return Err(DxfError::Encoding("damaged binary DXF sentinel".to_string()));
    }
    if DWG_MAGIC.iter().any(|magic| data.starts_with(magic)) {
        return Err(DxfError::Encoding("input is a DWG file".to_string()));
    }
    if UTF16_BOMS.iter().any(|bom| data.starts_with(bom)) {
        return Err(DxfError::Encoding("UTF-16 input is not supported".to_string()));
    }
    Ok(DxfFormat::Ascii)
}

fn stream_reader(data: &[u8], format: DxfFormat) -> Result<Box<dyn DxfStreamReader + '_>> {
    Ok(match format {
        DxfFormat::Binary => Box::new(DxfBinaryReader::new(data)?),
        DxfFormat::Ascii => Box::new(DxfTextReader::new(data)),
    })
}

/// `$ACADVER` and `$DWGCODEPAGE` from the HEADER section, if any.
fn prescan(reader: &mut dyn DxfStreamReader) -> Result<(Option<String>, Option<String>)> {
    let mut version = None;
    let mut code_page = None;
    let mut in_header = false;
    let mut variable = String::new();
    let mut section_start = false;

    while let Some(tag) = reader.read_tag()? {
        if section_start {
            section_start = false;
            if tag.code == 2 && tag.as_str() == Some("HEADER") {
                in_header = true;
                continue;
            }
            break;
        }
        if tag.code == STRUCTURE_MARKER {
            match tag.as_str() {
                Some("SECTION") if !in_header => section_start = true,
                Some("ENDSEC") | Some("EOF") => break,
                _ => {}
            }
            continue;
        }
        if !in_header {
            continue;
        }
        match tag.code {
            VARIABLE_NAME => variable = tag.as_str().unwrap_or_default().to_string(),
            1 if variable == "$ACADVER" => version = tag.as_str().map(str::to_string),
            3 if variable == "$DWGCODEPAGE" => code_page = tag.as_str().map(str::to_string),
            _ => {}
        }
        if version.is_some() && code_page.is_some() {
            break;
        }
    }
    Ok((version, code_page))
}

/// Decode a whole DXF file into compiled tags.
///
/// Files without `$ACADVER` are read as R12. The code page only applies
/// to files older than R2007, which also get `\U+XXXX` escapes expanded.
pub fn decode_tags(data: &[u8], config: &DxfReaderConfiguration) -> Result<DecodedTags> {
    let format = detect_format(data)?;
    let (version, code_page) = prescan(stream_reader(data, format)?.as_mut())?;
    let version = version
        .map(|v| DxfVersion::from_version_string(&v))
        .unwrap_or(DxfVersion::AC1009);
    let encoding = if version.uses_utf8() {
        encoding_rs::UTF_8
    } else {
        code_page
            .as_deref()
            .map(encoding_from_code_page)
            .unwrap_or(encoding_rs::WINDOWS_1252)
    };

    let mut reader = stream_reader(data, format)?;
    reader.set_encoding(TextDecoder::new(encoding, !version.uses_utf8()));
    let tags = TagCompiler::new(reader.as_mut(), config.keep_comments).compile_all()?;
    debug!(
        format = ?format,
        version = version.as_str(),
        encoding = encoding.name(),
        tags = tags.len(),
        "decoded tags"
    );
    Ok(DecodedTags {
        tags,
        version,
        encoding,
        format,
    })
}

/// DXF file reader
pub struct DxfReader {
    data: Vec<u8>,
    configuration: DxfReaderConfiguration,
    stage: LoadStage,
    filename: Option<PathBuf>,
}

impl DxfReader {
    /// Create a new DXF reader from any reader
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::from_bytes(data))
    }

    /// Create a new DXF reader from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        let mut reader = Self::from_bytes(data);
        reader.filename = Some(path.as_ref().to_path_buf());
        Ok(reader)
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            configuration: DxfReaderConfiguration::default(),
            stage: LoadStage::Raw,
            filename: None,
        }
    }

    /// Set the reader configuration.
    pub fn with_configuration(mut self, configuration: DxfReaderConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Stage reached by the last [`read`](Self::read)
    pub fn stage(&self) -> LoadStage {
        self.stage
    }

    /// Decoded tags without any assembly, for recovery tools
    pub fn read_tags(&self) -> Result<Vec<Tag>> {
        decode_tags(&self.data, &self.configuration).map(|decoded| decoded.tags)
    }

    fn advance(&mut self, stage: LoadStage) {
        debug!(from = ?self.stage, to = ?stage, "load stage");
        self.stage = stage;
    }

    /// Read the DXF data and return a CadDocument
    pub fn read(&mut self) -> Result<CadDocument> {
        self.stage = LoadStage::Raw;
        let decoded = decode_tags(&self.data, &self.configuration)?;
        self.advance(LoadStage::TagsDecoded);

        let mut auditor = Auditor::new(self.configuration.failsafe);
        let sections = section_reader::partition(decoded.tags, &mut auditor)?;
        self.advance(LoadStage::SectionsPartitioned);

        let mut builder = DocumentBuilder::new(decoded.version, &mut auditor);
        builder.assemble(sections)?;
        self.advance(LoadStage::EntitiesAssembled);

        let mut document = builder.resolve()?;
        self.advance(LoadStage::HandlesResolved);

        if !decoded.version.uses_utf8() {
            document.encoding = decoded.encoding;
        }
        document.filename = self.filename.clone();
        document.rebuild_block_index();
        document.notifications = auditor.into_findings();
        self.advance(LoadStage::Ready);
        Ok(document)
    }
}

/// Read a DXF file in strict mode.
pub fn read_dxf<P: AsRef<Path>>(path: P) -> Result<CadDocument> {
    DxfReader::from_file(path)?.read()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"  0\nSECTION\n").unwrap(), DxfFormat::Ascii);
        let mut binary = BINARY_SENTINEL.to_vec();
        binary.extend_from_slice(&[0, 0]);
        assert_eq!(detect_format(&binary).unwrap(), DxfFormat::Binary);
        assert!(matches!(
            detect_format(b"AutoCAD Binary DXF\n"),
            Err(DxfError::Encoding(_))
        ));
        assert!(matches!(detect_format(b"AC1015\0\0\0"), Err(DxfError::Encoding(_))));
        assert!(matches!(detect_format(&[0xFF, 0xFE, 0x30, 0]), Err(DxfError::Encoding(_))));
    }

    #[test]
    fn test_prescan_reads_version_and_code_page() {
        let data = "  0\nSECTION\n  2\nHEADER\n  9\n$ACADVER\n  1\nAC1015\n  9\n$DWGCODEPAGE\n  3\nANSI_1251\n  0\nENDSEC\n  0\nEOF\n";
        let decoded = decode_tags(data.as_bytes(), &DxfReaderConfiguration::default()).unwrap();
        assert_eq!(decoded.version, DxfVersion::AC1015);
        assert_eq!(decoded.encoding, encoding_rs::WINDOWS_1251);
        assert_eq!(decoded.tags.len(), 8);
    }

    #[test]
    fn test_missing_header_reads_as_r12() {
        let data = "  0\nSECTION\n  2\nENTITIES\n  0\nENDSEC\n  0\nEOF\n";
        let decoded = decode_tags(data.as_bytes(), &DxfReaderConfiguration::default()).unwrap();
        assert_eq!(decoded.version, DxfVersion::AC1009);
    }

    #[test]
    fn test_comments_kept_on_request() {
        let data = "999\nmade by hand\n  0\nEOF\n";
        let config = DxfReaderConfiguration {
            keep_comments: true,
            ..Default::default()
        };
        assert_eq!(decode_tags(data.as_bytes(), &config).unwrap().tags.len(), 2);
        let default = DxfReaderConfiguration::default();
        assert_eq!(decode_tags(data.as_bytes(), &default).unwrap().tags.len(), 1);
    }

    #[test]
    fn test_auditor_gate() {
        let mut strict = Auditor::new(false);
        assert!(strict
            .report(DxfError::Structure("bad".into()), None)
            .is_err());

        let mut tolerant = Auditor::new(true);
        tolerant
            .report(DxfError::Reference("dangling".into()), Some(Handle::new(0x1F)))
            .unwrap();
        assert!(tolerant
            .report(DxfError::KeyNotFound("x".into()), None)
            .is_err());
        assert_eq!(tolerant.findings().len(), 1);
    }
}
