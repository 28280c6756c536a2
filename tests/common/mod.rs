//! Shared test utilities for dxfcore integration tests.
//!
//! DXF text builders, read helpers and entity counting, imported by the
//! test crates via `mod common;`.

#![allow(dead_code)]

use dxfcore::io::dxf::{DxfReader, DxfReaderConfiguration};
use dxfcore::{CadDocument, DxfWriter, Result, Vector3};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::PathBuf;

// ===========================================================================
// DXF text builder
// ===========================================================================

/// ASCII DXF text assembled tag by tag
#[derive(Debug, Default, Clone)]
pub struct DxfText {
    buf: String,
}

impl DxfText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, code: i32, value: impl Display) -> Self {
        self.buf.push_str(&format!("{:>3}\n{}\n", code, value));
        self
    }

    pub fn point(self, code: i32, p: Vector3) -> Self {
        self.tag(code, p.x).tag(code + 10, p.y).tag(code + 20, p.z)
    }

    pub fn section(self, name: &str) -> Self {
        self.tag(0, "SECTION").tag(2, name)
    }

    pub fn end_section(self) -> Self {
        self.tag(0, "ENDSEC")
    }

    /// HEADER section with `$ACADVER` only
    pub fn header(self, version: &str) -> Self {
        self.section("HEADER")
            .tag(9, "$ACADVER")
            .tag(1, version)
            .end_section()
    }

    /// R2000+ LINE owned by nothing in particular
    pub fn line(self, handle: u64, layer: &str) -> Self {
        self.tag(0, "LINE")
            .tag(5, format!("{:X}", handle))
            .tag(100, "AcDbEntity")
            .tag(8, layer)
            .tag(100, "AcDbLine")
            .point(10, Vector3::ZERO)
            .point(11, Vector3::new(1.0, 1.0, 0.0))
    }

    /// R2000+ INSERT of `block`
    pub fn insert(self, handle: u64, block: &str) -> Self {
        self.tag(0, "INSERT")
            .tag(5, format!("{:X}", handle))
            .tag(100, "AcDbEntity")
            .tag(8, "0")
            .tag(100, "AcDbBlockReference")
            .tag(2, block)
            .point(10, Vector3::ZERO)
    }

    pub fn eof(self) -> Self {
        self.tag(0, "EOF")
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_bytes()
    }
}

/// R2000 file with a HEADER and an ENTITIES section holding `count` LINEs
/// with handles from 0x100
pub fn lines_file(count: usize) -> DxfText {
    let mut text = DxfText::new().header("AC1015").section("ENTITIES");
    for i in 0..count {
        text = text.line(0x100 + i as u64, "0");
    }
    text.end_section().eof()
}

// ===========================================================================
// Read / write helpers
// ===========================================================================

pub fn read_strict(data: &[u8]) -> Result<CadDocument> {
    DxfReader::from_bytes(data.to_vec()).read()
}

pub fn read_failsafe(data: &[u8]) -> Result<CadDocument> {
    DxfReader::from_bytes(data.to_vec())
        .with_configuration(DxfReaderConfiguration {
            failsafe: true,
            ..Default::default()
        })
        .read()
}

/// Save as ASCII and read back in strict mode.
pub fn roundtrip(doc: &CadDocument) -> CadDocument {
    let bytes = DxfWriter::new(doc).write_to_vec().expect("write");
    read_strict(&bytes).expect("read back")
}

/// Save as binary and read back in strict mode.
pub fn roundtrip_binary(doc: &CadDocument) -> CadDocument {
    let bytes = DxfWriter::new_binary(doc).write_to_vec().expect("write");
    read_strict(&bytes).expect("read back")
}

/// Resolve path into the `test_output/` directory, creating it if needed.
pub fn test_output_path(filename: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_output");
    std::fs::create_dir_all(&dir).ok();
    dir.join(filename)
}

// ===========================================================================
// Entity counting
// ===========================================================================

/// Live entities of a section by DXF type
pub fn count_by_type(doc: &CadDocument, section: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for entity in doc.iterate_section(section).expect("section") {
        *counts.entry(entity.dxftype().to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn modelspace_count(doc: &CadDocument) -> usize {
    doc.modelspace().entities.live_count(doc.db())
}
