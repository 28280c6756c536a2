//! Integration tests for DXF reading

mod common;

use common::{lines_file, modelspace_count, read_failsafe, read_strict, DxfText};
use dxfcore::io::dxf::{DxfReader, DxfReaderConfiguration, LoadStage};
use dxfcore::{DxfError, DxfVersion, DxfWriter, Handle, NotificationType, TableKind, Vector3};
use std::io::Write;

/// Test that DxfReader can be created from a non-existent file (should error)
#[test]
fn test_dxf_reader_from_nonexistent_file() {
    let result = DxfReader::from_file("nonexistent.dxf");
    assert!(matches!(result, Err(DxfError::Io(_))));
}

#[test]
fn test_read_minimal_dxf() {
    let doc = read_strict(&lines_file(3).into_bytes()).unwrap();

    assert_eq!(doc.version, DxfVersion::AC1015);
    assert_eq!(modelspace_count(&doc), 3);
    assert!(doc.notifications.is_empty());
    // missing structure is synthesized
    assert!(doc.by_name(TableKind::Layer, "0").is_ok());
    assert!(doc.by_name(TableKind::LineType, "Continuous").is_ok());
    assert!(doc.layout("Model").is_ok());
    assert!(doc.active_layout().is_some());

    let line = doc.resolve(Handle::new(0x101)).unwrap();
    assert_eq!(line.dxftype(), "LINE");
    assert_eq!(line.get_point("end"), Some(Vector3::new(1.0, 1.0, 0.0)));
}

#[test]
fn test_read_from_file() {
    let path = common::test_output_path("reading_from_file.dxf");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(lines_file(2).as_str().as_bytes()).unwrap();
    drop(file);

    let doc = dxfcore::io::dxf::read_dxf(&path).unwrap();
    assert_eq!(modelspace_count(&doc), 2);
    assert_eq!(doc.filename.as_deref(), Some(path.as_path()));
}

#[test]
fn test_load_stages() {
    let mut reader = DxfReader::from_bytes(lines_file(1).into_bytes());
    assert_eq!(reader.stage(), LoadStage::Raw);
    reader.read().unwrap();
    assert_eq!(reader.stage(), LoadStage::Ready);

    let mut broken = DxfReader::from_bytes(b"  0\nSECTION\n  x\nHEADER\n".to_vec());
    assert!(matches!(broken.read(), Err(DxfError::Parse { .. })));
    assert_eq!(broken.stage(), LoadStage::Raw);
}

/// 1000 entities, one of them without its mandatory subclass
fn file_with_one_invalid_line() -> Vec<u8> {
    let mut text = DxfText::new().header("AC1015").section("ENTITIES");
    for i in 0..1000u64 {
        if i == 500 {
            text = text
                .tag(0, "LINE")
                .tag(5, format!("{:X}", 0x100 + i))
                .tag(100, "AcDbEntity")
                .tag(8, "0")
                .point(10, Vector3::ZERO)
                .point(11, Vector3::new(1.0, 0.0, 0.0));
        } else {
            text = text.line(0x100 + i, "0");
        }
    }
    text.end_section().eof().into_bytes()
}

#[test]
fn test_one_invalid_entity_tolerant() {
    let doc = read_failsafe(&file_with_one_invalid_line()).unwrap();

    assert_eq!(modelspace_count(&doc), 999);
    assert_eq!(doc.notifications.len(), 1);
    let finding = doc.notifications.iter().next().unwrap();
    assert_eq!(finding.notification_type, NotificationType::Structure);
    assert_eq!(finding.handle, Some(Handle::new(0x100 + 500)));
    assert!(doc.resolve(Handle::new(0x100 + 500)).is_err());
}

#[test]
fn test_one_invalid_entity_strict() {
    let result = read_strict(&file_with_one_invalid_line());
    assert!(matches!(result, Err(DxfError::Structure(_))));
}

fn file_with_duplicate_xdata() -> Vec<u8> {
    DxfText::new()
        .header("AC1015")
        .section("ENTITIES")
        .line(0x100, "0")
        .tag(1001, "ACAD")
        .tag(1000, "first")
        .tag(1001, "ACAD")
        .tag(1000, "second")
        .line(0x101, "0")
        .end_section()
        .eof()
        .into_bytes()
}

#[test]
fn test_duplicate_xdata_appid() {
    assert!(matches!(
        read_strict(&file_with_duplicate_xdata()),
        Err(DxfError::Structure(_))
    ));

    let doc = read_failsafe(&file_with_duplicate_xdata()).unwrap();
    assert_eq!(modelspace_count(&doc), 1);
    assert!(doc.notifications.has_type(NotificationType::Structure));
}

#[test]
fn test_dangling_owner_is_reference_error() {
    let data = DxfText::new()
        .header("AC1015")
        .section("ENTITIES")
        .tag(0, "LINE")
        .tag(5, "100")
        .tag(330, "FFFF")
        .tag(100, "AcDbEntity")
        .tag(8, "0")
        .tag(100, "AcDbLine")
        .point(10, Vector3::ZERO)
        .point(11, Vector3::new(1.0, 0.0, 0.0))
        .end_section()
        .eof()
        .into_bytes();

    assert!(matches!(read_strict(&data), Err(DxfError::Reference(_))));
    let doc = read_failsafe(&data).unwrap();
    assert_eq!(modelspace_count(&doc), 1);
    assert!(doc.notifications.has_type(NotificationType::Reference));
}

#[test]
fn test_unrecognized_tag_survives_roundtrip() {
    let data = DxfText::new()
        .header("AC1015")
        .section("ENTITIES")
        .line(0x100, "0")
        .tag(1, "extra")
        .end_section()
        .eof()
        .into_bytes();
    let doc = read_strict(&data).unwrap();
    let original = doc.resolve(Handle::new(0x100)).unwrap().export_tags(doc.version);
    assert_eq!(original.last().and_then(|t| t.as_str()), Some("extra"));

    let reloaded = common::roundtrip(&doc);
    let line = reloaded.resolve(Handle::new(0x100)).unwrap();
    assert_eq!(line.export_tags(reloaded.version), original);
}

#[test]
fn test_unknown_entity_and_section_are_kept() {
    let data = DxfText::new()
        .header("AC1015")
        .section("ENTITIES")
        .tag(0, "ACME_WIDGET")
        .tag(5, "100")
        .tag(100, "AcDbEntity")
        .tag(8, "0")
        .tag(100, "AcmeWidget")
        .tag(90, 42)
        .end_section()
        .section("ACMEDATA")
        .tag(90, 7)
        .end_section()
        .eof()
        .into_bytes();
    let doc = read_failsafe(&data).unwrap();

    let widget = doc.resolve(Handle::new(0x100)).unwrap();
    assert_eq!(widget.dxftype(), "ACME_WIDGET");
    assert_eq!(doc.unknown_sections.len(), 1);
    assert!(doc.notifications.has_type(NotificationType::NotImplemented));

    let reloaded = common::roundtrip(&doc);
    assert_eq!(reloaded.unknown_sections[0].name, "ACMEDATA");
    assert_eq!(
        reloaded.resolve(Handle::new(0x100)).unwrap().raw_tags(Some("AcmeWidget")).count(),
        1
    );
}

#[test]
fn test_read_r12_file() {
    let data = DxfText::new()
        .header("AC1009")
        .section("ENTITIES")
        .tag(0, "LINE")
        .tag(8, "WALLS")
        .point(10, Vector3::ZERO)
        .point(11, Vector3::new(5.0, 0.0, 0.0))
        .tag(0, "CIRCLE")
        .tag(8, "0")
        .point(10, Vector3::ZERO)
        .tag(40, 2.5)
        .end_section()
        .eof()
        .into_bytes();
    let doc = read_strict(&data).unwrap();

    assert!(doc.version.is_legacy());
    assert_eq!(modelspace_count(&doc), 2);
    // entities without handles get one from the registry
    for entity in doc.iterate_section("ENTITIES").unwrap() {
        assert!(entity.handle().is_some());
    }
}

#[test]
fn test_file_without_version_is_r12() {
    let data = DxfText::new()
        .section("ENTITIES")
        .tag(0, "POINT")
        .tag(8, "0")
        .point(10, Vector3::ZERO)
        .end_section()
        .eof()
        .into_bytes();
    let doc = read_strict(&data).unwrap();
    assert_eq!(doc.version, DxfVersion::AC1009);
}

#[test]
fn test_dwg_and_utf16_input_rejected() {
    assert!(matches!(
        read_strict(b"AC1032\0\0\0\0\0"),
        Err(DxfError::Encoding(_))
    ));
    assert!(matches!(
        read_strict(&[0xFF, 0xFE, b' ', 0]),
        Err(DxfError::Encoding(_))
    ));
}

#[test]
fn test_binary_and_ascii_read_the_same() {
    let doc = read_strict(&lines_file(5).into_bytes()).unwrap();
    let binary = DxfWriter::new_binary(&doc).write_to_vec().unwrap();
    let from_binary = read_strict(&binary).unwrap();

    assert_eq!(modelspace_count(&from_binary), 5);
    for i in 0..5u64 {
        let handle = Handle::new(0x100 + i);
        assert_eq!(
            doc.resolve(handle).unwrap().export_tags(doc.version),
            from_binary.resolve(handle).unwrap().export_tags(doc.version)
        );
    }
}

#[test]
fn test_code_page_text_is_decoded() {
    let mut data = b"  0\nSECTION\n  2\nHEADER\n  9\n$ACADVER\n  1\nAC1015\n  9\n$DWGCODEPAGE\n  3\nANSI_1252\n  0\nENDSEC\n".to_vec();
    data.extend_from_slice(b"  0\nSECTION\n  2\nTABLES\n  0\nTABLE\n  2\nLAYER\n100\nAcDbSymbolTable\n 70\n1\n  0\nLAYER\n  5\n10\n100\nAcDbSymbolTableRecord\n100\nAcDbLayerTableRecord\n  2\nM");
    data.push(0xFC); // ü in Windows-1252
    data.extend_from_slice(b"LLER\n 70\n0\n  0\nENDTAB\n  0\nENDSEC\n  0\nEOF\n");

    let doc = read_strict(&data).unwrap();
    assert!(doc.by_name(TableKind::Layer, "MüLLER").is_ok());
}

#[test]
fn test_comments_never_reach_entities() {
    let data = DxfText::new()
        .tag(999, "written by hand")
        .header("AC1015")
        .section("ENTITIES")
        .line(0x100, "0")
        .end_section()
        .eof()
        .into_bytes();

    let reader = DxfReader::from_bytes(data.clone()).with_configuration(DxfReaderConfiguration {
        keep_comments: true,
        ..Default::default()
    });
    assert_eq!(reader.read_tags().unwrap()[0].code, 999);
    assert!(read_strict(&data).is_ok());
}
