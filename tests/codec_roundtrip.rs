//! Tag codec round-trip properties: decoding an encoded tag stream gives
//! the same tags, for ASCII and binary output.

use dxfcore::io::dxf::{decode_tags, encode_tags, DxfFormat, DxfReaderConfiguration, EncodeOptions};
use dxfcore::{DxfError, DxfVersion, Tag, Vector3};
use proptest::collection::vec;
use proptest::prelude::*;

/// Free text including carets, control characters and surrounding spaces;
/// only NUL is excluded, it terminates binary strings.
const TEXT: &str = "[ a-zA-Z0-9_.$€Äß^\\t\\n\\r\\x01-\\x08\\x0b-\\x1f-]{0,24}";

fn arb_tag() -> impl Strategy<Value = Tag> {
    let coord = -1.0e9..1.0e9f64;
    prop_oneof![
        (prop_oneof![Just(1), Just(3), Just(7), Just(1000)], TEXT)
            .prop_map(|(code, s)| Tag::string(code, s)),
        any::<i16>().prop_map(|v| Tag::int(70, v as i64)),
        any::<i32>().prop_map(|v| Tag::int(90, v as i64)),
        any::<i64>().prop_map(|v| Tag::int(160, v)),
        (0..=1i64).prop_map(|v| Tag::int(290, v)),
        coord.clone().prop_map(|v| Tag::double(40, v)),
        (coord.clone(), coord.clone(), coord)
            .prop_map(|(x, y, z)| Tag::point3(10, Vector3::new(x, y, z))),
        (prop_oneof![Just(310), Just(1004)], vec(any::<u8>(), 1..=127))
            .prop_map(|(code, bytes)| Tag::binary(code, bytes)),
    ]
}

/// Tag stream starting with a HEADER that announces R2018
fn stream(body: Vec<Tag>) -> Vec<Tag> {
    let mut tags = vec![
        Tag::string(0, "SECTION"),
        Tag::string(2, "HEADER"),
        Tag::string(9, "$ACADVER"),
        Tag::string(1, "AC1032"),
        Tag::string(0, "ENDSEC"),
    ];
    tags.extend(body);
    tags.push(Tag::string(0, "EOF"));
    tags
}

fn options(format: DxfFormat) -> EncodeOptions {
    EncodeOptions {
        format,
        version: DxfVersion::AC1032,
        ..EncodeOptions::default()
    }
}

fn roundtrip(tags: &[Tag], format: DxfFormat) -> Vec<Tag> {
    let data = encode_tags(tags, &options(format)).unwrap();
    let decoded = decode_tags(&data, &DxfReaderConfiguration::default()).unwrap();
    assert_eq!(decoded.format, format);
    assert_eq!(decoded.version, DxfVersion::AC1032);
    decoded.tags
}

proptest! {
    #[test]
    fn ascii_roundtrip(body in vec(arb_tag(), 0..40)) {
        let tags = stream(body);
        prop_assert_eq!(roundtrip(&tags, DxfFormat::Ascii), tags);
    }

    #[test]
    fn binary_roundtrip(body in vec(arb_tag(), 0..40)) {
        let tags = stream(body);
        prop_assert_eq!(roundtrip(&tags, DxfFormat::Binary), tags);
    }
}

#[test]
fn test_r12_code_page_roundtrip() {
    let tags = vec![
        Tag::string(0, "SECTION"),
        Tag::string(2, "HEADER"),
        Tag::string(9, "$ACADVER"),
        Tag::string(1, "AC1009"),
        Tag::string(9, "$DWGCODEPAGE"),
        Tag::string(3, "ANSI_1252"),
        Tag::string(0, "ENDSEC"),
        Tag::string(1, "Grüße, Ω"),
        Tag::string(0, "EOF"),
    ];
    for format in [DxfFormat::Ascii, DxfFormat::Binary] {
        let options = EncodeOptions {
            format,
            version: DxfVersion::AC1009,
            ..EncodeOptions::default()
        };
        let data = encode_tags(&tags, &options).unwrap();
        let decoded = decode_tags(&data, &DxfReaderConfiguration::default()).unwrap();
        assert_eq!(decoded.encoding, encoding_rs::WINDOWS_1252);
        assert_eq!(decoded.tags, tags);
    }
}

#[test]
fn test_control_characters_use_caret_notation() {
    let tags = vec![
        Tag::string(0, "SECTION"),
        Tag::string(2, "HEADER"),
        Tag::string(9, "$ACADVER"),
        Tag::string(1, "AC1032"),
        Tag::string(0, "ENDSEC"),
        Tag::string(1, "tab\there"),
        Tag::string(0, "EOF"),
    ];
    let data = encode_tags(&tags, &EncodeOptions::default()).unwrap();
    assert!(String::from_utf8_lossy(&data).contains("tab^Ihere"));
    let decoded = decode_tags(&data, &DxfReaderConfiguration::default()).unwrap();
    assert_eq!(decoded.tags, tags);
}

#[test]
fn test_text_edges_roundtrip() {
    let tags = stream(vec![
        Tag::string(1, "  leading"),
        Tag::string(1, "trailing  "),
        Tag::string(1, " "),
        Tag::string(1, ""),
        Tag::string(1, "2^3 and ^J literal"),
        Tag::string(1, "a^ b"),
        Tag::string(1000, "bell\u{7} and \r\n"),
        Tag::binary(1004, vec![0, 255, 10, 13]),
    ]);
    for format in [DxfFormat::Ascii, DxfFormat::Binary] {
        assert_eq!(roundtrip(&tags, format), tags, "{:?}", format);
    }
}

#[test]
fn test_out_of_range_integers_are_rejected() {
    let oversized = [
        Tag::int(70, 70_000),
        Tag::int(70, -40_000),
        Tag::int(90, 1 << 40),
        Tag::int(90, i64::from(i32::MIN) - 1),
    ];
    for tag in oversized {
        for format in [DxfFormat::Ascii, DxfFormat::Binary] {
            let tags = stream(vec![tag.clone()]);
            assert!(
                matches!(
                    encode_tags(&tags, &options(format)),
                    Err(DxfError::InvalidValue { .. })
                ),
                "{:?} {:?}",
                tag,
                format
            );
        }
    }
}

#[test]
fn test_oversized_value_read_from_text_is_not_written() {
    let text = "  0\nSECTION\n  2\nHEADER\n  9\n$ACADVER\n  1\nAC1032\n  0\nENDSEC\n 70\n70000\n  0\nEOF\n";
    let decoded = decode_tags(text.as_bytes(), &DxfReaderConfiguration::default()).unwrap();
    assert!(decoded.tags.contains(&Tag::int(70, 70_000)));
    for format in [DxfFormat::Ascii, DxfFormat::Binary] {
        assert!(matches!(
            encode_tags(&decoded.tags, &options(format)),
            Err(DxfError::InvalidValue { .. })
        ));
    }
}
