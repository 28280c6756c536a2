//! `$DWGCODEPAGE` to text encoding mapping.
//!
//! Only pre-R2007 files use the code page; R2007 and later are UTF-8
//! whatever the header says.

use encoding_rs::Encoding;

/// Code page written for new legacy documents
pub const DEFAULT_CODE_PAGE: &str = "ANSI_1252";

/// Encoding for a DXF code page name (case-insensitive).
///
/// Unknown names fall back to Windows-1252, the most common DXF code page.
pub fn encoding_from_code_page(code_page: &str) -> &'static Encoding {
    match code_page.trim().to_ascii_lowercase().as_str() {
        "ansi_936" | "gb2312" => encoding_rs::GBK,
        "ansi_950" | "big5" => encoding_rs::BIG5,
        "ansi_949" | "ansi_1361" | "korean" | "johab" => encoding_rs::EUC_KR,
        "ansi_932" | "dos932" => encoding_rs::SHIFT_JIS,

        "ansi_874" => encoding_rs::WINDOWS_874,
        "ansi_1250" | "dos852" => encoding_rs::WINDOWS_1250,
        "ansi_1251" | "dos855" => encoding_rs::WINDOWS_1251,
        "ansi_1253" | "dos869" => encoding_rs::WINDOWS_1253,
        "ansi_1254" | "dos857" => encoding_rs::WINDOWS_1254,
        "ansi_1255" => encoding_rs::WINDOWS_1255,
        "ansi_1256" => encoding_rs::WINDOWS_1256,
        "ansi_1257" => encoding_rs::WINDOWS_1257,
        "ansi_1258" => encoding_rs::WINDOWS_1258,
        "dos866" => encoding_rs::IBM866,

        "iso8859-2" | "iso_8859-2" => encoding_rs::ISO_8859_2,
        "iso8859-3" | "iso_8859-3" => encoding_rs::ISO_8859_3,
        "iso8859-4" | "iso_8859-4" => encoding_rs::ISO_8859_4,
        "iso8859-5" | "iso_8859-5" => encoding_rs::ISO_8859_5,
        "iso8859-6" | "iso_8859-6" => encoding_rs::ISO_8859_6,
        "iso8859-7" | "iso_8859-7" => encoding_rs::ISO_8859_7,
        "iso8859-8" | "iso_8859-8" => encoding_rs::ISO_8859_8,
        "iso8859-10" | "iso_8859-10" => encoding_rs::ISO_8859_10,
        "iso8859-13" | "iso_8859-13" => encoding_rs::ISO_8859_13,
        "iso8859-14" | "iso_8859-14" => encoding_rs::ISO_8859_14,
        "iso8859-15" | "iso_8859-15" => encoding_rs::ISO_8859_15,
        "koi8-r" => encoding_rs::KOI8_R,
        "koi8-u" => encoding_rs::KOI8_U,

        "utf-8" | "utf8" | "unicode" => encoding_rs::UTF_8,

        _ => encoding_rs::WINDOWS_1252,
    }
}

/// Code page name for `$DWGCODEPAGE` when writing a legacy file.
pub fn code_page_for_encoding(encoding: &'static Encoding) -> &'static str {
    match encoding.name() {
        "GBK" | "gb18030" => "ANSI_936",
        "Big5" => "ANSI_950",
        "EUC-KR" => "ANSI_949",
        "Shift_JIS" => "ANSI_932",
        "windows-874" => "ANSI_874",
        "windows-1250" => "ANSI_1250",
        "windows-1251" => "ANSI_1251",
        "windows-1253" => "ANSI_1253",
        "windows-1254" => "ANSI_1254",
        "windows-1255" => "ANSI_1255",
        "windows-1256" => "ANSI_1256",
        "windows-1257" => "ANSI_1257",
        "windows-1258" => "ANSI_1258",
        "IBM866" => "DOS866",
        "KOI8-R" => "KOI8-R",
        "KOI8-U" => "KOI8-U",
        _ => DEFAULT_CODE_PAGE,
    }
}
