//! Group code classification
//!
//! The value type of a tag is fully determined by its group code. Binary
//! DXF relies on this to know how many bytes to read; ASCII DXF uses it to
//! decide how a value line is parsed.

/// Structure marker (`0/SECTION`, `0/LINE`, ...)
pub const STRUCTURE_MARKER: i32 = 0;
/// Section, table or block name (`2/HEADER`)
pub const NAME_CODE: i32 = 2;
/// Header variable name (`9/$ACADVER`)
pub const VARIABLE_NAME: i32 = 9;
/// Subclass marker (`100/AcDbEntity`)
pub const SUBCLASS_MARKER: i32 = 100;
/// Embedded object marker (`101/Embedded Object`)
pub const EMBEDDED_OBJ_MARKER: i32 = 101;
/// AppData control string (`102/{ACAD_REACTORS`)
pub const APP_DATA_MARKER: i32 = 102;
/// XDATA application id (`1001/AppName`)
pub const XDATA_MARKER: i32 = 1001;
/// Comment (`999/text`)
pub const COMMENT_MARKER: i32 = 999;
/// Highest group code
pub const MAX_GROUP_CODE: i32 = 1071;

pub const EMBEDDED_OBJ_STR: &str = "Embedded Object";

/// Storage type of a tag value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupCodeValueType {
    String,
    Double,
    Int16,
    Int32,
    Int64,
    /// One byte in binary DXF, 290-299
    Byte,
    /// Hex string in ASCII DXF, length-prefixed bytes in binary DXF
    Binary,
}

impl GroupCodeValueType {
    pub fn from_code(code: i32) -> Self {
        match code {
            10..=59 | 110..=149 | 210..=239 | 460..=469 | 1010..=1059 => Self::Double,
            60..=79 | 170..=179 | 270..=289 | 370..=389 | 400..=409 | 1060..=1070 => Self::Int16,
            90..=99 | 420..=429 | 440..=459 | 1071 => Self::Int32,
            160..=169 => Self::Int64,
            290..=299 => Self::Byte,
            310..=319 | 1004 => Self::Binary,
            _ => Self::String,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int16 | Self::Int32 | Self::Int64 | Self::Byte)
    }
}

/// Pointer semantics of handle-valued group codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// 320-329, never translated on copy
    Arbitrary,
    /// 330-339 and XDATA 1005
    Soft,
    /// 340-349, 390-399, 480, 481
    Hard,
    /// 350-359
    SoftOwner,
    /// 360-369
    HardOwner,
}

impl PointerKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            320..=329 => Some(Self::Arbitrary),
            330..=339 | 1005 => Some(Self::Soft),
            340..=349 | 390..=399 | 480 | 481 => Some(Self::Hard),
            350..=359 => Some(Self::SoftOwner),
            360..=369 => Some(Self::HardOwner),
            _ => None,
        }
    }

    /// Pointers that must follow their target when entities are copied
    /// into another document.
    pub fn is_translatable(&self) -> bool {
        !matches!(self, Self::Arbitrary)
    }
}

/// Codes that start a grouped coordinate (x); y is `code + 10`, z is `code + 20`.
pub fn is_point_code(code: i32) -> bool {
    matches!(code, 10..=18 | 110..=112 | 210..=213 | 1010..=1013)
}

/// Entity handle codes (105 is used by DIMSTYLE)
pub fn is_handle_code(code: i32) -> bool {
    code == 5 || code == 105
}

pub fn is_pointer_code(code: i32) -> bool {
    PointerKind::from_code(code).is_some()
}

pub fn is_translatable_pointer(code: i32) -> bool {
    PointerKind::from_code(code).map_or(false, |kind| kind.is_translatable())
}

pub fn is_valid_code(code: i32) -> bool {
    (0..=MAX_GROUP_CODE).contains(&code)
}

/// XDATA tags live in the 1000 range
pub fn is_xdata_code(code: i32) -> bool {
    (1000..=MAX_GROUP_CODE).contains(&code)
}
