//! Tag model
//!
//! A tag is one `(group code, value)` pair of the DXF stream. Coordinate
//! tags transmitted as separate x/y/z pairs are compiled into a single
//! point tag by the reader and split again by the writer.

pub mod extended;
pub mod group_code;

pub use extended::ExtendedTags;
pub use group_code::{GroupCodeValueType, PointerKind};

use crate::types::{Handle, Vector2, Vector3};
use std::fmt;

/// Typed tag value
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    String(String),
    Integer(i64),
    Double(f64),
    Point2(Vector2),
    Point3(Vector3),
    Binary(Vec<u8>),
}

impl TagValue {
    /// Short kind name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            TagValue::String(_) => "string",
            TagValue::Integer(_) => "integer",
            TagValue::Double(_) => "float",
            TagValue::Point2(_) => "2d point",
            TagValue::Point3(_) => "3d point",
            TagValue::Binary(_) => "binary",
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::String(s) => write!(f, "{}", s),
            TagValue::Integer(i) => write!(f, "{}", i),
            TagValue::Double(d) => write!(f, "{}", d),
            TagValue::Point2(p) => write!(f, "{}", p),
            TagValue::Point3(p) => write!(f, "{}", p),
            TagValue::Binary(data) => {
                for byte in data {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::String(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        TagValue::String(s)
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Integer(v)
    }
}

impl From<i32> for TagValue {
    fn from(v: i32) -> Self {
        TagValue::Integer(v as i64)
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        TagValue::Double(v)
    }
}

impl From<Vector3> for TagValue {
    fn from(p: Vector3) -> Self {
        TagValue::Point3(p)
    }
}

impl From<Vector2> for TagValue {
    fn from(p: Vector2) -> Self {
        TagValue::Point2(p)
    }
}

impl From<Handle> for TagValue {
    fn from(h: Handle) -> Self {
        TagValue::String(h.to_hex())
    }
}

/// A single DXF tag
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub code: i32,
    pub value: TagValue,
}

impl Tag {
    pub fn new(code: i32, value: impl Into<TagValue>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }

    pub fn string(code: i32, value: impl Into<String>) -> Self {
        Self {
            code,
            value: TagValue::String(value.into()),
        }
    }

    pub fn int(code: i32, value: i64) -> Self {
        Self {
            code,
            value: TagValue::Integer(value),
        }
    }

    pub fn double(code: i32, value: f64) -> Self {
        Self {
            code,
            value: TagValue::Double(value),
        }
    }

    pub fn point3(code: i32, value: Vector3) -> Self {
        Self {
            code,
            value: TagValue::Point3(value),
        }
    }

    pub fn point2(code: i32, value: Vector2) -> Self {
        Self {
            code,
            value: TagValue::Point2(value),
        }
    }

    pub fn binary(code: i32, data: Vec<u8>) -> Self {
        Self {
            code,
            value: TagValue::Binary(data),
        }
    }

    pub fn handle(code: i32, handle: Handle) -> Self {
        Self::string(code, handle.to_hex())
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            TagValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            TagValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            TagValue::Double(v) => Some(v),
            TagValue::Integer(v) => Some(v as f64),
            _ => None,
        }
    }

    /// Point value, 2D points lifted to z = 0
    pub fn as_point(&self) -> Option<Vector3> {
        match self.value {
            TagValue::Point3(p) => Some(p),
            TagValue::Point2(p) => Some(p.to_3d()),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        self.as_str().and_then(|s| Handle::from_hex(s).ok())
    }

    /// True for `0/<name>`
    pub fn is_struct(&self, name: &str) -> bool {
        self.code == group_code::STRUCTURE_MARKER && self.as_str() == Some(name)
    }

    pub fn is_embedded_object_marker(&self) -> bool {
        self.code == group_code::EMBEDDED_OBJ_MARKER
            && self.as_str() == Some(group_code::EMBEDDED_OBJ_STR)
    }

    pub fn value_type(&self) -> GroupCodeValueType {
        GroupCodeValueType::from_code(self.code)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.code, self.value)
    }
}

/// First tag with the given code
pub fn find_first(tags: &[Tag], code: i32) -> Option<&Tag> {
    tags.iter().find(|t| t.code == code)
}

/// Split a flat tag run at structure markers, one group per `0/<name>` tag.
/// Tags before the first marker form their own leading group.
pub fn group_by_structure(tags: Vec<Tag>) -> Vec<Vec<Tag>> {
    let mut groups: Vec<Vec<Tag>> = Vec::new();
    for tag in tags {
        if tag.code == group_code::STRUCTURE_MARKER || groups.is_empty() {
            groups.push(Vec::new());
        }
        if let Some(group) = groups.last_mut() {
            group.push(tag);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let tag = Tag::string(5, "1F");
        assert_eq!(tag.as_handle(), Some(Handle::new(0x1F)));
        assert_eq!(tag.as_int(), None);
        let tag = Tag::int(70, 4);
        assert_eq!(tag.as_f64(), Some(4.0));
        let tag = Tag::point2(10, Vector2::new(1.0, 2.0));
        assert_eq!(tag.as_point(), Some(Vector3::new(1.0, 2.0, 0.0)));
    }

    #[test]
    fn test_group_by_structure() {
        let tags = vec![
            Tag::string(0, "LINE"),
            Tag::string(5, "A"),
            Tag::string(0, "CIRCLE"),
            Tag::double(40, 1.0),
        ];
        let groups = group_by_structure(tags);
        assert_eq!(groups.len(), 2);
        assert!(groups[1][0].is_struct("CIRCLE"));
        assert_eq!(groups[1].len(), 2);
    }

    #[test]
    fn test_binary_display() {
        let tag = Tag::binary(310, vec![0x0A, 0xFF]);
        assert_eq!(tag.value.to_string(), "0AFF");
    }
}
