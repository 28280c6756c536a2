//! Extended Data (XDATA) support
//!
//! Extended data is application-specific data attached to an entity. Each
//! registered application (AppID) owns at most one XDATA list per entity.
//! The lists are kept as raw tags so that saving reproduces them exactly;
//! [`XDataValue`] gives a typed view of single tags.

use crate::error::{DxfError, Result};
use crate::tags::group_code::XDATA_MARKER;
use crate::tags::{Tag, TagValue};
use crate::types::{Handle, Vector3};
use indexmap::IndexMap;

/// Typed view of one XDATA tag
#[derive(Debug, Clone, PartialEq)]
pub enum XDataValue {
    /// String value (group code 1000)
    String(String),
    /// Control string (group code 1002) - "{" or "}"
    ControlString(String),
    /// Layer name (group code 1003)
    LayerName(String),
    /// Binary data (group code 1004)
    BinaryData(Vec<u8>),
    /// Database handle (group code 1005)
    Handle(Handle),
    /// 3D point (group codes 1010, 1020, 1030)
    Point3D(Vector3),
    /// 3D position (group codes 1011, 1021, 1031)
    Position3D(Vector3),
    /// 3D displacement (group codes 1012, 1022, 1032)
    Displacement3D(Vector3),
    /// 3D direction (group codes 1013, 1023, 1033)
    Direction3D(Vector3),
    /// Real value (group code 1040)
    Real(f64),
    /// Distance (group code 1041)
    Distance(f64),
    /// Scale factor (group code 1042)
    ScaleFactor(f64),
    /// 16-bit integer (group code 1070)
    Integer16(i16),
    /// 32-bit integer (group code 1071)
    Integer32(i32),
}

impl XDataValue {
    /// Interpret a tag, `None` for codes outside the XDATA value set
    pub fn from_tag(tag: &Tag) -> Option<Self> {
        let value = match (tag.code, &tag.value) {
            (1000, TagValue::String(s)) => XDataValue::String(s.clone()),
            (1002, TagValue::String(s)) => XDataValue::ControlString(s.clone()),
            (1003, TagValue::String(s)) => XDataValue::LayerName(s.clone()),
            (1004, TagValue::Binary(b)) => XDataValue::BinaryData(b.clone()),
            (1005, TagValue::String(s)) => XDataValue::Handle(Handle::from_hex(s).ok()?),
            (1010..=1013, _) => {
                let p = tag.as_point()?;
                match tag.code {
                    1010 => XDataValue::Point3D(p),
                    1011 => XDataValue::Position3D(p),
                    1012 => XDataValue::Displacement3D(p),
                    _ => XDataValue::Direction3D(p),
                }
            }
            (1040, TagValue::Double(v)) => XDataValue::Real(*v),
            (1041, TagValue::Double(v)) => XDataValue::Distance(*v),
            (1042, TagValue::Double(v)) => XDataValue::ScaleFactor(*v),
            (1070, TagValue::Integer(v)) => XDataValue::Integer16(*v as i16),
            (1071, TagValue::Integer(v)) => XDataValue::Integer32(*v as i32),
            _ => return None,
        };
        Some(value)
    }

    pub fn to_tag(&self) -> Tag {
        match self {
            XDataValue::String(s) => Tag::string(1000, s.clone()),
            XDataValue::ControlString(s) => Tag::string(1002, s.clone()),
            XDataValue::LayerName(s) => Tag::string(1003, s.clone()),
            XDataValue::BinaryData(b) => Tag::binary(1004, b.clone()),
            XDataValue::Handle(h) => Tag::handle(1005, *h),
            XDataValue::Point3D(p) => Tag::point3(1010, *p),
            XDataValue::Position3D(p) => Tag::point3(1011, *p),
            XDataValue::Displacement3D(p) => Tag::point3(1012, *p),
            XDataValue::Direction3D(p) => Tag::point3(1013, *p),
            XDataValue::Real(v) => Tag::double(1040, *v),
            XDataValue::Distance(v) => Tag::double(1041, *v),
            XDataValue::ScaleFactor(v) => Tag::double(1042, *v),
            XDataValue::Integer16(v) => Tag::int(1070, *v as i64),
            XDataValue::Integer32(v) => Tag::int(1071, *v as i64),
        }
    }
}

/// XDATA lists of one entity, keyed by AppID in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XData {
    lists: IndexMap<String, Vec<Tag>>,
}

impl XData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the list for `appid`; a second list for the same AppID is a
    /// structure error.
    pub fn add(&mut self, appid: impl Into<String>, tags: Vec<Tag>) -> Result<()> {
        let appid = appid.into();
        if self.lists.contains_key(&appid) {
            return Err(DxfError::Structure(format!(
                "duplicate XDATA for AppID '{}'",
                appid
            )));
        }
        self.lists.insert(appid, tags);
        Ok(())
    }

    /// Replace or create the list for `appid`
    pub fn set(&mut self, appid: impl Into<String>, tags: Vec<Tag>) {
        self.lists.insert(appid.into(), tags);
    }

    pub fn get(&self, appid: &str) -> Option<&[Tag]> {
        self.lists.get(appid).map(|v| v.as_slice())
    }

    pub fn get_mut(&mut self, appid: &str) -> Option<&mut Vec<Tag>> {
        self.lists.get_mut(appid)
    }

    /// Typed values of one list, skipping tags with no typed form
    pub fn values(&self, appid: &str) -> Vec<XDataValue> {
        self.get(appid)
            .map(|tags| tags.iter().filter_map(XDataValue::from_tag).collect())
            .unwrap_or_default()
    }

    pub fn discard(&mut self, appid: &str) -> Option<Vec<Tag>> {
        self.lists.shift_remove(appid)
    }

    pub fn contains(&self, appid: &str) -> bool {
        self.lists.contains_key(appid)
    }

    pub fn appids(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Tag])> {
        self.lists.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Vec<Tag>)> {
        self.lists.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Tags as written to DXF, each list led by its `1001/AppID` tag
    pub fn export_tags(&self, out: &mut Vec<Tag>) {
        for (appid, tags) in &self.lists {
            out.push(Tag::string(XDATA_MARKER, appid.clone()));
            out.extend(tags.iter().cloned());
        }
    }
}
