//! Structural split of one entity's tag run
//!
//! Layout of an entity in the tag stream:
//!
//! ```text
//! 0/TYPE  base class tags (handle, AppData, owner)
//! 100/AcDbEntity  subclass tags
//! 100/AcDbLine    subclass tags
//! 101/Embedded Object  embedded object tags
//! 1001/APPID  XDATA tags, one list per AppID, always last
//! ```

use crate::error::{DxfError, Result};
use crate::tags::group_code::{APP_DATA_MARKER, SUBCLASS_MARKER, XDATA_MARKER};
use crate::tags::{Tag, TagValue};
use crate::xdata::XData;
use std::iter::Peekable;
use std::vec::IntoIter;

type TagIter = Peekable<IntoIter<Tag>>;

/// One entity split into base class, subclasses, AppData, embedded
/// objects and XDATA.
///
/// AppData groups are moved out of their subclass; a `102/<index>`
/// placeholder with an integer value marks the original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedTags {
    /// `subclasses[0]` is the base class and starts with the `0/TYPE` tag.
    pub subclasses: Vec<Vec<Tag>>,
    /// Complete AppData groups including the `{NAME` and `}` tags.
    pub appdata: Vec<Vec<Tag>>,
    pub embedded_objects: Vec<Vec<Tag>>,
    pub xdata: XData,
}

impl ExtendedTags {
    /// Split a tag run starting with `0/TYPE`.
    ///
    /// `legacy` folds all subclasses into the base class, the layout of
    /// R12 entities.
    pub fn from_tags(tags: Vec<Tag>, legacy: bool) -> Result<Self> {
        match tags.first() {
            Some(tag) if tag.code == 0 => {}
            Some(tag) => {
                return Err(DxfError::Structure(format!(
                    "entity must start with a structure tag, found {}",
                    tag
                )))
            }
            None => return Err(DxfError::Structure("empty entity".into())),
        }

        let mut xtags = ExtendedTags::default();
        let mut iter = tags.into_iter().peekable();

        let noclass = collect_subclass(&mut iter, None, &mut xtags.appdata)?;
        xtags.subclasses.push(noclass);
        while let Some(marker) = iter.next_if(|t| t.code == SUBCLASS_MARKER) {
            let subclass = collect_subclass(&mut iter, Some(marker), &mut xtags.appdata)?;
            xtags.subclasses.push(subclass);
        }

        while let Some(marker) = iter.next_if(|t| t.is_embedded_object_marker()) {
            let mut embedded = vec![marker];
            while let Some(tag) =
                iter.next_if(|t| t.code != XDATA_MARKER && !t.is_embedded_object_marker())
            {
                embedded.push(tag);
            }
            xtags.embedded_objects.push(embedded);
        }

        while let Some(marker) = iter.next_if(|t| t.code == XDATA_MARKER) {
            let appid = marker.as_str().unwrap_or_default().to_string();
            let mut values = Vec::new();
            while let Some(tag) = iter.next_if(|t| t.code >= 1000 && t.code != XDATA_MARKER) {
                values.push(tag);
            }
            xtags.xdata.add(appid, values)?;
        }

        if let Some(tag) = iter.next() {
            return Err(DxfError::Structure(format!(
                "unexpected tag {} at end of {} entity",
                tag,
                xtags.dxftype()
            )));
        }

        if legacy && xtags.subclasses.len() > 1 {
            xtags.flatten_subclasses();
        }
        Ok(xtags)
    }

    fn flatten_subclasses(&mut self) {
        let mut rest = self.subclasses.split_off(1);
        for subclass in rest.iter_mut() {
            self.subclasses[0].extend(subclass.drain(..).filter(|t| t.code != SUBCLASS_MARKER));
        }
    }

    /// Entity type from the leading `0/TYPE` tag
    pub fn dxftype(&self) -> &str {
        self.subclasses
            .first()
            .and_then(|sc| sc.first())
            .and_then(|t| t.as_str())
            .unwrap_or("")
    }

    pub fn noclass(&self) -> &[Tag] {
        self.subclasses.first().map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Subclass by its marker name, tags include the marker
    pub fn subclass(&self, marker: &str) -> Option<&[Tag]> {
        self.subclasses
            .iter()
            .skip(1)
            .find(|sc| sc.first().and_then(|t| t.as_str()) == Some(marker))
            .map(|v| v.as_slice())
    }

    pub fn subclass_markers(&self) -> Vec<&str> {
        self.subclasses
            .iter()
            .skip(1)
            .filter_map(|sc| sc.first().and_then(|t| t.as_str()))
            .collect()
    }

    /// AppData group by application name (without braces)
    pub fn app_data(&self, name: &str) -> Option<&[Tag]> {
        self.appdata
            .iter()
            .find(|group| appdata_name(group) == Some(name))
            .map(|v| v.as_slice())
    }

    /// Reassemble the flat tag run.
    pub fn flatten(&self) -> Vec<Tag> {
        let mut out = Vec::new();
        for subclass in &self.subclasses {
            for tag in subclass {
                match (tag.code, &tag.value) {
                    (APP_DATA_MARKER, TagValue::Integer(index)) => {
                        if let Some(group) = self.appdata.get(*index as usize) {
                            out.extend(group.iter().cloned());
                        }
                    }
                    _ => out.push(tag.clone()),
                }
            }
        }
        for embedded in &self.embedded_objects {
            out.extend(embedded.iter().cloned());
        }
        self.xdata.export_tags(&mut out);
        out
    }
}

/// Application name of an AppData group, `{ACAD_REACTORS` → `ACAD_REACTORS`
pub fn appdata_name(group: &[Tag]) -> Option<&str> {
    group
        .first()
        .and_then(|t| t.as_str())
        .and_then(|s| s.strip_prefix('{'))
}

fn is_appdata_start(tag: &Tag) -> bool {
    tag.code == APP_DATA_MARKER && tag.as_str().map_or(false, |s| s.starts_with('{'))
}

fn is_appdata_end(tag: &Tag) -> bool {
    tag.code == APP_DATA_MARKER
        && tag
            .as_str()
            .map_or(false, |s| s.ends_with('}') && !s.starts_with('{'))
}

fn ends_subclass(tag: &Tag) -> bool {
    tag.code == SUBCLASS_MARKER || tag.code == XDATA_MARKER || tag.is_embedded_object_marker()
}

fn collect_subclass(
    iter: &mut TagIter,
    marker: Option<Tag>,
    appdata: &mut Vec<Vec<Tag>>,
) -> Result<Vec<Tag>> {
    let mut data: Vec<Tag> = marker.into_iter().collect();
    // the base class starts with its 0/TYPE tag
    if data.is_empty() {
        if let Some(first) = iter.next() {
            data.push(first);
        }
    }
    while let Some(tag) = iter.next_if(|t| !ends_subclass(t)) {
        if is_appdata_start(&tag) {
            let index = appdata.len();
            appdata.push(collect_appdata(tag, iter)?);
            data.push(Tag::int(APP_DATA_MARKER, index as i64));
        } else {
            data.push(tag);
        }
    }
    Ok(data)
}

fn collect_appdata(start: Tag, iter: &mut TagIter) -> Result<Vec<Tag>> {
    let name = start.as_str().unwrap_or_default().to_string();
    let mut group = vec![start];
    loop {
        match iter.next() {
            Some(tag) if is_appdata_end(&tag) => {
                group.push(tag);
                return Ok(group);
            }
            Some(tag) if is_appdata_start(&tag) => {
                return Err(DxfError::Structure(format!(
                    "AppData group '{}' opened inside '{}'",
                    tag, name
                )))
            }
            Some(tag) => group.push(tag),
            None => {
                return Err(DxfError::Structure(format!(
                    "missing closing tag for AppData group '{}'",
                    name
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_tags() -> Vec<Tag> {
        vec![
            Tag::string(0, "LINE"),
            Tag::string(5, "2A"),
            Tag::string(102, "{ACAD_REACTORS"),
            Tag::string(330, "1F"),
            Tag::string(102, "}"),
            Tag::string(330, "1F"),
            Tag::string(100, "AcDbEntity"),
            Tag::string(8, "0"),
            Tag::string(100, "AcDbLine"),
            Tag::point3(10, Default::default()),
            Tag::string(1001, "ACAD"),
            Tag::string(1000, "hello"),
            Tag::int(1070, 3),
        ]
    }

    #[test]
    fn test_split_layout() {
        let xtags = ExtendedTags::from_tags(line_tags(), false).unwrap();
        assert_eq!(xtags.dxftype(), "LINE");
        assert_eq!(xtags.subclasses.len(), 3);
        assert_eq!(xtags.subclass_markers(), vec!["AcDbEntity", "AcDbLine"]);
        assert_eq!(xtags.appdata.len(), 1);
        assert_eq!(xtags.app_data("ACAD_REACTORS").map(|g| g.len()), Some(3));
        assert_eq!(xtags.noclass()[2], Tag::int(102, 0));
        assert_eq!(xtags.xdata.get("ACAD").map(|t| t.len()), Some(2));
    }

    #[test]
    fn test_flatten_restores_stream() {
        let xtags = ExtendedTags::from_tags(line_tags(), false).unwrap();
        assert_eq!(xtags.flatten(), line_tags());
    }

    #[test]
    fn test_duplicate_xdata_appid() {
        let mut tags = line_tags();
        tags.push(Tag::string(1001, "ACAD"));
        tags.push(Tag::string(1000, "again"));
        let err = ExtendedTags::from_tags(tags, false).unwrap_err();
        assert!(matches!(err, DxfError::Structure(_)));
    }

    #[test]
    fn test_missing_appdata_closer() {
        let tags = vec![
            Tag::string(0, "LINE"),
            Tag::string(102, "{ACAD_XDICTIONARY"),
            Tag::string(360, "3A"),
        ];
        assert!(ExtendedTags::from_tags(tags, false).is_err());
    }

    #[test]
    fn test_tag_after_xdata_is_rejected() {
        let mut tags = line_tags();
        tags.push(Tag::string(8, "late"));
        assert!(ExtendedTags::from_tags(tags, false).is_err());
    }

    #[test]
    fn test_embedded_object() {
        let tags = vec![
            Tag::string(0, "MTEXT"),
            Tag::string(100, "AcDbMText"),
            Tag::string(1, "x"),
            Tag::string(101, "Embedded Object"),
            Tag::int(70, 1),
            Tag::string(1001, "ACAD"),
        ];
        let xtags = ExtendedTags::from_tags(tags.clone(), false).unwrap();
        assert_eq!(xtags.embedded_objects.len(), 1);
        assert_eq!(xtags.embedded_objects[0].len(), 2);
        assert_eq!(xtags.flatten(), tags);
    }

    #[test]
    fn test_legacy_flattens_subclasses() {
        let tags = vec![
            Tag::string(0, "LINE"),
            Tag::string(8, "0"),
            Tag::string(100, "AcDbLine"),
            Tag::double(39, 1.0),
        ];
        let xtags = ExtendedTags::from_tags(tags, true).unwrap();
        assert_eq!(xtags.subclasses.len(), 1);
        assert_eq!(xtags.noclass().len(), 3);
    }
}
