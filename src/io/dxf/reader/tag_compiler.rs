//! Coordinate grouping
//!
//! Turns the scalar tag stream of a [`DxfStreamReader`] into compiled tags:
//! an x tag followed by its y (`code + 10`) and optional z (`code + 20`)
//! becomes one point tag under the x code.

use super::stream_reader::DxfStreamReader;
use crate::error::{DxfError, Result};
use crate::tags::group_code::{is_point_code, COMMENT_MARKER};
use crate::tags::Tag;
use crate::types::{Vector2, Vector3};

pub struct TagCompiler<'r> {
    reader: &'r mut dyn DxfStreamReader,
    peeked: Option<Tag>,
    keep_comments: bool,
}

impl<'r> TagCompiler<'r> {
    pub fn new(reader: &'r mut dyn DxfStreamReader, keep_comments: bool) -> Self {
        Self {
            reader,
            peeked: None,
            keep_comments,
        }
    }

    fn next_raw(&mut self) -> Result<Option<Tag>> {
        if let Some(tag) = self.peeked.take() {
            return Ok(Some(tag));
        }
        loop {
            match self.reader.read_tag()? {
                Some(tag) if tag.code == COMMENT_MARKER && !self.keep_comments => continue,
                other => return Ok(other),
            }
        }
    }

    fn coordinate(&self, tag: &Tag) -> Result<f64> {
        tag.as_f64().ok_or_else(|| {
            DxfError::parse(
                self.reader.line_number(),
                format!("coordinate {} is not a number", tag),
            )
        })
    }

    /// Next compiled tag, `None` at end of input
    pub fn next_tag(&mut self) -> Result<Option<Tag>> {
        let tag = match self.next_raw()? {
            Some(tag) => tag,
            None => return Ok(None),
        };
        if !is_point_code(tag.code) {
            return Ok(Some(tag));
        }

        let code = tag.code;
        let x = self.coordinate(&tag)?;
        let y = match self.next_raw()? {
            Some(next) if next.code == code + 10 => self.coordinate(&next)?,
            _ => {
                return Err(DxfError::parse(
                    self.reader.line_number(),
                    format!("missing y coordinate for group code {}", code),
                ))
            }
        };
        match self.next_raw()? {
            Some(next) if next.code == code + 20 => {
                let z = self.coordinate(&next)?;
                Ok(Some(Tag::point3(code, Vector3::new(x, y, z))))
            }
            other => {
                self.peeked = other;
                Ok(Some(Tag::point2(code, Vector2::new(x, y))))
            }
        }
    }

    /// Compile the whole stream.
    pub fn compile_all(mut self) -> Result<Vec<Tag>> {
        let mut tags = Vec::new();
        while let Some(tag) = self.next_tag()? {
            tags.push(tag);
        }
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::super::text_reader::DxfTextReader;
    use super::*;

    fn compile(data: &str, keep_comments: bool) -> Result<Vec<Tag>> {
        let mut reader = DxfTextReader::new(data.as_bytes());
        TagCompiler::new(&mut reader, keep_comments).compile_all()
    }

    #[test]
    fn test_point3() {
        let tags = compile("10\n1.0\n20\n2.0\n30\n3.0\n", false).unwrap();
        assert_eq!(tags, vec![Tag::point3(10, Vector3::new(1.0, 2.0, 3.0))]);
    }

    #[test]
    fn test_point2_followed_by_other_tag() {
        let tags = compile("10\n1.0\n20\n2.0\n40\n5.0\n", false).unwrap();
        assert_eq!(tags[0], Tag::point2(10, Vector2::new(1.0, 2.0)));
        assert_eq!(tags[1], Tag::double(40, 5.0));
    }

    #[test]
    fn test_missing_y_is_parse_error() {
        let err = compile("10\n1.0\n30\n3.0\n", false).unwrap_err();
        assert!(matches!(err, DxfError::Parse { .. }));
        assert!(compile("11\n1.0\n", false).is_err());
    }

    #[test]
    fn test_comments() {
        let data = "999\nhello\n0\nEOF\n";
        assert_eq!(compile(data, false).unwrap().len(), 1);
        let kept = compile(data, true).unwrap();
        assert_eq!(kept[0], Tag::string(999, "hello"));
    }

    #[test]
    fn test_xdata_points() {
        let tags = compile("1010\n1\n1020\n2\n1030\n3\n", false).unwrap();
        assert_eq!(tags[0].as_point(), Some(Vector3::new(1.0, 2.0, 3.0)));
    }
}
