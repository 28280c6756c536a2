//! HEADER section variables

use crate::error::{DxfError, Result};
use crate::tags::group_code::VARIABLE_NAME;
use crate::tags::Tag;
use crate::types::Handle;
use indexmap::IndexMap;

/// Header variables in file order, `$NAME → value tags`
///
/// Most variables carry one tag; point variables like `$EXTMIN` carry one
/// point tag and a few (e.g. `$CUSTOMPROPERTY...`) several.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderSection {
    vars: IndexMap<String, Vec<Tag>>,
}

impl HeaderSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the content tags of the HEADER section.
    pub fn from_tags(tags: Vec<Tag>) -> Result<Self> {
        let mut header = Self::new();
        let mut current: Option<String> = None;
        for tag in tags {
            if tag.code == VARIABLE_NAME {
                let name = tag.as_str().unwrap_or_default().to_string();
                header.vars.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }
            match &current {
                Some(name) => header.vars.entry(name.clone()).or_default().push(tag),
                None => {
                    return Err(DxfError::Structure(format!(
                        "header value {} without variable name",
                        tag
                    )))
                }
            }
        }
        Ok(header)
    }

    pub fn get(&self, name: &str) -> Option<&[Tag]> {
        self.vars.get(name).map(|v| v.as_slice())
    }

    /// First value tag of a variable
    pub fn value(&self, name: &str) -> Option<&Tag> {
        self.vars.get(name).and_then(|v| v.first())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Tag::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Tag::as_int)
    }

    pub fn get_handle(&self, name: &str) -> Option<Handle> {
        self.value(name).and_then(Tag::as_handle)
    }

    pub fn set(&mut self, name: impl Into<String>, tags: Vec<Tag>) {
        self.vars.insert(name.into(), tags);
    }

    /// Set a single-tag variable
    pub fn set_value(&mut self, name: impl Into<String>, tag: Tag) {
        self.vars.insert(name.into(), vec![tag]);
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<Tag>> {
        self.vars.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// `$HANDSEED`, the next free handle as stored in the file
    pub fn handseed(&self) -> Option<Handle> {
        self.get_handle("$HANDSEED")
    }

    pub fn export_tags(&self, out: &mut Vec<Tag>) {
        for (name, tags) in &self.vars {
            out.push(Tag::string(VARIABLE_NAME, name.clone()));
            out.extend(tags.iter().cloned());
        }
    }
}
