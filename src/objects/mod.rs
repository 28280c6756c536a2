//! OBJECTS section
//!
//! Non-graphical objects in file order. The first object is the root
//! dictionary, owner of the named object dictionaries (`ACAD_LAYOUT`,
//! `ACAD_GROUP`, ...).
//!
//! Dictionary entries are kept as raw `3/<key>` + `350/<handle>` (or
//! `360/<handle>` for hard owned entries) tag pairs inside the
//! `AcDbDictionary` subclass.

use crate::entities::{DxfEntity, EntityKind, EntitySpace, Slot};
use crate::entity_db::{EntityDb, EntityId};
use crate::tags::Tag;
use crate::types::Handle;

pub const DICTIONARY_MARKER: &str = "AcDbDictionary";
pub const ACAD_LAYOUT: &str = "ACAD_LAYOUT";

const KEY_CODE: i32 = 3;
const SOFT_OWNER_CODE: i32 = 350;
const HARD_OWNER_CODE: i32 = 360;

/// The OBJECTS section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectsSection {
    pub space: EntitySpace,
    root_dict: Option<EntityId>,
}

impl ObjectsSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_dict(&self) -> Option<EntityId> {
        self.root_dict
    }

    pub fn set_root_dict(&mut self, id: EntityId) {
        self.root_dict = Some(id);
    }

    pub fn push(&mut self, id: EntityId) {
        self.space.push(id);
    }

    pub fn iter<'a>(&'a self, db: &'a EntityDb) -> impl Iterator<Item = EntityId> + 'a {
        self.space.iter(db)
    }

    /// Raw length including destroyed objects
    pub fn len(&self) -> usize {
        self.space.len()
    }

    pub fn is_empty(&self) -> bool {
        self.space.is_empty()
    }

    /// Entry `key` of the root dictionary
    pub fn named_object(&self, db: &EntityDb, key: &str) -> Option<EntityId> {
        let root = db.get(self.root_dict?)?;
        dictionary_get(root, key).and_then(|h| db.resolve(h))
    }
}

/// `(key, handle)` pairs of a DICTIONARY in file order
pub fn dictionary_entries(dict: &DxfEntity) -> Vec<(String, Handle)> {
    let mut entries = Vec::new();
    let mut key: Option<String> = None;
    for tag in dict.raw_tags(marker(dict)) {
        match tag.code {
            KEY_CODE => key = tag.as_str().map(str::to_string),
            SOFT_OWNER_CODE | HARD_OWNER_CODE => {
                if let (Some(k), Some(h)) = (key.take(), tag.as_handle()) {
                    entries.push((k, h));
                }
            }
            _ => {}
        }
    }
    entries
}

pub fn dictionary_get(dict: &DxfEntity, key: &str) -> Option<Handle> {
    dictionary_entries(dict)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, h)| h)
}

/// Add or replace a dictionary entry.
pub fn dictionary_set(dict: &mut DxfEntity, key: &str, handle: Handle) {
    let code = if dict.get_int("hard_owned").unwrap_or(0) != 0 {
        HARD_OWNER_CODE
    } else {
        SOFT_OWNER_CODE
    };
    dictionary_remove(dict, key);
    let marker = marker(dict).map(str::to_string);
    dict.push_tag(marker.as_deref(), Tag::string(KEY_CODE, key));
    dict.push_tag(marker.as_deref(), Tag::handle(code, handle));
}

/// Remove entry `key`; returns the handle it pointed to.
pub fn dictionary_remove(dict: &mut DxfEntity, key: &str) -> Option<Handle> {
    let marker = marker(dict).map(str::to_string);
    let subclass = dict.subclass_mut(marker.as_deref())?;
    let slots = &mut subclass.slots;
    let start = slots.iter().position(|slot| {
        matches!(slot, Slot::Tag(t) if t.code == KEY_CODE && t.as_str() == Some(key))
    })?;
    let value = slots[start + 1..].iter().position(|slot| {
        matches!(slot, Slot::Tag(t) if t.code == SOFT_OWNER_CODE || t.code == HARD_OWNER_CODE)
    });
    let handle = value.and_then(|offset| match &slots[start + 1 + offset] {
        Slot::Tag(t) => t.as_handle(),
        _ => None,
    });
    if let Some(offset) = value {
        slots.remove(start + 1 + offset);
    }
    slots.remove(start);
    handle
}

/// Rename entry `old` to `new`, keeping its position.
pub fn dictionary_rename(dict: &mut DxfEntity, old: &str, new: &str) -> bool {
    let marker = marker(dict).map(str::to_string);
    let Some(subclass) = dict.subclass_mut(marker.as_deref()) else {
        return false;
    };
    for slot in subclass.slots.iter_mut() {
        if let Slot::Tag(tag) = slot {
            if tag.code == KEY_CODE && tag.as_str() == Some(old) {
                *tag = Tag::string(KEY_CODE, new);
                return true;
            }
        }
    }
    false
}

fn marker(dict: &DxfEntity) -> Option<&'static str> {
    if dict.is_legacy() || dict.kind() != EntityKind::Dictionary {
        None
    } else {
        Some(DICTIONARY_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DxfVersion;

    fn dict() -> DxfEntity {
        DxfEntity::from_tags(
            vec![
                Tag::string(0, "DICTIONARY"),
                Tag::string(5, "C"),
                Tag::string(330, "0"),
                Tag::string(100, "AcDbDictionary"),
                Tag::int(281, 1),
                Tag::string(3, "ACAD_GROUP"),
                Tag::string(350, "D"),
                Tag::string(3, "ACAD_LAYOUT"),
                Tag::string(350, "1A"),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_entries_in_order() {
        let d = dict();
        assert_eq!(
            dictionary_entries(&d),
            vec![
                ("ACAD_GROUP".to_string(), Handle::new(0xD)),
                ("ACAD_LAYOUT".to_string(), Handle::new(0x1A)),
            ]
        );
        assert_eq!(dictionary_get(&d, "ACAD_LAYOUT"), Some(Handle::new(0x1A)));
    }

    #[test]
    fn test_set_and_remove() {
        let mut d = dict();
        dictionary_set(&mut d, "ACAD_GROUP", Handle::new(0x40));
        assert_eq!(dictionary_get(&d, "ACAD_GROUP"), Some(Handle::new(0x40)));
        assert_eq!(dictionary_entries(&d).len(), 2);
        assert_eq!(dictionary_remove(&mut d, "ACAD_LAYOUT"), Some(Handle::new(0x1A)));
        assert_eq!(dictionary_remove(&mut d, "ACAD_LAYOUT"), None);
        let out = d.export_tags(DxfVersion::AC1015);
        assert_eq!(out[out.len() - 2], Tag::string(3, "ACAD_GROUP"));
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut d = dict();
        assert!(dictionary_rename(&mut d, "ACAD_GROUP", "MY_GROUPS"));
        assert_eq!(dictionary_entries(&d)[0].0, "MY_GROUPS");
        assert!(!dictionary_rename(&mut d, "missing", "x"));
    }
}
