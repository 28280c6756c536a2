//! Layouts
//!
//! A layout is a named view on a layout block: "Model" on `*Model_Space`,
//! paperspace layouts on `*Paper_Space`, `*Paper_Space0`, ... The active
//! paperspace layout is always the one on `*Paper_Space`. R2000+ documents
//! describe each layout by a LAYOUT object registered in the
//! `ACAD_LAYOUT` dictionary; R12 documents have exactly one paperspace.

use crate::blocks::{
    is_active_paperspace_name, is_paperspace_name, BlockLayout, PAPER_SPACE,
};
use crate::document::{setup, CadDocument};
use crate::entities::{DxfEntity, EntityKind};
use crate::entity_db::EntityId;
use crate::error::{DxfError, Result};
use crate::objects::{dictionary_remove, dictionary_rename, ACAD_LAYOUT};
use crate::types::Handle;
use indexmap::IndexMap;
use tracing::debug;

pub const MODEL: &str = "Model";

/// Layout
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub name: String,
    /// BLOCK_RECORD of the layout block
    pub block_record: Handle,
    /// LAYOUT object, `None` for R12 documents
    pub layout_object: Option<EntityId>,
    pub taborder: i64,
}

impl Layout {
    pub fn is_modelspace(&self) -> bool {
        self.name.eq_ignore_ascii_case(MODEL)
    }
}

/// All layouts, keyed case-insensitively by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layouts {
    layouts: IndexMap<String, Layout>,
}

fn key(name: &str) -> String {
    name.to_lowercase()
}

impl Layouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layout: Layout) -> Result<()> {
        let key = key(&layout.name);
        if self.layouts.contains_key(&key) {
            return Err(DxfError::DuplicateEntry {
                table: "LAYOUT".to_string(),
                name: layout.name,
            });
        }
        self.layouts.insert(key, layout);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.layouts.get(&key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Layout> {
        self.layouts.get_mut(&key(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Layout> {
        self.layouts.shift_remove(&key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layouts.contains_key(&key(name))
    }

    /// Re-key a layout, keeping its position.
    fn rename(&mut self, old: &str, new: &str) {
        self.layouts = std::mem::take(&mut self.layouts)
            .into_iter()
            .map(|(k, mut layout)| {
                if k == key(old) {
                    layout.name = new.to_string();
                    (key(new), layout)
                } else {
                    (k, layout)
                }
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Layouts in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Layout> {
        self.layouts.values()
    }

    /// Layouts sorted by tab order
    pub fn in_tab_order(&self) -> Vec<&Layout> {
        let mut layouts: Vec<&Layout> = self.layouts.values().collect();
        layouts.sort_by_key(|l| l.taborder);
        layouts
    }

    pub fn by_block_record(&self, handle: Handle) -> Option<&Layout> {
        self.layouts.values().find(|l| l.block_record == handle)
    }

    pub fn clear(&mut self) {
        self.layouts.clear();
    }

    fn next_taborder(&self) -> i64 {
        self.layouts.values().map(|l| l.taborder + 1).max().unwrap_or(0)
    }
}

/// Link LAYOUT objects to their blocks and create whatever layouts are
/// missing: "Model", the active paperspace and one layout per paperspace
/// block. Returns the problems found in LAYOUT objects.
pub(crate) fn link_layouts(doc: &mut CadDocument) -> Result<Vec<DxfError>> {
    let mut findings = Vec::new();
    doc.layouts.clear();

    if doc.version.is_legacy() {
        link_legacy(doc)?;
        return Ok(findings);
    }

    let objects: Vec<EntityId> = doc
        .objects
        .iter(&doc.db)
        .filter(|id| doc.db.get(*id).map_or(false, |e| e.kind() == EntityKind::Layout))
        .collect();
    for id in objects {
        let Some(entity) = doc.db.get(id) else { continue };
        let handle = entity.handle().unwrap_or(Handle::NULL);
        let name = entity.get_str("name").unwrap_or_default().to_string();
        let block_record = entity
            .get_handle("block_record_handle")
            .unwrap_or(Handle::NULL);
        let taborder = entity.get_int("taborder").unwrap_or(0);

        if !doc.blocks.contains(block_record) {
            findings.push(DxfError::Reference(format!(
                "LAYOUT '{}' ({}) points to missing block record {}",
                name, handle, block_record
            )));
            drop_layout_object(doc, id, &name);
            continue;
        }
        if doc.layouts.by_block_record(block_record).is_some() {
            findings.push(DxfError::Structure(format!(
                "block record {} has more than one LAYOUT",
                block_record
            )));
            drop_layout_object(doc, id, &name);
            continue;
        }
        let layout = Layout {
            name: name.clone(),
            block_record,
            layout_object: Some(id),
            taborder,
        };
        if let Err(err) = doc.layouts.insert(layout) {
            findings.push(DxfError::Structure(err.to_string()));
            drop_layout_object(doc, id, &name);
        }
    }

    let model = doc.blocks.modelspace().record_handle;
    if doc.layouts.by_block_record(model).is_none() {
        add_layout(doc, MODEL, model, 0)?;
    }
    ensure_active_paperspace(doc)?;

    let paper: Vec<Handle> = doc
        .blocks
        .iter()
        .filter(|b| is_paperspace_name(b.name(&doc.db)))
        .map(|b| b.record_handle)
        .collect();
    for record in paper {
        if doc.layouts.by_block_record(record).is_some() {
            continue;
        }
        let name = free_layout_name(&doc.layouts);
        let taborder = doc.layouts.next_taborder().max(1);
        add_layout(doc, &name, record, taborder)?;
    }
    Ok(findings)
}

fn link_legacy(doc: &mut CadDocument) -> Result<()> {
    let model = doc.blocks.modelspace().record_handle;
    add_layout(doc, MODEL, model, 0)?;
    ensure_active_paperspace(doc)?;
    if let Some(paper) = doc.active_paperspace().map(|b| b.record_handle) {
        add_layout(doc, "Layout1", paper, 1)?;
    }
    Ok(())
}

fn ensure_active_paperspace(doc: &mut CadDocument) -> Result<()> {
    if doc.active_paperspace().is_some() {
        return Ok(());
    }
    let block = doc.setup().block(PAPER_SPACE);
    doc.blocks.insert(block)?;
    debug!("created {} block", PAPER_SPACE);
    Ok(())
}

fn add_layout(
    doc: &mut CadDocument,
    name: &str,
    block_record: Handle,
    taborder: i64,
) -> Result<()> {
    if doc.layouts.contains(name) {
        return Err(DxfError::DuplicateEntry {
            table: "LAYOUT".to_string(),
            name: name.to_string(),
        });
    }
    let layout_object = setup::layout_object(
        &mut doc.db,
        &mut doc.objects,
        doc.version,
        name,
        block_record,
        taborder,
    );
    let layout = Layout {
        name: name.to_string(),
        block_record,
        layout_object,
        taborder,
    };
    doc.layouts.insert(layout)
}

fn free_layout_name(layouts: &Layouts) -> String {
    (1..)
        .map(|n| format!("Layout{}", n))
        .find(|name| !layouts.contains(name))
        .unwrap_or_default()
}

fn drop_layout_object(doc: &mut CadDocument, id: EntityId, name: &str) {
    let handle = doc.handle_of(id);
    doc.db.destroy(id);
    if let Some(dict) = doc.objects.named_object(&doc.db, ACAD_LAYOUT) {
        if let Some(dict) = doc.db.get_mut(dict) {
            if crate::objects::dictionary_get(dict, name) == Some(handle) {
                dictionary_remove(dict, name);
            }
        }
    }
}

impl CadDocument {
    /// The modelspace block
    pub fn modelspace(&self) -> &BlockLayout {
        self.blocks.modelspace()
    }

    /// The `*Paper_Space` block
    pub fn active_paperspace(&self) -> Option<&BlockLayout> {
        self.blocks
            .iter()
            .find(|b| is_active_paperspace_name(b.name(&self.db)))
    }

    /// The layout of the `*Paper_Space` block
    pub fn active_layout(&self) -> Option<&Layout> {
        let record = self.active_paperspace()?.record_handle;
        self.layouts.by_block_record(record)
    }

    /// Layout by case-insensitive name
    pub fn layout(&self, name: &str) -> Result<&Layout> {
        self.layouts
            .get(name)
            .ok_or_else(|| DxfError::KeyNotFound(format!("layout '{}'", name)))
    }

    /// Layout names in tab order
    pub fn layout_names(&self) -> Vec<&str> {
        self.layouts
            .in_tab_order()
            .into_iter()
            .map(|l| l.name.as_str())
            .collect()
    }

    /// Live entities of a layout
    pub fn layout_entities(&self, name: &str) -> Result<impl Iterator<Item = &DxfEntity>> {
        let record = self.layout(name)?.block_record;
        let block = self
            .blocks
            .get(record)
            .ok_or_else(|| DxfError::KeyNotFound(format!("block record {}", record)))?;
        Ok(block.entities.entities(&self.db))
    }

    /// New paperspace layout; returns the handle of its block record.
    pub fn new_layout(&mut self, name: &str) -> Result<Handle> {
        if self.version.is_legacy() {
            return Err(DxfError::InvalidOperation(format!(
                "{} supports a single paperspace layout",
                self.version
            )));
        }
        if self.layouts.contains(name) {
            return Err(DxfError::DuplicateEntry {
                table: "LAYOUT".to_string(),
                name: name.to_string(),
            });
        }
        let block_name = (0..)
            .map(|n| format!("{}{}", PAPER_SPACE, n))
            .find(|candidate| self.is_free_block_name(candidate))
            .unwrap_or_default();
        let block = self.setup().block(&block_name);
        let record = block.record_handle;
        self.blocks.insert(block)?;
        let taborder = self.layouts.next_taborder();
        add_layout(self, name, record, taborder)?;
        debug!(layout = name, block = %block_name, "new layout");
        Ok(record)
    }

    fn is_free_block_name(&self, candidate: &str) -> bool {
        !self
            .tables
            .get(crate::tables::TableKind::BlockRecord)
            .names()
            .any(|n| n.eq_ignore_ascii_case(candidate))
    }

    pub fn rename_layout(&mut self, old: &str, new: &str) -> Result<()> {
        let layout = self.layout(old)?;
        if layout.is_modelspace() || new.eq_ignore_ascii_case(MODEL) {
            return Err(DxfError::InvalidOperation(
                "the modelspace layout cannot be renamed".to_string(),
            ));
        }
        let old_name = layout.name.clone();
        let object = layout.layout_object;
        if !old.eq_ignore_ascii_case(new) && self.layouts.contains(new) {
            return Err(DxfError::DuplicateEntry {
                table: "LAYOUT".to_string(),
                name: new.to_string(),
            });
        }
        if let Some(entity) = object.and_then(|id| self.db.get_mut(id)) {
            entity.set("name", new)?;
        }
        if let Some(dict) = self.objects.named_object(&self.db, ACAD_LAYOUT) {
            if let Some(dict) = self.db.get_mut(dict) {
                dictionary_rename(dict, &old_name, new);
            }
        }
        self.layouts.rename(&old_name, new);
        Ok(())
    }

    /// Make a paperspace layout the active one by swapping block names
    /// with the current `*Paper_Space` block.
    pub fn set_active_layout(&mut self, name: &str) -> Result<()> {
        let layout = self.layout(name)?;
        if layout.is_modelspace() {
            return Err(DxfError::InvalidOperation(
                "the modelspace layout cannot be the active paperspace".to_string(),
            ));
        }
        let target = layout.block_record;
        let active = self
            .active_paperspace()
            .map(|b| b.record_handle)
            .ok_or_else(|| DxfError::Structure("no active paperspace block".to_string()))?;
        if target == active {
            return Ok(());
        }
        let target_name = self
            .blocks
            .get(target)
            .map(|b| b.name(&self.db).to_string())
            .ok_or_else(|| DxfError::KeyNotFound(format!("block record {}", target)))?;
        let active_name = self
            .blocks
            .get(active)
            .map(|b| b.name(&self.db).to_string())
            .unwrap_or_else(|| PAPER_SPACE.to_string());

        let temp = format!("{}$swap", PAPER_SPACE);
        self.rename_block(target, &temp)?;
        self.rename_block(active, &target_name)?;
        self.rename_block(target, &active_name)?;
        debug!(layout = name, "activated layout");
        Ok(())
    }

    /// Delete a paperspace layout together with its block.
    pub fn delete_layout(&mut self, name: &str) -> Result<()> {
        let layout = self.layout(name)?.clone();
        if layout.is_modelspace() {
            return Err(DxfError::InvalidOperation(
                "the modelspace layout cannot be deleted".to_string(),
            ));
        }
        let paper: Vec<Layout> = self
            .layouts
            .in_tab_order()
            .into_iter()
            .filter(|l| !l.is_modelspace())
            .cloned()
            .collect();
        if paper.len() < 2 {
            return Err(DxfError::InvalidOperation(
                "the last paperspace layout cannot be deleted".to_string(),
            ));
        }

        if self.active_layout().map(|l| l.block_record) == Some(layout.block_record) {
            let pos = paper
                .iter()
                .position(|l| l.block_record == layout.block_record)
                .unwrap_or(0);
            let next = paper
                .get(pos + 1)
                .or_else(|| pos.checked_sub(1).and_then(|p| paper.get(p)));
            if let Some(next) = next {
                self.set_active_layout(&next.name)?;
            }
        }

        if let Some(block) = self.blocks.remove(layout.block_record) {
            let block_name = block.name(&self.db).to_string();
            self.tables
                .get_mut(crate::tables::TableKind::BlockRecord)
                .remove(&block_name);
            let ids = block
                .entities
                .raw_ids()
                .iter()
                .copied()
                .chain([block.block, block.endblk, block.block_record]);
            for id in ids.collect::<Vec<_>>() {
                self.db.destroy(id);
            }
        }
        if let Some(id) = layout.layout_object {
            drop_layout_object(self, id, &layout.name);
        }
        self.layouts.remove(&layout.name);
        debug!(layout = name, "deleted layout");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DxfVersion;

    #[test]
    fn test_default_layouts() {
        let doc = CadDocument::new();
        assert_eq!(doc.layout_names(), vec!["Model", "Layout1"]);
        let active = doc.active_layout().unwrap();
        assert_eq!(active.name, "Layout1");
        assert!(doc.layout("MODEL").unwrap().is_modelspace());
        assert!(matches!(doc.layout("nope"), Err(DxfError::KeyNotFound(_))));
    }

    #[test]
    fn test_duplicate_layout_name_creates_no_object() {
        let mut doc = CadDocument::new();
        let objects = doc.objects.space.len();
        let record = doc.active_paperspace().unwrap().record_handle;
        assert!(matches!(
            add_layout(&mut doc, "layout1", record, 5),
            Err(DxfError::DuplicateEntry { .. })
        ));
        assert_eq!(doc.objects.space.len(), objects);
        assert_eq!(doc.layout_names(), vec!["Model", "Layout1"]);
    }

    #[test]
    fn test_relinking_is_stable() {
        let mut doc = CadDocument::new();
        let objects = doc.objects.space.len();
        let findings = link_layouts(&mut doc).unwrap();
        assert!(findings.is_empty());
        assert_eq!(doc.layout_names(), vec!["Model", "Layout1"]);
        assert_eq!(doc.objects.space.len(), objects);
        assert!(doc.active_layout().is_some());
    }

    #[test]
    fn test_legacy_layouts_have_no_objects() {
        let mut doc = CadDocument::with_version(DxfVersion::AC1009);
        assert_eq!(doc.layout_names(), vec!["Model", "Layout1"]);
        assert!(doc.layout("Model").unwrap().layout_object.is_none());
        assert!(doc.new_layout("Second").is_err());
    }

    #[test]
    fn test_new_and_rename_layout() {
        let mut doc = CadDocument::new();
        let record = doc.new_layout("Sheet").unwrap();
        assert_eq!(doc.blocks.get(record).unwrap().name(doc.db()), "*Paper_Space0");
        assert!(matches!(
            doc.new_layout("sheet"),
            Err(DxfError::DuplicateEntry { .. })
        ));

        doc.rename_layout("Sheet", "Plan").unwrap();
        assert_eq!(doc.layout_names(), vec!["Model", "Layout1", "Plan"]);
        let object = doc.layout("plan").unwrap().layout_object.unwrap();
        assert_eq!(doc.entity(object).unwrap().get_str("name"), Some("Plan"));
        assert!(doc.rename_layout("Model", "Other").is_err());
    }

    #[test]
    fn test_set_active_layout_swaps_blocks() {
        let mut doc = CadDocument::new();
        let record = doc.new_layout("Sheet").unwrap();
        doc.add_to_layout("Sheet", doc.new_entity("CIRCLE")).unwrap();
        doc.set_active_layout("Sheet").unwrap();

        assert_eq!(doc.active_layout().unwrap().name, "Sheet");
        assert_eq!(doc.active_paperspace().unwrap().record_handle, record);
        assert_eq!(doc.layout_entities("Sheet").unwrap().count(), 1);
        assert!(doc.block("*Paper_Space0").is_some());
    }

    #[test]
    fn test_delete_active_layout_promotes_next() {
        let mut doc = CadDocument::new();
        doc.new_layout("Sheet").unwrap();
        doc.delete_layout("Layout1").unwrap();

        assert_eq!(doc.layout_names(), vec!["Model", "Sheet"]);
        assert_eq!(doc.active_layout().unwrap().name, "Sheet");
        assert!(doc.delete_layout("Sheet").is_err());
        assert!(doc.delete_layout("Model").is_err());
    }
}
