//! CAD document structure
//!
//! [`CadDocument`] owns every entity of a drawing in one [`EntityDb`];
//! sections, tables, blocks and layouts hold ids into it.

pub(crate) mod setup;

pub(crate) use setup::Setup;

use crate::blocks::{
    BlockDefinitionIndex, BlockLayout, BlockRef, BlockReferenceCounter, BlocksSection,
    DanglingReference, ReferenceRule, MODEL_SPACE,
};
use crate::entities::{DxfEntity, EntityKind, EntitySpace};
use crate::entity_db::{EntityDb, EntityId};
use crate::error::{DxfError, Result};
use crate::header::HeaderSection;
use crate::io::dxf::code_page::DEFAULT_CODE_PAGE;
use crate::layouts::{self, Layouts};
use crate::notification::NotificationCollection;
use crate::objects::{ObjectsSection, ACAD_LAYOUT};
use crate::tables::{TableKind, Tables};
use crate::tags::Tag;
use crate::types::{DxfVersion, Handle};
use encoding_rs::Encoding;
use std::path::PathBuf;
use tracing::debug;

/// A section the library does not interpret (THUMBNAILIMAGE,
/// ACDSDATA, ...), written back unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct RawSection {
    pub name: String,
    /// Content tags between `2/<name>` and `0/ENDSEC`
    pub tags: Vec<Tag>,
    /// Name of the section it followed in the file
    pub after: Option<String>,
}

/// CAD document
#[derive(Debug)]
pub struct CadDocument {
    /// Revision used when saving
    pub version: DxfVersion,
    /// Text encoding of pre-R2007 output
    pub encoding: &'static Encoding,
    pub header: HeaderSection,
    /// CLASS entities in file order
    pub classes: EntitySpace,
    pub tables: Tables,
    pub blocks: BlocksSection,
    pub layouts: Layouts,
    pub objects: ObjectsSection,
    /// Findings recorded while loading
    pub notifications: NotificationCollection,
    pub unknown_sections: Vec<RawSection>,
    /// Source file, if loaded from disk
    pub filename: Option<PathBuf>,
    pub(crate) db: EntityDb,
    block_index: BlockDefinitionIndex,
    block_refs: BlockReferenceCounter,
}

impl CadDocument {
    /// Create a new empty CAD document
    pub fn new() -> Self {
        Self::with_version(DxfVersion::AC1032)
    }

    /// Create a document with a specific version
    pub fn with_version(version: DxfVersion) -> Self {
        let mut db = EntityDb::new();
        let mut tables = Tables::new();
        let mut setup = Setup::new(&mut db, &mut tables, version);
        setup.table_heads();
        setup.required_entries();
        let model = setup.block(MODEL_SPACE);
        let blocks = BlocksSection::new(model);

        let mut header = HeaderSection::new();
        header.set_value("$ACADVER", Tag::string(1, version.as_str()));
        header.set_value("$DWGCODEPAGE", Tag::string(3, DEFAULT_CODE_PAGE));
        header.set_value("$HANDSEED", Tag::handle(5, Handle::NULL));

        let mut doc = Self::from_parts(
            version,
            header,
            EntitySpace::new(),
            tables,
            blocks,
            ObjectsSection::new(),
            db,
        );
        setup::objects_structure(&mut doc.db, &mut doc.objects, version);
        // creates *Paper_Space; names and records of a fresh document are unique
        layouts::link_layouts(&mut doc)
            .expect("layouts of a new document never collide");
        doc.rebuild_block_index();
        doc
    }

    pub(crate) fn from_parts(
        version: DxfVersion,
        header: HeaderSection,
        classes: EntitySpace,
        tables: Tables,
        blocks: BlocksSection,
        objects: ObjectsSection,
        db: EntityDb,
    ) -> Self {
        let encoding = if version.uses_utf8() {
            encoding_rs::UTF_8
        } else {
            encoding_rs::WINDOWS_1252
        };
        Self {
            version,
            encoding,
            header,
            classes,
            tables,
            blocks,
            layouts: Layouts::new(),
            objects,
            notifications: NotificationCollection::new(),
            unknown_sections: Vec::new(),
            filename: None,
            db,
            block_index: BlockDefinitionIndex::new(),
            block_refs: BlockReferenceCounter::new(),
        }
    }

    pub fn db(&self) -> &EntityDb {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut EntityDb {
        &mut self.db
    }

    pub(crate) fn setup(&mut self) -> Setup<'_> {
        Setup::new(&mut self.db, &mut self.tables, self.version)
    }

    // ==================== Lookup ====================

    /// Live entity for `handle`
    pub fn resolve(&self, handle: Handle) -> Result<&DxfEntity> {
        let id = self.db.try_resolve(handle)?;
        self.db
            .get(id)
            .ok_or_else(|| DxfError::HandleNotFound(handle.to_hex()))
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Result<&mut DxfEntity> {
        let id = self.db.try_resolve(handle)?;
        self.db
            .get_mut(id)
            .ok_or_else(|| DxfError::HandleNotFound(handle.to_hex()))
    }

    pub fn entity(&self, id: EntityId) -> Option<&DxfEntity> {
        self.db.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut DxfEntity> {
        self.db.get_mut(id)
    }

    /// Handle of an entity, NULL if it has none
    pub fn handle_of(&self, id: EntityId) -> Handle {
        self.db
            .get(id)
            .and_then(|e| e.handle())
            .unwrap_or(Handle::NULL)
    }

    /// Table entry by exact name
    pub fn by_name(&self, kind: TableKind, name: &str) -> Result<&DxfEntity> {
        self.tables
            .get(kind)
            .get(name)
            .filter(|id| self.db.is_alive(*id))
            .and_then(|id| self.db.get(id))
            .ok_or_else(|| DxfError::KeyNotFound(format!("{} '{}'", kind.dxf_name(), name)))
    }

    /// Block definition by exact name
    pub fn block(&self, name: &str) -> Option<&BlockLayout> {
        self.blocks
            .iter()
            .find(|b| self.db.is_alive(b.block_record) && b.name(&self.db) == name)
    }

    fn block_record_by_name(&self, name: &str) -> Result<Handle> {
        self.block(name)
            .map(|b| b.record_handle)
            .ok_or_else(|| DxfError::KeyNotFound(format!("block '{}'", name)))
    }

    // ==================== Block references ====================

    /// Refresh the block definition index and the reference counts.
    ///
    /// Both are derived data and go stale whenever entities change.
    pub fn rebuild_block_index(&mut self) {
        self.block_index.rebuild(&self.blocks, &self.db);
        let mut counter = std::mem::take(&mut self.block_refs);
        counter.rebuild(self);
        self.block_refs = counter;
    }

    pub fn block_index(&self) -> &BlockDefinitionIndex {
        &self.block_index
    }

    /// References to a block by name or BLOCK_RECORD handle, as counted by
    /// the last [`rebuild_block_index`](Self::rebuild_block_index)
    pub fn reference_count(&self, block: impl Into<BlockRef>) -> usize {
        self.block_refs.get(&block.into())
    }

    pub fn block_references(&self) -> &BlockReferenceCounter {
        &self.block_refs
    }

    pub fn dangling_block_references(&self) -> &[DanglingReference] {
        self.block_refs.dangling()
    }

    /// Extend reference counting by an application specific rule.
    pub fn add_reference_rule(&mut self, rule: Box<dyn ReferenceRule>) {
        self.block_refs.add_rule(rule);
    }

    /// Names of blocks nothing refers to, layout blocks excluded
    pub fn find_unreferenced_blocks(&self) -> std::collections::BTreeSet<String> {
        crate::blocks::find_unreferenced_blocks(self)
    }

    // ==================== Sections ====================

    /// Lazy, restartable iteration over the entities of a section:
    /// CLASSES, TABLES, BLOCKS, ENTITIES or OBJECTS.
    pub fn iterate_section(&self, name: &str) -> Result<SectionIter<'_>> {
        let ids = self
            .section_ids(name)
            .ok_or_else(|| DxfError::KeyNotFound(format!("section '{}'", name)))?;
        Ok(SectionIter {
            db: &self.db,
            ids,
            pos: 0,
        })
    }

    /// Entity ids of a section in file order, destroyed ones included
    pub(crate) fn section_ids(&self, name: &str) -> Option<Vec<EntityId>> {
        let mut ids = Vec::new();
        match name.to_ascii_uppercase().as_str() {
            "CLASSES" => ids.extend_from_slice(self.classes.raw_ids()),
            "TABLES" => {
                for table in self.tables.iter() {
                    ids.extend(table.head());
                    ids.extend(table.ids());
                }
            }
            "BLOCKS" => {
                let active = self.active_paperspace().map(|b| b.record_handle);
                for block in self.blocks.iter() {
                    ids.push(block.block);
                    let body_in_entities = block.record_handle
                        == self.blocks.modelspace().record_handle
                        || Some(block.record_handle) == active;
                    if !body_in_entities {
                        ids.extend_from_slice(block.entities.raw_ids());
                    }
                    ids.push(block.endblk);
                }
            }
            "ENTITIES" => {
                ids.extend_from_slice(self.blocks.modelspace().entities.raw_ids());
                if let Some(paper) = self.active_paperspace() {
                    ids.extend_from_slice(paper.entities.raw_ids());
                }
            }
            "OBJECTS" => ids.extend_from_slice(self.objects.space.raw_ids()),
            _ => return None,
        }
        Some(ids)
    }

    // ==================== Editing ====================

    /// New unattached entity for this document's revision
    pub fn new_entity(&self, dxftype: &str) -> DxfEntity {
        DxfEntity::new(dxftype, self.version)
    }

    /// Add a table entry with default attributes.
    pub fn new_table_entry(&mut self, kind: TableKind, name: &str) -> Result<Handle> {
        if kind == TableKind::BlockRecord {
            return Err(DxfError::InvalidOperation(
                "block records are created by new_block".to_string(),
            ));
        }
        if self.tables.get(kind).contains(name) {
            return Err(DxfError::DuplicateEntry {
                table: kind.dxf_name().to_string(),
                name: name.to_string(),
            });
        }
        let id = self.setup().entry(kind, name);
        Ok(self.handle_of(id))
    }

    /// New empty block definition; returns the BLOCK_RECORD handle.
    pub fn new_block(&mut self, name: &str) -> Result<Handle> {
        if self.tables.get(TableKind::BlockRecord).contains(name) {
            return Err(DxfError::DuplicateEntry {
                table: TableKind::BlockRecord.dxf_name().to_string(),
                name: name.to_string(),
            });
        }
        let block = self.setup().block(name);
        let handle = block.record_handle;
        self.blocks.insert(block)?;
        debug!(block = name, handle = %handle, "new block");
        Ok(handle)
    }

    /// Add `entity` to the layout `layout`; returns its handle.
    pub fn add_to_layout(&mut self, layout: &str, entity: DxfEntity) -> Result<Handle> {
        let record = self.layout(layout)?.block_record;
        self.add_to_block_record(record, entity)
    }

    /// Add `entity` to the block definition `block`; returns its handle.
    pub fn add_to_block(&mut self, block: &str, entity: DxfEntity) -> Result<Handle> {
        let record = self.block_record_by_name(block)?;
        self.add_to_block_record(record, entity)
    }

    pub(crate) fn add_to_block_record(
        &mut self,
        record: Handle,
        mut entity: DxfEntity,
    ) -> Result<Handle> {
        if !is_graphical(entity.kind()) {
            return Err(DxfError::InvalidOperation(format!(
                "{} is not a graphical entity",
                entity.dxftype()
            )));
        }
        let block = self
            .blocks
            .get(record)
            .ok_or_else(|| DxfError::KeyNotFound(format!("block record {}", record)))?;
        let paperspace = crate::blocks::is_paperspace_name(block.name(&self.db));
        if entity.is_supported("owner") {
            entity.set_owner(record)?;
        }
        if paperspace && entity.is_supported("paperspace") {
            entity.set("paperspace", 1)?;
        }
        let id = self.db.add(entity)?;
        if let Some(block) = self.blocks.get_mut(record) {
            block.entities.push(id);
        }
        Ok(self.handle_of(id))
    }

    /// Destroy an entity together with the sub-entities following it
    /// (ATTRIB, VERTEX, SEQEND).
    ///
    /// The entity stays in its container until [`purge`](Self::purge).
    ///
    /// Document structure cannot be deleted this way: table heads, block
    /// records, BLOCK/ENDBLK entities, LAYOUT objects and the layout and
    /// root dictionaries. Use [`delete_layout`](Self::delete_layout) for
    /// layouts.
    pub fn delete_entity(&mut self, handle: Handle) -> Result<()> {
        let id = self.db.try_resolve(handle)?;
        if let Some(role) = self.structural_role(id) {
            return Err(DxfError::InvalidOperation(format!(
                "{} {} is part of the document structure",
                role, handle
            )));
        }
        let mut doomed = vec![id];
        if let Some(block) = self.blocks.owner_of(id) {
            let ids = block.entities.raw_ids();
            if let Some(pos) = ids.iter().position(|e| *e == id) {
                doomed.extend(
                    ids[pos + 1..]
                        .iter()
                        .take_while(|sub| {
                            self.db
                                .get(**sub)
                                .map_or(false, |e| e.kind().is_sub_entity())
                        })
                        .copied(),
                );
            }
        }
        for id in doomed {
            self.db.destroy(id);
        }
        Ok(())
    }

    fn structural_role(&self, id: EntityId) -> Option<&'static str> {
        let kind = self.db.get(id)?.kind();
        match kind {
            EntityKind::TableHead => Some("table head"),
            EntityKind::BlockRecord => Some("block record"),
            EntityKind::Block | EntityKind::EndBlk => Some("block definition marker"),
            EntityKind::Layout => Some("layout object"),
            EntityKind::Dictionary
                if self.objects.root_dict() == Some(id)
                    || self.objects.named_object(&self.db, ACAD_LAYOUT) == Some(id) =>
            {
                Some("dictionary")
            }
            _ => None,
        }
    }

    /// Drop destroyed entities from every container and the handle index;
    /// returns the number of container slots removed.
    pub fn purge(&mut self) -> usize {
        let db = &self.db;
        let mut removed = self.classes.purge(db) + self.objects.space.purge(db);
        for block in self.blocks.iter_mut() {
            removed += block.entities.purge(db);
        }
        for table in self.tables.iter_mut() {
            let before = table.len();
            table.purge(db);
            removed += before - table.len();
        }
        self.db.rebuild();
        debug!(removed, "purged destroyed entities");
        removed
    }

    /// Re-derive the handle index from the entity store.
    pub fn rebuild_handles(&mut self) {
        self.db.rebuild();
    }

    /// Rename a block definition: BLOCK_RECORD entry and BLOCK entity.
    pub(crate) fn rename_block(&mut self, record: Handle, new_name: &str) -> Result<()> {
        let block = self
            .blocks
            .get(record)
            .ok_or_else(|| DxfError::KeyNotFound(format!("block record {}", record)))?;
        let (record_id, block_id) = (block.block_record, block.block);
        let old_name = block.name(&self.db).to_string();
        self.tables
            .get_mut(TableKind::BlockRecord)
            .rename(&old_name, new_name)?;
        if let Some(entity) = self.db.get_mut(record_id) {
            entity.set("name", new_name)?;
        }
        if let Some(entity) = self.db.get_mut(block_id) {
            entity.set("name", new_name)?;
            if entity.get("name2").is_some() {
                entity.set("name2", new_name)?;
            }
        }
        Ok(())
    }
}

impl Default for CadDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn is_graphical(kind: EntityKind) -> bool {
    !kind.is_table_entry()
        && !matches!(
            kind,
            EntityKind::TableHead
                | EntityKind::Class
                | EntityKind::Dictionary
                | EntityKind::Layout
                | EntityKind::XRecord
                | EntityKind::Block
                | EntityKind::EndBlk
        )
}

/// Restartable iterator over the live entities of one section
#[derive(Debug, Clone)]
pub struct SectionIter<'a> {
    db: &'a EntityDb,
    ids: Vec<EntityId>,
    pos: usize,
}

impl<'a> SectionIter<'a> {
    /// Start over from the first entity.
    pub fn restart(&mut self) {
        self.pos = 0;
    }
}

impl<'a> Iterator for SectionIter<'a> {
    type Item = &'a DxfEntity;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.ids.get(self.pos) {
            self.pos += 1;
            if let Some(entity) = self.db.get(*id).filter(|e| e.is_alive()) {
                return Some(entity);
            }
        }
        None
    }
}
