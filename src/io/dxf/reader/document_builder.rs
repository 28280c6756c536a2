//! Document assembly from raw sections
//!
//! [`DocumentBuilder::assemble`] turns section tags into entities and
//! sorts them into tables, block definitions, the pending ENTITIES list
//! and the OBJECTS section. [`DocumentBuilder::resolve`] then checks
//! owner handles, places ENTITIES into their layouts and fills in the
//! structure a valid document needs.

use super::Auditor;
use crate::blocks::{
    is_active_paperspace_name, is_modelspace_name, BlockLayout, BlocksSection, MODEL_SPACE,
    PAPER_SPACE,
};
use crate::document::{setup, CadDocument, RawSection, Setup};
use crate::entities::{DxfEntity, EntityKind, EntitySpace};
use crate::entity_db::{EntityDb, EntityId};
use crate::error::{DxfError, Result};
use crate::header::HeaderSection;
use crate::layouts;
use crate::objects::ObjectsSection;
use crate::tables::{TableKind, Tables};
use crate::tags::group_code::{NAME_CODE, STRUCTURE_MARKER, VARIABLE_NAME};
use crate::tags::{find_first, group_by_structure, Tag};
use crate::types::{DxfVersion, Handle};
use tracing::debug;

const SECTION_ORDER: [&str; 6] = ["HEADER", "CLASSES", "TABLES", "BLOCKS", "ENTITIES", "OBJECTS"];

/// A BLOCK whose ENDBLK has not been seen yet
struct OpenBlock {
    block: EntityId,
    entities: Vec<EntityId>,
}

pub(crate) struct DocumentBuilder<'a> {
    version: DxfVersion,
    legacy: bool,
    auditor: &'a mut Auditor,
    db: EntityDb,
    header: HeaderSection,
    classes: EntitySpace,
    tables: Tables,
    blocks: Vec<BlockLayout>,
    /// ENTITIES section in file order, placed by `resolve`
    entities: Vec<EntityId>,
    objects: ObjectsSection,
    unknown: Vec<RawSection>,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(version: DxfVersion, auditor: &'a mut Auditor) -> Self {
        Self {
            version,
            legacy: version.is_legacy(),
            auditor,
            db: EntityDb::new(),
            header: HeaderSection::new(),
            classes: EntitySpace::new(),
            tables: Tables::new(),
            blocks: Vec::new(),
            entities: Vec::new(),
            objects: ObjectsSection::new(),
            unknown: Vec::new(),
        }
    }

    fn setup(&mut self) -> Setup<'_> {
        Setup::new(&mut self.db, &mut self.tables, self.version)
    }

    // ==================== Assembly ====================

    /// Assemble all sections. Known sections are processed in their
    /// canonical order, so table heads exist before blocks need records.
    pub fn assemble(&mut self, sections: Vec<RawSection>) -> Result<()> {
        self.seed_handles(&sections);

        let mut known: Vec<Vec<Vec<Tag>>> = vec![Vec::new(); SECTION_ORDER.len()];
        for section in sections {
            match SECTION_ORDER.iter().position(|n| *n == section.name) {
                Some(index) => known[index].push(section.tags),
                None => {
                    self.auditor
                        .note(format!("section {} kept as raw tags", section.name));
                    self.unknown.push(section);
                }
            }
        }

        for (index, bodies) in known.into_iter().enumerate() {
            for tags in bodies {
                match SECTION_ORDER[index] {
                    "HEADER" => self.header(tags)?,
                    "CLASSES" => self.classes(tags)?,
                    "TABLES" => self.tables(tags)?,
                    "BLOCKS" => self.blocks(tags)?,
                    "ENTITIES" => self.entities(tags)?,
                    _ => self.objects(tags)?,
                }
            }
            if SECTION_ORDER[index] == "TABLES" {
                self.setup().table_heads();
            }
        }
        debug!(
            entities = self.db.len(),
            blocks = self.blocks.len(),
            "assembled sections"
        );
        Ok(())
    }

    /// Move the handle generator past every handle in the file, so
    /// handles handed out during assembly never collide with later ones.
    fn seed_handles(&mut self, sections: &[RawSection]) {
        for section in sections {
            for tag in &section.tags {
                if tag.code == 5 || tag.code == 105 {
                    if let Some(handle) = tag.as_handle() {
                        self.db.advance_seed(handle);
                    }
                }
            }
        }
    }

    /// Assemble one entity and store it.
    ///
    /// Broken entities are reported and skipped; a handle already in use
    /// is reported and replaced.
    fn load(&mut self, tags: Vec<Tag>) -> Result<Option<EntityId>> {
        let handle = find_first(&tags, 5)
            .or_else(|| find_first(&tags, 105))
            .and_then(Tag::as_handle);
        let mut entity = match DxfEntity::from_tags(tags, self.legacy) {
            Ok(entity) => entity,
            Err(err) => {
                self.auditor.report(err, handle)?;
                return Ok(None);
            }
        };
        if let Some(handle) = entity.handle() {
            if self.db.contains(handle) {
                self.auditor.report(
                    DxfError::Structure(format!(
                        "{} reuses handle {}",
                        entity.dxftype(),
                        handle
                    )),
                    Some(handle),
                )?;
                let fresh = self.db.allocate();
                entity.set_handle(fresh)?;
            }
        }
        self.db.add(entity).map(Some)
    }

    /// Entity groups of a section; tags before the first structure tag are
    /// a finding.
    fn groups(&mut self, section: &str, tags: Vec<Tag>) -> Result<Vec<Vec<Tag>>> {
        let mut groups = group_by_structure(tags);
        if groups
            .first()
            .and_then(|g| g.first())
            .map_or(false, |t| t.code != STRUCTURE_MARKER)
        {
            let stray = groups.remove(0);
            self.auditor.report(
                DxfError::Structure(format!(
                    "{} tags before the first entity of {}",
                    stray.len(),
                    section
                )),
                None,
            )?;
        }
        Ok(groups)
    }

    fn header(&mut self, mut tags: Vec<Tag>) -> Result<()> {
        let start = tags
            .iter()
            .position(|t| t.code == VARIABLE_NAME)
            .unwrap_or(tags.len());
        if start > 0 {
            self.auditor.report(
                DxfError::Structure(format!("{} header tags without variable", start)),
                None,
            )?;
        }
        self.header = HeaderSection::from_tags(tags.split_off(start))?;
        Ok(())
    }

    fn classes(&mut self, tags: Vec<Tag>) -> Result<()> {
        for group in self.groups("CLASSES", tags)? {
            if !group[0].is_struct("CLASS") {
                self.auditor.report(
                    DxfError::Structure(format!("{} in CLASSES section", group[0])),
                    None,
                )?;
                continue;
            }
            if let Some(id) = self.load(group)? {
                self.classes.push(id);
            }
        }
        Ok(())
    }

    fn tables(&mut self, tags: Vec<Tag>) -> Result<()> {
        let mut current: Option<TableKind> = None;
        let mut skipping = false;
        for group in self.groups("TABLES", tags)? {
            let dxftype = group[0].as_str().unwrap_or_default().to_string();
            match dxftype.as_str() {
                "TABLE" => {
                    let name = find_first(&group, NAME_CODE)
                        .and_then(Tag::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let Some(kind) = TableKind::from_name(&name) else {
                        self.auditor
                            .report(DxfError::Structure(format!("unknown table '{}'", name)), None)?;
                        current = None;
                        skipping = true;
                        continue;
                    };
                    current = Some(kind);
                    skipping = false;
                    if self.tables.get(kind).head().is_some() {
                        // entries of a repeated table join the first one
                        self.auditor
                            .report(DxfError::Structure(format!("duplicate {} table", name)), None)?;
                        continue;
                    }
                    if let Some(id) = self.load(group)? {
                        self.tables.get_mut(kind).set_head(id);
                    }
                }
                "ENDTAB" => {
                    current = None;
                    skipping = false;
                }
                _ if skipping => {}
                _ => {
                    let Some(kind) = current else {
                        self.auditor.report(
                            DxfError::Structure(format!("{} outside of a table", dxftype)),
                            None,
                        )?;
                        continue;
                    };
                    if EntityKind::from_dxftype(&dxftype) != kind.entry_kind() {
                        self.auditor.report(
                            DxfError::Structure(format!(
                                "{} entry in {} table",
                                dxftype,
                                kind.dxf_name()
                            )),
                            None,
                        )?;
                        continue;
                    }
                    self.table_entry(kind, group)?;
                }
            }
        }
        Ok(())
    }

    fn table_entry(&mut self, kind: TableKind, group: Vec<Tag>) -> Result<()> {
        let Some(id) = self.load(group)? else {
            return Ok(());
        };
        let (name, handle) = match self.db.get(id) {
            Some(entity) => (entity.name().map(str::to_string), entity.handle()),
            None => return Ok(()),
        };
        let Some(name) = name else {
            self.db.destroy(id);
            return self.auditor.report(
                DxfError::Structure(format!("{} entry without name", kind.dxf_name())),
                handle,
            );
        };
        if let Err(err) = self.tables.get_mut(kind).add(name, id) {
            self.db.destroy(id);
            self.auditor
                .report(DxfError::Structure(err.to_string()), handle)?;
        }
        Ok(())
    }

    fn blocks(&mut self, tags: Vec<Tag>) -> Result<()> {
        let mut open: Option<OpenBlock> = None;
        // entities of a BLOCK that failed to load
        let mut dropping = false;
        for group in self.groups("BLOCKS", tags)? {
            let dxftype = group[0].as_str().unwrap_or_default().to_string();
            match dxftype.as_str() {
                "BLOCK" => {
                    if let Some(pending) = open.take() {
                        self.auditor.report(
                            DxfError::Structure("BLOCK without ENDBLK".to_string()),
                            None,
                        )?;
                        self.close_block(pending, None)?;
                    }
                    match self.load(group)? {
                        Some(block) => {
                            open = Some(OpenBlock {
                                block,
                                entities: Vec::new(),
                            });
                            dropping = false;
                        }
                        None => dropping = true,
                    }
                }
                "ENDBLK" => {
                    let endblk = self.load(group)?;
                    match open.take() {
                        Some(pending) => self.close_block(pending, endblk)?,
                        None => {
                            if let Some(id) = endblk {
                                self.db.destroy(id);
                            }
                            if !dropping {
                                self.auditor.report(
                                    DxfError::Structure("ENDBLK without BLOCK".to_string()),
                                    None,
                                )?;
                            }
                        }
                    }
                    dropping = false;
                }
                _ if dropping => {}
                _ => {
                    if open.is_none() {
                        self.auditor.report(
                            DxfError::Structure(format!(
                                "{} outside of a block definition",
                                dxftype
                            )),
                            None,
                        )?;
                        continue;
                    }
                    let loaded = self.load(group)?;
                    if let (Some(id), Some(pending)) = (loaded, open.as_mut()) {
                        pending.entities.push(id);
                    }
                }
            }
        }
        if let Some(pending) = open {
            self.auditor
                .report(DxfError::Structure("BLOCK without ENDBLK".to_string()), None)?;
            self.close_block(pending, None)?;
        }
        Ok(())
    }

    /// Bind a BLOCK ... ENDBLK run to its BLOCK_RECORD, synthesizing the
    /// record or the ENDBLK if missing.
    fn close_block(&mut self, pending: OpenBlock, endblk: Option<EntityId>) -> Result<()> {
        let (name, handle) = match self.db.get(pending.block) {
            Some(block) => (
                block.name().unwrap_or_default().to_string(),
                block.handle(),
            ),
            None => (String::new(), None),
        };
        let discard = |db: &mut EntityDb| {
            for id in pending
                .entities
                .iter()
                .copied()
                .chain(std::iter::once(pending.block))
                .chain(endblk)
            {
                db.destroy(id);
            }
        };
        if name.is_empty() {
            discard(&mut self.db);
            return self
                .auditor
                .report(DxfError::Structure("BLOCK without name".to_string()), handle);
        }

        let record = match self.tables.get(TableKind::BlockRecord).get(&name) {
            Some(record) => record,
            None => {
                debug!(block = %name, "synthesized block record");
                self.setup().entry(TableKind::BlockRecord, &name)
            }
        };
        if self.blocks.iter().any(|b| b.block_record == record) {
            discard(&mut self.db);
            return self.auditor.report(
                DxfError::Structure(format!("block '{}' defined twice", name)),
                handle,
            );
        }
        let record_handle = self
            .db
            .get(record)
            .and_then(|e| e.handle())
            .unwrap_or(Handle::NULL);
        let endblk = match endblk {
            Some(endblk) => endblk,
            None => {
                debug!(block = %name, "synthesized ENDBLK");
                self.setup().endblk_entity(record_handle)
            }
        };
        self.blocks.push(BlockLayout {
            record_handle,
            block_record: record,
            block: pending.block,
            endblk,
            entities: pending.entities.into_iter().collect(),
        });
        Ok(())
    }

    fn entities(&mut self, tags: Vec<Tag>) -> Result<()> {
        for group in self.groups("ENTITIES", tags)? {
            if let Some(id) = self.load(group)? {
                self.entities.push(id);
            }
        }
        Ok(())
    }

    fn objects(&mut self, tags: Vec<Tag>) -> Result<()> {
        for group in self.groups("OBJECTS", tags)? {
            let Some(id) = self.load(group)? else { continue };
            if self.objects.is_empty() {
                let kind = self.db.get(id).map(DxfEntity::kind);
                if kind == Some(EntityKind::Dictionary) {
                    self.objects.set_root_dict(id);
                } else {
                    let handle = self.db.get(id).and_then(|e| e.handle());
                    self.auditor.report(
                        DxfError::Structure("OBJECTS does not start with a DICTIONARY".to_string()),
                        handle,
                    )?;
                }
            }
            self.objects.push(id);
        }
        Ok(())
    }

    // ==================== Resolution ====================

    /// Check and repair references, then build the document.
    pub fn resolve(mut self) -> Result<CadDocument> {
        self.setup().table_heads();
        self.check_table_owners()?;
        let mut blocks = self.block_section()?;
        self.place_entities(&mut blocks)?;
        self.check_block_owners(&blocks)?;
        self.check_object_owners()?;

        let mut doc = CadDocument::from_parts(
            self.version,
            self.header,
            self.classes,
            self.tables,
            blocks,
            self.objects,
            self.db,
        );
        doc.unknown_sections = self.unknown;
        setup::objects_structure(&mut doc.db, &mut doc.objects, doc.version);
        doc.setup().required_entries();
        if let Some(seed) = doc.header.handseed() {
            doc.db.advance_seed(seed);
        }
        for err in layouts::link_layouts(&mut doc)? {
            self.auditor.report(err, None)?;
        }
        Ok(doc)
    }

    /// Point `id` at `expected`. A missing owner is set silently, a
    /// different one is a reference finding.
    fn check_owner(&mut self, id: EntityId, expected: Handle) -> Result<()> {
        let Some(entity) = self.db.get_mut(id) else {
            return Ok(());
        };
        if expected.is_null() || !entity.is_supported("owner") {
            return Ok(());
        }
        match entity.owner() {
            Some(owner) if owner == expected => Ok(()),
            Some(owner) if !self.legacy => {
                let handle = entity.handle();
                let message = format!(
                    "{} owner {} should be {}",
                    entity.dxftype(),
                    owner,
                    expected
                );
                entity.set_owner(expected)?;
                self.auditor.report(DxfError::Reference(message), handle)
            }
            _ => entity.set_owner(expected),
        }
    }

    fn check_table_owners(&mut self) -> Result<()> {
        for kind in TableKind::ALL {
            let head = self.tables.get(kind).handle(&self.db);
            let ids: Vec<EntityId> = self.tables.get(kind).ids().collect();
            for id in ids {
                self.check_owner(id, head)?;
            }
        }
        Ok(())
    }

    /// Give every BLOCK_RECORD a definition and build the blocks section
    /// with modelspace and the active paperspace present.
    fn block_section(&mut self) -> Result<BlocksSection> {
        let records: Vec<(String, EntityId)> = self
            .tables
            .get(TableKind::BlockRecord)
            .iter()
            .map(|(name, id)| (name.to_string(), id))
            .collect();
        for (name, record) in records {
            if self.blocks.iter().any(|b| b.block_record == record) {
                continue;
            }
            debug!(block = %name, "synthesized BLOCK/ENDBLK");
            let block = self.setup().block_for_record(record, &name);
            self.blocks.push(block);
        }

        let model = match self
            .blocks
            .iter()
            .position(|b| is_modelspace_name(b.name(&self.db)))
        {
            Some(pos) => self.blocks.remove(pos),
            None => {
                debug!("synthesized {}", MODEL_SPACE);
                self.setup().block(MODEL_SPACE)
            }
        };
        if !self
            .blocks
            .iter()
            .any(|b| is_active_paperspace_name(b.name(&self.db)))
        {
            debug!("synthesized {}", PAPER_SPACE);
            let paper = self.setup().block(PAPER_SPACE);
            self.blocks.push(paper);
        }

        let mut section = BlocksSection::new(model);
        for block in std::mem::take(&mut self.blocks) {
            if let Err(err) = section.insert(block) {
                self.auditor.report(err, None)?;
            }
        }
        Ok(section)
    }

    /// Sort ENTITIES into layouts: by owner for R2000+, by the paperspace
    /// flag for R12 or when the owner is missing. Sub-entities stay with
    /// their parent.
    fn place_entities(&mut self, blocks: &mut BlocksSection) -> Result<()> {
        let model = blocks.modelspace().record_handle;
        let paper = blocks
            .iter()
            .find(|b| is_active_paperspace_name(b.name(&self.db)))
            .map_or(model, |b| b.record_handle);

        let mut target = model;
        for id in std::mem::take(&mut self.entities) {
            let Some(entity) = self.db.get(id) else { continue };
            if !entity.kind().is_sub_entity() {
                let fallback = if entity.paperspace() { paper } else { model };
                target = match entity.owner() {
                    _ if self.legacy => fallback,
                    Some(owner) if blocks.contains(owner) => owner,
                    Some(owner) => {
                        let handle = entity.handle();
                        let message = format!(
                            "{} owner {} is not a block record",
                            entity.dxftype(),
                            owner
                        );
                        if let Some(entity) = self.db.get_mut(id) {
                            entity.set_owner(fallback)?;
                        }
                        self.auditor.report(DxfError::Reference(message), handle)?;
                        fallback
                    }
                    None => fallback,
                };
            }
            if let Some(block) = blocks.get_mut(target) {
                block.entities.push(id);
            }
        }
        Ok(())
    }

    fn check_block_owners(&mut self, blocks: &BlocksSection) -> Result<()> {
        for block in blocks.iter() {
            let record = block.record_handle;
            self.check_owner(block.block, record)?;
            self.check_owner(block.endblk, record)?;

            let mut parent = record;
            for id in block.entities.raw_ids() {
                let Some(entity) = self.db.get(*id) else { continue };
                if entity.kind().is_sub_entity() {
                    self.check_owner(*id, parent)?;
                } else {
                    parent = entity.handle().unwrap_or(record);
                    self.check_owner(*id, record)?;
                }
            }
        }
        Ok(())
    }

    /// Objects must be owned by a live entity; dangling owners fall back
    /// to the root dictionary.
    fn check_object_owners(&mut self) -> Result<()> {
        if self.legacy {
            return Ok(());
        }
        let root = self.objects.root_dict();
        let root_handle = root
            .and_then(|id| self.db.get(id))
            .and_then(|e| e.handle())
            .unwrap_or(Handle::NULL);
        if root_handle.is_null() {
            return Ok(());
        }
        let ids: Vec<EntityId> = self.objects.space.raw_ids().to_vec();
        for id in ids {
            if Some(id) == root {
                continue;
            }
            let owner = match self.db.get(id) {
                Some(entity) if entity.is_supported("owner") => entity.owner(),
                _ => continue,
            };
            match owner {
                Some(owner) if self.db.contains(owner) => {}
                Some(_) => self.check_owner(id, root_handle)?,
                None => {
                    if let Some(entity) = self.db.get_mut(id) {
                        entity.set_owner(root_handle)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::section_reader::partition;
    use super::*;

    fn build(tags: Vec<Tag>, failsafe: bool) -> (Result<CadDocument>, Auditor) {
        let mut auditor = Auditor::new(failsafe);
        let result = partition(tags, &mut auditor).and_then(|sections| {
            let mut builder = DocumentBuilder::new(DxfVersion::AC1015, &mut auditor);
            builder.assemble(sections)?;
            builder.resolve()
        });
        (result, auditor)
    }

    fn section(name: &str, body: Vec<Tag>) -> Vec<Tag> {
        let mut tags = vec![Tag::string(0, "SECTION"), Tag::string(2, name)];
        tags.extend(body);
        tags.push(Tag::string(0, "ENDSEC"));
        tags
    }

    fn line(handle: &str, owner: &str) -> Vec<Tag> {
        vec![
            Tag::string(0, "LINE"),
            Tag::string(5, handle),
            Tag::string(330, owner),
            Tag::string(100, "AcDbEntity"),
            Tag::string(8, "0"),
            Tag::string(100, "AcDbLine"),
            Tag::point3(10, crate::types::Vector3::ZERO),
            Tag::point3(11, crate::types::Vector3::new(1.0, 1.0, 0.0)),
        ]
    }

    #[test]
    fn test_minimal_file_gets_structure() {
        let mut tags = section("ENTITIES", line("100", "0"));
        tags.push(Tag::string(0, "EOF"));
        let (doc, auditor) = build(tags, false);
        let doc = doc.unwrap();

        assert!(auditor.findings().is_empty());
        assert_eq!(doc.modelspace().entities.len(), 1);
        assert!(doc.by_name(TableKind::Layer, "0").is_ok());
        assert!(doc.active_paperspace().is_some());
        let line = doc.resolve(Handle::new(0x100)).unwrap();
        assert_eq!(line.owner(), Some(doc.modelspace().record_handle));
        // new handles start above the ones in the file
        assert!(doc.db().seed().value() > 0x100);
    }

    #[test]
    fn test_dangling_owner_falls_back_to_modelspace() {
        let mut tags = section("ENTITIES", line("100", "ABC"));
        tags.push(Tag::string(0, "EOF"));

        let (doc, _) = build(tags.clone(), false);
        assert!(matches!(doc, Err(DxfError::Reference(_))));

        let (doc, auditor) = build(tags, true);
        let doc = doc.unwrap();
        assert_eq!(auditor.findings().len(), 1);
        assert_eq!(doc.modelspace().entities.len(), 1);
    }

    #[test]
    fn test_duplicate_handles_are_replaced() {
        let mut body = line("100", "0");
        body.extend(line("100", "0"));
        let mut tags = section("ENTITIES", body);
        tags.push(Tag::string(0, "EOF"));

        let (doc, auditor) = build(tags, true);
        let doc = doc.unwrap();
        assert_eq!(auditor.findings().len(), 1);
        assert_eq!(doc.modelspace().entities.live_count(doc.db()), 2);
    }
}
