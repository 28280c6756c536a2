//! Loading resources from one document into another
//!
//! A [`Loader`] collects load commands (modelspace content, block
//! definitions, table entries), pulls in everything those depend on and
//! copies it into the target document in one [`execute`](Loader::execute)
//! call. Every copy gets a handle from the target registry; pointers are
//! translated through the resulting handle mapping.
//!
//! ```rust,ignore
//! use dxfcore::xref::{ConflictPolicy, Loader};
//!
//! let mut loader = Loader::new(&source, &mut target, ConflictPolicy::XrefPrefix);
//! loader.load_modelspace();
//! loader.load_block("DOOR");
//! let result = loader.execute()?;
//! ```

use crate::blocks::{is_anonymous_name, is_layout_block_name, BlockLayout};
use crate::document::CadDocument;
use crate::entities::{DxfEntity, EntityKind};
use crate::entity_db::EntityId;
use crate::error::{DxfError, Result};
use crate::tables::{Table, TableKind};
use crate::types::Handle;
use ahash::{AHashMap, AHashSet};
use indexmap::IndexSet;
use tracing::debug;

const KEPT_LAYERS: [&str; 2] = ["0", "DEFPOINTS"];
const KEPT_LINETYPES: [&str; 3] = ["BYLAYER", "BYBLOCK", "CONTINUOUS"];

/// Name attributes referencing table entries
const NAME_REFERENCES: [(&str, TableKind); 4] = [
    ("layer", TableKind::Layer),
    ("linetype", TableKind::LineType),
    ("style", TableKind::TextStyle),
    ("dimstyle", TableKind::DimStyle),
];

/// How to name a loaded resource whose name exists in the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Reuse the existing target entry, nothing is copied
    #[default]
    Keep,
    /// Always rename to `<xref>$<n>$<name>`
    XrefPrefix,
    /// Rename to `$<n>$<name>`, only if the name exists
    NumPrefix,
}

/// A resource stored under another name than in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub kind: TableKind,
    pub from: String,
    pub to: String,
}

/// Outcome of [`Loader::execute`]
#[derive(Debug, Clone, Default)]
pub struct LoadResult {
    /// Source handle → target handle, for copies and for reused entries
    pub handle_mapping: AHashMap<Handle, Handle>,
    pub renamed: Vec<Renamed>,
    /// Number of entities added to the target
    pub copied: usize,
}

#[derive(Debug, Clone)]
enum Command {
    Modelspace,
    Block(String),
    TableEntries(TableKind, Vec<String>),
}

/// Resource loader from `source` into `target`
pub struct Loader<'s, 't> {
    source: &'s CadDocument,
    target: &'t mut CadDocument,
    policy: ConflictPolicy,
    prefix: String,
    commands: Vec<Command>,
}

impl<'s, 't> Loader<'s, 't> {
    /// The xref prefix defaults to the source file stem, or `xref`.
    pub fn new(source: &'s CadDocument, target: &'t mut CadDocument, policy: ConflictPolicy) -> Self {
        let prefix = source
            .filename
            .as_deref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("xref")
            .to_string();
        Self {
            source,
            target,
            policy,
            prefix,
            commands: Vec::new(),
        }
    }

    /// Prefix of [`ConflictPolicy::XrefPrefix`] names
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Copy the modelspace content into the target modelspace.
    pub fn load_modelspace(&mut self) {
        self.commands.push(Command::Modelspace);
    }

    /// Copy the block definition `name`.
    pub fn load_block(&mut self, name: &str) {
        self.commands.push(Command::Block(name.to_string()));
    }

    /// Copy table entries; use [`load_block`](Self::load_block) for blocks.
    pub fn load_table_entries<S: AsRef<str>>(&mut self, kind: TableKind, names: &[S]) {
        let names = names.iter().map(|n| n.as_ref().to_string()).collect();
        self.commands.push(Command::TableEntries(kind, names));
    }

    /// Run all load commands.
    ///
    /// Unknown block or table entry names are a `KeyNotFound` error and
    /// leave the target unchanged.
    pub fn execute(self) -> Result<LoadResult> {
        let registry = Registry::collect(self.source, &self.commands)?;
        debug!(
            entries = registry.entries.len(),
            blocks = registry.blocks.len(),
            entities = registry.model.len(),
            "xref resources registered"
        );
        let mut transfer = Transfer::new(self.source, self.target, self.policy, self.prefix);
        transfer.map_structure();
        for kind in TableKind::ALL {
            for (entry_kind, id) in &registry.entries {
                if *entry_kind == kind {
                    transfer.table_entry(kind, *id)?;
                }
            }
        }
        for record in &registry.blocks {
            transfer.block(*record)?;
        }
        for id in &registry.model {
            let index = transfer.copy(*id)?;
            transfer.model.push(index);
        }
        transfer.commit()
    }
}

/// Everything the load commands need, in source ids
#[derive(Default)]
struct Registry {
    entries: IndexSet<(TableKind, EntityId)>,
    /// BLOCK_RECORD handles of the blocks to copy
    blocks: IndexSet<Handle>,
    model: Vec<EntityId>,
    scanned: AHashSet<EntityId>,
}

impl Registry {
    fn collect(source: &CadDocument, commands: &[Command]) -> Result<Self> {
        let mut registry = Self::default();
        let mut queue: Vec<EntityId> = Vec::new();
        for command in commands {
            match command {
                Command::Modelspace => {
                    let ids: Vec<EntityId> =
                        source.modelspace().entities.iter(source.db()).collect();
                    queue.extend(&ids);
                    registry.model.extend(ids);
                }
                Command::Block(name) => {
                    let block = source
                        .block(name)
                        .ok_or_else(|| DxfError::KeyNotFound(format!("BLOCK '{}'", name)))?;
                    registry.add_block(source, block.record_handle, &mut queue);
                }
                Command::TableEntries(kind, names) => {
                    for name in names {
                        let id = find_entry(source.tables.get(*kind), name).ok_or_else(|| {
                            DxfError::KeyNotFound(format!("{} '{}'", kind.dxf_name(), name))
                        })?;
                        if *kind == TableKind::BlockRecord {
                            let handle = source.handle_of(id);
                            registry.add_block(source, handle, &mut queue);
                        } else {
                            registry.add_entry(*kind, id, &mut queue);
                        }
                    }
                }
            }
        }
        while let Some(id) = queue.pop() {
            if registry.scanned.insert(id) {
                registry.scan(source, id, &mut queue);
            }
        }
        Ok(registry)
    }

    fn add_entry(&mut self, kind: TableKind, id: EntityId, queue: &mut Vec<EntityId>) {
        if self.entries.insert((kind, id)) {
            queue.push(id);
        }
    }

    fn add_block(&mut self, source: &CadDocument, record: Handle, queue: &mut Vec<EntityId>) {
        let Some(block) = source.blocks.get(record) else { return };
        if block.is_layout_block(source.db()) || !self.blocks.insert(record) {
            return;
        }
        queue.push(block.block);
        queue.extend(block.entities.iter(source.db()));
    }

    /// Register the table entries and blocks `id` refers to, by name or
    /// by handle.
    fn scan(&mut self, source: &CadDocument, id: EntityId, queue: &mut Vec<EntityId>) {
        let Some(entity) = source.db().get(id) else { return };
        for (attrib, kind) in NAME_REFERENCES {
            if let Some(name) = entity.get_str(attrib) {
                if let Some(entry) = find_entry(source.tables.get(kind), name) {
                    self.add_entry(kind, entry, queue);
                }
            }
        }
        let block_name = match entity.kind() {
            EntityKind::Insert => entity.get_str("name"),
            EntityKind::Dimension => entity.get_str("geometry"),
            _ => None,
        };
        if let Some(name) = block_name {
            if let Some(block) = source.block(name) {
                self.add_block(source, block.record_handle, queue);
            }
        }
        for appid in entity.xdata.appids() {
            if let Some(entry) = find_entry(source.tables.get(TableKind::AppId), appid) {
                self.add_entry(TableKind::AppId, entry, queue);
            }
        }
        for (_, handle) in entity.pointers() {
            let Some(target) = source.db().resolve(handle) else { continue };
            let Some(referenced) = source.db().get(target) else { continue };
            match referenced.kind() {
                EntityKind::BlockRecord => self.add_block(source, handle, queue),
                kind if kind.is_table_entry() => {
                    if let Some(table) = TableKind::ALL.into_iter().find(|t| t.entry_kind() == kind) {
                        self.add_entry(table, target, queue);
                    }
                }
                _ => {}
            }
        }
    }
}

enum Placement {
    /// Copy under this name
    Copy(String),
    /// Map to an existing target entry
    Reuse(EntityId),
}

struct BlockCopy {
    name: String,
    record: usize,
    block: usize,
    endblk: usize,
    entities: Vec<usize>,
}

/// Copies waiting to be added to the target, referenced by index
struct Transfer<'s, 't> {
    source: &'s CadDocument,
    target: &'t mut CadDocument,
    policy: ConflictPolicy,
    prefix: String,
    mapping: AHashMap<Handle, Handle>,
    /// `(kind, source name)` → target name
    names: AHashMap<(TableKind, String), String>,
    /// Lowercase names taken by pending copies
    reserved: AHashSet<(TableKind, String)>,
    renamed: Vec<Renamed>,
    copies: Vec<DxfEntity>,
    entries: Vec<(TableKind, String, usize)>,
    blocks: Vec<BlockCopy>,
    model: Vec<usize>,
}

impl<'s, 't> Transfer<'s, 't> {
    fn new(
        source: &'s CadDocument,
        target: &'t mut CadDocument,
        policy: ConflictPolicy,
        prefix: String,
    ) -> Self {
        Self {
            source,
            target,
            policy,
            prefix,
            mapping: AHashMap::new(),
            names: AHashMap::new(),
            reserved: AHashSet::new(),
            renamed: Vec::new(),
            copies: Vec::new(),
            entries: Vec::new(),
            blocks: Vec::new(),
            model: Vec::new(),
        }
    }

    /// Table heads and layout blocks exist in both documents.
    fn map_structure(&mut self) {
        for kind in TableKind::ALL {
            let from = self.source.tables.get(kind).handle(self.source.db());
            let to = self.target.tables.get(kind).handle(self.target.db());
            if !from.is_null() && !to.is_null() {
                self.mapping.insert(from, to);
            }
        }
        let model = (
            self.source.modelspace().record_handle,
            self.target.modelspace().record_handle,
        );
        self.mapping.insert(model.0, model.1);
        if let (Some(from), Some(to)) = (
            self.source.active_paperspace(),
            self.target.active_paperspace(),
        ) {
            self.mapping.insert(from.record_handle, to.record_handle);
        }
    }

    /// Clone a source entity under a new target handle.
    fn copy(&mut self, id: EntityId) -> Result<usize> {
        let source = self.source;
        let entity = source
            .db()
            .get(id)
            .ok_or_else(|| DxfError::HandleNotFound(format!("entity #{}", id.index())))?;
        let mut clone = entity.clone();
        if entity.is_supported("handle") {
            let handle = self.target.db_mut().allocate();
            if let Some(old) = entity.handle() {
                self.mapping.insert(old, handle);
            }
            clone.set_handle(handle)?;
        }
        self.copies.push(clone);
        Ok(self.copies.len() - 1)
    }

    fn is_taken(&self, kind: TableKind, name: &str) -> bool {
        find_entry(self.target.tables.get(kind), name).is_some()
            || self.reserved.contains(&(kind, name.to_ascii_lowercase()))
    }

    /// `<prefix>$<n>$<name>` with the first free `n`
    fn unique_name(&self, kind: TableKind, prefix: &str, name: &str) -> String {
        (0..)
            .map(|n| format!("{}${}${}", prefix, n, name))
            .find(|candidate| !self.is_taken(kind, candidate))
            .unwrap_or_default()
    }

    /// `*<letter><n>` with the first free `n`
    fn anonymous_name(&self, name: &str) -> String {
        let letter: String = name.chars().skip(1).take(1).collect();
        (1..)
            .map(|n| format!("*{}{}", letter, n))
            .find(|candidate| !self.is_taken(TableKind::BlockRecord, candidate))
            .unwrap_or_default()
    }

    /// Target name for a source resource, or the existing target entry to
    /// reuse.
    fn resolve_name(&self, kind: TableKind, name: &str) -> Placement {
        let existing = find_entry(self.target.tables.get(kind), name);
        let always_kept = match kind {
            TableKind::Layer => KEPT_LAYERS.iter().any(|n| n.eq_ignore_ascii_case(name)),
            TableKind::LineType => KEPT_LINETYPES.iter().any(|n| n.eq_ignore_ascii_case(name)),
            _ => false,
        };
        if let Some(existing) = existing {
            if always_kept || self.policy == ConflictPolicy::Keep {
                return Placement::Reuse(existing);
            }
        }
        let name = match self.policy {
            ConflictPolicy::XrefPrefix if !always_kept => self.unique_name(kind, &self.prefix, name),
            ConflictPolicy::NumPrefix if self.is_taken(kind, name) => self.unique_name(kind, "", name),
            _ => name.to_string(),
        };
        Placement::Copy(name)
    }

    fn reuse(&mut self, kind: TableKind, source: &str, source_handle: Option<Handle>, existing: EntityId) {
        let handle = self.target.handle_of(existing);
        if let Some(old) = source_handle {
            self.mapping.insert(old, handle);
        }
        let name = self
            .target
            .db()
            .get(existing)
            .and_then(|e| e.name())
            .unwrap_or(source)
            .to_string();
        self.names.insert((kind, source.to_string()), name);
    }

    fn record_name(&mut self, kind: TableKind, source: &str, target: &str) {
        self.reserved.insert((kind, target.to_ascii_lowercase()));
        self.names.insert((kind, source.to_string()), target.to_string());
        if source != target {
            self.renamed.push(Renamed {
                kind,
                from: source.to_string(),
                to: target.to_string(),
            });
        }
    }

    fn table_entry(&mut self, kind: TableKind, id: EntityId) -> Result<()> {
        let source = self.source;
        let Some(entity) = source.db().get(id) else {
            return Ok(());
        };
        let name = entity.name().unwrap_or_default().to_string();
        let handle = entity.handle();
        match self.resolve_name(kind, &name) {
            Placement::Reuse(existing) => self.reuse(kind, &name, handle, existing),
            Placement::Copy(new_name) => {
                let index = self.copy(id)?;
                self.copies[index].set("name", new_name.as_str())?;
                self.record_name(kind, &name, &new_name);
                self.entries.push((kind, new_name, index));
            }
        }
        Ok(())
    }

    fn block(&mut self, record: Handle) -> Result<()> {
        let source = self.source;
        let block = source
            .blocks
            .get(record)
            .ok_or_else(|| DxfError::KeyNotFound(format!("block record {}", record)))?;
        let name = block.name(source.db()).to_string();
        let kind = TableKind::BlockRecord;
        let new_name = if is_anonymous_name(&name) {
            self.anonymous_name(&name)
        } else {
            match self.resolve_name(kind, &name) {
                Placement::Reuse(existing) => {
                    self.reuse(kind, &name, Some(record), existing);
                    return Ok(());
                }
                Placement::Copy(new_name) => new_name,
            }
        };

        let record_index = self.copy(block.block_record)?;
        let block_index = self.copy(block.block)?;
        let endblk_index = self.copy(block.endblk)?;
        let mut entities = Vec::new();
        for id in block.entities.iter(source.db()) {
            entities.push(self.copy(id)?);
        }
        self.copies[record_index].set("name", new_name.as_str())?;
        let begin = &mut self.copies[block_index];
        begin.set("name", new_name.as_str())?;
        if begin.get("name2").is_some() {
            begin.set("name2", new_name.as_str())?;
        }
        self.record_name(kind, &name, &new_name);
        self.blocks.push(BlockCopy {
            name: new_name,
            record: record_index,
            block: block_index,
            endblk: endblk_index,
            entities,
        });
        Ok(())
    }

    /// Translate pointers and name references of a pending copy.
    fn fix_references(&self, entity: &mut DxfEntity) -> Result<()> {
        entity.translate_pointers(|h| self.mapping.get(&h).copied().unwrap_or(Handle::NULL));
        for (attrib, kind) in NAME_REFERENCES {
            let renamed = entity
                .get_str(attrib)
                .and_then(|old| self.names.get(&(kind, old.to_string())))
                .filter(|new| entity.get_str(attrib) != Some(new.as_str()))
                .cloned();
            if let Some(new) = renamed {
                entity.set(attrib, new)?;
            }
        }
        let block_attrib = match entity.kind() {
            EntityKind::Insert => Some("name"),
            EntityKind::Dimension => Some("geometry"),
            _ => None,
        };
        if let Some(attrib) = block_attrib {
            let renamed = entity
                .get_str(attrib)
                .and_then(|old| self.names.get(&(TableKind::BlockRecord, old.to_string())))
                .cloned();
            if let Some(new) = renamed {
                entity.set(attrib, new)?;
            }
        }
        Ok(())
    }

    /// Owner of sub-entities is the preceding parent, everything else is
    /// owned by `owner`.
    fn fix_owners(&mut self, indices: &[usize], owner: Handle) -> Result<()> {
        let mut parent = owner;
        for index in indices {
            let entity = &mut self.copies[*index];
            if !entity.is_supported("owner") {
                continue;
            }
            if entity.kind().is_sub_entity() {
                entity.set_owner(parent)?;
            } else {
                parent = entity.handle().unwrap_or(owner);
                entity.set_owner(owner)?;
            }
        }
        Ok(())
    }

    fn commit(mut self) -> Result<LoadResult> {
        let mut copies = std::mem::take(&mut self.copies);
        for entity in copies.iter_mut() {
            self.fix_references(entity)?;
        }
        self.copies = copies;

        let model = std::mem::take(&mut self.model);
        let model_owner = self.target.modelspace().record_handle;
        self.fix_owners(&model, model_owner)?;
        let blocks = std::mem::take(&mut self.blocks);
        for block in &blocks {
            let owner = self.copies[block.record].handle().unwrap_or(Handle::NULL);
            self.fix_owners(&[block.block, block.endblk], owner)?;
            self.fix_owners(&block.entities, owner)?;
        }

        let copied = self.copies.len();
        let mut ids = Vec::with_capacity(copied);
        for entity in std::mem::take(&mut self.copies) {
            ids.push(self.target.db_mut().add(entity)?);
        }
        for (kind, name, index) in std::mem::take(&mut self.entries) {
            self.target.tables.get_mut(kind).add(name, ids[index])?;
        }
        for block in blocks {
            let record_handle = self.target.handle_of(ids[block.record]);
            self.target
                .tables
                .get_mut(TableKind::BlockRecord)
                .add(block.name, ids[block.record])?;
            self.target.blocks.insert(BlockLayout {
                record_handle,
                block_record: ids[block.record],
                block: ids[block.block],
                endblk: ids[block.endblk],
                entities: block.entities.iter().map(|i| ids[*i]).collect(),
            })?;
        }
        let modelspace = &mut self.target.blocks.modelspace_mut().entities;
        for index in model {
            modelspace.push(ids[index]);
        }
        self.target.rebuild_block_index();
        debug!(copied, renamed = self.renamed.len(), "xref load done");
        Ok(LoadResult {
            handle_mapping: self.mapping,
            renamed: self.renamed,
            copied,
        })
    }
}

/// Table entry by name, exact match first, then case-insensitive
fn find_entry(table: &Table, name: &str) -> Option<EntityId> {
    table.get(name).or_else(|| {
        table
            .iter()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(_, id)| id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vector3;

    fn line(doc: &CadDocument, layer: &str) -> DxfEntity {
        let mut line = doc.new_entity("LINE");
        line.set("layer", layer).unwrap();
        line.set("start", Vector3::ZERO).unwrap();
        line.set("end", Vector3::new(1.0, 0.0, 0.0)).unwrap();
        line
    }

    fn source() -> CadDocument {
        let mut doc = CadDocument::new();
        doc.new_table_entry(TableKind::Layer, "WALLS").unwrap();
        doc.new_block("DOOR").unwrap();
        let door_line = line(&doc, "WALLS");
        doc.add_to_block("DOOR", door_line).unwrap();

        let mut insert = doc.new_entity("INSERT");
        insert.set("name", "DOOR").unwrap();
        insert.set("layer", "0").unwrap();
        doc.add_to_layout("Model", insert).unwrap();
        let wall = line(&doc, "WALLS");
        doc.add_to_layout("Model", wall).unwrap();
        doc
    }

    #[test]
    fn test_modelspace_pulls_dependencies() {
        let source = source();
        let mut target = CadDocument::new();
        let layers_before = target.tables.get(TableKind::Layer).len();
        let mut loader = Loader::new(&source, &mut target, ConflictPolicy::Keep);
        loader.load_modelspace();
        let result = loader.execute().unwrap();

        assert!(target.by_name(TableKind::Layer, "WALLS").is_ok());
        assert!(target.block("DOOR").is_some());
        assert_eq!(target.modelspace().entities.live_count(target.db()), 2);
        assert!(result.renamed.is_empty());
        // layer "0" is reused, not copied
        assert_eq!(layers_before + 1, target.tables.get(TableKind::Layer).len());
    }

    #[test]
    fn test_xref_prefix_renames_everything_but_kept_resources() {
        let source = source();
        let mut target = CadDocument::new();
        let mut loader =
            Loader::new(&source, &mut target, ConflictPolicy::XrefPrefix).with_prefix("site");
        loader.load_modelspace();
        loader.execute().unwrap();

        assert!(target.by_name(TableKind::Layer, "site$0$WALLS").is_ok());
        assert!(target.block("site$0$DOOR").is_some());
        let insert = target
            .modelspace()
            .entities
            .entities(target.db())
            .find(|e| e.kind() == EntityKind::Insert)
            .unwrap();
        assert_eq!(insert.get_str("name"), Some("site$0$DOOR"));
        assert_eq!(insert.layer(), "0");
    }

    #[test]
    fn test_num_prefix_only_on_conflict() {
        let source = source();
        let mut target = CadDocument::new();
        target.new_table_entry(TableKind::Layer, "WALLS").unwrap();
        let mut loader = Loader::new(&source, &mut target, ConflictPolicy::NumPrefix);
        loader.load_block("DOOR");
        let result = loader.execute().unwrap();

        assert!(target.block("DOOR").is_some());
        assert!(target.by_name(TableKind::Layer, "$0$WALLS").is_ok());
        assert_eq!(result.renamed.len(), 1);
    }

    #[test]
    fn test_pointers_are_translated() {
        let source = source();
        let mut target = CadDocument::new();
        let mut loader = Loader::new(&source, &mut target, ConflictPolicy::Keep);
        loader.load_block("DOOR");
        let result = loader.execute().unwrap();

        let door = target.block("DOOR").unwrap();
        let record = door.record_handle;
        for entity in door.entities.entities(target.db()) {
            assert_eq!(entity.owner(), Some(record));
            assert!(result
                .handle_mapping
                .values()
                .any(|h| Some(*h) == entity.handle()));
        }
    }

    #[test]
    fn test_unknown_block_is_key_error() {
        let source = source();
        let mut target = CadDocument::new();
        let mut loader = Loader::new(&source, &mut target, ConflictPolicy::Keep);
        loader.load_block("MISSING");
        assert!(matches!(loader.execute(), Err(DxfError::KeyNotFound(_))));
    }
}
