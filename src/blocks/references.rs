//! Block definition index and block reference counting
//!
//! Reference counts are derived data: nothing updates them as entities
//! change. Call [`BlockReferenceCounter::rebuild`] (or
//! [`BlockDefinitionIndex::rebuild`]) after edits.
//!
//! Block references are found by [`ReferenceRule`]s. The default rules
//! cover the places where AutoCAD and common applications store block
//! names and handles; applications with their own conventions add rules
//! with [`BlockReferenceCounter::add_rule`].

use super::{BlocksSection, is_layout_block_name};
use crate::document::CadDocument;
use crate::entities::{DxfEntity, EntityKind};
use crate::entity_db::EntityDb;
use crate::tags::group_code::is_pointer_code;
use crate::types::Handle;
use ahash::AHashMap;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// `name ↔ BLOCK_RECORD handle` lookup of all block definitions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockDefinitionIndex {
    by_handle: AHashMap<Handle, String>,
    by_name: AHashMap<String, Handle>,
}

impl BlockDefinitionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: &BlocksSection, db: &EntityDb) -> Self {
        let mut index = Self::new();
        index.rebuild(blocks, db);
        index
    }

    /// Re-read all block definitions.
    pub fn rebuild(&mut self, blocks: &BlocksSection, db: &EntityDb) {
        self.by_handle.clear();
        self.by_name.clear();
        for block in blocks.iter() {
            if !db.is_alive(block.block_record) {
                continue;
            }
            let name = block.name(db).to_string();
            self.by_name.insert(name.clone(), block.record_handle);
            self.by_handle.insert(block.record_handle, name);
        }
    }

    pub fn by_handle(&self, handle: Handle) -> Option<&str> {
        self.by_handle.get(&handle).map(String::as_str)
    }

    pub fn by_name(&self, name: &str) -> Option<Handle> {
        self.by_name.get(name).copied()
    }

    pub fn has_handle(&self, handle: Handle) -> bool {
        self.by_handle.contains_key(&handle)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.by_handle.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }
}

/// A block reference found in an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockRef {
    /// Block name; unknown names are dangling references
    Name(String),
    /// BLOCK_RECORD handle; unknown handles are dangling references
    Handle(Handle),
    /// Generic pointer, counted only when it points to a BLOCK_RECORD
    Pointer(Handle),
}

impl From<&str> for BlockRef {
    fn from(name: &str) -> Self {
        BlockRef::Name(name.to_string())
    }
}

impl From<String> for BlockRef {
    fn from(name: String) -> Self {
        BlockRef::Name(name)
    }
}

impl From<Handle> for BlockRef {
    fn from(handle: Handle) -> Self {
        BlockRef::Handle(handle)
    }
}

/// Reference to a block that does not exist
#[derive(Debug, Clone, PartialEq)]
pub struct DanglingReference {
    /// Handle of the referencing entity, `None` for header variables
    pub source: Option<Handle>,
    pub target: BlockRef,
}

/// Finds block references in one entity
pub trait ReferenceRule {
    fn name(&self) -> &'static str;

    /// Push every block reference held by `entity` onto `refs`.
    fn collect(&self, entity: &DxfEntity, refs: &mut Vec<BlockRef>);
}

/// INSERT entities reference their block by name
pub struct InsertRule;

impl ReferenceRule for InsertRule {
    fn name(&self) -> &'static str {
        "insert"
    }

    fn collect(&self, entity: &DxfEntity, refs: &mut Vec<BlockRef>) {
        if entity.kind() == EntityKind::Insert {
            if let Some(name) = entity.name() {
                refs.push(BlockRef::from(name));
            }
        }
    }
}

/// DIMENSION entities reference their anonymous geometry block
pub struct DimensionRule;

impl ReferenceRule for DimensionRule {
    fn name(&self) -> &'static str {
        "dimension"
    }

    fn collect(&self, entity: &DxfEntity, refs: &mut Vec<BlockRef>) {
        if entity.kind() == EntityKind::Dimension {
            if let Some(name) = entity.get_str("geometry").filter(|n| !n.is_empty()) {
                refs.push(BlockRef::from(name));
            }
        }
    }
}

/// Arrow blocks of DIMSTYLE entries, by handle (R2000+) or name (R12)
pub struct DimStyleBlocksRule;

impl ReferenceRule for DimStyleBlocksRule {
    fn name(&self) -> &'static str {
        "dimstyle"
    }

    fn collect(&self, entity: &DxfEntity, refs: &mut Vec<BlockRef>) {
        if entity.kind() != EntityKind::DimStyle {
            return;
        }
        for attrib in [
            "dimldrblk_handle",
            "dimblk_handle",
            "dimblk1_handle",
            "dimblk2_handle",
        ] {
            if let Some(handle) = entity.get_handle(attrib).filter(|h| !h.is_null()) {
                refs.push(BlockRef::Handle(handle));
            }
        }
        for attrib in ["dimblk_name", "dimblk1_name", "dimblk2_name"] {
            if let Some(name) = entity.get_str(attrib).filter(|n| !n.is_empty()) {
                refs.push(BlockRef::from(name));
            }
        }
    }
}

/// XDATA database handles (1005)
pub struct XDataHandleRule;

impl ReferenceRule for XDataHandleRule {
    fn name(&self) -> &'static str {
        "xdata"
    }

    fn collect(&self, entity: &DxfEntity, refs: &mut Vec<BlockRef>) {
        for (_, tags) in entity.xdata.iter() {
            refs.extend(
                tags.iter()
                    .filter(|t| t.code == 1005)
                    .filter_map(|t| t.as_handle())
                    .map(BlockRef::Pointer),
            );
        }
    }
}

/// Pointers stored in AppData groups
pub struct AppDataPointerRule;

impl ReferenceRule for AppDataPointerRule {
    fn name(&self) -> &'static str {
        "appdata"
    }

    fn collect(&self, entity: &DxfEntity, refs: &mut Vec<BlockRef>) {
        refs.extend(
            entity
                .appdata()
                .iter()
                .flatten()
                .filter(|t| is_pointer_code(t.code))
                .filter_map(|t| t.as_handle())
                .map(BlockRef::Pointer),
        );
    }
}

/// Raw pointer tags of XRECORD and uninterpreted entities, other than
/// the owner
pub struct ObjectPointerRule;

impl ReferenceRule for ObjectPointerRule {
    fn name(&self) -> &'static str {
        "object_pointers"
    }

    fn collect(&self, entity: &DxfEntity, refs: &mut Vec<BlockRef>) {
        if !matches!(entity.kind(), EntityKind::XRecord | EntityKind::Opaque) {
            return;
        }
        let owner = entity.owner();
        refs.extend(
            entity
                .tags()
                .filter(|t| is_pointer_code(t.code))
                .filter_map(|t| t.as_handle())
                .filter(|h| Some(*h) != owner)
                .map(BlockRef::Pointer),
        );
    }
}

/// The rules used by [`BlockReferenceCounter::new`]
pub fn default_rules() -> Vec<Box<dyn ReferenceRule>> {
    vec![
        Box::new(InsertRule),
        Box::new(DimensionRule),
        Box::new(DimStyleBlocksRule),
        Box::new(XDataHandleRule),
        Box::new(AppDataPointerRule),
        Box::new(ObjectPointerRule),
    ]
}

const HEADER_BLOCK_VARS: [&str; 4] = ["$DIMBLK", "$DIMBLK1", "$DIMBLK2", "$DIMLDRBLK"];

/// Full-document block reference counter
pub struct BlockReferenceCounter {
    rules: Vec<Box<dyn ReferenceRule>>,
    index: BlockDefinitionIndex,
    by_handle: AHashMap<Handle, usize>,
    by_name: AHashMap<String, usize>,
    dangling: Vec<DanglingReference>,
}

impl BlockReferenceCounter {
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(rules: Vec<Box<dyn ReferenceRule>>) -> Self {
        Self {
            rules,
            index: BlockDefinitionIndex::new(),
            by_handle: AHashMap::new(),
            by_name: AHashMap::new(),
            dangling: Vec::new(),
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn ReferenceRule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Scan every live entity of the document and recount.
    pub fn rebuild(&mut self, doc: &CadDocument) {
        self.index.rebuild(&doc.blocks, doc.db());
        self.by_handle.clear();
        self.by_name.clear();
        self.dangling.clear();

        let mut refs = Vec::new();
        for (_, entity) in doc.db().iter() {
            for rule in &self.rules {
                rule.collect(entity, &mut refs);
            }
            for target in refs.drain(..) {
                self.count(target, entity.handle());
            }
        }
        for var in HEADER_BLOCK_VARS {
            if let Some(name) = doc.header.get_str(var).filter(|n| !n.is_empty()) {
                self.count(BlockRef::from(name), None);
            }
        }

        for (handle, count) in &self.by_handle {
            if let Some(name) = self.index.by_handle(*handle) {
                self.by_name.insert(name.to_string(), *count);
            }
        }
        debug!(
            blocks = self.index.len(),
            referenced = self.by_handle.len(),
            dangling = self.dangling.len(),
            "block references counted"
        );
    }

    fn count(&mut self, target: BlockRef, source: Option<Handle>) {
        let resolved = match &target {
            BlockRef::Name(name) => self.index.by_name(name),
            BlockRef::Handle(h) | BlockRef::Pointer(h) => {
                Some(*h).filter(|h| self.index.has_handle(*h))
            }
        };
        match (resolved, &target) {
            (Some(handle), _) => *self.by_handle.entry(handle).or_insert(0) += 1,
            (None, BlockRef::Pointer(_)) => {}
            (None, _) => self.dangling.push(DanglingReference { source, target }),
        }
    }

    /// Count for a block given by name or handle
    pub fn get(&self, key: &BlockRef) -> usize {
        match key {
            BlockRef::Name(name) => self.by_name(name),
            BlockRef::Handle(h) | BlockRef::Pointer(h) => self.by_handle(*h),
        }
    }

    pub fn by_handle(&self, handle: Handle) -> usize {
        self.by_handle.get(&handle).copied().unwrap_or(0)
    }

    pub fn by_name(&self, name: &str) -> usize {
        self.by_name.get(name).copied().unwrap_or(0)
    }

    pub fn handle_counts(&self) -> &AHashMap<Handle, usize> {
        &self.by_handle
    }

    pub fn name_counts(&self) -> &AHashMap<String, usize> {
        &self.by_name
    }

    /// References to blocks that do not exist, reported not repaired
    pub fn dangling(&self) -> &[DanglingReference] {
        &self.dangling
    }
}

impl fmt::Debug for BlockReferenceCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockReferenceCounter")
            .field("rules", &self.rule_names())
            .field("by_handle", &self.by_handle)
            .field("dangling", &self.dangling)
            .finish()
    }
}

impl Default for BlockReferenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Names of block definitions nothing refers to. Layout blocks always
/// count as referenced.
pub fn find_unreferenced_blocks(doc: &CadDocument) -> BTreeSet<String> {
    let mut counter = BlockReferenceCounter::new();
    counter.rebuild(doc);
    let db = doc.db();
    doc.blocks
        .iter()
        .filter(|b| db.is_alive(b.block_record))
        .filter(|b| counter.by_handle(b.record_handle) == 0)
        .map(|b| b.name(db))
        .filter(|name| !is_layout_block_name(name))
        .map(str::to_string)
        .collect()
}
