//! Required document structure
//!
//! New documents are built from these routines, and loaded documents use
//! them to fill in whatever structure the file lacks.

use crate::blocks::BlockLayout;
use crate::entities::{DxfEntity, EntityKind, EntitySpace};
use crate::entity_db::{EntityDb, EntityId};
use crate::objects::{dictionary_get, dictionary_set, ObjectsSection, ACAD_LAYOUT};
use crate::tables::{TableKind, Tables};
use crate::types::{DxfVersion, Handle, Vector3};
use tracing::debug;

const REQUIRED_ENTRIES: &[(TableKind, &str)] = &[
    (TableKind::VPort, "*Active"),
    (TableKind::LineType, "ByBlock"),
    (TableKind::LineType, "ByLayer"),
    (TableKind::LineType, "Continuous"),
    (TableKind::Layer, "0"),
    (TableKind::TextStyle, "Standard"),
    (TableKind::AppId, "ACAD"),
    (TableKind::DimStyle, "Standard"),
];

/// Named dictionaries every R2000+ document carries
const NAMED_DICTIONARIES: &[&str] = &["ACAD_GROUP", ACAD_LAYOUT];

/// Builds table heads, entries and blocks into an entity store
pub(crate) struct Setup<'a> {
    pub db: &'a mut EntityDb,
    pub tables: &'a mut Tables,
    pub version: DxfVersion,
}

impl<'a> Setup<'a> {
    pub fn new(db: &'a mut EntityDb, tables: &'a mut Tables, version: DxfVersion) -> Self {
        Self {
            db,
            tables,
            version,
        }
    }

    /// Create the TABLE head of every table that has none.
    pub fn table_heads(&mut self) {
        for kind in TableKind::ALL {
            if self.tables.get(kind).head().is_some() {
                continue;
            }
            let mut head = DxfEntity::new("TABLE", self.version);
            head.put("name", kind.dxf_name());
            head.put("owner", Handle::NULL);
            head.put("count", 0);
            if let Some(marker) = kind.head_marker() {
                head.add_subclass(marker);
            }
            let id = self.db.add_new(head);
            self.tables.get_mut(kind).set_head(id);
            debug!(table = kind.dxf_name(), "created table head");
        }
    }

    fn head_handle(&self, kind: TableKind) -> Handle {
        self.tables.get(kind).handle(self.db)
    }

    /// Table entry `name`, created with default attributes if missing.
    pub fn entry(&mut self, kind: TableKind, name: &str) -> EntityId {
        if let Some(id) = self.tables.get(kind).get(name) {
            return id;
        }
        let mut entry = DxfEntity::new(kind.dxf_name(), self.version);
        entry.put("name", name);
        entry.put("owner", self.head_handle(kind));
        if kind != TableKind::BlockRecord {
            entry.put("flags", 0);
        }
        match kind {
            TableKind::Layer => {
                entry.put("color", 7);
                entry.put("linetype", "Continuous");
            }
            TableKind::LineType => {
                let description = if name.eq_ignore_ascii_case("Continuous") {
                    "Solid line"
                } else {
                    ""
                };
                entry.put("description", description);
                entry.put("alignment", 65);
                entry.put("items", 0);
                entry.put("total_pattern_length", 0.0);
            }
            TableKind::TextStyle => {
                entry.put("height", 0.0);
                entry.put("width", 1.0);
                entry.put("oblique", 0.0);
                entry.put("generation_flags", 0);
                entry.put("last_height", 2.5);
                entry.put("font", "txt");
                entry.put("bigfont", "");
            }
            TableKind::VPort => {
                entry.put("lower_left", Vector3::ZERO);
                entry.put("upper_right", Vector3::new(1.0, 1.0, 0.0));
            }
            _ => {}
        }
        let id = self.db.add_new(entry);
        // names are checked above
        self.tables.get_mut(kind).add(name, id).ok();
        debug!(table = kind.dxf_name(), name, "created table entry");
        id
    }

    /// Add the default linetypes, layer "0", the standard text and
    /// dimension styles, the ACAD AppID and the active viewport.
    ///
    /// R12 files spell these in capitals, so existing entries are matched
    /// case-insensitively.
    pub fn required_entries(&mut self) {
        for (kind, name) in REQUIRED_ENTRIES {
            let present = self
                .tables
                .get(*kind)
                .names()
                .any(|n| n.eq_ignore_ascii_case(name));
            if !present {
                self.entry(*kind, name);
            }
        }
    }

    /// New block definition: BLOCK_RECORD entry plus BLOCK and ENDBLK.
    pub fn block(&mut self, name: &str) -> BlockLayout {
        let block_record = self.entry(TableKind::BlockRecord, name);
        self.block_for_record(block_record, name)
    }

    /// BLOCK and ENDBLK for an existing block record
    pub fn block_for_record(&mut self, block_record: EntityId, name: &str) -> BlockLayout {
        let record_handle = self
            .db
            .get(block_record)
            .and_then(|e| e.handle())
            .unwrap_or(Handle::NULL);
        let (block, endblk) = self.block_markers(record_handle, name);
        BlockLayout {
            record_handle,
            block_record,
            block,
            endblk,
            entities: EntitySpace::new(),
        }
    }

    pub fn block_markers(&mut self, record_handle: Handle, name: &str) -> (EntityId, EntityId) {
        let block = self.block_entity(record_handle, name);
        let endblk = self.endblk_entity(record_handle);
        debug!(block = name, "created BLOCK/ENDBLK pair");
        (block, endblk)
    }

    pub fn block_entity(&mut self, record_handle: Handle, name: &str) -> EntityId {
        let mut block = DxfEntity::new("BLOCK", self.version);
        block.put("owner", record_handle);
        block.put("layer", "0");
        block.put("name", name);
        block.put("flags", 0);
        block.put("base_point", Vector3::ZERO);
        block.put("name2", name);
        block.put("xref_path", "");
        self.db.add_new(block)
    }

    pub fn endblk_entity(&mut self, record_handle: Handle) -> EntityId {
        let mut endblk = DxfEntity::new("ENDBLK", self.version);
        endblk.put("owner", record_handle);
        endblk.put("layer", "0");
        self.db.add_new(endblk)
    }
}

fn new_dictionary(version: DxfVersion, owner: Handle) -> DxfEntity {
    let mut dict = DxfEntity::new("DICTIONARY", version);
    dict.put("owner", owner);
    dict.put("cloning", 1);
    dict
}

/// Root dictionary plus the named dictionaries of R2000+ documents.
pub(crate) fn objects_structure(db: &mut EntityDb, objects: &mut ObjectsSection, version: DxfVersion) {
    if version.is_legacy() {
        return;
    }
    let root = match objects.root_dict().filter(|id| db.is_alive(*id)) {
        Some(root) => root,
        None => {
            let root = db.add_new(new_dictionary(version, Handle::NULL));
            objects.space.insert(0, root);
            objects.set_root_dict(root);
            debug!("created root dictionary");
            root
        }
    };
    let root_handle = db.get(root).and_then(|e| e.handle()).unwrap_or(Handle::NULL);

    for name in NAMED_DICTIONARIES {
        let existing = db
            .get(root)
            .and_then(|r| dictionary_get(r, name))
            .and_then(|h| db.resolve(h));
        if existing.is_some() {
            continue;
        }
        let id = db.add_new(new_dictionary(version, root_handle));
        objects.push(id);
        let handle = db.get(id).and_then(|e| e.handle()).unwrap_or(Handle::NULL);
        if let Some(root) = db.get_mut(root) {
            dictionary_set(root, name, handle);
        }
        debug!(dictionary = *name, "created named dictionary");
    }
}

/// New LAYOUT object registered in `ACAD_LAYOUT`
pub(crate) fn layout_object(
    db: &mut EntityDb,
    objects: &mut ObjectsSection,
    version: DxfVersion,
    name: &str,
    block_record: Handle,
    taborder: i64,
) -> Option<EntityId> {
    if version.is_legacy() {
        return None;
    }
    let dict_id = objects.named_object(db, ACAD_LAYOUT)?;
    let dict_handle = db.get(dict_id).and_then(|e| e.handle())?;

    let mut layout = DxfEntity::new("LAYOUT", version);
    layout.put("owner", dict_handle);
    layout.put("page_setup_name", "");
    layout.put("name", name);
    layout.put("flags", if taborder == 0 { 1 } else { 0 });
    layout.put("taborder", taborder);
    layout.put("block_record_handle", block_record);
    let id = db.add_new(layout);
    objects.push(id);

    let handle = db.get(id).and_then(|e| e.handle())?;
    if let Some(dict) = db.get_mut(dict_id) {
        dictionary_set(dict, name, handle);
    }
    if let Some(record) = db.resolve(block_record).and_then(|rid| db.get_mut(rid)) {
        if record.kind() == EntityKind::BlockRecord {
            record.put("layout", handle);
        }
    }
    debug!(layout = name, "created LAYOUT object");
    Some(id)
}
