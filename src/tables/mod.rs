//! Symbol tables
//!
//! Each table is a TABLE head entity plus named entries. Entry names are
//! unique per table and compared case-sensitively; entries point back to
//! the head through their owner handle.

use crate::entities::EntityKind;
use crate::entity_db::{EntityDb, EntityId};
use crate::error::{DxfError, Result};
use crate::types::Handle;
use bitflags::bitflags;
use indexmap::IndexMap;

bitflags! {
    /// Standard flags (group code 70) shared by all table entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TableEntryFlags: i16 {
        /// Entry depends on an external reference
        const XREF_DEPENDENT = 16;
        /// Xref dependency was resolved
        const XREF_RESOLVED = 32;
        /// Entry was referenced at least once when last edited
        const REFERENCED = 64;
    }
}

bitflags! {
    /// Layer state flags (group code 70).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LayerFlags: i16 {
        const FROZEN = 1;
        /// Frozen by default in new viewports
        const FROZEN_NEW_VIEWPORTS = 2;
        const LOCKED = 4;
        const XREF_DEPENDENT = 16;
        const XREF_RESOLVED = 32;
        const REFERENCED = 64;
    }
}

/// The nine symbol tables in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    VPort,
    LineType,
    Layer,
    TextStyle,
    View,
    Ucs,
    AppId,
    DimStyle,
    BlockRecord,
}

impl TableKind {
    pub const ALL: [TableKind; 9] = [
        TableKind::VPort,
        TableKind::LineType,
        TableKind::Layer,
        TableKind::TextStyle,
        TableKind::View,
        TableKind::Ucs,
        TableKind::AppId,
        TableKind::DimStyle,
        TableKind::BlockRecord,
    ];

    /// Table name as written after `0/TABLE`, equal to the entry type
    pub fn dxf_name(&self) -> &'static str {
        match self {
            TableKind::VPort => "VPORT",
            TableKind::LineType => "LTYPE",
            TableKind::Layer => "LAYER",
            TableKind::TextStyle => "STYLE",
            TableKind::View => "VIEW",
            TableKind::Ucs => "UCS",
            TableKind::AppId => "APPID",
            TableKind::DimStyle => "DIMSTYLE",
            TableKind::BlockRecord => "BLOCK_RECORD",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.dxf_name() == name)
    }

    pub fn entry_kind(&self) -> EntityKind {
        match self {
            TableKind::VPort => EntityKind::VPort,
            TableKind::LineType => EntityKind::LineType,
            TableKind::Layer => EntityKind::Layer,
            TableKind::TextStyle => EntityKind::TextStyle,
            TableKind::View => EntityKind::View,
            TableKind::Ucs => EntityKind::Ucs,
            TableKind::AppId => EntityKind::AppId,
            TableKind::DimStyle => EntityKind::DimStyle,
            TableKind::BlockRecord => EntityKind::BlockRecord,
        }
    }

    /// Subclass marker of the table head (R13+)
    pub fn head_marker(&self) -> Option<&'static str> {
        match self {
            TableKind::DimStyle => Some("AcDbDimStyleTable"),
            _ => None,
        }
    }
}

/// One symbol table
#[derive(Debug, Clone)]
pub struct Table {
    kind: TableKind,
    head: Option<EntityId>,
    entries: IndexMap<String, EntityId>,
}

impl Table {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            head: None,
            entries: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// The TABLE head entity
    pub fn head(&self) -> Option<EntityId> {
        self.head
    }

    pub fn set_head(&mut self, head: EntityId) {
        self.head = Some(head);
    }

    /// Handle of the TABLE head, owner of every entry
    pub fn handle(&self, db: &EntityDb) -> Handle {
        self.head
            .and_then(|id| db.get(id))
            .and_then(|e| e.handle())
            .unwrap_or(Handle::NULL)
    }

    /// Add an entry; a name already in use is an error.
    pub fn add(&mut self, name: impl Into<String>, id: EntityId) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(DxfError::DuplicateEntry {
                table: self.kind.dxf_name().to_string(),
                name,
            });
        }
        self.entries.insert(name, id);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<EntityId> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<EntityId> {
        self.entries.shift_remove(name)
    }

    /// Change the key of an entry, keeping its position.
    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> Result<()> {
        let new = new.into();
        if self.entries.contains_key(&new) {
            return Err(DxfError::DuplicateEntry {
                table: self.kind.dxf_name().to_string(),
                name: new,
            });
        }
        let index = self
            .entries
            .get_index_of(old)
            .ok_or_else(|| DxfError::KeyNotFound(old.to_string()))?;
        let id = self.entries[index];
        self.entries.shift_remove_index(index);
        self.entries.shift_insert(index, new, id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, EntityId)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.values().copied()
    }

    /// Standard flags of an entry, empty when unset
    pub fn flags(&self, db: &EntityDb, name: &str) -> TableEntryFlags {
        TableEntryFlags::from_bits_truncate(self.raw_flags(db, name))
    }

    /// Layer state flags; only meaningful for the LAYER table
    pub fn layer_flags(&self, db: &EntityDb, name: &str) -> LayerFlags {
        LayerFlags::from_bits_truncate(self.raw_flags(db, name))
    }

    fn raw_flags(&self, db: &EntityDb, name: &str) -> i16 {
        self.get(name)
            .and_then(|id| db.get(id))
            .and_then(|e| e.get_int("flags"))
            .unwrap_or(0) as i16
    }

    /// Drop entries whose entity was destroyed
    pub fn purge(&mut self, db: &EntityDb) {
        self.entries.retain(|_, id| db.is_alive(*id));
    }
}

/// All symbol tables of a document
#[derive(Debug, Clone)]
pub struct Tables {
    tables: Vec<Table>,
}

impl Tables {
    pub fn new() -> Self {
        Self {
            tables: TableKind::ALL.iter().map(|k| Table::new(*k)).collect(),
        }
    }

    pub fn get(&self, kind: TableKind) -> &Table {
        // one table per kind, in ALL order
        &self.tables[kind as usize]
    }

    pub fn get_mut(&mut self, kind: TableKind) -> &mut Table {
        &mut self.tables[kind as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.iter_mut()
    }

    /// Table owning the TABLE head `handle`
    pub fn by_head_handle(&self, handle: Handle, db: &EntityDb) -> Option<TableKind> {
        self.tables
            .iter()
            .find(|t| t.handle(db) == handle)
            .map(|t| t.kind)
    }
}

impl Default for Tables {
    fn default() -> Self {
        Self::new()
    }
}
