//! BLOCKS section
//!
//! A block definition is a BLOCK_RECORD table entry plus the BLOCK and
//! ENDBLK entities and the entities between them. Layouts store their
//! entities in blocks too: modelspace in `*Model_Space`, paperspace
//! layouts in `*Paper_Space`, `*Paper_Space0`, ...

pub mod references;

pub use references::{
    find_unreferenced_blocks, BlockDefinitionIndex, BlockRef, BlockReferenceCounter,
    DanglingReference, ReferenceRule,
};

use crate::entities::EntitySpace;
use crate::entity_db::{EntityDb, EntityId};
use crate::error::{DxfError, Result};
use crate::types::Handle;
use bitflags::bitflags;
use indexmap::IndexMap;

bitflags! {
    /// BLOCK type flags (group code 70).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BlockFlags: i16 {
        /// Anonymous block generated by hatching, dimensioning, ...
        const ANONYMOUS = 1;
        const NON_CONSTANT_ATTRIBUTES = 2;
        const XREF = 4;
        const XREF_OVERLAY = 8;
        /// Externally dependent
        const EXTERNAL = 16;
        const RESOLVED = 32;
        const REFERENCED = 64;
    }
}

pub const MODEL_SPACE: &str = "*Model_Space";
pub const PAPER_SPACE: &str = "*Paper_Space";
pub const MODEL_SPACE_R12: &str = "$MODEL_SPACE";
pub const PAPER_SPACE_R12: &str = "$PAPER_SPACE";

pub fn is_modelspace_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(MODEL_SPACE) || name.eq_ignore_ascii_case(MODEL_SPACE_R12)
}

/// `*Paper_Space`, `*Paper_Space0`, ... and `$PAPER_SPACE`
pub fn is_paperspace_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("*paper_space") || lower == "$paper_space"
}

/// The active paperspace block, as opposed to `*Paper_Space0` etc.
pub fn is_active_paperspace_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(PAPER_SPACE) || name.eq_ignore_ascii_case(PAPER_SPACE_R12)
}

pub fn is_layout_block_name(name: &str) -> bool {
    is_modelspace_name(name) || is_paperspace_name(name)
}

/// Anonymous block names start with `*`, e.g. `*D12` or `*U3`
pub fn is_anonymous_name(name: &str) -> bool {
    name.starts_with('*') && !is_layout_block_name(name)
}

/// One block definition
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    /// Handle of the BLOCK_RECORD, the key of the block
    pub record_handle: Handle,
    pub block_record: EntityId,
    pub block: EntityId,
    pub endblk: EntityId,
    pub entities: EntitySpace,
}

impl BlockLayout {
    /// Block name, taken from the BLOCK_RECORD
    pub fn name<'a>(&self, db: &'a EntityDb) -> &'a str {
        db.get(self.block_record)
            .and_then(|e| e.name())
            .unwrap_or_default()
    }

    pub fn flags(&self, db: &EntityDb) -> BlockFlags {
        let bits = db
            .get(self.block)
            .and_then(|e| e.get_int("flags"))
            .unwrap_or(0);
        BlockFlags::from_bits_truncate(bits as i16)
    }

    pub fn is_layout_block(&self, db: &EntityDb) -> bool {
        is_layout_block_name(self.name(db))
    }

    pub fn is_xref(&self, db: &EntityDb) -> bool {
        self.flags(db)
            .intersects(BlockFlags::XREF | BlockFlags::XREF_OVERLAY)
    }
}

/// All block definitions keyed by BLOCK_RECORD handle
///
/// The modelspace block is held apart from the others, so it can be
/// neither removed nor replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct BlocksSection {
    model: BlockLayout,
    blocks: IndexMap<Handle, BlockLayout>,
}

impl BlocksSection {
    pub fn new(model: BlockLayout) -> Self {
        Self {
            model,
            blocks: IndexMap::new(),
        }
    }

    pub fn modelspace(&self) -> &BlockLayout {
        &self.model
    }

    pub fn modelspace_mut(&mut self) -> &mut BlockLayout {
        &mut self.model
    }

    pub fn insert(&mut self, block: BlockLayout) -> Result<()> {
        if block.record_handle == self.model.record_handle
            || self.blocks.contains_key(&block.record_handle)
        {
            return Err(DxfError::Structure(format!(
                "block record {} already has a block definition",
                block.record_handle
            )));
        }
        self.blocks.insert(block.record_handle, block);
        Ok(())
    }

    pub fn get(&self, record: Handle) -> Option<&BlockLayout> {
        if record == self.model.record_handle {
            return Some(&self.model);
        }
        self.blocks.get(&record)
    }

    pub fn get_mut(&mut self, record: Handle) -> Option<&mut BlockLayout> {
        if record == self.model.record_handle {
            return Some(&mut self.model);
        }
        self.blocks.get_mut(&record)
    }

    pub fn contains(&self, record: Handle) -> bool {
        self.get(record).is_some()
    }

    /// Remove a block definition; modelspace is never removed.
    pub fn remove(&mut self, record: Handle) -> Option<BlockLayout> {
        self.blocks.shift_remove(&record)
    }

    /// Modelspace first, then the other blocks in file order
    pub fn iter(&self) -> impl Iterator<Item = &BlockLayout> {
        std::iter::once(&self.model).chain(self.blocks.values())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BlockLayout> {
        std::iter::once(&mut self.model).chain(self.blocks.values_mut())
    }

    pub fn len(&self) -> usize {
        self.blocks.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Block definition containing entity `id`
    pub fn owner_of(&self, id: EntityId) -> Option<&BlockLayout> {
        self.iter()
            .find(|b| b.entities.contains(id) || b.block == id || b.endblk == id)
    }
}
