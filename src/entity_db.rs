//! Entity storage and handle registry
//!
//! All entities of a document live in one arena owned by [`EntityDb`].
//! Containers (layouts, blocks, tables, the objects section) hold
//! [`EntityId`]s into it; the handle index maps DXF handles to ids.

use crate::entities::DxfEntity;
use crate::error::{DxfError, Result};
use crate::types::{sort_handles, Handle, HandleGenerator};
use ahash::AHashMap;

/// Index of an entity in the document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Entity arena plus `handle → entity` index
#[derive(Debug, Clone, Default)]
pub struct EntityDb {
    entities: Vec<DxfEntity>,
    handles: AHashMap<Handle, EntityId>,
    generator: HandleGenerator,
}

impl EntityDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity. A handle already set on the entity is registered,
    /// entities that support handles but have none get a new one.
    pub fn add(&mut self, mut entity: DxfEntity) -> Result<EntityId> {
        let handle = match entity.handle() {
            Some(handle) => Some(handle),
            None if entity.is_supported("handle") => {
                let handle = self.allocate();
                entity.set_handle(handle)?;
                Some(handle)
            }
            None => None,
        };
        let id = EntityId(self.entities.len());
        self.entities.push(entity);
        if let Some(handle) = handle {
            if let Err(err) = self.register(handle, id) {
                self.entities.pop();
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Store a new entity under a freshly allocated handle.
    pub(crate) fn add_new(&mut self, mut entity: DxfEntity) -> EntityId {
        let id = EntityId(self.entities.len());
        if entity.is_supported("handle") {
            let handle = self.allocate();
            entity.put("handle", handle);
            self.handles.insert(handle, id);
        }
        self.entities.push(entity);
        id
    }

    /// New unique handle; never one already registered or seen
    pub fn allocate(&mut self) -> Handle {
        loop {
            let handle = self.generator.next_handle();
            if !self.handles.contains_key(&handle) {
                return handle;
            }
        }
    }

    /// Bind `handle` to an entity already in the arena.
    ///
    /// The null handle and handles bound to another live entity are
    /// rejected.
    pub fn register(&mut self, handle: Handle, id: EntityId) -> Result<()> {
        if handle.is_null() {
            return Err(DxfError::InvalidHandle(handle.to_hex()));
        }
        if id.0 >= self.entities.len() {
            return Err(DxfError::InvalidOperation(format!(
                "entity id {} out of range",
                id.0
            )));
        }
        if let Some(existing) = self.handles.get(&handle) {
            if *existing != id && self.entities[existing.0].is_alive() {
                return Err(DxfError::InvalidHandle(format!(
                    "{} already registered",
                    handle
                )));
            }
        }
        self.handles.insert(handle, id);
        self.generator.advance_past(handle);
        Ok(())
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.resolve(handle).is_some()
    }

    /// Live entity for `handle`
    pub fn resolve(&self, handle: Handle) -> Option<EntityId> {
        self.handles
            .get(&handle)
            .copied()
            .filter(|id| self.entities[id.0].is_alive())
    }

    /// Like [`resolve`](Self::resolve) but a missing handle is an error
    pub fn try_resolve(&self, handle: Handle) -> Result<EntityId> {
        self.resolve(handle)
            .ok_or_else(|| DxfError::HandleNotFound(handle.to_hex()))
    }

    /// Raw access, includes destroyed entities
    pub fn get(&self, id: EntityId) -> Option<&DxfEntity> {
        self.entities.get(id.0)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut DxfEntity> {
        self.entities.get_mut(id.0)
    }

    pub fn by_handle(&self, handle: Handle) -> Option<&DxfEntity> {
        self.resolve(handle).and_then(|id| self.get(id))
    }

    pub fn destroy(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get_mut(id.0) {
            entity.destroy();
        }
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.get(id).map_or(false, DxfEntity::is_alive)
    }

    /// Re-derive the handle index from the arena.
    ///
    /// Destroyed entities drop out of the index; calling it twice yields
    /// the same mapping.
    pub fn rebuild(&mut self) {
        self.handles.clear();
        for (index, entity) in self.entities.iter().enumerate() {
            if !entity.is_alive() {
                continue;
            }
            if let Some(handle) = entity.handle() {
                self.handles.insert(handle, EntityId(index));
                self.generator.advance_past(handle);
            }
        }
    }

    /// Handles of all live entities in handle order
    pub fn sorted_handles(&self, descending: bool) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self
            .handles
            .iter()
            .filter(|(_, id)| self.entities[id.0].is_alive())
            .map(|(h, _)| *h)
            .collect();
        sort_handles(&mut handles, descending);
        handles
    }

    /// Next handle the generator hands out, written as `$HANDSEED`
    pub fn seed(&self) -> Handle {
        self.generator.seed()
    }

    pub fn advance_seed(&mut self, handle: Handle) {
        self.generator.advance_past(handle);
    }

    /// Arena size including destroyed entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of handles currently registered
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Live entities with their ids
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &DxfEntity)> {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_alive())
            .map(|(i, e)| (EntityId(i), e))
    }

    pub fn mapping(&self) -> &AHashMap<Handle, EntityId> {
        &self.handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DxfVersion;

    fn line() -> DxfEntity {
        DxfEntity::new("LINE", DxfVersion::AC1015)
    }

    #[test]
    fn test_add_assigns_handle() {
        let mut db = EntityDb::new();
        let a = db.add(line()).unwrap();
        let b = db.add(line()).unwrap();
        let ha = db.get(a).unwrap().handle().unwrap();
        let hb = db.get(b).unwrap().handle().unwrap();
        assert_ne!(ha, hb);
        assert_eq!(db.resolve(ha), Some(a));
    }

    #[test]
    fn test_allocate_skips_existing_handles() {
        let mut db = EntityDb::new();
        let mut entity = line();
        entity.set_handle(Handle::new(1)).unwrap();
        db.add(entity).unwrap();
        assert_eq!(db.allocate(), Handle::new(2));
    }

    #[test]
    fn test_register_rejects_conflicts() {
        let mut db = EntityDb::new();
        let a = db.add(line()).unwrap();
        let b = db.add(line()).unwrap();
        let ha = db.get(a).unwrap().handle().unwrap();
        assert!(db.register(ha, b).is_err());
        assert!(db.register(Handle::NULL, b).is_err());
    }

    #[test]
    fn test_destroyed_handles_are_not_reused() {
        let mut db = EntityDb::new();
        let a = db.add(line()).unwrap();
        let ha = db.get(a).unwrap().handle().unwrap();
        db.destroy(a);
        assert_eq!(db.resolve(ha), None);
        assert!(matches!(db.try_resolve(ha), Err(DxfError::HandleNotFound(_))));
        let next = db.allocate();
        assert!(next > ha);
    }

    #[test]
    fn test_rebuild_idempotent() {
        let mut db = EntityDb::new();
        let ids: Vec<_> = (0..5).map(|_| db.add(line()).unwrap()).collect();
        db.destroy(ids[2]);
        db.rebuild();
        let first = db.sorted_handles(false);
        db.rebuild();
        assert_eq!(db.sorted_handles(false), first);
        assert_eq!(first.len(), 4);
        assert_eq!(db.handle_count(), 4);
        assert_eq!(db.len(), 5);
    }

    #[test]
    fn test_entities_without_handle_support() {
        let mut db = EntityDb::new();
        let id = db.add(DxfEntity::new("CLASS", DxfVersion::AC1015)).unwrap();
        assert_eq!(db.get(id).unwrap().handle(), None);
        assert_eq!(db.handle_count(), 0);
    }
}
