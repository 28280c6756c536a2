//! Soft-delete entity container

use crate::entities::DxfEntity;
use crate::entity_db::{EntityDb, EntityId};

/// Ordered list of entity ids
///
/// Destroyed entities stay in the list until [`purge`](Self::purge):
/// iteration skips them, [`len`](Self::len) and [`get`](Self::get) do not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySpace {
    ids: Vec<EntityId>,
}

impl EntitySpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: EntityId) {
        self.ids.push(id);
    }

    pub fn insert(&mut self, index: usize, id: EntityId) {
        self.ids.insert(index.min(self.ids.len()), id);
    }

    /// Remove `id` from the container without destroying the entity
    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.ids.iter().position(|e| *e == id) {
            Some(index) => {
                self.ids.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    /// Raw length including destroyed entities
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Raw index access including destroyed entities
    pub fn get(&self, index: usize) -> Option<EntityId> {
        self.ids.get(index).copied()
    }

    /// All ids, live or not
    pub fn raw_ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Live ids in order
    pub fn iter<'a>(&'a self, db: &'a EntityDb) -> impl Iterator<Item = EntityId> + 'a {
        self.ids.iter().copied().filter(move |id| db.is_alive(*id))
    }

    /// Live entities in order
    pub fn entities<'a>(&'a self, db: &'a EntityDb) -> impl Iterator<Item = &'a DxfEntity> + 'a {
        self.iter(db).filter_map(move |id| db.get(id))
    }

    pub fn live_count(&self, db: &EntityDb) -> usize {
        self.iter(db).count()
    }

    /// Drop destroyed entities from the list
    pub fn purge(&mut self, db: &EntityDb) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| db.is_alive(*id));
        before - self.ids.len()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

impl FromIterator<EntityId> for EntitySpace {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DxfVersion;

    #[test]
    fn test_soft_delete_semantics() {
        let mut db = EntityDb::new();
        let mut space = EntitySpace::new();
        for _ in 0..3 {
            space.push(db.add(DxfEntity::new("POINT", DxfVersion::AC1015)).unwrap());
        }
        let middle = space.get(1).unwrap();
        db.destroy(middle);

        assert_eq!(space.len(), 3);
        assert_eq!(space.get(1), Some(middle));
        assert_eq!(space.iter(&db).count(), 2);
        assert!(!space.iter(&db).any(|id| id == middle));

        assert_eq!(space.purge(&db), 1);
        assert_eq!(space.len(), 2);
    }
}
