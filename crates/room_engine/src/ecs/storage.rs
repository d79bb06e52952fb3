//! Sparse-set component storage
//!
//! Each component type lives in its own [`SparseSet`]: a dense array of values packed
//! next to the owning entities, plus a sparse index from entity id to dense slot.
//! Lookups are O(1), iteration touches only live components, and removal swaps the
//! last element into the hole so the dense arrays never fragment.

use std::any::Any;

use super::{Component, Entity};

/// Dense component array indexed through a sparse entity table
pub struct SparseSet<T> {
    sparse: Vec<Option<usize>>,
    entities: Vec<Entity>,
    values: Vec<T>,
}

impl<T> SparseSet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            entities: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Insert or replace the value for `entity`, returning the previous value
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let index = entity.index();
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, None);
        }

        if let Some(slot) = self.sparse[index] {
            return Some(std::mem::replace(&mut self.values[slot], value));
        }

        self.sparse[index] = Some(self.values.len());
        self.entities.push(entity);
        self.values.push(value);
        None
    }

    /// Remove the value for `entity`
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.sparse.get_mut(entity.index())?.take()?;
        let last = self.values.len() - 1;

        if slot != last {
            let moved = self.entities[last];
            self.sparse[moved.index()] = Some(slot);
        }

        self.entities.swap_remove(slot);
        Some(self.values.swap_remove(slot))
    }

    /// Borrow the value for `entity`
    pub fn get(&self, entity: Entity) -> Option<&T> {
        let slot = (*self.sparse.get(entity.index())?)?;
        self.values.get(slot)
    }

    /// Mutably borrow the value for `entity`
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let slot = (*self.sparse.get(entity.index())?)?;
        self.values.get_mut(slot)
    }

    /// Whether `entity` has a value
    pub fn contains(&self, entity: Entity) -> bool {
        matches!(self.sparse.get(entity.index()), Some(Some(_)))
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(entity, value)` pairs in dense order
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    /// Iterate `(entity, value)` pairs mutably in dense order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a component set, used by the world for bulk operations
pub(super) trait ErasedStorage: Any + Send + Sync {
    fn remove_entity(&mut self, entity: Entity);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStorage for SparseSet<T> {
    fn remove_entity(&mut self, entity: Entity) {
        self.remove(entity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_remove_keeps_index_consistent() {
        let mut set = SparseSet::new();
        let a = Entity::new(0);
        let b = Entity::new(5);
        let c = Entity::new(2);

        set.insert(a, "a");
        set.insert(b, "b");
        set.insert(c, "c");

        assert_eq!(set.remove(a), Some("a"));
        assert_eq!(set.get(c), Some(&"c"));
        assert_eq!(set.get(b), Some(&"b"));
        assert_eq!(set.len(), 2);
        assert!(!set.contains(a));

        // Removing twice is harmless
        assert_eq!(set.remove(a), None);
    }

    #[test]
    fn test_insert_replaces() {
        let mut set = SparseSet::new();
        let e = Entity::new(3);
        assert_eq!(set.insert(e, 1), None);
        assert_eq!(set.insert(e, 2), Some(1));
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![(e, &2)]);
    }

    #[test]
    fn test_unknown_entity_lookups() {
        let set: SparseSet<u8> = SparseSet::new();
        assert!(set.get(Entity::new(100)).is_none());
        assert!(!set.contains(Entity::new(0)));
        assert!(set.is_empty());
    }
}
