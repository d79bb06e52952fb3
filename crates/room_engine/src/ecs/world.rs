//! ECS World implementation
//!
//! The world is the scene registry: it hands out entity ids and owns one
//! [`SparseSet`] per component type. Systems borrow it for the duration of their
//! update; the single-threaded frame loop guarantees only one writer at a time.

use super::storage::{ErasedStorage, SparseSet};
use super::{Component, Entity};
use std::any::TypeId;
use std::collections::HashMap;

/// ECS World containing all entities and components
pub struct World {
    next_entity_id: u32,
    entities: Vec<Entity>,
    component_storages: HashMap<TypeId, Box<dyn ErasedStorage>>,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        Self {
            next_entity_id: 0,
            entities: Vec::new(),
            component_storages: HashMap::new(),
        }
    }

    /// Create a new entity
    pub fn create_entity(&mut self) -> Entity {
        let entity = Entity::new(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.push(entity);
        entity
    }

    /// Destroy an entity and drop all of its components
    ///
    /// Returns false if the entity was not alive.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        let Some(position) = self.entities.iter().position(|e| *e == entity) else {
            return false;
        };
        self.entities.swap_remove(position);
        for storage in self.component_storages.values_mut() {
            storage.remove_entity(entity);
        }
        true
    }

    /// Whether the entity exists
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Add a component to an entity, returning the component it replaced
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Option<T> {
        debug_assert!(self.is_alive(entity), "component added to dead entity {:?}", entity);
        self.storage_mut::<T>().insert(entity, component)
    }

    /// Remove a component from an entity
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.existing_storage_mut::<T>()?.remove(entity)
    }

    /// Get a component from an entity
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    /// Get a mutable component from an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.existing_storage_mut::<T>()?.get_mut(entity)
    }

    /// Whether the entity carries a component of type `T`
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>().is_some_and(|s| s.contains(entity))
    }

    /// Number of entities carrying `T`
    pub fn count<T: Component>(&self) -> usize {
        self.storage::<T>().map_or(0, SparseSet::len)
    }

    /// Iterate every entity carrying `T`
    pub fn query<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.storage::<T>().into_iter().flat_map(SparseSet::iter)
    }

    /// Iterate every entity carrying `T`, mutably
    pub fn query_mut<T: Component>(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.existing_storage_mut::<T>().into_iter().flat_map(SparseSet::iter_mut)
    }

    /// Visit every entity carrying both `A` and `B`, with `A` borrowed mutably
    ///
    /// `A`'s storage is detached for the duration of the visit so both sets can be
    /// borrowed at once. Asking for the same type twice visits nothing.
    pub fn query_pair_mut<A: Component, B: Component>(&mut self, mut visit: impl FnMut(Entity, &mut A, &B)) {
        if TypeId::of::<A>() == TypeId::of::<B>() {
            log::warn!("query_pair_mut called with one component type for both sides");
            return;
        }

        let Some(mut detached) = self.component_storages.remove(&TypeId::of::<A>()) else {
            return;
        };

        if let (Some(first), Some(second)) = (
            detached.as_any_mut().downcast_mut::<SparseSet<A>>(),
            self.storage::<B>(),
        ) {
            for (entity, a) in first.iter_mut() {
                if let Some(b) = second.get(entity) {
                    visit(entity, a, b);
                }
            }
        }

        self.component_storages.insert(TypeId::of::<A>(), detached);
    }

    /// Get an iterator over all entities
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.component_storages
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<SparseSet<T>>())
    }

    fn existing_storage_mut<T: Component>(&mut self) -> Option<&mut SparseSet<T>> {
        self.component_storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<SparseSet<T>>())
    }

    fn storage_mut<T: Component>(&mut self) -> &mut SparseSet<T> {
        let erased = self
            .component_storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()));

        match erased.as_any_mut().downcast_mut::<SparseSet<T>>() {
            Some(set) => set,
            None => unreachable!("storage registered under the wrong TypeId"),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[derive(Debug, PartialEq)]
    struct Name(&'static str);
    impl Component for Name {}

    #[test]
    fn test_add_get_remove() {
        let mut world = World::new();
        let e = world.create_entity();

        assert!(world.get_component::<Health>(e).is_none());
        world.add_component(e, Health(10));
        assert_eq!(world.get_component::<Health>(e), Some(&Health(10)));

        world.get_component_mut::<Health>(e).unwrap().0 = 7;
        assert_eq!(world.remove_component::<Health>(e), Some(Health(7)));
        assert!(!world.has_component::<Health>(e));
    }

    #[test]
    fn test_destroy_drops_every_component() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        world.add_component(a, Health(1));
        world.add_component(a, Name("a"));
        world.add_component(b, Health(2));

        assert!(world.destroy_entity(a));
        assert!(!world.destroy_entity(a));
        assert!(!world.is_alive(a));
        assert_eq!(world.count::<Health>(), 1);
        assert_eq!(world.count::<Name>(), 0);
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut world = World::new();
        let a = world.create_entity();
        world.destroy_entity(a);
        let b = world.create_entity();
        assert_ne!(a, b);
    }

    #[test]
    fn test_query_pair_mut_joins() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        let c = world.create_entity();
        world.add_component(a, Health(1));
        world.add_component(a, Name("a"));
        world.add_component(b, Health(2));
        world.add_component(c, Name("c"));

        let mut visited = Vec::new();
        world.query_pair_mut::<Health, Name>(|entity, health, name| {
            health.0 += 100;
            visited.push((entity, name.0));
        });

        assert_eq!(visited, vec![(a, "a")]);
        assert_eq!(world.get_component::<Health>(a), Some(&Health(101)));
        assert_eq!(world.get_component::<Health>(b), Some(&Health(2)));
        // Storage is restored after the visit
        assert_eq!(world.count::<Health>(), 2);
    }

    #[test]
    fn test_query_pair_mut_same_type_visits_nothing() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Health(3));

        let mut visited = 0;
        world.query_pair_mut::<Health, Health>(|_, _, _| visited += 1);

        assert_eq!(visited, 0);
        assert_eq!(world.get_component::<Health>(e), Some(&Health(3)));
    }

    #[test]
    fn test_query_iterates_only_owners() {
        let mut world = World::new();
        let a = world.create_entity();
        let _b = world.create_entity();
        world.add_component(a, Health(3));

        let found: Vec<_> = world.query::<Health>().map(|(e, _)| e).collect();
        assert_eq!(found, vec![a]);
        assert_eq!(world.query::<Name>().count(), 0);
    }
}
