use std::any::Any;

use nohash::IntMap;

use crate::Component;
use crate::Entity;

/// Type erased view of a [ComponentPool] so the world can hold pools of every component type in
/// a single list.
pub(crate) trait DynamicComponentPool {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn remove_entity(&mut self, entity: Entity);
}

/// # Component Pool
///
/// Dense storage for one component type, keyed by entity index. Removal swaps the last value into
/// the vacated slot so values stay packed.
pub struct ComponentPool<T> {
    indexes: IntMap<u32, usize>,
    owners: Vec<Entity>,
    items: Vec<T>,
}

impl<T: Component> ComponentPool<T> {
    /// Returns an empty pool.
    pub fn new() -> Self {
        Self {
            indexes: IntMap::default(),
            owners: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Inserts the value for the entity, replacing any existing value.
    pub fn insert(&mut self, entity: Entity, value: T) -> &mut T {
        let existing = self.indexes.get(&entity.index()).copied();
        match existing {
            Some(index) => {
                self.owners[index] = entity;
                self.items[index] = value;
                &mut self.items[index]
            }
            None => {
                let index = self.items.len();
                self.indexes.insert(entity.index(), index);
                self.owners.push(entity);
                self.items.push(value);
                &mut self.items[index]
            }
        }
    }

    /// Returns the value for the entity.
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.index_of(entity).map(|index| &self.items[index])
    }

    /// Returns the value for the entity.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.index_of(entity).map(|index| &mut self.items[index])
    }

    /// Returns true if the pool holds a value for the entity.
    pub fn contains(&self, entity: Entity) -> bool {
        self.index_of(entity).is_some()
    }

    /// Removes and returns the value for the entity.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let index = self.index_of(entity)?;
        self.indexes.remove(&entity.index());
        self.owners.swap_remove(index);
        let value = self.items.swap_remove(index);

        if let Some(moved) = self.owners.get(index) {
            self.indexes.insert(moved.index(), index);
        }

        Some(value)
    }

    /// Returns the number of values in the pool.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the entities and values in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.owners.iter().copied().zip(self.items.iter())
    }

    fn index_of(&self, entity: Entity) -> Option<usize> {
        self.indexes
            .get(&entity.index())
            .copied()
            .filter(|index| self.owners[*index] == entity)
    }
}

impl<T: Component> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> DynamicComponentPool for ComponentPool<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_entity(&mut self, entity: Entity) {
        self.remove(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(u32);

    impl Component for Health {}

    #[test]
    fn insert_get_returns_value() {
        let mut pool = ComponentPool::new();
        let entity = Entity::new(3, 0);

        pool.insert(entity, Health(17));

        assert_eq!(pool.get(entity), Some(&Health(17)));
    }

    #[test]
    fn insert_existing_replaces_value() {
        let mut pool = ComponentPool::new();
        let entity = Entity::new(0, 0);
        pool.insert(entity, Health(17));

        pool.insert(entity, Health(192));

        assert_eq!(pool.get(entity), Some(&Health(192)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn get_with_stale_generation_returns_none() {
        let mut pool = ComponentPool::new();
        pool.insert(Entity::new(0, 0), Health(17));

        assert_eq!(pool.get(Entity::new(0, 1)), None);
    }

    #[test]
    fn remove_get_returns_none() {
        let mut pool = ComponentPool::new();
        let entity = Entity::new(0, 0);
        pool.insert(entity, Health(17));

        let removed = pool.remove(entity);

        assert_eq!(removed, Some(Health(17)));
        assert_eq!(pool.get(entity), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn remove_first_keeps_moved_value_reachable() {
        let mut pool = ComponentPool::new();
        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);
        let c = Entity::new(2, 0);
        pool.insert(a, Health(1));
        pool.insert(b, Health(2));
        pool.insert(c, Health(3));

        pool.remove(a);

        assert_eq!(pool.get(b), Some(&Health(2)));
        assert_eq!(pool.get(c), Some(&Health(3)));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn get_mut_modifies_value() {
        let mut pool = ComponentPool::new();
        let entity = Entity::new(0, 0);
        pool.insert(entity, Health(17));

        if let Some(health) = pool.get_mut(entity) {
            health.0 = 5;
        }

        assert_eq!(pool.get(entity), Some(&Health(5)));
    }
}
