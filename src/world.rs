use std::any::type_name;

use crate::pool::DynamicComponentPool;
use crate::Component;
use crate::ComponentId;
use crate::ComponentMask;
use crate::ComponentPool;
use crate::ComponentRegistry;
use crate::EcsError;
use crate::Entity;
use crate::EntityStore;

/// # World
///
/// Entity identities, the component registry and one pool per component type.
///
/// Mask changes are recorded so the owning [Scene](crate::Scene) can route entities to systems.
/// Destruction requested through [World::queue_destroy] is deferred until the pending changes are
/// applied, by the scene at the start of the next step or by [World::maintain].
#[derive(Default)]
pub struct World {
    entities: EntityStore,
    registry: ComponentRegistry,
    pools: Vec<Option<Box<dyn DynamicComponentPool>>>,
    changed: Vec<Entity>,
    pending_destroy: Vec<Entity>,
}

impl World {
    /// Returns an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new entity without any components.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entities.create();
        self.changed.push(entity);
        entity
    }

    /// Returns true if the handle refers to a live entity.
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.entities.is_valid(entity)
    }

    /// Returns the component mask of a live entity.
    pub fn mask(&self, entity: Entity) -> Option<ComponentMask> {
        self.entities.mask(entity)
    }

    /// Returns the entity store.
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Returns the component registry.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Returns the ID of the component type, registering it if needed.
    pub fn component_id<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        self.registry.id_for::<T>()
    }

    /// Attaches the component to the entity, replacing any existing value of the same type.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<&mut T, EcsError> {
        if !self.is_valid(entity) {
            return Err(EcsError::StaleHandle(entity));
        }

        let id = self.registry.id_for::<T>()?;
        let mismatch = EcsError::UnknownComponent {
            entity,
            component: type_name::<T>(),
        };
        if self.pool_or_insert::<T>(id).is_none() {
            return Err(mismatch);
        }

        let added = match self.entities.mask_mut(entity) {
            Some(mask) if !mask.contains(id) => {
                mask.insert(id);
                true
            }
            Some(_) => false,
            None => return Err(EcsError::StaleHandle(entity)),
        };

        if added {
            self.changed.push(entity);
        }

        let pool = self.pool_mut::<T>(id).ok_or(mismatch)?;
        Ok(pool.insert(entity, value))
    }

    /// Detaches the component from the entity and returns it.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, EcsError> {
        if !self.is_valid(entity) {
            return Err(EcsError::StaleHandle(entity));
        }

        let unknown = EcsError::UnknownComponent {
            entity,
            component: type_name::<T>(),
        };
        let id = self.registry.get::<T>().ok_or(unknown)?;
        let value = self
            .pool_mut::<T>(id)
            .and_then(|pool| pool.remove(entity))
            .ok_or(unknown)?;

        if let Some(mask) = self.entities.mask_mut(entity) {
            mask.remove(id);
        }
        self.changed.push(entity);

        Ok(value)
    }

    /// Returns the component of the entity.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.pool::<T>()?.get(entity)
    }

    /// Returns the component of the entity.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = self.registry.get::<T>()?;
        self.pool_mut::<T>(id)?.get_mut(entity)
    }

    /// Returns true if the entity has the component.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        match (self.registry.get::<T>(), self.mask(entity)) {
            (Some(id), Some(mask)) => mask.contains(id),
            _ => false,
        }
    }

    /// Returns the pool holding every value of the component type.
    pub fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        let id = self.registry.get::<T>()?;
        self.pools
            .get(id.index())?
            .as_ref()?
            .as_any()
            .downcast_ref::<ComponentPool<T>>()
    }

    /// Requests destruction of the entity at the next point where pending changes are applied.
    /// Returns false if the handle is already stale.
    pub fn queue_destroy(&mut self, entity: Entity) -> bool {
        if !self.is_valid(entity) {
            return false;
        }

        if !self.pending_destroy.contains(&entity) {
            self.pending_destroy.push(entity);
        }

        true
    }

    /// Drops every component of the entity and invalidates the handle. Callers are responsible for
    /// removing the entity from systems first.
    pub(crate) fn destroy_now(&mut self, entity: Entity) -> bool {
        if !self.is_valid(entity) {
            return false;
        }

        for pool in self.pools.iter_mut().flatten() {
            pool.remove_entity(entity);
        }

        self.entities.destroy(entity)
    }

    /// Applies queued destruction and forgets the recorded mask changes, returning the entities
    /// that were destroyed. A world driven by a [Scene](crate::Scene) or a
    /// [SystemManager](crate::SystemManager) is maintained by
    /// [SystemManager::apply_changes](crate::SystemManager::apply_changes) instead, which also
    /// routes the changes to the systems.
    pub fn maintain(&mut self) -> Vec<Entity> {
        self.changed.clear();
        self.take_pending_destroy()
            .into_iter()
            .filter(|entity| self.destroy_now(*entity))
            .collect()
    }

    pub(crate) fn take_changed(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.changed)
    }

    pub(crate) fn take_pending_destroy(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.pending_destroy)
    }

    fn pool_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut ComponentPool<T>> {
        self.pools
            .get_mut(id.index())?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
    }

    fn pool_or_insert<T: Component>(&mut self, id: ComponentId) -> Option<&mut ComponentPool<T>> {
        if self.pools.len() <= id.index() {
            self.pools.resize_with(id.index() + 1, || None);
        }

        self.pools[id.index()]
            .get_or_insert_with(|| Box::new(ComponentPool::<T>::new()))
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
    }
}
