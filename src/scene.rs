use std::any::Any;
use std::rc::Rc;
use std::time::Duration;

use crate::Component;
use crate::Diagnostics;
use crate::EcsError;
use crate::Entity;
use crate::LogDiagnostics;
use crate::Message;
use crate::MessageBus;
use crate::MessageId;
use crate::Parent;
use crate::System;
use crate::SystemManager;
use crate::World;

/// # Scene
///
/// A [World] together with the systems processing it and the message bus they communicate over.
///
/// Changes made through the scene's own methods route the entity to its systems immediately.
/// Changes made by systems during [Scene::simulate] are applied at the start of the next step.
pub struct Scene {
    world: World,
    systems: SystemManager,
    bus: MessageBus,
    diagnostics: Rc<dyn Diagnostics>,
}

impl Scene {
    /// Returns an empty scene reporting through the [log] facade.
    pub fn new() -> Self {
        Self::with_diagnostics(Rc::new(LogDiagnostics))
    }

    /// Returns an empty scene reporting through the given diagnostics.
    pub fn with_diagnostics(diagnostics: Rc<dyn Diagnostics>) -> Self {
        Self {
            world: World::new(),
            systems: SystemManager::new(diagnostics.clone()),
            bus: MessageBus::new(),
            diagnostics,
        }
    }

    /// Returns the diagnostics the scene reports through.
    pub fn diagnostics(&self) -> &Rc<dyn Diagnostics> {
        &self.diagnostics
    }

    /// Returns the world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Returns the world. Mask changes made through it are routed on the next scene operation.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Returns the system manager.
    pub fn systems(&self) -> &SystemManager {
        &self.systems
    }

    /// Returns true if the handle refers to a live entity.
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.world.is_valid(entity)
    }

    /// Creates a new entity.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.world.create_entity();
        self.route_changes();
        entity
    }

    /// Removes the entity from its systems, drops its components and invalidates the handle.
    /// Returns false if the handle was already stale.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.world.is_valid(entity) {
            return false;
        }

        self.systems.remove_from_systems(entity);
        self.world.destroy_now(entity)
    }

    /// Attaches the component to the entity, replacing any existing value of the same type.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        self.world.add_component(entity, value)?;
        self.route_changes();
        Ok(())
    }

    /// Detaches the component from the entity and returns it.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, EcsError> {
        let value = self.world.remove_component(entity)?;
        self.route_changes();
        Ok(value)
    }

    /// Returns the component of the entity.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.world.get(entity)
    }

    /// Returns the component of the entity.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.world.get_mut(entity)
    }

    /// Attaches the entity to `parent`, replacing any existing [Parent]. Fails without changing
    /// anything if either handle is stale or if `parent` is the entity or one of its descendants.
    pub fn set_parent(&mut self, entity: Entity, parent: Entity) -> Result<(), EcsError> {
        for handle in [entity, parent] {
            if !self.world.is_valid(handle) {
                return Err(EcsError::StaleHandle(handle));
            }
        }

        let mut ancestor = Some(parent);
        for _ in 0..=self.world.entities().len() {
            let Some(current) = ancestor else {
                break;
            };
            if current == entity {
                return Err(EcsError::HierarchyCycle { entity, parent });
            }
            ancestor = self.world.get::<Parent>(current).map(|parent| parent.0);
        }

        self.add_component(entity, Parent(parent))
    }

    /// Adds the system built by `make` unless one of the same type exists. See
    /// [SystemManager::add_system].
    pub fn add_system<S: System>(&mut self, make: impl FnOnce() -> S) -> Result<&mut S, EcsError> {
        self.route_changes();
        self.systems.add_system(&mut self.world, make)
    }

    /// Removes the system of the given type. Returns false if there was none.
    pub fn remove_system<S: System>(&mut self) -> bool {
        self.systems.remove_system::<S>()
    }

    /// Returns the system of the given type.
    pub fn system<S: System>(&self) -> Option<&S> {
        self.systems.system::<S>()
    }

    /// Returns the system of the given type.
    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems.system_mut::<S>()
    }

    /// Posts a message delivered to every system at the start of the next step.
    pub fn post_message<T: Any>(&mut self, id: MessageId, payload: T) {
        self.bus.post(id, payload);
    }

    /// Delivers the message to every system immediately.
    pub fn forward_message(&mut self, message: &Message) {
        self.systems.forward_message(message);
    }

    /// Runs one simulation step: applies changes requested during the previous step, delivers
    /// pending messages and then processes every system in the order they were added.
    pub fn simulate(&mut self, dt: Duration) {
        self.apply_pending_changes();

        let messages = self.bus.drain().collect::<Vec<_>>();
        for message in &messages {
            self.systems.forward_message(message);
        }

        self.systems.process(&mut self.world, &mut self.bus, dt);
    }

    /// Applies deferred destruction and routes entities whose components changed.
    pub fn apply_pending_changes(&mut self) {
        self.systems.apply_changes(&mut self.world);
    }

    fn route_changes(&mut self) {
        self.systems.route_changes(&mut self.world);
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
