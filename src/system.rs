use std::any::type_name;
use std::any::Any;
use std::any::TypeId;
use std::rc::Rc;
use std::time::Duration;

use nohash::IntMap;

use crate::Component;
use crate::ComponentMask;
use crate::ComponentRegistry;
use crate::Diagnostics;
use crate::EcsError;
use crate::Entity;
use crate::Message;
use crate::MessageBus;
use crate::MessageId;
use crate::Severity;
use crate::World;

/// # System
///
/// Unit of logic processing every entity that has all of the system's required components.
pub trait System: 'static {
    /// Declares the components an entity must have for this system to process it. Called once when
    /// the system is added.
    fn require(&self, requirements: &mut Requirements) {
        let _ = requirements;
    }

    /// Processes the system's entities for one simulation step.
    fn process(&mut self, context: &mut SystemContext, dt: Duration) {
        let _ = (context, dt);
    }

    /// Handles a message forwarded by the scene.
    fn handle_message(&mut self, message: &Message) {
        let _ = message;
    }

    /// Called after an entity starts matching the system.
    fn on_entity_added(&mut self, world: &mut World, entity: Entity) {
        let _ = (world, entity);
    }

    /// Called after an entity stops matching the system or is about to be destroyed.
    fn on_entity_removed(&mut self, entity: Entity) {
        let _ = entity;
    }
}

trait DynamicSystem: System {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: System> DynamicSystem for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// # Requirements
///
/// Builds the component mask of a system.
pub struct Requirements<'a> {
    registry: &'a mut ComponentRegistry,
    mask: ComponentMask,
    error: Option<EcsError>,
}

impl<'a> Requirements<'a> {
    pub(crate) fn new(registry: &'a mut ComponentRegistry) -> Self {
        Self {
            registry,
            mask: ComponentMask::EMPTY,
            error: None,
        }
    }

    /// Requires entities to have the component.
    pub fn require<T: Component>(&mut self) -> &mut Self {
        match self.registry.id_for::<T>() {
            Ok(id) => self.mask.insert(id),
            Err(error) => {
                self.error.get_or_insert(error);
            }
        }

        self
    }

    fn finish(self) -> Result<ComponentMask, EcsError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.mask),
        }
    }
}

/// # System Context
///
/// Access given to a system while it processes a simulation step.
///
/// Component values can be read and written immediately. Component additions and removals change
/// which systems an entity belongs to; those changes, like destruction through
/// [SystemContext::destroy], take effect at the start of the next step.
pub struct SystemContext<'a> {
    world: &'a mut World,
    bus: &'a mut MessageBus,
    entities: &'a [Entity],
}

impl<'a> SystemContext<'a> {
    /// Returns the entities matching the system, in the order they started matching.
    pub fn entities(&self) -> &'a [Entity] {
        self.entities
    }

    /// Returns the world.
    pub fn world(&self) -> &World {
        self.world
    }

    /// Returns the world.
    pub fn world_mut(&mut self) -> &mut World {
        self.world
    }

    /// Returns the component of the entity.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.world.get(entity)
    }

    /// Returns the component of the entity.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.world.get_mut(entity)
    }

    /// Requests destruction of the entity at the start of the next step.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        self.world.queue_destroy(entity)
    }

    /// Posts a message to be delivered at the start of the next step.
    pub fn post_message<T: Any>(&mut self, id: MessageId, payload: T) {
        self.bus.post(id, payload);
    }
}

struct SystemSlot {
    type_id: TypeId,
    name: &'static str,
    mask: ComponentMask,
    entities: Vec<Entity>,
    members: IntMap<u32, Entity>,
    system: Box<dyn DynamicSystem>,
}

impl SystemSlot {
    fn matches(&self, mask: Option<ComponentMask>) -> bool {
        mask.is_some_and(|mask| self.mask.is_subset(mask))
    }

    fn contains(&self, entity: Entity) -> bool {
        self.members.get(&entity.index()) == Some(&entity)
    }

    fn add(&mut self, world: &mut World, entity: Entity) {
        if self.contains(entity) {
            return;
        }

        // a member from an earlier generation of the same index can only be stale
        if let Some(stale) = self.members.insert(entity.index(), entity) {
            self.entities.retain(|e| *e != stale);
            self.system.on_entity_removed(stale);
        }
        self.entities.push(entity);
        self.system.on_entity_added(world, entity);
    }

    fn remove(&mut self, entity: Entity) {
        if self.contains(entity) {
            self.members.remove(&entity.index());
            self.entities.retain(|e| *e != entity);
            self.system.on_entity_removed(entity);
        }
    }
}

/// # System Manager
///
/// Owns the systems of a scene, routes entities to the systems they match and runs the systems in
/// the order they were added.
pub struct SystemManager {
    slots: Vec<SystemSlot>,
    diagnostics: Rc<dyn Diagnostics>,
}

impl SystemManager {
    /// Returns a manager without systems reporting through the given diagnostics.
    pub fn new(diagnostics: Rc<dyn Diagnostics>) -> Self {
        Self {
            slots: Vec::new(),
            diagnostics,
        }
    }

    /// Adds the system built by `make`, unless a system of the same type already exists, in which
    /// case the existing system is returned and `make` is not called. Entities of the world that
    /// already match the new system are added to it.
    pub fn add_system<S: System>(
        &mut self,
        world: &mut World,
        make: impl FnOnce() -> S,
    ) -> Result<&mut S, EcsError> {
        let index = match self.index_of::<S>() {
            Some(index) => {
                let error = EcsError::DuplicateSystem(type_name::<S>());
                self.diagnostics.log(&error.to_string(), Severity::Warning);
                index
            }
            None => {
                let system = make();
                let mut requirements = Requirements::new(world.registry_mut());
                system.require(&mut requirements);
                let mask = requirements.finish()?;

                let mut slot = SystemSlot {
                    type_id: TypeId::of::<S>(),
                    name: type_name::<S>(),
                    mask,
                    entities: Vec::new(),
                    members: IntMap::default(),
                    system: Box::new(system),
                };

                let live = world.entities().iter().collect::<Vec<_>>();
                for entity in live {
                    if slot.matches(world.mask(entity)) {
                        slot.add(world, entity);
                    }
                }

                self.slots.push(slot);
                self.slots.len() - 1
            }
        };

        self.slots[index]
            .system
            .as_any_mut()
            .downcast_mut::<S>()
            .ok_or(EcsError::UnknownSystem(type_name::<S>()))
    }

    /// Removes the system of the given type. Returns false if there was none.
    pub fn remove_system<S: System>(&mut self) -> bool {
        match self.index_of::<S>() {
            Some(index) => {
                self.slots.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns the system of the given type.
    pub fn system<S: System>(&self) -> Option<&S> {
        let index = self.index_of::<S>()?;
        self.slots[index].system.as_any().downcast_ref::<S>()
    }

    /// Returns the system of the given type.
    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        let index = self.index_of::<S>()?;
        self.slots[index].system.as_any_mut().downcast_mut::<S>()
    }

    /// Returns true if a system of the given type exists.
    pub fn has_system<S: System>(&self) -> bool {
        self.index_of::<S>().is_some()
    }

    /// Returns the entities matching the system of the given type.
    pub fn entities<S: System>(&self) -> Option<&[Entity]> {
        let index = self.index_of::<S>()?;
        Some(&self.slots[index].entities)
    }

    /// Returns the names of the systems in processing order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|slot| slot.name)
    }

    /// Returns the number of systems.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if there are no systems.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Adds the entity to every system it matches and is not already part of.
    pub fn add_to_systems(&mut self, world: &mut World, entity: Entity) {
        let mask = world.mask(entity);
        for slot in &mut self.slots {
            if slot.matches(mask) {
                slot.add(world, entity);
            }
        }
    }

    /// Removes the entity from every system.
    pub fn remove_from_systems(&mut self, entity: Entity) {
        for slot in &mut self.slots {
            slot.remove(entity);
        }
    }

    /// Recomputes which systems the entity belongs to from its current component mask.
    pub fn refresh(&mut self, world: &mut World, entity: Entity) {
        let mask = world.mask(entity);
        for slot in &mut self.slots {
            match (slot.matches(mask), slot.contains(entity)) {
                (true, false) => slot.add(world, entity),
                (false, true) => slot.remove(entity),
                _ => {}
            }
        }
    }

    /// Applies the destruction queued through [World::queue_destroy], removing each entity from
    /// the systems before its components are dropped, and then routes every entity whose
    /// components changed.
    pub fn apply_changes(&mut self, world: &mut World) {
        for entity in world.take_pending_destroy() {
            if world.is_valid(entity) {
                self.remove_from_systems(entity);
                world.destroy_now(entity);
            }
        }

        self.route_changes(world);
    }

    pub(crate) fn route_changes(&mut self, world: &mut World) {
        loop {
            let changed = world.take_changed();
            if changed.is_empty() {
                break;
            }

            for entity in changed {
                self.refresh(world, entity);
            }
        }
    }

    /// Delivers the message to every system in processing order.
    pub fn forward_message(&mut self, message: &Message) {
        for slot in &mut self.slots {
            slot.system.handle_message(message);
        }
    }

    /// Runs one simulation step of every system in processing order.
    pub fn process(&mut self, world: &mut World, bus: &mut MessageBus, dt: Duration) {
        for slot in &mut self.slots {
            let mut context = SystemContext {
                world: &mut *world,
                bus: &mut *bus,
                entities: &slot.entities,
            };
            slot.system.process(&mut context, dt);
        }
    }

    fn index_of<S: System>(&self) -> Option<usize> {
        let type_id = TypeId::of::<S>();
        self.slots.iter().position(|slot| slot.type_id == type_id)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::BufferedDiagnostics;

    #[derive(Debug, PartialEq)]
    struct Position(f32);

    impl Component for Position {}

    #[derive(Debug, PartialEq)]
    struct Velocity(f32);

    impl Component for Velocity {}

    thread_local! {
        static DELIVERED: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }

    #[derive(Default)]
    struct Positions {
        added: Vec<Entity>,
        removed: Vec<Entity>,
    }

    impl System for Positions {
        fn require(&self, requirements: &mut Requirements) {
            requirements.require::<Position>();
        }

        fn handle_message(&mut self, _message: &Message) {
            DELIVERED.with(|delivered| delivered.borrow_mut().push("positions"));
        }

        fn on_entity_added(&mut self, _world: &mut World, entity: Entity) {
            self.added.push(entity);
        }

        fn on_entity_removed(&mut self, entity: Entity) {
            self.removed.push(entity);
        }
    }

    #[derive(Default)]
    struct Movers;

    impl System for Movers {
        fn require(&self, requirements: &mut Requirements) {
            requirements.require::<Position>().require::<Velocity>();
        }

        fn handle_message(&mut self, _message: &Message) {
            DELIVERED.with(|delivered| delivered.borrow_mut().push("movers"));
        }
    }

    struct Reaper;

    impl System for Reaper {
        fn require(&self, requirements: &mut Requirements) {
            requirements.require::<Position>();
        }

        fn process(&mut self, context: &mut SystemContext, _dt: Duration) {
            let count = context.entities().len() as u32;
            for &entity in context.entities() {
                if let Some(position) = context.get_mut::<Position>(entity) {
                    position.0 = -1.0;
                }
                context.destroy(entity);
            }
            context.post_message(MessageId(9), count);
        }
    }

    fn manager() -> SystemManager {
        SystemManager::new(Rc::new(BufferedDiagnostics::default()))
    }

    fn spawn(world: &mut World, velocity: bool) -> Entity {
        let entity = world.create_entity();
        world.add_component(entity, Position(0.0)).unwrap();
        if velocity {
            world.add_component(entity, Velocity(1.0)).unwrap();
        }
        entity
    }

    #[test]
    fn add_to_systems_adds_where_requirements_are_subset() {
        let mut world = World::new();
        let mut systems = manager();
        systems.add_system(&mut world, Positions::default).unwrap();
        systems.add_system(&mut world, || Movers).unwrap();
        let still = spawn(&mut world, false);
        let moving = spawn(&mut world, true);

        systems.add_to_systems(&mut world, still);
        systems.add_to_systems(&mut world, moving);
        systems.add_to_systems(&mut world, moving);

        assert_eq!(systems.entities::<Positions>(), Some([still, moving].as_slice()));
        assert_eq!(systems.entities::<Movers>(), Some([moving].as_slice()));
        assert_eq!(systems.system::<Positions>().unwrap().added, vec![still, moving]);
    }

    #[test]
    fn add_to_systems_with_stale_handle_is_ignored() {
        let mut world = World::new();
        let mut systems = manager();
        systems.add_system(&mut world, Positions::default).unwrap();
        let entity = spawn(&mut world, false);
        world.destroy_now(entity);

        systems.add_to_systems(&mut world, entity);

        assert_eq!(systems.entities::<Positions>(), Some([].as_slice()));
    }

    #[test]
    fn add_to_systems_with_recycled_index_replaces_stale_member() {
        let mut world = World::new();
        let mut systems = manager();
        systems.add_system(&mut world, Positions::default).unwrap();
        let stale = spawn(&mut world, false);
        systems.add_to_systems(&mut world, stale);
        world.destroy_now(stale);
        let recycled = spawn(&mut world, false);
        assert_eq!(recycled.index(), stale.index());

        systems.add_to_systems(&mut world, recycled);

        assert_eq!(systems.entities::<Positions>(), Some([recycled].as_slice()));
        let positions = systems.system::<Positions>().unwrap();
        assert_eq!(positions.added, vec![stale, recycled]);
        assert_eq!(positions.removed, vec![stale]);
    }

    #[test]
    fn remove_from_systems_keeps_insertion_order() {
        let mut world = World::new();
        let mut systems = manager();
        systems.add_system(&mut world, Positions::default).unwrap();
        let entities = (0..4).map(|_| spawn(&mut world, false)).collect::<Vec<_>>();
        for entity in &entities {
            systems.add_to_systems(&mut world, *entity);
        }

        systems.remove_from_systems(entities[1]);

        assert_eq!(
            systems.entities::<Positions>(),
            Some([entities[0], entities[2], entities[3]].as_slice())
        );
        assert_eq!(systems.system::<Positions>().unwrap().removed, vec![entities[1]]);
    }

    #[test]
    fn refresh_after_mask_change_updates_membership() {
        let mut world = World::new();
        let mut systems = manager();
        systems.add_system(&mut world, Positions::default).unwrap();
        systems.add_system(&mut world, || Movers).unwrap();
        let entity = spawn(&mut world, true);
        systems.refresh(&mut world, entity);

        world.remove_component::<Velocity>(entity).unwrap();
        systems.refresh(&mut world, entity);

        assert_eq!(systems.entities::<Positions>(), Some([entity].as_slice()));
        assert_eq!(systems.entities::<Movers>(), Some([].as_slice()));
    }

    #[test]
    fn forward_message_delivers_in_processing_order() {
        let mut world = World::new();
        let mut systems = manager();
        systems.add_system(&mut world, || Movers).unwrap();
        systems.add_system(&mut world, Positions::default).unwrap();
        DELIVERED.with(|delivered| delivered.borrow_mut().clear());

        systems.forward_message(&Message::new(MessageId(1), ()));

        DELIVERED.with(|delivered| assert_eq!(*delivered.borrow(), vec!["movers", "positions"]));
    }

    #[test]
    fn process_defers_destroy_and_messages_until_applied() {
        let mut world = World::new();
        let mut bus = MessageBus::new();
        let mut systems = manager();
        systems.add_system(&mut world, || Reaper).unwrap();
        systems.add_system(&mut world, Positions::default).unwrap();
        let entity = spawn(&mut world, false);
        systems.apply_changes(&mut world);

        systems.process(&mut world, &mut bus, Duration::ZERO);

        assert!(world.is_valid(entity));
        assert_eq!(world.get::<Position>(entity), Some(&Position(-1.0)));
        assert_eq!(bus.len(), 1);

        systems.apply_changes(&mut world);

        assert!(!world.is_valid(entity));
        assert_eq!(systems.entities::<Reaper>(), Some([].as_slice()));
        assert_eq!(systems.system::<Positions>().unwrap().removed, vec![entity]);
    }

    #[test]
    fn add_system_with_duplicate_type_warns() {
        let diagnostics = Rc::new(BufferedDiagnostics::default());
        let mut world = World::new();
        let mut systems = SystemManager::new(diagnostics.clone());
        systems.add_system(&mut world, || Movers).unwrap();

        systems.add_system(&mut world, || Movers).unwrap();

        assert_eq!(systems.names().collect::<Vec<_>>().len(), 1);
        assert!(diagnostics.contains(Severity::Warning, "already exists"));
    }

    #[test]
    fn add_system_with_mismatched_slot_returns_unknown_system() {
        let mut world = World::new();
        let mut systems = manager();
        systems.slots.push(SystemSlot {
            type_id: TypeId::of::<Positions>(),
            name: "positions",
            mask: ComponentMask::EMPTY,
            entities: Vec::new(),
            members: IntMap::default(),
            system: Box::new(Movers),
        });

        let result = systems.add_system(&mut world, Positions::default);

        assert_eq!(
            result.err(),
            Some(EcsError::UnknownSystem(type_name::<Positions>()))
        );
    }
}
