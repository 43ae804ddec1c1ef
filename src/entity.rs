use crate::ComponentMask;

/// # Entity
///
/// Handle identifying a row across all component pools. A handle stays valid until the entity is
/// destroyed, after which the slot's generation moves on and the handle compares stale.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index of the entity.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation of the slot when the handle was created.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    alive: bool,
    mask: ComponentMask,
}

/// # Entity Store
///
/// Owns entity identity and the per-entity component masks. Destroyed indices are recycled
/// through a free list.
#[derive(Debug, Default)]
pub struct EntityStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl EntityStore {
    /// Returns an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new entity with an empty component mask.
    ///
    /// # Panics
    ///
    /// Panics if the `u32` index space is exhausted.
    pub fn create(&mut self) -> Entity {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            slot.mask.clear();
            return Entity::new(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).expect("entity index space exhausted");
        self.slots.push(Slot {
            generation: 0,
            alive: true,
            mask: ComponentMask::EMPTY,
        });

        Entity::new(index, 0)
    }

    /// Destroys the entity. Returns false if the handle was already stale.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_valid(entity) {
            return false;
        }

        let slot = &mut self.slots[entity.index as usize];
        slot.alive = false;
        slot.mask.clear();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(entity.index);
        self.live -= 1;

        true
    }

    /// Returns true if the handle refers to a live entity.
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation)
    }

    /// Returns the component mask of the entity.
    pub fn mask(&self, entity: Entity) -> Option<ComponentMask> {
        self.slot(entity).map(|slot| slot.mask)
    }

    pub(crate) fn mask_mut(&mut self, entity: Entity) -> Option<&mut ComponentMask> {
        if !self.is_valid(entity) {
            return None;
        }

        Some(&mut self.slots[entity.index as usize].mask)
    }

    /// Returns the number of live entities.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns true if there are no live entities.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the live entities in index order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| Entity::new(index as u32, slot.generation))
    }

    fn slot(&self, entity: Entity) -> Option<&Slot> {
        self.slots
            .get(entity.index as usize)
            .filter(|slot| slot.alive && slot.generation == entity.generation)
    }
}
