use std::any::type_name;
use std::any::TypeId;
use std::collections::BTreeMap;

use crate::EcsError;

/// Maximum number of distinct component types, i.e. the width of a [ComponentMask].
pub const MAX_COMPONENTS: usize = 64;

/// # Component
///
/// Plain data attached to an entity.
pub trait Component: 'static {}

/// # Component ID
///
/// Small integer identifying a component type within a [ComponentRegistry].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ComponentId(u8);

impl ComponentId {
    /// Returns the ID as an index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// # Component Mask
///
/// Fixed width bitset with one bit per component ID.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// Mask with no bits set.
    pub const EMPTY: Self = Self(0);

    /// Returns a mask with only the bit for the given ID set.
    pub const fn from_id(id: ComponentId) -> Self {
        Self(1 << id.0)
    }

    /// Sets the bit for the given ID.
    pub fn insert(&mut self, id: ComponentId) {
        self.0 |= 1 << id.0;
    }

    /// Clears the bit for the given ID.
    pub fn remove(&mut self, id: ComponentId) {
        self.0 &= !(1 << id.0);
    }

    /// Returns true if the bit for the given ID is set.
    pub const fn contains(self, id: ComponentId) -> bool {
        self.0 & (1 << id.0) != 0
    }

    /// Returns true if every bit set in `self` is also set in `other`.
    pub const fn is_subset(self, other: Self) -> bool {
        self.0 & other.0 == self.0
    }

    /// Returns true if no bits are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the number of bits set.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Clears every bit.
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// # Component Registry
///
/// Assigns IDs to component types on first use. IDs increase monotonically and are never reused
/// for the lifetime of the registry.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    ids: BTreeMap<TypeId, ComponentId>,
}

impl ComponentRegistry {
    /// Returns an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID for the component type, registering the type if this is the first time it
    /// has been seen.
    pub fn id_for<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        if let Some(id) = self.get::<T>() {
            return Ok(id);
        }

        let next = self.ids.len();
        if next >= MAX_COMPONENTS {
            return Err(EcsError::ComponentLimit {
                component: type_name::<T>(),
                limit: MAX_COMPONENTS,
            });
        }

        let id = ComponentId(next as u8);
        self.ids.insert(TypeId::of::<T>(), id);
        Ok(id)
    }

    /// Returns the ID for the component type if it has been registered.
    pub fn get<T: Component>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the number of registered component types.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if no component types have been registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
