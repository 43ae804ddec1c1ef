use thiserror::Error;

use crate::Entity;

/// # ECS Error
///
/// Failures reported by the entity-component runtime. Component lookups return [Option] instead.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum EcsError {
    /// The entity handle refers to a destroyed entity.
    #[error("stale entity handle {0:?}")]
    StaleHandle(Entity),
    /// The entity does not have the requested component.
    #[error("entity {entity:?} has no component `{component}`")]
    UnknownComponent {
        /// Entity that was queried.
        entity: Entity,
        /// Type name of the missing component.
        component: &'static str,
    },
    /// A system of this type has already been added.
    #[error("system `{0}` already exists")]
    DuplicateSystem(&'static str),
    /// No system of this type is part of the manager.
    #[error("system `{0}` not found")]
    UnknownSystem(&'static str),
    /// Parenting the entity would make it its own ancestor.
    #[error("entity {parent:?} is a descendant of {entity:?} and cannot become its parent")]
    HierarchyCycle {
        /// Entity being parented.
        entity: Entity,
        /// Requested parent.
        parent: Entity,
    },
    /// Registering the component would exceed the component mask width.
    #[error("component `{component}` exceeds the limit of {limit} component types")]
    ComponentLimit {
        /// Type name of the rejected component.
        component: &'static str,
        /// Maximum number of component types.
        limit: usize,
    },
}
