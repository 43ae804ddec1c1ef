use std::time::Duration;

use glam::Mat4;

use crate::Entity;
use crate::MaterialId;
use crate::MeshId;
use crate::Model;
use crate::Requirements;
use crate::Skeleton;
use crate::System;
use crate::SystemContext;
use crate::Transform;
use crate::WorldTransform;

/// # Draw Item
///
/// One model to be drawn by the renderer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawItem {
    /// Entity the model belongs to.
    pub entity: Entity,
    /// Mesh to draw.
    pub mesh: MeshId,
    /// Material to draw the mesh with.
    pub material: MaterialId,
    /// World matrix of the entity.
    pub transform: Mat4,
    /// Whether the entity has a [Skeleton] whose palette skins the mesh.
    pub skinned: bool,
}

/// # Render List
///
/// Collects every entity with a [Model] and a [Transform] into a list of [DrawItem]s, rebuilt each
/// step in the order the entities started matching. Draw matrices come from the [WorldTransform]
/// maintained by the [SceneGraph](crate::systems::SceneGraph), which has to be added before this
/// system.
#[derive(Debug, Default)]
pub struct RenderList {
    items: Vec<DrawItem>,
}

impl RenderList {
    /// Returns an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the items collected by the last step.
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl System for RenderList {
    fn require(&self, requirements: &mut Requirements) {
        requirements
            .require::<Model>()
            .require::<Transform>()
            .require::<WorldTransform>();
    }

    fn process(&mut self, context: &mut SystemContext, _dt: Duration) {
        self.items.clear();

        let world = context.world();
        for entity in context.entities() {
            let (Some(model), Some(transform)) = (
                world.get::<Model>(*entity),
                world.get::<WorldTransform>(*entity),
            ) else {
                continue;
            };

            self.items.push(DrawItem {
                entity: *entity,
                mesh: model.mesh,
                material: model.material,
                transform: transform.matrix,
                skinned: world.has::<Skeleton>(*entity),
            });
        }
    }
}
