use glam::Mat4;
use glam::Quat;
use glam::Vec3;

use crate::Component;
use crate::Entity;

/// # Transform
///
/// Position, rotation, and scale of the entity relative to its [Parent], or to the world if it has
/// none.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    /// Position of the transform.
    pub position: Vec3,
    /// Rotation of the transform.
    pub rotation: Quat,
    /// Scale of the transform.
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Returns a transform with the given position, rotation, and scale.
    pub const fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Returns a transform with the given position.
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Returns the transform matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Component for Transform {}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// # Parent
///
/// Entity whose world transform this entity's [Transform] is relative to. A parent that has been
/// destroyed leaves the entity at the root of the hierarchy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Parent(pub Entity);

impl Component for Parent {}

/// # World Transform
///
/// Transform of the entity in world coordinates, computed by the
/// [SceneGraph](crate::systems::SceneGraph).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorldTransform {
    /// Transform matrix.
    pub matrix: Mat4,
}

impl WorldTransform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        matrix: Mat4::IDENTITY,
    };

    /// Returns a transform with the given transform matrix.
    pub const fn new(matrix: Mat4) -> Self {
        Self { matrix }
    }
}

impl Component for WorldTransform {}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// # Mesh ID
///
/// Key of a mesh in the application's resource cache.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MeshId(pub u32);

/// # Material ID
///
/// Key of a material in the application's resource cache.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MaterialId(pub u32);

/// # Model
///
/// Mesh and material drawn at the entity's [WorldTransform].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Model {
    /// Mesh to draw.
    pub mesh: MeshId,
    /// Material to draw the mesh with.
    pub material: MaterialId,
}

impl Model {
    /// Returns a model with the given mesh and material.
    pub const fn new(mesh: MeshId, material: MaterialId) -> Self {
        Self { mesh, material }
    }
}

impl Component for Model {}
