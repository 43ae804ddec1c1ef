use std::time::Duration;

use glam::Mat4;
use nohash::IntMap;

use crate::Entity;
use crate::Parent;
use crate::Requirements;
use crate::System;
use crate::SystemContext;
use crate::Transform;
use crate::World;
use crate::WorldTransform;

/// # Scene Graph
///
/// Computes the [WorldTransform] of every entity with a [Transform] by composing it with the world
/// transforms of its [Parent] chain. Parents are resolved before their children regardless of the
/// order the entities were added in.
#[derive(Debug, Default)]
pub struct SceneGraph {
    resolved: IntMap<u32, Mat4>,
}

impl SceneGraph {
    /// Returns a scene graph.
    pub fn new() -> Self {
        Self::default()
    }
}

impl System for SceneGraph {
    fn require(&self, requirements: &mut Requirements) {
        requirements.require::<Transform>();
    }

    fn process(&mut self, context: &mut SystemContext, _dt: Duration) {
        self.resolved.clear();

        let entities = context.entities();
        for &entity in entities {
            resolve(context.world(), entity, &mut self.resolved, &mut Vec::new());
        }

        for &entity in entities {
            let Some(&matrix) = self.resolved.get(&entity.index()) else {
                continue;
            };
            if let Some(transform) = context.get_mut::<WorldTransform>(entity) {
                transform.matrix = matrix;
            }
        }
    }

    fn on_entity_added(&mut self, world: &mut World, entity: Entity) {
        let matrix = resolve(world, entity, &mut IntMap::default(), &mut Vec::new());
        match world.get_mut::<WorldTransform>(entity) {
            Some(transform) => transform.matrix = matrix,
            None => {
                // fails only for a full component registry
                let _ = world.add_component(entity, WorldTransform::new(matrix));
            }
        }
    }
}

/// Returns the world matrix of the entity, resolving its ancestors first. A parent that is stale
/// or already on the path being resolved ends the chain.
fn resolve(
    world: &World,
    entity: Entity,
    resolved: &mut IntMap<u32, Mat4>,
    path: &mut Vec<Entity>,
) -> Mat4 {
    if let Some(matrix) = resolved.get(&entity.index()) {
        return *matrix;
    }

    let local = world
        .get::<Transform>(entity)
        .map_or(Mat4::IDENTITY, Transform::matrix);
    let parent = world
        .get::<Parent>(entity)
        .map(|parent| parent.0)
        .filter(|parent| world.is_valid(*parent) && *parent != entity && !path.contains(parent));

    path.push(entity);
    let matrix = match parent {
        Some(parent) => resolve(world, parent, resolved, path) * local,
        None => local,
    };
    path.pop();

    resolved.insert(entity.index(), matrix);
    matrix
}

#[cfg(test)]
mod tests {
    use glam::Quat;
    use glam::Vec3;

    use super::*;
    use crate::Scene;

    fn world_matrix(scene: &Scene, entity: Entity) -> Mat4 {
        scene.get::<WorldTransform>(entity).unwrap().matrix
    }

    #[test]
    fn add_component_computes_world_transform_immediately() {
        let mut scene = Scene::new();
        scene.add_system(SceneGraph::new).unwrap();
        let entity = scene.create_entity();

        scene
            .add_component(entity, Transform::from_position(Vec3::X))
            .unwrap();

        assert_eq!(world_matrix(&scene, entity), Mat4::from_translation(Vec3::X));
    }

    #[test]
    fn simulate_two_level_hierarchy_composes_parent_transforms() {
        let mut scene = Scene::new();
        scene.add_system(SceneGraph::new).unwrap();

        // children are created first so resolution cannot rely on insertion order
        let grandchild = scene.create_entity();
        let child = scene.create_entity();
        let root = scene.create_entity();
        let quarter_turn = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        scene
            .add_component(root, Transform::new(Vec3::X, quarter_turn, Vec3::ONE))
            .unwrap();
        scene
            .add_component(child, Transform::from_position(Vec3::X))
            .unwrap();
        scene
            .add_component(grandchild, Transform::from_position(Vec3::Y))
            .unwrap();
        scene.set_parent(child, root).unwrap();
        scene.set_parent(grandchild, child).unwrap();

        scene.simulate(Duration::ZERO);

        let child_origin = world_matrix(&scene, child).transform_point3(Vec3::ZERO);
        assert!(child_origin.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
        let grandchild_origin = world_matrix(&scene, grandchild).transform_point3(Vec3::ZERO);
        assert!(grandchild_origin.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn simulate_after_reparent_follows_new_parent() {
        let mut scene = Scene::new();
        scene.add_system(SceneGraph::new).unwrap();
        let left = scene.create_entity();
        let right = scene.create_entity();
        let child = scene.create_entity();
        scene
            .add_component(left, Transform::from_position(Vec3::NEG_X))
            .unwrap();
        scene
            .add_component(right, Transform::from_position(Vec3::X))
            .unwrap();
        scene.add_component(child, Transform::IDENTITY).unwrap();
        scene.set_parent(child, left).unwrap();
        scene.simulate(Duration::ZERO);
        assert_eq!(world_matrix(&scene, child), Mat4::from_translation(Vec3::NEG_X));

        scene.set_parent(child, right).unwrap();
        scene.simulate(Duration::ZERO);
        assert_eq!(world_matrix(&scene, child), Mat4::from_translation(Vec3::X));

        scene.remove_component::<Parent>(child).unwrap();
        scene.simulate(Duration::ZERO);
        assert_eq!(world_matrix(&scene, child), Mat4::IDENTITY);
    }

    #[test]
    fn simulate_with_destroyed_parent_treats_child_as_root() {
        let mut scene = Scene::new();
        scene.add_system(SceneGraph::new).unwrap();
        let parent = scene.create_entity();
        let child = scene.create_entity();
        scene
            .add_component(parent, Transform::from_position(Vec3::X))
            .unwrap();
        scene
            .add_component(child, Transform::from_position(Vec3::Y))
            .unwrap();
        scene.set_parent(child, parent).unwrap();

        scene.destroy_entity(parent);
        scene.simulate(Duration::ZERO);

        assert_eq!(world_matrix(&scene, child), Mat4::from_translation(Vec3::Y));
    }

    #[test]
    fn simulate_with_parent_cycle_terminates() {
        let mut scene = Scene::new();
        scene.add_system(SceneGraph::new).unwrap();
        let a = scene.create_entity();
        let b = scene.create_entity();
        scene
            .add_component(a, Transform::from_position(Vec3::X))
            .unwrap();
        scene
            .add_component(b, Transform::from_position(Vec3::Y))
            .unwrap();
        scene.add_component(a, Parent(b)).unwrap();
        scene.add_component(b, Parent(a)).unwrap();

        scene.simulate(Duration::ZERO);

        assert!(scene.get::<WorldTransform>(a).is_some());
        assert!(scene.get::<WorldTransform>(b).is_some());
    }
}
