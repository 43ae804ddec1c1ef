#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(missing_docs)]

//! # Marrow
//!
//! ![MIT](https://img.shields.io/badge/license-MIT-blue.svg)
//!
//! ## What is Marrow?
//!
//! Marrow is a small entity-component runtime with an importer for skinned, animated meshes in the
//! Inter-Quake Model format. It provides:
//! - Generational entity handles and per-type component pools
//! - Systems matched to entities by their component masks, run in insertion order
//! - A transform hierarchy resolved into world matrices each step
//! - A message bus delivering events at the start of each step
//! - IQM version 2 import into interleaved vertex data, a skeleton and animations
//! - Skeletal animation with interpolated keyframes
//! - A state stack and a windowed application runner
//!
//! ```
//! use std::time::Duration;
//!
//! use marrow::systems::SkeletalAnimator;
//! use marrow::Scene;
//! use marrow::Skeleton;
//!
//! let mut scene = Scene::new();
//! scene.add_system(SkeletalAnimator::new).unwrap();
//!
//! let entity = scene.create_entity();
//! scene.add_component(entity, Skeleton::default()).unwrap();
//! scene.simulate(Duration::from_millis(16));
//! ```

pub use crate::app::Application;
pub use crate::app::ApplicationError;
pub use crate::app::ApplicationState;
pub use crate::app::Event;
pub use crate::component::Component;
pub use crate::component::ComponentId;
pub use crate::component::ComponentMask;
pub use crate::component::ComponentRegistry;
pub use crate::component::MAX_COMPONENTS;
pub use crate::components::MaterialId;
pub use crate::components::MeshId;
pub use crate::components::Model;
pub use crate::components::Parent;
pub use crate::components::Transform;
pub use crate::components::WorldTransform;
pub use crate::diagnostics::BufferedDiagnostics;
pub use crate::diagnostics::Diagnostics;
pub use crate::diagnostics::LogDiagnostics;
pub use crate::diagnostics::Severity;
pub use crate::entity::Entity;
pub use crate::entity::EntityStore;
pub use crate::error::EcsError;
pub use crate::mesh::Attribute;
pub use crate::mesh::BoundingBox;
pub use crate::mesh::BoundingSphere;
pub use crate::mesh::MeshData;
pub use crate::mesh::PrimitiveType;
pub use crate::mesh::Submesh;
pub use crate::message::Message;
pub use crate::message::MessageBus;
pub use crate::message::MessageId;
pub use crate::pool::ComponentPool;
pub use crate::scene::Scene;
pub use crate::skeleton::Animation;
pub use crate::skeleton::JointTransform;
pub use crate::skeleton::Skeleton;
pub use crate::state::State;
pub use crate::state::StateId;
pub use crate::state::StateStack;
pub use crate::system::Requirements;
pub use crate::system::System;
pub use crate::system::SystemContext;
pub use crate::system::SystemManager;
pub use crate::world::World;

mod app;
mod component;
mod components;
mod diagnostics;
mod entity;
mod error;
pub mod iqm;
mod mesh;
mod message;
mod pool;
mod scene;
mod skeleton;
mod state;
mod system;
pub mod systems;
mod world;
