//! # Systems
//!
//! Systems shipped with the runtime.

pub use crate::systems::render_list::DrawItem;
pub use crate::systems::render_list::RenderList;
pub use crate::systems::scene_graph::SceneGraph;
pub use crate::systems::skeletal_animator::PlayAnimation;
pub use crate::systems::skeletal_animator::SkeletalAnimator;
pub use crate::systems::skeletal_animator::StopAnimation;
pub use crate::systems::skeletal_animator::PLAY_ANIMATION;
pub use crate::systems::skeletal_animator::STOP_ANIMATION;

mod render_list;
mod scene_graph;
mod skeletal_animator;
