use std::time::Duration;

use crate::skeleton::JointTransform;
use crate::Entity;
use crate::Message;
use crate::MessageId;
use crate::Requirements;
use crate::Skeleton;
use crate::System;
use crate::SystemContext;
use crate::World;

/// Message ID of [PlayAnimation].
pub const PLAY_ANIMATION: MessageId = MessageId(u32::MAX - 1);

/// Message ID of [StopAnimation].
pub const STOP_ANIMATION: MessageId = MessageId(u32::MAX - 2);

/// # Play Animation
///
/// Starts an animation of the entity's [Skeleton] from its first frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PlayAnimation {
    /// Entity to animate.
    pub entity: Entity,
    /// Index into [Skeleton::animations].
    pub animation: usize,
}

/// # Stop Animation
///
/// Stops the animation of the entity's [Skeleton], keeping its current pose.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StopAnimation {
    /// Entity to stop.
    pub entity: Entity,
}

#[derive(Copy, Clone, Debug)]
enum Command {
    Play(PlayAnimation),
    Stop(StopAnimation),
}

/// # Skeletal Animator
///
/// Advances the playing animation of every [Skeleton] and writes the interpolated pose into
/// [Skeleton::current_frame].
#[derive(Debug, Default)]
pub struct SkeletalAnimator {
    commands: Vec<Command>,
}

impl SkeletalAnimator {
    /// Returns an animator without pending commands.
    pub fn new() -> Self {
        Self::default()
    }
}

impl System for SkeletalAnimator {
    fn require(&self, requirements: &mut Requirements) {
        requirements.require::<Skeleton>();
    }

    fn process(&mut self, context: &mut SystemContext, dt: Duration) {
        for command in self.commands.drain(..) {
            match command {
                Command::Play(play) => {
                    if let Some(skeleton) = context.get_mut::<Skeleton>(play.entity) {
                        skeleton.play(play.animation);
                    }
                }
                Command::Stop(stop) => {
                    if let Some(skeleton) = context.get_mut::<Skeleton>(stop.entity) {
                        skeleton.stop();
                    }
                }
            }
        }

        let dt = dt.as_secs_f32();
        for entity in context.entities() {
            if let Some(skeleton) = context.get_mut::<Skeleton>(*entity) {
                animate(skeleton, dt);
            }
        }
    }

    fn handle_message(&mut self, message: &Message) {
        let command = match message.id() {
            PLAY_ANIMATION => message.data::<PlayAnimation>().copied().map(Command::Play),
            STOP_ANIMATION => message.data::<StopAnimation>().copied().map(Command::Stop),
            _ => None,
        };

        self.commands.extend(command);
    }

    fn on_entity_added(&mut self, world: &mut World, entity: Entity) {
        if let Some(skeleton) = world.get_mut::<Skeleton>(entity) {
            skeleton.reset_pose();
        }
    }
}

/// Advances the skeleton's animation by `dt` seconds and poses it.
fn animate(skeleton: &mut Skeleton, dt: f32) {
    if !skeleton.is_playing() {
        return;
    }

    let Some(animation) = skeleton
        .current_animation()
        .and_then(|index| skeleton.animations.get(index))
    else {
        return;
    };

    let start = animation.start_frame;
    let count = animation.frame_count;
    let looped = animation.looped;
    let last = count.saturating_sub(1);
    let mut position = skeleton.frame_position() + dt * animation.frame_rate;

    let (from, to) = if looped {
        position = position.rem_euclid(count as f32);
        let from = (position as usize).min(last);
        (from, (from + 1) % count)
    } else if position >= last as f32 {
        position = last as f32;
        skeleton.stop();
        (last, last)
    } else {
        let from = position as usize;
        (from, from + 1)
    };

    let t = position - from as f32;
    skeleton.frame_position = position;

    let pose = match (skeleton.keyframe(start + from), skeleton.keyframe(start + to)) {
        (Some(a), Some(b)) => a
            .iter()
            .zip(b)
            .map(|(a, b)| a.interpolate(b, t))
            .collect::<Vec<JointTransform>>(),
        _ => return,
    };
    skeleton.apply_pose(&pose);
}
