//! # Skeleton
//!
//! Joint hierarchy, keyframes and playback state of a skinned mesh.

use std::ops::Range;

use glam::Mat4;
use glam::Quat;
use glam::Vec3;

use crate::Component;

/// # Joint Transform
///
/// Translation, rotation, and scale of a joint relative to its parent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JointTransform {
    /// Translation of the joint.
    pub translation: Vec3,
    /// Rotation of the joint.
    pub rotation: Quat,
    /// Scale of the joint.
    pub scale: Vec3,
}

impl JointTransform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Returns a transform with the given translation, rotation, and scale.
    pub const fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Returns the transform matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Interpolates between two transforms. Translation and scale are interpolated linearly,
    /// rotation spherically.
    pub fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }
}

impl Default for JointTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// # Animation
///
/// Named range of keyframes of a [Skeleton].
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    /// Name of the animation.
    pub name: String,
    /// First keyframe of the animation.
    pub start_frame: usize,
    /// Number of keyframes.
    pub frame_count: usize,
    /// Keyframes per second.
    pub frame_rate: f32,
    /// Whether playback wraps around at the end.
    pub looped: bool,
}

/// # Skeleton
///
/// Joints are stored so that every parent precedes its children. `frames`, `keyframes` and the
/// pose matrices are filled in by the importer and are not changed by playback, which only writes
/// `current_frame`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skeleton {
    /// Parent of each joint, `-1` for roots.
    pub joint_parents: Vec<i32>,
    /// Name of each joint.
    pub joint_names: Vec<String>,
    /// Model space transform of each joint in the bind pose.
    pub bind_pose: Vec<Mat4>,
    /// Inverse of [Skeleton::bind_pose].
    pub inverse_bind_pose: Vec<Mat4>,
    /// Number of keyframes.
    pub frame_count: usize,
    /// Skinning matrices relative to the parent joint, `joint_count` per keyframe.
    pub frames: Vec<Mat4>,
    /// Local joint transforms, `joint_count` per keyframe.
    pub keyframes: Vec<JointTransform>,
    /// Skinning matrix of each joint for the current pose.
    pub current_frame: Vec<Mat4>,
    /// Animations referencing the keyframes.
    pub animations: Vec<Animation>,
    pub(crate) current_animation: Option<usize>,
    pub(crate) frame_position: f32,
    pub(crate) playing: bool,
}

impl Component for Skeleton {}

impl Skeleton {
    /// Returns the number of joints.
    pub fn joint_count(&self) -> usize {
        self.joint_parents.len()
    }

    /// Returns true if there are no joints.
    pub fn is_empty(&self) -> bool {
        self.joint_parents.is_empty()
    }

    /// Returns the parent of the joint.
    pub fn parent(&self, joint: usize) -> Option<usize> {
        match self.joint_parents.get(joint) {
            Some(parent) if *parent >= 0 => Some(*parent as usize),
            _ => None,
        }
    }

    /// Returns the index of the animation with the given name.
    pub fn animation_index(&self, name: &str) -> Option<usize> {
        self.animations.iter().position(|animation| animation.name == name)
    }

    /// Returns the local joint transforms of the keyframe.
    pub fn keyframe(&self, frame: usize) -> Option<&[JointTransform]> {
        self.keyframes.get(self.frame_range(frame)?)
    }

    /// Returns the parent relative skinning matrices of the keyframe.
    pub fn frame(&self, frame: usize) -> Option<&[Mat4]> {
        self.frames.get(self.frame_range(frame)?)
    }

    fn frame_range(&self, frame: usize) -> Option<Range<usize>> {
        let count = self.joint_count();
        let start = frame.checked_mul(count)?;
        Some(start..start.checked_add(count)?)
    }

    /// Returns the skinning palette of the keyframe, composed through the joint hierarchy from
    /// [Skeleton::frames].
    pub fn frame_palette(&self, frame: usize) -> Option<Vec<Mat4>> {
        let frame = self.frame(frame)?;
        let mut palette: Vec<Mat4> = Vec::with_capacity(frame.len());

        for (joint, matrix) in frame.iter().enumerate() {
            let matrix = match self.parent(joint).and_then(|parent| palette.get(parent)) {
                Some(parent) => *parent * *matrix,
                None => *matrix,
            };
            palette.push(matrix);
        }

        Some(palette)
    }

    /// Writes the skinning palette of the local joint transforms into
    /// [Skeleton::current_frame].
    pub fn apply_pose(&mut self, pose: &[JointTransform]) {
        let count = self.joint_count().min(pose.len());
        let mut world: Vec<Mat4> = Vec::with_capacity(count);
        self.current_frame.resize(self.joint_count(), Mat4::IDENTITY);

        for (joint, transform) in pose.iter().take(count).enumerate() {
            let local = transform.matrix();
            let matrix = match self.parent(joint).and_then(|parent| world.get(parent)) {
                Some(parent) => *parent * local,
                None => local,
            };
            world.push(matrix);

            let inverse = self
                .inverse_bind_pose
                .get(joint)
                .copied()
                .unwrap_or(Mat4::IDENTITY);
            self.current_frame[joint] = matrix * inverse;
        }
    }

    /// Resets [Skeleton::current_frame] to the bind pose.
    pub fn reset_pose(&mut self) {
        self.current_frame.clear();
        self.current_frame.resize(self.joint_count(), Mat4::IDENTITY);
    }

    /// Starts the animation from its first frame. Returns false if the animation does not exist or
    /// its keyframes are missing.
    pub fn play(&mut self, animation: usize) -> bool {
        let playable = self.animations.get(animation).is_some_and(|animation| {
            animation.frame_count > 0
                && animation.start_frame + animation.frame_count <= self.frame_count
        });

        if playable {
            self.current_animation = Some(animation);
            self.frame_position = 0.0;
            self.playing = true;
        }

        playable
    }

    /// Stops playback, keeping the current pose.
    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Returns true if an animation is playing.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Returns the animation last started with [Skeleton::play].
    pub fn current_animation(&self) -> Option<usize> {
        self.current_animation
    }

    /// Returns the playback position in frames from the start of the current animation.
    pub fn frame_position(&self) -> f32 {
        self.frame_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(translation: Vec3) -> JointTransform {
        JointTransform {
            translation,
            ..JointTransform::IDENTITY
        }
    }

    fn two_joint_skeleton() -> Skeleton {
        let root = translation(Vec3::new(0.0, 1.0, 0.0));
        let child = translation(Vec3::new(0.0, 2.0, 0.0));
        let bind_pose = vec![root.matrix(), root.matrix() * child.matrix()];

        Skeleton {
            joint_parents: vec![-1, 0],
            joint_names: vec!["root".to_string(), "arm".to_string()],
            inverse_bind_pose: bind_pose.iter().map(Mat4::inverse).collect(),
            bind_pose,
            frame_count: 2,
            keyframes: vec![root, child, root, child],
            animations: vec![Animation {
                name: "idle".to_string(),
                start_frame: 0,
                frame_count: 2,
                frame_rate: 10.0,
                looped: true,
            }],
            ..Skeleton::default()
        }
    }

    #[test]
    fn apply_pose_with_bind_pose_returns_identity_palette() {
        let mut skeleton = two_joint_skeleton();
        let pose = skeleton.keyframe(0).unwrap().to_vec();

        skeleton.apply_pose(&pose);

        for matrix in &skeleton.current_frame {
            assert!(matrix.abs_diff_eq(Mat4::IDENTITY, 1e-5));
        }
    }

    #[test]
    fn apply_pose_with_rotated_root_moves_child() {
        let mut skeleton = two_joint_skeleton();
        let mut pose = skeleton.keyframe(0).unwrap().to_vec();
        pose[0].rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);

        skeleton.apply_pose(&pose);

        let tip = skeleton.current_frame[1].transform_point3(Vec3::new(0.0, 3.0, 0.0));
        assert!(tip.abs_diff_eq(Vec3::new(-2.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn interpolate_halfway_returns_midpoint() {
        let a = JointTransform::IDENTITY;
        let b = JointTransform::new(
            Vec3::new(2.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::splat(3.0),
        );

        let result = a.interpolate(&b, 0.5);

        assert!(result.translation.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));
        assert!(result.scale.abs_diff_eq(Vec3::splat(2.0), 1e-6));
        assert!(result
            .rotation
            .abs_diff_eq(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4), 1e-5));
    }

    #[test]
    fn play_with_missing_keyframes_returns_false() {
        let mut skeleton = two_joint_skeleton();
        skeleton.frame_count = 1;

        assert!(!skeleton.play(0));
        assert!(!skeleton.is_playing());
    }

    #[test]
    fn play_then_stop_keeps_animation() {
        let mut skeleton = two_joint_skeleton();

        assert!(skeleton.play(0));
        skeleton.stop();

        assert!(!skeleton.is_playing());
        assert_eq!(skeleton.current_animation(), Some(0));
        assert_eq!(skeleton.animation_index("idle"), Some(0));
    }

    #[test]
    fn keyframe_past_last_frame_returns_none() {
        let skeleton = two_joint_skeleton();

        assert_eq!(skeleton.keyframe(1).map(<[JointTransform]>::len), Some(2));
        assert_eq!(skeleton.keyframe(2), None);
        assert_eq!(skeleton.keyframe(usize::MAX), None);
        assert_eq!(skeleton.frame(usize::MAX / 2 + 1), None);
    }
}
