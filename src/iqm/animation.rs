//! Skeleton stage of the import: joints, bind pose, keyframes and animations.

use glam::Mat4;
use glam::Quat;
use glam::Vec3;

use crate::iqm::format;
use crate::iqm::format::AnimRecord;
use crate::iqm::format::Header;
use crate::iqm::format::JointRecord;
use crate::iqm::format::PoseRecord;
use crate::iqm::format::Reader;
use crate::iqm::format::TextTable;
use crate::iqm::ImportConfig;
use crate::iqm::ImportError;
use crate::skeleton::Animation;
use crate::skeleton::JointTransform;
use crate::Diagnostics;
use crate::Severity;
use crate::Skeleton;

/// Frame rate used for animations declaring none.
pub(crate) const DEFAULT_FRAME_RATE: f32 = 24.0;

/// Builds the skeleton of the file. Returns an empty skeleton if the file has no joints.
pub(crate) fn build_skeleton(
    bytes: &[u8],
    header: &Header,
    text: &TextTable,
    config: &ImportConfig,
    diagnostics: &dyn Diagnostics,
) -> Result<Skeleton, ImportError> {
    let joints = format::read_table(
        bytes,
        "joint",
        header.ofs_joints,
        header.num_joints,
        format::JOINT_SIZE,
        JointRecord::read,
    )?;
    if joints.is_empty() {
        return Ok(Skeleton::default());
    }

    if joints.len() > config.joint_warning_limit {
        diagnostics.log(
            &format!(
                "{} joints exceed the limit of {} supported by most skinning shaders",
                joints.len(),
                config.joint_warning_limit
            ),
            Severity::Warning,
        );
    }

    let joint_parents = joints
        .iter()
        .enumerate()
        .map(|(joint, record)| check_parent(joint, record.parent))
        .collect::<Result<Vec<_>, _>>()?;

    let mut bind_pose: Vec<Mat4> = Vec::with_capacity(joints.len());
    let mut inverse_bind_pose: Vec<Mat4> = Vec::with_capacity(joints.len());
    for (joint, record) in joints.iter().enumerate() {
        let local = Mat4::from_scale_rotation_translation(
            record.scale,
            record.rotate.normalize(),
            record.translate,
        );
        let inverse = local.inverse();

        match parent_index(joint_parents[joint]) {
            Some(parent) => {
                bind_pose.push(bind_pose[parent] * local);
                inverse_bind_pose.push(inverse * inverse_bind_pose[parent]);
            }
            None => {
                bind_pose.push(local);
                inverse_bind_pose.push(inverse);
            }
        }
    }

    let mut skeleton = Skeleton {
        joint_names: joints.iter().map(|joint| text.get(joint.name)).collect(),
        current_frame: vec![Mat4::IDENTITY; joints.len()],
        joint_parents,
        bind_pose,
        inverse_bind_pose,
        ..Skeleton::default()
    };

    let poses = format::read_table(
        bytes,
        "pose",
        header.ofs_poses,
        header.num_poses,
        format::POSE_SIZE,
        PoseRecord::read,
    )?;
    if header.num_frames > 0 {
        if poses.len() == joints.len() {
            read_keyframes(bytes, header, &poses, &mut skeleton)?;
        } else {
            diagnostics.log(
                &format!(
                    "{} poses do not match {} joints, skipping keyframes",
                    poses.len(),
                    joints.len()
                ),
                Severity::Warning,
            );
        }
    }

    let anims = format::read_table(
        bytes,
        "animation",
        header.ofs_anims,
        header.num_anims,
        format::ANIM_SIZE,
        AnimRecord::read,
    )?;
    let animations = anims
        .iter()
        .map(|anim| build_animation(anim, header, text, diagnostics))
        .collect::<Result<Vec<_>, _>>()?;

    if skeleton.frame_count == 0 && !animations.is_empty() {
        diagnostics.log(
            &format!("skipping {} animations without keyframes", animations.len()),
            Severity::Warning,
        );
    } else {
        skeleton.animations = animations;
    }

    Ok(skeleton)
}

fn check_parent(joint: usize, parent: i32) -> Result<i32, ImportError> {
    if parent >= 0 && parent as usize >= joint {
        return Err(ImportError::UnsupportedHierarchy { joint, parent });
    }

    Ok(parent.max(-1))
}

fn parent_index(parent: i32) -> Option<usize> {
    usize::try_from(parent).ok()
}

/// Decodes the local joint transform of every pose of every frame and the matching skinning
/// matrices relative to the parent joint.
fn read_keyframes(
    bytes: &[u8],
    header: &Header,
    poses: &[PoseRecord],
    skeleton: &mut Skeleton,
) -> Result<(), ImportError> {
    let channels = poses.iter().map(PoseRecord::animated_channels).sum::<usize>();
    if channels != header.num_frame_channels as usize {
        return Err(ImportError::InvalidFormat(format!(
            "poses animate {channels} channels but frames store {}",
            header.num_frame_channels
        )));
    }

    let values = header
        .num_frames
        .checked_mul(header.num_frame_channels)
        .ok_or_else(|| ImportError::InvalidFormat("frame table is too large".to_string()))?;
    let mut reader = Reader::new(format::table(
        bytes,
        "frame",
        header.ofs_frames,
        values,
        std::mem::size_of::<u16>(),
    )?);

    let frame_count = header.num_frames as usize;
    skeleton.keyframes.reserve(frame_count * poses.len());
    skeleton.frames.reserve(frame_count * poses.len());

    for _ in 0..frame_count {
        for (joint, pose) in poses.iter().enumerate() {
            let mut channel = [0.0; format::POSE_CHANNELS];
            for (index, value) in channel.iter_mut().enumerate() {
                *value = pose.channel_offset[index];
                if pose.is_animated(index) {
                    *value += f32::from(reader.read_u16()?) * pose.channel_scale[index];
                }
            }

            let transform = JointTransform::new(
                Vec3::new(channel[0], channel[1], channel[2]),
                Quat::from_xyzw(channel[3], channel[4], channel[5], channel[6]).normalize(),
                Vec3::new(channel[7], channel[8], channel[9]),
            );

            let local = transform.matrix();
            let matrix = match skeleton.parent(joint) {
                Some(parent) => {
                    skeleton.bind_pose[parent] * local * skeleton.inverse_bind_pose[joint]
                }
                None => local * skeleton.inverse_bind_pose[joint],
            };

            skeleton.keyframes.push(transform);
            skeleton.frames.push(matrix);
        }
    }

    skeleton.frame_count = frame_count;
    Ok(())
}

fn build_animation(
    anim: &AnimRecord,
    header: &Header,
    text: &TextTable,
    diagnostics: &dyn Diagnostics,
) -> Result<Animation, ImportError> {
    let name = text.get(anim.name);

    let end = anim.first_frame.checked_add(anim.num_frames);
    if end.map_or(true, |end| end > header.num_frames) {
        return Err(ImportError::InvalidFormat(format!(
            "animation {name:?} references frames {}..{} of {}",
            anim.first_frame,
            u64::from(anim.first_frame) + u64::from(anim.num_frames),
            header.num_frames
        )));
    }

    let frame_rate = if anim.frame_rate > 0.0 && anim.frame_rate.is_finite() {
        anim.frame_rate
    } else {
        diagnostics.log(
            &format!(
                "animation {name:?} has frame rate {}, using {DEFAULT_FRAME_RATE}",
                anim.frame_rate
            ),
            Severity::Warning,
        );
        DEFAULT_FRAME_RATE
    };

    Ok(Animation {
        start_frame: anim.first_frame as usize,
        frame_count: anim.num_frames as usize,
        frame_rate,
        looped: anim.flags & format::ANIM_LOOP != 0,
        name,
    })
}
