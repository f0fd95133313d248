use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::RigResult;
use crate::log_debug;
use crate::model::Skeleton;
use crate::rig::{normalization_for, rotated_bind_positions};

/// Keyframe tracks of one bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneKeyframes {
    pub bone_name: String,
    pub timestamps: Vec<f32>,
    pub positions: Vec<Vector3<f32>>,
    pub rotations: Vec<UnitQuaternion<f32>>,
    pub scalings: Vec<Vector3<f32>>,
}

/// A named clip driving bones by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletalAnimation {
    pub name: String,
    pub duration: f32,
    pub speed: f32,
    pub keyframes: Vec<BoneKeyframes>,
}

/// Copy `animation` for playback on a mesh rigged from `source`.
///
/// Translation keys are divided by the largest bounding-box edge of the source
/// skeleton's bind pose so they match a skeleton of unit size. Rotations,
/// scalings and timing are copied unchanged.
///
/// # Errors
///
/// `NullInput` for an empty skeleton, `DegenerateSkeleton` when the bind pose
/// has no extent.
pub fn copy_animation(source: &Skeleton, animation: &SkeletalAnimation) -> RigResult<SkeletalAnimation> {
    let positions = rotated_bind_positions(source, &Matrix3::identity());
    let scale = normalization_for(&positions, 1.0)?.scale as f32;

    let mut copy = animation.clone();
    for track in &mut copy.keyframes {
        for position in &mut track.positions {
            *position *= scale;
        }
    }
    log_debug!(
        "Copied animation '{}' ({} tracks), translation scale {:.6}",
        copy.name,
        copy.keyframes.len(),
        scale
    );
    Ok(copy)
}
