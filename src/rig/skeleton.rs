use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{RigError, RigResult};
use crate::model::{Bone, BoneId, Skeleton};
use crate::rig::markers::SkeletonMarkers;
use crate::solver::SolverSkeleton;
use crate::{log_debug, log_info};

/// Suffix of the synthetic joint placed past every leaf bone.
pub const END_JOINT_SUFFIX: &str = "_end";

/// How far past its leaf an end joint sits, relative to the leaf segment.
const END_JOINT_EXTENSION: f64 = 1.1;

/// Extents at or below this are treated as zero.
const MIN_EXTENT: f64 = 1e-9;

/// Uniform scale and offset mapping source positions into canonical space:
/// `canonical = source * scale - offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationInfo {
    pub scale: f64,
    pub offset: Vector3<f64>,
}

impl NormalizationInfo {
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(point.coords * self.scale - self.offset)
    }

    pub fn invert(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from((point.coords + self.offset) / self.scale)
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSkeleton {
    pub skeleton: SolverSkeleton,
    pub normalization: NormalizationInfo,
    /// Canonical position of every solver joint, by solver joint index.
    pub joint_positions: Vec<Point3<f64>>,
}

/// Name of the end joint synthesized for leaf bone `bone_name`.
pub fn end_joint_name(bone_name: &str) -> String {
    format!("{bone_name}{END_JOINT_SUFFIX}")
}

/// Bind positions of every bone after the change of basis, by bone id.
pub fn rotated_bind_positions(skeleton: &Skeleton, basis_rotation: &Matrix3<f64>) -> Vec<Point3<f64>> {
    skeleton
        .bones()
        .map(|(_, bone)| Point3::from(basis_rotation * bone.bind_position().cast::<f64>()))
        .collect()
}

/// Scale the source skeleton into a cube of edge `target_bound` and build the
/// solver's joint graph.
///
/// Bones are emitted in pre-order under their own names; each leaf bone is
/// followed by its end joint. Symmetry and fat markers go on the bones, foot
/// markers on the end joints. The graph is finalized before returning.
///
/// # Errors
///
/// - `NullInput` when the skeleton has no root.
/// - `DegenerateSkeleton` when all bind positions share a point.
/// - `UnknownBone` when a marker refers to a bone outside the skeleton.
pub fn normalize(
    skeleton: &Skeleton,
    markers: &SkeletonMarkers,
    basis_rotation: &Matrix3<f64>,
    target_bound: f64,
) -> RigResult<NormalizedSkeleton> {
    let order = skeleton.pre_order()?;
    let positions = rotated_bind_positions(skeleton, basis_rotation);

    let normalization = normalization_for(&positions, target_bound)?;
    log_info!(
        "Normalizing skeleton of {} bones: scale {:.6}, offset ({:.4}, {:.4}, {:.4})",
        order.len(),
        normalization.scale,
        normalization.offset.x,
        normalization.offset.y,
        normalization.offset.z
    );

    let mut solver_skeleton = SolverSkeleton::new();
    let mut joint_positions = Vec::with_capacity(order.len() * 2);
    for &id in &order {
        let bone = bone_at(skeleton, id)?;
        let position = normalization.apply(&positions[id]);
        let parent = bone.parent.map(|p| bone_at(skeleton, p)).transpose()?;
        solver_skeleton.make_joint(&bone.name, position, parent.map(|p| p.name.as_str()))?;
        joint_positions.push(position);

        if let (true, Some(parent_id)) = (bone.is_leaf(), bone.parent) {
            let parent_position = normalization.apply(&positions[parent_id]);
            let end = parent_position + (position - parent_position) * END_JOINT_EXTENSION;
            solver_skeleton.make_joint(&end_joint_name(&bone.name), end, Some(&bone.name))?;
            joint_positions.push(end);
        }
    }

    for pair in &markers.symmetry {
        let first = bone_at(skeleton, pair.first)?;
        let second = bone_at(skeleton, pair.second)?;
        solver_skeleton.make_symmetric(&first.name, &second.name)?;
    }
    for &id in &markers.fat {
        solver_skeleton.set_fat(&bone_at(skeleton, id)?.name)?;
    }
    for &id in &markers.foot {
        let bone = bone_at(skeleton, id)?;
        if bone.is_leaf() && bone.parent.is_some() {
            solver_skeleton.set_foot(&end_joint_name(&bone.name))?;
        } else {
            log_debug!("Foot bone '{}' has no end joint; marking the bone itself", bone.name);
            solver_skeleton.set_foot(&bone.name)?;
        }
    }
    solver_skeleton.finalize();

    log_info!("Solver skeleton has {} joints", solver_skeleton.len());
    Ok(NormalizedSkeleton {
        skeleton: solver_skeleton,
        normalization,
        joint_positions,
    })
}

fn bone_at(skeleton: &Skeleton, id: BoneId) -> RigResult<&Bone> {
    skeleton.bone(id).ok_or(RigError::UnknownBone { id })
}

/// Scale and offset fitting `positions` into a cube of edge `target_bound`.
pub fn normalization_for(positions: &[Point3<f64>], target_bound: f64) -> RigResult<NormalizationInfo> {
    let Some(first) = positions.first() else {
        return Err(RigError::NullInput { what: "root bone" });
    };
    let (min, max) = positions
        .iter()
        .fold((first.coords, first.coords), |(min, max), p| {
            (min.inf(&p.coords), max.sup(&p.coords))
        });

    let extent = (max - min).max();
    if !(extent > MIN_EXTENT) {
        return Err(RigError::DegenerateSkeleton { extent });
    }

    let center = (min + max) * 0.5;
    let scale = target_bound / extent;
    Ok(NormalizationInfo {
        scale,
        offset: center * scale,
    })
}
