use nalgebra::{Point3, Vector3};

use crate::correction::offset_matrix_for_bone;
use crate::error::{RigError, RigResult};
use crate::log_debug;
use crate::model::{Bone, BoneId, Skeleton};
use crate::project::BranchDirection;
use crate::solver::SolverSkeleton;

/// Rebuild every bone's offset matrix from the solver's embedded joint
/// positions.
///
/// Each bone is placed at the joint of the same name and oriented along:
/// its only child; otherwise away from its parent (or toward its first child
/// for branch bones under [`BranchDirection::TowardFirstChild`]); otherwise,
/// for a root with several children, toward the first child.
///
/// # Errors
///
/// - `EmbeddingMismatch` when `embedding` does not hold one point per joint.
/// - `UnknownJoint` when a bone has no joint of the same name.
/// - `IsolatedBone` when a bone has neither parent nor children.
pub fn reconstruct(
    embedding: &[Point3<f64>],
    solver_skeleton: &SolverSkeleton,
    skeleton: &mut Skeleton,
    branch_direction: BranchDirection,
) -> RigResult<()> {
    if embedding.len() != solver_skeleton.len() {
        return Err(RigError::EmbeddingMismatch {
            expected: solver_skeleton.len(),
            actual: embedding.len(),
        });
    }

    let position_of = |bone: &Bone| -> RigResult<Point3<f64>> {
        solver_skeleton
            .joint_index(&bone.name)
            .and_then(|joint| embedding.get(joint))
            .copied()
            .ok_or_else(|| RigError::UnknownJoint {
                name: bone.name.clone(),
            })
    };

    let mut offsets = Vec::with_capacity(skeleton.len());
    for id in skeleton.pre_order()? {
        let bone = bone_at(skeleton, id)?;
        let position = position_of(bone)?;
        let direction = bone_direction(skeleton, bone, &position, branch_direction, &position_of)?;
        log_debug!(
            "Bone '{}' at ({:.4}, {:.4}, {:.4})",
            bone.name,
            position.x,
            position.y,
            position.z
        );
        offsets.push((id, offset_matrix_for_bone(&position, &direction)));
    }

    for (id, offset) in offsets {
        if let Some(bone) = skeleton.bone_mut(id) {
            bone.offset_matrix = offset;
        }
    }
    Ok(())
}

fn bone_direction(
    skeleton: &Skeleton,
    bone: &Bone,
    position: &Point3<f64>,
    branch_direction: BranchDirection,
    position_of: &impl Fn(&Bone) -> RigResult<Point3<f64>>,
) -> RigResult<Vector3<f64>> {
    let toward_first_child = || -> RigResult<Vector3<f64>> {
        let child = bone_at(skeleton, bone.children[0])?;
        Ok(position_of(child)? - *position)
    };

    match (bone.parent, bone.children.len()) {
        (_, 1) => toward_first_child(),
        (Some(_), n) if n > 1 && branch_direction == BranchDirection::TowardFirstChild => {
            toward_first_child()
        }
        (Some(parent), _) => Ok(*position - position_of(bone_at(skeleton, parent)?)?),
        (None, n) if n > 1 => toward_first_child(),
        (None, _) => Err(RigError::IsolatedBone {
            name: bone.name.clone(),
        }),
    }
}

fn bone_at(skeleton: &Skeleton, id: BoneId) -> RigResult<&Bone> {
    skeleton.bone(id).ok_or(RigError::UnknownBone { id })
}
