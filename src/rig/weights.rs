use nalgebra::Point3;

use crate::error::{RigError, RigResult};
use crate::model::{BoneId, Mesh, Skeleton};
use crate::project::{OutputSpace, RigSettings};
use crate::rig::embedding::reconstruct;
use crate::rig::skeleton::NormalizationInfo;
use crate::solver::{SolverOutput, SolverSkeleton};
use crate::{log_debug, log_info};

/// Solver joint column of every bone, resolved by name once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightColumns {
    columns: Vec<(BoneId, usize)>,
}

impl WeightColumns {
    /// # Errors
    ///
    /// `UnknownJoint` when a bone has no joint of the same name.
    pub fn resolve(skeleton: &Skeleton, solver_skeleton: &SolverSkeleton) -> RigResult<Self> {
        let columns = skeleton
            .bones()
            .map(|(id, bone)| {
                solver_skeleton
                    .joint_index(&bone.name)
                    .map(|column| (id, column))
                    .ok_or_else(|| RigError::UnknownJoint {
                        name: bone.name.clone(),
                    })
            })
            .collect::<RigResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoneId, usize)> + '_ {
        self.columns.iter().copied()
    }
}

/// Move the solver's result onto the caller's mesh and skeleton.
///
/// The mesh and the embedding are recentred at the root joint (and scaled
/// back to source units under [`OutputSpace::Source`]); offset matrices are
/// rebuilt from the recentred embedding; every strictly positive weight is
/// appended to its bone in ascending vertex order.
///
/// Returns the number of influences written.
///
/// # Errors
///
/// `AttachmentMissing` when the solver produced no weights, before anything
/// is modified. Otherwise the errors of [`reconstruct`].
pub fn transfer(
    output: SolverOutput,
    solver_skeleton: &SolverSkeleton,
    normalization: &NormalizationInfo,
    mesh: &mut Mesh,
    skeleton: &mut Skeleton,
    settings: &RigSettings,
) -> RigResult<usize> {
    let SolverOutput {
        mut embedding,
        attachment,
        mesh_transform,
    } = output;
    let attachment = attachment.ok_or(RigError::AttachmentMissing)?;

    if embedding.len() != solver_skeleton.len() {
        return Err(RigError::EmbeddingMismatch {
            expected: solver_skeleton.len(),
            actual: embedding.len(),
        });
    }
    let root_name = skeleton
        .bone(skeleton.root()?)
        .map(|bone| bone.name.clone())
        .ok_or(RigError::NullInput { what: "root bone" })?;
    let root_position = solver_skeleton
        .joint_index(&root_name)
        .and_then(|joint| embedding.get(joint))
        .copied()
        .ok_or(RigError::UnknownJoint { name: root_name })?;

    let output_scale = match settings.output_space {
        OutputSpace::Canonical => 1.0,
        OutputSpace::Source => 1.0 / normalization.scale,
    };
    let recentre = |point: &Point3<f64>| -> Point3<f64> {
        Point3::from((point.coords - root_position.coords) * output_scale)
    };

    for joint in &mut embedding {
        *joint = recentre(&*joint);
    }
    for vertex in &mut mesh.vertices {
        let solver_space = mesh_transform.apply(&Point3::from(vertex.cast::<f64>()));
        *vertex = recentre(&solver_space).coords.cast::<f32>();
    }
    log_debug!(
        "Recentred {} vertices at root joint ({:.4}, {:.4}, {:.4})",
        mesh.vertex_count(),
        root_position.x,
        root_position.y,
        root_position.z
    );

    reconstruct(&embedding, solver_skeleton, skeleton, settings.branch_direction)?;

    let columns = WeightColumns::resolve(skeleton, solver_skeleton)?;
    let mut written = 0usize;
    for vertex in 0..mesh.vertex_count() {
        let weights = attachment.weights(vertex);
        for (bone_id, column) in columns.iter() {
            let Some(&weight) = weights.get(column) else {
                continue;
            };
            let weight = weight as f32;
            if weight > 0.0 {
                if let Some(bone) = skeleton.bone_mut(bone_id) {
                    bone.vertex_influences.push(vertex);
                    bone.vertex_weights.push(weight);
                    written += 1;
                }
            }
        }
    }

    log_info!(
        "Transferred {} influences to {} bones",
        written,
        skeleton.len()
    );
    Ok(written)
}
