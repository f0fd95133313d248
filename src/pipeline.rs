use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Serialize;

use crate::error::{RigError, RigResult};
use crate::logging::ResultExt;
use crate::model::{Mesh, Skeleton};
use crate::project::{RigProject, RigSettings};
use crate::rig::{
    NormalizationInfo, NormalizedSkeleton, SkeletonMarkers, VertexRemap, merge_redundant_vertices,
    normalize, to_solver_mesh, transfer,
};
use crate::solver::{EmbeddingSolver, SolverMesh, SolverSkeleton};
use crate::{log_info, log_warn};

/// Summary of one rigging request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigReport {
    pub vertices_before: usize,
    pub vertices_after: usize,
    pub vertices_merged: usize,
    pub solver_faces: usize,
    pub solver_joints: usize,
    pub normalization: NormalizationInfo,
    pub influences_written: usize,
}

/// Everything an external solver needs for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverRequest {
    pub mesh: SolverMesh,
    pub skeleton: SolverSkeleton,
    pub normalization: NormalizationInfo,
}

struct Prepared {
    remap: VertexRemap,
    solver_mesh: SolverMesh,
    normalized: NormalizedSkeleton,
}

/// Runs the stages in front of the solver, mutating the mesh and bone
/// influences through deduplication.
fn prepare(mesh: &mut Mesh, skeleton: &mut Skeleton, settings: &RigSettings) -> RigResult<Prepared> {
    if skeleton.is_empty() {
        return Err(RigError::NullInput { what: "skeleton" });
    }
    skeleton.root()?;

    let markers = SkeletonMarkers::from_settings(skeleton, &settings.markers)
        .log_error(Some("Marker resolution failed"))?;
    let remap = merge_redundant_vertices(mesh, Some(&mut *skeleton), settings.dedup_epsilon)
        .log_error(Some("Vertex deduplication failed"))?;
    let solver_mesh = to_solver_mesh(mesh).log_error(Some("Mesh conversion failed"))?;
    let normalized = normalize(
        skeleton,
        &markers,
        &settings.up_axis.basis_rotation(),
        settings.canonical_bound,
    )
    .log_error(Some("Skeleton normalization failed"))?;

    Ok(Prepared {
        remap,
        solver_mesh,
        normalized,
    })
}

/// Build the solver request for `mesh` and `skeleton` without calling a
/// solver. The inputs are left untouched.
pub fn prepare_request(
    mesh: &Mesh,
    skeleton: &Skeleton,
    settings: &RigSettings,
) -> RigResult<SolverRequest> {
    let mut mesh = mesh.clone();
    let mut skeleton = skeleton.clone();
    let prepared = prepare(&mut mesh, &mut skeleton, settings)?;
    Ok(SolverRequest {
        mesh: prepared.solver_mesh,
        skeleton: prepared.normalized.skeleton,
        normalization: prepared.normalized.normalization,
    })
}

/// Embed `skeleton` into `mesh` and skin it.
///
/// On success the mesh is deduplicated and recentred at the root joint, every
/// bone carries a new offset matrix, and bone influences hold the solver's
/// weights. On failure both are left in an unspecified state.
///
/// # Errors
///
/// `NullInput` for an empty skeleton, `AttachmentMissing` when the mesh is
/// empty or the solver finds no embedding, and any stage error.
pub fn rig_mesh(
    solver: &dyn EmbeddingSolver,
    mesh: &mut Mesh,
    skeleton: &mut Skeleton,
    settings: &RigSettings,
) -> RigResult<RigReport> {
    let vertices_before = mesh.vertex_count();
    let prepared = prepare(mesh, skeleton, settings)?;

    if prepared.solver_mesh.is_empty() {
        log_warn!("Mesh has no vertices after deduplication; nothing to embed into");
        return Err(RigError::AttachmentMissing);
    }

    log_info!(
        "Calling embedding solver: {} vertices, {} faces, {} joints",
        prepared.solver_mesh.vertices.len(),
        prepared.solver_mesh.face_count(),
        prepared.normalized.skeleton.len()
    );
    let output = solver.solve(&prepared.solver_mesh, &prepared.normalized.skeleton);
    if output.attachment.is_none() {
        return Err(RigError::AttachmentMissing).log_error(Some("Embedding solver failed"));
    }

    skeleton.clear_influences();
    let influences_written = transfer(
        output,
        &prepared.normalized.skeleton,
        &prepared.normalized.normalization,
        mesh,
        skeleton,
        settings,
    )
    .log_error(Some("Weight transfer failed"))?;

    Ok(RigReport {
        vertices_before,
        vertices_after: mesh.vertex_count(),
        vertices_merged: prepared.remap.merged_count(),
        solver_faces: prepared.solver_mesh.face_count(),
        solver_joints: prepared.normalized.skeleton.len(),
        normalization: prepared.normalized.normalization,
        influences_written,
    })
}

/// Rig a project on a worker thread. The solver call blocks for as long as
/// it needs; join the handle to collect the rigged project.
pub fn spawn_rig(
    solver: Arc<dyn EmbeddingSolver>,
    mut project: RigProject,
) -> JoinHandle<RigResult<(RigProject, RigReport)>> {
    thread::spawn(move || {
        let report = rig_mesh(
            solver.as_ref(),
            &mut project.mesh,
            &mut project.skeleton,
            &project.settings,
        )?;
        Ok((project, report))
    })
}
