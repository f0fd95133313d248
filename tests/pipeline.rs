//! End-to-end rigging with deterministic in-test solvers.

use std::sync::Arc;

use approx::assert_relative_eq;
use autorig::model::{Mesh, Skeleton};
use autorig::pipeline::{prepare_request, rig_mesh, spawn_rig};
use autorig::project::{RigProject, RigSettings};
use autorig::solver::{
    DenseAttachment, EmbeddingSolver, MeshTransform, RecordedSolution, SolverMesh, SolverOutput,
    SolverSkeleton,
};
use autorig::RigError;
use nalgebra::{Matrix4, Point3, Translation3, Vector3};

/// Leaves joints where the skeleton put them and binds every vertex fully to
/// its nearest joint. Fails on meshes without any face area.
struct NearestJointSolver;

impl EmbeddingSolver for NearestJointSolver {
    fn solve(&self, mesh: &SolverMesh, skeleton: &SolverSkeleton) -> SolverOutput {
        if mesh.is_empty() || mesh.vertices.iter().all(|v| v.normal == Vector3::zeros()) {
            return SolverOutput::failed();
        }
        let embedding: Vec<Point3<f64>> = skeleton.joints().iter().map(|j| j.position).collect();
        let rows = mesh
            .vertices
            .iter()
            .map(|vertex| {
                let mut row = vec![0.0; embedding.len()];
                let nearest = embedding
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| {
                        let da = (a.coords - vertex.position.coords).norm();
                        let db = (b.coords - vertex.position.coords).norm();
                        da.total_cmp(&db)
                    })
                    .map(|(index, _)| index);
                if let Some(nearest) = nearest {
                    row[nearest] = 1.0;
                }
                row
            })
            .collect();
        SolverOutput {
            embedding,
            attachment: Some(Box::new(DenseAttachment::new(rows))),
            mesh_transform: MeshTransform::default(),
        }
    }
}

fn offset_at(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Translation3::new(x, y, z).inverse().to_homogeneous()
}

/// Two-triangle quad where vertices 4 and 5 repeat vertices 0 and 1.
fn quad_mesh() -> Mesh {
    Mesh {
        vertices: vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
        ],
        faces: vec![[0, 1, 2], [4, 2, 3]],
        ..Mesh::default()
    }
}

/// Hips at the origin, Spine one unit above.
fn two_bone_skeleton() -> Skeleton {
    let mut skeleton = Skeleton::new();
    let hips = skeleton.add_bone("Hips", offset_at(0.0, 0.0, 0.0), None).unwrap();
    skeleton.add_bone("Spine", offset_at(0.0, 1.0, 0.0), Some(hips)).unwrap();
    skeleton
}

fn tree_shape(skeleton: &Skeleton) -> Vec<(String, Option<usize>, Vec<usize>)> {
    skeleton
        .bones()
        .map(|(_, bone)| (bone.name.clone(), bone.parent, bone.children.clone()))
        .collect()
}

#[test]
fn given_duplicated_quad_when_rigging_then_mesh_is_deduplicated_and_skinned() {
    let mut mesh = quad_mesh();
    let mut skeleton = two_bone_skeleton();

    let report = rig_mesh(&NearestJointSolver, &mut mesh, &mut skeleton, &RigSettings::default()).unwrap();

    assert_eq!(report.vertices_before, 6);
    assert_eq!(report.vertices_after, 4);
    assert_eq!(report.vertices_merged, 2);
    assert_eq!(report.solver_faces, 2);
    assert_eq!(report.solver_joints, 3);
    assert!(report.normalization.scale > 0.0);
    assert_eq!(mesh.faces.len(), 2);
    assert!(mesh.faces.iter().flatten().all(|&v| v < 4));
}

#[test]
fn given_duplicated_quad_when_preparing_then_request_has_bones_and_end_joint() {
    let request = prepare_request(&quad_mesh(), &two_bone_skeleton(), &RigSettings::default()).unwrap();

    let names: Vec<&str> = request.skeleton.joints().iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, vec!["Hips", "Spine", "Spine_end"]);
    assert_eq!(request.mesh.vertices.len(), 4);
    assert!(request.normalization.scale > 0.0);
}

#[test]
fn given_rigged_mesh_when_inspecting_then_it_is_recentred_at_root_joint() {
    let mut mesh = quad_mesh();
    let mut skeleton = two_bone_skeleton();

    rig_mesh(&NearestJointSolver, &mut mesh, &mut skeleton, &RigSettings::default()).unwrap();

    // Root joint sits at (0, -0.8, 0) in canonical space.
    assert_relative_eq!(mesh.vertices[0], Vector3::new(0.0, 0.8, 0.0), epsilon = 1e-5);
    let hips = skeleton.bone(skeleton.find("Hips").unwrap()).unwrap();
    let spine = skeleton.bone(skeleton.find("Spine").unwrap()).unwrap();
    assert_relative_eq!(hips.bind_position(), Vector3::zeros(), epsilon = 1e-5);
    assert_relative_eq!(spine.bind_position(), Vector3::new(0.0, 1.6, 0.0), epsilon = 1e-5);
}

#[test]
fn given_rigging_when_finished_then_tree_shape_is_unchanged() {
    let mut mesh = quad_mesh();
    let mut skeleton = two_bone_skeleton();
    let before = tree_shape(&skeleton);

    rig_mesh(&NearestJointSolver, &mut mesh, &mut skeleton, &RigSettings::default()).unwrap();

    assert_eq!(tree_shape(&skeleton), before);
}

#[test]
fn given_rigging_when_finished_then_weights_are_positive_and_parallel() {
    let mut mesh = quad_mesh();
    let mut skeleton = two_bone_skeleton();

    let report = rig_mesh(&NearestJointSolver, &mut mesh, &mut skeleton, &RigSettings::default()).unwrap();

    for (_, bone) in skeleton.bones() {
        assert_eq!(bone.vertex_influences.len(), bone.vertex_weights.len());
        assert!(bone.vertex_weights.iter().all(|&w| w > 0.0));
        assert!(bone.vertex_influences.windows(2).all(|pair| pair[0] < pair[1]));
    }
    assert_eq!(report.influences_written, skeleton.influence_count());
    assert!(report.influences_written <= mesh.vertex_count());
}

#[test]
fn given_stale_influences_when_rigging_then_they_are_replaced() {
    let mut mesh = quad_mesh();
    let mut skeleton = two_bone_skeleton();
    {
        let spine = skeleton.bone_mut(1).unwrap();
        spine.vertex_influences = vec![5, 5, 5];
        spine.vertex_weights = vec![0.1, 0.2, 0.3];
    }

    let report = rig_mesh(&NearestJointSolver, &mut mesh, &mut skeleton, &RigSettings::default()).unwrap();
    assert_eq!(skeleton.influence_count(), report.influences_written);
}

#[test]
fn given_single_bone_skeleton_when_rigging_then_degenerate_skeleton_is_returned() {
    let mut mesh = quad_mesh();
    let mut skeleton = Skeleton::new();
    skeleton.add_bone("Root", offset_at(0.0, 1.0, 0.0), None).unwrap();

    let result = rig_mesh(&NearestJointSolver, &mut mesh, &mut skeleton, &RigSettings::default());
    assert!(matches!(result, Err(RigError::DegenerateSkeleton { .. })));
}

#[test]
fn given_zero_area_mesh_when_rigging_then_attachment_missing_is_returned() {
    let mut mesh = Mesh {
        vertices: vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
        ],
        faces: vec![[0, 1, 2], [2, 1, 0]],
        ..Mesh::default()
    };
    let mut skeleton = two_bone_skeleton();

    let result = rig_mesh(&NearestJointSolver, &mut mesh, &mut skeleton, &RigSettings::default());
    assert_eq!(result, Err(RigError::AttachmentMissing));
}

#[test]
fn given_coincident_triangle_when_rigging_then_attachment_missing_is_returned() {
    let mut mesh = Mesh {
        vertices: vec![Vector3::new(0.5, 0.5, 0.5); 3],
        faces: vec![[0, 1, 2]],
        ..Mesh::default()
    };
    let mut skeleton = two_bone_skeleton();

    let result = rig_mesh(&NearestJointSolver, &mut mesh, &mut skeleton, &RigSettings::default());
    assert_eq!(result, Err(RigError::AttachmentMissing));
    assert_eq!(mesh.vertex_count(), 1);
}

#[test]
fn given_empty_mesh_when_rigging_then_attachment_missing_is_returned() {
    let mut mesh = Mesh::default();
    let mut skeleton = two_bone_skeleton();
    let result = rig_mesh(&NearestJointSolver, &mut mesh, &mut skeleton, &RigSettings::default());
    assert_eq!(result, Err(RigError::AttachmentMissing));
}

#[test]
fn given_face_out_of_range_when_rigging_then_invalid_topology_is_returned() {
    let mut mesh = quad_mesh();
    mesh.faces.push([0, 1, 9]);
    let mut skeleton = two_bone_skeleton();
    let result = rig_mesh(&NearestJointSolver, &mut mesh, &mut skeleton, &RigSettings::default());
    assert!(matches!(result, Err(RigError::InvalidTopology { index: 9, .. })));
}

#[test]
fn given_misspelled_fat_bone_when_preparing_then_unknown_joint_is_returned() {
    let mut settings = RigSettings::default();
    settings.markers.fat_bones = vec!["Spien".to_string()];

    let result = prepare_request(&quad_mesh(), &two_bone_skeleton(), &settings);
    assert_eq!(
        result.map(|request| request.skeleton.len()),
        Err(RigError::UnknownJoint {
            name: "Spien".to_string()
        })
    );
}

#[test]
fn given_recorded_solution_with_shuffled_joints_when_rigging_then_weights_follow_names() {
    let request = prepare_request(&quad_mesh(), &two_bone_skeleton(), &RigSettings::default()).unwrap();
    let mut joints: Vec<_> = request.skeleton.joints().to_vec();
    joints.reverse();

    // Every vertex fully bound to Spine, recorded in reversed joint order.
    let spine_column = joints.iter().position(|j| j.name == "Spine").unwrap();
    let row: Vec<f64> = (0..joints.len())
        .map(|column| if column == spine_column { 1.0 } else { 0.0 })
        .collect();
    let solution = RecordedSolution {
        joint_names: joints.iter().map(|j| j.name.clone()).collect(),
        embedding: joints.iter().map(|j| j.position).collect(),
        mesh_transform: MeshTransform::default(),
        weights: Some(vec![row; request.mesh.vertices.len()]),
    };

    let mut mesh = quad_mesh();
    let mut skeleton = two_bone_skeleton();
    rig_mesh(&solution, &mut mesh, &mut skeleton, &RigSettings::default()).unwrap();

    let spine = skeleton.bone(skeleton.find("Spine").unwrap()).unwrap();
    let hips = skeleton.bone(skeleton.find("Hips").unwrap()).unwrap();
    assert_eq!(spine.vertex_influences, vec![0, 1, 2, 3]);
    assert!(hips.vertex_influences.is_empty());
}

#[test]
fn given_independent_projects_when_rigging_on_threads_then_both_complete() {
    let solver: Arc<dyn EmbeddingSolver> = Arc::new(NearestJointSolver);
    let project = RigProject {
        mesh: quad_mesh(),
        skeleton: two_bone_skeleton(),
        settings: RigSettings::default(),
    };

    let handles: Vec<_> = (0..2)
        .map(|_| spawn_rig(Arc::clone(&solver), project.clone()))
        .collect();

    for handle in handles {
        let (rigged, report) = handle.join().expect("worker thread panicked").unwrap();
        assert_eq!(rigged.mesh.vertex_count(), 4);
        assert_eq!(report.solver_joints, 3);
    }
}
