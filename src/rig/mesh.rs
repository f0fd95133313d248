use nalgebra::Point3;

use crate::error::RigResult;
use crate::log_debug;
use crate::model::Mesh;
use crate::solver::{MeshEdge, MeshVertex, SolverMesh};

/// Flatten `mesh` into the solver's half-edge layout.
///
/// Positions are copied verbatim. A mesh without vertices yields an empty
/// [`SolverMesh`]; callers check for that before solving.
///
/// # Errors
///
/// `InvalidTopology` when a face references a vertex outside the mesh.
pub fn to_solver_mesh(mesh: &Mesh) -> RigResult<SolverMesh> {
    if mesh.vertices.is_empty() {
        return Ok(SolverMesh::default());
    }
    mesh.validate_faces()?;

    let vertices = mesh
        .vertices
        .iter()
        .map(|v| MeshVertex::new(Point3::from(v.cast::<f64>())))
        .collect();
    let edges = mesh
        .faces
        .iter()
        .flat_map(|face| face.iter().map(|&v| MeshEdge::new(v as usize)))
        .collect();

    let mut solver_mesh = SolverMesh { vertices, edges };
    solver_mesh.remove_duplicate_faces();
    solver_mesh.compute_topology();
    solver_mesh.compute_vertex_normals();

    log_debug!(
        "Solver mesh: {} vertices, {} faces ({} duplicate faces dropped)",
        solver_mesh.vertices.len(),
        solver_mesh.face_count(),
        mesh.faces.len() - solver_mesh.face_count()
    );
    Ok(solver_mesh)
}
