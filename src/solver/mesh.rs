use std::collections::{HashMap, HashSet};

use nalgebra::{Point3, Vector3};
use serde::Serialize;

/// Half-edge of a [`SolverMesh`]. Face `f` owns edges `3f`, `3f + 1`, `3f + 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeshEdge {
    /// Origin vertex of the edge.
    pub vertex: usize,
    /// Previous edge of the same face.
    pub prev: usize,
    /// Opposite half-edge in the neighbouring face, if any.
    pub twin: Option<usize>,
}

impl MeshEdge {
    pub fn new(vertex: usize) -> Self {
        Self {
            vertex,
            prev: 0,
            twin: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshVertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
    /// One outgoing edge, `None` for vertices no face uses.
    pub edge: Option<usize>,
}

impl MeshVertex {
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: Vector3::zeros(),
            edge: None,
        }
    }
}

/// Flat triangle mesh in the layout the solver consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolverMesh {
    pub vertices: Vec<MeshVertex>,
    pub edges: Vec<MeshEdge>,
}

impl SolverMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn face_count(&self) -> usize {
        self.edges.len() / 3
    }

    pub fn face(&self, face: usize) -> [usize; 3] {
        let base = face * 3;
        [
            self.edges[base].vertex,
            self.edges[base + 1].vertex,
            self.edges[base + 2].vertex,
        ]
    }

    /// Drop faces that use the same vertex set as an earlier face, whatever
    /// their winding.
    pub fn remove_duplicate_faces(&mut self) {
        let mut seen = HashSet::with_capacity(self.face_count());
        let mut kept = Vec::with_capacity(self.edges.len());
        for face in 0..self.face_count() {
            let vertices = self.face(face);
            let mut key = vertices;
            key.sort_unstable();
            if seen.insert(key) {
                kept.extend(vertices.into_iter().map(MeshEdge::new));
            }
        }
        self.edges = kept;
    }

    /// Rebuild `prev`, `twin` and the per-vertex outgoing edge.
    pub fn compute_topology(&mut self) {
        for vertex in &mut self.vertices {
            vertex.edge = None;
        }

        let mut by_endpoints: HashMap<(usize, usize), usize> =
            HashMap::with_capacity(self.edges.len());
        for edge in 0..self.edges.len() {
            let base = edge - edge % 3;
            let next = base + (edge + 1) % 3;
            self.edges[edge].prev = base + (edge + 2) % 3;
            let from = self.edges[edge].vertex;
            let to = self.edges[next].vertex;
            by_endpoints.insert((from, to), edge);
            if let Some(vertex) = self.vertices.get_mut(from) {
                vertex.edge.get_or_insert(edge);
            }
        }

        for edge in 0..self.edges.len() {
            let base = edge - edge % 3;
            let next = base + (edge + 1) % 3;
            let from = self.edges[edge].vertex;
            let to = self.edges[next].vertex;
            self.edges[edge].twin = by_endpoints.get(&(to, from)).copied();
        }
    }

    /// Area-weighted vertex normals. Vertices touching only zero-area faces
    /// keep a zero normal.
    pub fn compute_vertex_normals(&mut self) {
        let mut sums = vec![Vector3::<f64>::zeros(); self.vertices.len()];
        for face in 0..self.face_count() {
            let [a, b, c] = self.face(face);
            let (Some(pa), Some(pb), Some(pc)) = (
                self.vertices.get(a),
                self.vertices.get(b),
                self.vertices.get(c),
            ) else {
                continue;
            };
            let normal = (pb.position - pa.position).cross(&(pc.position - pa.position));
            for index in [a, b, c] {
                sums[index] += normal;
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            vertex.normal = sum.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> SolverMesh {
        let vertices = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
        .into_iter()
        .map(MeshVertex::new)
        .collect();
        let edges = [0, 1, 2, 0, 2, 3].into_iter().map(MeshEdge::new).collect();
        SolverMesh { vertices, edges }
    }

    #[test]
    fn given_quad_when_computing_topology_then_shared_diagonal_is_twinned() {
        let mut mesh = quad();
        mesh.compute_topology();

        // Edge 1 runs 1 -> 2 (no neighbour); edge 2 runs 2 -> 0, edge 3 runs 0 -> 2.
        assert_eq!(mesh.edges[2].twin, Some(3));
        assert_eq!(mesh.edges[3].twin, Some(2));
        assert_eq!(mesh.edges[1].twin, None);
        assert_eq!(mesh.edges[0].prev, 2);
        assert_eq!(mesh.edges[4].prev, 3);
        assert_eq!(mesh.vertices[0].edge, Some(0));
    }

    #[test]
    fn given_reversed_duplicate_face_when_removing_duplicates_then_one_copy_remains() {
        let mut mesh = quad();
        mesh.edges.extend([2, 1, 0].into_iter().map(MeshEdge::new));
        mesh.remove_duplicate_faces();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.face(0), [0, 1, 2]);
    }

    #[test]
    fn given_flat_quad_when_computing_normals_then_all_point_along_z() {
        let mut mesh = quad();
        mesh.compute_vertex_normals();
        for vertex in &mesh.vertices {
            assert_relative_eq!(vertex.normal, Vector3::z(), epsilon = 1e-12);
        }
    }

    #[test]
    fn given_topology_when_recomputed_then_result_is_unchanged() {
        let mut mesh = quad();
        mesh.compute_topology();
        let first = mesh.clone();
        mesh.compute_topology();
        assert_eq!(mesh, first);
    }
}
