//! Contract of the external embedding solver.
//!
//! The solver builds a distance field over the mesh volume, packs spheres on
//! its medial surface, searches a discrete embedding of the skeleton graph and
//! refines it. None of that lives here: this module only defines the data the
//! pipeline hands over ([`SolverMesh`], [`SolverSkeleton`]) and what it gets
//! back ([`SolverOutput`]).

mod mesh;
mod recorded;
mod skeleton;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

pub use mesh::{MeshEdge, MeshVertex, SolverMesh};
pub use recorded::{DenseAttachment, RecordedSolution};
pub use skeleton::{CompressedGraph, SolverJoint, SolverSkeleton};

/// Per-vertex skinning weights computed by the solver.
pub trait AttachmentQuery: Send + Sync {
    /// Weight vector of `vertex`, indexed by solver joint index. Vertices the
    /// attachment knows nothing about yield an empty vector.
    fn weights(&self, vertex: usize) -> Vec<f64>;
}

/// Normalization the solver applied to the mesh before embedding:
/// `solver_point = mesh_point * scale + translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshTransform {
    pub scale: f64,
    pub translation: Vector3<f64>,
}

impl Default for MeshTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translation: Vector3::zeros(),
        }
    }
}

impl MeshTransform {
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(point.coords * self.scale + self.translation)
    }
}

/// Result of one solver call.
pub struct SolverOutput {
    /// One embedded point per solver joint, in solver space.
    pub embedding: Vec<Point3<f64>>,
    /// Skinning weights; `None` when no valid embedding was found.
    pub attachment: Option<Box<dyn AttachmentQuery>>,
    pub mesh_transform: MeshTransform,
}

impl SolverOutput {
    /// Output of a solver that found nothing.
    pub fn failed() -> Self {
        Self {
            embedding: Vec::new(),
            attachment: None,
            mesh_transform: MeshTransform::default(),
        }
    }
}

/// A skeleton embedding solver.
///
/// Treated as a stateless function of its inputs; any internal randomness is
/// the implementation's own business. Calls may block for a long time.
pub trait EmbeddingSolver: Send + Sync {
    fn solve(&self, mesh: &SolverMesh, skeleton: &SolverSkeleton) -> SolverOutput;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn given_mesh_transform_when_applied_then_scale_precedes_translation() {
        let transform = MeshTransform {
            scale: 2.0,
            translation: Vector3::new(0.5, 0.0, -1.0),
        };
        let mapped = transform.apply(&Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(mapped, Point3::new(2.5, 2.0, 1.0));
    }

    #[test]
    fn given_failed_output_when_inspected_then_attachment_is_absent() {
        let output = SolverOutput::failed();
        assert!(output.attachment.is_none());
        assert!(output.embedding.is_empty());
    }
}
