use std::collections::HashMap;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::{AttachmentQuery, EmbeddingSolver, MeshTransform, SolverMesh, SolverOutput, SolverSkeleton};
use crate::log_warn;

/// Dense weight table, one row per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DenseAttachment {
    rows: Vec<Vec<f64>>,
}

impl DenseAttachment {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }
}

impl AttachmentQuery for DenseAttachment {
    fn weights(&self, vertex: usize) -> Vec<f64> {
        self.rows.get(vertex).cloned().unwrap_or_default()
    }
}

/// Solver response captured from an external process.
///
/// Columns are keyed by `joint_names`; an empty name list means the rows are
/// already in the order of the skeleton being solved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedSolution {
    #[serde(default)]
    pub joint_names: Vec<String>,
    pub embedding: Vec<Point3<f64>>,
    #[serde(default)]
    pub mesh_transform: MeshTransform,
    /// Weight rows per vertex; absent when the solver failed.
    #[serde(default)]
    pub weights: Option<Vec<Vec<f64>>>,
}

impl RecordedSolution {
    /// Recorded column for each joint of `skeleton`.
    fn columns_for(&self, skeleton: &SolverSkeleton) -> Vec<Option<usize>> {
        if self.joint_names.is_empty() {
            return (0..skeleton.len()).map(Some).collect();
        }
        let by_name: HashMap<&str, usize> = self
            .joint_names
            .iter()
            .enumerate()
            .map(|(column, name)| (name.as_str(), column))
            .collect();
        skeleton
            .joints()
            .iter()
            .map(|joint| by_name.get(joint.name.as_str()).copied())
            .collect()
    }
}

impl EmbeddingSolver for RecordedSolution {
    /// Replays the recording. A skeleton joint without a recorded column or
    /// position fails the whole solve.
    fn solve(&self, mesh: &SolverMesh, skeleton: &SolverSkeleton) -> SolverOutput {
        let columns = self.columns_for(skeleton);

        let mut embedding = Vec::with_capacity(columns.len());
        for (joint, column) in skeleton.joints().iter().zip(&columns) {
            match column.and_then(|c| self.embedding.get(c)) {
                Some(position) => embedding.push(*position),
                None => {
                    log_warn!("Recorded solution has no position for joint '{}'", joint.name);
                    return SolverOutput::failed();
                }
            }
        }

        let attachment = match &self.weights {
            Some(rows) if !mesh.is_empty() => {
                let reordered = rows
                    .iter()
                    .map(|row| {
                        columns
                            .iter()
                            .map(|column| column.and_then(|c| row.get(c)).copied().unwrap_or(0.0))
                            .collect()
                    })
                    .collect();
                Some(Box::new(DenseAttachment::new(reordered)) as Box<dyn AttachmentQuery>)
            }
            _ => None,
        };

        SolverOutput {
            embedding,
            attachment,
            mesh_transform: self.mesh_transform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::MeshVertex;

    fn two_joint_skeleton() -> SolverSkeleton {
        let mut skeleton = SolverSkeleton::new();
        skeleton.make_joint("root", Point3::origin(), None).unwrap();
        skeleton.make_joint("tip", Point3::new(0.0, 1.0, 0.0), Some("root")).unwrap();
        skeleton
    }

    fn one_vertex_mesh() -> SolverMesh {
        SolverMesh {
            vertices: vec![MeshVertex::new(Point3::origin())],
            edges: Vec::new(),
        }
    }

    #[test]
    fn given_shuffled_joint_names_when_solving_then_rows_follow_skeleton_order() {
        let solution = RecordedSolution {
            joint_names: vec!["tip".to_string(), "root".to_string()],
            embedding: vec![Point3::new(0.0, 2.0, 0.0), Point3::new(0.0, 0.5, 0.0)],
            mesh_transform: MeshTransform::default(),
            weights: Some(vec![vec![0.25, 0.75]]),
        };

        let output = solution.solve(&one_vertex_mesh(), &two_joint_skeleton());

        assert_eq!(output.embedding[0], Point3::new(0.0, 0.5, 0.0));
        assert_eq!(output.embedding[1], Point3::new(0.0, 2.0, 0.0));
        let attachment = output.attachment.expect("weights were recorded");
        assert_eq!(attachment.weights(0), vec![0.75, 0.25]);
        assert!(attachment.weights(9).is_empty());
    }

    #[test]
    fn given_missing_weights_when_solving_then_attachment_is_absent() {
        let solution = RecordedSolution {
            embedding: vec![Point3::origin(), Point3::origin()],
            ..RecordedSolution::default()
        };
        let output = solution.solve(&one_vertex_mesh(), &two_joint_skeleton());
        assert!(output.attachment.is_none());
    }

    #[test]
    fn given_empty_mesh_when_solving_then_attachment_is_absent() {
        let solution = RecordedSolution {
            embedding: vec![Point3::origin(), Point3::origin()],
            weights: Some(vec![vec![1.0, 0.0]]),
            ..RecordedSolution::default()
        };
        let output = solution.solve(&SolverMesh::default(), &two_joint_skeleton());
        assert!(output.attachment.is_none());
    }

    #[test]
    fn given_solution_missing_a_joint_when_solving_then_solve_fails() {
        let solution = RecordedSolution {
            joint_names: vec!["root".to_string()],
            embedding: vec![Point3::origin()],
            mesh_transform: MeshTransform::default(),
            weights: Some(vec![vec![1.0]]),
        };

        let output = solution.solve(&one_vertex_mesh(), &two_joint_skeleton());
        assert!(output.attachment.is_none());
        assert!(output.embedding.is_empty());
    }

    #[test]
    fn given_json_without_optional_fields_when_parsing_then_defaults_apply() {
        let json = r#"{ "embedding": [[0.0, 0.0, 0.0]] }"#;
        let solution: RecordedSolution = serde_json::from_str(json).unwrap();
        assert_eq!(solution.mesh_transform, MeshTransform::default());
        assert!(solution.weights.is_none());
    }
}
