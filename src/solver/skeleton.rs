use std::collections::HashMap;

use nalgebra::Point3;
use serde::Serialize;

use crate::error::{RigError, RigResult};

/// Named joint of the solver's skeleton graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverJoint {
    pub name: String,
    /// Position in canonical solver space.
    pub position: Point3<f64>,
    pub parent: Option<usize>,
    pub fat: bool,
    pub foot: bool,
    /// Joint this one mirrors, if declared symmetric.
    pub mirror: Option<usize>,
}

/// Skeleton graph with pass-through joints removed.
///
/// A joint survives compression when it is the root, a leaf, or a branch
/// point; joints with exactly one child are folded into the segment running
/// through them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompressedGraph {
    /// Compressed index to full joint index.
    pub joints: Vec<usize>,
    /// Parent of each compressed joint, in compressed indices.
    pub parents: Vec<Option<usize>>,
    /// Full joint index to the compressed joint ending its segment.
    pub full_to_compressed: Vec<usize>,
    pub fat: Vec<bool>,
    pub feet: Vec<bool>,
    /// Symmetric pairs in compressed indices, lower index first.
    pub symmetry: Vec<(usize, usize)>,
}

/// Joint graph handed to the solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolverSkeleton {
    joints: Vec<SolverJoint>,
    #[serde(skip)]
    names: HashMap<String, usize>,
    compressed: Option<CompressedGraph>,
}

impl SolverSkeleton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joints(&self) -> &[SolverJoint] {
        &self.joints
    }

    pub fn joint(&self, index: usize) -> Option<&SolverJoint> {
        self.joints.get(index)
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    fn require(&self, name: &str) -> RigResult<usize> {
        self.joint_index(name).ok_or_else(|| RigError::UnknownJoint {
            name: name.to_string(),
        })
    }

    /// Compressed graph, available once [`finalize`](Self::finalize) ran and
    /// no joint was changed afterwards.
    pub fn compressed(&self) -> Option<&CompressedGraph> {
        self.compressed.as_ref()
    }

    /// Add a joint linked to the joint named `parent`.
    pub fn make_joint(
        &mut self,
        name: &str,
        position: Point3<f64>,
        parent: Option<&str>,
    ) -> RigResult<usize> {
        if self.names.contains_key(name) {
            return Err(RigError::DuplicateJoint {
                name: name.to_string(),
            });
        }
        let parent = parent.map(|parent| self.require(parent)).transpose()?;

        let index = self.joints.len();
        self.joints.push(SolverJoint {
            name: name.to_string(),
            position,
            parent,
            fat: false,
            foot: false,
            mirror: None,
        });
        self.names.insert(name.to_string(), index);
        self.compressed = None;
        Ok(index)
    }

    pub fn make_symmetric(&mut self, first: &str, second: &str) -> RigResult<()> {
        let a = self.require(first)?;
        let b = self.require(second)?;
        self.joints[a].mirror = Some(b);
        self.joints[b].mirror = Some(a);
        self.compressed = None;
        Ok(())
    }

    pub fn set_fat(&mut self, name: &str) -> RigResult<()> {
        let index = self.require(name)?;
        self.joints[index].fat = true;
        self.compressed = None;
        Ok(())
    }

    pub fn set_foot(&mut self, name: &str) -> RigResult<()> {
        let index = self.require(name)?;
        self.joints[index].foot = true;
        self.compressed = None;
        Ok(())
    }

    /// Build the compressed graph. Running it again on an unchanged skeleton
    /// produces the same graph.
    pub fn finalize(&mut self) {
        let count = self.joints.len();
        let mut child_count = vec![0usize; count];
        let mut only_child = vec![None; count];
        for (index, joint) in self.joints.iter().enumerate() {
            if let Some(parent) = joint.parent {
                child_count[parent] += 1;
                only_child[parent] = Some(index);
            }
        }
        let kept: Vec<bool> = (0..count)
            .map(|i| self.joints[i].parent.is_none() || child_count[i] != 1)
            .collect();

        let mut full_to_kept = vec![None; count];
        let mut graph = CompressedGraph::default();
        for index in (0..count).filter(|&i| kept[i]) {
            full_to_kept[index] = Some(graph.joints.len());
            graph.joints.push(index);
        }

        // A folded joint belongs to the segment ending at its nearest kept
        // descendant.
        graph.full_to_compressed = (0..count)
            .map(|start| {
                let mut cursor = start;
                loop {
                    if let Some(compressed) = full_to_kept[cursor] {
                        break compressed;
                    }
                    match only_child[cursor] {
                        Some(child) => cursor = child,
                        None => break 0,
                    }
                }
            })
            .collect();

        graph.parents = graph
            .joints
            .iter()
            .map(|&full| {
                let mut cursor = self.joints[full].parent;
                while let Some(parent) = cursor {
                    if let Some(compressed) = full_to_kept[parent] {
                        return Some(compressed);
                    }
                    cursor = self.joints[parent].parent;
                }
                None
            })
            .collect();

        graph.fat = vec![false; graph.joints.len()];
        graph.feet = vec![false; graph.joints.len()];
        for (index, joint) in self.joints.iter().enumerate() {
            let compressed = graph.full_to_compressed[index];
            graph.fat[compressed] |= joint.fat;
            graph.feet[compressed] |= joint.foot;
            if let Some(mirror) = joint.mirror {
                let other = graph.full_to_compressed[mirror];
                let pair = (compressed.min(other), compressed.max(other));
                if pair.0 != pair.1 && !graph.symmetry.contains(&pair) {
                    graph.symmetry.push(pair);
                }
            }
        }

        self.compressed = Some(graph);
    }
}
