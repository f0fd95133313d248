use std::collections::HashMap;

use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{RigError, RigResult};

// ─── Skeleton ─────────────────────────────────────────────────────────────────

/// Index of a bone inside its [`Skeleton`] arena.
pub type BoneId = usize;

/// A single bone of a skeleton tree.
///
/// `parent` and `children` are arena indices; the skeleton owns every bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    /// Unique name; the join key with the solver's named joints.
    pub name: String,
    /// Inverse bind transform (mesh space to bone-local space).
    pub offset_matrix: Matrix4<f32>,
    pub parent: Option<BoneId>,
    pub children: Vec<BoneId>,
    /// Influenced vertex indices, parallel to `vertex_weights`.
    pub vertex_influences: Vec<usize>,
    pub vertex_weights: Vec<f32>,
}

impl Bone {
    /// Bind-pose position of the bone, read from the translation column of the
    /// inverse offset matrix. A singular offset matrix yields the origin.
    pub fn bind_position(&self) -> Vector3<f32> {
        self.offset_matrix
            .try_inverse()
            .map(|bind| Vector3::new(bind[(0, 3)], bind[(1, 3)], bind[(2, 3)]))
            .unwrap_or_else(Vector3::zeros)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Bone tree stored as an index arena.
///
/// Invariants: exactly one bone without a parent (the root), every other bone
/// reachable from it through `children`, bone names unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bone>", into = "Vec<Bone>")]
pub struct Skeleton {
    bones: Vec<Bone>,
    names: HashMap<String, BoneId>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bone and link it under `parent`.
    ///
    /// # Errors
    ///
    /// `DuplicateJoint` when the name is taken, `UnknownBone` when `parent` is
    /// not in the arena, `NullInput` when a second root is added.
    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        offset_matrix: Matrix4<f32>,
        parent: Option<BoneId>,
    ) -> RigResult<BoneId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(RigError::DuplicateJoint { name });
        }
        match parent {
            Some(parent_id) if parent_id >= self.bones.len() => {
                return Err(RigError::UnknownBone { id: parent_id });
            }
            None if !self.bones.is_empty() => {
                return Err(RigError::NullInput {
                    what: "parent for non-root bone",
                });
            }
            _ => {}
        }

        let id = self.bones.len();
        self.bones.push(Bone {
            name: name.clone(),
            offset_matrix,
            parent,
            children: Vec::new(),
            vertex_influences: Vec::new(),
            vertex_weights: Vec::new(),
        });
        self.names.insert(name, id);
        if let Some(parent_id) = parent {
            self.bones[parent_id].children.push(id);
        }
        Ok(id)
    }

    /// Id of the root bone.
    pub fn root(&self) -> RigResult<BoneId> {
        self.bones
            .iter()
            .position(|bone| bone.parent.is_none())
            .ok_or(RigError::NullInput { what: "root bone" })
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id)
    }

    pub fn bone_mut(&mut self, id: BoneId) -> Option<&mut Bone> {
        self.bones.get_mut(id)
    }

    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.names.get(name).copied()
    }

    pub fn bones(&self) -> impl Iterator<Item = (BoneId, &Bone)> {
        self.bones.iter().enumerate()
    }

    pub fn bones_mut(&mut self) -> impl Iterator<Item = &mut Bone> {
        self.bones.iter_mut()
    }

    /// Bone ids in pre-order (parent before children, children in order).
    pub fn pre_order(&self) -> RigResult<Vec<BoneId>> {
        let root = self.root()?;
        let mut order = Vec::with_capacity(self.bones.len());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.bones[id].children.iter().rev().copied());
        }
        Ok(order)
    }

    /// Drop every bone's vertex influences and weights.
    pub fn clear_influences(&mut self) {
        for bone in &mut self.bones {
            bone.vertex_influences.clear();
            bone.vertex_weights.clear();
        }
    }

    /// Total number of (vertex, weight) entries across all bones.
    pub fn influence_count(&self) -> usize {
        self.bones.iter().map(|bone| bone.vertex_influences.len()).sum()
    }
}

impl TryFrom<Vec<Bone>> for Skeleton {
    type Error = RigError;

    fn try_from(bones: Vec<Bone>) -> RigResult<Self> {
        let mut names = HashMap::with_capacity(bones.len());
        let mut roots = 0usize;
        for (id, bone) in bones.iter().enumerate() {
            if names.insert(bone.name.clone(), id).is_some() {
                return Err(RigError::DuplicateJoint {
                    name: bone.name.clone(),
                });
            }
            match bone.parent {
                None => roots += 1,
                Some(parent) => {
                    let linked = bones
                        .get(parent)
                        .is_some_and(|p| p.children.contains(&id));
                    if !linked {
                        return Err(RigError::UnknownBone { id: parent });
                    }
                }
            }
            if let Some(&child) = bone
                .children
                .iter()
                .find(|&&c| bones.get(c).is_none_or(|child| child.parent != Some(id)))
            {
                return Err(RigError::UnknownBone { id: child });
            }
            if bone.vertex_influences.len() != bone.vertex_weights.len() {
                return Err(RigError::invalid_topology(
                    format!("bone '{}' weights", bone.name),
                    bone.vertex_weights.len(),
                    bone.vertex_influences.len(),
                ));
            }
        }
        if !bones.is_empty() && roots != 1 {
            return Err(RigError::NullInput {
                what: "single root bone",
            });
        }
        let skeleton = Skeleton { bones, names };
        skeleton.check_reachable()?;
        Ok(skeleton)
    }
}

impl Skeleton {
    /// Every bone must be visited exactly once walking down from the root.
    fn check_reachable(&self) -> RigResult<()> {
        if self.bones.is_empty() {
            return Ok(());
        }
        let mut visited = vec![false; self.bones.len()];
        let mut stack = vec![self.root()?];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id], true) {
                return Err(RigError::UnknownBone { id });
            }
            stack.extend(self.bones[id].children.iter().copied());
        }
        match visited.iter().position(|&seen| !seen) {
            Some(id) => Err(RigError::UnknownBone { id }),
            None => Ok(()),
        }
    }
}

impl From<Skeleton> for Vec<Bone> {
    fn from(skeleton: Skeleton) -> Self {
        skeleton.bones
    }
}

// ─── Mesh ─────────────────────────────────────────────────────────────────────

/// Triangle mesh. Vertex index is the vertex ID used by faces and bone
/// influences. `normals` / `tangents` are either empty or parallel to
/// `vertices`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vector3<f32>>,
    pub faces: Vec<[u32; 3]>,
    #[serde(default)]
    pub normals: Vec<Vector3<f32>>,
    #[serde(default)]
    pub tangents: Vec<Vector3<f32>>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Check that every face index is inside the vertex array.
    pub fn validate_faces(&self) -> RigResult<()> {
        let vertex_count = self.vertices.len();
        for (face_index, face) in self.faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(RigError::invalid_topology(
                    format!("face {face_index}"),
                    bad as usize,
                    vertex_count,
                ));
            }
        }
        Ok(())
    }
}
