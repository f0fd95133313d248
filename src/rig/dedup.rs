use nalgebra::Vector3;

use crate::error::{RigError, RigResult};
use crate::model::{Mesh, Skeleton};
use crate::{log_debug, log_info};

/// Default merge threshold on squared distance: only numerically coincident
/// vertices collapse.
pub const DEFAULT_DEDUP_EPSILON: f32 = f32::MIN_POSITIVE;

// ─── Remap table ──────────────────────────────────────────────────────────────

/// Old-index to new-index mapping produced by vertex deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexRemap {
    /// For every original vertex, the lowest-index vertex it collapses onto
    /// (itself when it is kept).
    representative: Vec<usize>,
    /// For every original vertex, its position in the compacted array. Only
    /// meaningful for kept vertices.
    compacted: Vec<usize>,
    kept: usize,
}

impl VertexRemap {
    /// Scan all vertex pairs and build the remap table.
    ///
    /// Vertex `k` is redundant when some earlier non-redundant vertex `i`
    /// satisfies `|v_k - v_i|² < epsilon`; it maps to the first such `i`.
    pub fn build(vertices: &[Vector3<f32>], epsilon: f32) -> Self {
        let count = vertices.len();
        let mut representative: Vec<usize> = (0..count).collect();

        for i in 0..count {
            if representative[i] != i {
                continue;
            }
            let v1 = vertices[i];
            for k in (i + 1)..count {
                if representative[k] != k {
                    continue;
                }
                if (vertices[k] - v1).norm_squared() < epsilon {
                    representative[k] = i;
                }
            }
        }

        let mut compacted = vec![0usize; count];
        let mut kept = 0usize;
        for index in 0..count {
            compacted[index] = kept;
            if representative[index] == index {
                kept += 1;
            }
        }

        Self {
            representative,
            compacted,
            kept,
        }
    }

    pub fn original_count(&self) -> usize {
        self.representative.len()
    }

    pub fn kept_count(&self) -> usize {
        self.kept
    }

    pub fn merged_count(&self) -> usize {
        self.original_count() - self.kept
    }

    pub fn is_redundant(&self, index: usize) -> bool {
        self.representative.get(index).is_some_and(|&r| r != index)
    }

    /// New index of original vertex `index`: redundant vertices resolve
    /// through their representative first.
    pub fn resolve(&self, index: usize) -> Option<usize> {
        self.representative
            .get(index)
            .map(|&representative| self.compacted[representative])
    }

    fn resolve_checked(&self, index: usize, context: impl FnOnce() -> String) -> RigResult<usize> {
        self.resolve(index)
            .ok_or_else(|| RigError::invalid_topology(context(), index, self.original_count()))
    }

    /// Keep the entries of a per-vertex array that belong to kept vertices.
    /// Arrays shorter than the vertex array are compacted over their length.
    pub fn compact<T: Clone>(&self, values: &[T]) -> Vec<T> {
        values
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.is_redundant(*index))
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Rewrite every bone's influence indices. Weights keep their order and
    /// cardinality.
    pub fn apply_to_skeleton(&self, skeleton: &mut Skeleton) -> RigResult<()> {
        for bone in skeleton.bones_mut() {
            for slot in 0..bone.vertex_influences.len() {
                let old = bone.vertex_influences[slot];
                bone.vertex_influences[slot] =
                    self.resolve_checked(old, || format!("influence of bone '{}'", bone.name))?;
            }
        }
        Ok(())
    }
}

// ─── Deduplication ────────────────────────────────────────────────────────────

/// Merge near-duplicate vertices of `mesh` in place and rewrite bone
/// influences of `skeleton` to match.
///
/// Faces and influences are validated before anything is changed.
///
/// # Errors
///
/// `InvalidTopology` when a face or bone influence references a vertex
/// outside the mesh.
pub fn merge_redundant_vertices(
    mesh: &mut Mesh,
    skeleton: Option<&mut Skeleton>,
    epsilon: f32,
) -> RigResult<VertexRemap> {
    mesh.validate_faces()?;
    if let Some(skeleton) = skeleton.as_deref() {
        validate_influences(skeleton, mesh.vertex_count())?;
    }

    let remap = VertexRemap::build(&mesh.vertices, epsilon);
    log_info!(
        "Found {} redundant vertices out of {}",
        remap.merged_count(),
        remap.original_count()
    );

    if remap.merged_count() == 0 {
        return Ok(remap);
    }

    mesh.vertices = remap.compact(&mesh.vertices);
    mesh.normals = remap.compact(&mesh.normals);
    mesh.tangents = remap.compact(&mesh.tangents);

    for (face_index, face) in mesh.faces.iter_mut().enumerate() {
        for corner in face.iter_mut() {
            let resolved = remap.resolve_checked(*corner as usize, || format!("face {face_index}"))?;
            *corner = resolved as u32;
        }
    }

    if let Some(skeleton) = skeleton {
        remap.apply_to_skeleton(skeleton)?;
    }
    log_debug!(
        "Deduplicated mesh: {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.faces.len()
    );

    Ok(remap)
}

/// Pure form of [`merge_redundant_vertices`] for a mesh without bones.
pub fn dedup(mesh: &Mesh, epsilon: f32) -> RigResult<Mesh> {
    let mut out = mesh.clone();
    merge_redundant_vertices(&mut out, None, epsilon)?;
    Ok(out)
}

fn validate_influences(skeleton: &Skeleton, vertex_count: usize) -> RigResult<()> {
    for (_, bone) in skeleton.bones() {
        if let Some(&bad) = bone.vertex_influences.iter().find(|&&v| v >= vertex_count) {
            return Err(RigError::invalid_topology(
                format!("influence of bone '{}'", bone.name),
                bad,
                vertex_count,
            ));
        }
    }
    Ok(())
}
