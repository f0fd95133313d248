use thiserror::Error;

/// Result type for rigging operations.
pub type RigResult<T> = Result<T, RigError>;

/// Error values returned by the rigging stages.
///
/// None of these are recovered inside the pipeline; the request aborts and the
/// caller's mesh and skeleton are left in an unspecified state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    /// A face or bone influence points outside the vertex array.
    #[error("invalid topology: {context} references vertex {index} (mesh has {vertex_count} vertices)")]
    InvalidTopology {
        /// Where the bad index was found.
        context: String,
        /// The offending vertex index.
        index: usize,
        /// Vertex count of the mesh at the time of the check.
        vertex_count: usize,
    },

    /// The skeleton's bounding box has no extent to normalize against.
    #[error("degenerate skeleton: bounding box extent is {extent}")]
    DegenerateSkeleton {
        /// Largest bounding box edge that was found.
        extent: f64,
    },

    /// A bone has neither a parent nor children, so no bone axis exists.
    #[error("bone '{name}' is isolated (no parent, no children)")]
    IsolatedBone {
        /// Name of the isolated bone.
        name: String,
    },

    /// The solver did not produce skinning weights.
    #[error("solver returned no attachment; no valid embedding was found for this mesh")]
    AttachmentMissing,

    /// A required input is absent.
    #[error("required input is missing: {what}")]
    NullInput {
        /// Which input was missing.
        what: &'static str,
    },

    /// A bone or marker name has no matching joint.
    #[error("no joint named '{name}'")]
    UnknownJoint {
        /// The name that failed to resolve.
        name: String,
    },

    /// A name appears twice where names must be unique.
    #[error("duplicate joint name '{name}'")]
    DuplicateJoint {
        /// The repeated name.
        name: String,
    },

    /// A bone id does not exist in the skeleton arena.
    #[error("bone id {id} is out of range")]
    UnknownBone {
        /// The bad id.
        id: usize,
    },

    /// The embedding does not hold one point per solver joint.
    #[error("embedding has {actual} points but the solver skeleton has {expected} joints")]
    EmbeddingMismatch {
        /// Joint count of the solver skeleton.
        expected: usize,
        /// Number of embedded points received.
        actual: usize,
    },
}

impl RigError {
    pub(crate) fn invalid_topology(context: impl Into<String>, index: usize, vertex_count: usize) -> Self {
        RigError::InvalidTopology {
            context: context.into(),
            index,
            vertex_count,
        }
    }
}
