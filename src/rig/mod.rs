//! Rigging stages, leaf first: vertex deduplication, mesh conversion, skeleton
//! normalization, embedding reconstruction and weight transfer.

mod dedup;
mod embedding;
mod markers;
mod mesh;
mod skeleton;
mod weights;

// Re-export the stage entry points and their data types.
pub use dedup::{DEFAULT_DEDUP_EPSILON, VertexRemap, dedup, merge_redundant_vertices};
pub use embedding::reconstruct;
pub use markers::{BonePair, SkeletonMarkers, detect_symmetry_pairs};
pub use mesh::to_solver_mesh;
pub use skeleton::{
    END_JOINT_SUFFIX, NormalizationInfo, NormalizedSkeleton, end_joint_name, normalization_for,
    normalize, rotated_bind_positions,
};
pub use weights::{WeightColumns, transfer};
