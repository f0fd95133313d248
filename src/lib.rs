//! Automatic skeleton embedding and skinning weight transfer.
//!
//! Takes a reference skeleton and a static mesh, embeds the skeleton into the
//! mesh through an external solver, and writes back offset matrices and
//! per-bone vertex weights.

pub mod animation;
pub mod correction;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod project;
pub mod rig;
pub mod solver;

pub use error::{RigError, RigResult};
pub use logging::{LogLevel, ResultExt, send_log};
pub use model::{Bone, BoneId, Mesh, Skeleton};
pub use pipeline::{RigReport, SolverRequest, prepare_request, rig_mesh, spawn_rig};
pub use project::{RigProject, RigSettings};
