use std::{fs, path::Path};

use anyhow::{Context, Result};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::model::{Mesh, Skeleton};
use crate::rig::DEFAULT_DEDUP_EPSILON;
use crate::solver::RecordedSolution;

/// Edge of the canonical cube the skeleton's largest extent is scaled to.
pub const DEFAULT_CANONICAL_BOUND: f64 = 1.6;

/// Up axis of the source asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpAxis {
    #[default]
    Y,
    Z,
}

impl UpAxis {
    /// Change of basis into the solver's Y-up frame. `Z` is a -90° turn about
    /// +X, taking +Z onto +Y.
    pub fn basis_rotation(&self) -> Matrix3<f64> {
        match self {
            UpAxis::Y => Matrix3::identity(),
            UpAxis::Z => Matrix3::new(
                1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, //
                0.0, -1.0, 0.0,
            ),
        }
    }
}

/// Which neighbour sets the axis of a non-root bone with several children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchDirection {
    /// Continue the segment coming from the parent.
    #[default]
    TowardParent,
    /// Point at the first child, as the root does.
    TowardFirstChild,
}

/// Coordinate space of the rigged mesh and offset matrices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSpace {
    /// Solver units, recentred at the root joint.
    #[default]
    Canonical,
    /// Recentred at the root joint, scaled back to source skeleton units.
    Source,
}

/// Bone name conventions used to derive solver markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSettings {
    pub left_token: String,
    pub right_token: String,
    pub foot_bones: Vec<String>,
    pub fat_bones: Vec<String>,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            left_token: "Left".to_string(),
            right_token: "Right".to_string(),
            foot_bones: vec!["LeftToe".to_string(), "RightToe".to_string()],
            fat_bones: Vec::new(),
        }
    }
}

/// Tunables of one rigging request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigSettings {
    /// Squared-distance threshold below which vertices are merged.
    pub dedup_epsilon: f32,
    pub canonical_bound: f64,
    pub up_axis: UpAxis,
    pub branch_direction: BranchDirection,
    pub output_space: OutputSpace,
    pub markers: MarkerSettings,
}

impl Default for RigSettings {
    fn default() -> Self {
        Self {
            dedup_epsilon: DEFAULT_DEDUP_EPSILON,
            canonical_bound: DEFAULT_CANONICAL_BOUND,
            up_axis: UpAxis::default(),
            branch_direction: BranchDirection::default(),
            output_space: OutputSpace::default(),
            markers: MarkerSettings::default(),
        }
    }
}

/// A mesh and the skeleton to embed into it, with the settings to use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigProject {
    pub mesh: Mesh,
    pub skeleton: Skeleton,
    #[serde(default)]
    pub settings: RigSettings,
}

/// Save a rig project to a JSON file.
pub fn save_rig_project(path: &Path, project: &RigProject) -> Result<()> {
    let content =
        serde_json::to_string_pretty(project).context("failed to serialize rig project as JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to save rig project: {}", path.display()))?;
    Ok(())
}

/// Load a rig project from a JSON file.
pub fn load_rig_project(path: &Path) -> Result<RigProject> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to load rig project: {}", path.display()))?;
    let project: RigProject =
        serde_json::from_str(&content).context("failed to parse rig project JSON")?;
    Ok(project)
}

/// Save rig settings to a JSON file.
pub fn save_rig_settings(path: &Path, settings: &RigSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)
        .context("failed to serialize rig settings as JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to save rig settings: {}", path.display()))?;
    Ok(())
}

/// Load rig settings from a JSON file. Missing fields take their defaults.
pub fn load_rig_settings(path: &Path) -> Result<RigSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to load rig settings: {}", path.display()))?;
    let settings: RigSettings =
        serde_json::from_str(&content).context("failed to parse rig settings JSON")?;
    Ok(settings)
}

/// Load a solver response recorded by an external process.
pub fn load_recorded_solution(path: &Path) -> Result<RecordedSolution> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to load solver solution: {}", path.display()))?;
    let solution: RecordedSolution =
        serde_json::from_str(&content).context("failed to parse solver solution JSON")?;
    Ok(solution)
}

/// Write any serializable value as pretty JSON.
pub fn save_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {what} as JSON"))?;
    fs::write(path, content)
        .with_context(|| format!("failed to save {what}: {}", path.display()))?;
    Ok(())
}
