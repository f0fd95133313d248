use crate::error::{RigError, RigResult};
use crate::model::{BoneId, Skeleton};
use crate::project::MarkerSettings;
use crate::{log_debug, log_warn};

/// Two bones the solver should embed as mirror images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonePair {
    pub first: BoneId,
    pub second: BoneId,
}

/// Per-request solver hints attached to source bones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkeletonMarkers {
    pub symmetry: Vec<BonePair>,
    /// Bones around thick body parts.
    pub fat: Vec<BoneId>,
    /// Ground-contact bones. The marker lands on the bone's end joint.
    pub foot: Vec<BoneId>,
}

impl SkeletonMarkers {
    /// Resolve markers from naming conventions. Default foot and fat names
    /// that do not exist in `skeleton` are skipped.
    ///
    /// # Errors
    ///
    /// `UnknownJoint` for a configured name with no bone that is not one of
    /// the defaults.
    pub fn from_settings(skeleton: &Skeleton, settings: &MarkerSettings) -> RigResult<Self> {
        let symmetry =
            detect_symmetry_pairs(skeleton, &settings.left_token, &settings.right_token);
        let defaults = MarkerSettings::default();
        let lookup = |names: &[String], fallback: &[String], kind: &str| -> RigResult<Vec<BoneId>> {
            let mut found = Vec::with_capacity(names.len());
            for name in names {
                match skeleton.find(name) {
                    Some(id) => found.push(id),
                    None if fallback.contains(name) => {
                        log_warn!("{kind} bone '{name}' not found in skeleton; marker skipped");
                    }
                    None => return Err(RigError::UnknownJoint { name: name.clone() }),
                }
            }
            Ok(found)
        };
        let markers = Self {
            symmetry,
            fat: lookup(&settings.fat_bones, &defaults.fat_bones, "Fat")?,
            foot: lookup(&settings.foot_bones, &defaults.foot_bones, "Foot")?,
        };
        log_debug!(
            "Markers: {} symmetry pairs, {} fat, {} foot",
            markers.symmetry.len(),
            markers.fat.len(),
            markers.foot.len()
        );
        Ok(markers)
    }

    /// Resolve explicitly named markers.
    ///
    /// # Errors
    ///
    /// `UnknownJoint` for the first name with no bone.
    pub fn from_names(
        skeleton: &Skeleton,
        symmetry: &[(&str, &str)],
        fat: &[&str],
        foot: &[&str],
    ) -> RigResult<Self> {
        let require = |name: &str| {
            skeleton.find(name).ok_or_else(|| RigError::UnknownJoint {
                name: name.to_string(),
            })
        };
        let symmetry = symmetry
            .iter()
            .map(|&(first, second)| {
                Ok(BonePair {
                    first: require(first)?,
                    second: require(second)?,
                })
            })
            .collect::<RigResult<Vec<_>>>()?;
        let fat = fat.iter().map(|&name| require(name)).collect::<RigResult<Vec<_>>>()?;
        let foot = foot.iter().map(|&name| require(name)).collect::<RigResult<Vec<_>>>()?;
        Ok(Self {
            symmetry,
            fat,
            foot,
        })
    }
}

/// Pair every bone whose name contains `left_token` with the bone named the
/// same after its first `left_token` is replaced by `right_token`.
pub fn detect_symmetry_pairs(
    skeleton: &Skeleton,
    left_token: &str,
    right_token: &str,
) -> Vec<BonePair> {
    if left_token.is_empty() {
        return Vec::new();
    }
    skeleton
        .bones()
        .filter(|(_, bone)| bone.name.contains(left_token))
        .filter_map(|(first, bone)| {
            let mirrored = bone.name.replacen(left_token, right_token, 1);
            skeleton
                .find(&mirrored)
                .filter(|&second| second != first)
                .map(|second| BonePair { first, second })
        })
        .collect()
}
