use std::f64::consts::PI;

use nalgebra::{Isometry3, Matrix4, Point3, Translation3, Unit, UnitQuaternion, Vector3};

/// Canonical direction a bone points along in its local frame.
pub const BONE_AXIS: Vector3<f64> = Vector3::new(0.0, 1.0, 0.0);

/// Directions shorter than this are treated as zero length.
const MIN_DIRECTION_NORM: f64 = 1e-12;

/// Computes the shortest-arc rotation taking `source` onto `target`.
///
/// # Arguments
///
/// * `source` - Direction to rotate from (need not be normalized).
/// * `target` - Direction to rotate to (need not be normalized).
///
/// # Returns
///
/// Identity when either vector is zero length or they already agree; a 180°
/// turn about an axis perpendicular to `source` when they are opposite.
pub fn align_vectors(source: &Vector3<f64>, target: &Vector3<f64>) -> UnitQuaternion<f64> {
    if source.norm() < MIN_DIRECTION_NORM || target.norm() < MIN_DIRECTION_NORM {
        return UnitQuaternion::identity();
    }

    UnitQuaternion::rotation_between(source, target)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&perpendicular_axis(source), PI))
}

/// Unit axis perpendicular to `v`, built against the coordinate axis `v` is
/// least aligned with.
fn perpendicular_axis(v: &Vector3<f64>) -> Unit<Vector3<f64>> {
    let helper = if v.x.abs() <= v.y.abs() && v.x.abs() <= v.z.abs() {
        Vector3::x()
    } else if v.y.abs() <= v.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    Unit::new_normalize(v.cross(&helper))
}

/// Places a bone at `position` with its local axis rotated by `rotation`.
///
/// # Returns
///
/// The bone's world (bind) transform.
pub fn bone_world_transform(
    position: &Point3<f64>,
    rotation: UnitQuaternion<f64>,
) -> Isometry3<f64> {
    Isometry3::from_parts(Translation3::from(position.coords), rotation)
}

/// Builds an offset (inverse bind) matrix for a bone placed at `position` and
/// pointing along `direction`.
///
/// # Arguments
///
/// * `position` - Bone position in mesh space.
/// * `direction` - Direction the bone's local axis should point to.
///
/// # Returns
///
/// Matrix mapping mesh-space points into the bone's local space.
pub fn offset_matrix_for_bone(position: &Point3<f64>, direction: &Vector3<f64>) -> Matrix4<f32> {
    let rotation = align_vectors(&BONE_AXIS, direction);
    bone_world_transform(position, rotation)
        .inverse()
        .to_homogeneous()
        .cast::<f32>()
}
