//! Rotation and transform utilities used by the solver.
//!
//! Bone transforms are homogeneous 4x4 matrices (`Matrix4<f64>`). Positions
//! are read with a homogeneous divide, orientations are extracted from the
//! upper-left 3x3 block, and orientation residuals are expressed as
//! roll/pitch/yaw increments (nalgebra's `euler_angles` convention, radians).
//!
//! # Examples
//!
//! ```rust,ignore
//! use jacobian_ik::TargetPose;
//! use nalgebra::{Isometry3, Translation3, UnitQuaternion};
//!
//! let iso = Isometry3::from_parts(
//!     Translation3::new(0.1, 0.2, 0.3),
//!     UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5),
//! );
//! let target: TargetPose = iso.into();
//! ```

use nalgebra::{Isometry3, Matrix4, Translation3, UnitQuaternion, Vector3, Vector4};

use crate::pose_error::TargetPose;

/// World position of a transform's origin.
///
/// The homogeneous coordinate is divided out; a degenerate `w` is the
/// caller's responsibility.
pub fn position_of(combined: &Matrix4<f64>) -> Vector3<f64> {
    let origin = combined * Vector4::new(0.0, 0.0, 0.0, 1.0);
    origin.xyz() / origin.w
}

/// Direction of a local axis in world space (`w = 0`, so translation is ignored).
pub fn axis_in_world(combined: &Matrix4<f64>, local_axis: &Vector3<f64>) -> Vector3<f64> {
    (combined * Vector4::new(local_axis.x, local_axis.y, local_axis.z, 0.0)).xyz()
}

/// Rotation part of a transform.
pub fn orientation_of(combined: &Matrix4<f64>) -> UnitQuaternion<f64> {
    let rotation = combined.fixed_view::<3, 3>(0, 0).into_owned();
    UnitQuaternion::from_matrix(&rotation)
}

/// Rotation that brings `current` onto `target`, in world frame, with a
/// non-negative scalar part.
pub fn shortest_arc(
    target: &UnitQuaternion<f64>,
    current: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    let delta = target * current.inverse();
    if delta.scalar() < 0.0 {
        UnitQuaternion::new_unchecked(-delta.into_inner())
    } else {
        delta
    }
}

/// Roll, pitch and yaw of a rotation.
pub fn quat_to_euler(rotation: &UnitQuaternion<f64>) -> Vector3<f64> {
    let (roll, pitch, yaw) = rotation.euler_angles();
    Vector3::new(roll, pitch, yaw)
}

/// Homogeneous transform of a translation followed by a rotation.
pub fn pose_matrix(translation: &Vector3<f64>, rotation: &UnitQuaternion<f64>) -> Matrix4<f64> {
    Isometry3::from_parts(Translation3::from(*translation), *rotation).to_homogeneous()
}

/// The translation becomes the target position, the rotation the target orientation.
impl From<Isometry3<f64>> for TargetPose {
    fn from(iso: Isometry3<f64>) -> Self {
        TargetPose::new(iso.translation.vector, iso.rotation.into_inner())
    }
}

impl From<&Isometry3<f64>> for TargetPose {
    fn from(iso: &Isometry3<f64>) -> Self {
        (*iso).into()
    }
}
