use nalgebra::{Matrix4, Quaternion, SVector, UnitQuaternion, Vector3};

use crate::transforms;

/// Desired end-effector pose.
///
/// The orientation does not have to be normalized; it is normalized before
/// use and ignored entirely by position-only solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPose {
    pub position: Vector3<f64>,
    pub orientation: Quaternion<f64>,
}

impl TargetPose {
    pub fn new(position: Vector3<f64>, orientation: Quaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Target with an identity orientation, for position-only tracking.
    pub fn position(position: Vector3<f64>) -> Self {
        Self::new(position, *UnitQuaternion::identity().quaternion())
    }
}

/// Residual between the target and the end effector's current pose.
///
/// Rows 0..3 hold `target - current` position. When `M == 6`, rows 3..6
/// hold the roll/pitch/yaw increment of the shortest-arc rotation from the
/// current to the target orientation.
pub fn pose_error<const M: usize>(
    end_effector: &Matrix4<f64>,
    target: &TargetPose,
) -> SVector<f64, M> {
    let mut delta_p = SVector::<f64, M>::zeros();

    let delta_pos = target.position - transforms::position_of(end_effector);
    for row in 0..3 {
        delta_p[row] = delta_pos[row];
    }

    if M == 6 {
        let current = transforms::orientation_of(end_effector);
        let desired = UnitQuaternion::from_quaternion(target.orientation);
        let delta_rot = transforms::quat_to_euler(&transforms::shortest_arc(&desired, &current));
        for row in 0..3 {
            delta_p[3 + row] = delta_rot[row];
        }
    }

    delta_p
}
