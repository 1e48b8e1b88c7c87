use nalgebra::{Matrix4, SMatrix, SVector, Vector3};

use crate::skeleton::{chain_axes, Skeleton};
use crate::transforms;

/// Jacobian column of one rotational axis.
///
/// With `v` the bone's local axis in world space, the linear rows are
/// `v x (p_effector - p_bone)` and the angular rows (when `M == 6`) are `v`.
pub fn jacobian_column<const M: usize>(
    bone: &Matrix4<f64>,
    local_axis: &Vector3<f64>,
    effector_position: &Vector3<f64>,
) -> SVector<f64, M> {
    let mut column = SVector::<f64, M>::zeros();

    let bone_position = transforms::position_of(bone);
    let axis = transforms::axis_in_world(bone, local_axis);
    let linear = axis.cross(&(effector_position - bone_position));

    for row in 0..M.min(3) {
        column[row] = linear[row];
    }
    for row in 3..M.min(6) {
        column[row] = axis[row - 3];
    }
    column
}

/// Jacobian of the chain ending at `end_effector`.
///
/// Columns follow [`chain_axes`] order. When the chain has fewer than `N`
/// free axes the trailing columns stay zero, so those joints never move.
pub fn build_jacobian<S: Skeleton, const M: usize, const N: usize>(
    skeleton: &S,
    end_effector: S::BoneId,
) -> SMatrix<f64, M, N> {
    let mut jacobian = SMatrix::<f64, M, N>::zeros();
    let effector_position = transforms::position_of(&skeleton.combined(end_effector));

    for (joint, chain_axis) in chain_axes(skeleton, end_effector, N).iter().enumerate() {
        let column = jacobian_column::<M>(
            &skeleton.combined(chain_axis.bone),
            &chain_axis.axis,
            &effector_position,
        );
        jacobian.set_column(joint, &column);
    }

    jacobian
}
