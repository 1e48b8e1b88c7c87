use nalgebra::{SMatrix, SVector};
use tracing::debug;

use crate::config::IkConfig;
use crate::jacobian::build_jacobian;
use crate::pose_error::{pose_error, TargetPose};
use crate::skeleton::Skeleton;
use crate::strategy::{self, IkMode};

/// Jacobian IK solver for `N` joint degrees of freedom.
///
/// `M` selects what is tracked: 3 rows for position only, 6 rows for
/// position and orientation. Any other `M` fails to compile on use.
///
/// The only state carried between calls is the residual of the last
/// solve, so independent instances share nothing.
#[derive(Debug, Clone)]
pub struct IkSolver<const N: usize, const M: usize> {
    config: IkConfig,
    error: Option<f64>,
}

/// Position-only tracking.
pub type PositionSolver<const N: usize> = IkSolver<N, 3>;
/// Position and orientation tracking.
pub type PoseSolver<const N: usize> = IkSolver<N, 6>;

impl<const N: usize, const M: usize> IkSolver<N, M> {
    const VALID_DIMENSIONS: () = assert!(
        (M == 3 || M == 6) && N > 0,
        "IkSolver tracks 3 (position) or 6 (pose) rows over at least one joint"
    );

    pub fn new(config: IkConfig) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_DIMENSIONS;
        Self {
            config,
            error: None,
        }
    }

    pub fn config(&self) -> &IkConfig {
        &self.config
    }

    /// Norm of the last pose residual, `f64::MAX` until the first solve.
    pub fn error(&self) -> f64 {
        self.error.unwrap_or(f64::MAX)
    }

    /// Joint-angle update moving `end_effector` toward `target`.
    ///
    /// Components follow the Jacobian column order: end effector first,
    /// x, y, z per bone. Joints beyond the chain's free axes get zero.
    pub fn compute_delta_theta<S: Skeleton>(
        &mut self,
        skeleton: &S,
        end_effector: S::BoneId,
        target: &TargetPose,
        mode: IkMode,
    ) -> SVector<f64, N> {
        let delta_p: SVector<f64, M> = pose_error(&skeleton.combined(end_effector), target);
        let jacobian: SMatrix<f64, M, N> = build_jacobian(skeleton, end_effector);

        let error = delta_p.norm();
        self.error = Some(error);

        let delta_theta = strategy::solve(mode, &jacobian, &delta_p, &self.config);
        debug!(
            "IK {} step for {:?}: error={:.6} |delta_theta|={:.6}",
            mode,
            end_effector,
            error,
            delta_theta.norm()
        );
        delta_theta
    }
}

impl<const N: usize, const M: usize> Default for IkSolver<N, M> {
    fn default() -> Self {
        Self::new(IkConfig::default())
    }
}
