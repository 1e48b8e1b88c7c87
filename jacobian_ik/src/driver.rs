use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::IkConfig;
use crate::error::{IkError, Result};
use crate::pose_error::TargetPose;
use crate::skeleton::{BoneId, BoneTree};
use crate::solver::IkSolver;
use crate::strategy::IkMode;

/// Result of an iterative solve.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct IkOutcome {
    /// Joint updates applied to the tree.
    pub steps: usize,
    /// Residual norm after the last update.
    pub error: f64,
    pub converged: bool,
}

/// Repeatedly solves and applies joint updates until the residual drops
/// below `error_threshold` or `max_steps` updates have been applied.
#[derive(Debug, Clone)]
pub struct IkDriver<const N: usize, const M: usize> {
    solver: IkSolver<N, M>,
}

impl<const N: usize, const M: usize> IkDriver<N, M> {
    pub fn new(config: IkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            solver: IkSolver::new(config),
        })
    }

    pub fn solver(&self) -> &IkSolver<N, M> {
        &self.solver
    }

    pub fn run(
        &mut self,
        tree: &mut BoneTree,
        end_effector: BoneId,
        target: &TargetPose,
        mode: IkMode,
    ) -> Result<IkOutcome> {
        if tree.bone(end_effector).is_none() {
            return Err(IkError::UnknownBone(end_effector.index()));
        }
        tree.update_combined();

        let max_steps = self.solver.config().max_steps;
        let threshold = self.solver.config().error_threshold;

        for step in 0..max_steps {
            let delta_theta = self.solver.compute_delta_theta(&*tree, end_effector, target, mode);
            let error = self.solver.error();
            if error <= threshold {
                info!("IK {} converged after {} steps (error {:.6})", mode, step, error);
                return Ok(IkOutcome {
                    steps: step,
                    error,
                    converged: true,
                });
            }
            tree.apply_delta_theta(end_effector, delta_theta.as_slice())?;
        }

        // Measure the residual left by the final update.
        self.solver.compute_delta_theta(&*tree, end_effector, target, mode);
        let error = self.solver.error();
        let converged = error <= threshold;
        if converged {
            info!("IK {} converged after {} steps (error {:.6})", mode, max_steps, error);
        } else {
            debug!("IK {} stopped after {} steps (error {:.6})", mode, max_steps, error);
        }

        Ok(IkOutcome {
            steps: max_steps,
            error,
            converged,
        })
    }
}
