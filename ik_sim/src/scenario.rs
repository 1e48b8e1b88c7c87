//! Reach scenarios: every IK mode chasing a reachable target on a preset arm.

use jacobian_ik::transforms::{orientation_of, position_of};
use jacobian_ik::{
    BoneId, BoneTree, IkConfig, IkDriver, IkMode, IkOutcome, IkSolver, Result, Skeleton, TargetPose,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::arm_config::{ArmConfig, ArmModel};

/// Outcome of one mode on one arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub model: ArmModel,
    pub mode: IkMode,
    /// Residual norm at the rest pose.
    pub initial_error: f64,
    pub outcome: IkOutcome,
}

/// Joint offsets from the rest pose that define each model's target.
pub fn target_offsets(model: ArmModel) -> &'static [f64] {
    match model {
        ArmModel::PlanarThreeLink => &[0.4, 0.5, 0.4],
        ArmModel::HumanoidArm => &[0.2, -0.3, 0.25, 0.15, -0.2, 0.1],
    }
}

/// End-effector pose after moving the rest pose by `offsets`, so the
/// target is reachable by construction.
pub fn reachable_target(arm: &ArmConfig, offsets: &[f64]) -> Result<TargetPose> {
    let (mut tree, end_effector) = arm.build()?;
    tree.apply_delta_theta(end_effector, offsets)?;
    Ok(pose_of(&tree, end_effector))
}

pub fn pose_of(tree: &BoneTree, bone: BoneId) -> TargetPose {
    let combined = tree.combined(bone);
    TargetPose::new(position_of(&combined), orientation_of(&combined).into_inner())
}

/// Runs every mode from the arm's rest pose. Planar arms track position
/// only, humanoid arms track the full pose.
pub fn run_all_modes(arm: &ArmConfig, config: IkConfig) -> Result<Vec<ScenarioReport>> {
    let target = reachable_target(arm, target_offsets(arm.model))?;
    match arm.model {
        ArmModel::PlanarThreeLink => run_modes::<3, 3>(arm, config, &target),
        ArmModel::HumanoidArm => run_modes::<6, 6>(arm, config, &target),
    }
}

fn run_modes<const N: usize, const M: usize>(
    arm: &ArmConfig,
    config: IkConfig,
    target: &TargetPose,
) -> Result<Vec<ScenarioReport>> {
    let mut reports = Vec::with_capacity(IkMode::ALL.len());

    for mode in IkMode::ALL {
        let (mut tree, end_effector) = arm.build()?;

        let mut rest_solver = IkSolver::<N, M>::new(config);
        rest_solver.compute_delta_theta(&tree, end_effector, target, mode);
        let initial_error = rest_solver.error();

        let mut driver = IkDriver::<N, M>::new(config)?;
        let outcome = driver.run(&mut tree, end_effector, target, mode)?;

        if outcome.converged {
            info!(
                "{}: {} reached the target in {} steps (error {:.2e} -> {:.2e})",
                arm.model, mode, outcome.steps, initial_error, outcome.error
            );
        } else {
            warn!(
                "{}: {} did not converge in {} steps (error {:.2e} -> {:.2e})",
                arm.model, mode, outcome.steps, initial_error, outcome.error
            );
        }

        reports.push(ScenarioReport {
            model: arm.model,
            mode,
            initial_error,
            outcome,
        });
    }

    Ok(reports)
}
