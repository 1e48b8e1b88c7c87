//! Jacobian-based inverse kinematics for chains of rotational joints.
//!
//! The solver linearizes the forward-kinematics map of a bone chain around
//! its current configuration and turns the pose residual of an end effector
//! into a joint-angle update. Six inverse strategies are available, see
//! [`IkMode`].
//!
//! ```rust,ignore
//! use jacobian_ik::{BoneTree, IkConfig, IkMode, PositionSolver, TargetPose};
//!
//! let mut solver = PositionSolver::<3>::new(IkConfig::default());
//! let delta = solver.compute_delta_theta(&tree, tip, &TargetPose::position(target), IkMode::Dls);
//! tree.apply_delta_theta(tip, delta.as_slice())?;
//! println!("residual: {}", solver.error());
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod jacobian;
pub mod pose_error;
pub mod skeleton;
pub mod solver;
pub mod strategy;
pub mod svd;
pub mod transforms;

pub use config::IkConfig;
pub use driver::{IkDriver, IkOutcome};
pub use error::{IkError, Result};
pub use pose_error::TargetPose;
pub use skeleton::{AxisMask, Bone, BoneId, BoneTree, Skeleton};
pub use solver::{IkSolver, PoseSolver, PositionSolver};
pub use strategy::IkMode;
pub use svd::SvdFactors;
