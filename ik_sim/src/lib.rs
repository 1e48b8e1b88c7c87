// Library exports for the IK simulator

pub mod arm_config;
pub mod scenario;

pub use arm_config::{ArmConfig, ArmModel, SegmentConfig};
pub use scenario::{run_all_modes, ScenarioReport};
