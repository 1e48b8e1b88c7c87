use std::error::Error;

use ik_sim::{run_all_modes, ArmConfig, ArmModel};
use jacobian_ik::IkConfig;
use tracing::info;

/// Runs every IK mode on every arm preset and prints one JSON report per
/// line. An optional first argument names a JSON solver configuration.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading solver configuration from {}", path);
            IkConfig::load(&path)?
        }
        None => IkConfig::default(),
    };
    info!("Solver configuration: {:?}", config);

    for model in ArmModel::all() {
        let arm = ArmConfig::from_model(model);
        info!("Running {} ({} joint axes)", model, arm.joint_dofs());

        let reports = run_all_modes(&arm, config)?;
        let converged = reports.iter().filter(|r| r.outcome.converged).count();
        for report in &reports {
            println!("{}", serde_json::to_string(report)?);
        }
        info!("{}: {}/{} modes converged", model, converged, reports.len());
    }

    Ok(())
}
