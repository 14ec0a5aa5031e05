//! Run a configured mesh under the model its configuration selects

use crate::error::Result;
use crate::hook::TriggerHook;
use crate::report::RunReport;
use crate::simulation::{Simulation, SimulationConfig};
use crate::system::{ActorSystem, SystemConfig};
use crate::topology::Topology;
use actorsim_config::{ActorConfig, ExecutionModel, MeshConfig};
use std::time::Duration;
use tracing::info;

/// Build the topology, run it for `runtime.run_for_ms` and report
pub async fn run_mesh(config: &MeshConfig) -> Result<RunReport> {
    run_mesh_with_hooks(config, |_| Box::new(crate::hook::NoopHook)).await
}

pub async fn run_mesh_with_hooks<F>(config: &MeshConfig, hooks: F) -> Result<RunReport>
where
    F: FnMut(&ActorConfig) -> Box<dyn TriggerHook>,
{
    let topology = Topology::from_config_with_hooks(config, hooks)?;
    let run_for = Duration::from_millis(config.runtime.run_for_ms);
    info!(model = ?config.runtime.model, run_for_ms = config.runtime.run_for_ms, "Running mesh");

    match config.runtime.model {
        ExecutionModel::Discrete => {
            let mut simulation = Simulation::with_config(topology, SimulationConfig::from(&config.runtime));
            simulation.run_until(run_for)?;
            Ok(simulation.finish())
        }
        ExecutionModel::Concurrent => {
            ActorSystem::start(topology, SystemConfig::default())?
                .run_for(run_for)
                .await
        }
    }
}
