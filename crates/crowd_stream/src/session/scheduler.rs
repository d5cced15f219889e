use crowd_stream_proto::SnapshotMessage;

use crate::simulator::SimulationError;

use super::encoder::encode_snapshot;
use super::state::{Lifecycle, SessionState};

/// A step is due only while running with agents left and the target not yet reached.
/// Once either limit is hit stepping stops quietly, even though the lifecycle stays `Running`.
pub fn should_step(state: &SessionState) -> bool {
    if state.lifecycle() != Lifecycle::Running {
        return false;
    }
    match state.simulation() {
        Some(simulation) => {
            simulation.agent_count() > 0 && simulation.iteration_count() < state.target_steps()
        }
        None => false,
    }
}

/// Performs at most one step and returns the snapshot to emit for it.
pub fn step_once(state: &mut SessionState) -> Result<Option<SnapshotMessage>, SimulationError> {
    if !should_step(state) {
        return Ok(None);
    }
    let target = state.target_steps();
    let Some(simulation) = state.simulation_mut() else {
        return Ok(None);
    };
    simulation.iterate()?;
    Ok(Some(encode_snapshot(&*simulation, target)))
}
