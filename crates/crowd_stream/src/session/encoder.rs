use crowd_stream_proto::{AgentPosition, GeometryDescription, GeometryMessage, SnapshotMessage};
use serde::Serialize;

use crate::simulator::Simulation;

pub fn encode_snapshot(simulation: &dyn Simulation, target: u64) -> SnapshotMessage {
    let positions = simulation
        .agents()
        .into_iter()
        .map(|agent| (agent.id, AgentPosition { x: agent.x, y: agent.y }))
        .collect();
    SnapshotMessage {
        positions,
        iteration_count: simulation.iteration_count(),
        remaining_agents: simulation.agent_count(),
        target,
    }
}

pub fn geometry_message(geometry: GeometryDescription) -> GeometryMessage {
    GeometryMessage::Geometry { geometry }
}

pub fn to_wire<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
