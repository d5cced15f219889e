//! Simulation engines and the interface the session loop drives them through.

mod builder;
mod evacuation;
mod orbit;
mod scenario;

pub use builder::{ScenarioBuilder, DEFAULT_EVACUATION_AGENTS};
pub use evacuation::{EvacuationSimulation, MAX_EVACUATION_AGENTS};
pub use orbit::{OrbitSimulation, ORBIT_START_POSITIONS};
pub use scenario::SimScenario;

use crowd_stream_proto::GeometryDescription;

/// Read-only view of one agent after the latest step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshot {
    pub id: u64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
    #[error("simulation step failed: {0}")]
    Step(String),
}

/// A stepped simulation. A freshly built instance reports `iteration_count() == 0`
/// and every successful `iterate()` advances it by exactly one.
pub trait Simulation {
    fn iterate(&mut self) -> Result<(), SimulationError>;
    fn agent_count(&self) -> usize;
    fn iteration_count(&self) -> u64;
    fn agents(&self) -> Vec<AgentSnapshot>;
}

pub trait SimulationBuilder {
    fn build(&mut self) -> Result<Box<dyn Simulation>, SimulationError>;

    /// Static scene sent to the client ahead of the first snapshot of every built instance.
    fn geometry(&self) -> Option<GeometryDescription> {
        None
    }
}

pub trait GeometryProvider {
    fn describe(&self) -> GeometryDescription;
}
