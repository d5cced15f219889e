use crowd_stream_proto::GeometryDescription;
use tracing::debug;

use super::{
    EvacuationSimulation, GeometryProvider, OrbitSimulation, SimScenario, Simulation,
    SimulationBuilder, SimulationError,
};

pub const DEFAULT_EVACUATION_AGENTS: usize = 24;

/// Builds fresh simulations for one scenario. Each session owns its own builder.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    scenario: SimScenario,
    agent_speed: f64,
    agent_count: usize,
    builds: u64,
}

impl ScenarioBuilder {
    pub fn new(scenario: SimScenario) -> Self {
        Self {
            scenario,
            agent_speed: scenario.default_agent_speed(),
            agent_count: DEFAULT_EVACUATION_AGENTS,
            builds: 0,
        }
    }

    pub fn with_agent_speed(mut self, speed: f64) -> Self {
        self.agent_speed = speed;
        self
    }

    /// Only the evacuation scenario honours this; the orbit scene has a fixed cast.
    pub fn with_agent_count(mut self, count: usize) -> Self {
        self.agent_count = count;
        self
    }

    pub fn scenario(&self) -> SimScenario {
        self.scenario
    }

    pub fn builds(&self) -> u64 {
        self.builds
    }
}

impl SimulationBuilder for ScenarioBuilder {
    fn build(&mut self) -> Result<Box<dyn Simulation>, SimulationError> {
        let simulation: Box<dyn Simulation> = match self.scenario {
            SimScenario::Orbit => Box::new(OrbitSimulation::new(self.agent_speed)),
            SimScenario::Evacuation => Box::new(EvacuationSimulation::new(
                &self.scenario.geometry(),
                self.agent_count,
                self.agent_speed,
            )?),
        };
        self.builds += 1;
        debug!(
            scenario = self.scenario.as_str(),
            agents = simulation.agent_count(),
            build = self.builds,
            "built simulation"
        );
        Ok(simulation)
    }

    fn geometry(&self) -> Option<GeometryDescription> {
        Some(self.describe())
    }
}

impl GeometryProvider for ScenarioBuilder {
    fn describe(&self) -> GeometryDescription {
        self.scenario.geometry()
    }
}
