use super::{AgentSnapshot, Simulation, SimulationError};

pub const ORBIT_CENTER: f64 = 0.5;

pub const ORBIT_START_POSITIONS: [(u64, f64, f64); 5] = [
    (1, 0.4, 0.4),
    (2, 0.8, 0.2),
    (3, 0.2, 0.8),
    (4, 0.8, 0.8),
    (5, 0.55, 0.55),
];

/// Five agents circling the centre of the unit square. Nobody ever leaves,
/// so only the step target ends a run.
#[derive(Debug, Clone)]
pub struct OrbitSimulation {
    agents: Vec<AgentSnapshot>,
    speed: f64,
    iteration_count: u64,
}

impl OrbitSimulation {
    pub fn new(speed: f64) -> Self {
        let agents = ORBIT_START_POSITIONS
            .iter()
            .map(|&(id, x, y)| AgentSnapshot { id, x, y })
            .collect();
        Self {
            agents,
            speed,
            iteration_count: 0,
        }
    }
}

impl Simulation for OrbitSimulation {
    fn iterate(&mut self) -> Result<(), SimulationError> {
        for agent in &mut self.agents {
            let next_x = agent.x + self.speed * (ORBIT_CENTER - agent.y);
            let next_y = agent.y + self.speed * (agent.x - ORBIT_CENTER);
            agent.x = next_x.clamp(0.0, 1.0);
            agent.y = next_y.clamp(0.0, 1.0);
        }
        self.iteration_count += 1;
        Ok(())
    }

    fn agent_count(&self) -> usize {
        self.agents.len()
    }

    fn iteration_count(&self) -> u64 {
        self.iteration_count
    }

    fn agents(&self) -> Vec<AgentSnapshot> {
        self.agents.clone()
    }
}
