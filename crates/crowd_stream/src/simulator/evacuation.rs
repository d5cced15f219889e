use crowd_stream_proto::{GeometryDescription, Polygon};

use crate::geometry::{distance, point_in_polygon, polygon_bounds, polygon_centroid};

use super::{AgentSnapshot, Simulation, SimulationError};

/// Upper bound on agents placed in one evacuation scene.
pub const MAX_EVACUATION_AGENTS: usize = 10_000;

#[derive(Debug, Clone)]
struct ExitTarget {
    area: Polygon,
    center: (f64, f64),
}

/// Agents start on a grid inside the spawn area and walk straight at the
/// nearest exit; anyone standing inside an exit after a step is removed.
/// Obstacles are part of the scene only and do not block movement.
#[derive(Debug, Clone)]
pub struct EvacuationSimulation {
    agents: Vec<AgentSnapshot>,
    exits: Vec<ExitTarget>,
    speed: f64,
    iteration_count: u64,
}

impl EvacuationSimulation {
    pub fn new(
        geometry: &GeometryDescription,
        agent_count: usize,
        speed: f64,
    ) -> Result<Self, SimulationError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "agent speed must be positive, got {speed}"
            )));
        }
        let exits: Vec<ExitTarget> = geometry
            .exits
            .iter()
            .filter_map(|area| {
                polygon_centroid(area).map(|center| ExitTarget {
                    area: area.clone(),
                    center,
                })
            })
            .collect();
        if exits.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "evacuation needs at least one exit".to_string(),
            ));
        }
        let agents = distribute_agents(&geometry.spawn_area, agent_count)?;
        Ok(Self {
            agents,
            exits,
            speed,
            iteration_count: 0,
        })
    }

    fn nearest_exit(&self, position: (f64, f64)) -> Option<(f64, f64)> {
        self.exits
            .iter()
            .map(|exit| exit.center)
            .min_by(|a, b| distance(position, *a).total_cmp(&distance(position, *b)))
    }

    fn in_any_exit(&self, agent: &AgentSnapshot) -> bool {
        self.exits
            .iter()
            .any(|exit| point_in_polygon(&exit.area, agent.x, agent.y))
    }
}

impl Simulation for EvacuationSimulation {
    fn iterate(&mut self) -> Result<(), SimulationError> {
        let speed = self.speed;
        let mut moved = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            let position = (agent.x, agent.y);
            let target = self.nearest_exit(position).ok_or_else(|| {
                SimulationError::Step("no exit left to walk towards".to_string())
            })?;
            let remaining = distance(position, target);
            let (x, y) = if remaining <= speed {
                target
            } else {
                let ratio = speed / remaining;
                (
                    position.0 + (target.0 - position.0) * ratio,
                    position.1 + (target.1 - position.1) * ratio,
                )
            };
            moved.push(AgentSnapshot { id: agent.id, x, y });
        }
        moved.retain(|agent| !self.in_any_exit(agent));
        self.agents = moved;
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

/// Row-major grid over the spawn area's bounding box, keeping cell centres
/// that fall inside the spawn polygon. Ids start at 1.
fn distribute_agents(
    spawn_area: &Polygon,
    agent_count: usize,
) -> Result<Vec<AgentSnapshot>, SimulationError> {
    if agent_count == 0 {
        return Ok(Vec::new());
    }
    if agent_count > MAX_EVACUATION_AGENTS {
        return Err(SimulationError::InvalidConfig(format!(
            "agent count {agent_count} exceeds {MAX_EVACUATION_AGENTS}"
        )));
    }
    let (min_x, min_y, max_x, max_y) = polygon_bounds(spawn_area).ok_or_else(|| {
        SimulationError::InvalidConfig("spawn area has no vertices".to_string())
    })?;
    let cols = (agent_count as f64).sqrt().ceil() as usize;
    let rows = agent_count.div_ceil(cols);
    let cell_w = (max_x - min_x) / cols as f64;
    let cell_h = (max_y - min_y) / rows as f64;

    let mut agents = Vec::with_capacity(agent_count);
    for row in 0..rows {
        for col in 0..cols {
            if agents.len() == agent_count {
                return Ok(agents);
            }
            let x = min_x + (col as f64 + 0.5) * cell_w;
            let y = min_y + (row as f64 + 0.5) * cell_h;
            if point_in_polygon(spawn_area, x, y) {
                agents.push(AgentSnapshot {
                    id: agents.len() as u64 + 1,
                    x,
                    y,
                });
            }
        }
    }
    Ok(agents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimScenario;

    #[test]
    fn agents_are_distributed_inside_spawn_area() {
        let geometry = SimScenario::Evacuation.geometry();
        let sim = EvacuationSimulation::new(&geometry, 10, 0.5).expect("build");
        assert_eq!(sim.agent_count(), 10);
        assert_eq!(sim.iteration_count(), 0);
        let ids: Vec<u64> = sim.agents().iter().map(|agent| agent.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        assert!(sim
            .agents()
            .iter()
            .all(|agent| point_in_polygon(&geometry.spawn_area, agent.x, agent.y)));
    }

    #[test]
    fn everyone_eventually_leaves_through_the_exit() {
        let geometry = SimScenario::Evacuation.geometry();
        let mut sim = EvacuationSimulation::new(&geometry, 12, 0.5).expect("build");
        let mut previous = sim.agent_count();
        for _ in 0..100 {
            if sim.agent_count() == 0 {
                break;
            }
            sim.iterate().expect("iterate");
            assert!(sim.agent_count() <= previous);
            previous = sim.agent_count();
        }
        assert_eq!(sim.agent_count(), 0);
        assert!(sim.iteration_count() < 100);
    }

    #[test]
    fn oversized_crowd_is_a_config_error() {
        let geometry = SimScenario::Evacuation.geometry();
        assert!(matches!(
            EvacuationSimulation::new(&geometry, usize::MAX, 0.5),
            Err(SimulationError::InvalidConfig(_))
        ));
        let sim = EvacuationSimulation::new(&geometry, MAX_EVACUATION_AGENTS, 0.5)
            .expect("largest crowd");
        assert_eq!(sim.agent_count(), MAX_EVACUATION_AGENTS);
    }

    #[test]
    fn rejects_scene_without_exits_or_with_bad_speed() {
        let mut geometry = SimScenario::Evacuation.geometry();
        assert!(matches!(
            EvacuationSimulation::new(&geometry, 4, 0.0),
            Err(SimulationError::InvalidConfig(_))
        ));
        geometry.exits.clear();
        assert!(matches!(
            EvacuationSimulation::new(&geometry, 4, 0.5),
            Err(SimulationError::InvalidConfig(_))
        ));
    }
}
