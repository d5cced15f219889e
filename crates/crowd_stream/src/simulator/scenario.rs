//! Scene templates (stable IDs).

use crowd_stream_proto::{GeometryDescription, Polygon};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimScenario {
    #[default]
    Orbit,
    Evacuation,
}

impl SimScenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimScenario::Orbit => "orbit",
            SimScenario::Evacuation => "evacuation",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "orbit" | "circular" | "demo" => Some(SimScenario::Orbit),
            "evacuation" | "corridor" | "exit" => Some(SimScenario::Evacuation),
            _ => None,
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["orbit", "evacuation"]
    }

    pub fn default_agent_speed(&self) -> f64 {
        match self {
            SimScenario::Orbit => 0.1,
            SimScenario::Evacuation => 0.5,
        }
    }

    pub fn geometry(&self) -> GeometryDescription {
        match self {
            SimScenario::Orbit => GeometryDescription {
                boundary: Polygon::rectangle(0.0, 0.0, 1.0, 1.0),
                obstacles: Vec::new(),
                exits: Vec::new(),
                spawn_area: Polygon::rectangle(0.0, 0.0, 1.0, 1.0),
            },
            // 20 x 10 m room, a pillar in the middle, one door on the east wall.
            SimScenario::Evacuation => GeometryDescription {
                boundary: Polygon::rectangle(0.0, 0.0, 20.0, 10.0),
                obstacles: vec![Polygon::rectangle(9.0, 3.0, 11.0, 7.0)],
                exits: vec![Polygon::rectangle(19.0, 4.0, 20.0, 6.0)],
                spawn_area: Polygon::rectangle(1.0, 1.0, 7.0, 9.0),
            },
        }
    }
}
