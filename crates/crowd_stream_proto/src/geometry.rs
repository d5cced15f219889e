use serde::{Deserialize, Serialize};

/// Closed polygon given as its vertex list; the last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    pub points: Vec<[f64; 2]>,
}

impl Polygon {
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle, counter-clockwise from the lower-left corner.
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            points: vec![
                [min_x, min_y],
                [max_x, min_y],
                [max_x, max_y],
                [min_x, max_y],
            ],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryDescription {
    pub boundary: Polygon,
    #[serde(default)]
    pub obstacles: Vec<Polygon>,
    #[serde(default)]
    pub exits: Vec<Polygon>,
    pub spawn_area: Polygon,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_serializes_polygons_as_coordinate_lists() {
        let geometry = GeometryDescription {
            boundary: Polygon::rectangle(0.0, 0.0, 2.0, 1.0),
            obstacles: Vec::new(),
            exits: vec![Polygon::rectangle(1.5, 0.0, 2.0, 0.5)],
            spawn_area: Polygon::rectangle(0.0, 0.0, 0.5, 0.5),
        };
        let value = serde_json::to_value(&geometry).expect("serialize geometry");
        assert_eq!(
            value["boundary"],
            serde_json::json!([[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 1.0]])
        );
        assert_eq!(value["exits"][0][2], serde_json::json!([2.0, 0.5]));
        assert!(value.get("spawnArea").is_some());
    }
}
