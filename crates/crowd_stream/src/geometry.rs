use crowd_stream_proto::Polygon;

pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    ((dx * dx) + (dy * dy)).sqrt()
}

/// Even-odd ray casting. Points exactly on an edge may land on either side.
pub fn point_in_polygon(polygon: &Polygon, x: f64, y: f64) -> bool {
    let points = &polygon.points;
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let [xi, yi] = points[i];
        let [xj, yj] = points[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Vertex average; exact for the rectangles and convex regions the scenarios use.
pub fn polygon_centroid(polygon: &Polygon) -> Option<(f64, f64)> {
    if polygon.points.is_empty() {
        return None;
    }
    let count = polygon.points.len() as f64;
    let (sum_x, sum_y) = polygon
        .points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), [x, y]| (sx + x, sy + y));
    Some((sum_x / count, sum_y / count))
}

/// `(min_x, min_y, max_x, max_y)` of the polygon's vertices.
pub fn polygon_bounds(polygon: &Polygon) -> Option<(f64, f64, f64, f64)> {
    let first = polygon.points.first()?;
    let init = (first[0], first[1], first[0], first[1]);
    Some(
        polygon
            .points
            .iter()
            .fold(init, |(min_x, min_y, max_x, max_y), [x, y]| {
                (min_x.min(*x), min_y.min(*y), max_x.max(*x), max_y.max(*y))
            }),
    )
}
