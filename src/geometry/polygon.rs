//! Planar helpers on plain `(x, y)` tuples.
//!
//! Angles follow screen convention: y grows downward, so a heading of `h`
//! degrees points along `(cos h, -sin h)`.

/// Guards the edge-crossing division for near-horizontal edges.
pub const EDGE_EPSILON: f64 = 1e-10;

/// Below this length a direction vector carries no usable orientation.
pub const DEGENERATE_LENGTH: f64 = 1e-9;

/// Even-odd ray casting test.
///
/// Casts a horizontal ray from `(x, y)` and counts edge crossings. The
/// denominator is nudged by [`EDGE_EPSILON`] so horizontal or zero-length
/// edges never divide by zero; such edges simply never toggle the parity.
pub fn point_in_polygon(x: f64, y: f64, polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi + EDGE_EPSILON) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

/// Vertex of `points` closest to `target`, first one wins on ties.
pub fn nearest_vertex(points: &[(f64, f64)], target: (f64, f64)) -> Option<(f64, f64)> {
    points.iter().copied().min_by(|a, b| {
        distance(*a, target)
            .partial_cmp(&distance(*b, target))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Wrap an angle into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Wrap an angle difference into `(-180, 180]`.
pub fn signed_degrees(angle: f64) -> f64 {
    let wrapped = normalize_degrees(angle);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Heading (screen convention) of the vector `from -> to`.
///
/// Returns `None` when the two points coincide.
pub fn bearing_degrees(from: (f64, f64), to: (f64, f64)) -> Option<f64> {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    if dx.hypot(dy) < DEGENERATE_LENGTH {
        return None;
    }
    Some(normalize_degrees((-dy).atan2(dx).to_degrees()))
}

/// Unit vector pointing along `heading` degrees.
pub fn heading_vector(heading: f64) -> (f64, f64) {
    let rad = heading.to_radians();
    (rad.cos(), -rad.sin())
}

/// Normalize a 2D vector, `None` for zero-length input
pub fn normalize((x, y): (f64, f64)) -> Option<(f64, f64)> {
    let len = x.hypot(y);
    if len > DEGENERATE_LENGTH {
        Some((x / len, y / len))
    } else {
        None
    }
}
