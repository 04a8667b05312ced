use geo::{LineString, Polygon};

/// Corners of a rectangle centred on `center` whose `length` runs along the
/// unit vector `along` and whose `width` runs across it.
///
/// Corners are returned in ring order: front-left, front-right, back-right,
/// back-left (left/right as seen on screen when `along` points up).
pub fn oriented_rect(
    center: (f64, f64),
    along: (f64, f64),
    length: f64,
    width: f64,
) -> Vec<(f64, f64)> {
    let (ax, ay) = along;
    // Perpendicular vector (rotate 90 degrees)
    let (px, py) = (-ay, ax);
    let hl = length / 2.0;
    let hw = width / 2.0;
    let (cx, cy) = center;

    vec![
        (cx + ax * hl - px * hw, cy + ay * hl - py * hw),
        (cx + ax * hl + px * hw, cy + ay * hl + py * hw),
        (cx - ax * hl + px * hw, cy - ay * hl + py * hw),
        (cx - ax * hl - px * hw, cy - ay * hl - py * hw),
    ]
}

/// Closed ring suitable for boundary intersection tests.
pub fn ring(points: &[(f64, f64)]) -> LineString<f64> {
    let mut line: LineString<f64> = points.to_vec().into();
    line.close();
    line
}

/// Polygon without holes; `geo` closes the exterior ring.
pub fn closed_polygon(points: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(points.to_vec().into(), vec![])
}
