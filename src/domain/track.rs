use anyhow::{Context, Result as AnyResult};
use geo::{Area, Intersects, Line, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SimError};
use crate::geometry::polygon::{DEGENERATE_LENGTH, normalize};
use crate::geometry::{Bounds, Scaler, distance, nearest_vertex, oriented_rect, point_in_polygon};
use crate::geometry::{closed_polygon, ring};

/// Smallest enclosed area a boundary ring may have
const MIN_RING_AREA: f64 = 1e-6;

/// Finish line marker as stored by the track editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishLine {
    pub point: (f64, f64),
}

/// Track geometry as authored, before validation
///
/// Matches the editor's `map_data.json`; editor-only keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    pub outer_points: Vec<(f64, f64)>,
    pub inner_points: Vec<(f64, f64)>,
    #[serde(default)]
    pub checkpoints: Vec<(f64, f64)>,
    pub finish_line: FinishLine,
}

impl TrackData {
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }

    /// Read a track file from disk
    pub fn load(path: &Path) -> AnyResult<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read track file: {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse track file: {}", path.display()))
    }

    /// Rescale every point so both boundaries fit a `width` x `height`
    /// viewport, filling `scale_factor` of it.
    pub fn fit_to_viewport(&self, width: f64, height: f64, scale_factor: f64) -> Self {
        let Some(mut bounds) = Bounds::from_points(&self.outer_points) else {
            return self.clone();
        };
        bounds.expand(&self.inner_points);
        let scaler = Scaler::fit(&bounds, width, height, scale_factor);
        let (fx, fy) = self.finish_line.point;

        Self {
            outer_points: scaler.scale_points(&self.outer_points),
            inner_points: scaler.scale_points(&self.inner_points),
            checkpoints: scaler.scale_points(&self.checkpoints),
            finish_line: FinishLine {
                point: scaler.scale(fx, fy),
            },
        }
    }
}

/// Transverse strip between the two boundaries, used for crossing detection
#[derive(Debug, Clone)]
pub struct Gate {
    outer_anchor: (f64, f64),
    inner_anchor: (f64, f64),
    corners: Vec<(f64, f64)>,
    shape: Polygon<f64>,
}

impl Gate {
    /// Gate spanning the outer and inner vertices nearest to `at`.
    ///
    /// Returns `None` when either boundary is empty or both anchors coincide.
    pub fn spanning(
        outer: &[(f64, f64)],
        inner: &[(f64, f64)],
        at: (f64, f64),
        depth: f64,
    ) -> Option<Self> {
        let outer_anchor = nearest_vertex(outer, at)?;
        let inner_anchor = nearest_vertex(inner, at)?;
        let along = normalize((
            inner_anchor.0 - outer_anchor.0,
            inner_anchor.1 - outer_anchor.1,
        ))?;
        let center = (
            (outer_anchor.0 + inner_anchor.0) / 2.0,
            (outer_anchor.1 + inner_anchor.1) / 2.0,
        );
        let corners = oriented_rect(center, along, distance(outer_anchor, inner_anchor), depth);

        Some(Self {
            outer_anchor,
            inner_anchor,
            shape: closed_polygon(&corners),
            corners,
        })
    }

    /// Square gate of side `depth` centred on `at`
    pub fn square(at: (f64, f64), depth: f64) -> Self {
        let corners = oriented_rect(at, (1.0, 0.0), depth, depth);
        Self {
            outer_anchor: at,
            inner_anchor: at,
            shape: closed_polygon(&corners),
            corners,
        }
    }

    pub fn outer_anchor(&self) -> (f64, f64) {
        self.outer_anchor
    }

    pub fn inner_anchor(&self) -> (f64, f64) {
        self.inner_anchor
    }

    /// Distance between the two anchors
    pub fn width(&self) -> f64 {
        distance(self.outer_anchor, self.inner_anchor)
    }

    pub fn midpoint(&self) -> (f64, f64) {
        (
            (self.outer_anchor.0 + self.inner_anchor.0) / 2.0,
            (self.outer_anchor.1 + self.inner_anchor.1) / 2.0,
        )
    }

    pub fn corners(&self) -> &[(f64, f64)] {
        &self.corners
    }

    pub fn shape(&self) -> &Polygon<f64> {
        &self.shape
    }
}

/// Validated, immutable track: the drivable annulus between `outer` and
/// `inner`, with one gate per checkpoint and one at the finish.
#[derive(Debug, Clone)]
pub struct Track {
    outer: Vec<(f64, f64)>,
    inner: Vec<(f64, f64)>,
    outer_ring: LineString<f64>,
    inner_ring: LineString<f64>,
    bounds: Bounds,
    checkpoints: Vec<(f64, f64)>,
    checkpoint_gates: Vec<Gate>,
    finish_point: (f64, f64),
    finish_gate: Gate,
}

impl Track {
    /// Validate `data` and precompute gates of the given depth
    pub fn new(data: TrackData, gate_depth: f64) -> Result<Self> {
        let outer = open_ring(&data.outer_points);
        let inner = open_ring(&data.inner_points);
        validate_ring("outer", &outer)?;
        validate_ring("inner", &inner)?;

        if let Some(&(x, y)) = inner.iter().find(|&&(x, y)| !point_in_polygon(x, y, &outer)) {
            return Err(SimError::InvalidTrackGeometry(format!(
                "inner boundary point ({x}, {y}) lies outside the outer boundary"
            )));
        }

        let outer_ring = ring(&outer);
        let inner_ring = ring(&inner);
        if outer_ring.intersects(&inner_ring) {
            return Err(SimError::InvalidTrackGeometry(
                "inner and outer boundaries cross".to_string(),
            ));
        }

        if !(gate_depth.is_finite() && gate_depth > 0.0) {
            return Err(SimError::InvalidTrackGeometry(format!(
                "gate depth must be positive, got {gate_depth}"
            )));
        }

        let finish_point = data.finish_line.point;
        let finish_gate = Gate::spanning(&outer, &inner, finish_point, gate_depth)
            .ok_or_else(|| {
                SimError::InvalidTrackGeometry(
                    "finish line anchors on both boundaries coincide".to_string(),
                )
            })?;

        let checkpoint_gates = data
            .checkpoints
            .iter()
            .map(|&at| {
                Gate::spanning(&outer, &inner, at, gate_depth)
                    .unwrap_or_else(|| Gate::square(at, gate_depth))
            })
            .collect();

        let bounds = Bounds::from_points(&outer).ok_or_else(|| {
            SimError::InvalidTrackGeometry("outer boundary is empty".to_string())
        })?;

        Ok(Self {
            outer,
            inner,
            outer_ring,
            inner_ring,
            bounds,
            checkpoints: data.checkpoints,
            checkpoint_gates,
            finish_point,
            finish_gate,
        })
    }

    /// Whether `(x, y)` lies on the drivable annulus
    pub fn contains(&self, x: f64, y: f64) -> bool {
        point_in_polygon(x, y, &self.outer) && !point_in_polygon(x, y, &self.inner)
    }

    /// Whether `(x, y)` lies within the bounding box of the outer boundary
    pub fn in_bounds(&self, x: f64, y: f64) -> bool {
        self.bounds.contains(x, y)
    }

    pub fn outer(&self) -> &[(f64, f64)] {
        &self.outer
    }

    pub fn inner(&self) -> &[(f64, f64)] {
        &self.inner
    }

    pub fn outer_ring(&self) -> &LineString<f64> {
        &self.outer_ring
    }

    pub fn inner_ring(&self) -> &LineString<f64> {
        &self.inner_ring
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn checkpoints(&self) -> &[(f64, f64)] {
        &self.checkpoints
    }

    pub fn checkpoint_gates(&self) -> &[Gate] {
        &self.checkpoint_gates
    }

    pub fn finish_point(&self) -> (f64, f64) {
        self.finish_point
    }

    pub fn finish_gate(&self) -> &Gate {
        &self.finish_gate
    }

    /// Track width measured across the finish gate
    pub fn width_at_finish(&self) -> f64 {
        self.finish_gate.width()
    }
}

/// Drop an explicit closing point so rings hold each vertex once
fn open_ring(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut open = points.to_vec();
    if open.len() > 1 && open.first() == open.last() {
        open.pop();
    }
    open
}

fn validate_ring(name: &str, points: &[(f64, f64)]) -> Result<()> {
    if points.iter().any(|&(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(SimError::InvalidTrackGeometry(format!(
            "{name} boundary has non-finite coordinates"
        )));
    }

    let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for &p in points {
        if distinct.iter().all(|&q| distance(p, q) > DEGENERATE_LENGTH) {
            distinct.push(p);
        }
    }
    if distinct.len() < 3 {
        return Err(SimError::InvalidTrackGeometry(format!(
            "{name} boundary needs at least 3 distinct points, got {}",
            distinct.len()
        )));
    }

    if is_self_intersecting(points) {
        return Err(SimError::InvalidTrackGeometry(format!(
            "{name} boundary crosses itself"
        )));
    }

    if closed_polygon(points).unsigned_area() < MIN_RING_AREA {
        return Err(SimError::InvalidTrackGeometry(format!(
            "{name} boundary encloses no area"
        )));
    }
    Ok(())
}

/// Whether any two non-adjacent edges of the ring touch
fn is_self_intersecting(points: &[(f64, f64)]) -> bool {
    let mut vertices: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for &p in points {
        if vertices.last().is_none_or(|&q| distance(p, q) > DEGENERATE_LENGTH) {
            vertices.push(p);
        }
    }
    while vertices.len() > 1
        && vertices
            .first()
            .zip(vertices.last())
            .is_some_and(|(&a, &b)| distance(a, b) <= DEGENERATE_LENGTH)
    {
        vertices.pop();
    }

    let n = vertices.len();
    let edges: Vec<Line<f64>> = (0..n)
        .map(|i| Line::new(vertices[i], vertices[(i + 1) % n]))
        .collect();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return true;
            }
        }
    }
    false
}
