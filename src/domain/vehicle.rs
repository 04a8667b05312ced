use geo::{Area, Polygon};
use serde::{Deserialize, Serialize};

use super::registry::Identity;
use crate::error::{Result, SimError};
use crate::geometry::{closed_polygon, heading_vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VehicleId(pub usize);

/// Position and heading (degrees, 0 = +x, counter-clockwise on screen)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

fn default_max_speed() -> f64 {
    10.0
}
fn default_acceleration() -> f64 {
    0.2
}
fn default_friction() -> f64 {
    0.05
}
fn default_turn_slowdown() -> f64 {
    0.1
}
fn default_turn_step() -> f64 {
    5.0
}

/// Per-vehicle physics constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    #[serde(default = "default_acceleration")]
    pub acceleration: f64,
    #[serde(default = "default_friction")]
    pub friction: f64,
    #[serde(default = "default_turn_slowdown")]
    pub turn_slowdown: f64,
    /// Degrees turned per tick of steering
    #[serde(default = "default_turn_step")]
    pub turn_step: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_speed: default_max_speed(),
            acceleration: default_acceleration(),
            friction: default_friction(),
            turn_slowdown: default_turn_slowdown(),
            turn_step: default_turn_step(),
        }
    }
}

impl Tuning {
    /// Reverse speed limit as a positive magnitude; speed never drops
    /// below its negation.
    pub fn max_reverse_speed(&self) -> f64 {
        self.max_speed / 2.0
    }
}

/// Physical extent of a vehicle, centred on its pose.
///
/// Local coordinates: `u` runs forward along the heading, `v` to the
/// vehicle's right as drawn on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Footprint {
    Rectangle { length: f64, width: f64 },
    Silhouette { outline: Vec<(f64, f64)> },
}

impl Default for Footprint {
    fn default() -> Self {
        Footprint::Rectangle {
            length: 30.0,
            width: 20.0,
        }
    }
}

impl Footprint {
    /// Rectangle sized relative to the track width, the long side along
    /// the heading
    pub fn for_track_width(track_width: f64, size_ratio: f64, length_ratio: f64) -> Self {
        let width = track_width * size_ratio;
        Footprint::Rectangle {
            length: width * length_ratio,
            width,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let outline = self.outline();
        if outline.iter().any(|&(u, v)| !u.is_finite() || !v.is_finite()) {
            return Err(SimError::InvalidTrackGeometry(
                "vehicle footprint has non-finite coordinates".to_string(),
            ));
        }
        if outline.len() < 3 || closed_polygon(&outline).unsigned_area() <= 0.0 {
            return Err(SimError::InvalidTrackGeometry(
                "vehicle footprint encloses no area".to_string(),
            ));
        }
        Ok(())
    }

    /// Outline in vehicle-local coordinates
    pub fn outline(&self) -> Vec<(f64, f64)> {
        match self {
            Footprint::Rectangle { length, width } => {
                let hl = length / 2.0;
                let hw = width / 2.0;
                vec![(hl, -hw), (hl, hw), (-hl, hw), (-hl, -hw)]
            }
            Footprint::Silhouette { outline } => outline.clone(),
        }
    }

    /// Outline placed in world space at `pose`
    pub fn place(&self, pose: &Pose) -> Vec<(f64, f64)> {
        let (fx, fy) = heading_vector(pose.heading);
        // Right-hand side on screen
        let (rx, ry) = (-fy, fx);
        self.outline()
            .into_iter()
            .map(|(u, v)| (pose.x + fx * u + rx * v, pose.y + fy * u + ry * v))
            .collect()
    }

    pub fn shape(&self, pose: &Pose) -> Polygon<f64> {
        closed_polygon(&self.place(pose))
    }
}

/// Mutable kinematic and progress state of one vehicle
#[derive(Debug, Clone, Serialize)]
pub struct VehicleState {
    pub id: VehicleId,
    pub identity: Identity,
    pub pose: Pose,
    pub speed: f64,
    pub tuning: Tuning,
    pub footprint: Footprint,
    /// Index of the next checkpoint under sequential progress
    pub checkpoint_cursor: usize,
    /// Distance accumulated when sequential checkpoints are reached
    pub progress_distance: f64,
    /// Number of moves rejected by the collision resolver
    pub collisions: u32,
    visited_checkpoints: Vec<usize>,
    finished: bool,
    finished_at: Option<u64>,
}

impl VehicleState {
    pub fn new(
        id: VehicleId,
        identity: Identity,
        pose: Pose,
        tuning: Tuning,
        footprint: Footprint,
    ) -> Result<Self> {
        footprint.validate()?;
        Ok(Self {
            id,
            identity,
            pose,
            speed: 0.0,
            tuning,
            footprint,
            checkpoint_cursor: 0,
            progress_distance: 0.0,
            collisions: 0,
            visited_checkpoints: Vec::new(),
            finished: false,
            finished_at: None,
        })
    }

    pub fn position(&self) -> (f64, f64) {
        self.pose.position()
    }

    /// World-space footprint polygon at the current pose
    pub fn shape(&self) -> Polygon<f64> {
        self.footprint.shape(&self.pose)
    }

    /// Checkpoint indices in the order they were first touched
    pub fn visited_checkpoints(&self) -> &[usize] {
        &self.visited_checkpoints
    }

    pub fn has_visited(&self, checkpoint: usize) -> bool {
        self.visited_checkpoints.contains(&checkpoint)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Tick on which the finish gate was crossed
    pub fn finished_at(&self) -> Option<u64> {
        self.finished_at
    }

    /// Record a checkpoint; returns false if it was already visited
    pub(crate) fn visit(&mut self, checkpoint: usize) -> bool {
        if self.has_visited(checkpoint) {
            return false;
        }
        self.visited_checkpoints.push(checkpoint);
        true
    }

    /// Enter the terminal state; later calls leave the first tick in place
    pub(crate) fn finish(&mut self, tick: u64) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        self.finished_at = Some(tick);
        true
    }
}
