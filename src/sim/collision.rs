use geo::{Contains, Intersects, Point, Polygon};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Pose, Track, VehicleId, VehicleState};

/// How a rejected move is repaired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Restore the previous pose and stop
    #[default]
    StopAndRevert,
    /// Restore the previous pose and reverse the speed (legacy behaviour)
    Bounce,
}

/// What a footprint ran into, checked in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Contact {
    Clear,
    /// Centre point left the annulus
    Boundary,
    /// Centre is on track but the footprint crosses a boundary
    Overhang,
    Vehicle(VehicleId),
}

impl Contact {
    pub fn is_clear(self) -> bool {
        self == Contact::Clear
    }
}

/// Read-only snapshot of another active vehicle's footprint
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub id: VehicleId,
    pub shape: Polygon<f64>,
}

impl Obstacle {
    pub fn of(state: &VehicleState) -> Self {
        Self {
            id: state.id,
            shape: state.shape(),
        }
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.shape.contains(&Point::new(x, y))
    }
}

/// First contact of `state` at its current pose
pub fn detect(state: &VehicleState, track: &Track, obstacles: &[Obstacle]) -> Contact {
    let (x, y) = state.position();
    if !track.contains(x, y) {
        return Contact::Boundary;
    }

    let shape = state.shape();
    if shape.intersects(track.outer_ring()) || shape.intersects(track.inner_ring()) {
        return Contact::Overhang;
    }

    obstacles
        .iter()
        .find(|o| o.id != state.id && shape.intersects(&o.shape))
        .map_or(Contact::Clear, |o| Contact::Vehicle(o.id))
}

/// Check the move that produced `state` from `before` and undo it on
/// contact according to `policy`.
pub fn resolve(
    before: &Pose,
    state: &mut VehicleState,
    track: &Track,
    obstacles: &[Obstacle],
    policy: CollisionPolicy,
) -> Contact {
    let contact = detect(state, track, obstacles);
    if contact.is_clear() {
        return contact;
    }

    debug!(
        vehicle = state.id.0,
        ?contact,
        x = state.pose.x,
        y = state.pose.y,
        "move rejected"
    );

    state.pose.x = before.x;
    state.pose.y = before.y;
    state.pose.heading = before.heading;
    state.speed = match policy {
        CollisionPolicy::StopAndRevert => 0.0,
        CollisionPolicy::Bounce => (-state.speed)
            .clamp(-state.tuning.max_reverse_speed(), state.tuning.max_speed),
    };
    state.collisions += 1;

    contact
}
