//! Ray-marched distance sensing.
//!
//! Eight rays leave the vehicle centre at fixed angles relative to its
//! heading. Each ray is sampled every `step` units and records the first
//! sample inside another vehicle and the first sample off the track, then
//! reports whichever came first (the border wins ties).

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::collision::Obstacle;
use super::progress::{ProgressRule, ProgressTarget, next_target};
use crate::domain::{Track, VehicleId, VehicleState};
use crate::geometry::{bearing_degrees, distance, normalize_degrees, signed_degrees};

/// Ray angles in degrees, clockwise on screen from the heading:
/// front, front-right, right, back-right, back, back-left, left, front-left
pub const RAY_ANGLES: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

/// Length of [`Perception::features`]
pub const FEATURE_COUNT: usize = 20;

fn default_step() -> f64 {
    1.0
}
fn default_max_length() -> f64 {
    1000.0
}

/// Ray marching parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSettings {
    #[serde(default = "default_step")]
    pub step: f64,
    #[serde(default = "default_max_length")]
    pub max_length: f64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            step: default_step(),
            max_length: default_max_length(),
        }
    }
}

/// A sample where a ray met something
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hit {
    pub distance: f64,
    pub point: (f64, f64),
}

/// Which hit a ray reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    Border,
    Vehicle,
    /// Nothing within `max_length`
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RayReading {
    /// Angle relative to the heading, degrees
    pub angle: f64,
    pub distance: f64,
    pub endpoint: (f64, f64),
    pub kind: HitKind,
    pub car_hit: Option<Hit>,
    pub border_hit: Option<Hit>,
}

/// Walk one ray from `origin` along absolute screen angle `direction_deg`
/// (measured clockwise on screen from +x).
pub fn cast_ray(
    origin: (f64, f64),
    direction_deg: f64,
    relative_angle: f64,
    track: &Track,
    obstacles: &[Obstacle],
    settings: &SensorSettings,
) -> RayReading {
    let rad = direction_deg.to_radians();
    let (dx, dy) = (rad.cos(), rad.sin());
    let at = |length: f64| (origin.0 + dx * length, origin.1 + dy * length);

    let mut car_hit: Option<Hit> = None;
    let mut border_hit: Option<Hit> = None;
    let mut last_in_bounds = origin;

    let mut i: u32 = 0;
    loop {
        let length = f64::from(i) * settings.step;
        if length >= settings.max_length {
            break;
        }
        let point = at(length);

        if !track.in_bounds(point.0, point.1) {
            if border_hit.is_none() {
                border_hit = Some(Hit {
                    distance: distance(origin, last_in_bounds),
                    point: last_in_bounds,
                });
            }
            break;
        }
        last_in_bounds = point;

        if car_hit.is_none() && obstacles.iter().any(|o| o.contains_point(point.0, point.1)) {
            car_hit = Some(Hit {
                distance: length,
                point,
            });
        }

        if border_hit.is_none() && !track.contains(point.0, point.1) {
            border_hit = Some(Hit {
                distance: length,
                point,
            });
        }

        if car_hit.is_some() && border_hit.is_some() {
            break;
        }
        i += 1;
    }

    let (kind, winner) = match (car_hit, border_hit) {
        (Some(car), Some(border)) if car.distance < border.distance => (HitKind::Vehicle, car),
        (_, Some(border)) => (HitKind::Border, border),
        (Some(car), None) => (HitKind::Vehicle, car),
        (None, None) => (
            HitKind::Open,
            Hit {
                distance: settings.max_length,
                point: at(settings.max_length),
            },
        ),
    };

    RayReading {
        angle: relative_angle,
        distance: winner.distance,
        endpoint: winner.point,
        kind,
        car_hit,
        border_hit,
    }
}

/// Cast all eight rays from the centre of `state`
pub fn cast_rays(
    state: &VehicleState,
    track: &Track,
    obstacles: &[Obstacle],
    settings: &SensorSettings,
) -> [RayReading; 8] {
    let origin = state.position();
    let others: Vec<Obstacle> = obstacles
        .iter()
        .filter(|o| o.id != state.id)
        .cloned()
        .collect();

    RAY_ANGLES.map(|angle| {
        let reading = cast_ray(
            origin,
            angle - state.pose.heading,
            angle,
            track,
            &others,
            settings,
        );
        trace!(
            vehicle = state.id.0,
            angle,
            distance = reading.distance,
            kind = ?reading.kind,
            "ray"
        );
        reading
    })
}

/// Everything a control policy sees about one vehicle in one tick
#[derive(Debug, Clone, Serialize)]
pub struct Perception {
    pub vehicle: VehicleId,
    pub rays: [RayReading; 8],
    /// Distance to the track border per ray, `max_length` if none
    pub border_distances: [f64; 8],
    /// Distance to another vehicle per ray, if one was seen
    pub car_distances: [Option<f64>; 8],
    /// Reported end of each ray
    pub endpoints: [(f64, f64); 8],
    pub visited: usize,
    pub target: ProgressTarget,
    /// Distance from the vehicle to `target`
    pub progress: f64,
    /// Heading in `[0, 360)`
    pub heading: f64,
    /// Turn needed to face `target`, degrees in `(-180, 180]`, positive
    /// meaning counter-clockwise (a left turn)
    pub heading_offset: f64,
    #[serde(skip)]
    max_length: f64,
}

impl Perception {
    /// Flatten into a fixed-length input vector: 8 border distances,
    /// 8 vehicle distances (absent as `max_length`), visited count,
    /// progress, heading, heading offset.
    pub fn features(&self) -> Vec<f64> {
        let mut features = Vec::with_capacity(FEATURE_COUNT);
        features.extend(self.border_distances);
        features.extend(self.car_distances.map(|d| d.unwrap_or(self.max_length)));
        features.push(self.visited as f64);
        features.push(self.progress);
        features.push(self.heading);
        features.push(self.heading_offset);
        features
    }
}

/// Build the perception record for `state`
pub fn perceive(
    state: &VehicleState,
    track: &Track,
    obstacles: &[Obstacle],
    settings: &SensorSettings,
    rule: &ProgressRule,
) -> Perception {
    let rays = cast_rays(state, track, obstacles, settings);
    let (target, target_point) = next_target(state, track, rule);
    let position = state.position();
    let heading = normalize_degrees(state.pose.heading);
    let heading_offset = bearing_degrees(position, target_point)
        .map(|bearing| signed_degrees(bearing - heading))
        .unwrap_or(0.0);

    Perception {
        vehicle: state.id,
        border_distances: rays.map(|r| r.border_hit.map_or(settings.max_length, |h| h.distance)),
        car_distances: rays.map(|r| r.car_hit.map(|h| h.distance)),
        endpoints: rays.map(|r| r.endpoint),
        rays,
        visited: state.visited_checkpoints().len(),
        target,
        progress: distance(position, target_point),
        heading,
        heading_offset,
        max_length: settings.max_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FinishLine, Footprint, Identity, Pose, TrackData, Tuning};

    fn square(min: f64, max: f64) -> Vec<(f64, f64)> {
        vec![(min, min), (max, min), (max, max), (min, max)]
    }

    /// Lap of 400 x 400 around a 200 x 200 hole, lanes 100 wide
    fn track() -> Track {
        Track::new(
            TrackData {
                outer_points: square(0.0, 400.0),
                inner_points: square(100.0, 300.0),
                checkpoints: vec![(350.0, 200.0), (200.0, 350.0)],
                finish_line: FinishLine {
                    point: (200.0, 50.0),
                },
            },
            25.0,
        )
        .unwrap()
    }

    fn car(id: usize, x: f64, y: f64, heading: f64) -> VehicleState {
        VehicleState::new(
            VehicleId(id),
            Identity {
                slot: id,
                name: format!("car{id}"),
            },
            Pose::new(x, y, heading),
            Tuning::default(),
            Footprint::Rectangle {
                length: 20.0,
                width: 10.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_rays_measure_lane_walls() {
        let t = track();
        let rays = cast_rays(&car(0, 200.0, 40.0, 0.0), &t, &[], &SensorSettings::default());
        // Right (down the screen) reaches the hole at y = 100
        assert_eq!(rays[2].kind, HitKind::Border);
        assert!((rays[2].distance - 60.0).abs() <= 1.0);
        // Left (up the screen) reaches the outer wall at y = 0
        assert!((rays[6].distance - 40.0).abs() <= 1.5);
        // Front runs to the outer wall at x = 400
        assert!((rays[0].distance - 200.0).abs() <= 1.5);
        assert!(rays.iter().all(|r| r.car_hit.is_none()));
    }

    #[test]
    fn test_ray_angles_follow_heading() {
        let t = track();
        // Facing up the screen: the front ray meets the outer wall at y = 0
        let rays = cast_rays(&car(0, 50.0, 200.0, 90.0), &t, &[], &SensorSettings::default());
        assert!((rays[0].distance - 200.0).abs() <= 1.5);
        // Right side now points to +x, toward the hole at x = 100
        assert!((rays[2].distance - 50.0).abs() <= 1.0);
    }

    #[test]
    fn test_vehicle_closer_than_border_wins() {
        let t = track();
        let me = car(0, 150.0, 50.0, 0.0);
        // Other car's rear edge 30 units ahead of my centre
        let other = Obstacle::of(&car(1, 190.0, 50.0, 0.0));
        let rays = cast_rays(&me, &t, &[other], &SensorSettings::default());

        let front = rays[0];
        assert_eq!(front.kind, HitKind::Vehicle);
        assert!((front.distance - 30.0).abs() <= 1.0);
        assert_eq!(front.endpoint, front.car_hit.unwrap().point);
        // The border beyond the car is still recorded
        assert!(front.border_hit.unwrap().distance > front.distance);
    }

    #[test]
    fn test_equal_hits_resolve_to_border() {
        let t = track();
        // A car straddles the hole's left edge at x = 100; with a coarse
        // step the first sample past the edge is inside both at once
        let blocker = Obstacle::of(&car(1, 100.0, 200.0, 0.0));
        let settings = SensorSettings {
            step: 25.0,
            max_length: 1000.0,
        };
        let reading = cast_ray((80.0, 200.0), 0.0, 0.0, &t, &[blocker], &settings);
        assert_eq!(reading.car_hit.unwrap().distance, 25.0);
        assert_eq!(reading.border_hit.unwrap().distance, 25.0);
        assert_eq!(reading.kind, HitKind::Border);
        assert_eq!(reading.endpoint, reading.border_hit.unwrap().point);
    }

    #[test]
    fn test_ray_leaving_bounds_stops_at_last_sample() {
        let t = track();
        // Origin next to the outer wall; a coarse step jumps straight out
        // of the bounding box
        let settings = SensorSettings {
            step: 30.0,
            max_length: 1000.0,
        };
        let reading = cast_ray((390.0, 200.0), 0.0, 0.0, &t, &[], &settings);
        assert_eq!(reading.kind, HitKind::Border);
        assert_eq!(reading.endpoint, (390.0, 200.0));
        assert_eq!(reading.distance, 0.0);
    }

    #[test]
    fn test_walk_stops_at_arena_edge_after_border() {
        let t = track();
        // Border is found at the hole; the ray then crosses the hole and
        // reaches the outer wall, where it stops short of a car parked
        // beyond the arena
        let outside = Obstacle::of(&car(1, 420.0, 200.0, 0.0));
        let reading = cast_ray(
            (50.0, 200.0),
            0.0,
            0.0,
            &t,
            &[outside],
            &SensorSettings::default(),
        );
        assert_eq!(reading.kind, HitKind::Border);
        let border = reading.border_hit.unwrap().distance;
        assert!((50.0..=51.0).contains(&border), "border: {border}");
        assert!(reading.car_hit.is_none());
    }

    #[test]
    fn test_open_ray_reports_max_length() {
        let t = track();
        let settings = SensorSettings {
            step: 1.0,
            max_length: 20.0,
        };
        let reading = cast_ray((50.0, 200.0), -90.0, 270.0, &t, &[], &settings);
        assert_eq!(reading.kind, HitKind::Open);
        assert_eq!(reading.distance, 20.0);
        assert!((reading.endpoint.1 - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_distances_within_range() {
        let t = track();
        let settings = SensorSettings::default();
        for &(x, y) in &[(50.0, 50.0), (350.0, 350.0), (200.0, 50.0), (50.0, 300.0)] {
            for heading in [0.0, 33.0, 180.0, 271.0] {
                let p = perceive(&car(0, x, y, heading), &t, &[], &settings, &ProgressRule::default());
                for r in p.rays {
                    assert!(r.distance >= 0.0 && r.distance <= settings.max_length);
                }
            }
        }
    }

    #[test]
    fn test_perception_compass_points_at_nearest_checkpoint() {
        let t = track();
        // Checkpoint (350, 200) is straight down the screen from (350, 100)
        let me = car(0, 350.0, 100.0, 0.0);
        let p = perceive(&me, &t, &[], &SensorSettings::default(), &ProgressRule::default());
        assert_eq!(p.target, ProgressTarget::Checkpoint(0));
        assert!((p.progress - 100.0).abs() < 1e-9);
        // Target is a right turn of 90 degrees
        assert!((p.heading_offset + 90.0).abs() < 1e-9);
        assert_eq!(p.visited, 0);
    }

    #[test]
    fn test_features_layout() {
        let t = track();
        let me = car(0, 150.0, 50.0, 0.0);
        let other = Obstacle::of(&car(1, 190.0, 50.0, 0.0));
        let settings = SensorSettings::default();
        let p = perceive(&me, &t, &[other], &settings, &ProgressRule::default());
        let f = p.features();
        assert_eq!(f.len(), FEATURE_COUNT);
        assert_eq!(f[0], p.border_distances[0]);
        assert!((f[8] - 30.0).abs() <= 1.0);
        assert_eq!(f[9], settings.max_length);
        assert_eq!(f[19], p.heading_offset);
    }
}
