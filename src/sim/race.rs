//! Multi-vehicle tick loop.

use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use super::collision::{Contact, Obstacle, resolve};
use super::grid::starting_grid;
use super::perception::{Perception, perceive};
use super::physics::integrate;
use super::progress::{ProgressEvent, ProgressTarget, next_target, update_progress};
use crate::config::SimConfig;
use crate::domain::{Action, Pose, Track, VehicleId, VehicleRegistry, VehicleState};
use crate::error::{Result, SimError};
use crate::geometry::distance;

/// A control policy: picks the next action from what a vehicle perceives
pub trait Driver {
    fn act(&mut self, perception: &Perception) -> Action;
}

impl<F> Driver for F
where
    F: FnMut(&Perception) -> Action,
{
    fn act(&mut self, perception: &Perception) -> Action {
        self(perception)
    }
}

/// Driver that repeats one action forever
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub Action);

impl Driver for Constant {
    fn act(&mut self, _perception: &Perception) -> Action {
        self.0
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    /// Rejected moves only
    pub contacts: Vec<(VehicleId, Contact)>,
    pub events: Vec<ProgressEvent>,
    /// One per vehicle still racing after the tick, in id order
    pub perceptions: Vec<Perception>,
}

/// Ranking entry returned by [`Race::standings`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub position: usize,
    pub vehicle: VehicleId,
    pub name: String,
    pub finished_at: Option<u64>,
    pub visited: usize,
    pub target: ProgressTarget,
    pub distance_to_target: f64,
}

pub struct Race {
    track: Arc<Track>,
    config: SimConfig,
    registry: VehicleRegistry,
    vehicles: Vec<VehicleState>,
    tick: u64,
}

impl Race {
    pub fn new(track: Arc<Track>, config: SimConfig) -> Result<Self> {
        config.validate()?;
        let registry = VehicleRegistry::new(config.race.palette.clone());
        Ok(Self {
            track,
            config,
            registry,
            vehicles: Vec::new(),
            tick: 0,
        })
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Add a vehicle at `pose` with the next free identity.
    ///
    /// The footprint comes from `[vehicle]` when set, otherwise it is sized
    /// from the track width at the finish line.
    pub fn spawn(&mut self, pose: Pose) -> Result<VehicleId> {
        let footprint = self
            .config
            .vehicle
            .footprint
            .clone()
            .unwrap_or_else(|| self.config.grid.footprint(&self.track));
        footprint.validate()?;
        let identity = self.registry.claim()?;
        let id = VehicleId(self.vehicles.len());
        let state = VehicleState::new(id, identity, pose, self.config.physics, footprint)?;
        debug!(vehicle = id.0, name = %state.identity.name, x = pose.x, y = pose.y, "spawned");
        self.vehicles.push(state);
        Ok(id)
    }

    /// Spawn `count` vehicles on the starting grid behind the finish line
    pub fn spawn_grid(&mut self, count: usize) -> Result<Vec<VehicleId>> {
        if count > self.registry.remaining() {
            return Err(SimError::ResourceExhausted {
                capacity: self.registry.capacity(),
            });
        }
        starting_grid(&self.track, count, &self.config.grid)
            .into_iter()
            .map(|pose| self.spawn(pose))
            .collect()
    }

    /// Advance every racing vehicle by one tick.
    ///
    /// `actions[i]` drives vehicle `i`; missing entries coast and entries
    /// for finished vehicles are ignored.
    pub fn step(&mut self, actions: &[Action]) -> TickReport {
        let tick = self.tick + 1;
        let mut contacts = Vec::new();
        let mut events = Vec::new();

        for i in 0..self.vehicles.len() {
            if self.vehicles[i].is_finished() {
                continue;
            }
            let obstacles = self.obstacles_except(self.vehicles[i].id);
            let action = actions.get(i).copied().unwrap_or_default();

            let state = &mut self.vehicles[i];
            let before = state.pose;
            integrate(state, action);
            let contact = resolve(
                &before,
                state,
                &self.track,
                &obstacles,
                self.config.race.collision_policy,
            );
            if !contact.is_clear() {
                contacts.push((state.id, contact));
            }
            events.extend(update_progress(
                state,
                &self.track,
                &self.config.race.progress,
                tick,
            ));
        }

        self.tick = tick;
        TickReport {
            tick,
            contacts,
            events,
            perceptions: self.perceptions(),
        }
    }

    /// Ask one driver per vehicle for its action, then step.
    ///
    /// `drivers[i]` drives vehicle `i`; vehicles without a driver coast.
    pub fn drive(&mut self, drivers: &mut [Box<dyn Driver>]) -> TickReport {
        let mut actions = vec![Action::Coast; self.vehicles.len()];
        for perception in self.perceptions() {
            if let Some(driver) = drivers.get_mut(perception.vehicle.0) {
                actions[perception.vehicle.0] = driver.act(&perception);
            }
        }
        self.step(&actions)
    }

    /// Perceptions of every racing vehicle at the current state
    pub fn perceptions(&self) -> Vec<Perception> {
        let obstacles = self.active_obstacles();
        self.vehicles
            .iter()
            .filter(|v| !v.is_finished())
            .map(|v| {
                perceive(
                    v,
                    &self.track,
                    &obstacles,
                    &self.config.sensor,
                    &self.config.race.progress,
                )
            })
            .collect()
    }

    pub fn vehicles(&self) -> &[VehicleState] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&VehicleState> {
        self.vehicles.get(id.0)
    }

    /// Ticks simulated so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.tick as f64 / self.config.race.tick_rate
    }

    /// True once every spawned vehicle has finished
    pub fn is_over(&self) -> bool {
        !self.vehicles.is_empty() && self.vehicles.iter().all(VehicleState::is_finished)
    }

    /// Finished vehicles first by finishing tick, then the rest by
    /// checkpoints visited and closeness to their next target
    pub fn standings(&self) -> Vec<Standing> {
        let mut rows: Vec<Standing> = self
            .vehicles
            .iter()
            .map(|v| {
                let (target, point) = next_target(v, &self.track, &self.config.race.progress);
                Standing {
                    position: 0,
                    vehicle: v.id,
                    name: v.identity.name.clone(),
                    finished_at: v.finished_at(),
                    visited: v.visited_checkpoints().len(),
                    target,
                    distance_to_target: distance(v.position(), point),
                }
            })
            .collect();

        rows.sort_by(compare_standings);
        for (i, row) in rows.iter_mut().enumerate() {
            row.position = i + 1;
        }
        rows
    }

    fn active_obstacles(&self) -> Vec<Obstacle> {
        self.vehicles
            .iter()
            .filter(|v| !v.is_finished())
            .map(Obstacle::of)
            .collect()
    }

    fn obstacles_except(&self, id: VehicleId) -> Vec<Obstacle> {
        self.vehicles
            .iter()
            .filter(|v| !v.is_finished() && v.id != id)
            .map(Obstacle::of)
            .collect()
    }
}

fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    match (a.finished_at, b.finished_at) {
        (Some(ta), Some(tb)) => ta.cmp(&tb).then(a.vehicle.cmp(&b.vehicle)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b
            .visited
            .cmp(&a.visited)
            .then(
                a.distance_to_target
                    .partial_cmp(&b.distance_to_target)
                    .unwrap_or(Ordering::Equal),
            )
            .then(a.vehicle.cmp(&b.vehicle)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FinishLine, Footprint, TrackData};
    use crate::sim::HitKind;
    use geo::Intersects;

    fn ring(min: f64, max: f64) -> Vec<(f64, f64)> {
        let mid = (min + max) / 2.0;
        vec![
            (min, min),
            (mid, min),
            (max, min),
            (max, mid),
            (max, max),
            (mid, max),
            (min, max),
            (min, mid),
        ]
    }

    fn track() -> Arc<Track> {
        Arc::new(
            Track::new(
                TrackData {
                    outer_points: ring(0.0, 400.0),
                    inner_points: ring(100.0, 300.0),
                    checkpoints: vec![(350.0, 200.0), (200.0, 350.0), (50.0, 200.0)],
                    finish_line: FinishLine {
                        point: (200.0, 50.0),
                    },
                },
                25.0,
            )
            .unwrap(),
        )
    }

    fn config() -> SimConfig {
        let mut config = SimConfig::default();
        config.vehicle.footprint = Some(Footprint::Rectangle {
            length: 30.0,
            width: 20.0,
        });
        config
    }

    #[test]
    fn test_spawn_claims_identities_until_exhausted() {
        let mut race = Race::new(track(), config()).unwrap();
        let ids = race.spawn_grid(5).unwrap();
        assert_eq!(ids, (0..5).map(VehicleId).collect::<Vec<_>>());
        assert_eq!(race.vehicles()[1].identity.name, "white");
        assert!(matches!(
            race.spawn(Pose::new(50.0, 200.0, 90.0)),
            Err(SimError::ResourceExhausted { capacity: 5 })
        ));
    }

    #[test]
    fn test_spawn_grid_checks_capacity_up_front() {
        let mut race = Race::new(track(), config()).unwrap();
        assert!(race.spawn_grid(6).is_err());
        assert!(race.vehicles().is_empty());
    }

    #[test]
    fn test_rejected_footprint_keeps_identity_free() {
        let mut race = Race::new(track(), config()).unwrap();
        race.config.vehicle.footprint = Some(Footprint::Rectangle {
            length: 10.0,
            width: 0.0,
        });
        assert!(matches!(
            race.spawn(Pose::new(50.0, 300.0, 90.0)),
            Err(SimError::InvalidTrackGeometry(_))
        ));
        assert!(race.vehicles().is_empty());

        race.config.vehicle.footprint = config().vehicle.footprint;
        race.spawn(Pose::new(50.0, 300.0, 90.0)).unwrap();
        assert_eq!(race.vehicles()[0].identity.slot, 0);
        assert_eq!(race.spawn_grid(4).unwrap().len(), 4);
    }

    #[test]
    fn test_grid_footprint_from_track_width() {
        let mut race = Race::new(track(), SimConfig::default()).unwrap();
        race.spawn_grid(1).unwrap();
        assert_eq!(
            race.vehicles()[0].footprint,
            Footprint::Rectangle {
                length: 40.0,
                width: 20.0
            }
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = config();
        config.sensor.step = 0.0;
        assert!(matches!(
            Race::new(track(), config),
            Err(SimError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_step_advances_tick_and_reports_perceptions() {
        let mut race = Race::new(track(), config()).unwrap();
        race.spawn(Pose::new(50.0, 300.0, 90.0)).unwrap();
        race.spawn(Pose::new(350.0, 300.0, 90.0)).unwrap();

        let report = race.step(&[Action::Accelerate]);
        assert_eq!(report.tick, 1);
        assert_eq!(race.tick(), 1);
        assert_eq!(report.perceptions.len(), 2);
        assert!(report.contacts.is_empty());
        // Vehicle 0 accelerated up the screen, vehicle 1 had no action
        assert!(race.vehicles()[0].pose.y < 300.0);
        assert_eq!(race.vehicles()[1].speed, 0.0);
        assert!((race.elapsed_secs() - 1.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_vehicles_block_each_other() {
        let mut race = Race::new(track(), config()).unwrap();
        race.spawn(Pose::new(50.0, 300.0, 90.0)).unwrap();
        race.spawn(Pose::new(50.0, 269.0, 90.0)).unwrap();
        race.vehicles[0].speed = 5.0;

        let report = race.step(&[Action::Coast, Action::Coast]);
        assert_eq!(report.contacts, vec![(VehicleId(0), Contact::Vehicle(VehicleId(1)))]);
        assert_eq!(race.vehicles()[0].pose, Pose::new(50.0, 300.0, 90.0));
        assert_eq!(race.vehicles()[0].speed, 0.0);
    }

    #[test]
    fn test_finished_vehicle_is_frozen_and_ignored() {
        let mut race = Race::new(track(), config()).unwrap();
        race.spawn(Pose::new(200.0, 50.0, 90.0)).unwrap();
        race.spawn(Pose::new(50.0, 300.0, 90.0)).unwrap();
        for i in 0..3 {
            race.vehicles[0].visit(i);
        }

        let report = race.step(&[]);
        assert_eq!(
            report.events,
            vec![ProgressEvent::Finished {
                vehicle: VehicleId(0),
                tick: 1
            }]
        );
        assert_eq!(report.perceptions.len(), 1);
        assert_eq!(report.perceptions[0].vehicle, VehicleId(1));

        let pose = race.vehicles()[0].pose;
        race.step(&[Action::Accelerate, Action::Coast]);
        assert_eq!(race.vehicles()[0].pose, pose);
        assert_eq!(race.vehicles()[0].finished_at(), Some(1));
        assert!(!race.is_over());
    }

    #[test]
    fn test_finished_vehicle_is_invisible_to_others() {
        let mut config = config();
        config.physics.acceleration = 10.0;
        let mut race = Race::new(track(), config).unwrap();
        // Both face -x along the top lane, vehicle 1 parked right behind
        // vehicle 0, which sits on the finish gate
        race.spawn(Pose::new(200.0, 50.0, 180.0)).unwrap();
        race.spawn(Pose::new(235.0, 50.0, 180.0)).unwrap();
        for i in 0..3 {
            race.vehicles[0].visit(i);
        }

        let report = race.step(&[]);
        assert!(race.vehicles()[0].is_finished());
        assert_eq!(report.perceptions.len(), 1);
        let front = report.perceptions[0].rays[0];
        assert!(front.car_hit.is_none());
        assert_eq!(front.kind, HitKind::Border);
        assert!(front.distance > 200.0, "front: {}", front.distance);

        let report = race.step(&[Action::Coast, Action::Accelerate]);
        assert!(report.contacts.is_empty());
        assert_eq!(race.vehicles()[1].collisions, 0);
        assert!(race.vehicles()[1].pose.x < 235.0);
        assert!(race.vehicles()[1].shape().intersects(&race.vehicles()[0].shape()));
    }

    #[test]
    fn test_standings_order() {
        let mut race = Race::new(track(), config()).unwrap();
        race.spawn(Pose::new(50.0, 300.0, 90.0)).unwrap();
        race.spawn(Pose::new(50.0, 240.0, 90.0)).unwrap();
        race.spawn(Pose::new(350.0, 300.0, 90.0)).unwrap();
        race.spawn(Pose::new(200.0, 50.0, 90.0)).unwrap();
        race.vehicles[2].visit(0);
        for i in 0..3 {
            race.vehicles[3].visit(i);
        }
        race.vehicles[3].finish(7);

        let order: Vec<usize> = race.standings().iter().map(|s| s.vehicle.0).collect();
        // Finished first, then most checkpoints, then nearest to target
        assert_eq!(order, vec![3, 2, 1, 0]);
        assert_eq!(race.standings()[0].position, 1);
    }

    #[test]
    fn test_drive_uses_closures() {
        let mut race = Race::new(track(), config()).unwrap();
        race.spawn(Pose::new(50.0, 300.0, 90.0)).unwrap();
        let mut drivers: Vec<Box<dyn Driver>> = vec![Box::new(|p: &Perception| {
            if p.border_distances[0] > 50.0 {
                Action::Accelerate
            } else {
                Action::Brake
            }
        })];
        race.drive(&mut drivers);
        assert!(race.vehicles()[0].speed > 0.0);

        let mut drivers: Vec<Box<dyn Driver>> = vec![Box::new(Constant(Action::TurnLeft))];
        race.drive(&mut drivers);
        assert_eq!(race.vehicles()[0].pose.heading, 95.0);
    }
}
