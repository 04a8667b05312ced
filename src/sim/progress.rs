//! Checkpoint and finish tracking.
//!
//! A vehicle goes from racing to finished exactly once. Checkpoints are
//! recorded at most once each and never forgotten.

use geo::Intersects;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Track, VehicleId, VehicleState};
use crate::geometry::distance;

fn default_radius() -> f64 {
    40.0
}

/// How checkpoints count as reached
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ProgressRule {
    /// Any unvisited checkpoint whose gate overlaps the footprint, in any order
    #[default]
    GateOverlap,
    /// Only the checkpoint at the cursor, reached when the centre is closer
    /// than `radius`
    Sequential {
        #[serde(default = "default_radius")]
        radius: f64,
    },
}

/// What a vehicle should head for next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressTarget {
    Checkpoint(usize),
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Checkpoint {
        vehicle: VehicleId,
        index: usize,
        tick: u64,
    },
    Finished {
        vehicle: VehicleId,
        tick: u64,
    },
}

/// Next target of `state` and its position.
///
/// Under [`ProgressRule::GateOverlap`] this is the nearest unvisited
/// checkpoint; under [`ProgressRule::Sequential`] the one at the cursor.
/// Once no checkpoint is left the finish point is the target.
pub fn next_target(
    state: &VehicleState,
    track: &Track,
    rule: &ProgressRule,
) -> (ProgressTarget, (f64, f64)) {
    let checkpoints = track.checkpoints();
    let position = state.position();

    let next = match rule {
        ProgressRule::GateOverlap => checkpoints
            .iter()
            .enumerate()
            .filter(|(i, _)| !state.has_visited(*i))
            .min_by(|(_, a), (_, b)| {
                distance(position, **a)
                    .partial_cmp(&distance(position, **b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, &point)| (i, point)),
        ProgressRule::Sequential { .. } => checkpoints
            .get(state.checkpoint_cursor)
            .map(|&point| (state.checkpoint_cursor, point)),
    };

    match next {
        Some((i, point)) => (ProgressTarget::Checkpoint(i), point),
        None => (ProgressTarget::Finish, track.finish_point()),
    }
}

/// Record checkpoints and the finish reached by `state` at its current pose.
///
/// Finished vehicles are left untouched.
pub fn update_progress(
    state: &mut VehicleState,
    track: &Track,
    rule: &ProgressRule,
    tick: u64,
) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    if state.is_finished() {
        return events;
    }

    match *rule {
        ProgressRule::GateOverlap => {
            let shape = state.shape();
            for (index, gate) in track.checkpoint_gates().iter().enumerate() {
                if !state.has_visited(index) && shape.intersects(gate.shape()) {
                    state.visit(index);
                    events.push(ProgressEvent::Checkpoint {
                        vehicle: state.id,
                        index,
                        tick,
                    });
                }
            }
        }
        ProgressRule::Sequential { radius } => {
            let index = state.checkpoint_cursor;
            if let Some(&checkpoint) = track.checkpoints().get(index) {
                let d = distance(state.position(), checkpoint);
                if d < radius {
                    state.checkpoint_cursor += 1;
                    state.progress_distance += d;
                    if state.visit(index) {
                        events.push(ProgressEvent::Checkpoint {
                            vehicle: state.id,
                            index,
                            tick,
                        });
                    }
                }
            }
        }
    }

    for event in &events {
        if let ProgressEvent::Checkpoint { index, .. } = event {
            info!(vehicle = state.id.0, checkpoint = index, tick, "checkpoint reached");
        }
    }

    if state.visited_checkpoints().len() >= track.checkpoints().len()
        && state.shape().intersects(track.finish_gate().shape())
        && state.finish(tick)
    {
        info!(vehicle = state.id.0, tick, "finished");
        events.push(ProgressEvent::Finished {
            vehicle: state.id,
            tick,
        });
    }

    events
}
