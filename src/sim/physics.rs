//! Per-tick motion integration.
//!
//! Order within a tick: steering, throttle, friction (only without
//! throttle), turn slowdown (only while steering), then position. The
//! integrator never rejects a move; the collision resolver compares the
//! state before and after this step.

use crate::domain::{Controls, Steer, Throttle, VehicleState};
use crate::geometry::heading_vector;

/// Advance `state` by one tick of `controls`.
///
/// Only `pose` and `speed` change.
pub fn integrate(state: &mut VehicleState, controls: impl Into<Controls>) {
    let controls = controls.into();
    let tuning = state.tuning;

    let turning = match controls.steer {
        Some(Steer::Left) => {
            state.pose.heading += tuning.turn_step;
            true
        }
        Some(Steer::Right) => {
            state.pose.heading -= tuning.turn_step;
            true
        }
        None => false,
    };

    match controls.throttle {
        Some(Throttle::Accelerate) => {
            state.speed = (state.speed + tuning.acceleration).min(tuning.max_speed);
        }
        Some(Throttle::Brake) => {
            state.speed = (state.speed - tuning.acceleration).max(-tuning.max_reverse_speed());
        }
        None => state.speed = decay_toward_zero(state.speed, tuning.friction),
    }

    if turning {
        state.speed = decay_toward_zero(state.speed, tuning.turn_slowdown);
    }

    let (dx, dy) = heading_vector(state.pose.heading);
    state.pose.x += state.speed * dx;
    state.pose.y += state.speed * dy;
}

/// Move `speed` toward zero by `amount` without crossing it
fn decay_toward_zero(speed: f64, amount: f64) -> f64 {
    if speed > 0.0 {
        (speed - amount).max(0.0)
    } else if speed < 0.0 {
        (speed + amount).min(0.0)
    } else {
        speed
    }
}
