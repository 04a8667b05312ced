pub mod action;
pub mod registry;
pub mod track;
pub mod vehicle;

pub use action::{Action, Controls, Steer, Throttle};
pub use registry::{DEFAULT_PALETTE, Identity, VehicleRegistry};
pub use track::{FinishLine, Gate, Track, TrackData};
pub use vehicle::{Footprint, Pose, Tuning, VehicleId, VehicleState};
