pub mod collision;
pub mod grid;
pub mod perception;
pub mod physics;
pub mod progress;
pub mod race;

pub use collision::{CollisionPolicy, Contact, Obstacle, detect, resolve};
pub use grid::{GridLayout, starting_grid};
pub use perception::{
    FEATURE_COUNT, Hit, HitKind, Perception, RAY_ANGLES, RayReading, SensorSettings, cast_ray,
    cast_rays, perceive,
};
pub use physics::integrate;
pub use progress::{ProgressEvent, ProgressRule, ProgressTarget, next_target, update_progress};
pub use race::{Constant, Driver, Race, Standing, TickReport};
