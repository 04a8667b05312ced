use thiserror::Error;

/// Errors raised while setting up a race.
///
/// Nothing here is produced per tick: collisions and out-of-bounds rays are
/// ordinary simulation outcomes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Track or vehicle shape cannot be used (too few points, zero area,
    /// inner boundary not inside the outer one, coincident gate anchors).
    #[error("invalid track geometry: {0}")]
    InvalidTrackGeometry(String),

    /// Every identity slot of the registry is already taken.
    #[error("no vehicle identity left (registry holds {capacity} slots)")]
    ResourceExhausted { capacity: usize },

    /// A tuning or sensor value outside its usable range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("unknown action: {0:?}")]
    UnknownAction(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
