use serde::Serialize;

use crate::error::{Result, SimError};

/// Identity slots handed out by default, one per car sprite colour
pub const DEFAULT_PALETTE: [&str; 5] = ["red", "white", "green", "grey", "purple"];

/// A claimed identity slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub slot: usize,
    pub name: String,
}

/// Race-scoped pool of vehicle identities.
///
/// Each race owns its own registry, so slots never leak between sessions.
#[derive(Debug, Clone)]
pub struct VehicleRegistry {
    slots: Vec<String>,
    claimed: usize,
}

impl VehicleRegistry {
    pub fn new(slots: Vec<String>) -> Self {
        Self { slots, claimed: 0 }
    }

    pub fn with_default_palette() -> Self {
        Self::new(DEFAULT_PALETTE.iter().map(|s| s.to_string()).collect())
    }

    /// Claim the next free slot
    pub fn claim(&mut self) -> Result<Identity> {
        let name = self
            .slots
            .get(self.claimed)
            .cloned()
            .ok_or(SimError::ResourceExhausted {
                capacity: self.slots.len(),
            })?;
        let identity = Identity {
            slot: self.claimed,
            name,
        };
        self.claimed += 1;
        Ok(identity)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn remaining(&self) -> usize {
        self.slots.len() - self.claimed
    }
}

impl Default for VehicleRegistry {
    fn default() -> Self {
        Self::with_default_palette()
    }
}
