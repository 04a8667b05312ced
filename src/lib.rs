//! lapsim - Headless lap simulation on a closed 2-D track
//!
//! Vehicles race around the annulus between two boundary polygons. Each
//! tick integrates their motion, undoes moves that leave the track or hit
//! another vehicle, records checkpoint and finish crossings, and casts
//! eight distance rays per vehicle for whatever policy is driving it.

pub mod config;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod sim;

pub use config::SimConfig;
pub use error::{Result, SimError};
