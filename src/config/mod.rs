use anyhow::{Context, Result as AnyResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::domain::{DEFAULT_PALETTE, Footprint, Tuning};
use crate::error::{Result, SimError};
use crate::sim::{CollisionPolicy, GridLayout, ProgressRule, SensorSettings};

fn default_gate_depth() -> f64 {
    25.0
}
fn default_tick_rate() -> f64 {
    60.0
}
fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(|s| s.to_string()).collect()
}

/// `[race]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RaceConfig {
    /// Depth of checkpoint and finish gates along the track
    #[serde(default = "default_gate_depth")]
    pub gate_depth: f64,
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
    #[serde(default)]
    pub progress: ProgressRule,
    /// Ticks per simulated second, only used to report elapsed time
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    /// Identity slots handed out to spawned vehicles, in order
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            gate_depth: default_gate_depth(),
            collision_policy: CollisionPolicy::default(),
            progress: ProgressRule::default(),
            tick_rate: default_tick_rate(),
            palette: default_palette(),
        }
    }
}

/// `[vehicle]` section
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct VehicleConfig {
    /// Fixed footprint for every vehicle; sized from the track when absent
    #[serde(default)]
    pub footprint: Option<Footprint>,
}

/// Everything a race reads from `lapsim.toml`. Every field has a default,
/// so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub physics: Tuning,
    #[serde(default)]
    pub sensor: SensorSettings,
    #[serde(default)]
    pub race: RaceConfig,
    #[serde(default)]
    pub grid: GridLayout,
    #[serde(default)]
    pub vehicle: VehicleConfig,
}

impl SimConfig {
    /// First config found on the search path, if any.
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn load() -> Option<Self> {
        for path in get_config_paths() {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match Self::from_toml_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        warn!("Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }

    /// Read an explicitly named config file; a missing file is an error
    pub fn from_path(path: &Path) -> AnyResult<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Reject values that would stall or destabilise the simulation
    pub fn validate(&self) -> Result<()> {
        let p = &self.physics;
        check_positive("physics.max_speed", p.max_speed)?;
        check_non_negative("physics.acceleration", p.acceleration)?;
        check_non_negative("physics.friction", p.friction)?;
        check_non_negative("physics.turn_slowdown", p.turn_slowdown)?;
        check_non_negative("physics.turn_step", p.turn_step)?;

        check_positive("sensor.step", self.sensor.step)?;
        check_positive("sensor.max_length", self.sensor.max_length)?;

        check_positive("race.gate_depth", self.race.gate_depth)?;
        check_positive("race.tick_rate", self.race.tick_rate)?;
        if let ProgressRule::Sequential { radius } = self.race.progress {
            check_positive("race.progress.radius", radius)?;
        }

        check_positive("grid.car_size_ratio", self.grid.car_size_ratio)?;
        check_positive("grid.car_length_ratio", self.grid.car_length_ratio)?;
        check_non_negative("grid.offset_factor", self.grid.offset_factor)?;
        check_non_negative("grid.row_offset_factor", self.grid.row_offset_factor)?;
        check_non_negative("grid.spacing_factor", self.grid.spacing_factor)?;

        if let Some(footprint) = &self.vehicle.footprint {
            footprint.validate()?;
        }
        Ok(())
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidSettings(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidSettings(format!(
            "{name} must not be negative, got {value}"
        )))
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("lapsim.toml"));
    paths.push(PathBuf::from(".lapsim.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("lapsim").join("config.toml"));
        paths.push(config_dir.join("lapsim.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".lapsim.toml"));
        paths.push(home.join(".config").join("lapsim").join("config.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SimConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimConfig::default());
        assert_eq!(config.race.gate_depth, 25.0);
        assert_eq!(config.race.tick_rate, 60.0);
        assert_eq!(config.race.palette.len(), 5);
        assert_eq!(config.physics.max_speed, 10.0);
        assert_eq!(config.sensor.max_length, 1000.0);
        assert!(config.vehicle.footprint.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = SimConfig::from_toml_str(
            r#"
[physics]
max_speed = 8.0
acceleration = 1.0

[sensor]
step = 2.0

[race]
collision_policy = "bounce"
palette = ["blue", "yellow"]

[race.progress]
rule = "sequential"
radius = 30.0

[vehicle.footprint]
kind = "rectangle"
length = 24.0
width = 12.0
"#,
        )
        .unwrap();

        assert_eq!(config.physics.max_speed, 8.0);
        assert_eq!(config.physics.acceleration, 1.0);
        assert_eq!(config.physics.friction, 0.05);
        assert_eq!(config.sensor.step, 2.0);
        assert_eq!(config.sensor.max_length, 1000.0);
        assert_eq!(config.race.collision_policy, CollisionPolicy::Bounce);
        assert_eq!(config.race.progress, ProgressRule::Sequential { radius: 30.0 });
        assert_eq!(config.race.palette, vec!["blue", "yellow"]);
        assert_eq!(
            config.vehicle.footprint,
            Some(Footprint::Rectangle {
                length: 24.0,
                width: 12.0
            })
        );
    }

    #[test]
    fn test_validate_rejects_zero_step() {
        let config = SimConfig::from_toml_str("[sensor]\nstep = 0.0").unwrap();
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidSettings(msg)) if msg.contains("sensor.step")
        ));
    }

    #[test]
    fn test_validate_rejects_negative_friction() {
        let config = SimConfig::from_toml_str("[physics]\nfriction = -1.0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[race]\ntick_rate = 30.0").unwrap();
        let config = SimConfig::from_path(file.path()).unwrap();
        assert_eq!(config.race.tick_rate, 30.0);
    }

    #[test]
    fn test_from_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SimConfig::from_path(&dir.path().join("missing.toml")).is_err());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[race\n").unwrap();
        assert!(SimConfig::from_path(&bad).is_err());
    }
}
