//! Simulation configuration
//!
//! Loaded from JSON (every field optional) or built in code:
//!
//! ```json
//! { "seed": 42, "fleet_tick_secs": 2, "sensor_tick_secs": 5 }
//! ```

use crate::error::{Result, SimulationError};
use drc_core::GeoPosition;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// RNG seed. `None` seeds from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Fleet tick period (seconds)
    #[serde(default = "default_fleet_tick_secs")]
    pub fleet_tick_secs: u64,

    /// Sensor tick period (seconds)
    #[serde(default = "default_sensor_tick_secs")]
    pub sensor_tick_secs: u64,

    /// Phase progress tick period (seconds)
    #[serde(default = "default_progress_tick_secs")]
    pub progress_tick_secs: u64,

    /// Number of ground network extender nodes
    #[serde(default = "default_network_extender_count")]
    pub network_extender_count: usize,

    /// Chance that a sensor tick regenerates the hotspots
    #[serde(default = "default_hotspot_refresh_probability")]
    pub hotspot_refresh_probability: f64,

    /// Latitude the fleet is deployed around
    #[serde(default = "default_base_latitude")]
    pub base_latitude: f64,

    /// Longitude the fleet is deployed around
    #[serde(default = "default_base_longitude")]
    pub base_longitude: f64,
}

fn default_fleet_tick_secs() -> u64 {
    2
}

fn default_sensor_tick_secs() -> u64 {
    5
}

fn default_progress_tick_secs() -> u64 {
    1
}

fn default_network_extender_count() -> usize {
    4
}

fn default_hotspot_refresh_probability() -> f64 {
    0.3
}

// Gangtok, Sikkim
fn default_base_latitude() -> f64 {
    27.3389
}

fn default_base_longitude() -> f64 {
    88.6065
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            fleet_tick_secs: default_fleet_tick_secs(),
            sensor_tick_secs: default_sensor_tick_secs(),
            progress_tick_secs: default_progress_tick_secs(),
            network_extender_count: default_network_extender_count(),
            hotspot_refresh_probability: default_hotspot_refresh_probability(),
            base_latitude: default_base_latitude(),
            base_longitude: default_base_longitude(),
        }
    }
}

impl SimulationConfig {
    /// Load a config from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero periods and out-of-range probabilities
    pub fn validate(&self) -> Result<()> {
        if self.fleet_tick_secs == 0 || self.sensor_tick_secs == 0 || self.progress_tick_secs == 0 {
            return Err(SimulationError::config("tick periods must be at least 1 second"));
        }
        if !(0.0..=1.0).contains(&self.hotspot_refresh_probability) {
            return Err(SimulationError::config(format!(
                "hotspot_refresh_probability must be within [0, 1], got {}",
                self.hotspot_refresh_probability
            )));
        }
        Ok(())
    }

    /// Set RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set fleet tick period
    pub fn with_fleet_tick_secs(mut self, secs: u64) -> Self {
        self.fleet_tick_secs = secs;
        self
    }

    /// Set sensor tick period
    pub fn with_sensor_tick_secs(mut self, secs: u64) -> Self {
        self.sensor_tick_secs = secs;
        self
    }

    /// Set number of network extenders
    pub fn with_network_extender_count(mut self, count: usize) -> Self {
        self.network_extender_count = count;
        self
    }

    /// Deployment base (altitude 0)
    pub fn base(&self) -> GeoPosition {
        GeoPosition {
            latitude: self.base_latitude,
            longitude: self.base_longitude,
            altitude: 0.0,
        }
    }

    pub fn fleet_interval(&self) -> Duration {
        Duration::from_secs(self.fleet_tick_secs)
    }

    pub fn sensor_interval(&self) -> Duration {
        Duration::from_secs(self.sensor_tick_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_tick_secs)
    }
}
