//! Simulation configuration, loaded from JSON.

use std::collections::BTreeMap;
use std::path::Path;

use pipeworks_logic::constants::PIPE_VOLUME;
use serde::{Deserialize, Serialize};

use crate::components::GasDevice;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Multiplier on every rate-limited device.
    pub pump_speedup: f32,
    /// Pool each network's owned air once per tick.
    pub equalize_networks: bool,
    /// Volume of every node a device or pipe is spawned with, in liters.
    pub pipe_volume: f32,
    /// Simulated seconds per real second passed to `update`.
    pub time_scale: f32,
    /// Named device templates for `spawn_prototype`.
    pub prototypes: BTreeMap<String, GasDevice>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            pump_speedup: 1.0,
            equalize_networks: true,
            pipe_volume: PIPE_VOLUME,
            time_scale: 1.0,
            prototypes: BTreeMap::new(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!(
            "loaded simulation config from {} ({} prototypes)",
            path.display(),
            config.prototypes.len()
        );
        Ok(config)
    }

    /// Replace nonsense numbers with defaults instead of rejecting the file.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.pump_speedup >= 0.0) || !self.pump_speedup.is_finite() {
            self.pump_speedup = defaults.pump_speedup;
        }
        if !(self.pipe_volume > 0.0) || !self.pipe_volume.is_finite() {
            self.pipe_volume = defaults.pipe_volume;
        }
        if !(self.time_scale >= 0.0) || !self.time_scale.is_finite() {
            self.time_scale = defaults.time_scale;
        }
        self
    }
}
