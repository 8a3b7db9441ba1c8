//! Two-port movers: pressure pump, passive gate and volume pump.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_OUTPUT_PRESSURE, MAX_TRANSFER_RATE, ONE_ATMOSPHERE};
use crate::flow::{moles_to_volume, FlowReport, FlowTick};
use crate::gas::GasMixture;
use crate::transfer::{clamp_setpoint, pump_gas_to, release_gas_to};

// ============================================================================
// PRESSURE PUMP
// ============================================================================

/// Pushes gas from inlet to outlet until the outlet reads the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressurePump {
    pub enabled: bool,
    pub target_pressure: f32,
    pub max_target_pressure: f32,
    #[serde(skip)]
    pub last_flow_rate: f32,
}

impl Default for PressurePump {
    fn default() -> Self {
        Self {
            enabled: true,
            target_pressure: ONE_ATMOSPHERE,
            max_target_pressure: MAX_OUTPUT_PRESSURE,
            last_flow_rate: 0.0,
        }
    }
}

impl PressurePump {
    pub fn set_target_pressure(&mut self, pressure: f32) {
        self.target_pressure = clamp_setpoint(pressure, 0.0, self.max_target_pressure);
    }

    pub fn update(
        &mut self,
        inlet: &mut GasMixture,
        outlet: &mut GasMixture,
        tick: &FlowTick,
    ) -> FlowReport {
        if !self.enabled || tick.is_degenerate() {
            self.last_flow_rate = 0.0;
            return FlowReport::IDLE;
        }

        let before = inlet.clone();
        let moles = pump_gas_to(inlet, outlet, self.target_pressure);
        let report = FlowReport {
            moles,
            volume: moles_to_volume(moles, &before),
            leaked_moles: 0.0,
        };
        self.last_flow_rate = report.rate(tick);
        report
    }
}

// ============================================================================
// PASSIVE GATE
// ============================================================================

/// Unpowered one-way release valve: lets gas through while the outlet is
/// below the target and the inlet has enough head to beat friction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassiveGate {
    pub enabled: bool,
    pub target_pressure: f32,
    pub max_target_pressure: f32,
    #[serde(skip)]
    pub last_flow_rate: f32,
}

impl Default for PassiveGate {
    fn default() -> Self {
        Self {
            enabled: true,
            target_pressure: ONE_ATMOSPHERE,
            max_target_pressure: MAX_OUTPUT_PRESSURE,
            last_flow_rate: 0.0,
        }
    }
}

impl PassiveGate {
    pub fn set_target_pressure(&mut self, pressure: f32) {
        self.target_pressure = clamp_setpoint(pressure, 0.0, self.max_target_pressure);
    }

    pub fn update(
        &mut self,
        inlet: &mut GasMixture,
        outlet: &mut GasMixture,
        tick: &FlowTick,
    ) -> FlowReport {
        if !self.enabled || tick.is_degenerate() {
            self.last_flow_rate = 0.0;
            return FlowReport::IDLE;
        }

        let before = inlet.clone();
        let moles = release_gas_to(inlet, Some(outlet), self.target_pressure);
        let report = FlowReport {
            moles,
            volume: moles_to_volume(moles, &before),
            leaked_moles: 0.0,
        };
        self.last_flow_rate = report.rate(tick);
        report
    }
}

// ============================================================================
// VOLUME PUMP
// ============================================================================

/// Moves a fixed volume per second regardless of pressure, within limits.
///
/// Overclocking lifts the inlet/outlet pressure window but leaks part of
/// every transfer into the surrounding tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumePump {
    pub enabled: bool,
    /// L/s.
    pub transfer_rate: f32,
    pub max_transfer_rate: f32,
    pub overclocked: bool,
    /// Fraction of each overclocked transfer lost to the tile.
    pub leak_ratio: f32,
    /// Inlet pressure below which a normal pump idles.
    pub lower_threshold: f32,
    /// Outlet pressure above which a normal pump idles.
    pub higher_threshold: f32,
    /// Largest outlet-over-inlet head an overclocked pump can push against.
    pub overclock_threshold: f32,
    #[serde(skip)]
    pub last_flow_rate: f32,
}

impl Default for VolumePump {
    fn default() -> Self {
        Self {
            enabled: true,
            transfer_rate: MAX_TRANSFER_RATE,
            max_transfer_rate: MAX_TRANSFER_RATE,
            overclocked: false,
            leak_ratio: 0.1,
            lower_threshold: 0.01,
            higher_threshold: 9000.0,
            overclock_threshold: 1000.0,
            last_flow_rate: 0.0,
        }
    }
}

impl VolumePump {
    pub fn set_transfer_rate(&mut self, rate: f32) {
        self.transfer_rate = clamp_setpoint(rate, 0.0, self.max_transfer_rate);
    }

    pub fn update(
        &mut self,
        inlet: &mut GasMixture,
        outlet: &mut GasMixture,
        ambient: Option<&mut GasMixture>,
        tick: &FlowTick,
    ) -> FlowReport {
        self.last_flow_rate = 0.0;
        if !self.enabled || tick.is_degenerate() {
            return FlowReport::IDLE;
        }

        let input_pressure = inlet.pressure();
        let output_pressure = outlet.pressure();
        let blocked = if self.overclocked {
            output_pressure - input_pressure > self.overclock_threshold
        } else {
            input_pressure < self.lower_threshold || output_pressure > self.higher_threshold
        };
        if blocked || !(inlet.volume() > 0.0) {
            return FlowReport::IDLE;
        }

        let volume = tick
            .volume_budget(self.transfer_rate)
            .min(inlet.volume());
        let mut removed = inlet.remove_ratio(volume / inlet.volume());
        let moles = removed.total_moles();

        let mut leaked_moles = 0.0;
        if self.overclocked {
            if let Some(tile) = ambient {
                let leak = removed.remove_ratio(self.leak_ratio);
                leaked_moles = leak.total_moles();
                tile.merge(leak);
            }
        }
        outlet.merge(removed);

        let report = FlowReport {
            moles,
            volume,
            leaked_moles,
        };
        self.last_flow_rate = report.rate(tick);
        report
    }
}
