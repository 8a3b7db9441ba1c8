//! Dual-port vent pump: releases inlet gas into its tile, or siphons tile
//! gas into its outlet, bounded by up to three pressure checks.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_OUTPUT_PRESSURE, ONE_ATMOSPHERE, R};
use crate::flow::{moles_to_volume, FlowReport, FlowTick};
use crate::gas::GasMixture;
use crate::transfer::{clamp_setpoint, transfer_moles};

/// Largest single-tick pressure swing a vent will attempt.
const MAX_PRESSURE_DELTA: f32 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpDirection {
    Releasing,
    Siphoning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualPortVentPump {
    pub enabled: bool,
    pub direction: PumpDirection,
    /// Stop releasing above / siphoning below this tile pressure.
    pub check_external: bool,
    pub external_pressure_bound: f32,
    /// Keep at least this much in the inlet while releasing.
    pub check_input_minimum: bool,
    pub input_pressure_min: f32,
    /// Never fill the outlet past this while siphoning.
    pub check_output_maximum: bool,
    pub output_pressure_max: f32,
    #[serde(skip)]
    pub last_flow_rate: f32,
}

impl Default for DualPortVentPump {
    fn default() -> Self {
        Self {
            enabled: true,
            direction: PumpDirection::Releasing,
            check_external: true,
            external_pressure_bound: ONE_ATMOSPHERE,
            check_input_minimum: false,
            input_pressure_min: 0.0,
            check_output_maximum: false,
            output_pressure_max: MAX_OUTPUT_PRESSURE,
            last_flow_rate: 0.0,
        }
    }
}

impl DualPortVentPump {
    pub fn set_external_pressure_bound(&mut self, pressure: f32) {
        self.external_pressure_bound = clamp_setpoint(pressure, 0.0, MAX_OUTPUT_PRESSURE);
    }

    pub fn update(
        &mut self,
        inlet: &mut GasMixture,
        outlet: &mut GasMixture,
        environment: &mut GasMixture,
        tick: &FlowTick,
    ) -> FlowReport {
        self.last_flow_rate = 0.0;
        if !self.enabled || tick.is_degenerate() {
            return FlowReport::IDLE;
        }

        let report = match self.direction {
            PumpDirection::Releasing => self.release(inlet, environment),
            PumpDirection::Siphoning => self.siphon(environment, outlet),
        };
        self.last_flow_rate = report.rate(tick);
        report
    }

    fn release(&self, inlet: &mut GasMixture, environment: &mut GasMixture) -> FlowReport {
        let mut pressure_delta = MAX_PRESSURE_DELTA;
        if self.check_external {
            pressure_delta = pressure_delta.min(self.external_pressure_bound - environment.pressure());
        }
        if self.check_input_minimum {
            pressure_delta = pressure_delta.min(inlet.pressure() - self.input_pressure_min);
        }
        if !(pressure_delta > 0.0) || !(inlet.temperature() > 0.0) {
            return FlowReport::IDLE;
        }

        let before = inlet.clone();
        let wanted = pressure_delta * environment.volume() / (inlet.temperature() * R);
        let moles = transfer_moles(inlet, environment, wanted);
        FlowReport {
            moles,
            volume: moles_to_volume(moles, &before),
            leaked_moles: moles,
        }
    }

    fn siphon(&self, environment: &mut GasMixture, outlet: &mut GasMixture) -> FlowReport {
        let environment_pressure = environment.pressure();
        if !(environment_pressure > 0.0) {
            return FlowReport::IDLE;
        }

        let per_kpa = outlet.volume() / (environment.temperature() * R);
        let mut wanted = MAX_PRESSURE_DELTA * per_kpa;
        if self.check_external {
            let tile_excess = (environment_pressure - self.external_pressure_bound)
                * environment.volume()
                / (environment.temperature() * R);
            wanted = wanted.min(tile_excess);
        }
        if self.check_output_maximum {
            wanted = wanted.min((self.output_pressure_max - outlet.pressure()) * per_kpa);
        }

        let before = environment.clone();
        let moles = transfer_moles(environment, outlet, wanted);
        FlowReport {
            moles,
            volume: moles_to_volume(moles, &before),
            leaked_moles: 0.0,
        }
    }
}
