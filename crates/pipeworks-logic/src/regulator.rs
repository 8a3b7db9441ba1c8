//! Pressure regulators: one controller, two sensing modes.
//!
//! In `Inlet` mode it is a relief valve that bleeds the inlet down to the
//! threshold. In `Outlet` mode it is a regulator that tops the outlet up to
//! the threshold. Either way it never moves more than is needed to equalize
//! the two sides, and never more than its rated volume per second.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_OUTPUT_PRESSURE, MAX_TRANSFER_RATE, ONE_ATMOSPHERE, R};
use crate::flow::{FlowReport, FlowTick};
use crate::gas::GasMixture;
use crate::transfer::{clamp_setpoint, fraction_to_equalize_pressure, moles_to_pressure_threshold};

/// Which side of the regulator the threshold is measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulatorMode {
    /// Relief valve: opens while the inlet is above the threshold.
    Inlet,
    /// Regulator: opens while the outlet is below the threshold.
    Outlet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureRegulator {
    pub mode: RegulatorMode,
    pub threshold: f32,
    pub max_threshold: f32,
    /// L/s.
    pub max_transfer_rate: f32,
    #[serde(skip)]
    pub open: bool,
    #[serde(skip)]
    pub last_flow_rate: f32,
}

impl Default for PressureRegulator {
    fn default() -> Self {
        Self {
            mode: RegulatorMode::Outlet,
            threshold: ONE_ATMOSPHERE,
            max_threshold: MAX_OUTPUT_PRESSURE,
            max_transfer_rate: MAX_TRANSFER_RATE,
            open: false,
            last_flow_rate: 0.0,
        }
    }
}

impl PressureRegulator {
    pub fn relief_valve() -> Self {
        Self {
            mode: RegulatorMode::Inlet,
            ..Default::default()
        }
    }

    pub fn set_threshold(&mut self, pressure: f32) {
        self.threshold = clamp_setpoint(pressure, 0.0, self.max_threshold);
    }

    fn triggered(&self, input_pressure: f32, output_pressure: f32) -> bool {
        match self.mode {
            RegulatorMode::Inlet => {
                input_pressure > self.threshold && output_pressure < input_pressure
            }
            RegulatorMode::Outlet => {
                output_pressure < self.threshold && output_pressure < input_pressure
            }
        }
    }

    /// Moles that would bring the sensed side to the threshold.
    fn moles_to_threshold(&self, inlet: &GasMixture, outlet: &GasMixture, output_pressure: f32) -> f32 {
        match self.mode {
            RegulatorMode::Inlet => moles_to_pressure_threshold(inlet, self.threshold),
            RegulatorMode::Outlet => {
                (self.threshold - output_pressure) * outlet.volume() / (R * inlet.temperature())
            }
        }
    }

    pub fn update(
        &mut self,
        inlet: &mut GasMixture,
        outlet: &mut GasMixture,
        tick: &FlowTick,
    ) -> FlowReport {
        self.last_flow_rate = 0.0;

        let input_pressure = inlet.pressure();
        let output_pressure = outlet.pressure();
        if tick.is_degenerate()
            || !self.triggered(input_pressure, output_pressure)
            || !(inlet.temperature() > 0.0)
            || !(input_pressure > 0.0)
        {
            self.open = false;
            return FlowReport::IDLE;
        }

        let to_threshold = self.moles_to_threshold(inlet, outlet, output_pressure);
        let to_equalize = fraction_to_equalize_pressure(inlet, outlet) * inlet.total_moles();
        let moles = to_threshold.min(to_equalize).max(0.0);

        let wanted = moles * R * inlet.temperature() / input_pressure;
        let volume = clamp_setpoint(wanted, 0.0, tick.volume_budget(self.max_transfer_rate));

        let removed = inlet.remove_volume(volume);
        let moved = removed.total_moles();
        outlet.merge(removed);

        self.open = volume > 0.0;
        let report = FlowReport {
            moles: moved,
            volume,
            leaked_moles: 0.0,
        };
        self.last_flow_rate = report.rate(tick);
        report
    }
}
