//! Gas recycler: passes gas inlet → outlet proportionally to the square root
//! of the pressure difference, and reduces CO2 and N2O while hot and
//! pressurized enough.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_TRANSFER_RATE, ONE_ATMOSPHERE, T0C};
use crate::flow::{FlowReport, FlowTick};
use crate::gas::{Gas, GasMixture};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recycler {
    /// Kelvin.
    pub min_temperature: f32,
    /// kPa.
    pub min_pressure: f32,
    /// L/s at a 300 atm difference.
    pub max_transfer_rate: f32,
    #[serde(skip)]
    pub reacting: bool,
    #[serde(skip)]
    pub last_flow_rate: f32,
}

impl Default for Recycler {
    fn default() -> Self {
        Self {
            min_temperature: 300.0 + T0C,
            min_pressure: 30.0 * ONE_ATMOSPHERE,
            max_transfer_rate: MAX_TRANSFER_RATE,
            reacting: false,
            last_flow_rate: 0.0,
        }
    }
}

/// Species the recycler reduces, and what each becomes.
const CONVERSIONS: [(Gas, Gas); 2] = [
    (Gas::CarbonDioxide, Gas::Oxygen),
    (Gas::NitrousOxide, Gas::Nitrogen),
];

impl Recycler {
    pub fn update(
        &mut self,
        inlet: &mut GasMixture,
        outlet: &mut GasMixture,
        tick: &FlowTick,
    ) -> FlowReport {
        self.last_flow_rate = 0.0;
        if tick.is_degenerate() {
            return FlowReport::IDLE;
        }

        let input_pressure = inlet.pressure();
        let output_pressure = outlet.pressure();
        self.reacting =
            inlet.temperature() >= self.min_temperature && input_pressure >= self.min_pressure;

        if input_pressure < output_pressure {
            return FlowReport::IDLE;
        }

        let coefficient =
            self.max_transfer_rate * tick.pump_speedup / (300.0 * ONE_ATMOSPHERE).sqrt();
        let volume = (coefficient * (input_pressure - output_pressure).sqrt() * tick.dt)
            .max(0.0)
            .min(inlet.volume());
        if !(volume > 0.0) {
            return FlowReport::IDLE;
        }

        let mut removed = inlet.remove_volume(volume);
        let moles = removed.total_moles();

        if self.reacting {
            for (from, to) in CONVERSIONS {
                let amount = removed.get_moles(from);
                removed.adjust_moles(to, amount);
                removed.set_moles(from, 0.0);
            }
        }
        outlet.merge(removed);

        let report = FlowReport {
            moles,
            volume,
            leaked_moles: 0.0,
        };
        self.last_flow_rate = report.rate(tick);
        report
    }
}
