//! Gas-fueled power: a tap burns gas from its inlet each tick it wants to
//! be powered, and reports when its powered state flips.

use serde::{Deserialize, Serialize};

use crate::constants::{R, T0C};
use crate::flow::{moles_to_volume, FlowReport, FlowTick};
use crate::gas::{Gas, GasMixture};

/// Which side of the power network the tap sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerRole {
    /// Supplies `watts` to the grid while fueled.
    Provider,
    /// Draws `watts` and only runs while fueled.
    Receiver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerTap {
    pub role: PowerRole,
    pub watts: f32,
    pub enabled: bool,
    /// Fuel burned while the inlet is cool enough.
    pub target_gas: Gas,
    /// Above this temperature the tap burns pressure instead of fuel.
    pub max_temperature: f32,
    pub moles_consumed_per_sec: f32,
    /// kPa of inlet pressure consumed per second when running hot.
    pub pressure_consumed_per_sec: f32,
    /// Spent gas goes to the tile instead of disappearing.
    pub vent_removed_gas: bool,
    #[serde(skip)]
    pub powered: bool,
    #[serde(skip)]
    pub last_flow_rate: f32,
}

impl Default for PowerTap {
    fn default() -> Self {
        Self {
            role: PowerRole::Receiver,
            watts: 1000.0,
            enabled: true,
            target_gas: Gas::Plasma,
            max_temperature: 100.0 + T0C,
            moles_consumed_per_sec: 2.5,
            pressure_consumed_per_sec: 100.0,
            vent_removed_gas: false,
            powered: false,
            last_flow_rate: 0.0,
        }
    }
}

impl PowerTap {
    /// Watts this tap currently adds to (positive) or draws from (negative)
    /// the grid.
    pub fn net_watts(&self) -> f32 {
        match (self.role, self.powered) {
            (_, false) => 0.0,
            (PowerRole::Provider, true) => self.watts,
            (PowerRole::Receiver, true) => -self.watts,
        }
    }

    /// Burn this tick's fuel. The second value is `Some(powered)` when the
    /// powered state changed.
    pub fn update(
        &mut self,
        inlet: &mut GasMixture,
        ambient: Option<&mut GasMixture>,
        tick: &FlowTick,
    ) -> (FlowReport, Option<bool>) {
        let was_powered = self.powered;
        let before = inlet.clone();

        let spent = if self.enabled && !tick.is_degenerate() {
            self.consume(inlet, tick)
        } else {
            None
        };
        self.powered = spent.is_some();

        let mut report = FlowReport::IDLE;
        if let Some(spent) = spent {
            report.moles = spent.total_moles();
            report.volume = moles_to_volume(report.moles, &before);
            match ambient {
                Some(tile) if self.vent_removed_gas => {
                    report.leaked_moles = report.moles;
                    tile.merge(spent);
                }
                _ => {}
            }
        }

        self.last_flow_rate = report.rate(tick);
        let flipped = (self.powered != was_powered).then_some(self.powered);
        (report, flipped)
    }

    fn consume(&self, inlet: &mut GasMixture, tick: &FlowTick) -> Option<GasMixture> {
        let temperature = inlet.temperature();
        if !(temperature > 0.0) {
            return None;
        }

        if temperature <= self.max_temperature {
            let needed = self.moles_consumed_per_sec * tick.dt;
            let available = inlet.get_moles(self.target_gas);
            if !(needed > 0.0) || available < needed {
                return None;
            }
            inlet.adjust_moles(self.target_gas, -needed);
            let mut spent = GasMixture::new(0.0).with_temperature(temperature);
            spent.set_moles(self.target_gas, needed);
            Some(spent)
        } else {
            let cost = self.pressure_consumed_per_sec * tick.dt;
            if !(cost > 0.0) || inlet.pressure() < cost {
                return None;
            }
            let moles = cost * inlet.volume() / (R * temperature);
            Some(inlet.remove_moles(moles))
        }
    }
}
