//! Portable gas canister: fills its port once on startup, then optionally
//! bleeds through a release valve into a held tank, or into the
//! surrounding tile when no tank is held.

use serde::{Deserialize, Serialize};

use crate::constants::ONE_ATMOSPHERE;
use crate::flow::{moles_to_volume, FlowReport, FlowTick};
use crate::gas::GasMixture;
use crate::transfer::{clamp_setpoint, release_gas_to};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Canister {
    /// Contents merged into the port node on the first tick.
    pub initial_mixture: GasMixture,
    pub release_pressure: f32,
    pub min_release_pressure: f32,
    pub max_release_pressure: f32,
    pub release_valve: bool,
    /// Set once the startup fill has happened.
    pub initialized: bool,
    #[serde(skip)]
    pub last_flow_rate: f32,
}

impl Default for Canister {
    fn default() -> Self {
        Self {
            initial_mixture: GasMixture::default(),
            release_pressure: ONE_ATMOSPHERE,
            min_release_pressure: ONE_ATMOSPHERE / 10.0,
            max_release_pressure: ONE_ATMOSPHERE * 10.0,
            release_valve: false,
            initialized: false,
            last_flow_rate: 0.0,
        }
    }
}

impl Canister {
    pub fn with_contents(initial_mixture: GasMixture) -> Self {
        Self {
            initial_mixture,
            ..Default::default()
        }
    }

    pub fn set_release_pressure(&mut self, pressure: f32) {
        self.release_pressure =
            clamp_setpoint(pressure, self.min_release_pressure, self.max_release_pressure);
    }

    /// Startup fill. Runs once; later calls are no-ops and return false.
    pub fn start(&mut self, port: &mut GasMixture) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        let temperature = self.initial_mixture.temperature();
        port.merge(self.initial_mixture.clone());
        port.set_temperature(temperature);
        true
    }

    /// Release valve with no tank held: bleed into the ambient tile.
    pub fn update(
        &mut self,
        port: &mut GasMixture,
        ambient: Option<&mut GasMixture>,
        tick: &FlowTick,
    ) -> FlowReport {
        self.release(port, ambient, true, tick)
    }

    /// Release valve with a tank held: fill the tank up to the release
    /// pressure. The tile is never touched.
    pub fn update_into_tank(
        &mut self,
        port: &mut GasMixture,
        tank: &mut GasMixture,
        tick: &FlowTick,
    ) -> FlowReport {
        self.release(port, Some(tank), false, tick)
    }

    fn release(
        &mut self,
        port: &mut GasMixture,
        target: Option<&mut GasMixture>,
        leaks: bool,
        tick: &FlowTick,
    ) -> FlowReport {
        self.last_flow_rate = 0.0;
        if !self.release_valve || tick.is_degenerate() {
            return FlowReport::IDLE;
        }

        let before = port.clone();
        let moles = release_gas_to(port, target, self.release_pressure);
        let report = FlowReport {
            moles,
            volume: moles_to_volume(moles, &before),
            leaked_moles: if leaks { moles } else { 0.0 },
        };
        self.last_flow_rate = report.rate(tick);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{PIPE_VOLUME, T20C};
    use crate::gas::Gas;
    use approx::assert_relative_eq;

    fn five_atmosphere_tank() -> Canister {
        Canister::with_contents(GasMixture::filled(
            PIPE_VOLUME,
            T20C,
            Gas::Nitrogen,
            5.0 * ONE_ATMOSPHERE,
        ))
    }

    #[test]
    fn test_start_fills_port_once() {
        let mut canister = five_atmosphere_tank();
        let mut port = GasMixture::new(PIPE_VOLUME);

        assert!(canister.start(&mut port));
        assert_relative_eq!(port.pressure(), 5.0 * ONE_ATMOSPHERE, max_relative = 1e-4);

        assert!(!canister.start(&mut port));
        assert_relative_eq!(port.pressure(), 5.0 * ONE_ATMOSPHERE, max_relative = 1e-4);
    }

    #[test]
    fn test_closed_valve_holds() {
        let mut canister = five_atmosphere_tank();
        let mut port = GasMixture::new(PIPE_VOLUME);
        canister.start(&mut port);
        let mut tile = GasMixture::new(2500.0);
        assert!(!canister.update(&mut port, Some(&mut tile), &FlowTick::new(1.0)).moved());
    }

    #[test]
    fn test_open_valve_bleeds_towards_release_pressure() {
        let mut canister = five_atmosphere_tank();
        let mut port = GasMixture::new(PIPE_VOLUME);
        canister.start(&mut port);
        canister.release_valve = true;
        let mut tile = GasMixture::new(2500.0).with_temperature(T20C);

        let report = canister.update(&mut port, Some(&mut tile), &FlowTick::new(1.0));

        assert!(report.moved());
        assert_relative_eq!(tile.total_moles(), report.moles);
        assert!(tile.pressure() <= ONE_ATMOSPHERE + 1e-3);
    }

    #[test]
    fn test_open_valve_fills_tank_to_release_pressure() {
        let mut canister = five_atmosphere_tank();
        let mut port = GasMixture::new(PIPE_VOLUME);
        canister.start(&mut port);
        canister.release_valve = true;
        canister.set_release_pressure(2.0 * ONE_ATMOSPHERE);
        let mut tank = GasMixture::new(PIPE_VOLUME).with_temperature(T20C);

        let report = canister.update_into_tank(&mut port, &mut tank, &FlowTick::new(1.0));

        assert!(report.moved());
        assert_eq!(report.leaked_moles, 0.0);
        assert_relative_eq!(tank.total_moles(), report.moles);
        assert_relative_eq!(tank.pressure(), 2.0 * ONE_ATMOSPHERE, max_relative = 1e-3);
    }

    #[test]
    fn test_closed_valve_leaves_tank_alone() {
        let mut canister = five_atmosphere_tank();
        let mut port = GasMixture::new(PIPE_VOLUME);
        canister.start(&mut port);
        let mut tank = GasMixture::new(PIPE_VOLUME);
        assert!(!canister.update_into_tank(&mut port, &mut tank, &FlowTick::new(1.0)).moved());
        assert_eq!(tank.total_moles(), 0.0);
    }

    #[test]
    fn test_release_pressure_clamped() {
        let mut canister = Canister::default();
        canister.set_release_pressure(0.0);
        assert_eq!(canister.release_pressure, ONE_ATMOSPHERE / 10.0);
        canister.set_release_pressure(f32::NAN);
        assert_eq!(canister.release_pressure, ONE_ATMOSPHERE / 10.0);
    }
}
