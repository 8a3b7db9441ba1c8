//! The device component: one variant per device kind, each wrapping the
//! setpoints and derived state of its flow controller.

use pipeworks_logic::canister::Canister;
use pipeworks_logic::mixing_port::MixingPort;
use pipeworks_logic::power_tap::PowerTap;
use pipeworks_logic::pumps::{PassiveGate, PressurePump, VolumePump};
use pipeworks_logic::recycler::Recycler;
use pipeworks_logic::regulator::{PressureRegulator, RegulatorMode};
use pipeworks_logic::vent::DualPortVentPump;
use serde::{Deserialize, Serialize};

use super::PortKind;

/// Manual valve. Open valves link inlet and outlet into one network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Valve {
    pub open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    PressurePump,
    PassiveGate,
    VolumePump,
    PressureRegulator,
    PressureReliefValve,
    Recycler,
    Valve,
    Canister,
    MixingPort,
    DualPortVentPump,
    PowerTap,
}

impl DeviceKind {
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::PressurePump => "pressure pump",
            DeviceKind::PassiveGate => "passive gate",
            DeviceKind::VolumePump => "volume pump",
            DeviceKind::PressureRegulator => "pressure regulator",
            DeviceKind::PressureReliefValve => "pressure relief valve",
            DeviceKind::Recycler => "recycler",
            DeviceKind::Valve => "valve",
            DeviceKind::Canister => "canister",
            DeviceKind::MixingPort => "mixing port",
            DeviceKind::DualPortVentPump => "dual-port vent pump",
            DeviceKind::PowerTap => "power tap",
        }
    }
}

const TWO_PORT: &[PortKind] = &[PortKind::Inlet, PortKind::Outlet];
const ONE_PORT: &[PortKind] = &[PortKind::Port];
const INLET_ONLY: &[PortKind] = &[PortKind::Inlet];

/// Device state attached to a device entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GasDevice {
    PressurePump(PressurePump),
    PassiveGate(PassiveGate),
    VolumePump(VolumePump),
    /// Covers both regulators and relief valves; see `RegulatorMode`.
    PressureRegulator(PressureRegulator),
    Recycler(Recycler),
    Valve(Valve),
    Canister(Canister),
    MixingPort(MixingPort),
    DualPortVentPump(DualPortVentPump),
    PowerTap(PowerTap),
}

impl GasDevice {
    pub fn kind(&self) -> DeviceKind {
        match self {
            GasDevice::PressurePump(_) => DeviceKind::PressurePump,
            GasDevice::PassiveGate(_) => DeviceKind::PassiveGate,
            GasDevice::VolumePump(_) => DeviceKind::VolumePump,
            GasDevice::PressureRegulator(regulator) => match regulator.mode {
                RegulatorMode::Inlet => DeviceKind::PressureReliefValve,
                RegulatorMode::Outlet => DeviceKind::PressureRegulator,
            },
            GasDevice::Recycler(_) => DeviceKind::Recycler,
            GasDevice::Valve(_) => DeviceKind::Valve,
            GasDevice::Canister(_) => DeviceKind::Canister,
            GasDevice::MixingPort(_) => DeviceKind::MixingPort,
            GasDevice::DualPortVentPump(_) => DeviceKind::DualPortVentPump,
            GasDevice::PowerTap(_) => DeviceKind::PowerTap,
        }
    }

    /// Ports a freshly spawned device of this kind gets a node for.
    pub fn ports(&self) -> &'static [PortKind] {
        match self {
            GasDevice::Canister(_) => ONE_PORT,
            GasDevice::PowerTap(_) => INLET_ONLY,
            _ => TWO_PORT,
        }
    }

    /// Whether the device has an on/off switch.
    pub fn enabled(&self) -> Option<bool> {
        match self {
            GasDevice::PressurePump(pump) => Some(pump.enabled),
            GasDevice::PassiveGate(gate) => Some(gate.enabled),
            GasDevice::VolumePump(pump) => Some(pump.enabled),
            GasDevice::DualPortVentPump(vent) => Some(vent.enabled),
            GasDevice::PowerTap(tap) => Some(tap.enabled),
            GasDevice::Valve(valve) => Some(valve.open),
            GasDevice::PressureRegulator(regulator) => Some(regulator.open),
            GasDevice::Canister(canister) => Some(canister.release_valve),
            GasDevice::Recycler(_) | GasDevice::MixingPort(_) => None,
        }
    }

    /// The setpoint shown next to the device: target pressure, threshold,
    /// release pressure, transfer rate or external bound.
    pub fn target(&self) -> Option<f32> {
        match self {
            GasDevice::PressurePump(pump) => Some(pump.target_pressure),
            GasDevice::PassiveGate(gate) => Some(gate.target_pressure),
            GasDevice::VolumePump(pump) => Some(pump.transfer_rate),
            GasDevice::PressureRegulator(regulator) => Some(regulator.threshold),
            GasDevice::Canister(canister) => Some(canister.release_pressure),
            GasDevice::DualPortVentPump(vent) => Some(vent.external_pressure_bound),
            GasDevice::Recycler(_)
            | GasDevice::Valve(_)
            | GasDevice::MixingPort(_)
            | GasDevice::PowerTap(_) => None,
        }
    }

    /// Last computed flow rate in L/s.
    pub fn flow_rate(&self) -> f32 {
        match self {
            GasDevice::PressurePump(pump) => pump.last_flow_rate,
            GasDevice::PassiveGate(gate) => gate.last_flow_rate,
            GasDevice::VolumePump(pump) => pump.last_flow_rate,
            GasDevice::PressureRegulator(regulator) => regulator.last_flow_rate,
            GasDevice::Recycler(recycler) => recycler.last_flow_rate,
            GasDevice::Canister(canister) => canister.last_flow_rate,
            GasDevice::DualPortVentPump(vent) => vent.last_flow_rate,
            GasDevice::PowerTap(tap) => tap.last_flow_rate,
            GasDevice::Valve(_) | GasDevice::MixingPort(_) => 0.0,
        }
    }
}
