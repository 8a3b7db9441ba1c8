//! Read surface - a point-in-time view of one device for UIs and tests.

use hecs::Entity;

use crate::components::{DeviceKind, GasDevice, PortKind};
use crate::engine::SimulationEngine;

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub entity: Entity,
    pub kind: DeviceKind,
    /// Devices without a switch always read enabled.
    pub enabled: bool,
    /// kPa, read from the live mixture. Single-port devices report their
    /// port here.
    pub inlet_pressure: Option<f32>,
    pub outlet_pressure: Option<f32>,
    /// L/s over the last update.
    pub flow_rate: f32,
    pub target: Option<f32>,
}

impl SimulationEngine {
    pub fn snapshot(&self, entity: Entity) -> Option<DeviceSnapshot> {
        let device = self.world.get::<&GasDevice>(entity).ok()?;
        let pressure = |port| self.node_air(entity, port).map(|air| air.pressure());

        Some(DeviceSnapshot {
            entity,
            kind: device.kind(),
            enabled: device.enabled().unwrap_or(true),
            inlet_pressure: pressure(PortKind::Inlet).or_else(|| pressure(PortKind::Port)),
            outlet_pressure: pressure(PortKind::Outlet),
            flow_rate: device.flow_rate(),
            target: device.target(),
        })
    }
}
