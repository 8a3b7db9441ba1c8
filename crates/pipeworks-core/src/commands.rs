//! Command surface - setpoint and topology changes issued by the host.
//!
//! Out-of-range values are clamped, never rejected. A command only fails
//! for an unknown handle or a device kind that has no such control.

use hecs::Entity;
use pipeworks_logic::constants::MAX_TRANSFER_RATE;
use pipeworks_logic::transfer::clamp_setpoint;
use pipeworks_logic::vent::PumpDirection;

use crate::components::*;
use crate::engine::SimulationEngine;
use crate::error::{PipeworksError, Result};
use crate::pipe_net::NodeAir;

impl SimulationEngine {
    /// Borrow an entity's device and apply `f`. `f` returns `None` when the
    /// device kind has no such control.
    fn with_device<R>(
        &mut self,
        entity: Entity,
        command: &'static str,
        f: impl FnOnce(&mut GasDevice) -> Option<R>,
    ) -> Result<R> {
        if !self.world.contains(entity) {
            return Err(PipeworksError::UnknownEntity(entity));
        }
        let mut device = self
            .world
            .get::<&mut GasDevice>(entity)
            .map_err(|_| PipeworksError::UnsupportedCommand {
                command,
                kind: "non-device",
            })?;
        let kind = device.kind();
        f(&mut *device).ok_or(PipeworksError::UnsupportedCommand {
            command,
            kind: kind.name(),
        })
    }

    /// Target pressure, regulator threshold, canister release pressure or
    /// vent external bound, in kPa.
    pub fn set_target_pressure(&mut self, entity: Entity, pressure: f32) -> Result<()> {
        self.with_device(entity, "set_target_pressure", |device| {
            match device {
                GasDevice::PressurePump(pump) => pump.set_target_pressure(pressure),
                GasDevice::PassiveGate(gate) => gate.set_target_pressure(pressure),
                GasDevice::PressureRegulator(regulator) => regulator.set_threshold(pressure),
                GasDevice::Canister(canister) => canister.set_release_pressure(pressure),
                GasDevice::DualPortVentPump(vent) => vent.set_external_pressure_bound(pressure),
                _ => return None,
            }
            Some(())
        })
    }

    /// Transfer rate in L/s. For regulators and recyclers this is the
    /// maximum rate.
    pub fn set_transfer_rate(&mut self, entity: Entity, rate: f32) -> Result<()> {
        let rate_limit = |rate| clamp_setpoint(rate, 0.0, MAX_TRANSFER_RATE);
        self.with_device(entity, "set_transfer_rate", |device| {
            match device {
                GasDevice::VolumePump(pump) => pump.set_transfer_rate(rate),
                GasDevice::PressureRegulator(regulator) => {
                    regulator.max_transfer_rate = rate_limit(rate)
                }
                GasDevice::Recycler(recycler) => recycler.max_transfer_rate = rate_limit(rate),
                _ => return None,
            }
            Some(())
        })
    }

    pub fn set_enabled(&mut self, entity: Entity, enabled: bool) -> Result<()> {
        self.with_device(entity, "set_enabled", |device| {
            let switch = match device {
                GasDevice::PressurePump(pump) => &mut pump.enabled,
                GasDevice::PassiveGate(gate) => &mut gate.enabled,
                GasDevice::VolumePump(pump) => &mut pump.enabled,
                GasDevice::DualPortVentPump(vent) => &mut vent.enabled,
                GasDevice::PowerTap(tap) => &mut tap.enabled,
                _ => return None,
            };
            *switch = enabled;
            Some(())
        })
    }

    pub fn set_overclocked(&mut self, entity: Entity, overclocked: bool) -> Result<()> {
        self.with_device(entity, "set_overclocked", |device| match device {
            GasDevice::VolumePump(pump) => {
                pump.overclocked = overclocked;
                Some(())
            }
            _ => None,
        })
    }

    pub fn set_release_valve(&mut self, entity: Entity, open: bool) -> Result<()> {
        self.with_device(entity, "set_release_valve", |device| match device {
            GasDevice::Canister(canister) => {
                canister.release_valve = open;
                Some(())
            }
            _ => None,
        })
    }

    pub fn set_pump_direction(&mut self, entity: Entity, direction: PumpDirection) -> Result<()> {
        self.with_device(entity, "set_pump_direction", |device| match device {
            GasDevice::DualPortVentPump(vent) => {
                vent.direction = direction;
                Some(())
            }
            _ => None,
        })
    }

    /// Flip a valve. Returns the new open state. The link change takes
    /// effect at the next reflood.
    pub fn toggle_valve(&mut self, entity: Entity) -> Result<bool> {
        let open = self.with_device(entity, "toggle_valve", |device| match device {
            GasDevice::Valve(valve) => {
                valve.open = !valve.open;
                Some(valve.open)
            }
            _ => None,
        })?;

        let inlet = self.require_node((entity, PortKind::Inlet))?;
        let outlet = self.require_node((entity, PortKind::Outlet))?;
        if open {
            self.graph.add_link(inlet, outlet);
        } else {
            self.graph.remove_link(inlet, outlet);
        }
        Ok(open)
    }

    /// Anchor or unanchor a portable entity. Unanchored entities keep their
    /// links but drop out of adjacent pipes.
    pub fn set_anchored(&mut self, entity: Entity, anchored: bool) -> Result<()> {
        if !self.world.contains(entity) {
            return Err(PipeworksError::UnknownEntity(entity));
        }
        {
            let mut anchor = self.world.get::<&mut Anchorable>(entity).map_err(|_| {
                PipeworksError::UnsupportedCommand {
                    command: "set_anchored",
                    kind: self.kind_name(entity),
                }
            })?;
            if anchor.anchored == anchored {
                return Ok(());
            }
            anchor.anchored = anchored;
        }
        let nodes: Vec<_> = self
            .world
            .get::<&NodeContainer>(entity)
            .map(|nodes| nodes.iter().map(|(_, id)| id).collect())
            .unwrap_or_default();
        for id in nodes {
            self.graph.set_connections_enabled(id, anchored);
        }
        log::debug!("{entity:?} anchored={anchored}");
        Ok(())
    }

    /// Slot a gas tank into a canister, linking the tank's node to the
    /// canister port. Returns the tank it replaced, which is ejected.
    pub fn insert_holding_tank(&mut self, canister: Entity, tank: Entity) -> Result<Option<Entity>> {
        self.require_canister(canister, "insert_holding_tank")?;
        if !self.world.contains(tank) {
            return Err(PipeworksError::UnknownEntity(tank));
        }
        if self.world.get::<&GasTank>(tank).is_err() {
            return Err(PipeworksError::UnsupportedCommand {
                command: "insert_holding_tank",
                kind: self.kind_name(tank),
            });
        }
        let tank_node = self.require_node((tank, PortKind::Port))?;
        let port = self.require_node((canister, PortKind::Port))?;
        let current = self
            .world
            .get::<&HoldingTankSlot>(canister)
            .map(|slot| slot.tank())
            .unwrap_or(None);
        if current == Some(tank) {
            return Ok(None);
        }

        // A tank sits in one canister at a time.
        let holders: Vec<Entity> = self
            .world
            .query_mut::<&HoldingTankSlot>()
            .into_iter()
            .filter(|(holder, slot)| *holder != canister && slot.tank() == Some(tank))
            .map(|(holder, _)| holder)
            .collect();
        for holder in holders {
            self.eject_contents(holder)?;
        }

        let previous = self.eject_contents(canister)?;
        if let Ok(mut slot) = self.world.get::<&mut HoldingTankSlot>(canister) {
            slot.0 = Some(HeldTank {
                entity: tank,
                node: tank_node,
            });
        }
        // The tank joins the canister's network but only fills through the
        // release valve.
        self.graph.add_link(port, tank_node);
        self.graph.set_pooled(tank_node, false);
        log::info!("tank {tank:?} inserted into canister {canister:?}");
        Ok(previous)
    }

    /// Remove a canister's holding tank, unlinking it from the port.
    /// Returns the ejected tank, if there was one.
    pub fn eject_contents(&mut self, canister: Entity) -> Result<Option<Entity>> {
        self.require_canister(canister, "eject_contents")?;
        let held = match self.world.get::<&mut HoldingTankSlot>(canister) {
            Ok(mut slot) => slot.0.take(),
            Err(_) => None,
        };
        let Some(HeldTank { entity: tank, node: tank_node }) = held else {
            return Ok(None);
        };
        if let Some(port) = self.node(canister, PortKind::Port) {
            self.graph.remove_link(port, tank_node);
        }
        self.graph.set_pooled(tank_node, true);
        log::info!("tank {tank:?} ejected from canister {canister:?}");
        Ok(Some(tank))
    }

    /// Dump a canister port's air onto its tile. Gas with no tile to go to
    /// is lost. Returns the moles purged.
    pub fn purge_contents(&mut self, canister: Entity) -> Result<f32> {
        self.require_canister(canister, "purge_contents")?;
        let port = self.require_node((canister, PortKind::Port))?;
        let Some(node) = self.graph.node_mut(port) else {
            return Ok(0.0);
        };
        let tile = node.tile;
        let NodeAir::Owned(air) = &mut node.air else {
            return Ok(0.0);
        };
        let purged = air.remove_ratio(1.0);
        let moles = purged.total_moles();
        let vented = self.environment.merge_into(tile, purged);
        log::info!(
            "canister {canister:?} purged {moles:.2} mol{}",
            if vented { "" } else { " into nothing" }
        );
        Ok(moles)
    }

    fn require_canister(&self, entity: Entity, command: &'static str) -> Result<()> {
        if !self.world.contains(entity) {
            return Err(PipeworksError::UnknownEntity(entity));
        }
        match self.world.get::<&GasDevice>(entity) {
            Ok(device) if matches!(*device, GasDevice::Canister(_)) => Ok(()),
            _ => Err(PipeworksError::UnsupportedCommand {
                command,
                kind: self.kind_name(entity),
            }),
        }
    }

    fn kind_name(&self, entity: Entity) -> &'static str {
        if let Ok(device) = self.world.get::<&GasDevice>(entity) {
            return device.kind().name();
        }
        if self.world.get::<&Pipe>(entity).is_ok() {
            "pipe"
        } else if self.world.get::<&GasTank>(entity).is_ok() {
            "gas tank"
        } else if self.world.get::<&EnvironmentPort>(entity).is_ok() {
            "environment port"
        } else {
            "non-device"
        }
    }
}
