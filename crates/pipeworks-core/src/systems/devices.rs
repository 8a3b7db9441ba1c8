//! Device flow pass - one handler per device kind.
//!
//! Every handler resolves the nodes it needs through the entity's
//! `NodeContainer`, borrows the mixtures from the context and runs the
//! device's flow algorithm. Anything unresolvable skips the device quietly.

use hecs::{Entity, World};
use pipeworks_logic::FlowReport;

use crate::components::{GasDevice, HoldingTankSlot, Location, NodeContainer, PortKind};
use crate::events::DeviceSignal;

use super::{MixtureSlot, SimulationContext};

/// Run every device once.
pub fn device_system(world: &mut World, ctx: &mut SimulationContext) -> usize {
    let mut updated = 0;
    for (entity, (device, nodes, location, holding)) in world.query_mut::<(
        &mut GasDevice,
        &NodeContainer,
        Option<&Location>,
        Option<&HoldingTankSlot>,
    )>() {
        if update_device(entity, device, nodes, location, holding, ctx).is_some() {
            updated += 1;
        }
    }
    updated
}

/// Update one device. `None` means the device was skipped this tick.
pub fn update_device(
    entity: Entity,
    device: &mut GasDevice,
    nodes: &NodeContainer,
    location: Option<&Location>,
    holding: Option<&HoldingTankSlot>,
    ctx: &mut SimulationContext,
) -> Option<FlowReport> {
    let tick = ctx.tick;
    let ambient = location.map(|loc| loc.0);
    let kind = device.kind();

    match device {
        GasDevice::PressurePump(pump) => {
            let slots = two_port(nodes)?;
            ctx.with_mixtures(slots, |[inlet, outlet]| pump.update(inlet, outlet, &tick))
        }
        GasDevice::PassiveGate(gate) => {
            let slots = two_port(nodes)?;
            ctx.with_mixtures(slots, |[inlet, outlet]| gate.update(inlet, outlet, &tick))
        }
        GasDevice::VolumePump(pump) => {
            let slots = two_port(nodes)?;
            ctx.with_mixtures_and_ambient(slots, ambient, |[inlet, outlet], tile| {
                pump.update(inlet, outlet, tile, &tick)
            })
        }
        GasDevice::PressureRegulator(regulator) => {
            let slots = two_port(nodes)?;
            let was_open = regulator.open;
            let report = ctx.with_mixtures(slots, |[inlet, outlet]| {
                regulator.update(inlet, outlet, &tick)
            })?;
            if regulator.open != was_open {
                log::debug!(
                    "{} {entity:?} {}",
                    kind.name(),
                    if was_open { "closed" } else { "opened" }
                );
            }
            Some(report)
        }
        GasDevice::Recycler(recycler) => {
            let slots = two_port(nodes)?;
            ctx.with_mixtures(slots, |[inlet, outlet]| recycler.update(inlet, outlet, &tick))
        }
        GasDevice::MixingPort(port) => {
            let slots = two_port(nodes)?;
            ctx.with_mixtures(slots, |[a, b]| port.update(a, b, &tick))
        }
        GasDevice::Canister(canister) => {
            let port = MixtureSlot::Node(nodes.get(PortKind::Port)?);
            match holding.and_then(HoldingTankSlot::node) {
                Some(tank) => ctx.with_mixtures([port, MixtureSlot::Node(tank)], |[air, tank]| {
                    canister.update_into_tank(air, tank, &tick)
                }),
                None => ctx.with_mixtures_and_ambient([port], ambient, |[air], tile| {
                    canister.update(air, tile, &tick)
                }),
            }
        }
        GasDevice::DualPortVentPump(vent) => {
            let [inlet, outlet] = two_port(nodes)?;
            let tile = MixtureSlot::Tile(ambient?);
            ctx.with_mixtures([inlet, outlet, tile], |[inlet, outlet, tile]| {
                vent.update(inlet, outlet, tile, &tick)
            })
        }
        GasDevice::PowerTap(tap) => {
            let inlet = MixtureSlot::Node(nodes.inlet()?);
            let (report, flipped) = ctx.with_mixtures_and_ambient([inlet], ambient, |[air], tile| {
                tap.update(air, tile, &tick)
            })?;
            if let Some(powered) = flipped {
                log::debug!("power tap {entity:?} powered={powered}");
                ctx.signals
                    .push(DeviceSignal::PowerStateChanged { entity, powered });
            }
            Some(report)
        }
        // Valves only change topology, through commands.
        GasDevice::Valve(_) => Some(FlowReport::IDLE),
    }
}

fn two_port(nodes: &NodeContainer) -> Option<[MixtureSlot; 2]> {
    Some([
        MixtureSlot::Node(nodes.inlet()?),
        MixtureSlot::Node(nodes.outlet()?),
    ])
}
