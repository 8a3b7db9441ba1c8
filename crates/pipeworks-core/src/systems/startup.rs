//! Startup hooks - one-time fills that run before the first flow pass.

use hecs::{Entity, World};
use pipeworks_logic::canister::Canister;

use crate::components::{GasDevice, NodeContainer, PortKind};
use crate::pipe_net::{NodeAir, PipeGraph};

/// Fill every canister that has not yet dumped its initial mixture into
/// its port node. Canisters whose port cannot be resolved wait for a later
/// tick. Returns how many started.
pub fn canister_startup_system(world: &mut World, graph: &mut PipeGraph) -> usize {
    let mut started = 0;
    for (entity, (device, nodes)) in world.query_mut::<(&mut GasDevice, &NodeContainer)>() {
        if let GasDevice::Canister(canister) = device {
            if start_canister(entity, canister, nodes, graph) {
                started += 1;
            }
        }
    }
    started
}

/// Run one canister's startup fill if it is still pending.
pub fn start_canister(
    entity: Entity,
    canister: &mut Canister,
    nodes: &NodeContainer,
    graph: &mut PipeGraph,
) -> bool {
    if canister.initialized {
        return false;
    }
    let Some(node) = nodes
        .get(PortKind::Port)
        .and_then(|port| graph.node_mut(port))
    else {
        return false;
    };
    let NodeAir::Owned(air) = &mut node.air else {
        return false;
    };
    if !canister.start(air) {
        return false;
    }
    log::debug!("canister {entity:?} filled port to {:.1} kPa", air.pressure());
    true
}
