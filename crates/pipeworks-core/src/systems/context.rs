//! Borrowed simulation state handed to device updates.
//!
//! Mixtures are lent to a device by moving them out of their arena slot and
//! moving them back afterwards, so a device never holds two references to
//! the same mixture. Requests that would alias are refused.

use pipeworks_logic::{FlowTick, GasMixture};

use crate::environment::{Environment, TilePos};
use crate::events::DeviceSignal;
use crate::pipe_net::{NodeAir, NodeId, PipeGraph};

/// Something a device can borrow a mixture from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixtureSlot {
    Node(NodeId),
    Tile(TilePos),
}

pub struct SimulationContext<'a> {
    pub graph: &'a mut PipeGraph,
    pub environment: &'a mut Environment,
    pub tick: FlowTick,
    pub signals: &'a mut Vec<DeviceSignal>,
}

impl<'a> SimulationContext<'a> {
    /// Follow environmental nodes to their tile; `None` if nothing is there.
    fn resolve(&self, slot: MixtureSlot) -> Option<MixtureSlot> {
        match slot {
            MixtureSlot::Node(id) => {
                let node = self.graph.node(id)?;
                match node.air {
                    NodeAir::Owned(_) => Some(slot),
                    NodeAir::Environment => {
                        self.resolve(MixtureSlot::Tile(node.tile))
                    }
                }
            }
            MixtureSlot::Tile(pos) => self.environment.get_mixture(pos).map(|_| slot),
        }
    }

    fn take(&mut self, slot: MixtureSlot) -> Option<GasMixture> {
        match slot {
            MixtureSlot::Node(id) => match &mut self.graph.node_mut(id)?.air {
                NodeAir::Owned(mix) => Some(std::mem::take(mix)),
                NodeAir::Environment => None,
            },
            MixtureSlot::Tile(pos) => self.environment.take(pos),
        }
    }

    fn restore(&mut self, slot: MixtureSlot, mixture: GasMixture) {
        match slot {
            MixtureSlot::Node(id) => {
                if let Some(node) = self.graph.node_mut(id) {
                    if let NodeAir::Owned(mix) = &mut node.air {
                        *mix = mixture;
                    }
                }
            }
            MixtureSlot::Tile(pos) => self.environment.restore(pos, mixture),
        }
    }

    fn give_back(&mut self, slots: &[MixtureSlot], mixtures: Vec<GasMixture>) {
        for (slot, mixture) in slots.iter().zip(mixtures) {
            self.restore(*slot, mixture);
        }
    }

    /// Read-only view of whatever a slot resolves to.
    pub fn mixture(&self, slot: MixtureSlot) -> Option<&GasMixture> {
        match self.resolve(slot)? {
            MixtureSlot::Node(id) => self.graph.node(id)?.owned_air(),
            MixtureSlot::Tile(pos) => self.environment.get_mixture(pos),
        }
    }

    /// Lend `N` distinct mixtures to `f`. Returns `None` without calling `f`
    /// if any slot is missing or two slots resolve to the same mixture.
    pub fn with_mixtures<const N: usize, R>(
        &mut self,
        slots: [MixtureSlot; N],
        f: impl FnOnce(&mut [GasMixture; N]) -> R,
    ) -> Option<R> {
        self.with_mixtures_and_ambient(slots, None, |mixtures, _| f(mixtures))
    }

    /// Like `with_mixtures`, plus an optional ambient tile. The ambient is
    /// dropped (not the whole call) when it is missing or aliases a slot.
    pub fn with_mixtures_and_ambient<const N: usize, R>(
        &mut self,
        slots: [MixtureSlot; N],
        ambient: Option<TilePos>,
        f: impl FnOnce(&mut [GasMixture; N], Option<&mut GasMixture>) -> R,
    ) -> Option<R> {
        let mut resolved: Vec<MixtureSlot> = Vec::with_capacity(N);
        for slot in slots {
            let slot = self.resolve(slot)?;
            if resolved.contains(&slot) {
                return None;
            }
            resolved.push(slot);
        }
        let ambient = ambient
            .and_then(|pos| self.resolve(MixtureSlot::Tile(pos)))
            .filter(|slot| !resolved.contains(slot));

        let mut taken = Vec::with_capacity(N);
        for slot in &resolved {
            match self.take(*slot) {
                Some(mixture) => taken.push(mixture),
                None => {
                    let lent = taken.len();
                    self.give_back(&resolved[..lent], taken);
                    return None;
                }
            }
        }
        let mut mixtures: [GasMixture; N] = match taken.try_into() {
            Ok(mixtures) => mixtures,
            Err(taken) => {
                self.give_back(&resolved, taken);
                return None;
            }
        };
        let mut ambient_mixture = ambient.and_then(|slot| self.take(slot));

        let result = f(&mut mixtures, ambient_mixture.as_mut());

        if let (Some(slot), Some(mixture)) = (ambient, ambient_mixture) {
            self.restore(slot, mixture);
        }
        self.give_back(&resolved, Vec::from(mixtures));
        Some(result)
    }
}
