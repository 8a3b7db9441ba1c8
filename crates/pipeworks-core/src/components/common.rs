//! Common components used across multiple entity types.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::environment::TilePos;
use crate::pipe_net::NodeId;

/// Tile the entity sits on; its ambient atmosphere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location(pub TilePos);

/// Anchored entities connect to adjacent pipes. Unanchoring disables the
/// pipe edges of every node the entity owns; links stay up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchorable {
    pub anchored: bool,
}

impl Default for Anchorable {
    fn default() -> Self {
        Self { anchored: true }
    }
}

/// Plain pipe segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipe;

/// Connector whose node breathes the tile it sits on.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentPort;

/// Portable gas tank that can be slotted into a canister.
#[derive(Debug, Clone, Copy, Default)]
pub struct GasTank;

/// A tank sitting in a canister, with the port node the canister releases
/// into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldTank {
    pub entity: Entity,
    pub node: NodeId,
}

/// A canister's holding-tank slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldingTankSlot(pub Option<HeldTank>);

impl HoldingTankSlot {
    pub fn tank(&self) -> Option<Entity> {
        self.0.map(|held| held.entity)
    }

    pub fn node(&self) -> Option<NodeId> {
        self.0.map(|held| held.node)
    }
}
