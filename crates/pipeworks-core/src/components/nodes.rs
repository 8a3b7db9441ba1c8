//! Which pipe nodes an entity owns, by port.

use serde::{Deserialize, Serialize};

use crate::pipe_net::NodeId;

/// Named attachment point on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    Inlet,
    Outlet,
    /// Single port of a one-sided device (canister, gas tank).
    Port,
    /// The node of a plain pipe segment or environment connector.
    Pipe,
}

#[derive(Debug, Clone, Default)]
pub struct NodeContainer {
    nodes: Vec<(PortKind, NodeId)>,
}

impl NodeContainer {
    pub fn new(nodes: Vec<(PortKind, NodeId)>) -> Self {
        Self { nodes }
    }

    pub fn get(&self, port: PortKind) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(kind, _)| *kind == port)
            .map(|(_, id)| *id)
    }

    pub fn inlet(&self) -> Option<NodeId> {
        self.get(PortKind::Inlet)
    }

    pub fn outlet(&self) -> Option<NodeId> {
        self.get(PortKind::Outlet)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PortKind, NodeId)> + '_ {
        self.nodes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
