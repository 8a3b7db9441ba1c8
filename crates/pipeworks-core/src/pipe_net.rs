//! Pipe nodes, pipe networks and the deferred reflood pass.
//!
//! Nodes live in a `slab` arena and reference each other by `NodeId`.
//! Topology edits only queue the touched nodes; `PipeGraph::reflood`
//! recomputes membership for the networks those nodes belonged to, once,
//! at the start of the next tick. Reflood never moves gas.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hecs::Entity;
use pipeworks_logic::GasMixture;
use slab::Slab;

use crate::environment::TilePos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(pub usize);

/// Where a node's gas lives.
#[derive(Debug, Clone)]
pub enum NodeAir {
    Owned(GasMixture),
    /// Delegates to the environment tile under the node.
    Environment,
}

#[derive(Debug, Clone)]
pub struct PipeNode {
    pub owner: Entity,
    pub air: NodeAir,
    pub tile: TilePos,
    /// Static pipe adjacency. Only traversed while both ends have
    /// connections enabled.
    pipes: BTreeSet<NodeId>,
    /// Always-reachable links (open valves, inserted holding tanks).
    links: BTreeSet<NodeId>,
    connections_enabled: bool,
    /// Whether network equalization shares this node's air. A tank held in
    /// a canister stays on the canister's network but keeps its own gas.
    pooled: bool,
    net: Option<NetId>,
}

impl PipeNode {
    pub fn pipes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pipes.iter().copied()
    }

    pub fn links(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.links.iter().copied()
    }

    pub fn connections_enabled(&self) -> bool {
        self.connections_enabled
    }

    pub fn pooled(&self) -> bool {
        self.pooled
    }

    /// Network as of the last reflood.
    pub fn net(&self) -> Option<NetId> {
        self.net
    }

    pub fn owned_air(&self) -> Option<&GasMixture> {
        match &self.air {
            NodeAir::Owned(mix) => Some(mix),
            NodeAir::Environment => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipeNet {
    nodes: BTreeSet<NodeId>,
}

impl PipeNet {
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Summary of one reflood pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefloodReport {
    pub seeds: usize,
    pub nodes_visited: usize,
    pub components: usize,
    pub reused: usize,
    pub created: usize,
    pub removed: usize,
}

#[derive(Debug, Default)]
pub struct PipeGraph {
    nodes: Slab<PipeNode>,
    nets: Slab<PipeNet>,
    pending: BTreeSet<NodeId>,
}

impl PipeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // NODES
    // ========================================================================

    pub fn add_node(&mut self, owner: Entity, air: NodeAir, tile: TilePos) -> NodeId {
        let id = NodeId(self.nodes.insert(PipeNode {
            owner,
            air,
            tile,
            pipes: BTreeSet::new(),
            links: BTreeSet::new(),
            connections_enabled: true,
            pooled: true,
            net: None,
        }));
        self.pending.insert(id);
        id
    }

    /// Detach a node from everything and drop it. Its former neighbours and
    /// network are queued for reflood.
    pub fn remove_node(&mut self, id: NodeId) -> Option<PipeNode> {
        if !self.nodes.contains(id.0) {
            return None;
        }
        let node = self.nodes.remove(id.0);
        self.pending.remove(&id);

        for other in node.pipes.iter().chain(node.links.iter()) {
            if let Some(neighbour) = self.nodes.get_mut(other.0) {
                neighbour.pipes.remove(&id);
                neighbour.links.remove(&id);
                self.pending.insert(*other);
            }
        }

        if let Some(net_id) = node.net {
            let emptied = match self.nets.get_mut(net_id.0) {
                Some(net) => {
                    net.nodes.remove(&id);
                    if let Some(first) = net.nodes.iter().next() {
                        self.pending.insert(*first);
                    }
                    net.nodes.is_empty()
                }
                None => false,
            };
            if emptied {
                self.nets.remove(net_id.0);
            }
        }

        Some(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn node(&self, id: NodeId) -> Option<&PipeNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut PipeNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &PipeNode)> {
        self.nodes.iter().map(|(key, node)| (NodeId(key), node))
    }

    // ========================================================================
    // TOPOLOGY EDITS
    // ========================================================================

    /// Add a static pipe between two nodes. Returns false if either is
    /// missing or they are the same node.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> bool {
        self.edit_edge(a, b, |node, other| {
            node.pipes.insert(other);
        })
    }

    pub fn disconnect(&mut self, a: NodeId, b: NodeId) -> bool {
        self.edit_edge(a, b, |node, other| {
            node.pipes.remove(&other);
        })
    }

    pub fn add_link(&mut self, a: NodeId, b: NodeId) -> bool {
        self.edit_edge(a, b, |node, other| {
            node.links.insert(other);
        })
    }

    pub fn remove_link(&mut self, a: NodeId, b: NodeId) -> bool {
        self.edit_edge(a, b, |node, other| {
            node.links.remove(&other);
        })
    }

    fn edit_edge(&mut self, a: NodeId, b: NodeId, edit: impl Fn(&mut PipeNode, NodeId)) -> bool {
        if a == b {
            return false;
        }
        let Some((node_a, node_b)) = self.nodes.get2_mut(a.0, b.0) else {
            return false;
        };
        edit(node_a, b);
        edit(node_b, a);
        self.pending.insert(a);
        self.pending.insert(b);
        true
    }

    /// Enable or disable a node's pipe edges. Links are unaffected.
    pub fn set_connections_enabled(&mut self, id: NodeId, enabled: bool) -> bool {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };
        if node.connections_enabled != enabled {
            node.connections_enabled = enabled;
            self.pending.insert(id);
        }
        true
    }

    /// Include or exclude a node from network equalization. Membership is
    /// unaffected, so no reflood is queued.
    pub fn set_pooled(&mut self, id: NodeId, pooled: bool) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) => {
                node.pooled = pooled;
                true
            }
            None => false,
        }
    }

    pub fn request_reflood(&mut self, id: NodeId) {
        if self.nodes.contains(id.0) {
            self.pending.insert(id);
        }
    }

    pub fn needs_reflood(&self) -> bool {
        !self.pending.is_empty()
    }

    // ========================================================================
    // NETWORKS
    // ========================================================================

    pub fn net(&self, id: NetId) -> Option<&PipeNet> {
        self.nets.get(id.0)
    }

    pub fn net_of(&self, id: NodeId) -> Option<NetId> {
        self.nodes.get(id.0).and_then(|node| node.net)
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    pub fn nets(&self) -> impl Iterator<Item = (NetId, &PipeNet)> {
        self.nets.iter().map(|(key, net)| (NetId(key), net))
    }

    /// Owned mixtures of pooled nodes, grouped by network.
    pub fn owned_airs_by_net(&mut self) -> BTreeMap<NetId, Vec<&mut GasMixture>> {
        let mut groups: BTreeMap<NetId, Vec<&mut GasMixture>> = BTreeMap::new();
        for (_, node) in self.nodes.iter_mut() {
            if !node.pooled {
                continue;
            }
            if let (Some(net), NodeAir::Owned(mix)) = (node.net, &mut node.air) {
                groups.entry(net).or_default().push(mix);
            }
        }
        groups
    }

    fn neighbours(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(id.0) else {
            return Vec::new();
        };
        let mut out: Vec<NodeId> = node
            .links
            .iter()
            .copied()
            .filter(|other| self.nodes.contains(other.0))
            .collect();
        if node.connections_enabled {
            out.extend(node.pipes.iter().copied().filter(|other| {
                self.nodes
                    .get(other.0)
                    .is_some_and(|neighbour| neighbour.connections_enabled)
            }));
        }
        out
    }

    /// Recompute network membership for every queued node and every node
    /// that shared a network with one.
    pub fn reflood(&mut self) -> RefloodReport {
        let seeds: Vec<NodeId> = std::mem::take(&mut self.pending)
            .into_iter()
            .filter(|id| self.nodes.contains(id.0))
            .collect();
        let mut report = RefloodReport {
            seeds: seeds.len(),
            ..Default::default()
        };
        if seeds.is_empty() {
            return report;
        }

        let mut old_nets: BTreeSet<NetId> = BTreeSet::new();
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut todo: Vec<NodeId> = seeds;
        let mut components: Vec<Vec<NodeId>> = Vec::new();

        while let Some(start) = todo.pop() {
            if visited.contains(&start) || !self.nodes.contains(start.0) {
                continue;
            }

            let mut component = Vec::new();
            let mut queue = VecDeque::from([start]);
            visited.insert(start);

            while let Some(current) = queue.pop_front() {
                component.push(current);

                // Pull in the rest of the old network so its leftovers get
                // reassigned even when they are no longer reachable from here.
                if let Some(net) = self.nodes[current.0].net {
                    if old_nets.insert(net) {
                        if let Some(old) = self.nets.get(net.0) {
                            todo.extend(old.nodes.iter().copied());
                        }
                    }
                }

                for next in self.neighbours(current) {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }

            components.push(component);
        }

        report.nodes_visited = visited.len();
        report.components = components.len();

        // Largest component picks first so the fewest nodes change network.
        components.sort_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then_with(|| a.iter().min().cmp(&b.iter().min()))
        });

        let mut claimed: BTreeSet<NetId> = BTreeSet::new();
        for component in components {
            let mut votes: BTreeMap<NetId, usize> = BTreeMap::new();
            for id in &component {
                if let Some(net) = self.nodes[id.0].net {
                    if !claimed.contains(&net) && self.nets.contains(net.0) {
                        *votes.entry(net).or_default() += 1;
                    }
                }
            }
            let reuse = votes
                .into_iter()
                .max_by(|(net_a, count_a), (net_b, count_b)| {
                    count_a.cmp(count_b).then_with(|| net_b.cmp(net_a))
                })
                .map(|(net, _)| net);

            let members: BTreeSet<NodeId> = component.iter().copied().collect();
            let net_id = match reuse {
                Some(net) => {
                    report.reused += 1;
                    if let Some(existing) = self.nets.get_mut(net.0) {
                        existing.nodes = members;
                    }
                    net
                }
                None => {
                    report.created += 1;
                    NetId(self.nets.insert(PipeNet { nodes: members }))
                }
            };
            claimed.insert(net_id);

            for id in component {
                self.nodes[id.0].net = Some(net_id);
            }
        }

        for net in old_nets.difference(&claimed) {
            if self.nets.contains(net.0) {
                self.nets.remove(net.0);
                report.removed += 1;
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Entity {
        let mut world = hecs::World::new();
        world.spawn(())
    }

    fn air() -> NodeAir {
        NodeAir::Owned(GasMixture::new(200.0))
    }

    fn chain(graph: &mut PipeGraph, len: usize) -> Vec<NodeId> {
        let owner = owner();
        let ids: Vec<NodeId> = (0..len)
            .map(|_| graph.add_node(owner, air(), TilePos::default()))
            .collect();
        for pair in ids.windows(2) {
            graph.connect(pair[0], pair[1]);
        }
        ids
    }

    #[test]
    fn test_chain_forms_one_network() {
        let mut graph = PipeGraph::new();
        let ids = chain(&mut graph, 5);
        let report = graph.reflood();

        assert_eq!(report.components, 1);
        assert_eq!(report.created, 1);
        assert_eq!(graph.net_count(), 1);
        let net = graph.net_of(ids[0]).unwrap();
        assert!(ids.iter().all(|id| graph.net_of(*id) == Some(net)));
    }

    #[test]
    fn test_split_keeps_id_on_larger_half() {
        let mut graph = PipeGraph::new();
        let ids = chain(&mut graph, 6);
        graph.reflood();
        let original = graph.net_of(ids[0]).unwrap();

        // Cut between 1 and 2: halves of 2 and 4.
        graph.disconnect(ids[1], ids[2]);
        let report = graph.reflood();

        assert_eq!(report.components, 2);
        assert_eq!(report.reused, 1);
        assert_eq!(report.created, 1);
        assert_eq!(graph.net_of(ids[5]), Some(original));
        assert_ne!(graph.net_of(ids[0]), Some(original));
        assert_eq!(graph.net_count(), 2);
    }

    #[test]
    fn test_merge_removes_absorbed_network() {
        let mut graph = PipeGraph::new();
        let left = chain(&mut graph, 3);
        let right = chain(&mut graph, 2);
        graph.reflood();
        assert_eq!(graph.net_count(), 2);
        let big = graph.net_of(left[0]).unwrap();

        graph.connect(left[2], right[0]);
        let report = graph.reflood();

        assert_eq!(report.removed, 1);
        assert_eq!(graph.net_count(), 1);
        assert_eq!(graph.net_of(right[1]), Some(big));
        assert_eq!(graph.net(big).map(PipeNet::len), Some(5));
    }

    #[test]
    fn test_requests_coalesce_into_one_pass() {
        let mut graph = PipeGraph::new();
        let ids = chain(&mut graph, 4);
        graph.reflood();

        graph.disconnect(ids[0], ids[1]);
        graph.connect(ids[0], ids[1]);
        graph.request_reflood(ids[3]);
        assert!(graph.needs_reflood());

        let report = graph.reflood();
        assert_eq!(report.components, 1);
        assert_eq!(report.created, 0);
        assert!(!graph.needs_reflood());
        assert_eq!(graph.reflood(), RefloodReport::default());
    }

    #[test]
    fn test_disabled_connections_cut_pipes_but_not_links() {
        let mut graph = PipeGraph::new();
        let ids = chain(&mut graph, 3);
        graph.reflood();

        graph.set_connections_enabled(ids[1], false);
        graph.reflood();
        assert_eq!(graph.net_count(), 3);

        graph.add_link(ids[0], ids[1]);
        graph.reflood();
        assert_eq!(graph.net_count(), 2);
        assert_eq!(graph.net_of(ids[0]), graph.net_of(ids[1]));
    }

    #[test]
    fn test_remove_node_splits_network() {
        let mut graph = PipeGraph::new();
        let ids = chain(&mut graph, 3);
        graph.reflood();

        graph.remove_node(ids[1]);
        graph.reflood();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.net_count(), 2);
        assert_ne!(graph.net_of(ids[0]), graph.net_of(ids[2]));
    }

    #[test]
    fn test_removing_lone_node_deletes_its_network() {
        let mut graph = PipeGraph::new();
        let ids = chain(&mut graph, 1);
        graph.reflood();
        assert_eq!(graph.net_count(), 1);

        graph.remove_node(ids[0]);
        assert_eq!(graph.net_count(), 0);
    }

    #[test]
    fn test_self_connection_rejected() {
        let mut graph = PipeGraph::new();
        let ids = chain(&mut graph, 1);
        assert!(!graph.connect(ids[0], ids[0]));
    }
}
