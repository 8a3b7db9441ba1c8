//! Simulation engine - main entry point for running the gas simulation

use hecs::{Entity, EntityBuilder, World};
use pipeworks_logic::{FlowTick, GasMixture};

use crate::components::*;
use crate::config::SimulationConfig;
use crate::environment::{Environment, TilePos};
use crate::error::{PipeworksError, Result};
use crate::events::DeviceSignal;
use crate::pipe_net::{NetId, NodeAir, NodeId, PipeGraph, RefloodReport};
use crate::systems::*;

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world containing devices, pipes, ports and tanks
    pub world: World,
    /// Simulation time in seconds since start
    pub sim_time: f64,
    pub(crate) graph: PipeGraph,
    pub(crate) environment: Environment,
    pub(crate) config: SimulationConfig,
    pub(crate) signals: Vec<DeviceSignal>,

    // Configuration
    time_scale: f32,
}

impl SimulationEngine {
    /// Create a new empty simulation with default settings
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    pub fn with_config(config: SimulationConfig) -> Self {
        Self {
            world: World::new(),
            sim_time: 0.0,
            graph: PipeGraph::new(),
            environment: Environment::new(),
            time_scale: config.time_scale,
            config,
            signals: Vec::new(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// Advance the simulation by `delta_seconds` real seconds.
    ///
    /// Order: queued reflood, startup hooks, network equalization, then
    /// every device once.
    pub fn update(&mut self, delta_seconds: f32) {
        let tick = self.flow_tick(delta_seconds);
        if !tick.is_degenerate() {
            self.sim_time += tick.dt as f64;
        }

        self.apply_reflood();
        canister_startup_system(&mut self.world, &mut self.graph);
        if self.config.equalize_networks {
            equalize_networks(&mut self.graph);
        }

        let mut ctx = SimulationContext {
            graph: &mut self.graph,
            environment: &mut self.environment,
            tick,
            signals: &mut self.signals,
        };
        device_system(&mut self.world, &mut ctx);
    }

    /// Update a single device, for hosts that drive devices individually.
    /// Networks are not equalized here; call `equalize_networks` when the
    /// host's device round is done. Returns false if the entity is not a
    /// device or could not resolve its nodes.
    pub fn on_device_tick(&mut self, entity: Entity, delta_seconds: f32) -> bool {
        let tick = self.flow_tick(delta_seconds);
        self.apply_reflood();

        let Ok((device, nodes, location, holding)) = self.world.query_one_mut::<(
            &mut GasDevice,
            &NodeContainer,
            Option<&Location>,
            Option<&HoldingTankSlot>,
        )>(entity) else {
            return false;
        };
        if let GasDevice::Canister(canister) = device {
            start_canister(entity, canister, nodes, &mut self.graph);
        }

        let mut ctx = SimulationContext {
            graph: &mut self.graph,
            environment: &mut self.environment,
            tick,
            signals: &mut self.signals,
        };
        update_device(entity, device, nodes, location, holding, &mut ctx).is_some()
    }

    /// Pool every network's owned air now. Returns networks pooled.
    pub fn equalize_networks(&mut self) -> usize {
        self.apply_reflood();
        equalize_networks(&mut self.graph)
    }

    /// Run the queued reflood, if any.
    pub fn apply_reflood(&mut self) -> Option<RefloodReport> {
        if !self.graph.needs_reflood() {
            return None;
        }
        let report = self.graph.reflood();
        log::debug!(
            "reflood: {} seeds, {} nodes, {} components ({} reused, {} created, {} removed)",
            report.seeds,
            report.nodes_visited,
            report.components,
            report.reused,
            report.created,
            report.removed
        );
        Some(report)
    }

    fn flow_tick(&self, delta_seconds: f32) -> FlowTick {
        FlowTick::new(delta_seconds * self.time_scale).with_speedup(self.config.pump_speedup)
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = if scale.is_finite() { scale.max(0.0) } else { 0.0 };
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Simulation time in seconds
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn graph(&self) -> &PipeGraph {
        &self.graph
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    /// Take every signal raised since the last call.
    pub fn drain_signals(&mut self) -> Vec<DeviceSignal> {
        std::mem::take(&mut self.signals)
    }

    // ========================================================================
    // SPAWNING
    // ========================================================================

    /// Spawn a device with one fresh node per port. Open valves start linked.
    /// A canister's port is sized to its initial mixture.
    pub fn spawn_device(&mut self, device: GasDevice, tile: TilePos) -> Entity {
        let entity = self.world.reserve_entity();
        let volume = match &device {
            GasDevice::Canister(canister) if canister.initial_mixture.volume() > 0.0 => {
                canister.initial_mixture.volume()
            }
            _ => self.config.pipe_volume,
        };
        let ports: Vec<(PortKind, NodeId)> = device
            .ports()
            .iter()
            .map(|port| {
                let air = NodeAir::Owned(GasMixture::new(volume));
                (*port, self.graph.add_node(entity, air, tile))
            })
            .collect();
        let nodes = NodeContainer::new(ports);

        if let GasDevice::Valve(Valve { open: true }) = device {
            if let (Some(inlet), Some(outlet)) = (nodes.inlet(), nodes.outlet()) {
                self.graph.add_link(inlet, outlet);
            }
        }

        let mut builder = EntityBuilder::new();
        builder.add(Location(tile)).add(Anchorable::default());
        if let GasDevice::Canister(_) = device {
            builder.add(HoldingTankSlot::default());
        }
        builder.add(nodes).add(device);
        self.world.spawn_at(entity, builder.build());
        entity
    }

    /// Spawn a device from a named config prototype.
    pub fn spawn_prototype(&mut self, name: &str, tile: TilePos) -> Result<Entity> {
        let device = self
            .config
            .prototypes
            .get(name)
            .cloned()
            .ok_or_else(|| PipeworksError::UnknownPrototype(name.to_string()))?;
        Ok(self.spawn_device(device, tile))
    }

    pub fn spawn_pipe(&mut self, tile: TilePos) -> Entity {
        let entity = self.world.reserve_entity();
        let air = NodeAir::Owned(GasMixture::new(self.config.pipe_volume));
        let node = self.graph.add_node(entity, air, tile);
        self.world.spawn_at(
            entity,
            (
                Pipe,
                Location(tile),
                Anchorable::default(),
                NodeContainer::new(vec![(PortKind::Pipe, node)]),
            ),
        );
        entity
    }

    /// A connector whose node is the tile's own air.
    pub fn spawn_environment_port(&mut self, tile: TilePos) -> Entity {
        let entity = self.world.reserve_entity();
        let node = self.graph.add_node(entity, NodeAir::Environment, tile);
        self.world.spawn_at(
            entity,
            (
                EnvironmentPort,
                Location(tile),
                NodeContainer::new(vec![(PortKind::Port, node)]),
            ),
        );
        entity
    }

    /// A portable tank holding `mixture`, ready for `insert_holding_tank`.
    pub fn spawn_gas_tank(&mut self, mixture: GasMixture, tile: TilePos) -> Entity {
        let entity = self.world.reserve_entity();
        let node = self.graph.add_node(entity, NodeAir::Owned(mixture), tile);
        self.world.spawn_at(
            entity,
            (
                GasTank,
                Location(tile),
                NodeContainer::new(vec![(PortKind::Port, node)]),
            ),
        );
        entity
    }

    /// Remove an entity and its nodes. Canister slots holding it are freed.
    pub fn despawn(&mut self, entity: Entity) -> Result<()> {
        if !self.world.contains(entity) {
            return Err(PipeworksError::UnknownEntity(entity));
        }
        for (_, slot) in self.world.query_mut::<&mut HoldingTankSlot>() {
            if slot.tank() == Some(entity) {
                slot.0 = None;
            }
        }
        let held = self
            .world
            .get::<&HoldingTankSlot>(entity)
            .ok()
            .and_then(|slot| slot.node());
        if let Some(tank_node) = held {
            self.graph.set_pooled(tank_node, true);
        }
        let owned: Vec<NodeId> = match self.world.get::<&NodeContainer>(entity) {
            Ok(nodes) => nodes.iter().map(|(_, id)| id).collect(),
            Err(_) => Vec::new(),
        };
        for id in owned {
            self.graph.remove_node(id);
        }
        self.world
            .despawn(entity)
            .map_err(|_| PipeworksError::UnknownEntity(entity))
    }

    // ========================================================================
    // TOPOLOGY
    // ========================================================================

    /// Run a static pipe between two ports.
    pub fn connect(&mut self, a: (Entity, PortKind), b: (Entity, PortKind)) -> Result<()> {
        let (a, b) = (self.require_node(a)?, self.require_node(b)?);
        if a == b {
            return Err(PipeworksError::SelfConnection);
        }
        self.graph.connect(a, b);
        Ok(())
    }

    pub fn disconnect(&mut self, a: (Entity, PortKind), b: (Entity, PortKind)) -> Result<()> {
        let (a, b) = (self.require_node(a)?, self.require_node(b)?);
        if a == b {
            return Err(PipeworksError::SelfConnection);
        }
        self.graph.disconnect(a, b);
        Ok(())
    }

    pub(crate) fn require_node(&self, (entity, port): (Entity, PortKind)) -> Result<NodeId> {
        if !self.world.contains(entity) {
            return Err(PipeworksError::UnknownEntity(entity));
        }
        self.node(entity, port)
            .ok_or(PipeworksError::UnknownNode(entity))
    }

    /// Pipe node behind one of an entity's ports.
    pub fn node(&self, entity: Entity, port: PortKind) -> Option<NodeId> {
        self.world
            .get::<&NodeContainer>(entity)
            .ok()
            .and_then(|nodes| nodes.get(port))
    }

    /// Network of one of an entity's ports, as of the last reflood.
    pub fn network_of(&self, entity: Entity, port: PortKind) -> Option<NetId> {
        self.graph.net_of(self.node(entity, port)?)
    }

    pub fn network_size(&self, net: NetId) -> usize {
        self.graph.net(net).map_or(0, |net| net.len())
    }

    pub fn network_count(&self) -> usize {
        self.graph.net_count()
    }

    /// The mixture a port reads: its own air, or its tile's.
    pub fn node_air(&self, entity: Entity, port: PortKind) -> Option<&GasMixture> {
        let node = self.graph.node(self.node(entity, port)?)?;
        match &node.air {
            NodeAir::Owned(mixture) => Some(mixture),
            NodeAir::Environment => self.environment.get_mixture(node.tile),
        }
    }

    /// Replace a port's own air. Environmental ports cannot be filled.
    pub fn fill_node(&mut self, entity: Entity, port: PortKind, mixture: GasMixture) -> Result<()> {
        let id = self.require_node((entity, port))?;
        match self.graph.node_mut(id).map(|node| &mut node.air) {
            Some(NodeAir::Owned(air)) => {
                *air = mixture;
                Ok(())
            }
            _ => Err(PipeworksError::UnsupportedCommand {
                command: "fill_node",
                kind: "environment port",
            }),
        }
    }

    /// Moles held in owned node air plus every mutable tile.
    pub fn total_moles(&self) -> f32 {
        let pipes: f32 = self
            .graph
            .iter()
            .filter_map(|(_, node)| node.owned_air())
            .map(GasMixture::total_moles)
            .sum();
        pipes + self.environment.total_moles()
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}
