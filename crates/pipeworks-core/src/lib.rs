//! Pipeworks Core - Gas Pipe Network Simulation Engine
//!
//! Moves gas mixtures through a graph of pipe nodes driven by pumps, valves,
//! regulators, canisters and other devices, with ambient tile atmospheres
//! on the other side of vents and leaks.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Devices, pipe segments, environment ports, gas tanks
//! - **Components**: Pure data attached to entities (GasDevice, NodeContainer, Location, etc.)
//! - **Systems**: Functions that run one pass of the tick over the world
//!
//! Topology lives beside the world in a `PipeGraph` (slab arenas of nodes
//! and networks) and ambient air in an `Environment` keyed by tile.
//!
//! | Module | Role |
//! |---|---|
//! | `pipe_net` | Nodes, pipes, links and the batched reflood |
//! | `environment` | Tile mixtures |
//! | `components` | ECS components |
//! | `systems` | Startup, equalization and device passes |
//! | `engine` | Tick driver, spawning and topology API |
//! | `commands` | Setpoint and topology commands |
//! | `snapshot` | Read surface |
//! | `config` | JSON configuration and device prototypes |
//!
//! # Example
//!
//! ```rust,no_run
//! use pipeworks_core::prelude::*;
//! use pipeworks_logic::pumps::PressurePump;
//!
//! let mut engine = SimulationEngine::new();
//! let pump = engine.spawn_device(
//!     GasDevice::PressurePump(PressurePump::default()),
//!     TilePos::new(0, 0),
//! );
//! let pipe = engine.spawn_pipe(TilePos::new(1, 0));
//! engine.connect((pump, PortKind::Outlet), (pipe, PortKind::Pipe))?;
//!
//! // Run simulation
//! loop {
//!     engine.update(1.0 / 60.0); // 60 FPS
//! }
//! # Ok::<(), PipeworksError>(())
//! ```

pub mod commands;
pub mod components;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod events;
pub mod pipe_net;
pub mod snapshot;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::SimulationConfig;
    pub use crate::engine::SimulationEngine;
    pub use crate::environment::{Environment, TilePos};
    pub use crate::error::PipeworksError;
    pub use crate::events::DeviceSignal;
    pub use crate::pipe_net::{NetId, NodeId};
    pub use crate::snapshot::DeviceSnapshot;
}
