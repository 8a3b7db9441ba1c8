//! Systems - logic that operates on components

mod context;
mod devices;
mod network;
mod startup;

pub use context::*;
pub use devices::*;
pub use network::*;
pub use startup::*;
