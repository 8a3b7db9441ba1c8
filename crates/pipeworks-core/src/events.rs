//! Signals devices raise for the host to consume.

use hecs::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSignal {
    /// A power tap started or stopped being powered.
    PowerStateChanged { entity: Entity, powered: bool },
}
