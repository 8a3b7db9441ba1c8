//! Error types for commands, topology edits and config loading.
//!
//! The tick path never fails; anything it cannot resolve is skipped.

use hecs::Entity;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipeworksError>;

#[derive(Error, Debug)]
pub enum PipeworksError {
    #[error("unknown entity {0:?}")]
    UnknownEntity(Entity),

    #[error("{command} is not supported by {kind} devices")]
    UnsupportedCommand {
        command: &'static str,
        kind: &'static str,
    },

    #[error("no device prototype named '{0}'")]
    UnknownPrototype(String),

    #[error("entity {0:?} has no pipe node on that port")]
    UnknownNode(Entity),

    #[error("cannot connect a pipe node to itself")]
    SelfConnection,

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
