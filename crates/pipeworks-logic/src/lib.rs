//! Pure gas-pipe logic for Pipeworks.
//!
//! This crate contains the gas math and every device's flow algorithm,
//! independent of any entity world or runtime. Functions take plain
//! mixtures and setpoints and mutate them in place, making them
//! unit-testable and reusable by the engine crate and the headless
//! harness alike.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`canister`] | Startup fill and release valve for portable canisters |
//! | [`constants`] | Physical constants and device tuning limits |
//! | [`flow`] | Per-tick timing and flow reports shared by all devices |
//! | [`gas`] | Gas species and the `GasMixture` value type |
//! | [`mixing_port`] | Volume-weighted sharing between two ports |
//! | [`power_tap`] | Gas-fueled power providers and receivers |
//! | [`pumps`] | Pressure pump, passive gate, volume pump |
//! | [`recycler`] | Square-root orifice flow with CO2/N2O reduction |
//! | [`regulator`] | Pressure regulator and relief valve |
//! | [`transfer`] | Ideal-gas helpers: pump-to, release-to, equalize |
//! | [`vent`] | Dual-port vent pump (release / siphon) |

pub mod canister;
pub mod constants;
pub mod flow;
pub mod gas;
pub mod mixing_port;
pub mod power_tap;
pub mod pumps;
pub mod recycler;
pub mod regulator;
pub mod transfer;
pub mod vent;

pub use flow::{FlowReport, FlowTick};
pub use gas::{Gas, GasMixture, GAS_COUNT};
