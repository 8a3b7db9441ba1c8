//! Physical and tuning constants shared by the gas math and every device.
//!
//! Units: pressure in kPa, volume in liters, temperature in kelvin,
//! amounts in moles, time in seconds.

/// Ideal gas constant in kPa·L/(K·mol).
pub const R: f32 = 8.314_463;

/// One standard atmosphere in kPa.
pub const ONE_ATMOSPHERE: f32 = 101.325;

/// Cosmic microwave background temperature, the floor for any mixture.
pub const TCMB: f32 = 2.7;
/// 0 °C in kelvin.
pub const T0C: f32 = 273.15;
/// 20 °C in kelvin.
pub const T20C: f32 = 293.15;

/// Volume of one environment tile in liters.
pub const CELL_VOLUME: f32 = 2500.0;

/// Default volume of a pipe node in liters.
pub const PIPE_VOLUME: f32 = 200.0;

/// Per-species amounts below this are zeroed after a split.
pub const GAS_MIN_MOLES: f32 = 0.000_000_05;

/// Heat capacity floor so empty mixtures never divide by zero.
pub const MINIMUM_HEAT_CAPACITY: f32 = 0.0003;

/// Temperature differences below this are not worth blending.
pub const MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER: f32 = 0.5;

/// Highest pressure any pump-like device may target.
pub const MAX_OUTPUT_PRESSURE: f32 = 4500.0;

/// Nominal maximum volumetric rate for rate-limited devices, L/s.
pub const MAX_TRANSFER_RATE: f32 = 200.0;

/// Pressure difference below which a pump considers its target reached.
pub const PUMP_PRESSURE_TOLERANCE: f32 = 0.01;

/// Pressure difference a passive release mechanism needs to overcome friction.
pub const RELEASE_FRICTION_PRESSURE: f32 = 10.0;
