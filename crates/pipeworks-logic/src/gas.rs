//! Gas mixtures - per-species moles, temperature and volume.
//!
//! A `GasMixture` is the leaf value every other part of the simulation moves
//! around. All operations fail closed: invalid quantities are clamped or
//! ignored instead of panicking, and a mixture with no volume or no
//! temperature reads zero pressure.

use serde::{Deserialize, Serialize};

use crate::constants::{
    CELL_VOLUME, GAS_MIN_MOLES, MINIMUM_HEAT_CAPACITY, MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER, R,
    T20C, TCMB,
};

/// Number of gas species tracked by a mixture.
pub const GAS_COUNT: usize = 8;

/// The fixed set of gas species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Gas {
    Oxygen = 0,
    Nitrogen = 1,
    CarbonDioxide = 2,
    Plasma = 3,
    Tritium = 4,
    WaterVapor = 5,
    Ammonia = 6,
    NitrousOxide = 7,
}

impl Gas {
    pub const ALL: [Gas; GAS_COUNT] = [
        Gas::Oxygen,
        Gas::Nitrogen,
        Gas::CarbonDioxide,
        Gas::Plasma,
        Gas::Tritium,
        Gas::WaterVapor,
        Gas::Ammonia,
        Gas::NitrousOxide,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Molar heat capacity in J/(mol·K).
    pub fn specific_heat(self) -> f32 {
        match self {
            Gas::Oxygen => 20.0,
            Gas::Nitrogen => 30.0,
            Gas::CarbonDioxide => 30.0,
            Gas::Plasma => 200.0,
            Gas::Tritium => 10.0,
            Gas::WaterVapor => 40.0,
            Gas::Ammonia => 20.0,
            Gas::NitrousOxide => 40.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Gas::Oxygen => "oxygen",
            Gas::Nitrogen => "nitrogen",
            Gas::CarbonDioxide => "carbon dioxide",
            Gas::Plasma => "plasma",
            Gas::Tritium => "tritium",
            Gas::WaterVapor => "water vapor",
            Gas::Ammonia => "ammonia",
            Gas::NitrousOxide => "nitrous oxide",
        }
    }
}

/// A volume of gas: moles per species at one temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasMixture {
    moles: [f32; GAS_COUNT],
    /// Kelvin.
    temperature: f32,
    /// Liters.
    volume: f32,
    /// Immutable mixtures (space) ignore every mutation.
    immutable: bool,
}

impl Default for GasMixture {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl GasMixture {
    /// Empty mixture of the given volume at 20 °C.
    pub fn new(volume: f32) -> Self {
        Self {
            moles: [0.0; GAS_COUNT],
            temperature: T20C,
            volume: sanitize_non_negative(volume),
            immutable: false,
        }
    }

    /// A vacuum tile: swallows anything merged into it and never changes.
    pub fn space() -> Self {
        Self {
            moles: [0.0; GAS_COUNT],
            temperature: TCMB,
            volume: CELL_VOLUME,
            immutable: true,
        }
    }

    /// Mixture of a single gas filled to `pressure` kPa.
    pub fn filled(volume: f32, temperature: f32, gas: Gas, pressure: f32) -> Self {
        let mut mix = Self::new(volume).with_temperature(temperature);
        if mix.volume > 0.0 {
            let moles = pressure * mix.volume / (R * mix.temperature);
            mix.set_moles(gas, moles);
        }
        mix
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.set_temperature(temperature);
        self
    }

    pub fn with_moles(mut self, gas: Gas, moles: f32) -> Self {
        self.set_moles(gas, moles);
        self
    }

    pub fn moles(&self) -> &[f32; GAS_COUNT] {
        &self.moles
    }

    pub fn get_moles(&self, gas: Gas) -> f32 {
        self.moles[gas.index()]
    }

    /// Overwrite one species. Negative or non-finite quantities store zero.
    pub fn set_moles(&mut self, gas: Gas, quantity: f32) {
        if self.immutable {
            return;
        }
        self.moles[gas.index()] = sanitize_non_negative(quantity);
    }

    /// Add `delta` moles of one species, clamping the result at zero.
    pub fn adjust_moles(&mut self, gas: Gas, delta: f32) {
        if self.immutable || !delta.is_finite() {
            return;
        }
        let slot = &mut self.moles[gas.index()];
        *slot = sanitize_non_negative(*slot + delta);
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn set_temperature(&mut self, temperature: f32) {
        if self.immutable {
            return;
        }
        self.temperature = if temperature.is_nan() {
            TCMB
        } else {
            temperature.max(TCMB)
        };
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = sanitize_non_negative(volume);
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn mark_immutable(&mut self) {
        self.immutable = true;
    }

    pub fn total_moles(&self) -> f32 {
        self.moles.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_moles() <= 0.0
    }

    /// Heat capacity in J/K, never below `MINIMUM_HEAT_CAPACITY`.
    pub fn heat_capacity(&self) -> f32 {
        let capacity: f32 = Gas::ALL
            .iter()
            .map(|gas| self.moles[gas.index()] * gas.specific_heat())
            .sum();
        capacity.max(MINIMUM_HEAT_CAPACITY)
    }

    pub fn thermal_energy(&self) -> f32 {
        self.temperature * self.heat_capacity()
    }

    /// Pressure in kPa from PV = nRT. Zero for degenerate volume or temperature.
    pub fn pressure(&self) -> f32 {
        if !(self.volume > 0.0) || !(self.temperature > 0.0) {
            return 0.0;
        }
        (self.total_moles() * R * self.temperature / self.volume).max(0.0)
    }

    /// Merge `giver` into this mixture, blending temperature by heat capacity.
    pub fn merge(&mut self, giver: GasMixture) {
        if self.immutable {
            return;
        }

        if (self.temperature - giver.temperature).abs() > MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER {
            let own_capacity = self.heat_capacity();
            let giver_capacity = giver.heat_capacity();
            let combined = own_capacity + giver_capacity;
            if combined > MINIMUM_HEAT_CAPACITY {
                let blended = (giver.temperature * giver_capacity
                    + self.temperature * own_capacity)
                    / combined;
                if blended.is_finite() {
                    self.set_temperature(blended);
                }
            }
        }

        for (own, given) in self.moles.iter_mut().zip(giver.moles.iter()) {
            *own = sanitize_non_negative(*own + *given);
        }
    }

    /// Extract `ratio` of every species. The ratio is clamped to `[0, 1]`;
    /// the removed mixture keeps this mixture's temperature and volume.
    pub fn remove_ratio(&mut self, ratio: f32) -> GasMixture {
        let mut removed = GasMixture {
            moles: [0.0; GAS_COUNT],
            temperature: self.temperature,
            volume: self.volume,
            immutable: false,
        };

        if !(ratio > 0.0) {
            return removed;
        }
        let ratio = ratio.min(1.0);

        for (own, taken) in self.moles.iter_mut().zip(removed.moles.iter_mut()) {
            let amount = *own * ratio;
            // Dust stays behind rather than vanishing.
            *taken = if amount >= GAS_MIN_MOLES { amount } else { 0.0 };
            if !self.immutable {
                let left = *own - *taken;
                *own = if left >= GAS_MIN_MOLES { left } else { 0.0 };
            }
        }

        removed
    }

    /// Extract `amount` moles, sampled proportionally from every species.
    pub fn remove_moles(&mut self, amount: f32) -> GasMixture {
        let total = self.total_moles();
        if !(total > 0.0) {
            return self.remove_ratio(0.0);
        }
        self.remove_ratio(amount / total)
    }

    /// Extract the gas that `volume` liters of this mixture hold at its
    /// current pressure and temperature.
    pub fn remove_volume(&mut self, volume: f32) -> GasMixture {
        if !(self.volume > 0.0) {
            return self.remove_ratio(0.0);
        }
        self.remove_ratio(volume / self.volume)
    }

    /// Scale every species by `factor`. Non-finite or negative factors clear.
    pub fn multiply(&mut self, factor: f32) {
        if self.immutable {
            return;
        }
        if !factor.is_finite() || factor < 0.0 {
            self.clear();
            return;
        }
        for moles in self.moles.iter_mut() {
            *moles *= factor;
        }
    }

    pub fn clear(&mut self) {
        if self.immutable {
            return;
        }
        self.moles = [0.0; GAS_COUNT];
    }

    /// Take another mixture's moles and temperature, keeping our own volume.
    pub fn copy_from(&mut self, sample: &GasMixture) {
        if self.immutable {
            return;
        }
        self.moles = sample.moles;
        self.set_temperature(sample.temperature);
    }
}

fn sanitize_non_negative(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
