//! Ideal-gas transfer helpers shared by the pressure-driven devices.
//!
//! Every helper returns the number of moles it moved (or would move) so
//! callers can report flow without re-reading the mixtures.

use crate::constants::{CELL_VOLUME, PUMP_PRESSURE_TOLERANCE, R, RELEASE_FRICTION_PRESSURE};
use crate::gas::GasMixture;

/// Clamp a setpoint into `[min, max]`. NaN collapses to `min`.
pub fn clamp_setpoint(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Move `moles` from `source` into `dest`. Returns the moles actually moved.
pub fn transfer_moles(source: &mut GasMixture, dest: &mut GasMixture, moles: f32) -> f32 {
    if !(moles > 0.0) {
        return 0.0;
    }
    let removed = source.remove_moles(moles);
    let moved = removed.total_moles();
    dest.merge(removed);
    moved
}

/// Pump from `source` until `output` reads `target_pressure`.
///
/// Computes the moles from the ideal gas law using the source temperature,
/// so a hotter source slightly undershoots and a colder one overshoots.
pub fn pump_gas_to(source: &mut GasMixture, output: &mut GasMixture, target_pressure: f32) -> f32 {
    let pressure_delta = target_pressure - output.pressure();
    if !(pressure_delta >= PUMP_PRESSURE_TOLERANCE) {
        return 0.0;
    }
    if !(source.total_moles() > 0.0) || !(source.temperature() > 0.0) {
        return 0.0;
    }

    let moles = (pressure_delta * output.volume() / (source.temperature() * R)).max(0.0);
    transfer_moles(source, output, moles)
}

/// Release gas from `source` towards `target_pressure` in `output`.
///
/// Needs at least `RELEASE_FRICTION_PRESSURE` of head and never moves more
/// than half the pressure difference. With no output the gas is lost,
/// sized against one environment cell.
pub fn release_gas_to(
    source: &mut GasMixture,
    output: Option<&mut GasMixture>,
    target_pressure: f32,
) -> f32 {
    let output_pressure = output.as_ref().map(|out| out.pressure()).unwrap_or(0.0);
    let input_pressure = source.pressure();

    if output_pressure >= target_pressure.min(input_pressure - RELEASE_FRICTION_PRESSURE) {
        return 0.0;
    }
    if !(source.total_moles() > 0.0) || !(source.temperature() > 0.0) {
        return 0.0;
    }

    let pressure_delta =
        (target_pressure - output_pressure).min((input_pressure - output_pressure) / 2.0);
    let output_volume = output.as_ref().map(|out| out.volume()).unwrap_or(CELL_VOLUME);
    let moles = (pressure_delta * output_volume / (source.temperature() * R)).max(0.0);

    match output {
        Some(out) => transfer_moles(source, out, moles),
        None => source.remove_moles(moles).total_moles(),
    }
}

/// Fraction of the higher-pressure side's moles that must move so both
/// sides end at the same pressure.
///
/// The moving gas expands freely and keeps its temperature; the receiving
/// side's new temperature is the heat-capacity weighted blend, which is why
/// this is a quadratic rather than a plain volume ratio. Degenerate inputs
/// return 0.
pub fn fraction_to_equalize_pressure(a: &GasMixture, b: &GasMixture) -> f32 {
    let (high, low) = if a.pressure() < b.pressure() { (b, a) } else { (a, b) };

    let high_moles = high.total_moles();
    if !(high.volume() > 0.0) || !(high_moles > 0.0) || !(high.temperature() > 0.0) {
        return 0.0;
    }

    let volume_ratio = low.volume() / high.volume();
    let moles_ratio = low.total_moles() / high_moles;
    let temperature_ratio = low.temperature() / high.temperature();
    let heat_capacity_ratio = low.heat_capacity() / high.heat_capacity();

    let qa = 1.0 + volume_ratio;
    let qb = moles_ratio - volume_ratio + heat_capacity_ratio * (temperature_ratio + volume_ratio);
    let qc = heat_capacity_ratio * (moles_ratio * temperature_ratio - volume_ratio);

    let discriminant = qb * qb - 4.0 * qa * qc;
    if !(discriminant >= 0.0) {
        return 0.0;
    }

    let fraction = (-qb + discriminant.sqrt()) / (2.0 * qa);
    clamp_setpoint(fraction, 0.0, 1.0)
}

/// Moles that must leave `mix` to bring it down to `target_pressure` at its
/// current temperature. Negative when the mixture is already below.
pub fn moles_to_pressure_threshold(mix: &GasMixture, target_pressure: f32) -> f32 {
    if !(mix.temperature() > 0.0) {
        return 0.0;
    }
    mix.total_moles() - target_pressure * mix.volume() / (R * mix.temperature())
}

/// Pool every mixture and hand each back its share by volume.
///
/// The pooled temperature is heat-capacity weighted. Immutable members are
/// read but never written.
pub fn equalize(mixtures: &mut [&mut GasMixture]) {
    let total_volume: f32 = mixtures.iter().map(|mix| mix.volume()).sum();
    if !(total_volume > 0.0) || mixtures.len() < 2 {
        return;
    }

    let mut pool = GasMixture::new(total_volume);
    pool.copy_from(&*mixtures[0]);
    for mix in mixtures.iter().skip(1) {
        pool.merge((**mix).clone());
    }

    for mix in mixtures.iter_mut() {
        let share = mix.volume() / total_volume;
        mix.copy_from(&pool);
        mix.multiply(share);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ONE_ATMOSPHERE;
    use crate::gas::Gas;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_clamp_setpoint_nan_goes_to_min() {
        assert_eq!(clamp_setpoint(f32::NAN, 1.0, 5.0), 1.0);
        assert_eq!(clamp_setpoint(9.0, 1.0, 5.0), 5.0);
        assert_eq!(clamp_setpoint(-9.0, 1.0, 5.0), 1.0);
        assert_eq!(clamp_setpoint(f32::INFINITY, 1.0, 5.0), 5.0);
    }

    #[test]
    fn test_pump_gas_to_reaches_target() {
        let mut source = GasMixture::filled(100.0, 300.0, Gas::Nitrogen, 1000.0);
        let mut output = GasMixture::new(50.0).with_temperature(300.0);

        let moved = pump_gas_to(&mut source, &mut output, ONE_ATMOSPHERE);

        assert!(moved > 0.0);
        assert_relative_eq!(output.pressure(), ONE_ATMOSPHERE, max_relative = 1e-3);
    }

    #[test]
    fn test_pump_gas_to_noop_at_target() {
        let mut source = GasMixture::filled(100.0, 300.0, Gas::Nitrogen, 1000.0);
        let mut output = GasMixture::filled(50.0, 300.0, Gas::Nitrogen, ONE_ATMOSPHERE);
        let before = source.total_moles();

        assert_eq!(pump_gas_to(&mut source, &mut output, ONE_ATMOSPHERE), 0.0);
        assert_eq!(source.total_moles(), before);
    }

    #[test]
    fn test_release_needs_friction_head() {
        let mut source = GasMixture::filled(100.0, 300.0, Gas::Oxygen, 105.0);
        let mut output = GasMixture::filled(100.0, 300.0, Gas::Oxygen, 100.0);
        assert_eq!(release_gas_to(&mut source, Some(&mut output), 500.0), 0.0);
    }

    #[test]
    fn test_release_moves_at_most_half_the_difference() {
        let mut source = GasMixture::filled(100.0, 300.0, Gas::Oxygen, 400.0);
        let mut output = GasMixture::filled(100.0, 300.0, Gas::Oxygen, 100.0);

        release_gas_to(&mut source, Some(&mut output), 1000.0);

        // Equal volumes and temperatures: half the difference lands in the output.
        assert_relative_eq!(output.pressure(), 250.0, max_relative = 1e-3);
    }

    #[test]
    fn test_release_into_nothing_loses_gas() {
        let mut source = GasMixture::filled(100.0, 300.0, Gas::Oxygen, 400.0);
        let before = source.total_moles();
        let lost = release_gas_to(&mut source, None, ONE_ATMOSPHERE);
        assert!(lost > 0.0);
        assert_relative_eq!(source.total_moles(), before - lost, max_relative = 1e-5);
    }

    #[test]
    fn test_fraction_to_equalize_equal_gases() {
        let high = GasMixture::filled(200.0, 300.0, Gas::Nitrogen, 200.0);
        let low = GasMixture::filled(200.0, 300.0, Gas::Nitrogen, 50.0);

        let fraction = fraction_to_equalize_pressure(&high, &low);
        assert_relative_eq!(fraction, 0.375, max_relative = 1e-4);

        // Argument order does not matter.
        let swapped = fraction_to_equalize_pressure(&low, &high);
        assert_relative_eq!(swapped, fraction, max_relative = 1e-6);
    }

    #[test]
    fn test_fraction_to_equalize_into_vacuum() {
        let high = GasMixture::filled(100.0, 300.0, Gas::Oxygen, 300.0);
        let low = GasMixture::new(300.0).with_temperature(300.0);
        // Free expansion into three times the volume: three quarters must move.
        assert_relative_eq!(
            fraction_to_equalize_pressure(&high, &low),
            0.75,
            max_relative = 1e-3
        );
    }

    #[test]
    fn test_fraction_to_equalize_degenerate_is_zero() {
        let empty = GasMixture::new(100.0);
        let other = GasMixture::new(0.0);
        assert_eq!(fraction_to_equalize_pressure(&empty, &other), 0.0);
    }

    #[test]
    fn test_moles_to_pressure_threshold() {
        let mix = GasMixture::filled(100.0, 300.0, Gas::Oxygen, 200.0);
        let excess = moles_to_pressure_threshold(&mix, 100.0);
        assert_relative_eq!(excess, mix.total_moles() / 2.0, max_relative = 1e-5);
        assert!(moles_to_pressure_threshold(&mix, 300.0) < 0.0);
    }

    #[test]
    fn test_equalize_shares_by_volume() {
        let mut a = GasMixture::filled(100.0, 300.0, Gas::Oxygen, 300.0);
        let mut b = GasMixture::new(200.0).with_temperature(300.0);
        let total = a.total_moles();

        equalize(&mut [&mut a, &mut b]);

        assert_relative_eq!(a.pressure(), b.pressure(), max_relative = 1e-4);
        assert_relative_eq!(a.pressure(), 100.0, max_relative = 1e-3);
        assert_abs_diff_eq!(a.total_moles() + b.total_moles(), total, epsilon = 1e-4);
    }
}
