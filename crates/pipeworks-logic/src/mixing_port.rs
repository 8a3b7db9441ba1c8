//! Mixing port: two mixtures that always share their contents by volume.

use serde::{Deserialize, Serialize};

use crate::flow::{FlowReport, FlowTick};
use crate::gas::{Gas, GasMixture};

/// Stateless device wrapper; runs every tick it can resolve both ports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixingPort {}

impl MixingPort {
    pub fn update(&mut self, a: &mut GasMixture, b: &mut GasMixture, _tick: &FlowTick) -> FlowReport {
        FlowReport {
            moles: mix_ports(a, b),
            ..FlowReport::IDLE
        }
    }
}

/// Pool both sides and hand each its volume share.
///
/// The pooled temperature is the plain average of the two sides, not the
/// heat-capacity weighted blend `merge` uses. Returns the moles that changed
/// side.
pub fn mix_ports(a: &mut GasMixture, b: &mut GasMixture) -> f32 {
    let total_volume = a.volume() + b.volume();
    if !(total_volume > 0.0) {
        return 0.0;
    }

    let mut buffer = GasMixture::new(total_volume);
    for gas in Gas::ALL {
        buffer.set_moles(gas, a.get_moles(gas) + b.get_moles(gas));
    }
    buffer.set_temperature((a.temperature() + b.temperature()) / 2.0);

    let a_before = a.total_moles();
    let a_share = a.volume() / total_volume;
    let b_share = b.volume() / total_volume;

    a.copy_from(&buffer);
    a.multiply(a_share);
    b.copy_from(&buffer);
    b.multiply(b_share);

    (a.total_moles() - a_before).abs()
}
