//! Per-tick inputs and outputs shared by every device update.

/// Timing for one device update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowTick {
    /// Seconds since the previous update.
    pub dt: f32,
    /// Global multiplier on rate-limited devices.
    pub pump_speedup: f32,
}

impl FlowTick {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            pump_speedup: 1.0,
        }
    }

    pub fn with_speedup(mut self, pump_speedup: f32) -> Self {
        self.pump_speedup = pump_speedup;
        self
    }

    /// A tick that cannot move anything (non-positive or non-finite `dt`).
    pub fn is_degenerate(&self) -> bool {
        !(self.dt > 0.0) || !self.dt.is_finite()
    }

    /// Liters a device rated at `rate` L/s may move this tick.
    pub fn volume_budget(&self, rate: f32) -> f32 {
        let budget = rate * self.pump_speedup * self.dt;
        if budget.is_finite() {
            budget.max(0.0)
        } else {
            0.0
        }
    }
}

/// What a device moved during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowReport {
    /// Moles that left the source.
    pub moles: f32,
    /// Source-side liters those moles occupied.
    pub volume: f32,
    /// Moles that went to the ambient tile instead of the destination.
    pub leaked_moles: f32,
}

impl FlowReport {
    pub const IDLE: FlowReport = FlowReport {
        moles: 0.0,
        volume: 0.0,
        leaked_moles: 0.0,
    };

    pub fn moved(&self) -> bool {
        self.moles > 0.0
    }

    /// Liters per second over `tick`.
    pub fn rate(&self, tick: &FlowTick) -> f32 {
        if tick.is_degenerate() {
            0.0
        } else {
            self.volume / tick.dt
        }
    }
}

/// Liters that `moles` of `mix` occupy at its current state.
pub(crate) fn moles_to_volume(moles: f32, mix: &crate::gas::GasMixture) -> f32 {
    let total = mix.total_moles();
    if !(total > 0.0) {
        return 0.0;
    }
    (moles / total * mix.volume()).max(0.0)
}
