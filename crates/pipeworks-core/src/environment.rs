//! Ambient tile atmosphere that devices vent into and draw from.

use std::collections::HashMap;

use pipeworks_logic::constants::{CELL_VOLUME, ONE_ATMOSPHERE, R, T20C};
use pipeworks_logic::{Gas, GasMixture};
use serde::{Deserialize, Serialize};

/// Grid position of one environment tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Tile mixtures keyed by position. Positions without a tile have no
/// atmosphere at all; devices there run without an ambient sink.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    tiles: HashMap<TilePos, GasMixture>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard station air: 21% oxygen, 79% nitrogen at one atmosphere.
    pub fn breathable_air() -> GasMixture {
        let moles = ONE_ATMOSPHERE * CELL_VOLUME / (R * T20C);
        GasMixture::new(CELL_VOLUME)
            .with_temperature(T20C)
            .with_moles(Gas::Oxygen, moles * 0.21)
            .with_moles(Gas::Nitrogen, moles * 0.79)
    }

    pub fn set_tile(&mut self, pos: TilePos, mixture: GasMixture) {
        self.tiles.insert(pos, mixture);
    }

    pub fn set_space(&mut self, pos: TilePos) {
        self.tiles.insert(pos, GasMixture::space());
    }

    pub fn fill_area(&mut self, from: TilePos, to: TilePos, mixture: &GasMixture) {
        for x in from.x.min(to.x)..=from.x.max(to.x) {
            for y in from.y.min(to.y)..=from.y.max(to.y) {
                self.tiles.insert(TilePos::new(x, y), mixture.clone());
            }
        }
    }

    pub fn remove_tile(&mut self, pos: TilePos) -> Option<GasMixture> {
        self.tiles.remove(&pos)
    }

    pub fn get_mixture(&self, pos: TilePos) -> Option<&GasMixture> {
        self.tiles.get(&pos)
    }

    pub fn get_mixture_mut(&mut self, pos: TilePos) -> Option<&mut GasMixture> {
        self.tiles.get_mut(&pos)
    }

    /// Merge `mixture` into the tile at `pos`. Returns false (and drops the
    /// gas) when there is no tile there.
    pub fn merge_into(&mut self, pos: TilePos, mixture: GasMixture) -> bool {
        match self.tiles.get_mut(&pos) {
            Some(tile) => {
                tile.merge(mixture);
                true
            }
            None => false,
        }
    }

    pub fn is_space(&self, pos: TilePos) -> bool {
        self.tiles.get(&pos).is_some_and(GasMixture::is_immutable)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Moles held by every mutable tile.
    pub fn total_moles(&self) -> f32 {
        self.tiles
            .values()
            .filter(|tile| !tile.is_immutable())
            .map(GasMixture::total_moles)
            .sum()
    }

    pub(crate) fn take(&mut self, pos: TilePos) -> Option<GasMixture> {
        self.tiles.get_mut(&pos).map(std::mem::take)
    }

    pub(crate) fn restore(&mut self, pos: TilePos, mixture: GasMixture) {
        if let Some(slot) = self.tiles.get_mut(&pos) {
            *slot = mixture;
        }
    }
}
