//! Placement delay estimation.

use serde::{Deserialize, Serialize};
use strata_arch::Loc;

/// Estimates the interconnect delay between two placed locations.
pub trait DelayModel: Send + Sync {
    /// Delay in nanoseconds of a connection from `from` to `to`.
    fn delay(&self, from: Loc, to: Loc) -> f64;
}

/// A linear delay model: a fixed base delay plus a per-tile cost on the
/// Manhattan distance and a per-layer cost for die crossings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManhattanDelayModel {
    /// Delay of a connection within one tile.
    pub base_ns: f64,
    /// Additional delay per tile of Manhattan distance.
    pub per_tile_ns: f64,
    /// Additional delay per layer crossed.
    pub per_layer_ns: f64,
}

impl Default for ManhattanDelayModel {
    fn default() -> Self {
        Self {
            base_ns: 0.1,
            per_tile_ns: 0.05,
            per_layer_ns: 0.5,
        }
    }
}

impl DelayModel for ManhattanDelayModel {
    fn delay(&self, from: Loc, to: Loc) -> f64 {
        let layers = (from.layer - to.layer).abs();
        self.base_ns
            + self.per_tile_ns * f64::from(from.manhattan(to))
            + self.per_layer_ns * f64::from(layers)
    }
}
