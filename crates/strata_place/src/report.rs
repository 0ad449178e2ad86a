//! Placement results.

use crate::checkpoint::PlacementCheckpoint;
use crate::cost::{NocCostTerms, PlacerCosts};
use crate::moves::MoveStats;
use serde::{Deserialize, Serialize};
use strata_arch::Loc;

/// Final cost terms of a placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    /// Aggregate normalized cost.
    pub cost: f64,
    /// Bounding-box wirelength cost.
    pub bb_cost: f64,
    /// Criticality-weighted delay cost (zero for wirelength-only runs).
    pub timing_cost: f64,
    /// NoC cost terms (zero when NoC cost is off).
    pub noc: NocCostTerms,
    /// Critical path delay in timing-driven runs.
    pub critical_path_delay: Option<f64>,
}

impl CostReport {
    /// Snapshots the current cost terms.
    pub fn new(costs: &PlacerCosts, critical_path_delay: Option<f64>) -> Self {
        Self {
            cost: costs.cost,
            bb_cost: costs.bb_cost,
            timing_cost: costs.timing_cost,
            noc: costs.noc,
            critical_path_delay,
        }
    }

    /// Logs the report at info level under `stage`.
    pub fn log(&self, stage: &str) {
        log::info!(
            "{stage}: cost {:.6}, bb cost {:.3}, td cost {:.6e}",
            self.cost,
            self.bb_cost,
            self.timing_cost
        );
        if let Some(cpd) = self.critical_path_delay {
            log::info!("{stage}: critical path delay {cpd:.4} ns");
        }
        if self.noc != NocCostTerms::default() {
            for (name, value) in self.noc.named() {
                log::info!("{stage}: {name} {value:.6}");
            }
        }
    }
}

/// Everything a finished placement run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementOutcome {
    /// Final location of every block, in block order.
    pub locations: Vec<Loc>,
    /// Final costs.
    pub report: CostReport,
    /// Proposal statistics of the move generator.
    pub move_stats: MoveStats,
    /// Number of annealing temperatures run, quench excluded.
    pub temperatures: usize,
    /// Placement with the best critical path delay seen, when kept.
    pub best_checkpoint: Option<PlacementCheckpoint>,
}
