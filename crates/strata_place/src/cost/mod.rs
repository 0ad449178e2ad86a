//! Placement cost terms and their incremental handlers.
//!
//! Every handler supports two evaluation modes ([`CostMethod`]): `Normal`
//! computes and stores the per-net or per-connection state used by the
//! incremental path; `Check` recomputes from scratch without touching that
//! state so the result can be compared against the tracked running totals.
//! A proposed move is evaluated into scratch storage; `commit` installs it
//! and `revert` discards it.

pub mod net_cost;
pub mod timing_cost;

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};
use strata_config::{NocTermWeights, StrataConfig};

/// How a handler evaluates its cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostMethod {
    /// Compute and store state for later incremental updates.
    Normal,
    /// Recompute from scratch, leaving stored state untouched.
    Check,
}

/// The four NoC cost terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NocCostTerms {
    /// Sum over flows of priority times bandwidth times hop count.
    pub aggregate_bandwidth: f64,
    /// Sum over flows of priority times route latency.
    pub latency: f64,
    /// Sum over flows of priority times latency beyond the constraint.
    pub latency_overrun: f64,
    /// Sum over links of relative bandwidth overuse.
    pub congestion: f64,
}

impl NocCostTerms {
    /// Normalization factors: the reciprocal of each term, or `1.0` for a
    /// zero term.
    pub fn reciprocals(&self) -> Self {
        Self {
            aggregate_bandwidth: reciprocal_or_one(self.aggregate_bandwidth),
            latency: reciprocal_or_one(self.latency),
            latency_overrun: reciprocal_or_one(self.latency_overrun),
            congestion: reciprocal_or_one(self.congestion),
        }
    }

    /// `placement_weighting * Σ weight · term · norm`.
    pub fn weighted(&self, norms: &Self, weights: &NocTermWeights, placement_weighting: f64) -> f64 {
        placement_weighting
            * (weights.aggregate_bandwidth * self.aggregate_bandwidth * norms.aggregate_bandwidth
                + weights.latency * self.latency * norms.latency
                + weights.latency_overrun * self.latency_overrun * norms.latency_overrun
                + weights.congestion * self.congestion * norms.congestion)
    }

    /// Term names paired with their values.
    pub fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("noc aggregate bandwidth", self.aggregate_bandwidth),
            ("noc latency", self.latency),
            ("noc latency overrun", self.latency_overrun),
            ("noc congestion", self.congestion),
        ]
    }
}

impl Add for NocCostTerms {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            aggregate_bandwidth: self.aggregate_bandwidth + rhs.aggregate_bandwidth,
            latency: self.latency + rhs.latency,
            latency_overrun: self.latency_overrun + rhs.latency_overrun,
            congestion: self.congestion + rhs.congestion,
        }
    }
}

impl Sub for NocCostTerms {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            aggregate_bandwidth: self.aggregate_bandwidth - rhs.aggregate_bandwidth,
            latency: self.latency - rhs.latency,
            latency_overrun: self.latency_overrun - rhs.latency_overrun,
            congestion: self.congestion - rhs.congestion,
        }
    }
}

impl AddAssign for NocCostTerms {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Reciprocal of a positive finite value, else `1.0`.
pub fn reciprocal_or_one(v: f64) -> f64 {
    if v > 0.0 && v.is_finite() {
        1.0 / v
    } else {
        1.0
    }
}

/// How the cost terms combine into one objective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostObjective {
    /// Whether the timing term takes part.
    pub timing_driven: bool,
    /// Weight of timing against wirelength (λ).
    pub timing_tradeoff: f64,
    /// NoC term weights and overall NoC weighting, when NoC cost is on.
    pub noc: Option<(NocTermWeights, f64)>,
}

impl CostObjective {
    /// Builds the objective from configuration.
    pub fn from_config(config: &StrataConfig) -> Self {
        Self {
            timing_driven: config.placer.algorithm.is_timing_driven(),
            timing_tradeoff: config.placer.timing_tradeoff,
            noc: config
                .noc
                .enabled
                .then(|| (config.noc.normalized_weights(), config.noc.placement_weighting)),
        }
    }
}

/// Running totals of every cost term, their normalization factors, and the
/// aggregate cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacerCosts {
    /// Aggregate normalized cost.
    pub cost: f64,
    /// Bounding-box wirelength cost.
    pub bb_cost: f64,
    /// Criticality-weighted delay cost.
    pub timing_cost: f64,
    /// NoC cost terms.
    pub noc: NocCostTerms,
    /// Wirelength normalization factor.
    pub bb_cost_norm: f64,
    /// Timing normalization factor.
    pub timing_cost_norm: f64,
    /// NoC normalization factors.
    pub noc_norm: NocCostTerms,
}

impl PlacerCosts {
    /// Sets every normalization factor to the reciprocal of the current
    /// term value (`1.0` for zero terms).
    pub fn update_norm_factors(&mut self) {
        self.bb_cost_norm = reciprocal_or_one(self.bb_cost);
        self.timing_cost_norm = reciprocal_or_one(self.timing_cost);
        self.noc_norm = self.noc.reciprocals();
    }

    /// Weighted combination of raw term values under `objective`.
    pub fn weigh(&self, objective: &CostObjective, bb: f64, timing: f64, noc: &NocCostTerms) -> f64 {
        let noc_cost = objective
            .noc
            .map_or(0.0, |(w, pw)| noc.weighted(&self.noc_norm, &w, pw));
        if objective.timing_driven {
            let lambda = objective.timing_tradeoff;
            (1.0 - lambda) * bb * self.bb_cost_norm
                + lambda * timing * self.timing_cost_norm
                + noc_cost
        } else {
            bb * self.bb_cost_norm + noc_cost
        }
    }

    /// Recomputes the aggregate cost from the stored terms.
    pub fn recompute_total(&mut self, objective: &CostObjective) {
        self.cost = self.weigh(objective, self.bb_cost, self.timing_cost, &self.noc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_config::PlaceAlgorithm;

    fn objective(timing_driven: bool) -> CostObjective {
        CostObjective {
            timing_driven,
            timing_tradeoff: 0.5,
            noc: None,
        }
    }

    #[test]
    fn normalized_cost_is_one_at_baseline() {
        let mut costs = PlacerCosts {
            bb_cost: 40.0,
            timing_cost: 8.0,
            ..Default::default()
        };
        costs.update_norm_factors();
        costs.recompute_total(&objective(true));
        assert!((costs.cost - 1.0).abs() < 1e-12);
        costs.recompute_total(&objective(false));
        assert!((costs.cost - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_baseline_norm_is_one() {
        let mut costs = PlacerCosts::default();
        costs.update_norm_factors();
        assert_eq!(costs.bb_cost_norm, 1.0);
        assert_eq!(costs.noc_norm.congestion, 1.0);
    }

    #[test]
    fn weigh_is_linear_in_deltas() {
        let mut costs = PlacerCosts {
            bb_cost: 10.0,
            timing_cost: 4.0,
            ..Default::default()
        };
        costs.update_norm_factors();
        let obj = objective(true);
        let d = costs.weigh(&obj, -2.0, 1.0, &NocCostTerms::default());
        assert!((d - (0.5 * -0.2 + 0.5 * 0.25)).abs() < 1e-12);
    }

    #[test]
    fn noc_terms_weighted() {
        let terms = NocCostTerms {
            aggregate_bandwidth: 2.0,
            latency: 4.0,
            latency_overrun: 0.0,
            congestion: 1.0,
        };
        let norms = terms.reciprocals();
        let weights = NocTermWeights {
            aggregate_bandwidth: 0.25,
            latency_overrun: 0.25,
            latency: 0.25,
            congestion: 0.25,
        };
        assert!((terms.weighted(&norms, &weights, 0.5) - 0.375).abs() < 1e-12);
        let sum = terms + terms - terms;
        assert_eq!(sum, terms);
    }

    #[test]
    fn objective_from_config() {
        let mut config = StrataConfig::default();
        config.placer.algorithm = PlaceAlgorithm::BoundingBox;
        let obj = CostObjective::from_config(&config);
        assert!(!obj.timing_driven);
        assert!(obj.noc.is_none());
        config.noc.enabled = true;
        assert!(CostObjective::from_config(&config).noc.is_some());
    }
}
