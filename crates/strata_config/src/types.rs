//! Configuration types deserialized from `strata.toml`.

use serde::{Deserialize, Serialize};

/// The complete placer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrataConfig {
    /// Annealing and cost settings.
    pub placer: PlacerOptions,
    /// Analytical pre-pass settings.
    pub analytical: AnalyticalOptions,
    /// Network-on-chip cost settings.
    pub noc: NocOptions,
}

/// Which cost terms drive the placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceAlgorithm {
    /// Bounding-box wirelength only.
    BoundingBox,
    /// Wirelength traded off against criticality-weighted delay.
    #[default]
    TimingDriven,
}

impl PlaceAlgorithm {
    /// Returns `true` if timing cost participates in the placement cost.
    pub fn is_timing_driven(self) -> bool {
        self == PlaceAlgorithm::TimingDriven
    }
}

/// The move-proposal strategy used by the annealer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveGeneratorKind {
    /// Uniformly random block, uniformly random target on the same layer.
    #[default]
    Uniform,
    /// Target near the centroid of the block's connections.
    Centroid,
    /// Source block taken from a highly critical connection.
    CriticalUniform,
    /// Uniformly random target on a different device layer.
    InterLayer,
}

/// The analytical solver formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Quadratic placement with clique nets for small fanout and star
    /// nets for large fanout.
    #[default]
    QpHybrid,
}

/// How NoC traffic flows are routed over the router topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NocRoutingAlgorithm {
    /// Dimension-ordered routing (x first, then y) on mesh links.
    #[default]
    Xy,
    /// Breadth-first shortest path over the links.
    ShortestPath,
}

/// Annealer settings (`[placer]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacerOptions {
    /// Seed of the single random stream used for proposals and acceptance.
    pub seed: u64,
    /// Cost formulation.
    pub algorithm: PlaceAlgorithm,
    /// Weight of the timing term; the bounding-box term gets `1 - tradeoff`.
    pub timing_tradeoff: f64,
    /// Moves per temperature are `inner_num * blocks^(4/3)`.
    pub inner_num: f64,
    /// Overrides the computed moves-per-temperature count.
    pub moves_per_temperature: Option<usize>,
    /// Initial temperature is `init_t_scale` times the standard deviation
    /// of sampled move deltas.
    pub init_t_scale: f64,
    /// Overrides the computed initial temperature.
    pub initial_temperature: Option<f64>,
    /// Annealing stops below `exit_t * cost / nets`.
    pub exit_t: f64,
    /// Upper bound on the number of temperatures.
    pub max_temperatures: usize,
    /// Recompute every cost term from scratch every this many temperatures.
    pub check_every: usize,
    /// Relative tolerance between tracked and recomputed costs.
    pub cost_tolerance: f64,
    /// Re-run timing analysis every this many temperatures.
    pub recompute_crit_every: usize,
    /// Criticality exponent at the start of annealing.
    pub td_place_exp_first: f64,
    /// Criticality exponent once the range limit reaches one.
    pub td_place_exp_last: f64,
    /// Connections below this criticality are ignored by critical moves.
    pub crit_limit: f64,
    /// Clock period for slack computation; the critical path delay is used
    /// when unset.
    pub target_period_ns: Option<f64>,
    /// Cost per layer spanned by a net bounding box.
    pub layer_weight: f64,
    /// Move-proposal strategy.
    pub move_generator: MoveGeneratorKind,
    /// Keep the best-CPD placement as a checkpoint during timing-driven runs.
    pub save_checkpoint: bool,
}

impl Default for PlacerOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            algorithm: PlaceAlgorithm::default(),
            timing_tradeoff: 0.5,
            inner_num: 0.5,
            moves_per_temperature: None,
            init_t_scale: 20.0,
            initial_temperature: None,
            exit_t: 0.005,
            max_temperatures: 1000,
            check_every: 10,
            cost_tolerance: 0.01,
            recompute_crit_every: 1,
            td_place_exp_first: 1.0,
            td_place_exp_last: 8.0,
            crit_limit: 0.7,
            target_period_ns: None,
            layer_weight: 1.0,
            move_generator: MoveGeneratorKind::default(),
            save_checkpoint: true,
        }
    }
}

/// Analytical pre-pass settings (`[analytical]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticalOptions {
    /// Run the analytical solver before annealing.
    pub enabled: bool,
    /// Solver formulation.
    pub solver: SolverKind,
    /// Number of solve/legalize iterations.
    pub iterations: u32,
    /// Pseudo-anchor coefficient `c0` in `c0 * exp(k / decay)`.
    pub anchor_coeff: f64,
    /// Pseudo-anchor decay in `c0 * exp(k / decay)`.
    pub anchor_decay: f64,
    /// Relative residual at which conjugate gradient stops.
    pub cg_tolerance: f64,
    /// Conjugate gradient iteration cap; ten times the system size (at
    /// least 100) when unset.
    pub cg_max_iterations: Option<usize>,
    /// Fold anchor terms into the cached system instead of applying them to
    /// a fresh copy each iteration.
    pub accumulate_anchors: bool,
}

impl Default for AnalyticalOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            solver: SolverKind::default(),
            iterations: 5,
            anchor_coeff: 0.01,
            anchor_decay: 5.0,
            cg_tolerance: 1e-10,
            cg_max_iterations: None,
            accumulate_anchors: false,
        }
    }
}

impl AnalyticalOptions {
    /// Pseudo-anchor weight at solver iteration `iteration`.
    pub fn anchor_weight(&self, iteration: u32) -> f64 {
        self.anchor_coeff * (f64::from(iteration) / self.anchor_decay).exp()
    }
}

/// NoC cost settings (`[noc]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NocOptions {
    /// Include the NoC cost term.
    pub enabled: bool,
    /// Importance of the whole NoC cost relative to bb and timing cost.
    pub placement_weighting: f64,
    /// Relative weight of aggregate bandwidth.
    pub aggregate_bandwidth_weighting: f64,
    /// Relative weight of latency constraint overrun.
    pub latency_constraints_weighting: f64,
    /// Relative weight of raw latency.
    pub latency_weighting: f64,
    /// Relative weight of link congestion.
    pub congestion_weighting: f64,
    /// Flow routing algorithm.
    pub routing: NocRoutingAlgorithm,
}

impl Default for NocOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            placement_weighting: 0.6,
            aggregate_bandwidth_weighting: 0.38,
            latency_constraints_weighting: 0.6,
            latency_weighting: 0.02,
            congestion_weighting: 0.25,
            routing: NocRoutingAlgorithm::default(),
        }
    }
}

/// NoC term weights scaled to sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NocTermWeights {
    /// Aggregate bandwidth weight.
    pub aggregate_bandwidth: f64,
    /// Latency constraint overrun weight.
    pub latency_overrun: f64,
    /// Raw latency weight.
    pub latency: f64,
    /// Link congestion weight.
    pub congestion: f64,
}

impl NocOptions {
    /// Returns the four term weights normalized so they add up to one.
    ///
    /// The importance of the NoC cost as a whole is then set by
    /// [`placement_weighting`](Self::placement_weighting) alone.
    pub fn normalized_weights(&self) -> NocTermWeights {
        let sum = self.aggregate_bandwidth_weighting
            + self.latency_constraints_weighting
            + self.latency_weighting
            + self.congestion_weighting;
        let scale = if sum > 0.0 { 1.0 / sum } else { 0.0 };
        NocTermWeights {
            aggregate_bandwidth: self.aggregate_bandwidth_weighting * scale,
            latency_overrun: self.latency_constraints_weighting * scale,
            latency: self.latency_weighting * scale,
            congestion: self.congestion_weighting * scale,
        }
    }
}
