//! Simulated annealing refinement.
//!
//! Each step asks the move generator for a proposal, evaluates its cost
//! change in every active cost handler, and accepts it with the Metropolis
//! criterion. Temperature, range limit and criticality exponent follow an
//! adaptive schedule driven by the acceptance rate of each temperature.

use crate::checkpoint::PlacementCheckpoint;
use crate::error::{PlaceError, PlaceResult};
use crate::moves::{BlocksAffected, MoveGenerator, MoveOutcome, MoveStats};
use crate::placer::PlacerState;
use rand::{Rng, RngCore};
use strata_config::PlacerOptions;
use strata_diagnostics::DiagnosticSink;

/// Share of proposals the range limit is steered toward.
const TARGET_ACCEPTANCE: f64 = 0.44;

/// Phase of an annealing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnealState {
    /// Computing the schedule parameters.
    Initializing,
    /// Running temperatures.
    Annealing,
    /// Running the final zero-temperature pass.
    Quenching,
    /// Done.
    Terminated,
}

/// What happened to one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapResult {
    /// The move was committed.
    Accepted,
    /// The move was evaluated and discarded.
    Rejected,
    /// No legal move could be formed, so nothing was evaluated.
    Aborted,
}

/// Metropolis acceptance: improvements always pass, worsening moves pass
/// with probability `exp(-delta / temperature)` and never at zero
/// temperature.
pub fn assess_swap(delta_cost: f64, temperature: f64, rng: &mut dyn RngCore) -> bool {
    if delta_cost <= 0.0 {
        return true;
    }
    if temperature <= 0.0 {
        return false;
    }
    rng.gen::<f64>() < (-delta_cost / temperature).exp()
}

/// Temperature multiplier for a given acceptance rate.
pub fn cooling_factor(acceptance_rate: f64) -> f64 {
    if acceptance_rate > 0.96 {
        0.5
    } else if acceptance_rate > 0.8 {
        0.9
    } else if acceptance_rate > 0.15 {
        0.95
    } else {
        0.8
    }
}

/// Criticality exponent for a range limit: `first` at the full range,
/// `last` once the range limit reaches one.
pub fn criticality_exponent(rlim: f64, rlim_max: f64, first: f64, last: f64) -> f64 {
    if rlim_max <= 1.0 {
        return last;
    }
    let progress = 1.0 - (rlim - 1.0) / (rlim_max - 1.0);
    progress * (last - first) + first
}

/// The annealing state machine.
pub struct Annealer {
    options: PlacerOptions,
    generator: Box<dyn MoveGenerator>,
    affected: BlocksAffected,
    state: AnnealState,
    temperature: f64,
    rlim: f64,
    rlim_max: f64,
    crit_exponent: f64,
    moves_per_temperature: usize,
    temperatures: usize,
    stats: MoveStats,
    best: Option<PlacementCheckpoint>,
}

impl Annealer {
    /// Creates an annealer in [`AnnealState::Initializing`]. The schedule is
    /// set up when [`run`](Self::run) starts.
    pub fn new(options: &PlacerOptions, generator: Box<dyn MoveGenerator>) -> Self {
        let stats = MoveStats::new(generator.kind());
        Self {
            options: options.clone(),
            generator,
            affected: BlocksAffected::default(),
            state: AnnealState::Initializing,
            temperature: 0.0,
            rlim: 1.0,
            rlim_max: 1.0,
            crit_exponent: options.td_place_exp_first,
            moves_per_temperature: 1,
            temperatures: 0,
            stats,
            best: None,
        }
    }

    /// Current phase.
    pub fn state(&self) -> AnnealState {
        self.state
    }

    /// Current temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Current range limit in grid units.
    pub fn rlim(&self) -> f64 {
        self.rlim
    }

    /// Temperatures run so far, the quench pass excluded.
    pub fn temperatures(&self) -> usize {
        self.temperatures
    }

    /// Proposal counters.
    pub fn stats(&self) -> &MoveStats {
        &self.stats
    }

    /// The placement with the lowest critical path delay seen so far.
    pub fn best_checkpoint(&self) -> Option<&PlacementCheckpoint> {
        self.best.as_ref()
    }

    /// Consumes the annealer, returning its best checkpoint.
    pub fn into_best_checkpoint(self) -> Option<PlacementCheckpoint> {
        self.best
    }

    /// Anneals `state` to completion.
    ///
    /// Fails with [`PlaceError::CostDrift`] when a periodic recomputation
    /// disagrees with the tracked cost terms.
    pub fn run(
        &mut self,
        state: &mut PlacerState<'_>,
        rng: &mut dyn RngCore,
        sink: &DiagnosticSink,
    ) -> PlaceResult<()> {
        self.state = AnnealState::Initializing;
        self.rlim_max = f64::from(state.grid.width().max(state.grid.height())).max(1.0);
        self.rlim = self.rlim_max;
        self.crit_exponent = self.options.td_place_exp_first;
        self.moves_per_temperature = self.options.moves_per_temperature.unwrap_or_else(|| {
            let blocks = state.netlist.block_count() as f64;
            ((self.options.inner_num * blocks.powf(4.0 / 3.0)) as usize).max(1)
        });
        self.temperature = match self.options.initial_temperature {
            Some(t) => t,
            None => self.starting_temperature(state, rng)?,
        };
        self.keep_if_best(state);
        log::info!(
            "annealing: initial temperature {:.4e}, {} moves per temperature",
            self.temperature,
            self.moves_per_temperature
        );

        self.state = AnnealState::Annealing;
        loop {
            let cost_before = state.costs.cost;
            let acceptance_rate = self.run_temperature(state, rng, self.temperature)?;
            let improved = state.costs.cost < cost_before;
            self.temperatures += 1;

            self.rlim = (self.rlim * (1.0 - TARGET_ACCEPTANCE + acceptance_rate))
                .clamp(1.0, self.rlim_max);
            self.crit_exponent = criticality_exponent(
                self.rlim,
                self.rlim_max,
                self.options.td_place_exp_first,
                self.options.td_place_exp_last,
            );
            if self.temperatures % self.options.recompute_crit_every == 0 {
                state.update_timing(self.crit_exponent)?;
                self.keep_if_best(state);
            }
            if self.temperatures % self.options.check_every == 0 {
                Self::check_costs(state, sink)?;
            }

            log::info!(
                "T {:>4} {:.4e}: cost {:.6}, bb {:.3}, td {:.4e}, accept {:.3}, rlim {:.2}, exp {:.2}",
                self.temperatures,
                self.temperature,
                state.costs.cost,
                state.costs.bb_cost,
                state.costs.timing_cost,
                acceptance_rate,
                self.rlim,
                self.crit_exponent
            );

            let exit_temperature = self.options.exit_t * state.costs.cost / state.num_nets() as f64;
            if (self.temperature < exit_temperature && !improved)
                || self.temperatures >= self.options.max_temperatures
            {
                break;
            }
            self.temperature *= cooling_factor(acceptance_rate);
        }

        self.state = AnnealState::Quenching;
        self.run_temperature(state, rng, 0.0)?;
        state.update_timing(self.crit_exponent)?;
        self.keep_if_best(state);
        Self::check_costs(state, sink)?;
        self.state = AnnealState::Terminated;
        log::info!(
            "annealing done after {} temperatures: {} of {} proposals accepted, {} aborted",
            self.temperatures,
            self.stats.accepted,
            self.stats.proposed,
            self.stats.aborted
        );
        Ok(())
    }

    /// Proposes, evaluates and either commits or discards one move.
    pub fn try_swap(
        &mut self,
        state: &mut PlacerState<'_>,
        rng: &mut dyn RngCore,
        temperature: f64,
    ) -> PlaceResult<SwapResult> {
        self.stats.proposed += 1;
        self.affected.clear();
        let outcome = {
            let ctx = state.move_context();
            self.generator
                .propose(&ctx, self.rlim, rng, &mut self.affected)
        };
        if outcome == MoveOutcome::Abort || self.affected.is_empty() {
            self.stats.aborted += 1;
            return Ok(SwapResult::Aborted);
        }

        let Some(delta) = state.evaluate(&self.affected)? else {
            self.stats.aborted += 1;
            return Ok(SwapResult::Aborted);
        };
        let delta_cost = state.weighted_delta(&delta);
        if assess_swap(delta_cost, temperature, rng) {
            state.commit(&self.affected, &delta, delta_cost);
            self.stats.accepted += 1;
            Ok(SwapResult::Accepted)
        } else {
            state.revert();
            self.stats.rejected += 1;
            Ok(SwapResult::Rejected)
        }
    }

    /// Runs one temperature and returns its acceptance rate.
    fn run_temperature(
        &mut self,
        state: &mut PlacerState<'_>,
        rng: &mut dyn RngCore,
        temperature: f64,
    ) -> PlaceResult<f64> {
        let mut accepted = 0usize;
        for _ in 0..self.moves_per_temperature {
            if self.try_swap(state, rng, temperature)? == SwapResult::Accepted {
                accepted += 1;
            }
        }
        Ok(accepted as f64 / self.moves_per_temperature as f64)
    }

    /// `init_t_scale` times the standard deviation of the cost deltas of
    /// sampled proposals. Every sample is discarded.
    fn starting_temperature(
        &mut self,
        state: &mut PlacerState<'_>,
        rng: &mut dyn RngCore,
    ) -> PlaceResult<f64> {
        let samples = state.movable.len();
        let mut deltas = Vec::with_capacity(samples);
        for _ in 0..samples {
            self.affected.clear();
            let outcome = {
                let ctx = state.move_context();
                self.generator
                    .propose(&ctx, self.rlim, rng, &mut self.affected)
            };
            if outcome == MoveOutcome::Abort || self.affected.is_empty() {
                continue;
            }
            let Some(delta) = state.evaluate(&self.affected)? else {
                continue;
            };
            deltas.push(state.weighted_delta(&delta));
            state.revert();
        }
        if deltas.is_empty() {
            return Ok(0.0);
        }
        let n = deltas.len() as f64;
        let mean = deltas.iter().sum::<f64>() / n;
        let variance = deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        Ok(self.options.init_t_scale * variance.sqrt())
    }

    /// Captures the placement when its critical path beats the best so far.
    fn keep_if_best(&mut self, state: &PlacerState<'_>) {
        if !self.options.save_checkpoint {
            return;
        }
        let Some(cpd) = state.critical_path_delay() else {
            return;
        };
        if self.best.as_ref().is_some_and(|b| b.critical_path_delay <= cpd) {
            return;
        }
        let checkpoint = PlacementCheckpoint::capture(&state.locations, &state.costs, cpd);
        if checkpoint.improves_on(self.best.as_ref()) {
            log::debug!("new best critical path delay {cpd:.4} ns");
            self.best = Some(checkpoint);
        }
    }

    fn check_costs(state: &mut PlacerState<'_>, sink: &DiagnosticSink) -> PlaceResult<()> {
        let mismatches = state.recompute_costs()?;
        for m in &mismatches {
            PlacerState::emit_mismatch(sink, m);
        }
        match mismatches.into_iter().next() {
            Some(m) => Err(PlaceError::CostDrift {
                term: m.term.to_string(),
                tracked: m.tracked,
                recomputed: m.recomputed,
            }),
            None => Ok(()),
        }
    }
}
