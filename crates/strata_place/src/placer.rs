//! Placement orchestration.
//!
//! [`Placer::new`] produces the starting placement (given, checkpointed or
//! random, optionally refined by the analytical pre-pass), initializes every
//! cost term and its normalization, and verifies the result. [`Placer::place`]
//! anneals and verifies again.

use crate::analytical::run_analytical_placement;
use crate::anneal::Annealer;
use crate::cost::net_cost::NetCostHandler;
use crate::cost::timing_cost::TimingCostHandler;
use crate::cost::{CostMethod, CostObjective, NocCostTerms, PlacerCosts};
use crate::error::{PlaceError, PlaceResult};
use crate::ids::BlockId;
use crate::initial::{random_placement, InitialPlacement};
use crate::macros::MacroRegistry;
use crate::moves::{make_move_generator, movable_blocks, BlocksAffected, MoveContext};
use crate::netlist::PlaceNetlist;
use crate::noc::{NocCostHandler, NocTopology, NocTraffic};
use crate::report::{CostReport, PlacementOutcome};
use crate::state::BlockLocations;
use crate::timing_bridge::TimingBridge;
use crate::verify::{verify_placement, SITE_CONFLICT};
use rand::rngs::StdRng;
use rand::SeedableRng;
use strata_arch::{CompressedGrids, DeviceGrid, Loc};
use strata_config::{validate_config, StrataConfig};
use strata_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use strata_timing::{DelayModel, SlackReport};

/// A tracked cost term disagrees with its recomputation.
pub const COST_MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Placement, 110);
/// Traffic flow routes form a channel dependency cycle.
pub const NOC_ROUTING_CYCLE: DiagnosticCode = DiagnosticCode::new(Category::Noc, 1);
/// NoC cost is enabled without a topology.
pub const NOC_MISSING: DiagnosticCode = DiagnosticCode::new(Category::Noc, 2);

/// The NoC description of a design.
#[derive(Debug, Clone)]
pub struct NocSetup {
    /// Routers and links.
    pub topology: NocTopology,
    /// Flows between router blocks.
    pub traffic: NocTraffic,
}

/// The design and device a placer works on.
pub struct PlacerInputs<'a> {
    /// Blocks and nets to place.
    pub netlist: &'a PlaceNetlist,
    /// Target device.
    pub grid: &'a DeviceGrid,
    /// Blocks that move as rigid groups.
    pub macros: &'a MacroRegistry,
    /// Connection delay estimate for timing-driven placement.
    pub delay_model: &'a dyn DelayModel,
    /// Routers and traffic, when the design uses a NoC.
    pub noc: Option<NocSetup>,
}

/// Timing objects of a timing-driven run.
pub(crate) struct TimingState<'a> {
    pub(crate) handler: TimingCostHandler,
    pub(crate) bridge: TimingBridge,
    pub(crate) delay_model: &'a dyn DelayModel,
    pub(crate) period_ns: Option<f64>,
    pub(crate) report: SlackReport,
}

/// Cost changes of one evaluated move.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct MoveDelta {
    pub(crate) bb: f64,
    pub(crate) timing: f64,
    pub(crate) noc: NocCostTerms,
}

/// A tracked term that disagrees with its recomputation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CostMismatch {
    pub(crate) term: &'static str,
    pub(crate) tracked: f64,
    pub(crate) recomputed: f64,
}

/// The mutable placement and everything that tracks its cost.
pub struct PlacerState<'a> {
    pub(crate) netlist: &'a PlaceNetlist,
    pub(crate) grid: &'a DeviceGrid,
    pub(crate) macros: &'a MacroRegistry,
    pub(crate) compressed: CompressedGrids,
    pub(crate) movable: Vec<BlockId>,
    pub(crate) locations: BlockLocations,
    pub(crate) net_cost: NetCostHandler,
    pub(crate) timing: Option<TimingState<'a>>,
    pub(crate) noc: Option<NocCostHandler>,
    pub(crate) costs: PlacerCosts,
    pub(crate) objective: CostObjective,
    pub(crate) cost_tolerance: f64,
}

impl<'a> PlacerState<'a> {
    /// Current block locations.
    pub fn locations(&self) -> &BlockLocations {
        &self.locations
    }

    /// Current cost terms and normalization factors.
    pub fn costs(&self) -> &PlacerCosts {
        &self.costs
    }

    /// Critical path delay of the last timing analysis.
    pub fn critical_path_delay(&self) -> Option<f64> {
        self.timing.as_ref().map(|t| t.report.critical_path_delay)
    }

    /// Nets taking part in wirelength cost (at least one).
    pub(crate) fn num_nets(&self) -> usize {
        self.net_cost.considered_nets().max(1)
    }

    pub(crate) fn move_context(&self) -> MoveContext<'_> {
        MoveContext {
            netlist: self.netlist,
            grid: self.grid,
            compressed: &self.compressed,
            macros: self.macros,
            locations: &self.locations,
            movable: &self.movable,
            timing: self.timing.as_ref().map(|t| &t.handler),
        }
    }

    /// Evaluates a proposed move in every active handler.
    ///
    /// Returns `None`, with every handler reverted, when the move would leave
    /// a traffic flow without a NoC route.
    pub(crate) fn evaluate(
        &mut self,
        affected: &BlocksAffected,
    ) -> PlaceResult<Option<MoveDelta>> {
        let bb = self
            .net_cost
            .find_affected_nets(self.netlist, &self.locations, affected);
        let timing = match &mut self.timing {
            Some(t) => t.handler.find_affected_connections(
                self.netlist,
                &self.locations,
                affected,
                t.delay_model,
            ),
            None => 0.0,
        };
        let noc = match &mut self.noc {
            Some(n) => n.find_affected_noc_routers(self.netlist, &self.locations, affected),
            None => Ok(NocCostTerms::default()),
        };
        match noc {
            Ok(noc) => Ok(Some(MoveDelta { bb, timing, noc })),
            Err(PlaceError::NocUnroutable { .. }) => {
                self.revert();
                Ok(None)
            }
            Err(e) => {
                self.revert();
                Err(e)
            }
        }
    }

    /// The change of aggregate cost for a move.
    pub(crate) fn weighted_delta(&self, d: &MoveDelta) -> f64 {
        self.costs.weigh(&self.objective, d.bb, d.timing, &d.noc)
    }

    /// Applies an evaluated move to the locations, the handlers and the
    /// running totals.
    pub(crate) fn commit(&mut self, affected: &BlocksAffected, d: &MoveDelta, delta_cost: f64) {
        self.locations.apply(affected);
        self.net_cost.commit();
        if let Some(t) = &mut self.timing {
            t.handler.commit();
        }
        if let Some(n) = &mut self.noc {
            n.commit();
        }
        self.costs.bb_cost += d.bb;
        self.costs.timing_cost += d.timing;
        self.costs.noc += d.noc;
        self.costs.cost += delta_cost;
    }

    /// Discards an evaluated move.
    pub(crate) fn revert(&mut self) {
        self.net_cost.revert();
        if let Some(t) = &mut self.timing {
            t.handler.revert();
        }
        if let Some(n) = &mut self.noc {
            n.revert();
        }
    }

    /// Refreshes connection delays into the timing graph, re-runs slack
    /// analysis and rebuilds criticalities with `exponent`. Returns the new
    /// critical path delay; `None` in wirelength-only runs.
    pub(crate) fn update_timing(&mut self, exponent: f64) -> PlaceResult<Option<f64>> {
        let Some(t) = &mut self.timing else {
            return Ok(None);
        };
        t.handler
            .comp_td_costs(CostMethod::Normal, self.netlist, &self.locations, t.delay_model);
        t.bridge.update_delays(&t.handler);
        t.report = t.bridge.analyze(t.period_ns)?;
        self.costs.timing_cost =
            t.handler
                .update_criticalities(&t.report, t.bridge.connection_edges(), exponent);
        let cpd = t.report.critical_path_delay;
        self.costs.recompute_total(&self.objective);
        Ok(Some(cpd))
    }

    /// Recomputes every active term from scratch and compares it with the
    /// tracked value. When all agree within tolerance the tracked values are
    /// replaced by the recomputed ones.
    pub(crate) fn recompute_costs(&mut self) -> PlaceResult<Vec<CostMismatch>> {
        let mut recomputed = Vec::new();
        let bb = self
            .net_cost
            .comp_bb_cost(CostMethod::Check, self.netlist, &self.locations);
        recomputed.push(("bb", self.costs.bb_cost, bb));
        if let Some(t) = &mut self.timing {
            let td = t.handler.comp_td_costs(
                CostMethod::Check,
                self.netlist,
                &self.locations,
                t.delay_model,
            );
            recomputed.push(("timing", self.costs.timing_cost, td));
        }
        let mut noc = None;
        if let Some(n) = &mut self.noc {
            let terms = n.comp_noc_costs(CostMethod::Check, self.netlist, &self.locations)?;
            for ((name, tracked), (_, value)) in self.costs.noc.named().into_iter().zip(terms.named()) {
                recomputed.push((name, tracked, value));
            }
            noc = Some(terms);
        }

        let mut mismatches = Vec::new();
        for &(term, tracked, value) in &recomputed {
            if (tracked - value).abs() > self.cost_tolerance * value.abs().max(1e-6) {
                mismatches.push(CostMismatch {
                    term,
                    tracked,
                    recomputed: value,
                });
            }
        }
        if mismatches.is_empty() {
            self.costs.bb_cost = bb;
            if let Some(&(_, _, td)) = recomputed.iter().find(|r| r.0 == "timing") {
                self.costs.timing_cost = td;
            }
            if let Some(terms) = noc {
                self.costs.noc = terms;
            }
            self.costs.recompute_total(&self.objective);
        }
        Ok(mismatches)
    }

    /// Emits an error diagnostic for a cost mismatch.
    pub(crate) fn emit_mismatch(sink: &DiagnosticSink, m: &CostMismatch) {
        sink.emit(
            Diagnostic::error(
                COST_MISMATCH,
                format!("{} cost does not match its recomputation", m.term),
            )
            .with_note(format!(
                "tracked {}, recomputed {}, difference {:e}",
                m.tracked,
                m.recomputed,
                (m.tracked - m.recomputed).abs()
            )),
        );
    }
}

/// Sequences initial placement, cost initialization, annealing and
/// verification for one design.
pub struct Placer<'a> {
    config: StrataConfig,
    state: PlacerState<'a>,
    sink: &'a DiagnosticSink,
    rng: StdRng,
}

impl<'a> Placer<'a> {
    /// Builds the starting placement and initializes every cost term.
    ///
    /// Fails on an invalid configuration or macro set, when the starting
    /// placement cannot be produced, or when the initial consistency check
    /// fails.
    pub fn new(
        inputs: PlacerInputs<'a>,
        config: StrataConfig,
        initial: InitialPlacement,
        sink: &'a DiagnosticSink,
    ) -> PlaceResult<Self> {
        validate_config(&config)?;
        let PlacerInputs {
            netlist,
            grid,
            macros,
            delay_model,
            noc,
        } = inputs;
        macros.validate(netlist)?;
        let mut rng = StdRng::seed_from_u64(config.placer.seed);

        let mut locations = match initial {
            InitialPlacement::Random => random_placement(netlist, macros, grid, &mut rng)?,
            InitialPlacement::Given(locs) => given_placement(netlist, &locs, sink)?,
            InitialPlacement::Checkpoint(cp) => given_placement(netlist, &cp.locations, sink)?,
        };
        if config.analytical.enabled {
            locations =
                run_analytical_placement(netlist, macros, grid, &config.analytical, &locations)?;
        }

        let mut objective = CostObjective::from_config(&config);
        let noc_handler = match (objective.noc.is_some(), noc) {
            (true, Some(setup)) => Some(NocCostHandler::new(
                setup.topology,
                setup.traffic,
                config.noc.routing,
            )),
            (true, None) => {
                sink.emit(Diagnostic::warning(
                    NOC_MISSING,
                    "NoC cost is enabled but the design has no NoC; the term is skipped",
                ));
                objective.noc = None;
                None
            }
            (false, _) => None,
        };

        let mut net_cost = NetCostHandler::new(netlist, config.placer.layer_weight);
        let costs = PlacerCosts {
            bb_cost: net_cost.comp_bb_cost(CostMethod::Normal, netlist, &locations),
            ..PlacerCosts::default()
        };

        let timing = if objective.timing_driven {
            let handler = TimingCostHandler::new(netlist, config.placer.crit_limit);
            let bridge = TimingBridge::new(netlist, &handler);
            Some(TimingState {
                handler,
                bridge,
                delay_model,
                period_ns: config.placer.target_period_ns,
                report: SlackReport::default(),
            })
        } else {
            None
        };

        let mut state = PlacerState {
            netlist,
            grid,
            macros,
            compressed: CompressedGrids::new(grid),
            movable: movable_blocks(netlist, macros),
            locations,
            net_cost,
            timing,
            noc: noc_handler,
            costs,
            objective,
            cost_tolerance: config.placer.cost_tolerance,
        };
        state.update_timing(config.placer.td_place_exp_first)?;
        if let Some(n) = &mut state.noc {
            state.costs.noc = n.comp_noc_costs(CostMethod::Normal, netlist, &state.locations)?;
        }
        state.costs.update_norm_factors();
        state.costs.recompute_total(&state.objective);

        let mut placer = Self {
            config,
            state,
            sink,
            rng,
        };
        CostReport::new(&placer.state.costs, placer.state.critical_path_delay())
            .log("initial placement");
        placer.check_place()?;
        Ok(placer)
    }

    /// Anneals the placement and returns the verified result.
    pub fn place(mut self) -> PlaceResult<PlacementOutcome> {
        let generator = make_move_generator(self.config.placer.move_generator);
        let mut annealer = Annealer::new(&self.config.placer, generator);
        annealer.run(&mut self.state, &mut self.rng, self.sink)?;
        self.check_place()?;

        let report = CostReport::new(&self.state.costs, self.state.critical_path_delay());
        report.log("final placement");
        let temperatures = annealer.temperatures();
        let move_stats = *annealer.stats();
        Ok(PlacementOutcome {
            locations: self.state.locations.to_vec(),
            report,
            move_stats,
            temperatures,
            best_checkpoint: annealer.into_best_checkpoint(),
        })
    }

    /// Verifies legality and cost consistency of the current placement.
    ///
    /// A NoC channel dependency cycle fails with
    /// [`PlaceError::NocRoutingCycle`]; any other problem fails with
    /// [`PlaceError::ConsistencyCheckFailed`] carrying the error count.
    pub fn check_place(&mut self) -> PlaceResult<()> {
        let s = &mut self.state;
        let mut errors = verify_placement(s.netlist, s.macros, s.grid, &s.locations, self.sink);
        for m in s.recompute_costs()? {
            PlacerState::emit_mismatch(self.sink, &m);
            errors += 1;
        }
        if s.noc.as_ref().is_some_and(NocCostHandler::check_for_cycles) {
            self.sink.emit(Diagnostic::error(
                NOC_ROUTING_CYCLE,
                "NoC traffic flow routes form a channel dependency cycle",
            ));
            return Err(PlaceError::NocRoutingCycle);
        }
        if errors > 0 {
            return Err(PlaceError::ConsistencyCheckFailed { errors });
        }
        log::debug!("placement check passed");
        Ok(())
    }

    /// The current placement state.
    pub fn state(&self) -> &PlacerState<'a> {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn parts(&mut self) -> (&mut PlacerState<'a>, &mut StdRng, &'a DiagnosticSink) {
        (&mut self.state, &mut self.rng, self.sink)
    }
}

/// Builds locations from one `Loc` per block.
fn given_placement(
    netlist: &PlaceNetlist,
    locs: &[Loc],
    sink: &DiagnosticSink,
) -> PlaceResult<BlockLocations> {
    if locs.len() != netlist.block_count() {
        sink.emit(Diagnostic::error(
            SITE_CONFLICT,
            format!(
                "initial placement has {} locations for {} blocks",
                locs.len(),
                netlist.block_count()
            ),
        ));
        return Err(PlaceError::ConsistencyCheckFailed { errors: 1 });
    }
    BlockLocations::from_locs(locs).map_err(|(a, b)| {
        sink.emit(
            Diagnostic::error(
                SITE_CONFLICT,
                format!(
                    "blocks `{}` and `{}` share a site in the initial placement",
                    netlist.block_name(a),
                    netlist.block_name(b)
                ),
            )
            .with_subject(netlist.block_name(b).to_string()),
        );
        PlaceError::ConsistencyCheckFailed { errors: 1 }
    })
}
