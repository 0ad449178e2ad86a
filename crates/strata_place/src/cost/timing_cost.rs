//! Criticality-weighted connection delay cost.
//!
//! A connection is one (net, sink) pair. Its cost is
//! `criticality^exponent * delay`, where the delay comes from the
//! [`DelayModel`] on current locations and the criticality from the last
//! timing analysis.

use super::CostMethod;
use crate::ids::{BlockId, NetId};
use crate::moves::BlocksAffected;
use crate::netlist::PlaceNetlist;
use crate::state::BlockLocations;
use strata_arch::Loc;
use strata_timing::{DelayModel, SlackReport, TimingEdgeId};

/// Tracks delay, criticality and cost per connection.
#[derive(Debug, Clone)]
pub struct TimingCostHandler {
    /// First connection index of each net; one extra trailing entry.
    conn_start: Vec<usize>,
    conn_net: Vec<NetId>,
    /// Connection index of each sink pin.
    pin_conn: Vec<Option<usize>>,
    active: Vec<bool>,
    delay: Vec<f64>,
    crit: Vec<f64>,
    cost: Vec<f64>,
    exponent: f64,
    crit_limit: f64,
    highly_critical: Vec<(NetId, usize)>,
    proposed: Vec<(usize, f64, f64)>,
    touched: Vec<bool>,
}

impl TimingCostHandler {
    /// Creates a handler with one connection per sink pin. Explicitly
    /// ignored nets contribute no timing cost.
    pub fn new(netlist: &PlaceNetlist, crit_limit: f64) -> Self {
        let mut conn_start = Vec::with_capacity(netlist.net_count() + 1);
        let mut conn_net = Vec::new();
        let mut pin_conn = vec![None; netlist.pin_count()];
        for net in &netlist.nets {
            conn_start.push(conn_net.len());
            for &sink in &net.sinks {
                pin_conn[sink.index()] = Some(conn_net.len());
                conn_net.push(net.id);
            }
        }
        conn_start.push(conn_net.len());
        let n = conn_net.len();
        Self {
            conn_start,
            conn_net,
            pin_conn,
            active: netlist.nets.iter().map(|net| !net.ignored).collect(),
            delay: vec![0.0; n],
            crit: vec![0.0; n],
            cost: vec![0.0; n],
            exponent: 1.0,
            crit_limit,
            highly_critical: Vec::new(),
            proposed: Vec::new(),
            touched: vec![false; n],
        }
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.conn_net.len()
    }

    /// Iterates `(connection, net, sink index)` for connections on nets
    /// that take part in timing.
    pub fn connections(&self) -> impl Iterator<Item = (usize, NetId, usize)> + '_ {
        self.conn_net
            .iter()
            .enumerate()
            .filter(|&(_, net)| self.active[net.index()])
            .map(|(c, &net)| (c, net, c - self.conn_start[net.index()]))
    }

    /// Total timing cost.
    ///
    /// `Normal` re-evaluates and stores every connection delay and cost;
    /// `Check` recomputes the sum from locations without storing anything.
    pub fn comp_td_costs(
        &mut self,
        method: CostMethod,
        netlist: &PlaceNetlist,
        locations: &BlockLocations,
        delay_model: &dyn DelayModel,
    ) -> f64 {
        let mut total = 0.0;
        for c in 0..self.conn_net.len() {
            let net = self.conn_net[c];
            if !self.active[net.index()] {
                continue;
            }
            let (driver, sink) = self.endpoints(netlist, c);
            let delay = delay_model.delay(locations.loc(driver), locations.loc(sink));
            let cost = self.weigh(c, delay);
            if method == CostMethod::Normal {
                self.delay[c] = delay;
                self.cost[c] = cost;
            }
            total += cost;
        }
        total
    }

    /// Evaluates the connections touched by a proposed move into scratch
    /// storage and returns the change in timing cost.
    pub fn find_affected_connections(
        &mut self,
        netlist: &PlaceNetlist,
        locations: &BlockLocations,
        affected: &BlocksAffected,
        delay_model: &dyn DelayModel,
    ) -> f64 {
        self.revert();
        let mut delta = 0.0;
        for m in affected.moved() {
            for &pin in netlist.block_pins(m.block) {
                let p = netlist.pin(pin);
                if !self.active[p.net.index()] {
                    continue;
                }
                let range = if p.is_driver {
                    self.conn_start[p.net.index()]..self.conn_start[p.net.index() + 1]
                } else {
                    match self.pin_conn[pin.index()] {
                        Some(c) => c..c + 1,
                        None => continue,
                    }
                };
                for c in range {
                    if self.touched[c] {
                        continue;
                    }
                    self.touched[c] = true;
                    let (driver, sink) = self.endpoints(netlist, c);
                    let from: Loc = affected.loc_of(locations, driver);
                    let to: Loc = affected.loc_of(locations, sink);
                    let delay = delay_model.delay(from, to);
                    let cost = self.weigh(c, delay);
                    delta += cost - self.cost[c];
                    self.proposed.push((c, delay, cost));
                }
            }
        }
        delta
    }

    /// Installs the delays and costs of the last evaluated move.
    pub fn commit(&mut self) {
        for (c, delay, cost) in self.proposed.drain(..) {
            self.delay[c] = delay;
            self.cost[c] = cost;
            self.touched[c] = false;
        }
    }

    /// Discards the last evaluated move.
    pub fn revert(&mut self) {
        for (c, _, _) in self.proposed.drain(..) {
            self.touched[c] = false;
        }
    }

    /// Refreshes every criticality from `report` and recomputes connection
    /// costs with `exponent`. `edges` maps connections to timing edges.
    /// Returns the new total timing cost.
    pub fn update_criticalities(
        &mut self,
        report: &SlackReport,
        edges: &[Option<TimingEdgeId>],
        exponent: f64,
    ) -> f64 {
        self.exponent = exponent;
        self.highly_critical.clear();
        let mut total = 0.0;
        for c in 0..self.conn_net.len() {
            let net = self.conn_net[c];
            if !self.active[net.index()] {
                continue;
            }
            self.crit[c] = edges
                .get(c)
                .copied()
                .flatten()
                .map_or(0.0, |e| report.criticality(e));
            self.cost[c] = self.weigh(c, self.delay[c]);
            total += self.cost[c];
            if self.crit[c] > self.crit_limit {
                self.highly_critical
                    .push((net, c - self.conn_start[net.index()]));
            }
        }
        total
    }

    /// Current delay of a connection.
    pub fn delay(&self, conn: usize) -> f64 {
        self.delay[conn]
    }

    /// Criticality of the `sink`-th connection of `net`.
    pub fn criticality(&self, net: NetId, sink: usize) -> f64 {
        if !self.active[net.index()] {
            return 0.0;
        }
        self.conn_start
            .get(net.index())
            .and_then(|&start| self.crit.get(start + sink))
            .copied()
            .unwrap_or(0.0)
    }

    /// Connections whose criticality exceeds the configured limit.
    pub fn highly_critical(&self) -> &[(NetId, usize)] {
        &self.highly_critical
    }

    /// Sum of the stored connection costs.
    pub fn stored_total(&self) -> f64 {
        self.cost.iter().sum()
    }

    fn weigh(&self, c: usize, delay: f64) -> f64 {
        self.crit[c].powf(self.exponent) * delay
    }

    fn endpoints(&self, netlist: &PlaceNetlist, c: usize) -> (BlockId, BlockId) {
        let net = netlist.net(self.conn_net[c]);
        let sink = net.sinks[c - self.conn_start[net.id.index()]];
        (netlist.pin_block(net.driver), netlist.pin_block(sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::MacroRegistry;
    use crate::moves::{movable_blocks, MoveContext, MoveGenerator, MoveOutcome, UniformMoveGenerator};
    use crate::timing_bridge::TimingBridge;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use strata_arch::{BlockType, CompressedGrids, DeviceGrid, SiteType};
    use strata_timing::ManhattanDelayModel;

    fn design() -> (PlaceNetlist, BlockLocations) {
        let mut nl = PlaceNetlist::new();
        let a = nl.add_block("a", BlockType::Clb);
        let b = nl.add_block("b", BlockType::Clb);
        let c = nl.add_block("c", BlockType::Clb);
        let d = nl.add_block("d", BlockType::Clb);
        nl.set_block_delay(b, 0.3);
        nl.add_net("ab", a, &[b, c]);
        nl.add_net("bd", b, &[d]);
        nl.add_net("cd", c, &[d]);
        let locs = BlockLocations::from_locs(&[
            Loc::new(0, 0, 0),
            Loc::new(3, 0, 0),
            Loc::new(0, 2, 0),
            Loc::new(6, 6, 0),
        ])
        .unwrap();
        (nl, locs)
    }

    #[test]
    fn connections_index_sinks() {
        let (nl, _) = design();
        let h = TimingCostHandler::new(&nl, 0.7);
        assert_eq!(h.connection_count(), 4);
        let conns: Vec<_> = h.connections().collect();
        assert_eq!(conns[1], (1, NetId::from_raw(0), 1));
        assert_eq!(conns[2], (2, NetId::from_raw(1), 0));
    }

    #[test]
    fn criticalities_weight_cost() {
        let (nl, locs) = design();
        let model = ManhattanDelayModel::default();
        let mut h = TimingCostHandler::new(&nl, 0.7);
        // Before any timing analysis every criticality is zero.
        assert_eq!(h.comp_td_costs(CostMethod::Normal, &nl, &locs, &model), 0.0);
        let mut bridge = TimingBridge::new(&nl, &h);
        bridge.update_delays(&h);
        let report = bridge.analyze(None).unwrap();
        let total = h.update_criticalities(&report, bridge.connection_edges(), 1.0);
        assert!(total > 0.0);
        assert!((total - h.stored_total()).abs() < 1e-12);
        // a -> b -> d is the critical path.
        assert!((h.criticality(NetId::from_raw(0), 0) - 1.0).abs() < 1e-9);
        assert!(h.criticality(NetId::from_raw(2), 0) < 1.0);
        assert!(!h.highly_critical().is_empty());
        let check = h.comp_td_costs(CostMethod::Check, &nl, &locs, &model);
        assert!((check - total).abs() < 1e-9);
    }

    #[test]
    fn check_equals_normal_after_random_moves() {
        let (nl, mut locs) = design();
        let grid = DeviceGrid::new(8, 8, 1, SiteType::Logic);
        let compressed = CompressedGrids::new(&grid);
        let macros = MacroRegistry::new();
        let movable = movable_blocks(&nl, &macros);
        let model = ManhattanDelayModel::default();
        let mut h = TimingCostHandler::new(&nl, 0.7);
        h.comp_td_costs(CostMethod::Normal, &nl, &locs, &model);
        let mut bridge = TimingBridge::new(&nl, &h);
        bridge.update_delays(&h);
        let report = bridge.analyze(None).unwrap();
        let mut tracked = h.update_criticalities(&report, bridge.connection_edges(), 2.0);
        let mut rng = StdRng::seed_from_u64(4);
        for step in 0..500 {
            let mut affected = BlocksAffected::default();
            let outcome = UniformMoveGenerator.propose(
                &MoveContext {
                    netlist: &nl,
                    grid: &grid,
                    compressed: &compressed,
                    macros: &macros,
                    locations: &locs,
                    movable: &movable,
                    timing: Some(&h),
                },
                3.0,
                &mut rng,
                &mut affected,
            );
            if outcome == MoveOutcome::Abort {
                continue;
            }
            let delta = h.find_affected_connections(&nl, &locs, &affected, &model);
            if step % 4 == 0 {
                h.revert();
            } else {
                h.commit();
                locs.apply(&affected);
                tracked += delta;
            }
            let check = h.comp_td_costs(CostMethod::Check, &nl, &locs, &model);
            assert!((check - tracked).abs() < 1e-9, "step {step}");
        }
    }
}
