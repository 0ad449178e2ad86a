//! Incremental NoC cost tracking.
//!
//! Every flow keeps its current route and its per-flow terms; links keep
//! the bandwidth routed through them. A proposed move re-routes the flows of
//! moved router blocks into scratch storage and reports the change of each
//! term.

use super::routing::route_flow;
use super::topology::NocTopology;
use super::traffic::{NocTraffic, TrafficFlow};
use crate::cost::{CostMethod, NocCostTerms};
use crate::error::{PlaceError, PlaceResult};
use crate::ids::{BlockId, LinkId};
use crate::moves::BlocksAffected;
use crate::netlist::PlaceNetlist;
use crate::state::BlockLocations;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashSet;
use strata_arch::Loc;
use strata_config::NocRoutingAlgorithm;

/// The per-flow share of the NoC terms. Congestion is a link property and
/// is tracked separately.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct FlowCost {
    aggregate_bandwidth: f64,
    latency: f64,
    latency_overrun: f64,
}

/// Tracks routes, link usage and cost terms of every traffic flow.
#[derive(Debug, Clone)]
pub struct NocCostHandler {
    topology: NocTopology,
    traffic: NocTraffic,
    algorithm: NocRoutingAlgorithm,
    routes: Vec<Vec<LinkId>>,
    flow_costs: Vec<FlowCost>,
    link_usage: Vec<f64>,
    proposed_routes: Vec<(usize, Vec<LinkId>, FlowCost)>,
    usage_delta: Vec<f64>,
    touched_links: Vec<LinkId>,
    touched_flows: Vec<bool>,
}

impl NocCostHandler {
    /// Creates a handler with no routes. Call
    /// [`comp_noc_costs`](Self::comp_noc_costs) in `Normal` mode before the
    /// first incremental evaluation.
    pub fn new(topology: NocTopology, traffic: NocTraffic, algorithm: NocRoutingAlgorithm) -> Self {
        let flows = traffic.len();
        let links = topology.link_count();
        Self {
            topology,
            traffic,
            algorithm,
            routes: vec![Vec::new(); flows],
            flow_costs: vec![FlowCost::default(); flows],
            link_usage: vec![0.0; links],
            proposed_routes: Vec::new(),
            usage_delta: vec![0.0; links],
            touched_links: Vec::new(),
            touched_flows: vec![false; flows],
        }
    }

    /// The routers and links flows are routed over.
    pub fn topology(&self) -> &NocTopology {
        &self.topology
    }

    /// The flows being costed.
    pub fn traffic(&self) -> &NocTraffic {
        &self.traffic
    }

    /// Routes every flow and returns the four terms.
    ///
    /// `Normal` stores the routes, link usage and per-flow terms; `Check`
    /// works on local copies only.
    pub fn comp_noc_costs(
        &mut self,
        method: CostMethod,
        netlist: &PlaceNetlist,
        locations: &BlockLocations,
    ) -> PlaceResult<NocCostTerms> {
        let mut routes = Vec::with_capacity(self.traffic.len());
        let mut costs = Vec::with_capacity(self.traffic.len());
        let mut usage = vec![0.0; self.topology.link_count()];
        for flow in self.traffic.flows() {
            let route = self.route(netlist, flow, locations.loc(flow.source), locations.loc(flow.sink))?;
            for &l in &route {
                usage[l.index()] += flow.bandwidth;
            }
            costs.push(self.flow_cost(flow, &route));
            routes.push(route);
        }

        let mut terms = NocCostTerms::default();
        for c in &costs {
            terms.aggregate_bandwidth += c.aggregate_bandwidth;
            terms.latency += c.latency;
            terms.latency_overrun += c.latency_overrun;
        }
        terms.congestion = usage
            .iter()
            .enumerate()
            .map(|(l, &u)| self.link_congestion(LinkId::from_raw(l as u32), u))
            .sum();

        if method == CostMethod::Normal {
            self.revert();
            self.routes = routes;
            self.flow_costs = costs;
            self.link_usage = usage;
        }
        Ok(terms)
    }

    /// Re-routes the flows touching moved blocks into scratch storage and
    /// returns the change of each term.
    pub fn find_affected_noc_routers(
        &mut self,
        netlist: &PlaceNetlist,
        locations: &BlockLocations,
        affected: &BlocksAffected,
    ) -> PlaceResult<NocCostTerms> {
        self.revert();
        let mut delta = NocCostTerms::default();
        for m in affected.moved() {
            let flows = self.traffic.flows_of_block(m.block).to_vec();
            for fid in flows {
                let f = fid.index();
                if self.touched_flows[f] {
                    continue;
                }
                self.touched_flows[f] = true;
                let flow = *self.traffic.flow(fid);
                let route = self.route(
                    netlist,
                    &flow,
                    affected.loc_of(locations, flow.source),
                    affected.loc_of(locations, flow.sink),
                )?;
                let cost = self.flow_cost(&flow, &route);
                let old = self.flow_costs[f];
                delta.aggregate_bandwidth += cost.aggregate_bandwidth - old.aggregate_bandwidth;
                delta.latency += cost.latency - old.latency;
                delta.latency_overrun += cost.latency_overrun - old.latency_overrun;

                for i in 0..self.routes[f].len() {
                    let l = self.routes[f][i];
                    self.touch_link(l, -flow.bandwidth);
                }
                for &l in &route {
                    self.touch_link(l, flow.bandwidth);
                }
                self.proposed_routes.push((f, route, cost));
            }
        }
        for &l in &self.touched_links {
            let used = self.link_usage[l.index()];
            delta.congestion += self.link_congestion(l, used + self.usage_delta[l.index()])
                - self.link_congestion(l, used);
        }
        Ok(delta)
    }

    /// Installs the routes evaluated by the last proposal.
    pub fn commit(&mut self) {
        for (f, route, cost) in self.proposed_routes.drain(..) {
            self.routes[f] = route;
            self.flow_costs[f] = cost;
            self.touched_flows[f] = false;
        }
        for l in self.touched_links.drain(..) {
            self.link_usage[l.index()] += self.usage_delta[l.index()];
            self.usage_delta[l.index()] = 0.0;
        }
    }

    /// Discards the last proposal.
    pub fn revert(&mut self) {
        for (f, _, _) in self.proposed_routes.drain(..) {
            self.touched_flows[f] = false;
        }
        for l in self.touched_links.drain(..) {
            self.usage_delta[l.index()] = 0.0;
        }
    }

    /// Whether the committed routes form a cycle in the channel dependency
    /// graph, whose nodes are links and whose edges join consecutive links
    /// of a route.
    pub fn check_for_cycles(&self) -> bool {
        let mut cdg: DiGraph<(), ()> = DiGraph::with_capacity(self.topology.link_count(), 0);
        for _ in 0..self.topology.link_count() {
            cdg.add_node(());
        }
        let mut seen = HashSet::new();
        for route in &self.routes {
            for pair in route.windows(2) {
                if seen.insert((pair[0], pair[1])) {
                    cdg.add_edge(
                        NodeIndex::new(pair[0].index()),
                        NodeIndex::new(pair[1].index()),
                        (),
                    );
                }
            }
        }
        is_cyclic_directed(&cdg)
    }

    /// The committed route of a flow.
    pub fn route_of(&self, flow: usize) -> &[LinkId] {
        &self.routes[flow]
    }

    /// Committed bandwidth through a link.
    pub fn link_usage(&self, link: LinkId) -> f64 {
        self.link_usage[link.index()]
    }

    fn touch_link(&mut self, l: LinkId, bandwidth: f64) {
        if !self.touched_links.contains(&l) {
            self.touched_links.push(l);
        }
        self.usage_delta[l.index()] += bandwidth;
    }

    fn route(
        &self,
        netlist: &PlaceNetlist,
        flow: &TrafficFlow,
        source: Loc,
        sink: Loc,
    ) -> PlaceResult<Vec<LinkId>> {
        let unroutable = || PlaceError::NocUnroutable {
            source_block: block_name(netlist, flow.source),
            sink_block: block_name(netlist, flow.sink),
        };
        let src = self.topology.router_at(source).ok_or_else(unroutable)?;
        let dst = self.topology.router_at(sink).ok_or_else(unroutable)?;
        route_flow(&self.topology, self.algorithm, src, dst).ok_or_else(unroutable)
    }

    fn flow_cost(&self, flow: &TrafficFlow, route: &[LinkId]) -> FlowCost {
        let hops = route.len() as f64;
        let latency: f64 = route
            .iter()
            .map(|&l| self.topology.router_latency_ns() + self.topology.link(l).latency_ns)
            .sum();
        FlowCost {
            aggregate_bandwidth: flow.priority * flow.bandwidth * hops,
            latency: flow.priority * latency,
            latency_overrun: flow.priority * (latency - flow.max_latency_ns).max(0.0),
        }
    }

    fn link_congestion(&self, link: LinkId, used: f64) -> f64 {
        let capacity = self.topology.link(link).bandwidth;
        if capacity > 0.0 {
            (used - capacity).max(0.0) / capacity
        } else {
            0.0
        }
    }
}

fn block_name(netlist: &PlaceNetlist, block: BlockId) -> String {
    if block.index() < netlist.block_count() {
        netlist.block_name(block).to_string()
    } else {
        block.to_string()
    }
}
