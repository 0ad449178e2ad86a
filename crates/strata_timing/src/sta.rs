//! Static timing analysis (STA) engine.
//!
//! Forward propagation computes the latest arrival time at every node,
//! backward propagation the required time against a clock period, and the
//! difference gives slack per node and per edge. The placer turns edge
//! slack into connection criticality.

use crate::graph::TimingGraph;
use crate::ids::{TimingEdgeId, TimingNodeId};
use serde::{Deserialize, Serialize};
use strata_common::StrataResult;
use strata_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

/// Result of one slack analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackReport {
    /// Latest arrival time per node.
    pub arrival: Vec<f64>,
    /// Required time per node.
    pub required: Vec<f64>,
    /// Slack per edge: `required[to] - arrival[from] - delay`.
    pub edge_slack: Vec<f64>,
    /// The longest startpoint-to-endpoint delay.
    pub critical_path_delay: f64,
    /// The clock period required times were computed against.
    pub period_ns: f64,
    /// Worst endpoint slack, or zero when every endpoint meets timing.
    pub worst_negative_slack: f64,
    /// Sum of negative endpoint slacks.
    pub total_negative_slack: f64,
}

impl SlackReport {
    /// Slack of one edge.
    pub fn slack(&self, edge: TimingEdgeId) -> f64 {
        self.edge_slack[edge.index()]
    }

    /// Criticality of one edge: `1 - slack / period`, clamped to `[0, 1]`.
    ///
    /// A zero period (every delay zero) makes every edge non-critical.
    pub fn criticality(&self, edge: TimingEdgeId) -> f64 {
        if self.period_ns <= 0.0 {
            return 0.0;
        }
        (1.0 - self.slack(edge) / self.period_ns).clamp(0.0, 1.0)
    }

    /// Returns whether every endpoint meets the period.
    pub fn met(&self) -> bool {
        self.worst_negative_slack >= 0.0
    }

    /// Emits a timing warning into `sink` when the period is violated.
    pub fn emit_violations(&self, sink: &DiagnosticSink) {
        if self.met() {
            return;
        }
        sink.emit(
            Diagnostic::warning(
                DiagnosticCode::new(Category::Timing, 10),
                format!(
                    "timing not met: worst negative slack = {:.3} ns",
                    self.worst_negative_slack
                ),
            )
            .with_note(format!(
                "critical path delay {:.3} ns against a {:.3} ns period, total negative slack {:.3} ns",
                self.critical_path_delay, self.period_ns, self.total_negative_slack
            )),
        );
    }
}

/// Performs static timing analysis on `graph`.
///
/// Required times are computed against `period_ns` when given, otherwise
/// against the critical path delay (so the most critical path has zero
/// slack). Fails when the graph contains a combinational loop.
pub fn analyze_slack(graph: &TimingGraph, period_ns: Option<f64>) -> StrataResult<SlackReport> {
    if graph.node_count() == 0 {
        return Ok(SlackReport::default());
    }
    let order = graph.topological_order()?;
    let arrival = forward_propagation(graph, &order);

    let critical_path_delay = (0..graph.node_count())
        .map(|i| TimingNodeId::from_raw(i as u32))
        .filter(|&n| graph.is_endpoint(n))
        .map(|n| arrival[n.index()])
        .fold(0.0_f64, f64::max);
    let period = period_ns.unwrap_or(critical_path_delay);

    let required = backward_propagation(graph, &order, period);

    let edge_slack = graph
        .edges
        .iter()
        .map(|e| required[e.to.index()] - arrival[e.from.index()] - e.delay_ns)
        .collect();

    let mut worst = 0.0_f64;
    let mut total = 0.0_f64;
    for i in 0..graph.node_count() {
        let node = TimingNodeId::from_raw(i as u32);
        if !graph.is_endpoint(node) || graph.incoming_edges(node).is_empty() {
            continue;
        }
        let slack = required[i] - arrival[i];
        if slack < 0.0 {
            worst = worst.min(slack);
            total += slack;
        }
    }

    Ok(SlackReport {
        arrival,
        required,
        edge_slack,
        critical_path_delay,
        period_ns: period,
        worst_negative_slack: worst,
        total_negative_slack: total,
    })
}

/// Latest arrival per node. Startpoints launch at zero; paths do not
/// propagate through a register input.
fn forward_propagation(graph: &TimingGraph, order: &[TimingNodeId]) -> Vec<f64> {
    let mut arrival = vec![0.0_f64; graph.node_count()];
    for &node in order {
        if graph.is_startpoint(node) {
            arrival[node.index()] = 0.0;
            continue;
        }
        arrival[node.index()] = graph
            .incoming_edges(node)
            .iter()
            .map(|&e| {
                let edge = graph.edge(e);
                arrival[edge.from.index()] + edge.delay_ns
            })
            .fold(0.0_f64, f64::max);
    }
    arrival
}

/// Earliest required time per node. Endpoints must be reached by `period`.
fn backward_propagation(graph: &TimingGraph, order: &[TimingNodeId], period: f64) -> Vec<f64> {
    let mut required = vec![period; graph.node_count()];
    for &node in order.iter().rev() {
        if graph.is_endpoint(node) {
            required[node.index()] = period;
            continue;
        }
        required[node.index()] = graph
            .outgoing_edges(node)
            .iter()
            .map(|&e| {
                let edge = graph.edge(e);
                required[edge.to.index()] - edge.delay_ns
            })
            .fold(f64::INFINITY, f64::min);
    }
    required
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{TimingEdgeType, TimingNodeType};

    /// in -> lut -> ff and in -> ff, with a register breaking the path to out.
    fn small_graph() -> (TimingGraph, Vec<TimingEdgeId>) {
        let mut g = TimingGraph::new();
        let pin = g.add_node("in".into(), TimingNodeType::PrimaryInput);
        let lut_in = g.add_node("lut/in".into(), TimingNodeType::CellPin);
        let lut_out = g.add_node("lut/out".into(), TimingNodeType::CellPin);
        let ff_in = g.add_node("ff/in".into(), TimingNodeType::RegisterInput);
        let ff_out = g.add_node("ff/out".into(), TimingNodeType::RegisterOutput);
        let pout = g.add_node("out".into(), TimingNodeType::PrimaryOutput);
        let e0 = g.add_edge(pin, lut_in, 1.0, TimingEdgeType::NetDelay);
        let e1 = g.add_edge(lut_in, lut_out, 0.5, TimingEdgeType::CellDelay);
        let e2 = g.add_edge(lut_out, ff_in, 1.5, TimingEdgeType::NetDelay);
        let e3 = g.add_edge(pin, ff_in, 1.0, TimingEdgeType::NetDelay);
        let e4 = g.add_edge(ff_out, pout, 2.0, TimingEdgeType::NetDelay);
        (g, vec![e0, e1, e2, e3, e4])
    }

    #[test]
    fn empty_graph() {
        let report = analyze_slack(&TimingGraph::new(), None).unwrap();
        assert_eq!(report.critical_path_delay, 0.0);
        assert!(report.met());
    }

    #[test]
    fn critical_path_delay_and_zero_slack() {
        let (g, e) = small_graph();
        let r = analyze_slack(&g, None).unwrap();
        assert!((r.critical_path_delay - 3.0).abs() < 1e-12);
        assert!(r.slack(e[0]).abs() < 1e-12);
        assert!(r.slack(e[2]).abs() < 1e-12);
        assert!((r.slack(e[3]) - 2.0).abs() < 1e-12);
        assert!((r.slack(e[4]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn register_breaks_path() {
        let (g, _) = small_graph();
        let r = analyze_slack(&g, None).unwrap();
        // ff/out launches at zero regardless of ff/in arrival.
        assert_eq!(r.arrival[4], 0.0);
        assert!((r.arrival[5] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn criticality_from_slack() {
        let (g, e) = small_graph();
        let r = analyze_slack(&g, None).unwrap();
        assert!((r.criticality(e[0]) - 1.0).abs() < 1e-12);
        assert!((r.criticality(e[3]) - (1.0 - 2.0 / 3.0)).abs() < 1e-12);
        for &edge in &e {
            let c = r.criticality(edge);
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn violated_period_reports_negative_slack() {
        let (g, _) = small_graph();
        let r = analyze_slack(&g, Some(2.0)).unwrap();
        assert!((r.worst_negative_slack + 1.0).abs() < 1e-12);
        assert!((r.total_negative_slack + 1.0).abs() < 1e-12);
        assert!(!r.met());
        let sink = DiagnosticSink::new();
        r.emit_violations(&sink);
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("timing not met"));
    }

    #[test]
    fn met_period_emits_nothing() {
        let (g, _) = small_graph();
        let r = analyze_slack(&g, Some(10.0)).unwrap();
        assert!(r.met());
        let sink = DiagnosticSink::new();
        r.emit_violations(&sink);
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn zero_delay_graph_is_not_critical() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::PrimaryInput);
        let b = g.add_node("b".into(), TimingNodeType::PrimaryOutput);
        let e = g.add_edge(a, b, 0.0, TimingEdgeType::NetDelay);
        let r = analyze_slack(&g, None).unwrap();
        assert_eq!(r.criticality(e), 0.0);
    }

    #[test]
    fn loop_is_an_error() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::CellPin);
        let b = g.add_node("b".into(), TimingNodeType::CellPin);
        g.add_edge(a, b, 1.0, TimingEdgeType::CellDelay);
        g.add_edge(b, a, 1.0, TimingEdgeType::NetDelay);
        assert!(analyze_slack(&g, None).is_err());
    }
}
