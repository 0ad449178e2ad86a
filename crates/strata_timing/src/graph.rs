//! Timing graph data structures for static timing analysis.
//!
//! Nodes are block input and output points; edges carry a delay in
//! nanoseconds. Net edges ([`TimingEdgeType::NetDelay`]) correspond to
//! placement connections and have their delay rewritten as blocks move.

use crate::ids::{TimingEdgeId, TimingNodeId};
use serde::{Deserialize, Serialize};
use strata_common::{InternalError, StrataResult};

/// A timing graph for static timing analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingGraph {
    /// All nodes in the timing graph.
    pub nodes: Vec<TimingNode>,
    /// All directed edges in the timing graph.
    pub edges: Vec<TimingEdge>,
    fanout: Vec<Vec<TimingEdgeId>>,
    fanin: Vec<Vec<TimingEdgeId>>,
}

impl TimingGraph {
    /// Creates an empty timing graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the timing graph and returns its ID.
    pub fn add_node(&mut self, name: String, node_type: TimingNodeType) -> TimingNodeId {
        let id = TimingNodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(TimingNode {
            id,
            name,
            node_type,
        });
        self.fanout.push(Vec::new());
        self.fanin.push(Vec::new());
        id
    }

    /// Adds a directed edge with a delay in nanoseconds and returns its ID.
    pub fn add_edge(
        &mut self,
        from: TimingNodeId,
        to: TimingNodeId,
        delay_ns: f64,
        edge_type: TimingEdgeType,
    ) -> TimingEdgeId {
        let id = TimingEdgeId::from_raw(self.edges.len() as u32);
        self.edges.push(TimingEdge {
            id,
            from,
            to,
            delay_ns,
            edge_type,
        });
        self.fanout[from.index()].push(id);
        self.fanin[to.index()].push(id);
        id
    }

    /// Rewrites the delay of an existing edge.
    pub fn set_edge_delay(&mut self, id: TimingEdgeId, delay_ns: f64) {
        self.edges[id.index()].delay_ns = delay_ns;
    }

    /// Returns the node with the given ID.
    pub fn node(&self, id: TimingNodeId) -> &TimingNode {
        &self.nodes[id.index()]
    }

    /// Returns the edge with the given ID.
    pub fn edge(&self, id: TimingEdgeId) -> &TimingEdge {
        &self.edges[id.index()]
    }

    /// IDs of all edges originating from the given node.
    pub fn outgoing_edges(&self, node: TimingNodeId) -> &[TimingEdgeId] {
        &self.fanout[node.index()]
    }

    /// IDs of all edges arriving at the given node.
    pub fn incoming_edges(&self, node: TimingNodeId) -> &[TimingEdgeId] {
        &self.fanin[node.index()]
    }

    /// Returns the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the total number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns whether `node` starts timing paths: a primary input, a
    /// register output, or any node without fan-in.
    pub fn is_startpoint(&self, node: TimingNodeId) -> bool {
        matches!(
            self.node(node).node_type,
            TimingNodeType::PrimaryInput | TimingNodeType::RegisterOutput
        ) || self.fanin[node.index()].is_empty()
    }

    /// Returns whether `node` ends timing paths: a primary output, a
    /// register input, or any node without fan-out.
    pub fn is_endpoint(&self, node: TimingNodeId) -> bool {
        matches!(
            self.node(node).node_type,
            TimingNodeType::PrimaryOutput | TimingNodeType::RegisterInput
        ) || self.fanout[node.index()].is_empty()
    }

    /// Nodes in topological order (Kahn's algorithm).
    ///
    /// Fails when the graph contains a combinational loop.
    pub fn topological_order(&self) -> StrataResult<Vec<TimingNodeId>> {
        let n = self.node_count();
        let mut indegree: Vec<usize> = self.fanin.iter().map(Vec::len).collect();
        let mut order = Vec::with_capacity(n);
        let mut ready: Vec<TimingNodeId> = (0..n)
            .filter(|&i| indegree[i] == 0)
            .map(|i| TimingNodeId::from_raw(i as u32))
            .rev()
            .collect();
        while let Some(node) = ready.pop() {
            order.push(node);
            for &e in &self.fanout[node.index()] {
                let to = self.edges[e.index()].to;
                indegree[to.index()] -= 1;
                if indegree[to.index()] == 0 {
                    ready.push(to);
                }
            }
        }
        if order.len() != n {
            return Err(InternalError::new(format!(
                "timing graph has a combinational loop through {} node(s)",
                n - order.len()
            )));
        }
        Ok(order)
    }
}

/// A node in the timing graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingNode {
    /// The unique ID of this node.
    pub id: TimingNodeId,
    /// Human-readable name (e.g., "lut_0/out", "ff_3/in").
    pub name: String,
    /// The functional type of this node.
    pub node_type: TimingNodeType,
}

/// The type of a timing graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingNodeType {
    /// An input or output point of a combinational block.
    CellPin,
    /// The output of a sequential block; starts timing paths.
    RegisterOutput,
    /// The input of a sequential block; ends timing paths.
    RegisterInput,
    /// A primary input of the design.
    PrimaryInput,
    /// A primary output of the design.
    PrimaryOutput,
}

/// A directed edge in the timing graph representing a delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingEdge {
    /// The unique ID of this edge.
    pub id: TimingEdgeId,
    /// The source node of this edge.
    pub from: TimingNodeId,
    /// The destination node of this edge.
    pub to: TimingNodeId,
    /// The propagation delay along this edge, in nanoseconds.
    pub delay_ns: f64,
    /// The semantic type of this edge.
    pub edge_type: TimingEdgeType,
}

/// The type of a timing graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingEdgeType {
    /// Delay through a block from its input point to its output point.
    CellDelay,
    /// Interconnect delay of one driver-to-sink connection.
    NetDelay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph() {
        let g = TimingGraph::new();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.topological_order().unwrap().is_empty());
    }

    #[test]
    fn adjacency_tracks_edges() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::PrimaryInput);
        let b = g.add_node("b".into(), TimingNodeType::CellPin);
        let c = g.add_node("c".into(), TimingNodeType::CellPin);
        let e0 = g.add_edge(a, b, 1.0, TimingEdgeType::NetDelay);
        let e1 = g.add_edge(a, c, 2.0, TimingEdgeType::NetDelay);
        assert_eq!(g.outgoing_edges(a), &[e0, e1]);
        assert_eq!(g.incoming_edges(c), &[e1]);
        assert!(g.outgoing_edges(b).is_empty());
    }

    #[test]
    fn set_edge_delay_rewrites() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::PrimaryInput);
        let b = g.add_node("b".into(), TimingNodeType::PrimaryOutput);
        let e = g.add_edge(a, b, 1.0, TimingEdgeType::NetDelay);
        g.set_edge_delay(e, 3.5);
        assert_eq!(g.edge(e).delay_ns, 3.5);
    }

    #[test]
    fn start_and_end_points() {
        let mut g = TimingGraph::new();
        let q = g.add_node("ff/out".into(), TimingNodeType::RegisterOutput);
        let d = g.add_node("ff/in".into(), TimingNodeType::RegisterInput);
        let l_in = g.add_node("lut/in".into(), TimingNodeType::CellPin);
        let l_out = g.add_node("lut/out".into(), TimingNodeType::CellPin);
        g.add_edge(q, l_in, 1.0, TimingEdgeType::NetDelay);
        g.add_edge(l_in, l_out, 0.5, TimingEdgeType::CellDelay);
        g.add_edge(l_out, d, 1.0, TimingEdgeType::NetDelay);
        assert!(g.is_startpoint(q));
        assert!(g.is_endpoint(d));
        assert!(!g.is_startpoint(l_in));
        assert!(!g.is_endpoint(l_out));
    }

    #[test]
    fn topological_order_respects_edges() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::PrimaryInput);
        let b = g.add_node("b".into(), TimingNodeType::CellPin);
        let c = g.add_node("c".into(), TimingNodeType::CellPin);
        let d = g.add_node("d".into(), TimingNodeType::PrimaryOutput);
        g.add_edge(a, c, 1.0, TimingEdgeType::NetDelay);
        g.add_edge(c, b, 1.0, TimingEdgeType::CellDelay);
        g.add_edge(b, d, 1.0, TimingEdgeType::NetDelay);
        let order = g.topological_order().unwrap();
        let pos = |n: TimingNodeId| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(a) < pos(c));
        assert!(pos(c) < pos(b));
        assert!(pos(b) < pos(d));
    }

    #[test]
    fn loop_is_rejected() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::CellPin);
        let b = g.add_node("b".into(), TimingNodeType::CellPin);
        g.add_edge(a, b, 1.0, TimingEdgeType::CellDelay);
        g.add_edge(b, a, 1.0, TimingEdgeType::NetDelay);
        let err = g.topological_order().unwrap_err();
        assert!(err.message.contains("combinational loop"));
    }

    #[test]
    fn graph_serde_roundtrip() {
        let mut g = TimingGraph::new();
        let a = g.add_node("a".into(), TimingNodeType::PrimaryInput);
        let b = g.add_node("b".into(), TimingNodeType::PrimaryOutput);
        g.add_edge(a, b, 0.7, TimingEdgeType::NetDelay);
        let json = serde_json::to_string(&g).unwrap();
        let restored: TimingGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.edge_count(), 1);
        assert_eq!(restored.outgoing_edges(a).len(), 1);
        assert_eq!(restored.nodes[1].name, "b");
    }
}
