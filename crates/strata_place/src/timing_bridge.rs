//! Builds the [`TimingGraph`] analysed during placement.
//!
//! Every block gets an input node and an output node. Combinational blocks
//! join them with a cell-delay edge; sequential blocks and I/O leave them
//! unconnected, which breaks timing paths at registers and pads. Every
//! placement connection becomes one net-delay edge whose delay is refreshed
//! from the timing cost handler before each analysis.

use crate::cost::timing_cost::TimingCostHandler;
use crate::error::PlaceResult;
use crate::netlist::PlaceNetlist;
use strata_arch::BlockType;
use strata_timing::{
    analyze_slack, SlackReport, TimingEdgeId, TimingEdgeType, TimingGraph, TimingNodeId,
    TimingNodeType,
};

/// The timing graph of a placement netlist and its connection-to-edge map.
#[derive(Debug, Clone)]
pub struct TimingBridge {
    graph: TimingGraph,
    conn_edges: Vec<Option<TimingEdgeId>>,
}

impl TimingBridge {
    /// Builds the graph for `netlist`, with one net edge per connection of
    /// `handler`. Connections from a block to itself get no edge.
    pub fn new(netlist: &PlaceNetlist, handler: &TimingCostHandler) -> Self {
        let mut graph = TimingGraph::new();
        let mut block_in: Vec<TimingNodeId> = Vec::with_capacity(netlist.block_count());
        let mut block_out: Vec<TimingNodeId> = Vec::with_capacity(netlist.block_count());

        for block in &netlist.blocks {
            let name = netlist.interner().resolve(block.name);
            let (in_type, out_type) = if block.block_type == BlockType::Io {
                (TimingNodeType::PrimaryOutput, TimingNodeType::PrimaryInput)
            } else if block.sequential {
                (TimingNodeType::RegisterInput, TimingNodeType::RegisterOutput)
            } else {
                (TimingNodeType::CellPin, TimingNodeType::CellPin)
            };
            let i = graph.add_node(format!("{name}/in"), in_type);
            let o = graph.add_node(format!("{name}/out"), out_type);
            if in_type == TimingNodeType::CellPin {
                graph.add_edge(i, o, block.delay_ns, TimingEdgeType::CellDelay);
            }
            block_in.push(i);
            block_out.push(o);
        }

        let mut conn_edges = vec![None; handler.connection_count()];
        for (c, net, sink) in handler.connections() {
            let n = netlist.net(net);
            let driver = netlist.pin_block(n.driver);
            let sink_block = netlist.pin_block(n.sinks[sink]);
            if driver == sink_block {
                continue;
            }
            conn_edges[c] = Some(graph.add_edge(
                block_out[driver.index()],
                block_in[sink_block.index()],
                0.0,
                TimingEdgeType::NetDelay,
            ));
        }

        Self { graph, conn_edges }
    }

    /// Copies the current connection delays into the graph.
    pub fn update_delays(&mut self, handler: &TimingCostHandler) {
        for (c, edge) in self.conn_edges.iter().enumerate() {
            if let Some(edge) = edge {
                self.graph.set_edge_delay(*edge, handler.delay(c));
            }
        }
    }

    /// Runs slack analysis against `period_ns`, or against the critical
    /// path delay when no period is given.
    pub fn analyze(&self, period_ns: Option<f64>) -> PlaceResult<SlackReport> {
        Ok(analyze_slack(&self.graph, period_ns)?)
    }

    /// Timing edge of each connection, indexed by connection.
    pub fn connection_edges(&self) -> &[Option<TimingEdgeId>] {
        &self.conn_edges
    }

    /// The underlying graph.
    pub fn graph(&self) -> &TimingGraph {
        &self.graph
    }
}
