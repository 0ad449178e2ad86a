//! Traffic flows between router blocks.

use crate::ids::{BlockId, FlowId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One communication requirement between two router blocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficFlow {
    /// The flow's ID.
    pub id: FlowId,
    /// Sending router block.
    pub source: BlockId,
    /// Receiving router block.
    pub sink: BlockId,
    /// Required bandwidth.
    pub bandwidth: f64,
    /// Latency constraint in nanoseconds.
    pub max_latency_ns: f64,
    /// Scale applied to every cost term of this flow.
    pub priority: f64,
}

/// Every traffic flow, indexed by the blocks it touches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NocTraffic {
    flows: Vec<TrafficFlow>,
    by_block: HashMap<BlockId, Vec<FlowId>>,
}

impl NocTraffic {
    /// Creates an empty traffic description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a flow and returns its ID.
    pub fn add_flow(
        &mut self,
        source: BlockId,
        sink: BlockId,
        bandwidth: f64,
        max_latency_ns: f64,
        priority: f64,
    ) -> FlowId {
        let id = FlowId::from_raw(self.flows.len() as u32);
        self.flows.push(TrafficFlow {
            id,
            source,
            sink,
            bandwidth,
            max_latency_ns,
            priority,
        });
        self.by_block.entry(source).or_default().push(id);
        if sink != source {
            self.by_block.entry(sink).or_default().push(id);
        }
        id
    }

    /// The flow with `id`.
    pub fn flow(&self, id: FlowId) -> &TrafficFlow {
        &self.flows[id.index()]
    }

    /// Every flow, in ID order.
    pub fn flows(&self) -> &[TrafficFlow] {
        &self.flows
    }

    /// Flows whose source or sink is `block`.
    pub fn flows_of_block(&self, block: BlockId) -> &[FlowId] {
        self.by_block.get(&block).map_or(&[], Vec::as_slice)
    }

    /// Number of flows.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Whether there are no flows.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
