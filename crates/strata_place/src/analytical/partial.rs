//! Continuous node positions used by the analytical solver.
//!
//! Blocks collapse into nodes: a macro becomes one node represented by its
//! head member. Moveable nodes come first; fixed nodes (fixed blocks and
//! macros with a fixed member) follow.

use crate::ids::BlockId;
use crate::macros::MacroRegistry;
use crate::netlist::{NetModel, PlaceNetlist};
use crate::state::BlockLocations;
use strata_arch::Loc;

/// A net as the solver sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeNet {
    /// Clique or star, by pin count.
    pub model: NetModel,
    /// Node of every pin, in pin order. Pins on the same node repeat.
    pub nodes: Vec<usize>,
}

/// Node positions and node-level connectivity of a netlist.
#[derive(Debug, Clone)]
pub struct PartialPlacement {
    num_moveable: usize,
    node_block: Vec<BlockId>,
    block_node: Vec<usize>,
    /// Horizontal position per node.
    pub x: Vec<f64>,
    /// Vertical position per node.
    pub y: Vec<f64>,
    /// Layer per node; the solver does not move nodes across layers.
    pub layer: Vec<i32>,
    nets: Vec<NodeNet>,
}

impl PartialPlacement {
    /// Builds nodes from the netlist and seeds their positions from
    /// `locations`. Nets ignored for placement are left out.
    pub fn new(netlist: &PlaceNetlist, macros: &MacroRegistry, locations: &BlockLocations) -> Self {
        let head_of = |b: BlockId| macros.macro_of(b).map_or(b, |m| macros.get(m).head());
        let unit_fixed = |head: BlockId| match macros.macro_of(head) {
            Some(m) => macros
                .get(m)
                .members()
                .iter()
                .any(|mm| netlist.block(mm.block).fixed),
            None => netlist.block(head).fixed,
        };

        let heads: Vec<BlockId> = netlist.block_ids().filter(|&b| head_of(b) == b).collect();
        let (moveable, fixed): (Vec<BlockId>, Vec<BlockId>) =
            heads.into_iter().partition(|&h| !unit_fixed(h));
        let num_moveable = moveable.len();
        let node_block: Vec<BlockId> = moveable.into_iter().chain(fixed).collect();

        let mut head_node = vec![usize::MAX; netlist.block_count()];
        for (node, &b) in node_block.iter().enumerate() {
            head_node[b.index()] = node;
        }
        let block_node: Vec<usize> = netlist
            .block_ids()
            .map(|b| head_node[head_of(b).index()])
            .collect();

        let mut x = Vec::with_capacity(node_block.len());
        let mut y = Vec::with_capacity(node_block.len());
        let mut layer = Vec::with_capacity(node_block.len());
        for &b in &node_block {
            let loc = locations
                .get(b)
                .or(netlist.block(b).fixed_loc)
                .unwrap_or_default();
            x.push(f64::from(loc.x));
            y.push(f64::from(loc.y));
            layer.push(loc.layer);
        }

        let nets = netlist
            .net_ids()
            .filter(|&n| !netlist.is_ignored_for_placement(n))
            .map(|n| NodeNet {
                model: netlist.net_model(n),
                nodes: netlist
                    .net(n)
                    .pins()
                    .map(|p| block_node[netlist.pin_block(p).index()])
                    .collect(),
            })
            .collect();

        Self {
            num_moveable,
            node_block,
            block_node,
            x,
            y,
            layer,
            nets,
        }
    }

    /// Nodes the solver may move. They come first in node order.
    pub fn num_moveable_nodes(&self) -> usize {
        self.num_moveable
    }

    /// All nodes, fixed ones included.
    pub fn num_nodes(&self) -> usize {
        self.node_block.len()
    }

    /// Whether `node` is a moveable node.
    pub fn is_moveable(&self, node: usize) -> bool {
        node < self.num_moveable
    }

    /// The node a block belongs to.
    pub fn node_of(&self, block: BlockId) -> usize {
        self.block_node[block.index()]
    }

    /// The block representing a node (the head of a macro).
    pub fn block_of(&self, node: usize) -> BlockId {
        self.node_block[node]
    }

    /// Nets taking part in the solve.
    pub fn nets(&self) -> &[NodeNet] {
        &self.nets
    }

    /// Number of star nets, one synthetic node each.
    pub fn num_star_nets(&self) -> usize {
        self.nets.iter().filter(|n| n.model == NetModel::Star).count()
    }

    /// Nearest grid location of a node.
    pub fn rounded_loc(&self, node: usize) -> Loc {
        Loc::new(
            self.x[node].round() as i32,
            self.y[node].round() as i32,
            self.layer[node],
        )
    }

    /// Moves a node onto an integer location.
    pub fn set_node_loc(&mut self, node: usize, loc: Loc) {
        self.x[node] = f64::from(loc.x);
        self.y[node] = f64::from(loc.y);
        self.layer[node] = loc.layer;
    }

    /// Sum of net bounding-box half-perimeters over node positions.
    pub fn hpwl(&self) -> f64 {
        self.nets
            .iter()
            .map(|net| {
                let (mut lx, mut hx, mut ly, mut hy) =
                    (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
                for &n in &net.nodes {
                    lx = lx.min(self.x[n]);
                    hx = hx.max(self.x[n]);
                    ly = ly.min(self.y[n]);
                    hy = hy.max(self.y[n]);
                }
                (hx - lx) + (hy - ly)
            })
            .sum()
    }
}
