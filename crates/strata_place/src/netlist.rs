//! The placement netlist: blocks, nets and pins.
//!
//! Topology is immutable during a placement run. Block and net names are
//! interned in the [`Interner`] owned by the netlist; lookups by name go
//! through it and never through global state.

use crate::ids::{BlockId, NetId, PinId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strata_arch::{BlockType, Loc};
use strata_common::{Ident, Interner};

/// Nets with more pins than this use the star model in the analytical
/// solver; smaller nets use the clique model.
pub const CLIQUE_MAX_PINS: usize = 3;

/// A placeable block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBlock {
    /// The unique ID of this block.
    pub id: BlockId,
    /// Interned block name.
    pub name: Ident,
    /// The block type, which selects the legal site type.
    pub block_type: BlockType,
    /// Whether the block never moves.
    pub fixed: bool,
    /// Required location of a fixed block, if pinned.
    pub fixed_loc: Option<Loc>,
    /// Whether the block is clocked; sequential blocks break timing paths.
    pub sequential: bool,
    /// Intrinsic input-to-output delay of a combinational block, in ns.
    pub delay_ns: f64,
}

/// A connection point of a block on a net.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlacePin {
    /// The unique ID of this pin.
    pub id: PinId,
    /// The block that owns this pin.
    pub block: BlockId,
    /// The net this pin connects to.
    pub net: NetId,
    /// Whether this pin drives its net.
    pub is_driver: bool,
}

/// A signal from one driver pin to one or more sink pins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceNet {
    /// The unique ID of this net.
    pub id: NetId,
    /// Interned net name.
    pub name: Ident,
    /// The driver pin.
    pub driver: PinId,
    /// The sink pins, in connection order.
    pub sinks: Vec<PinId>,
    /// Explicitly excluded from placement cost (e.g. a global clock).
    pub ignored: bool,
}

impl PlaceNet {
    /// Number of pins on the net, driver included.
    pub fn pin_count(&self) -> usize {
        1 + self.sinks.len()
    }

    /// Iterates the driver pin followed by the sink pins.
    pub fn pins(&self) -> impl Iterator<Item = PinId> + '_ {
        std::iter::once(self.driver).chain(self.sinks.iter().copied())
    }
}

/// Analytical net model chosen by pin count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetModel {
    /// Every pin pair is connected directly.
    Clique,
    /// Every pin connects to one synthetic star node.
    Star,
}

/// The placement netlist.
#[derive(Debug, Default)]
pub struct PlaceNetlist {
    /// All blocks.
    pub blocks: Vec<PlaceBlock>,
    /// All nets.
    pub nets: Vec<PlaceNet>,
    /// All pins.
    pub pins: Vec<PlacePin>,
    interner: Interner,
    block_by_name: HashMap<Ident, BlockId>,
    block_pins: Vec<Vec<PinId>>,
    block_nets: Vec<Vec<NetId>>,
}

impl PlaceNetlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a moveable block and returns its ID.
    pub fn add_block(&mut self, name: &str, block_type: BlockType) -> BlockId {
        let id = BlockId::from_raw(self.blocks.len() as u32);
        let name = self.interner.get_or_intern(name);
        self.blocks.push(PlaceBlock {
            id,
            name,
            block_type,
            fixed: false,
            fixed_loc: None,
            sequential: false,
            delay_ns: 0.0,
        });
        self.block_by_name.insert(name, id);
        self.block_pins.push(Vec::new());
        self.block_nets.push(Vec::new());
        id
    }

    /// Adds a block pinned at `loc` and returns its ID.
    pub fn add_fixed_block(&mut self, name: &str, block_type: BlockType, loc: Loc) -> BlockId {
        let id = self.add_block(name, block_type);
        let block = &mut self.blocks[id.index()];
        block.fixed = true;
        block.fixed_loc = Some(loc);
        id
    }

    /// Adds a net driven by `driver` with one sink pin per entry of `sinks`.
    pub fn add_net(&mut self, name: &str, driver: BlockId, sinks: &[BlockId]) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        let driver_pin = self.add_pin(driver, id, true);
        let sink_pins: Vec<PinId> = sinks.iter().map(|&b| self.add_pin(b, id, false)).collect();
        self.nets.push(PlaceNet {
            id,
            name: self.interner.get_or_intern(name),
            driver: driver_pin,
            sinks: sink_pins,
            ignored: false,
        });
        id
    }

    fn add_pin(&mut self, block: BlockId, net: NetId, is_driver: bool) -> PinId {
        let id = PinId::from_raw(self.pins.len() as u32);
        self.pins.push(PlacePin {
            id,
            block,
            net,
            is_driver,
        });
        self.block_pins[block.index()].push(id);
        let nets = &mut self.block_nets[block.index()];
        if !nets.contains(&net) {
            nets.push(net);
        }
        id
    }

    /// Marks a block as clocked.
    pub fn set_sequential(&mut self, block: BlockId, sequential: bool) {
        self.blocks[block.index()].sequential = sequential;
    }

    /// Sets the intrinsic delay of a combinational block.
    pub fn set_block_delay(&mut self, block: BlockId, delay_ns: f64) {
        self.blocks[block.index()].delay_ns = delay_ns;
    }

    /// Excludes or re-includes a net from placement cost.
    pub fn set_net_ignored(&mut self, net: NetId, ignored: bool) {
        self.nets[net.index()].ignored = ignored;
    }

    /// Returns the block with the given ID.
    pub fn block(&self, id: BlockId) -> &PlaceBlock {
        &self.blocks[id.index()]
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &PlaceNet {
        &self.nets[id.index()]
    }

    /// Returns the pin with the given ID.
    pub fn pin(&self, id: PinId) -> &PlacePin {
        &self.pins[id.index()]
    }

    /// The block owning `pin`.
    pub fn pin_block(&self, pin: PinId) -> BlockId {
        self.pins[pin.index()].block
    }

    /// Pins owned by `block`.
    pub fn block_pins(&self, block: BlockId) -> &[PinId] {
        &self.block_pins[block.index()]
    }

    /// Distinct nets touching `block`.
    pub fn block_nets(&self, block: BlockId) -> &[NetId] {
        &self.block_nets[block.index()]
    }

    /// Returns the number of blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Returns the number of pins.
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Iterates all block IDs.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len() as u32).map(BlockId::from_raw)
    }

    /// Iterates all net IDs.
    pub fn net_ids(&self) -> impl Iterator<Item = NetId> {
        (0..self.nets.len() as u32).map(NetId::from_raw)
    }

    /// The interner holding block and net names.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Resolves a block's name.
    pub fn block_name(&self, id: BlockId) -> &str {
        self.interner.resolve(self.block(id).name)
    }

    /// Resolves a net's name.
    pub fn net_name(&self, id: NetId) -> &str {
        self.interner.resolve(self.net(id).name)
    }

    /// Looks up a block by name.
    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        let ident = self.interner.get(name)?;
        self.block_by_name.get(&ident).copied()
    }

    /// Number of distinct blocks a net touches.
    pub fn distinct_blocks(&self, net: NetId) -> usize {
        let mut blocks: Vec<BlockId> = self.net(net).pins().map(|p| self.pin_block(p)).collect();
        blocks.sort_unstable();
        blocks.dedup();
        blocks.len()
    }

    /// Whether a net is left out of wirelength cost and the analytical
    /// model: explicitly ignored, or touching fewer than two blocks.
    pub fn is_ignored_for_placement(&self, net: NetId) -> bool {
        self.net(net).ignored || self.distinct_blocks(net) < 2
    }

    /// Classifies a net for the analytical solver by pin count.
    pub fn net_model(&self, net: NetId) -> NetModel {
        if self.net(net).pin_count() <= CLIQUE_MAX_PINS {
            NetModel::Clique
        } else {
            NetModel::Star
        }
    }

    /// Nets that take part in wirelength cost.
    pub fn placement_nets(&self) -> Vec<NetId> {
        self.net_ids()
            .filter(|&n| !self.is_ignored_for_placement(n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (PlaceNetlist, Vec<BlockId>) {
        let mut nl = PlaceNetlist::new();
        let blocks: Vec<BlockId> = (0..4)
            .map(|i| nl.add_block(&format!("lut_{i}"), BlockType::Clb))
            .collect();
        nl.add_net("n0", blocks[0], &[blocks[1]]);
        nl.add_net("n1", blocks[1], &[blocks[2], blocks[3], blocks[0]]);
        (nl, blocks)
    }

    #[test]
    fn empty_netlist() {
        let nl = PlaceNetlist::new();
        assert_eq!(nl.block_count(), 0);
        assert_eq!(nl.net_count(), 0);
        assert_eq!(nl.pin_count(), 0);
    }

    #[test]
    fn pins_link_blocks_and_nets() {
        let (nl, b) = chain();
        assert_eq!(nl.pin_count(), 6);
        let n1 = NetId::from_raw(1);
        assert_eq!(nl.net(n1).pin_count(), 4);
        assert_eq!(nl.pin_block(nl.net(n1).driver), b[1]);
        assert!(nl.pin(nl.net(n1).driver).is_driver);
        assert_eq!(nl.block_nets(b[1]), &[NetId::from_raw(0), n1]);
        assert_eq!(nl.block_pins(b[0]).len(), 2);
    }

    #[test]
    fn name_lookup_through_interner() {
        let (nl, b) = chain();
        assert_eq!(nl.find_block("lut_2"), Some(b[2]));
        assert_eq!(nl.block_name(b[3]), "lut_3");
        assert_eq!(nl.net_name(NetId::from_raw(0)), "n0");
        assert_eq!(nl.find_block("missing"), None);
    }

    #[test]
    fn net_models_by_pin_count() {
        let (nl, _) = chain();
        assert_eq!(nl.net_model(NetId::from_raw(0)), NetModel::Clique);
        assert_eq!(nl.net_model(NetId::from_raw(1)), NetModel::Star);
    }

    #[test]
    fn ignored_nets() {
        let (mut nl, b) = chain();
        let self_loop = nl.add_net("self", b[2], &[b[2]]);
        assert!(nl.is_ignored_for_placement(self_loop));
        assert!(!nl.is_ignored_for_placement(NetId::from_raw(0)));
        nl.set_net_ignored(NetId::from_raw(0), true);
        assert!(nl.is_ignored_for_placement(NetId::from_raw(0)));
        assert_eq!(nl.placement_nets(), vec![NetId::from_raw(1)]);
    }

    #[test]
    fn fixed_block_carries_location() {
        let mut nl = PlaceNetlist::new();
        let io = nl.add_fixed_block("pad", BlockType::Io, Loc::new(0, 3, 0));
        assert!(nl.block(io).fixed);
        assert_eq!(nl.block(io).fixed_loc, Some(Loc::new(0, 3, 0)));
    }
}
