//! Bounding-box wirelength cost.
//!
//! Each net's cost is its bounding-box half-perimeter (inclusive of both end
//! columns and rows) scaled by an expected crossing count for its pin count,
//! plus a per-layer term. Boxes carry the number of pins on each extreme so
//! most moves update a large net in constant time.

use super::CostMethod;
use crate::ids::{BlockId, NetId};
use crate::moves::BlocksAffected;
use crate::netlist::PlaceNetlist;
use crate::state::BlockLocations;
use strata_arch::Loc;

/// Nets with fewer pins are always recomputed instead of updated.
const SMALL_NET_PINS: usize = 4;

/// Expected number of wire crossings of a net's bounding box, indexed by
/// pin count minus one, for nets of up to 50 pins.
const CROSSING_COUNT: [f64; 50] = [
    1.0, 1.0, 1.0, 1.0828, 1.1536, 1.2206, 1.2823, 1.3385, 1.3991, 1.4493, 1.4974, 1.5455, 1.5937,
    1.6418, 1.6899, 1.7304, 1.7709, 1.8114, 1.8519, 1.8924, 1.9288, 1.9652, 2.0015, 2.0379, 2.0743,
    2.1061, 2.1379, 2.1698, 2.2016, 2.2334, 2.2646, 2.2958, 2.3271, 2.3583, 2.3895, 2.4187, 2.4479,
    2.4772, 2.5064, 2.5356, 2.5610, 2.5864, 2.6117, 2.6371, 2.6625, 2.6887, 2.7148, 2.7410, 2.7671,
    2.7933,
];

/// Crossing-count factor for a net with `pins` pins.
pub fn crossing_count(pins: usize) -> f64 {
    if pins == 0 {
        return 1.0;
    }
    if pins > CROSSING_COUNT.len() {
        2.7933 + 0.02616 * (pins - CROSSING_COUNT.len()) as f64
    } else {
        CROSSING_COUNT[pins - 1]
    }
}

/// One axis of a bounding box with the number of pins on each extreme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extent {
    min: i32,
    min_count: u32,
    max: i32,
    max_count: u32,
}

impl Extent {
    fn single(v: i32) -> Self {
        Self {
            min: v,
            min_count: 1,
            max: v,
            max_count: 1,
        }
    }

    fn add(&mut self, v: i32) {
        if v < self.min {
            self.min = v;
            self.min_count = 1;
        } else if v == self.min {
            self.min_count += 1;
        }
        if v > self.max {
            self.max = v;
            self.max_count = 1;
        } else if v == self.max {
            self.max_count += 1;
        }
    }

    fn span(&self) -> i32 {
        self.max - self.min
    }

    /// Moves one pin from `old` to `new`. Returns `false` when the pin was
    /// the only one on an extreme it leaves, so the extent must be rebuilt.
    fn update(&mut self, old: i32, new: i32) -> bool {
        if new < old {
            if old == self.max {
                if self.max_count == 1 {
                    return false;
                }
                self.max_count -= 1;
            }
            if new < self.min {
                self.min = new;
                self.min_count = 1;
            } else if new == self.min {
                self.min_count += 1;
            }
        } else if new > old {
            if old == self.min {
                if self.min_count == 1 {
                    return false;
                }
                self.min_count -= 1;
            }
            if new > self.max {
                self.max = new;
                self.max_count = 1;
            } else if new == self.max {
                self.max_count += 1;
            }
        }
        true
    }
}

/// A net bounding box over columns, rows and layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetBox {
    x: Extent,
    y: Extent,
    layer: Extent,
}

impl NetBox {
    fn at(loc: Loc) -> Self {
        Self {
            x: Extent::single(loc.x),
            y: Extent::single(loc.y),
            layer: Extent::single(loc.layer),
        }
    }

    fn add(&mut self, loc: Loc) {
        self.x.add(loc.x);
        self.y.add(loc.y);
        self.layer.add(loc.layer);
    }

    fn update(&mut self, old: Loc, new: Loc) -> bool {
        self.x.update(old.x, new.x) && self.y.update(old.y, new.y) && self.layer.update(old.layer, new.layer)
    }

    /// Column, row and layer spans.
    pub fn spans(&self) -> (i32, i32, i32) {
        (self.x.span(), self.y.span(), self.layer.span())
    }
}

#[derive(Debug, Clone, Copy)]
struct ProposedNet {
    net: NetId,
    bbox: NetBox,
    cost: f64,
    rebuild: bool,
}

/// Tracks per-net bounding boxes and costs.
#[derive(Debug, Clone)]
pub struct NetCostHandler {
    layer_weight: f64,
    considered: Vec<bool>,
    pin_counts: Vec<usize>,
    boxes: Vec<Option<NetBox>>,
    net_costs: Vec<f64>,
    proposed: Vec<ProposedNet>,
    slot: Vec<Option<usize>>,
}

impl NetCostHandler {
    /// Creates a handler for `netlist`. Ignored nets cost nothing.
    pub fn new(netlist: &PlaceNetlist, layer_weight: f64) -> Self {
        let n = netlist.net_count();
        Self {
            layer_weight,
            considered: netlist
                .net_ids()
                .map(|net| !netlist.is_ignored_for_placement(net))
                .collect(),
            pin_counts: netlist.nets.iter().map(|net| net.pin_count()).collect(),
            boxes: vec![None; n],
            net_costs: vec![0.0; n],
            proposed: Vec::new(),
            slot: vec![None; n],
        }
    }

    /// Total bounding-box cost over all nets.
    ///
    /// `Normal` stores every box and net cost for incremental updates;
    /// `Check` leaves stored state untouched.
    pub fn comp_bb_cost(
        &mut self,
        method: CostMethod,
        netlist: &PlaceNetlist,
        locations: &BlockLocations,
    ) -> f64 {
        let mut total = 0.0;
        for net in netlist.net_ids() {
            if !self.considered[net.index()] {
                continue;
            }
            let bbox = build_box(netlist, net, |b| locations.loc(b));
            let cost = self.cost_of(net, &bbox);
            if method == CostMethod::Normal {
                self.boxes[net.index()] = Some(bbox);
                self.net_costs[net.index()] = cost;
            }
            total += cost;
        }
        total
    }

    /// Evaluates the nets touched by a proposed move into scratch storage and
    /// returns the change in bounding-box cost.
    pub fn find_affected_nets(
        &mut self,
        netlist: &PlaceNetlist,
        locations: &BlockLocations,
        affected: &BlocksAffected,
    ) -> f64 {
        self.revert();
        for m in affected.moved() {
            for &pin in netlist.block_pins(m.block) {
                let net = netlist.pin(pin).net;
                if !self.considered[net.index()] {
                    continue;
                }
                let i = match self.slot[net.index()] {
                    Some(i) => i,
                    None => {
                        let stored = self.boxes[net.index()];
                        let rebuild =
                            stored.is_none() || self.pin_counts[net.index()] < SMALL_NET_PINS;
                        self.proposed.push(ProposedNet {
                            net,
                            bbox: stored.unwrap_or_else(|| NetBox::at(m.old_loc)),
                            cost: 0.0,
                            rebuild,
                        });
                        self.slot[net.index()] = Some(self.proposed.len() - 1);
                        self.proposed.len() - 1
                    }
                };
                let p = &mut self.proposed[i];
                if !p.rebuild && !p.bbox.update(m.old_loc, m.new_loc) {
                    p.rebuild = true;
                }
            }
        }
        let mut delta = 0.0;
        for i in 0..self.proposed.len() {
            let p = self.proposed[i];
            let bbox = if p.rebuild {
                build_box(netlist, p.net, |b| affected.loc_of(locations, b))
            } else {
                p.bbox
            };
            let cost = self.cost_of(p.net, &bbox);
            delta += cost - self.net_costs[p.net.index()];
            self.proposed[i].bbox = bbox;
            self.proposed[i].cost = cost;
        }
        delta
    }

    /// Installs the boxes and costs of the last evaluated move.
    pub fn commit(&mut self) {
        for p in self.proposed.drain(..) {
            self.boxes[p.net.index()] = Some(p.bbox);
            self.net_costs[p.net.index()] = p.cost;
            self.slot[p.net.index()] = None;
        }
    }

    /// Discards the last evaluated move.
    pub fn revert(&mut self) {
        for p in self.proposed.drain(..) {
            self.slot[p.net.index()] = None;
        }
    }

    /// Stored cost of one net.
    pub fn net_cost(&self, net: NetId) -> f64 {
        self.net_costs[net.index()]
    }

    /// Sum of the stored net costs.
    pub fn stored_total(&self) -> f64 {
        self.net_costs.iter().sum()
    }

    /// Number of nets that take part in wirelength cost.
    pub fn considered_nets(&self) -> usize {
        self.considered.iter().filter(|&&c| c).count()
    }

    fn cost_of(&self, net: NetId, bbox: &NetBox) -> f64 {
        let (dx, dy, dl) = bbox.spans();
        crossing_count(self.pin_counts[net.index()]) * f64::from(dx + 1 + dy + 1)
            + self.layer_weight * f64::from(dl)
    }
}

fn build_box(netlist: &PlaceNetlist, net: NetId, loc_of: impl Fn(BlockId) -> Loc) -> NetBox {
    let n = netlist.net(net);
    let mut pins = n.pins().map(|p| loc_of(netlist.pin_block(p)));
    let first = pins.next().unwrap_or_default();
    let mut bbox = NetBox::at(first);
    for loc in pins {
        bbox.add(loc);
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::MacroRegistry;
    use crate::moves::{movable_blocks, MoveContext, MoveGenerator, MoveOutcome, UniformMoveGenerator};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use strata_arch::{BlockType, CompressedGrids, DeviceGrid, SiteType};

    #[test]
    fn crossing_table_and_extrapolation() {
        assert_eq!(crossing_count(2), 1.0);
        assert_eq!(crossing_count(4), 1.0828);
        assert_eq!(crossing_count(50), 2.7933);
        assert!((crossing_count(60) - (2.7933 + 0.2616)).abs() < 1e-9);
    }

    #[test]
    fn extent_update_counts() {
        let mut e = Extent::single(3);
        e.add(3);
        e.add(7);
        // Two pins at 3, one at 7. Moving one off the minimum keeps it.
        assert!(e.update(3, 5));
        assert_eq!((e.min, e.min_count, e.max), (3, 1, 7));
        // The last pin on the minimum leaving forces a rebuild.
        assert!(!e.update(3, 4));
        assert!(e.update(7, 9));
        assert_eq!((e.max, e.max_count), (9, 1));
    }

    fn star_design() -> (PlaceNetlist, BlockLocations, DeviceGrid) {
        let grid = DeviceGrid::new(10, 10, 2, SiteType::Logic);
        let mut nl = PlaceNetlist::new();
        let blocks: Vec<BlockId> = (0..8)
            .map(|i| nl.add_block(&format!("b{i}"), BlockType::Clb))
            .collect();
        nl.add_net("wide", blocks[0], &blocks[1..6]);
        nl.add_net("pair", blocks[6], &[blocks[7]]);
        nl.add_net("tri", blocks[1], &[blocks[6], blocks[3]]);
        let mut locs = BlockLocations::new(nl.block_count());
        for (i, &b) in blocks.iter().enumerate() {
            locs.place(b, Loc::new(i as i32, (i as i32 * 3) % 10, 0));
        }
        (nl, locs, grid)
    }

    #[test]
    fn two_pin_net_cost() {
        let (nl, locs, _) = star_design();
        let mut h = NetCostHandler::new(&nl, 1.0);
        h.comp_bb_cost(CostMethod::Normal, &nl, &locs);
        // b6 at (6, 8), b7 at (7, 1): (1 + 1) + (7 + 1) = 10.
        assert!((h.net_cost(NetId::from_raw(1)) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn check_equals_normal_after_random_moves() {
        let (nl, mut locs, grid) = star_design();
        let macros = MacroRegistry::new();
        let compressed = CompressedGrids::new(&grid);
        let movable = movable_blocks(&nl, &macros);
        let mut h = NetCostHandler::new(&nl, 2.0);
        let mut tracked = h.comp_bb_cost(CostMethod::Normal, &nl, &locs);
        let mut rng = StdRng::seed_from_u64(21);
        let mut generator = UniformMoveGenerator;
        for step in 0..2000 {
            let mut affected = BlocksAffected::default();
            let outcome = {
                let ctx = MoveContext {
                    netlist: &nl,
                    grid: &grid,
                    compressed: &compressed,
                    macros: &macros,
                    locations: &locs,
                    movable: &movable,
                    timing: None,
                };
                generator.propose(&ctx, 4.0, &mut rng, &mut affected)
            };
            if outcome == MoveOutcome::Abort {
                continue;
            }
            let delta = h.find_affected_nets(&nl, &locs, &affected);
            if step % 3 == 0 {
                h.revert();
            } else {
                h.commit();
                locs.apply(&affected);
                tracked += delta;
            }
            let check = h.comp_bb_cost(CostMethod::Check, &nl, &locs);
            assert!((check - tracked).abs() < 1e-6, "step {step}: {check} vs {tracked}");
        }
        assert!((h.stored_total() - tracked).abs() < 1e-6);
    }

    #[test]
    fn check_mode_leaves_state_untouched() {
        let (nl, mut locs, _) = star_design();
        let mut h = NetCostHandler::new(&nl, 1.0);
        let before = h.comp_bb_cost(CostMethod::Normal, &nl, &locs);
        locs.place(BlockId::from_raw(0), Loc::new(9, 9, 1));
        let after = h.comp_bb_cost(CostMethod::Check, &nl, &locs);
        assert!(after > before);
        assert!((h.stored_total() - before).abs() < 1e-12);
    }

    #[test]
    fn ignored_nets_cost_nothing() {
        let mut nl = PlaceNetlist::new();
        let a = nl.add_block("a", BlockType::Clb);
        let b = nl.add_block("b", BlockType::Clb);
        let clk = nl.add_net("clk", a, &[b]);
        nl.set_net_ignored(clk, true);
        nl.add_net("self", a, &[a]);
        let locs = BlockLocations::from_locs(&[Loc::new(0, 0, 0), Loc::new(5, 5, 0)]).unwrap();
        let mut h = NetCostHandler::new(&nl, 1.0);
        assert_eq!(h.comp_bb_cost(CostMethod::Normal, &nl, &locs), 0.0);
        assert_eq!(h.considered_nets(), 0);
    }
}
