//! Move generation.
//!
//! A [`MoveGenerator`] picks a block (the whole macro when the block is a
//! macro member) and a legal target within the range limit, and records the
//! resulting relocations in [`BlocksAffected`]. Occupied targets are
//! swapped when the occupant can legally take the vacated site; anything
//! else makes the proposal [`MoveOutcome::Abort`].

mod centroid;
mod critical;
mod inter_layer;
mod uniform;

pub use centroid::CentroidMoveGenerator;
pub use critical::CriticalUniformMoveGenerator;
pub use inter_layer::InterLayerMoveGenerator;
pub use uniform::UniformMoveGenerator;

use crate::cost::timing_cost::TimingCostHandler;
use crate::ids::BlockId;
use crate::macros::{MacroRegistry, PlacementMacro};
use crate::netlist::PlaceNetlist;
use crate::state::BlockLocations;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use strata_arch::{BlockType, CompressedGrids, DeviceGrid, Loc};
use strata_config::MoveGeneratorKind;

/// One block relocation inside a proposed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovedBlock {
    /// The block being moved.
    pub block: BlockId,
    /// Its current location.
    pub old_loc: Loc,
    /// Its proposed location.
    pub new_loc: Loc,
}

/// The set of relocations making up one proposed move.
///
/// Cost handlers evaluate a move by reading proposed locations through
/// [`BlocksAffected::loc_of`]; block locations are only changed on commit.
#[derive(Debug, Clone, Default)]
pub struct BlocksAffected {
    moved: Vec<MovedBlock>,
}

impl BlocksAffected {
    /// Forgets all recorded relocations.
    pub fn clear(&mut self) {
        self.moved.clear();
    }

    /// Records that `block` moves from `old_loc` to `new_loc`.
    pub fn record(&mut self, block: BlockId, old_loc: Loc, new_loc: Loc) {
        self.moved.push(MovedBlock {
            block,
            old_loc,
            new_loc,
        });
    }

    /// The recorded relocations.
    pub fn moved(&self) -> &[MovedBlock] {
        &self.moved
    }

    /// Whether nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
    }

    /// Proposed location of `block`, if it moves.
    pub fn new_loc_of(&self, block: BlockId) -> Option<Loc> {
        self.moved
            .iter()
            .find(|m| m.block == block)
            .map(|m| m.new_loc)
    }

    /// Whether `block` takes part in the move.
    pub fn contains(&self, block: BlockId) -> bool {
        self.moved.iter().any(|m| m.block == block)
    }

    /// Location of `block` as if the move were committed.
    pub fn loc_of(&self, locations: &BlockLocations, block: BlockId) -> Loc {
        self.new_loc_of(block)
            .unwrap_or_else(|| locations.loc(block))
    }
}

/// Result of asking a generator for a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// A legal move was recorded in [`BlocksAffected`].
    Proposed,
    /// No legal move exists for the chosen block and target.
    Abort,
}

/// Proposal counters for one move generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveStats {
    /// Which generator produced the moves.
    pub kind: MoveGeneratorKind,
    /// Proposals requested.
    pub proposed: u64,
    /// Proposals accepted and committed.
    pub accepted: u64,
    /// Proposals evaluated and rejected.
    pub rejected: u64,
    /// Proposals that found no legal move.
    pub aborted: u64,
}

impl MoveStats {
    /// Zeroed counters for `kind`.
    pub fn new(kind: MoveGeneratorKind) -> Self {
        Self {
            kind,
            proposed: 0,
            accepted: 0,
            rejected: 0,
            aborted: 0,
        }
    }

    /// Fraction of proposals accepted.
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}

/// Read-only view of the placement handed to generators.
pub struct MoveContext<'a> {
    /// The netlist.
    pub netlist: &'a PlaceNetlist,
    /// The device grid.
    pub grid: &'a DeviceGrid,
    /// Legal-site index per block type.
    pub compressed: &'a CompressedGrids,
    /// Placement macros.
    pub macros: &'a MacroRegistry,
    /// Current block locations.
    pub locations: &'a BlockLocations,
    /// Blocks that may move.
    pub movable: &'a [BlockId],
    /// Connection criticalities, in timing-driven runs.
    pub timing: Option<&'a TimingCostHandler>,
}

/// A move proposal strategy.
pub trait MoveGenerator {
    /// Which strategy this is.
    fn kind(&self) -> MoveGeneratorKind;

    /// Records one proposed move in `affected`, which the caller has cleared.
    fn propose(
        &mut self,
        ctx: &MoveContext<'_>,
        rlim: f64,
        rng: &mut dyn RngCore,
        affected: &mut BlocksAffected,
    ) -> MoveOutcome;
}

/// Creates the generator selected in configuration.
pub fn make_move_generator(kind: MoveGeneratorKind) -> Box<dyn MoveGenerator> {
    match kind {
        MoveGeneratorKind::Uniform => Box::new(UniformMoveGenerator),
        MoveGeneratorKind::Centroid => Box::new(CentroidMoveGenerator),
        MoveGeneratorKind::CriticalUniform => Box::new(CriticalUniformMoveGenerator),
        MoveGeneratorKind::InterLayer => Box::new(InterLayerMoveGenerator),
    }
}

/// Blocks that may move: not fixed and not in a macro with a fixed member.
pub fn movable_blocks(netlist: &PlaceNetlist, macros: &MacroRegistry) -> Vec<BlockId> {
    netlist
        .block_ids()
        .filter(|&b| {
            let fixed = |id: BlockId| netlist.block(id).fixed;
            match macros.macro_of(b) {
                Some(m) => !macros.get(m).members().iter().any(|mm| fixed(mm.block)),
                None => !fixed(b),
            }
        })
        .collect()
}

/// Window half-width for a range limit.
pub(crate) fn window(rlim: f64) -> i32 {
    rlim.max(1.0) as i32
}

/// Picks a random movable block.
pub(crate) fn pick_block(ctx: &MoveContext<'_>, rng: &mut dyn RngCore) -> Option<BlockId> {
    if ctx.movable.is_empty() {
        return None;
    }
    Some(ctx.movable[rng.gen_range(0..ctx.movable.len())])
}

/// The unit that moves when `block` is picked: the macro head and its type
/// for macro members, the block itself otherwise.
pub(crate) fn moving_unit(ctx: &MoveContext<'_>, block: BlockId) -> (BlockId, BlockType) {
    let head = match ctx.macros.macro_of(block) {
        Some(m) => ctx.macros.get(m).head(),
        None => block,
    };
    (head, ctx.netlist.block(head).block_type)
}

/// Records the relocation of `block` (and its macro, if any) so that
/// `block` lands on `target`.
pub fn propose_relocation(
    ctx: &MoveContext<'_>,
    block: BlockId,
    target: Loc,
    affected: &mut BlocksAffected,
) -> MoveOutcome {
    match ctx.macros.macro_of(block) {
        Some(m) => {
            let mac = ctx.macros.get(m);
            let Some(offset) = mac.offset_of(block) else {
                return MoveOutcome::Abort;
            };
            let head_target = Loc::new(
                target.x - offset.dx,
                target.y - offset.dy,
                target.layer - offset.dlayer,
            );
            propose_macro_move(ctx, mac, head_target, affected)
        }
        None => propose_single_move(ctx, block, target, affected),
    }
}

fn propose_single_move(
    ctx: &MoveContext<'_>,
    block: BlockId,
    target: Loc,
    affected: &mut BlocksAffected,
) -> MoveOutcome {
    let from = ctx.locations.loc(block);
    let block_type = ctx.netlist.block(block).block_type;
    if target == from || !ctx.grid.is_legal(target, block_type) {
        return MoveOutcome::Abort;
    }
    match ctx.locations.occupant(target) {
        None => {
            affected.record(block, from, target);
            MoveOutcome::Proposed
        }
        Some(other) => {
            if !can_displace(ctx, other, from) {
                return MoveOutcome::Abort;
            }
            affected.record(block, from, target);
            affected.record(other, target, from);
            MoveOutcome::Proposed
        }
    }
}

fn propose_macro_move(
    ctx: &MoveContext<'_>,
    mac: &PlacementMacro,
    head_target: Loc,
    affected: &mut BlocksAffected,
) -> MoveOutcome {
    let head_from = ctx.locations.loc(mac.head());
    if head_target == head_from {
        return MoveOutcome::Abort;
    }
    let targets: Vec<(BlockId, Loc, Loc)> = mac
        .member_locs(head_target)
        .map(|(b, to)| (b, ctx.locations.loc(b), to))
        .collect();
    for &(b, _, to) in &targets {
        if !ctx.grid.is_legal(to, ctx.netlist.block(b).block_type) {
            return MoveOutcome::Abort;
        }
    }
    // Sites the macro leaves behind, in member order.
    let mut freed: Vec<Option<Loc>> = targets
        .iter()
        .map(|&(_, from, _)| {
            if targets.iter().any(|&(_, _, to)| to == from) {
                None
            } else {
                Some(from)
            }
        })
        .collect();
    let mut displaced = Vec::new();
    for (i, &(_, _, to)) in targets.iter().enumerate() {
        let Some(other) = ctx.locations.occupant(to) else {
            continue;
        };
        if mac.contains(other) {
            continue;
        }
        displaced.push((i, other, to));
    }
    for &(b, from, to) in &targets {
        affected.record(b, from, to);
    }
    for (i, other, at) in displaced {
        // Prefer the site vacated by the member that took this one.
        let slot = match freed[i] {
            Some(site) if can_displace(ctx, other, site) => Some(i),
            _ => freed
                .iter()
                .position(|s| s.is_some_and(|site| can_displace(ctx, other, site))),
        };
        let Some(slot) = slot else {
            affected.clear();
            return MoveOutcome::Abort;
        };
        let Some(site) = freed[slot].take() else {
            affected.clear();
            return MoveOutcome::Abort;
        };
        affected.record(other, at, site);
    }
    MoveOutcome::Proposed
}

/// Whether `other` may be pushed to `site` to make room.
fn can_displace(ctx: &MoveContext<'_>, other: BlockId, site: Loc) -> bool {
    let block = ctx.netlist.block(other);
    !block.fixed && ctx.macros.macro_of(other).is_none() && ctx.grid.is_legal(site, block.block_type)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::netlist::PlaceNetlist;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use strata_arch::{LocOffset, SiteType};

    pub(crate) struct Fixture {
        pub netlist: PlaceNetlist,
        pub grid: DeviceGrid,
        pub compressed: CompressedGrids,
        pub macros: MacroRegistry,
        pub locations: BlockLocations,
        pub movable: Vec<BlockId>,
    }

    impl Fixture {
        pub(crate) fn ctx(&self) -> MoveContext<'_> {
            MoveContext {
                netlist: &self.netlist,
                grid: &self.grid,
                compressed: &self.compressed,
                macros: &self.macros,
                locations: &self.locations,
                movable: &self.movable,
                timing: None,
            }
        }
    }

    /// A 6x6 logic grid with four blocks in a row and a 2-high macro.
    pub(crate) fn fixture() -> Fixture {
        let grid = DeviceGrid::new(6, 6, 2, SiteType::Logic);
        let mut netlist = PlaceNetlist::new();
        let blocks: Vec<BlockId> = (0..4)
            .map(|i| netlist.add_block(&format!("b{i}"), BlockType::Clb))
            .collect();
        let m0 = netlist.add_block("m0", BlockType::Clb);
        let m1 = netlist.add_block("m1", BlockType::Clb);
        let pad = netlist.add_fixed_block("pad", BlockType::Clb, Loc::new(5, 5, 0));
        netlist.add_net("n0", blocks[0], &[blocks[1], m0]);
        netlist.add_net("n1", blocks[2], &[blocks[3], pad]);
        let mut macros = MacroRegistry::new();
        macros
            .add(vec![(m0, LocOffset::ZERO), (m1, LocOffset::new(0, 1, 0))])
            .unwrap();
        let mut locations = BlockLocations::new(netlist.block_count());
        for (i, &b) in blocks.iter().enumerate() {
            locations.place(b, Loc::new(i as i32, 0, 0));
        }
        locations.place(m0, Loc::new(2, 2, 0));
        locations.place(m1, Loc::new(2, 3, 0));
        locations.place(pad, Loc::new(5, 5, 0));
        let movable = movable_blocks(&netlist, &macros);
        Fixture {
            compressed: CompressedGrids::new(&grid),
            netlist,
            grid,
            macros,
            locations,
            movable,
        }
    }

    fn b(i: u32) -> BlockId {
        BlockId::from_raw(i)
    }

    #[test]
    fn movable_excludes_fixed() {
        let f = fixture();
        assert_eq!(f.movable.len(), 6);
        assert!(!f.movable.contains(&b(6)));
    }

    #[test]
    fn single_move_to_free_site() {
        let f = fixture();
        let mut affected = BlocksAffected::default();
        let out = propose_relocation(&f.ctx(), b(0), Loc::new(0, 4, 0), &mut affected);
        assert_eq!(out, MoveOutcome::Proposed);
        assert_eq!(affected.moved().len(), 1);
        assert_eq!(affected.loc_of(&f.locations, b(0)), Loc::new(0, 4, 0));
        assert_eq!(affected.loc_of(&f.locations, b(1)), Loc::new(1, 0, 0));
    }

    #[test]
    fn single_move_swaps_with_occupant() {
        let f = fixture();
        let mut affected = BlocksAffected::default();
        let out = propose_relocation(&f.ctx(), b(0), Loc::new(1, 0, 0), &mut affected);
        assert_eq!(out, MoveOutcome::Proposed);
        assert_eq!(affected.new_loc_of(b(1)), Some(Loc::new(0, 0, 0)));
    }

    #[test]
    fn cannot_swap_with_fixed_or_macro_member() {
        let f = fixture();
        let mut affected = BlocksAffected::default();
        assert_eq!(
            propose_relocation(&f.ctx(), b(0), Loc::new(5, 5, 0), &mut affected),
            MoveOutcome::Abort
        );
        assert_eq!(
            propose_relocation(&f.ctx(), b(0), Loc::new(2, 3, 0), &mut affected),
            MoveOutcome::Abort
        );
        assert_eq!(
            propose_relocation(&f.ctx(), b(0), Loc::new(9, 9, 0), &mut affected),
            MoveOutcome::Abort
        );
        assert!(affected.is_empty());
    }

    #[test]
    fn macro_move_preserves_offsets() {
        let f = fixture();
        let mut affected = BlocksAffected::default();
        // Moving m1 to (3, 1) puts the head m0 at (3, 0), displacing b3.
        let out = propose_relocation(&f.ctx(), b(5), Loc::new(3, 1, 0), &mut affected);
        assert_eq!(out, MoveOutcome::Proposed);
        let head = affected.loc_of(&f.locations, b(4));
        let tail = affected.loc_of(&f.locations, b(5));
        assert_eq!(tail.offset_from(head), LocOffset::new(0, 1, 0));
        assert_eq!(head, Loc::new(3, 0, 0));
        assert_eq!(affected.new_loc_of(b(3)), Some(Loc::new(2, 2, 0)));
    }

    #[test]
    fn macro_move_off_grid_aborts() {
        let f = fixture();
        let mut affected = BlocksAffected::default();
        let out = propose_relocation(&f.ctx(), b(4), Loc::new(3, 5, 0), &mut affected);
        assert_eq!(out, MoveOutcome::Abort);
    }

    #[test]
    fn overlapping_macro_shift_is_legal() {
        let f = fixture();
        let mut affected = BlocksAffected::default();
        let out = propose_relocation(&f.ctx(), b(4), Loc::new(2, 3, 0), &mut affected);
        assert_eq!(out, MoveOutcome::Proposed);
        let mut locs = f.locations.clone();
        locs.apply(&affected);
        assert_eq!(locs.occupant(Loc::new(2, 3, 0)), Some(b(4)));
        assert_eq!(locs.occupant(Loc::new(2, 4, 0)), Some(b(5)));
        assert_eq!(locs.occupant(Loc::new(2, 2, 0)), None);
    }

    #[test]
    fn factory_builds_requested_kind() {
        for kind in [
            MoveGeneratorKind::Uniform,
            MoveGeneratorKind::Centroid,
            MoveGeneratorKind::CriticalUniform,
            MoveGeneratorKind::InterLayer,
        ] {
            assert_eq!(make_move_generator(kind).kind(), kind);
        }
    }

    #[test]
    fn every_generator_respects_legality_and_macros() {
        let f = fixture();
        let mut rng = StdRng::seed_from_u64(11);
        for kind in [
            MoveGeneratorKind::Uniform,
            MoveGeneratorKind::Centroid,
            MoveGeneratorKind::InterLayer,
        ] {
            let mut generator = make_move_generator(kind);
            for _ in 0..200 {
                let mut affected = BlocksAffected::default();
                if generator.propose(&f.ctx(), 3.0, &mut rng, &mut affected) == MoveOutcome::Abort {
                    continue;
                }
                let mut locs = f.locations.clone();
                locs.apply(&affected);
                assert_eq!(locs.occupied_sites(), f.netlist.block_count());
                let head = locs.loc(b(4));
                assert_eq!(locs.loc(b(5)).offset_from(head), LocOffset::new(0, 1, 0));
                assert_eq!(locs.loc(b(6)), Loc::new(5, 5, 0));
            }
        }
    }

    #[test]
    fn stats_rate() {
        let mut s = MoveStats::new(MoveGeneratorKind::Uniform);
        assert_eq!(s.acceptance_rate(), 0.0);
        s.proposed = 4;
        s.accepted = 1;
        assert!((s.acceptance_rate() - 0.25).abs() < 1e-12);
    }
}
