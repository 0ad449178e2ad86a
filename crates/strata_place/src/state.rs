//! Block locations and the inverse site occupancy map.

use crate::ids::BlockId;
use crate::moves::BlocksAffected;
use std::collections::HashMap;
use strata_arch::Loc;

/// Where every block sits, and which block occupies every used site.
///
/// Each site holds at most one block.
#[derive(Debug, Clone, Default)]
pub struct BlockLocations {
    locs: Vec<Option<Loc>>,
    occupancy: HashMap<Loc, BlockId>,
}

impl BlockLocations {
    /// Creates an empty placement for `num_blocks` blocks.
    pub fn new(num_blocks: usize) -> Self {
        Self {
            locs: vec![None; num_blocks],
            occupancy: HashMap::new(),
        }
    }

    /// Builds a complete placement from one location per block. Fails with
    /// the conflicting pair when two blocks share a site.
    pub fn from_locs(locs: &[Loc]) -> Result<Self, (BlockId, BlockId)> {
        let mut placed = Self::new(locs.len());
        for (i, &loc) in locs.iter().enumerate() {
            let block = BlockId::from_raw(i as u32);
            if let Some(other) = placed.occupant(loc) {
                return Err((other, block));
            }
            placed.place(block, loc);
        }
        Ok(placed)
    }

    /// Number of blocks tracked.
    pub fn len(&self) -> usize {
        self.locs.len()
    }

    /// Whether no blocks are tracked.
    pub fn is_empty(&self) -> bool {
        self.locs.is_empty()
    }

    /// The location of `block`, if placed.
    pub fn get(&self, block: BlockId) -> Option<Loc> {
        self.locs.get(block.index()).copied().flatten()
    }

    /// The location of a placed block. Unplaced blocks report the origin;
    /// callers run on complete placements only.
    pub fn loc(&self, block: BlockId) -> Loc {
        self.get(block).unwrap_or_default()
    }

    /// The block occupying `loc`, if any.
    pub fn occupant(&self, loc: Loc) -> Option<BlockId> {
        self.occupancy.get(&loc).copied()
    }

    /// Whether every block has a location.
    pub fn is_complete(&self) -> bool {
        self.locs.iter().all(Option::is_some)
    }

    /// Places `block` at `loc`, vacating its previous site. Any block
    /// already at `loc` loses its location.
    pub fn place(&mut self, block: BlockId, loc: Loc) {
        self.remove(block);
        if let Some(previous) = self.occupancy.insert(loc, block) {
            self.locs[previous.index()] = None;
        }
        self.locs[block.index()] = Some(loc);
    }

    /// Removes `block` from the placement.
    pub fn remove(&mut self, block: BlockId) {
        if let Some(old) = self.locs[block.index()].take() {
            if self.occupancy.get(&old) == Some(&block) {
                self.occupancy.remove(&old);
            }
        }
    }

    /// Applies a proposed move: every moved block leaves its old site, then
    /// every moved block takes its new site.
    pub fn apply(&mut self, affected: &BlocksAffected) {
        for m in affected.moved() {
            if self.occupancy.get(&m.old_loc) == Some(&m.block) {
                self.occupancy.remove(&m.old_loc);
            }
        }
        for m in affected.moved() {
            self.occupancy.insert(m.new_loc, m.block);
            self.locs[m.block.index()] = Some(m.new_loc);
        }
    }

    /// Every block's location, in block order. Unplaced blocks report the
    /// origin.
    pub fn to_vec(&self) -> Vec<Loc> {
        self.locs.iter().map(|l| l.unwrap_or_default()).collect()
    }

    /// Iterates `(block, loc)` for placed blocks.
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, Loc)> + '_ {
        self.locs
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.map(|loc| (BlockId::from_raw(i as u32), loc)))
    }

    /// Number of occupied sites.
    pub fn occupied_sites(&self) -> usize {
        self.occupancy.len()
    }
}
