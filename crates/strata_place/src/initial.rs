//! Initial placement.
//!
//! Fixed blocks go to their fixed sites first, then macros as rigid units,
//! then the remaining blocks, each to a random free legal site drawn from
//! the seeded stream.

use crate::checkpoint::PlacementCheckpoint;
use crate::error::{PlaceError, PlaceResult};
use crate::ids::BlockId;
use crate::macros::{MacroRegistry, PlacementMacro};
use crate::netlist::PlaceNetlist;
use crate::state::BlockLocations;
use rand::seq::SliceRandom;
use rand::RngCore;
use std::collections::HashMap;
use strata_arch::{BlockType, DeviceGrid, Loc};

/// Where annealing starts from.
#[derive(Debug, Clone, Default)]
pub enum InitialPlacement {
    /// Random legal placement from the configured seed.
    #[default]
    Random,
    /// One location per block, in block order.
    Given(Vec<Loc>),
    /// The locations saved in a checkpoint.
    Checkpoint(PlacementCheckpoint),
}

/// Places every block on a random free legal site.
pub fn random_placement(
    netlist: &PlaceNetlist,
    macros: &MacroRegistry,
    grid: &DeviceGrid,
    rng: &mut dyn RngCore,
) -> PlaceResult<BlockLocations> {
    let mut locations = BlockLocations::new(netlist.block_count());
    place_fixed_blocks(netlist, macros, grid, &mut locations)?;

    let mut sites: HashMap<BlockType, (Vec<Loc>, usize)> = HashMap::new();
    for m in macros.iter() {
        if locations.get(m.head()).is_some() {
            continue;
        }
        let ty = netlist.block(m.head()).block_type;
        let (candidates, _) = shuffled_sites(&mut sites, grid, ty, rng);
        let head_loc = candidates
            .iter()
            .copied()
            .find(|&loc| unit_fits(netlist, grid, &locations, Some(m), m.head(), loc))
            .ok_or_else(|| no_legal_site(netlist, m.head()))?;
        place_unit(&mut locations, Some(m), m.head(), head_loc);
    }

    for block in netlist.block_ids() {
        if locations.get(block).is_some() {
            continue;
        }
        let ty = netlist.block(block).block_type;
        let (candidates, cursor) = shuffled_sites(&mut sites, grid, ty, rng);
        while *cursor < candidates.len() && locations.occupant(candidates[*cursor]).is_some() {
            *cursor += 1;
        }
        let loc = *candidates
            .get(*cursor)
            .ok_or_else(|| no_legal_site(netlist, block))?;
        locations.place(block, loc);
    }
    Ok(locations)
}

/// The legal sites of a block type in random order, with a cursor past
/// the sites already handed out.
fn shuffled_sites<'a>(
    sites: &'a mut HashMap<BlockType, (Vec<Loc>, usize)>,
    grid: &DeviceGrid,
    ty: BlockType,
    rng: &mut dyn RngCore,
) -> &'a mut (Vec<Loc>, usize) {
    sites.entry(ty).or_insert_with(|| {
        let mut s = grid.sites_for(ty);
        s.shuffle(rng);
        (s, 0)
    })
}

/// Places fixed blocks, and every macro with a fixed member, at their fixed
/// sites.
pub(crate) fn place_fixed_blocks(
    netlist: &PlaceNetlist,
    macros: &MacroRegistry,
    grid: &DeviceGrid,
    locations: &mut BlockLocations,
) -> PlaceResult<()> {
    for block in netlist.block_ids() {
        let b = netlist.block(block);
        let Some(fixed_loc) = b.fixed_loc.filter(|_| b.fixed) else {
            continue;
        };
        let illegal = || PlaceError::IllegalFixedLocation {
            block: netlist.block_name(block).to_string(),
            loc: fixed_loc,
        };
        let pm = macros.macro_of(block).map(|m| macros.get(m));
        let head_loc = match pm {
            Some(pm) => {
                let offset = pm.offset_of(block).unwrap_or_default();
                Loc::new(
                    fixed_loc.x - offset.dx,
                    fixed_loc.y - offset.dy,
                    fixed_loc.layer - offset.dlayer,
                )
            }
            None => fixed_loc,
        };
        let head = pm.map_or(block, PlacementMacro::head);
        if let Some(current) = locations.get(head) {
            // Placed through another fixed member of the same macro.
            if current != head_loc {
                return Err(illegal());
            }
            continue;
        }
        if !unit_fits(netlist, grid, locations, pm, head, head_loc) {
            return Err(illegal());
        }
        place_unit(locations, pm, head, head_loc);
    }
    Ok(())
}

/// Whether the unit headed by `head` (a macro when `pm` is set) can occupy
/// `head_loc`: every member site in bounds, legal and free.
pub(crate) fn unit_fits(
    netlist: &PlaceNetlist,
    grid: &DeviceGrid,
    locations: &BlockLocations,
    pm: Option<&PlacementMacro>,
    head: BlockId,
    head_loc: Loc,
) -> bool {
    let fits = |block: BlockId, loc: Loc| {
        grid.is_legal(loc, netlist.block(block).block_type) && locations.occupant(loc).is_none()
    };
    match pm {
        Some(pm) => pm.member_locs(head_loc).all(|(b, loc)| fits(b, loc)),
        None => fits(head, head_loc),
    }
}

/// Places a unit with its head at `head_loc`.
pub(crate) fn place_unit(
    locations: &mut BlockLocations,
    pm: Option<&PlacementMacro>,
    head: BlockId,
    head_loc: Loc,
) {
    match pm {
        Some(pm) => {
            for (b, loc) in pm.member_locs(head_loc) {
                locations.place(b, loc);
            }
        }
        None => locations.place(head, head_loc),
    }
}

pub(crate) fn no_legal_site(netlist: &PlaceNetlist, block: BlockId) -> PlaceError {
    PlaceError::NoLegalSite {
        block: netlist.block_name(block).to_string(),
    }
}
