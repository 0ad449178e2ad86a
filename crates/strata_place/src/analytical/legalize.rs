//! Snapping continuous positions onto legal, free sites.

use super::partial::PartialPlacement;
use crate::error::PlaceResult;
use crate::ids::BlockId;
use crate::initial::{no_legal_site, place_fixed_blocks, place_unit, unit_fits};
use crate::macros::{MacroRegistry, PlacementMacro};
use crate::netlist::PlaceNetlist;
use crate::state::BlockLocations;
use strata_arch::{DeviceGrid, Loc};

/// Legalizes every moveable node of `p` and writes the chosen sites back
/// into it.
///
/// Fixed units keep their fixed sites. Macros are placed before single
/// blocks; each unit takes the free legal site nearest (by Manhattan rings,
/// own layer first) to its rounded position.
pub fn legalize(
    p: &mut PartialPlacement,
    netlist: &PlaceNetlist,
    macros: &MacroRegistry,
    grid: &DeviceGrid,
) -> PlaceResult<BlockLocations> {
    let mut locations = BlockLocations::new(netlist.block_count());
    place_fixed_blocks(netlist, macros, grid, &mut locations)?;

    let units: Vec<(usize, BlockId, Option<&PlacementMacro>)> = (0..p.num_moveable_nodes())
        .map(|node| {
            let head = p.block_of(node);
            (node, head, macros.macro_of(head).map(|m| macros.get(m)))
        })
        .collect();
    let order = units
        .iter()
        .filter(|u| u.2.is_some())
        .chain(units.iter().filter(|u| u.2.is_none()));

    for &(node, head, pm) in order {
        let target = grid.clamp(p.rounded_loc(node));
        let loc = nearest_free(netlist, grid, &locations, pm, head, target)
            .ok_or_else(|| no_legal_site(netlist, head))?;
        place_unit(&mut locations, pm, head, loc);
        p.set_node_loc(node, loc);
    }
    Ok(locations)
}

fn nearest_free(
    netlist: &PlaceNetlist,
    grid: &DeviceGrid,
    locations: &BlockLocations,
    pm: Option<&PlacementMacro>,
    head: BlockId,
    target: Loc,
) -> Option<Loc> {
    let mut layers: Vec<i32> = (0..grid.layers()).collect();
    layers.sort_by_key(|&l| (l - target.layer).abs());
    let max_radius = grid.width() + grid.height();
    for layer in layers {
        for r in 0..=max_radius {
            for dx in -r..=r {
                let rem = r - dx.abs();
                let dys: &[i32] = if rem == 0 { &[0] } else { &[-rem, rem] };
                for &dy in dys {
                    let loc = Loc::new(target.x + dx, target.y + dy, layer);
                    if grid.in_bounds(loc) && unit_fits(netlist, grid, locations, pm, head, loc) {
                        return Some(loc);
                    }
                }
            }
        }
    }
    None
}
