//! Analytical placement pre-pass.
//!
//! Each iteration solves a quadratic wirelength system for continuous node
//! positions, legalizes them onto free sites, and feeds the legal positions
//! back as pseudo-anchors for the next solve.

pub mod cg;
pub mod legalize;
pub mod partial;
pub mod qp_hybrid;
pub mod sparse;

pub use legalize::legalize;
pub use partial::PartialPlacement;
pub use qp_hybrid::QpHybridSolver;

use crate::error::PlaceResult;
use crate::macros::MacroRegistry;
use crate::netlist::PlaceNetlist;
use crate::state::BlockLocations;
use strata_arch::DeviceGrid;
use strata_config::{AnalyticalOptions, SolverKind};

/// An analytical formulation that moves the moveable nodes of a partial
/// placement to their optimum.
pub trait AnalyticalSolver {
    /// Runs solver iteration `iteration`, updating the moveable node
    /// positions of `placement` in place.
    fn solve(&mut self, iteration: u32, placement: &mut PartialPlacement) -> PlaceResult<()>;
}

/// Creates the solver selected in configuration.
pub fn make_analytical_solver(kind: SolverKind, options: &AnalyticalOptions) -> Box<dyn AnalyticalSolver> {
    match kind {
        SolverKind::QpHybrid => Box::new(QpHybridSolver::new(options.clone())),
    }
}

/// Runs `options.iterations` solve/legalize rounds starting from
/// `locations` and returns the last legal placement.
pub fn run_analytical_placement(
    netlist: &PlaceNetlist,
    macros: &MacroRegistry,
    grid: &DeviceGrid,
    options: &AnalyticalOptions,
    locations: &BlockLocations,
) -> PlaceResult<BlockLocations> {
    let mut partial = PartialPlacement::new(netlist, macros, locations);
    let mut solver = make_analytical_solver(options.solver, options);
    let mut legal = locations.clone();
    for iteration in 0..options.iterations {
        solver.solve(iteration, &mut partial)?;
        let solved = partial.hpwl();
        legal = legalize(&mut partial, netlist, macros, grid)?;
        log::info!(
            "analytical iteration {iteration}: hpwl {solved:.2} solved, {:.2} legalized",
            partial.hpwl()
        );
    }
    Ok(legal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::BlockId;
    use strata_arch::{BlockType, Loc, SiteType};

    #[test]
    fn prepass_pulls_chain_between_pads() {
        let grid = DeviceGrid::new(12, 3, 1, SiteType::Logic);
        let mut nl = PlaceNetlist::new();
        let left = nl.add_fixed_block("left", BlockType::Clb, Loc::new(0, 1, 0));
        let right = nl.add_fixed_block("right", BlockType::Clb, Loc::new(11, 1, 0));
        let cells: Vec<BlockId> = (0..4).map(|i| nl.add_block(&format!("c{i}"), BlockType::Clb)).collect();
        nl.add_net("l", left, &[cells[0]]);
        for w in cells.windows(2) {
            nl.add_net(&format!("{}", w[0]), w[0], &[w[1]]);
        }
        nl.add_net("r", cells[3], &[right]);
        // Start with the chain reversed at the far corners.
        let mut start = BlockLocations::new(nl.block_count());
        start.place(left, Loc::new(0, 1, 0));
        start.place(right, Loc::new(11, 1, 0));
        for (i, &c) in cells.iter().enumerate() {
            start.place(c, Loc::new(10 - i as i32, 2 * (i as i32 % 2), 0));
        }
        let options = AnalyticalOptions {
            enabled: true,
            iterations: 3,
            ..AnalyticalOptions::default()
        };
        let placed = run_analytical_placement(&nl, &MacroRegistry::new(), &grid, &options, &start).unwrap();
        let xs: Vec<i32> = cells.iter().map(|&c| placed.loc(c).x).collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]), "{xs:?}");
        assert!(placed.is_complete());
    }
}
