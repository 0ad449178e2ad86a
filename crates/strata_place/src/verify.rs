//! Placement legality verification.

use crate::macros::MacroRegistry;
use crate::netlist::PlaceNetlist;
use crate::state::BlockLocations;
use strata_arch::DeviceGrid;
use strata_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

/// A block has no location.
pub const UNPLACED_BLOCK: DiagnosticCode = DiagnosticCode::new(Category::Placement, 101);
/// A block sits on a site that cannot hold its type.
pub const ILLEGAL_SITE: DiagnosticCode = DiagnosticCode::new(Category::Placement, 102);
/// Two blocks claim the same site.
pub const SITE_CONFLICT: DiagnosticCode = DiagnosticCode::new(Category::Placement, 103);
/// A macro member is not at its offset from the head.
pub const MACRO_OFFSET: DiagnosticCode = DiagnosticCode::new(Category::Placement, 104);
/// A fixed block has moved.
pub const FIXED_MOVED: DiagnosticCode = DiagnosticCode::new(Category::Placement, 105);

/// Checks every block location and returns the number of errors found.
/// Each error is also emitted into `sink`.
pub fn verify_placement(
    netlist: &PlaceNetlist,
    macros: &MacroRegistry,
    grid: &DeviceGrid,
    locations: &BlockLocations,
    sink: &DiagnosticSink,
) -> usize {
    let mut errors = 0;
    let mut report = |code, message: String, block: &str| {
        errors += 1;
        sink.emit(Diagnostic::error(code, message).with_subject(block.to_string()));
    };

    for block in netlist.block_ids() {
        let b = netlist.block(block);
        let name = netlist.block_name(block);
        let Some(loc) = locations.get(block) else {
            report(UNPLACED_BLOCK, format!("block `{name}` is not placed"), name);
            continue;
        };
        if !grid.is_legal(loc, b.block_type) {
            report(
                ILLEGAL_SITE,
                format!("block `{name}` of type {:?} cannot occupy {loc}", b.block_type),
                name,
            );
        }
        if let Some(other) = locations.occupant(loc).filter(|&o| o != block) {
            report(
                SITE_CONFLICT,
                format!(
                    "block `{name}` shares {loc} with `{}`",
                    netlist.block_name(other)
                ),
                name,
            );
        }
        if let Some(fixed_loc) = b.fixed_loc.filter(|_| b.fixed) {
            if fixed_loc != loc {
                report(
                    FIXED_MOVED,
                    format!("fixed block `{name}` is at {loc} instead of {fixed_loc}"),
                    name,
                );
            }
        }
    }

    for m in macros.iter() {
        let Some(head_loc) = locations.get(m.head()) else {
            continue;
        };
        for (member, expected) in m.member_locs(head_loc) {
            if let Some(actual) = locations.get(member).filter(|&l| l != expected) {
                let name = netlist.block_name(member);
                report(
                    MACRO_OFFSET,
                    format!("macro member `{name}` is at {actual}, expected {expected}"),
                    name,
                );
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::BlockId;
    use crate::moves::tests::fixture;
    use strata_arch::{Loc, SiteType};

    #[test]
    fn fixture_is_clean() {
        let f = fixture();
        let sink = DiagnosticSink::new();
        assert_eq!(verify_placement(&f.netlist, &f.macros, &f.grid, &f.locations, &sink), 0);
        assert!(!sink.has_errors());
    }

    #[test]
    fn each_violation_counted() {
        let mut f = fixture();
        // Break the macro, move the fixed pad, and put b0 on a DSP column.
        f.locations.place(BlockId::from_raw(5), Loc::new(4, 4, 0));
        f.locations.place(BlockId::from_raw(6), Loc::new(5, 4, 0));
        f.grid.set_site(Loc::new(0, 0, 0), SiteType::Dsp);
        f.locations.remove(BlockId::from_raw(1));
        let sink = DiagnosticSink::new();
        let errors = verify_placement(&f.netlist, &f.macros, &f.grid, &f.locations, &sink);
        assert_eq!(errors, 4);
        let codes: Vec<String> = sink.diagnostics().iter().map(|d| d.code.to_string()).collect();
        for code in ["P101", "P102", "P104", "P105"] {
            assert!(codes.iter().any(|c| c == code), "{code} missing from {codes:?}");
        }
    }
}
