//! Moves toward the centroid of a block's connections.

use super::{
    moving_unit, pick_block, propose_relocation, window, BlocksAffected, MoveContext,
    MoveGenerator, MoveOutcome,
};
use crate::ids::BlockId;
use rand::RngCore;
use strata_arch::Loc;
use strata_config::MoveGeneratorKind;

/// Moves a random block near the centroid of the blocks it connects to.
///
/// In timing-driven runs each connection is weighted by its criticality, so
/// blocks are pulled toward their critical neighbours.
///
/// The `rlim` window is centred on that centroid, not on the block's
/// current location, so a block may land farther than `rlim` from where it
/// started.
#[derive(Debug, Default, Clone, Copy)]
pub struct CentroidMoveGenerator;

impl MoveGenerator for CentroidMoveGenerator {
    fn kind(&self) -> MoveGeneratorKind {
        MoveGeneratorKind::Centroid
    }

    fn propose(
        &mut self,
        ctx: &MoveContext<'_>,
        rlim: f64,
        rng: &mut dyn RngCore,
        affected: &mut BlocksAffected,
    ) -> MoveOutcome {
        let Some(block) = pick_block(ctx, rng) else {
            return MoveOutcome::Abort;
        };
        let Some(centroid) = connection_centroid(ctx, block) else {
            return MoveOutcome::Abort;
        };
        let (head, block_type) = moving_unit(ctx, block);
        let shift = ctx.locations.loc(head).offset_from(ctx.locations.loc(block));
        let center = centroid.offset(shift);
        let Some(to) = ctx
            .compressed
            .get(block_type)
            .sample_in_window(center.layer, center, window(rlim), rng)
        else {
            return MoveOutcome::Abort;
        };
        propose_relocation(ctx, head, to, affected)
    }
}

/// Weighted centroid of the blocks connected to `block`, on `block`'s layer.
fn connection_centroid(ctx: &MoveContext<'_>, block: BlockId) -> Option<Loc> {
    let nl = ctx.netlist;
    let mut neighbours: Vec<(BlockId, f64)> = Vec::new();
    for &net in nl.block_nets(block) {
        if nl.is_ignored_for_placement(net) {
            continue;
        }
        let n = nl.net(net);
        let driver = nl.pin_block(n.driver);
        for (i, &sink) in n.sinks.iter().enumerate() {
            let sink_block = nl.pin_block(sink);
            let other = if driver == block {
                sink_block
            } else if sink_block == block {
                driver
            } else {
                continue;
            };
            if other == block {
                continue;
            }
            let weight = ctx.timing.map_or(1.0, |t| t.criticality(net, i));
            neighbours.push((other, weight));
        }
    }
    if neighbours.is_empty() {
        return None;
    }
    let total: f64 = neighbours.iter().map(|&(_, w)| w).sum();
    let uniform = total <= f64::EPSILON;
    let (mut sx, mut sy, mut sw) = (0.0, 0.0, 0.0);
    for &(other, w) in &neighbours {
        let w = if uniform { 1.0 } else { w };
        let loc = ctx.locations.loc(other);
        sx += w * f64::from(loc.x);
        sy += w * f64::from(loc.y);
        sw += w;
    }
    let layer = ctx.locations.loc(block).layer;
    Some(Loc::new((sx / sw).round() as i32, (sy / sw).round() as i32, layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::tests::fixture;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn centroid_of_neighbours() {
        let f = fixture();
        // b0 drives b1 at (1, 0) and m0 at (2, 2).
        let c = connection_centroid(&f.ctx(), BlockId::from_raw(0)).unwrap();
        assert_eq!(c, Loc::new(2, 1, 0));
    }

    #[test]
    fn window_is_centred_on_the_centroid() {
        let f = fixture();
        let b0 = BlockId::from_raw(0);
        let only_b0 = [b0];
        let ctx = MoveContext {
            movable: &only_b0,
            ..f.ctx()
        };
        let mut generator = CentroidMoveGenerator;
        let mut affected = BlocksAffected::default();
        let mut left_start_window = false;
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            affected.clear();
            if generator.propose(&ctx, 1.0, &mut rng, &mut affected) == MoveOutcome::Abort {
                continue;
            }
            // b0 sits at (0, 0); its centroid is (2, 1).
            let to = affected.new_loc_of(b0).unwrap();
            assert!((to.x - 2).abs() <= 1 && (to.y - 1).abs() <= 1, "{to:?}");
            left_start_window |= to.x > 1 || to.y > 1;
        }
        assert!(left_start_window);
    }

    #[test]
    fn unconnected_block_has_no_centroid() {
        let f = fixture();
        assert!(connection_centroid(&f.ctx(), BlockId::from_raw(5)).is_none());
    }
}
