//! Moves across die layers.

use super::{
    moving_unit, pick_block, propose_relocation, window, BlocksAffected, MoveContext,
    MoveGenerator, MoveOutcome,
};
use rand::{Rng, RngCore};
use strata_arch::Loc;
use strata_config::MoveGeneratorKind;

/// Moves a random block to a legal site on a different layer, within the
/// range limit of its current column and row.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterLayerMoveGenerator;

impl MoveGenerator for InterLayerMoveGenerator {
    fn kind(&self) -> MoveGeneratorKind {
        MoveGeneratorKind::InterLayer
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
        let (head, block_type) = moving_unit(ctx, block);
        let from = ctx.locations.loc(head);
        let compressed = ctx.compressed.get(block_type);
        let layers: Vec<i32> = compressed
            .populated_layers()
            .into_iter()
            .filter(|&l| l != from.layer)
            .collect();
        if layers.is_empty() {
            return MoveOutcome::Abort;
        }
        let layer = layers[rng.gen_range(0..layers.len())];
        let center = Loc::new(from.x, from.y, layer);
        let Some(to) = compressed.sample_in_window(layer, center, window(rlim), rng) else {
            return MoveOutcome::Abort;
        };
        propose_relocation(ctx, head, to, affected)
    }
}
