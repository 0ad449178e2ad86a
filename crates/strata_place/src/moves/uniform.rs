//! Uniform random moves on the block's own layer.

use super::{
    moving_unit, pick_block, propose_relocation, window, BlocksAffected, MoveContext,
    MoveGenerator, MoveOutcome,
};
use crate::ids::BlockId;
use rand::RngCore;
use strata_config::MoveGeneratorKind;

/// Moves a random block to a random legal site within the range limit.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformMoveGenerator;

impl MoveGenerator for UniformMoveGenerator {
    fn kind(&self) -> MoveGeneratorKind {
        MoveGeneratorKind::Uniform
    }

    fn propose(
        &mut self,
        ctx: &MoveContext<'_>,
        rlim: f64,
        rng: &mut dyn RngCore,
        affected: &mut BlocksAffected,
    ) -> MoveOutcome {
        match pick_block(ctx, rng) {
            Some(block) => uniform_move(ctx, block, rlim, rng, affected),
            None => MoveOutcome::Abort,
        }
    }
}

/// Moves `block` (or its macro) to a uniformly sampled site on the same
/// layer within `rlim` of its current location.
pub(crate) fn uniform_move(
    ctx: &MoveContext<'_>,
    block: BlockId,
    rlim: f64,
    rng: &mut dyn RngCore,
    affected: &mut BlocksAffected,
) -> MoveOutcome {
    let (head, block_type) = moving_unit(ctx, block);
    let from = ctx.locations.loc(head);
    let Some(to) = ctx
        .compressed
        .get(block_type)
        .sample_in_window(from.layer, from, window(rlim), rng)
    else {
        return MoveOutcome::Abort;
    };
    propose_relocation(ctx, head, to, affected)
}
