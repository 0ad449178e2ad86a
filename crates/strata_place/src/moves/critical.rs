//! Uniform moves of blocks on highly critical connections.

use super::uniform::uniform_move;
use super::{BlocksAffected, MoveContext, MoveGenerator, MoveOutcome};
use rand::{Rng, RngCore};
use strata_config::MoveGeneratorKind;

/// Picks the driver or sink of a connection whose criticality exceeds the
/// configured limit and moves it uniformly within the range limit.
///
/// Aborts when no connection is critical enough (including bounding-box
/// runs, which have no criticalities).
#[derive(Debug, Default, Clone, Copy)]
pub struct CriticalUniformMoveGenerator;

impl MoveGenerator for CriticalUniformMoveGenerator {
    fn kind(&self) -> MoveGeneratorKind {
        MoveGeneratorKind::CriticalUniform
    }

    fn propose(
        &mut self,
        ctx: &MoveContext<'_>,
        rlim: f64,
        rng: &mut dyn RngCore,
        affected: &mut BlocksAffected,
    ) -> MoveOutcome {
        let Some(timing) = ctx.timing else {
            return MoveOutcome::Abort;
        };
        let critical = timing.highly_critical();
        if critical.is_empty() {
            return MoveOutcome::Abort;
        }
        let (net, sink) = critical[rng.gen_range(0..critical.len())];
        let n = ctx.netlist.net(net);
        let pin = if rng.gen_bool(0.5) { n.driver } else { n.sinks[sink] };
        let block = ctx.netlist.pin_block(pin);
        if ctx.movable.binary_search(&block).is_err() {
            return MoveOutcome::Abort;
        }
        uniform_move(ctx, block, rlim, rng, affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::tests::fixture;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn aborts_without_timing() {
        let f = fixture();
        let mut rng = StdRng::seed_from_u64(5);
        let mut affected = BlocksAffected::default();
        let out = CriticalUniformMoveGenerator.propose(&f.ctx(), 3.0, &mut rng, &mut affected);
        assert_eq!(out, MoveOutcome::Abort);
    }
}
