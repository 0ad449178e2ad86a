//! Error types for placement runs.

use strata_arch::Loc;
use strata_common::InternalError;
use strata_config::ConfigError;

/// The result type of fallible placement operations.
pub type PlaceResult<T> = Result<T, PlaceError>;

/// Errors that abort a placement run.
///
/// Illegal move proposals are not errors; generators report them as
/// [`MoveOutcome::Abort`](crate::moves::MoveOutcome::Abort).
#[derive(Debug, thiserror::Error)]
pub enum PlaceError {
    /// The analytical system or its solution contains non-finite values.
    #[error("analytical solver diverged: {reason}")]
    NumericalDivergence {
        /// Where the non-finite value was found.
        reason: String,
    },

    /// Conjugate gradient hit its iteration cap above tolerance.
    #[error("conjugate gradient did not converge in {iterations} iterations (residual {residual:e})")]
    SolverDidNotConverge {
        /// Iterations performed.
        iterations: usize,
        /// Relative residual at the cap.
        residual: f64,
    },

    /// A tracked cost term disagrees with its from-scratch recomputation.
    #[error("{term} cost drifted: tracked {tracked}, recomputed {recomputed}")]
    CostDrift {
        /// The cost term name.
        term: String,
        /// The incrementally tracked value.
        tracked: f64,
        /// The value recomputed from scratch.
        recomputed: f64,
    },

    /// A placement consistency check found errors.
    #[error("placement consistency check failed with {errors} error(s)")]
    ConsistencyCheckFailed {
        /// Number of errors found.
        errors: usize,
    },

    /// The NoC channel dependency graph contains a cycle.
    #[error("NoC traffic flow routes form a channel dependency cycle")]
    NocRoutingCycle,

    /// A traffic flow has no route between its routers.
    #[error("no NoC route for traffic flow from `{source_block}` to `{sink_block}`")]
    NocUnroutable {
        /// Name of the flow's source block.
        source_block: String,
        /// Name of the flow's sink block.
        sink_block: String,
    },

    /// No free legal site exists for a block.
    #[error("no legal site available for block `{block}`")]
    NoLegalSite {
        /// Name of the block.
        block: String,
    },

    /// A fixed block's location is illegal or already taken.
    #[error("fixed block `{block}` cannot be placed at {loc}")]
    IllegalFixedLocation {
        /// Name of the block.
        block: String,
        /// The requested location.
        loc: Loc,
    },

    /// A macro definition is malformed.
    #[error("invalid placement macro: {reason}")]
    InvalidMacro {
        /// What is wrong with the macro.
        reason: String,
    },

    /// A checkpoint artifact could not be written or read.
    #[error("checkpoint error: {reason}")]
    Checkpoint {
        /// Description of the failure.
        reason: String,
    },

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A collaborator data structure violates an invariant.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
