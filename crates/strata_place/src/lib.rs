//! Placement engine for the Strata FPGA flow.
//!
//! This crate assigns every block of a [`PlaceNetlist`] to a legal site of a
//! [`DeviceGrid`](strata_arch::DeviceGrid), minimizing a weighted
//! combination of wirelength, timing and (optionally) network-on-chip cost.
//!
//! # Pipeline
//!
//! 1. **Initial placement**: given locations, a checkpoint, or random legal
//!    placement with fixed blocks and macros honoured
//! 2. **Analytical pre-pass** (optional): quadratic wirelength minimization
//!    with pseudo-anchors, solved by conjugate gradient, then legalized
//! 3. **Cost initialization**: bounding-box, timing (through the timing
//!    bridge and static timing analysis) and NoC terms with normalization
//! 4. **Annealing**: propose, evaluate incrementally, accept with the
//!    Metropolis criterion, commit or revert
//! 5. **Verification**: legality and from-scratch cost recomputation
//!
//! # Usage
//!
//! ```ignore
//! use strata_place::{InitialPlacement, Placer, PlacerInputs};
//!
//! let inputs = PlacerInputs { netlist: &netlist, grid: &grid, macros: &macros,
//!     delay_model: &delay_model, noc: None };
//! let placer = Placer::new(inputs, config, InitialPlacement::Random, &sink)?;
//! let outcome = placer.place()?;
//! println!("final cost {}", outcome.report.cost);
//! ```

#![warn(missing_docs)]

pub mod analytical;
pub mod anneal;
pub mod checkpoint;
pub mod cost;
pub mod error;
pub mod ids;
pub mod initial;
pub mod macros;
pub mod moves;
pub mod netlist;
pub mod noc;
pub mod placer;
pub mod report;
pub mod state;
pub mod timing_bridge;
pub mod verify;

pub use analytical::{run_analytical_placement, AnalyticalSolver, PartialPlacement};
pub use anneal::{AnnealState, Annealer, SwapResult};
pub use checkpoint::PlacementCheckpoint;
pub use cost::{CostMethod, CostObjective, NocCostTerms, PlacerCosts};
pub use error::{PlaceError, PlaceResult};
pub use ids::{BlockId, FlowId, LinkId, MacroId, NetId, PinId, RouterId};
pub use initial::{random_placement, InitialPlacement};
pub use macros::{MacroRegistry, PlacementMacro};
pub use moves::{
    make_move_generator, BlocksAffected, MoveContext, MoveGenerator, MoveOutcome, MoveStats,
};
pub use netlist::{NetModel, PlaceBlock, PlaceNet, PlaceNetlist, PlacePin};
pub use noc::{NocCostHandler, NocTopology, NocTraffic, TrafficFlow};
pub use placer::{NocSetup, Placer, PlacerInputs, PlacerState};
pub use report::{CostReport, PlacementOutcome};
pub use state::BlockLocations;
pub use timing_bridge::TimingBridge;
pub use verify::verify_placement;
