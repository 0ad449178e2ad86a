//! Network-on-chip cost model.
//!
//! Routers sit at fixed grid sites joined by directed links. Netlist blocks
//! of type [`NocRouter`](strata_arch::BlockType::NocRouter) exchange traffic
//! flows through whichever router their current site belongs to, so moving a
//! router block re-routes its flows.

pub mod cost;
pub mod routing;
pub mod topology;
pub mod traffic;

pub use cost::NocCostHandler;
pub use routing::route_flow;
pub use topology::{NocLink, NocRouter, NocTopology};
pub use traffic::{NocTraffic, TrafficFlow};
