//! Timing collaborators for the Strata placer.
//!
//! The placer consumes timing through two seams:
//!
//! - [`DelayModel`] estimates the delay of a connection from the locations of
//!   its driver and sink. [`ManhattanDelayModel`] is the default estimator.
//! - [`analyze_slack`] runs static timing analysis over a [`TimingGraph`]
//!   whose edge delays the placer keeps current, producing per-edge slack
//!   and the critical path delay in a [`SlackReport`].
//!
//! # Architecture
//!
//! - [`graph`]: timing nodes and delay edges
//! - [`sta`]: forward/backward propagation, slack, criticality
//! - [`delay`]: placement delay estimation

#![warn(missing_docs)]

pub mod delay;
pub mod graph;
pub mod ids;
pub mod sta;

pub use delay::{DelayModel, ManhattanDelayModel};
pub use graph::{TimingEdge, TimingEdgeType, TimingGraph, TimingNode, TimingNodeType};
pub use ids::{TimingEdgeId, TimingNodeId};
pub use sta::{analyze_slack, SlackReport};
