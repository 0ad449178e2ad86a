//! Shared foundational types for the Strata placement workspace.
//!
//! Provides interned names for netlist entities, content hashing for
//! checkpoint artifacts, and the internal-error result type used by the
//! collaborator crates.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod result;

pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use result::{InternalError, StrataResult};
