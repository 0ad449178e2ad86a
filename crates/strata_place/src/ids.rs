//! Opaque ID newtypes for placement entities.
//!
//! [`BlockId`], [`NetId`], [`PinId`] and [`MacroId`] are thin `u32` wrappers
//! used as arena indices into the placement netlist and macro registry; the
//! NoC IDs index the router topology and traffic description.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the index as a `usize` for arena lookups.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a block in the placement netlist.
    BlockId
);

define_id!(
    /// Opaque, copyable ID for a net in the placement netlist.
    NetId
);

define_id!(
    /// Opaque, copyable ID for a pin in the placement netlist.
    PinId
);

define_id!(
    /// Opaque, copyable ID for a placement macro.
    MacroId
);

define_id!(
    /// Opaque, copyable ID for a NoC router.
    RouterId
);

define_id!(
    /// Opaque, copyable ID for a directed NoC link.
    LinkId
);

define_id!(
    /// Opaque, copyable ID for a NoC traffic flow.
    FlowId
);
