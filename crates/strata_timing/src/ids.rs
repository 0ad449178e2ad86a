//! Opaque ID newtypes for timing graph entities.
//!
//! [`TimingNodeId`] and [`TimingEdgeId`] are thin `u32` wrappers used as arena
//! indices into the timing graph.

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
    };
}

define_id!(
    /// Opaque, copyable ID for a node in the timing graph.
    TimingNodeId
);

define_id!(
    /// Opaque, copyable ID for an edge in the timing graph.
    TimingEdgeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrip() {
        assert_eq!(TimingNodeId::from_raw(42).as_raw(), 42);
        assert_eq!(TimingEdgeId::from_raw(9).index(), 9);
    }

    #[test]
    fn ids_order_by_index() {
        assert!(TimingNodeId::from_raw(1) < TimingNodeId::from_raw(2));
    }

    #[test]
    fn serde_roundtrip() {
        let id = TimingEdgeId::from_raw(55);
        let json = serde_json::to_string(&id).unwrap();
        let restored: TimingEdgeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
