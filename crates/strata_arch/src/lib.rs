//! Device grid model consumed by the Strata placer.
//!
//! The placer never parses architecture files; it receives a [`DeviceGrid`]
//! describing which [`SiteType`] sits at every `(x, y, layer)` location and
//! asks it whether a [`BlockType`] may legally occupy a location. The
//! [`CompressedGrid`] index built from a grid lets move generators sample
//! legal targets inside a range limit without scanning the whole device.
//!
//! ```
//! use strata_arch::{BlockType, DeviceGrid, Loc};
//!
//! let grid = DeviceGrid::island_style(12, 12, 1);
//! assert!(grid.is_legal(Loc::new(0, 5, 0), BlockType::Io));
//! assert!(grid.is_legal(Loc::new(1, 1, 0), BlockType::Clb));
//! assert!(!grid.is_legal(Loc::new(0, 0, 0), BlockType::Clb));
//! ```

#![warn(missing_docs)]

pub mod compressed;
pub mod grid;
pub mod types;

pub use compressed::{CompressedGrid, CompressedGrids};
pub use grid::DeviceGrid;
pub use types::{BlockType, Loc, LocOffset, SiteType};
