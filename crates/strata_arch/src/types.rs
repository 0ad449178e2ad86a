//! Locations, site types and block types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete location on the device: column, row and die layer.
///
/// Coordinates are signed so that macro offsets and range windows can be
/// computed without underflow; a location outside the grid is simply not
/// [`in_bounds`](crate::DeviceGrid::in_bounds).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Loc {
    /// Column, 0-based from the left edge.
    pub x: i32,
    /// Row, 0-based from the bottom edge.
    pub y: i32,
    /// Die layer, 0-based.
    pub layer: i32,
}

impl Loc {
    /// Creates a location.
    pub const fn new(x: i32, y: i32, layer: i32) -> Self {
        Self { x, y, layer }
    }

    /// Returns this location shifted by `offset`.
    pub fn offset(self, offset: LocOffset) -> Self {
        Self {
            x: self.x + offset.dx,
            y: self.y + offset.dy,
            layer: self.layer + offset.dlayer,
        }
    }

    /// Returns the offset that moves `from` onto `self`.
    pub fn offset_from(self, from: Loc) -> LocOffset {
        LocOffset {
            dx: self.x - from.x,
            dy: self.y - from.y,
            dlayer: self.layer - from.layer,
        }
    }

    /// Manhattan distance in the x/y plane.
    pub fn manhattan(self, other: Loc) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.layer)
    }
}

/// A relative displacement between two locations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct LocOffset {
    /// Column displacement.
    pub dx: i32,
    /// Row displacement.
    pub dy: i32,
    /// Layer displacement.
    pub dlayer: i32,
}

impl LocOffset {
    /// The zero offset.
    pub const ZERO: Self = Self {
        dx: 0,
        dy: 0,
        dlayer: 0,
    };

    /// Creates an offset.
    pub const fn new(dx: i32, dy: i32, dlayer: i32) -> Self {
        Self { dx, dy, dlayer }
    }
}

/// The kind of placement site at a grid location.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SiteType {
    /// A configurable logic block site.
    Logic,
    /// A block RAM site.
    Bram,
    /// A DSP site.
    Dsp,
    /// An I/O pad site.
    Io,
    /// A hard network-on-chip router site.
    NocRouter,
    /// No placement resource.
    Empty,
}

/// The type of a netlist block, which constrains where it may be placed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum BlockType {
    /// A clustered logic block (LUTs, flip-flops, carry logic).
    Clb,
    /// A block RAM.
    Bram,
    /// A DSP multiplier block.
    Dsp,
    /// An I/O block.
    Io,
    /// A NoC router instance.
    NocRouter,
}

impl BlockType {
    /// Every block type, in index order.
    pub const ALL: [BlockType; 5] = [
        BlockType::Clb,
        BlockType::Bram,
        BlockType::Dsp,
        BlockType::Io,
        BlockType::NocRouter,
    ];

    /// Dense index of this block type, matching [`BlockType::ALL`].
    pub fn index(self) -> usize {
        match self {
            BlockType::Clb => 0,
            BlockType::Bram => 1,
            BlockType::Dsp => 2,
            BlockType::Io => 3,
            BlockType::NocRouter => 4,
        }
    }

    /// The site type this block type can be placed on.
    pub fn site_type(self) -> SiteType {
        match self {
            BlockType::Clb => SiteType::Logic,
            BlockType::Bram => SiteType::Bram,
            BlockType::Dsp => SiteType::Dsp,
            BlockType::Io => SiteType::Io,
            BlockType::NocRouter => SiteType::NocRouter,
        }
    }

    /// Returns whether this block type may occupy a site of `site`.
    pub fn fits(self, site: SiteType) -> bool {
        self.site_type() == site
    }
}
