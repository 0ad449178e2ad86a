//! The device grid: one [`SiteType`] per `(x, y, layer)` location.

use crate::types::{BlockType, Loc, SiteType};
use serde::{Deserialize, Serialize};
use strata_common::{InternalError, StrataResult};

/// A rectangular, possibly multi-layer device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceGrid {
    width: i32,
    height: i32,
    layers: i32,
    /// Row-major per layer: `sites[(layer * height + y) * width + x]`.
    sites: Vec<SiteType>,
}

impl DeviceGrid {
    /// Creates a grid where every location holds `fill`.
    pub fn new(width: i32, height: i32, layers: i32, fill: SiteType) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let layers = layers.max(0);
        let count = (width as usize) * (height as usize) * (layers as usize);
        Self {
            width,
            height,
            layers,
            sites: vec![fill; count],
        }
    }

    /// Builds a grid from explicit site rows, indexed `layers[layer][y][x]`.
    ///
    /// Every layer must have the same number of rows and every row the same
    /// number of columns.
    pub fn from_layers(layers: Vec<Vec<Vec<SiteType>>>) -> StrataResult<Self> {
        let layer_count = layers.len();
        let height = layers.first().map_or(0, Vec::len);
        let width = layers
            .first()
            .and_then(|rows| rows.first())
            .map_or(0, Vec::len);
        let mut sites = Vec::with_capacity(layer_count * height * width);
        for (l, rows) in layers.into_iter().enumerate() {
            if rows.len() != height {
                return Err(InternalError::new(format!(
                    "layer {l} has {} rows, expected {height}",
                    rows.len()
                )));
            }
            for (y, row) in rows.into_iter().enumerate() {
                if row.len() != width {
                    return Err(InternalError::new(format!(
                        "layer {l} row {y} has {} columns, expected {width}",
                        row.len()
                    )));
                }
                sites.extend(row);
            }
        }
        Ok(Self {
            width: width as i32,
            height: height as i32,
            layers: layer_count as i32,
            sites,
        })
    }

    /// An island-style fabric: an I/O ring with empty corners, a BRAM column
    /// every 8 columns, a DSP column every 12 columns, and logic elsewhere.
    /// Every layer is identical.
    pub fn island_style(width: i32, height: i32, layers: i32) -> Self {
        let mut grid = Self::new(width, height, layers, SiteType::Logic);
        for layer in 0..grid.layers {
            for y in 0..grid.height {
                for x in 0..grid.width {
                    let on_x_edge = x == 0 || x == grid.width - 1;
                    let on_y_edge = y == 0 || y == grid.height - 1;
                    let site = if on_x_edge && on_y_edge {
                        SiteType::Empty
                    } else if on_x_edge || on_y_edge {
                        SiteType::Io
                    } else if x % 12 == 6 {
                        SiteType::Dsp
                    } else if x % 8 == 4 {
                        SiteType::Bram
                    } else {
                        SiteType::Logic
                    };
                    grid.set_site(Loc::new(x, y, layer), site);
                }
            }
        }
        grid
    }

    /// Returns this grid with `site` installed at `loc`. Out-of-bounds
    /// locations are ignored.
    pub fn with_site(mut self, loc: Loc, site: SiteType) -> Self {
        self.set_site(loc, site);
        self
    }

    /// Overwrites the site at `loc`. Returns `false` when `loc` is outside
    /// the grid.
    pub fn set_site(&mut self, loc: Loc, site: SiteType) -> bool {
        match self.index(loc) {
            Some(i) => {
                self.sites[i] = site;
                true
            }
            None => false,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Number of die layers.
    pub fn layers(&self) -> i32 {
        self.layers
    }

    /// Returns whether `loc` lies inside the grid.
    pub fn in_bounds(&self, loc: Loc) -> bool {
        (0..self.width).contains(&loc.x)
            && (0..self.height).contains(&loc.y)
            && (0..self.layers).contains(&loc.layer)
    }

    /// The site at `loc`, or `None` outside the grid.
    pub fn site_type(&self, loc: Loc) -> Option<SiteType> {
        self.index(loc).map(|i| self.sites[i])
    }

    /// Returns whether a block of `block_type` may occupy `loc`.
    pub fn is_legal(&self, loc: Loc, block_type: BlockType) -> bool {
        self.site_type(loc)
            .is_some_and(|site| block_type.fits(site))
    }

    /// All locations legal for `block_type`, in layer, row, column order.
    pub fn sites_for(&self, block_type: BlockType) -> Vec<Loc> {
        self.locations()
            .filter(|&loc| self.is_legal(loc, block_type))
            .collect()
    }

    /// Number of locations legal for `block_type`.
    pub fn capacity_for(&self, block_type: BlockType) -> usize {
        let wanted = block_type.site_type();
        self.sites.iter().filter(|&&s| s == wanted).count()
    }

    /// Iterates every location of the grid.
    pub fn locations(&self) -> impl Iterator<Item = Loc> + '_ {
        (0..self.layers).flat_map(move |layer| {
            (0..self.height)
                .flat_map(move |y| (0..self.width).map(move |x| Loc::new(x, y, layer)))
        })
    }

    /// Clamps `loc` into the grid on every axis.
    pub fn clamp(&self, loc: Loc) -> Loc {
        Loc::new(
            loc.x.clamp(0, (self.width - 1).max(0)),
            loc.y.clamp(0, (self.height - 1).max(0)),
            loc.layer.clamp(0, (self.layers - 1).max(0)),
        )
    }

    fn index(&self, loc: Loc) -> Option<usize> {
        if !self.in_bounds(loc) {
            return None;
        }
        let (w, h) = (self.width as usize, self.height as usize);
        Some((loc.layer as usize * h + loc.y as usize) * w + loc.x as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn island_style_layout() {
        let g = DeviceGrid::island_style(20, 10, 1);
        assert_eq!(g.site_type(Loc::new(0, 0, 0)), Some(SiteType::Empty));
        assert_eq!(g.site_type(Loc::new(0, 3, 0)), Some(SiteType::Io));
        assert_eq!(g.site_type(Loc::new(5, 9, 0)), Some(SiteType::Io));
        assert_eq!(g.site_type(Loc::new(4, 3, 0)), Some(SiteType::Bram));
        assert_eq!(g.site_type(Loc::new(6, 3, 0)), Some(SiteType::Dsp));
        assert_eq!(g.site_type(Loc::new(1, 1, 0)), Some(SiteType::Logic));
        assert_eq!(g.site_type(Loc::new(20, 1, 0)), None);
    }

    #[test]
    fn legality_and_capacity() {
        let g = DeviceGrid::new(3, 3, 1, SiteType::Logic)
            .with_site(Loc::new(1, 1, 0), SiteType::NocRouter);
        assert!(g.is_legal(Loc::new(1, 1, 0), BlockType::NocRouter));
        assert!(!g.is_legal(Loc::new(1, 1, 0), BlockType::Clb));
        assert_eq!(g.capacity_for(BlockType::Clb), 8);
        assert_eq!(g.sites_for(BlockType::NocRouter), vec![Loc::new(1, 1, 0)]);
        assert!(!g.is_legal(Loc::new(-1, 0, 0), BlockType::Clb));
    }

    #[test]
    fn from_layers_rejects_ragged_rows() {
        let rows = vec![vec![
            vec![SiteType::Logic, SiteType::Logic],
            vec![SiteType::Logic],
        ]];
        assert!(DeviceGrid::from_layers(rows).is_err());
    }

    #[test]
    fn from_layers_indexes_by_layer_row_column() {
        let layers = vec![
            vec![vec![SiteType::Logic, SiteType::Io]],
            vec![vec![SiteType::Dsp, SiteType::Empty]],
        ];
        let g = DeviceGrid::from_layers(layers).unwrap();
        assert_eq!((g.width(), g.height(), g.layers()), (2, 1, 2));
        assert_eq!(g.site_type(Loc::new(1, 0, 0)), Some(SiteType::Io));
        assert_eq!(g.site_type(Loc::new(0, 0, 1)), Some(SiteType::Dsp));
    }

    #[test]
    fn locations_cover_grid() {
        let g = DeviceGrid::new(4, 3, 2, SiteType::Logic);
        assert_eq!(g.locations().count(), 24);
    }

    #[test]
    fn clamp_into_bounds() {
        let g = DeviceGrid::new(4, 3, 1, SiteType::Logic);
        assert_eq!(g.clamp(Loc::new(-3, 9, 2)), Loc::new(0, 2, 0));
    }
}
