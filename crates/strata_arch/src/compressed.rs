//! Per-block-type index of legal sites.
//!
//! For each block type and layer the legal locations are stored as sorted
//! columns of sorted rows. Sampling a target inside a window is two binary
//! searches plus two random picks.

use crate::grid::DeviceGrid;
use crate::types::{BlockType, Loc};
use rand::Rng;

#[derive(Clone, Debug, Default)]
struct LayerColumns {
    xs: Vec<i32>,
    ys: Vec<Vec<i32>>,
}

impl LayerColumns {
    fn site_count(&self) -> usize {
        self.ys.iter().map(Vec::len).sum()
    }
}

/// Legal sites for one block type, compressed by column.
#[derive(Clone, Debug)]
pub struct CompressedGrid {
    block_type: BlockType,
    layers: Vec<LayerColumns>,
}

impl CompressedGrid {
    /// Indexes every site of `grid` legal for `block_type`.
    pub fn new(grid: &DeviceGrid, block_type: BlockType) -> Self {
        let mut layers = vec![LayerColumns::default(); grid.layers().max(0) as usize];
        for (layer, cols) in layers.iter_mut().enumerate() {
            for x in 0..grid.width() {
                let ys: Vec<i32> = (0..grid.height())
                    .filter(|&y| grid.is_legal(Loc::new(x, y, layer as i32), block_type))
                    .collect();
                if !ys.is_empty() {
                    cols.xs.push(x);
                    cols.ys.push(ys);
                }
            }
        }
        Self { block_type, layers }
    }

    /// The block type this index serves.
    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    /// Total number of legal sites across all layers.
    pub fn num_sites(&self) -> usize {
        self.layers.iter().map(LayerColumns::site_count).sum()
    }

    /// Returns whether `layer` holds at least one legal site.
    pub fn layer_has_sites(&self, layer: i32) -> bool {
        self.layer(layer).is_some_and(|c| !c.xs.is_empty())
    }

    /// Layers that hold at least one legal site.
    pub fn populated_layers(&self) -> Vec<i32> {
        (0..self.layers.len() as i32)
            .filter(|&l| self.layer_has_sites(l))
            .collect()
    }

    /// Picks a legal site on `layer` within `rlim` of `center` on both axes.
    ///
    /// A column is chosen uniformly among the columns in range, then a row
    /// uniformly among that column's rows in range. Columns with no rows in
    /// range are retried a bounded number of times. Returns `None` when the
    /// window holds no legal site.
    pub fn sample_in_window<R: Rng + ?Sized>(
        &self,
        layer: i32,
        center: Loc,
        rlim: i32,
        rng: &mut R,
    ) -> Option<Loc> {
        let cols = self.layer(layer)?;
        let rlim = rlim.max(0);
        let lo = cols.xs.partition_point(|&x| x < center.x - rlim);
        let hi = cols.xs.partition_point(|&x| x <= center.x + rlim);
        if lo >= hi {
            return None;
        }
        let (ymin, ymax) = (center.y - rlim, center.y + rlim);
        let attempts = (hi - lo).max(4);
        for _ in 0..attempts {
            let c = rng.gen_range(lo..hi);
            if let Some(loc) = pick_row(cols, c, ymin, ymax, layer, rng) {
                return Some(loc);
            }
        }
        // Sparse window: scan the columns in order.
        let start = rng.gen_range(lo..hi);
        (lo..hi)
            .cycle()
            .skip(start - lo)
            .take(hi - lo)
            .find_map(|c| pick_row(cols, c, ymin, ymax, layer, rng))
    }

    /// The legal site on `layer` closest to `target` by Manhattan distance,
    /// ties broken by lowest column then row.
    pub fn nearest(&self, layer: i32, target: Loc) -> Option<Loc> {
        let cols = self.layer(layer)?;
        cols.xs
            .iter()
            .zip(&cols.ys)
            .flat_map(|(&x, ys)| ys.iter().map(move |&y| Loc::new(x, y, layer)))
            .min_by_key(|loc| (loc.manhattan(target), loc.x, loc.y))
    }

    /// Iterates every legal site on every layer.
    pub fn sites(&self) -> impl Iterator<Item = Loc> + '_ {
        self.layers.iter().enumerate().flat_map(|(layer, cols)| {
            cols.xs.iter().zip(&cols.ys).flat_map(move |(&x, ys)| {
                ys.iter().map(move |&y| Loc::new(x, y, layer as i32))
            })
        })
    }

    fn layer(&self, layer: i32) -> Option<&LayerColumns> {
        usize::try_from(layer).ok().and_then(|l| self.layers.get(l))
    }
}

fn pick_row<R: Rng + ?Sized>(
    cols: &LayerColumns,
    c: usize,
    ymin: i32,
    ymax: i32,
    layer: i32,
    rng: &mut R,
) -> Option<Loc> {
    let ys = &cols.ys[c];
    let lo = ys.partition_point(|&y| y < ymin);
    let hi = ys.partition_point(|&y| y <= ymax);
    if lo >= hi {
        return None;
    }
    Some(Loc::new(cols.xs[c], ys[rng.gen_range(lo..hi)], layer))
}

/// One [`CompressedGrid`] per block type.
#[derive(Clone, Debug)]
pub struct CompressedGrids {
    grids: Vec<CompressedGrid>,
}

impl CompressedGrids {
    /// Builds the index for every block type.
    pub fn new(grid: &DeviceGrid) -> Self {
        Self {
            grids: BlockType::ALL
                .iter()
                .map(|&ty| CompressedGrid::new(grid, ty))
                .collect(),
        }
    }

    /// The index for `block_type`.
    pub fn get(&self, block_type: BlockType) -> &CompressedGrid {
        &self.grids[block_type.index()]
    }
}
