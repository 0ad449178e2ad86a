//! Compressed sparse row matrices for the analytical system.

use rayon::prelude::*;

/// A square matrix in compressed sparse row form. Every row stores its
/// diagonal entry, even when it is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Builds an `n x n` matrix from `(row, col, value)` triplets, summing
    /// duplicates. Triplets outside the matrix are dropped.
    pub fn from_triplets(n: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut entries: Vec<(usize, usize, f64)> = triplets
            .iter()
            .copied()
            .filter(|&(r, c, _)| r < n && c < n)
            .chain((0..n).map(|i| (i, i, 0.0)))
            .collect();
        entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut row_ptr = vec![0; n + 1];
        let mut col_idx = Vec::with_capacity(entries.len());
        let mut values: Vec<f64> = Vec::with_capacity(entries.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, v) in entries {
            if last == Some((r, c)) {
                if let Some(slot) = values.last_mut() {
                    *slot += v;
                }
                continue;
            }
            last = Some((r, c));
            col_idx.push(c);
            values.push(v);
            row_ptr[r + 1] += 1;
        }
        for i in 0..n {
            row_ptr[i + 1] += row_ptr[i];
        }
        Self {
            n,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of rows (and columns).
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// The entry at `(row, col)`; zero when not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.position(row, col).map_or(0.0, |k| self.values[k])
    }

    /// Adds `value` to the diagonal entry of `row`.
    pub fn add_to_diagonal(&mut self, row: usize, value: f64) {
        if let Some(k) = self.position(row, row) {
            self.values[k] += value;
        }
    }

    /// The diagonal entries.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.get(i, i)).collect()
    }

    /// Iterates the stored `(col, value)` entries of a row.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.row_ptr[row]..self.row_ptr[row + 1];
        self.col_idx[span.clone()]
            .iter()
            .copied()
            .zip(self.values[span].iter().copied())
    }

    /// `out = self * x`, computed row-parallel.
    pub fn mul_vec(&self, x: &[f64], out: &mut [f64]) {
        out.par_iter_mut().enumerate().for_each(|(i, o)| {
            *o = self.row(i).map(|(c, v)| v * x[c]).sum();
        });
    }

    /// Whether `A[i][j]` and `A[j][i]` agree within `tolerance` everywhere.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        (0..self.n).all(|i| {
            self.row(i)
                .all(|(j, v)| (v - self.get(j, i)).abs() <= tolerance)
        })
    }

    /// Whether every diagonal entry is at least the sum of the magnitudes of
    /// the off-diagonal entries in its row. With a non-negative diagonal and
    /// symmetry this makes the matrix positive semi-definite.
    pub fn is_diagonally_dominant(&self) -> bool {
        (0..self.n).all(|i| {
            let off: f64 = self.row(i).filter(|&(j, _)| j != i).map(|(_, v)| v.abs()).sum();
            self.get(i, i) >= off - 1e-9
        })
    }

    fn position(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.n {
            return None;
        }
        let start = self.row_ptr[row];
        self.col_idx[start..self.row_ptr[row + 1]]
            .binary_search(&col)
            .ok()
            .map(|k| start + k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_summed() {
        let m = CsrMatrix::from_triplets(
            3,
            &[(0, 0, 1.0), (0, 0, 2.0), (0, 2, -1.0), (2, 0, -1.0), (5, 5, 9.0)],
        );
        assert_eq!(m.get(0, 0), 3.0);
        assert_eq!(m.get(0, 2), -1.0);
        assert_eq!(m.get(1, 2), 0.0);
        // Three diagonals plus the two off-diagonal entries.
        assert_eq!(m.nnz(), 5);
        assert!(m.is_symmetric(0.0));
    }

    #[test]
    fn multiply_and_diagonal() {
        let mut m = CsrMatrix::from_triplets(2, &[(0, 0, 2.0), (0, 1, -1.0), (1, 0, -1.0)]);
        m.add_to_diagonal(1, 3.0);
        assert_eq!(m.diagonal(), vec![2.0, 3.0]);
        let mut out = vec![0.0; 2];
        m.mul_vec(&[1.0, 2.0], &mut out);
        assert_eq!(out, vec![0.0, 5.0]);
        assert!(m.is_diagonally_dominant());
    }

    #[test]
    fn asymmetry_detected() {
        let m = CsrMatrix::from_triplets(2, &[(0, 1, -1.0)]);
        assert!(!m.is_symmetric(1e-12));
        assert!(!m.is_diagonally_dominant());
    }
}
