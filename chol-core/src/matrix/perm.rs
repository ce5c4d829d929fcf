//! Permutation matrices.
//!
//! A permutation of order n is held bidirectionally: `row[i] = j` means
//! position `i` of the permuted object maps to original index `j`, and
//! `col` is the inverse (`col[row[i]] == i` always). Holding both
//! directions makes inversion O(1) and lets matrix application relink
//! row/column heads without ever moving element payloads.

use super::SparseMatrix;
use crate::error::{Error, Result};

/// A bijection on `{0..n}` stored as mutually inverse forward/backward
/// arrays.
#[derive(Clone, Debug)]
pub struct Permutation {
    /// Forward direction: `row[i]` = original index at permuted position i.
    row: Vec<usize>,
    /// Backward direction: `col[j]` = permuted position of original index j.
    col: Vec<usize>,
}

impl Permutation {
    /// Identity permutation of order `n`.
    pub fn identity(n: usize) -> Self {
        Self {
            row: (0..n).collect(),
            col: (0..n).collect(),
        }
    }

    /// Build from a forward array: `order[i]` is the original index placed
    /// at position `i`. Fails unless `order` is a bijection on `0..n`.
    pub fn from_order(order: Vec<usize>) -> Result<Self> {
        let n = order.len();
        let mut col = vec![usize::MAX; n];
        for (i, &j) in order.iter().enumerate() {
            if j >= n {
                return Err(Error::InvalidPermutation { reason: "index out of range" });
            }
            if col[j] != usize::MAX {
                return Err(Error::InvalidPermutation { reason: "index repeated" });
            }
            col[j] = i;
        }
        Ok(Self { row: order, col })
    }

    /// Order of the permutation.
    pub fn order(&self) -> usize {
        self.row.len()
    }

    /// Original index mapped to permuted position `i`.
    pub fn image(&self, i: usize) -> usize {
        self.row[i]
    }

    /// Permuted position of original index `j`.
    pub fn preimage(&self, j: usize) -> usize {
        self.col[j]
    }

    /// Reset to the identity.
    pub fn reset(&mut self) {
        for (i, r) in self.row.iter_mut().enumerate() {
            *r = i;
        }
        self.col.copy_from_slice(&self.row);
    }

    /// Invert in place, O(1): the two direction arrays swap roles.
    pub fn invert(&mut self) {
        std::mem::swap(&mut self.row, &mut self.col);
    }

    /// y := P·x, i.e. `y[i] = x[row[i]]`.
    pub fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        let n = self.order();
        if x.len() != n {
            return Err(Error::DimensionMismatch { expected: n, actual: x.len() });
        }
        if y.len() != n {
            return Err(Error::DimensionMismatch { expected: n, actual: y.len() });
        }
        for (yi, &r) in y.iter_mut().zip(&self.row) {
            *yi = x[r];
        }
        Ok(())
    }

    /// y := P'·x, i.e. `y[j] = x[col[j]]`.
    pub fn apply_inverse(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        let n = self.order();
        if x.len() != n {
            return Err(Error::DimensionMismatch { expected: n, actual: x.len() });
        }
        if y.len() != n {
            return Err(Error::DimensionMismatch { expected: n, actual: y.len() });
        }
        for (yj, &c) in y.iter_mut().zip(&self.col) {
            *yj = x[c];
        }
        Ok(())
    }

    /// A := P·A. O(nnz): row heads are relinked and row indices relabeled;
    /// no element payload moves.
    pub fn permute_rows(&self, a: &mut SparseMatrix) -> Result<()> {
        if a.m != self.order() {
            return Err(Error::DimensionMismatch { expected: self.order(), actual: a.m });
        }
        let old: Vec<Option<usize>> = a.rows.clone();
        for i in 0..a.m {
            a.rows[i] = old[self.row[i]];
            let mut cur = a.rows[i];
            while let Some(idx) = cur {
                a.entries[idx].row = i;
                cur = a.entries[idx].next_row;
            }
        }
        Ok(())
    }

    /// A := A·P. O(nnz), by relinking column heads.
    pub fn permute_cols(&self, a: &mut SparseMatrix) -> Result<()> {
        if a.n != self.order() {
            return Err(Error::DimensionMismatch { expected: self.order(), actual: a.n });
        }
        let old: Vec<Option<usize>> = a.cols.clone();
        for j in 0..a.n {
            a.cols[j] = old[self.col[j]];
            let mut cur = a.cols[j];
            while let Some(idx) = cur {
                a.entries[idx].col = j;
                cur = a.entries[idx].next_col;
            }
        }
        Ok(())
    }

    /// A := P·A·P' for a symmetric matrix stored upper-triangle-only.
    ///
    /// After the row and column relinking, some elements land in the lower
    /// triangle; those are re-folded to the symmetric upper-triangle
    /// position and both lists are rebuilt, so on exit the matrix again
    /// stores the upper triangle only.
    pub fn apply_symmetric(&self, a: &mut SparseMatrix) -> Result<()> {
        if a.m != a.n {
            return Err(Error::NotSquare { rows: a.m, cols: a.n });
        }
        if a.m != self.order() {
            return Err(Error::DimensionMismatch { expected: self.order(), actual: a.m });
        }
        // P·A·P' as if A were a general matrix; A·P' places original
        // column row[j] at position j.
        self.permute_rows(a)?;
        let old: Vec<Option<usize>> = a.cols.clone();
        for j in 0..a.n {
            a.cols[j] = old[self.row[j]];
            let mut cur = a.cols[j];
            while let Some(idx) = cur {
                a.entries[idx].col = j;
                cur = a.entries[idx].next_col;
            }
        }
        // Fold sub-diagonal elements back into the upper triangle while
        // rebuilding the column lists from the (still valid) row lists.
        a.cols.iter_mut().for_each(|h| *h = None);
        for i in 0..a.m {
            let mut cur = a.rows[i];
            while let Some(idx) = cur {
                cur = a.entries[idx].next_row;
                let e = &mut a.entries[idx];
                if e.row > e.col {
                    std::mem::swap(&mut e.row, &mut e.col);
                }
                let j = e.col;
                a.entries[idx].next_col = a.cols[j];
                a.cols[j] = Some(idx);
            }
        }
        // Row labels moved under us; rebuild the row lists from the columns.
        a.rows.iter_mut().for_each(|h| *h = None);
        for j in 0..a.n {
            let mut cur = a.cols[j];
            while let Some(idx) = cur {
                cur = a.entries[idx].next_col;
                let i = a.entries[idx].row;
                a.entries[idx].next_row = a.rows[i];
                a.rows[i] = Some(idx);
            }
        }
        Ok(())
    }

    /// Validate that the two direction arrays are mutually inverse
    /// bijections: `col[row[i]] == i` for all i.
    pub fn check(&self) -> Result<()> {
        if self.row.len() != self.col.len() {
            return Err(Error::InvalidPermutation { reason: "direction arrays differ in length" });
        }
        let n = self.order();
        for i in 0..n {
            if self.row[i] >= n || self.col[self.row[i]] != i {
                return Err(Error::InvalidPermutation { reason: "directions are not mutually inverse" });
            }
        }
        Ok(())
    }
}
