//! Sparse matrix container with dual row/column linkage.
//!
//! The matrix is the foundation of the factorization core. Every element
//! carries its `(row, col, value)` triple and is threaded on exactly two
//! intrusive singly-linked lists: the list of its row and the list of its
//! column. Row traversal costs O(row length), column traversal O(column
//! length), and the same element object is visible from both views, so a
//! routine may read one view and mutate through the other.
//!
//! Elements live in a single arena (`Vec<Entry>`); the lists are index
//! links into that arena, never pointers. This keeps the deliberately
//! non-tree aliasing (one element, two lists) away from ownership: only the
//! arena owns elements. Freed slots go on a free stack and are reused by
//! the next insertion; [`SparseMatrix::clear`] truncates the arena in O(1),
//! which matters to symbolic algorithms that rebuild matrices once per
//! elimination step.
//!
//! Insertion performs no duplicate detection. A matrix may therefore hold
//! explicit zeros and *multiplets* (several elements with the same
//! `(row, col)`); the symbolic phases rely on creating these cheaply.
//! [`SparseMatrix::sum_duplicates`] collapses them afterwards.

mod perm;
mod product;

pub use perm::Permutation;
pub use product::{adat_numeric, adat_symbolic};

use crate::error::{Error, Result};
use std::ops::Range;

/// One stored element of a sparse matrix.
///
/// `next_row` / `next_col` are arena indices forming the intrusive row and
/// column lists.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Entry {
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) val: f64,
    pub(crate) next_row: Option<usize>,
    pub(crate) next_col: Option<usize>,
}

/// Sparse m×n matrix over `f64` with dual row/column element lists.
pub struct SparseMatrix {
    pub(crate) m: usize,
    pub(crate) n: usize,
    /// Element arena; slots listed in `free` are dead.
    pub(crate) entries: Vec<Entry>,
    /// Head of each row list.
    pub(crate) rows: Vec<Option<usize>>,
    /// Head of each column list.
    pub(crate) cols: Vec<Option<usize>>,
    /// Reusable dead slots (pool semantics: cleared wholesale, reused one
    /// at a time).
    free: Vec<usize>,
    /// Live element count, explicit zeros and multiplets included.
    len: usize,
}

impl SparseMatrix {
    /// Create an empty `m`×`n` matrix.
    pub fn new(m: usize, n: usize) -> Self {
        Self {
            m,
            n,
            entries: Vec::new(),
            rows: vec![None; m],
            cols: vec![None; n],
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.m
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.n
    }

    /// Number of stored elements, counting explicit zeros and multiplets.
    pub fn nnz(&self) -> usize {
        self.len
    }

    /// Number of stored elements in row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn row_nnz(&self, i: usize) -> usize {
        assert!(i < self.m, "row {} out of range for {}x{} matrix", i, self.m, self.n);
        self.iter_row(i).count()
    }

    /// Number of stored elements in column `j`.
    ///
    /// # Panics
    ///
    /// Panics if `j` is out of range.
    pub fn col_nnz(&self, j: usize) -> usize {
        assert!(j < self.n, "column {} out of range for {}x{} matrix", j, self.m, self.n);
        self.iter_col(j).count()
    }

    /// Insert a new element at `(i, j)` with value `val`.
    ///
    /// O(1): the element is pushed on the front of both its row list and
    /// its column list. No check for an existing element at `(i, j)` is
    /// made; inserting twice creates a multiplet (see
    /// [`sum_duplicates`](Self::sum_duplicates)).
    pub fn insert(&mut self, i: usize, j: usize, val: f64) -> Result<()> {
        if i >= self.m || j >= self.n {
            return Err(Error::IndexOutOfRange {
                row: i,
                col: j,
                rows: self.m,
                cols: self.n,
            });
        }
        self.push_entry(i, j, val);
        Ok(())
    }

    /// Insertion with bounds already established by the caller.
    pub(crate) fn push_entry(&mut self, i: usize, j: usize, val: f64) -> usize {
        debug_assert!(i < self.m && j < self.n);
        let entry = Entry {
            row: i,
            col: j,
            val,
            next_row: self.rows[i],
            next_col: self.cols[j],
        };
        let idx = match self.free.pop() {
            Some(slot) => {
                self.entries[slot] = entry;
                slot
            }
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        };
        self.rows[i] = Some(idx);
        self.cols[j] = Some(idx);
        self.len += 1;
        idx
    }

    /// Remove every element (A := 0).
    ///
    /// O(1) on the element storage: the arena is truncated rather than each
    /// element being released individually.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.free.clear();
        self.rows.iter_mut().for_each(|h| *h = None);
        self.cols.iter_mut().for_each(|h| *h = None);
        self.len = 0;
    }

    /// Copy `a` into `self` (self := a). Dimensions must agree.
    pub fn copy_from(&mut self, a: &SparseMatrix) -> Result<()> {
        if self.m != a.m {
            return Err(Error::DimensionMismatch { expected: a.m, actual: self.m });
        }
        if self.n != a.n {
            return Err(Error::DimensionMismatch { expected: a.n, actual: self.n });
        }
        self.clear();
        for i in 0..a.m {
            let mut cur = a.rows[i];
            while let Some(idx) = cur {
                let e = a.entries[idx];
                self.push_entry(e.row, e.col, e.val);
                cur = e.next_row;
            }
        }
        Ok(())
    }

    /// Transpose in place, O(nnz): rows and columns swap roles; no element
    /// payload moves.
    pub fn transpose(&mut self) {
        std::mem::swap(&mut self.rows, &mut self.cols);
        std::mem::swap(&mut self.m, &mut self.n);
        for e in &mut self.entries {
            std::mem::swap(&mut e.row, &mut e.col);
            std::mem::swap(&mut e.next_row, &mut e.next_col);
        }
    }

    /// Re-link every row list in order of increasing column index and every
    /// column list in order of increasing row index.
    ///
    /// Stable O(nnz + m + n) by two distribution passes; an explicit
    /// precondition of [`sum_duplicates`](Self::sum_duplicates) and of the
    /// numeric factorization phase.
    pub fn sort(&mut self) {
        // Rebuild row lists by sweeping columns from the right; push-front
        // leaves each row ordered by ascending column.
        self.rows.iter_mut().for_each(|h| *h = None);
        for j in (0..self.n).rev() {
            let mut cur = self.cols[j];
            while let Some(idx) = cur {
                cur = self.entries[idx].next_col;
                let i = self.entries[idx].row;
                self.entries[idx].next_row = self.rows[i];
                self.rows[i] = Some(idx);
            }
        }
        // Same for column lists, sweeping rows from the bottom.
        self.cols.iter_mut().for_each(|h| *h = None);
        for i in (0..self.m).rev() {
            let mut cur = self.rows[i];
            while let Some(idx) = cur {
                cur = self.entries[idx].next_row;
                let j = self.entries[idx].col;
                self.entries[idx].next_col = self.cols[j];
                self.cols[j] = Some(idx);
            }
        }
    }

    /// Remove every element with `|value| < eps`, plus all explicit zeros.
    ///
    /// With `eps = 0.0` only explicit zeros are removed. Returns the number
    /// of elements removed. List order is not preserved; callers that need
    /// ordered lists re-sort.
    pub fn scrape(&mut self, eps: f64) -> usize {
        for i in 0..self.m {
            let mut cur = self.rows[i];
            while let Some(idx) = cur {
                if self.entries[idx].val.abs() < eps {
                    self.entries[idx].val = 0.0;
                }
                cur = self.entries[idx].next_row;
            }
        }
        // Drop zeros from the row lists; the slots stay linked in the
        // column lists until the second pass frees them.
        for i in 0..self.m {
            let mut kept = None;
            let mut cur = self.rows[i].take();
            while let Some(idx) = cur {
                cur = self.entries[idx].next_row;
                if self.entries[idx].val != 0.0 {
                    self.entries[idx].next_row = kept;
                    kept = Some(idx);
                }
            }
            self.rows[i] = kept;
        }
        let mut removed = 0;
        for j in 0..self.n {
            let mut kept = None;
            let mut cur = self.cols[j].take();
            while let Some(idx) = cur {
                cur = self.entries[idx].next_col;
                if self.entries[idx].val != 0.0 {
                    self.entries[idx].next_col = kept;
                    kept = Some(idx);
                } else {
                    self.free.push(idx);
                    self.len -= 1;
                    removed += 1;
                }
            }
            self.cols[j] = kept;
        }
        removed
    }

    /// Collapse multiplets by summing their values, then remove all
    /// resulting zeros and elements with `|value| < eps`.
    ///
    /// Returns the number of elements removed.
    pub fn sum_duplicates(&mut self, eps: f64) -> usize {
        self.sort();
        for i in 0..self.m {
            // keeper: first element of the current (row, col) group
            let mut keeper: Option<usize> = None;
            let mut cur = self.rows[i];
            while let Some(idx) = cur {
                cur = self.entries[idx].next_row;
                match keeper {
                    Some(k) if self.entries[k].col == self.entries[idx].col => {
                        let v = self.entries[idx].val;
                        self.entries[k].val += v;
                        self.entries[idx].val = 0.0;
                    }
                    _ => keeper = Some(idx),
                }
            }
        }
        self.scrape(eps)
    }

    /// Whether any `(row, col)` position holds more than one element.
    ///
    /// Sorts the matrix as a side effect. Returns the first duplicated
    /// position found, if any.
    pub fn has_duplicates(&mut self) -> Option<(usize, usize)> {
        self.sort();
        for i in 0..self.m {
            let mut cur = self.rows[i];
            while let Some(idx) = cur {
                let next = self.entries[idx].next_row;
                if let Some(nx) = next {
                    if self.entries[nx].col == self.entries[idx].col {
                        return Some((i, self.entries[idx].col));
                    }
                }
                cur = next;
            }
        }
        None
    }

    /// Append `dm` empty rows and `dn` empty columns.
    ///
    /// Amortized O(1) per appended line via the head vectors' capacity
    /// doubling; existing elements and indices stay valid.
    pub fn append_rows_cols(&mut self, dm: usize, dn: usize) {
        self.rows.extend(std::iter::repeat(None).take(dm));
        self.cols.extend(std::iter::repeat(None).take(dn));
        self.m += dm;
        self.n += dn;
    }

    /// Copy the block induced by `row_range` × `col_range` into a fresh
    /// matrix of matching size.
    pub fn submatrix(&self, row_range: Range<usize>, col_range: Range<usize>) -> Result<SparseMatrix> {
        if row_range.start > row_range.end || row_range.end > self.m {
            return Err(Error::InvalidRange {
                start: row_range.start,
                end: row_range.end,
                limit: self.m,
            });
        }
        if col_range.start > col_range.end || col_range.end > self.n {
            return Err(Error::InvalidRange {
                start: col_range.start,
                end: col_range.end,
                limit: self.n,
            });
        }
        let mut b = SparseMatrix::new(row_range.len(), col_range.len());
        for i in row_range.clone() {
            let mut cur = self.rows[i];
            while let Some(idx) = cur {
                let e = self.entries[idx];
                if col_range.contains(&e.col) {
                    b.push_entry(i - row_range.start, e.col - col_range.start, e.val);
                }
                cur = e.next_row;
            }
        }
        Ok(b)
    }

    /// Iterate over the elements of row `i` as `(row, col, value)`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn iter_row(&self, i: usize) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        assert!(i < self.m, "row {} out of range for {}x{} matrix", i, self.m, self.n);
        let mut cur = self.rows[i];
        std::iter::from_fn(move || {
            let idx = cur?;
            let e = &self.entries[idx];
            cur = e.next_row;
            Some((e.row, e.col, e.val))
        })
    }

    /// Iterate over the elements of column `j` as `(row, col, value)`.
    ///
    /// # Panics
    ///
    /// Panics if `j` is out of range.
    pub fn iter_col(&self, j: usize) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        assert!(j < self.n, "column {} out of range for {}x{} matrix", j, self.m, self.n);
        let mut cur = self.cols[j];
        std::iter::from_fn(move || {
            let idx = cur?;
            let e = &self.entries[idx];
            cur = e.next_col;
            Some((e.row, e.col, e.val))
        })
    }

    /// Iterate over every element, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.m).flat_map(move |i| self.iter_row(i))
    }

    /// Validate the dual-linked representation.
    ///
    /// O(nnz): every live element must be reachable from exactly one row
    /// list and exactly one column list, its stored indices must match the
    /// lists it is on, and freed slots must not be linked anywhere.
    /// Intended for test harnesses, not production hot paths.
    pub fn check_consistency(&self) -> Result<()> {
        if self.rows.len() != self.m || self.cols.len() != self.n {
            return Err(Error::Corrupted { reason: "head array length disagrees with dimension" });
        }
        let cap = self.entries.len();
        let mut is_free = vec![false; cap];
        for &idx in &self.free {
            if idx >= cap {
                return Err(Error::Corrupted { reason: "free slot index out of range" });
            }
            if is_free[idx] {
                return Err(Error::Corrupted { reason: "free list repeats a slot" });
            }
            is_free[idx] = true;
        }
        if self.len + self.free.len() != cap {
            return Err(Error::Corrupted { reason: "live count disagrees with arena size" });
        }
        let mut in_row = vec![false; cap];
        let mut row_visits = 0usize;
        for i in 0..self.m {
            let mut cur = self.rows[i];
            while let Some(idx) = cur {
                if idx >= cap {
                    return Err(Error::Corrupted { reason: "row link out of range" });
                }
                if is_free[idx] {
                    return Err(Error::Corrupted { reason: "row list references a freed slot" });
                }
                if in_row[idx] {
                    return Err(Error::Corrupted { reason: "element linked from two row positions" });
                }
                in_row[idx] = true;
                row_visits += 1;
                let e = &self.entries[idx];
                if e.row != i {
                    return Err(Error::Corrupted { reason: "stored row index disagrees with list membership" });
                }
                if e.col >= self.n {
                    return Err(Error::Corrupted { reason: "stored column index out of range" });
                }
                cur = e.next_row;
            }
        }
        if row_visits != self.len {
            return Err(Error::Corrupted { reason: "row lists do not cover every live element" });
        }
        let mut in_col = vec![false; cap];
        let mut col_visits = 0usize;
        for j in 0..self.n {
            let mut cur = self.cols[j];
            while let Some(idx) = cur {
                if idx >= cap {
                    return Err(Error::Corrupted { reason: "column link out of range" });
                }
                if is_free[idx] {
                    return Err(Error::Corrupted { reason: "column list references a freed slot" });
                }
                if in_col[idx] {
                    return Err(Error::Corrupted { reason: "element linked from two column positions" });
                }
                in_col[idx] = true;
                col_visits += 1;
                let e = &self.entries[idx];
                if e.col != j {
                    return Err(Error::Corrupted { reason: "stored column index disagrees with list membership" });
                }
                if e.row >= self.m {
                    return Err(Error::Corrupted { reason: "stored row index out of range" });
                }
                cur = e.next_col;
            }
        }
        if col_visits != self.len {
            return Err(Error::Corrupted { reason: "column lists do not cover every live element" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_dense(a: &SparseMatrix) -> Vec<Vec<f64>> {
        let mut d = vec![vec![0.0; a.cols()]; a.rows()];
        for (i, j, v) in a.iter() {
            d[i][j] += v;
        }
        d
    }

    #[test]
    fn test_insert_and_traverse() {
        let mut a = SparseMatrix::new(3, 4);
        a.insert(0, 0, 1.0).unwrap();
        a.insert(0, 3, 2.0).unwrap();
        a.insert(2, 1, 3.0).unwrap();

        assert_eq!(a.nnz(), 3);
        assert_eq!(a.row_nnz(0), 2);
        assert_eq!(a.row_nnz(1), 0);
        assert_eq!(a.col_nnz(1), 1);
        assert_eq!(a.iter_col(3).next(), Some((0, 3, 2.0)));
        a.check_consistency().unwrap();
    }

    #[test]
    fn test_insert_out_of_range() {
        let mut a = SparseMatrix::new(2, 2);
        let err = a.insert(2, 0, 1.0).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { row: 2, .. }));
    }

    #[test]
    fn test_clear_reuses_storage() {
        let mut a = SparseMatrix::new(2, 2);
        a.insert(0, 0, 1.0).unwrap();
        a.insert(1, 1, 2.0).unwrap();
        a.clear();
        assert_eq!(a.nnz(), 0);
        assert_eq!(a.iter().count(), 0);
        a.insert(0, 1, 5.0).unwrap();
        assert_eq!(a.nnz(), 1);
        a.check_consistency().unwrap();
    }

    #[test]
    fn test_transpose() {
        let mut a = SparseMatrix::new(2, 3);
        a.insert(0, 2, 7.0).unwrap();
        a.insert(1, 0, -1.0).unwrap();
        a.transpose();

        assert_eq!(a.rows(), 3);
        assert_eq!(a.cols(), 2);
        assert_eq!(to_dense(&a)[2][0], 7.0);
        assert_eq!(to_dense(&a)[0][1], -1.0);
        a.check_consistency().unwrap();
    }

    #[test]
    fn test_sort_orders_rows_and_cols() {
        let mut a = SparseMatrix::new(2, 4);
        a.insert(0, 3, 1.0).unwrap();
        a.insert(0, 1, 2.0).unwrap();
        a.insert(0, 2, 3.0).unwrap();
        a.insert(1, 2, 4.0).unwrap();
        a.sort();

        let cols: Vec<usize> = a.iter_row(0).map(|(_, j, _)| j).collect();
        assert_eq!(cols, vec![1, 2, 3]);
        let rows: Vec<usize> = a.iter_col(2).map(|(i, _, _)| i).collect();
        assert_eq!(rows, vec![0, 1]);
        a.check_consistency().unwrap();
    }

    #[test]
    fn test_sum_duplicates_identical_values() {
        let mut a = SparseMatrix::new(3, 3);
        for _ in 0..4 {
            a.insert(1, 2, 2.5).unwrap();
        }
        a.insert(0, 0, 1.0).unwrap();

        let removed = a.sum_duplicates(0.0);
        assert_eq!(removed, 3);
        assert_eq!(a.nnz(), 2);
        assert_eq!(to_dense(&a)[1][2], 10.0);
        a.check_consistency().unwrap();
    }

    #[test]
    fn test_sum_duplicates_cancellation_removes_element() {
        let mut a = SparseMatrix::new(2, 2);
        a.insert(0, 1, 3.0).unwrap();
        a.insert(0, 1, -3.0).unwrap();
        a.insert(1, 1, 1.0).unwrap();

        let removed = a.sum_duplicates(0.0);
        assert_eq!(removed, 2);
        assert_eq!(a.nnz(), 1);
        a.check_consistency().unwrap();
    }

    #[test]
    fn test_scrape_threshold() {
        let mut a = SparseMatrix::new(2, 2);
        a.insert(0, 0, 1e-12).unwrap();
        a.insert(0, 1, 0.5).unwrap();
        a.insert(1, 1, 0.0).unwrap();

        let removed = a.scrape(1e-9);
        assert_eq!(removed, 2);
        assert_eq!(a.nnz(), 1);
        assert_eq!(a.iter_row(0).next(), Some((0, 1, 0.5)));
        a.check_consistency().unwrap();
    }

    #[test]
    fn test_append_rows_cols() {
        let mut a = SparseMatrix::new(2, 2);
        a.insert(1, 1, 4.0).unwrap();
        a.append_rows_cols(2, 1);

        assert_eq!(a.rows(), 4);
        assert_eq!(a.cols(), 3);
        assert_eq!(a.row_nnz(1), 1);
        assert_eq!(a.row_nnz(3), 0);
        a.insert(3, 2, 9.0).unwrap();
        a.check_consistency().unwrap();
    }

    #[test]
    fn test_submatrix() {
        let mut a = SparseMatrix::new(4, 4);
        for i in 0..4 {
            a.insert(i, i, (i + 1) as f64).unwrap();
        }
        a.insert(1, 3, 8.0).unwrap();

        let b = a.submatrix(1..3, 1..4).unwrap();
        assert_eq!(b.rows(), 2);
        assert_eq!(b.cols(), 3);
        let d = to_dense(&b);
        assert_eq!(d[0][0], 2.0);
        assert_eq!(d[1][1], 3.0);
        assert_eq!(d[0][2], 8.0);
        b.check_consistency().unwrap();
    }

    #[test]
    fn test_submatrix_invalid_range() {
        let a = SparseMatrix::new(2, 2);
        assert!(matches!(a.submatrix(0..3, 0..2), Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn test_consistency_after_mixed_mutation() {
        let mut a = SparseMatrix::new(5, 5);
        for i in 0..5 {
            for j in 0..5 {
                if (i + j) % 2 == 0 {
                    a.insert(i, j, (i * 5 + j) as f64 + 1.0).unwrap();
                }
            }
        }
        a.transpose();
        a.insert(0, 4, -2.0).unwrap();
        a.insert(0, 4, 2.0).unwrap();
        a.sum_duplicates(0.0);
        a.sort();
        a.append_rows_cols(1, 0);
        a.check_consistency().unwrap();
    }

    #[test]
    fn test_copy_from() {
        let mut a = SparseMatrix::new(2, 3);
        a.insert(0, 1, 1.5).unwrap();
        a.insert(1, 2, -4.0).unwrap();
        let mut b = SparseMatrix::new(2, 3);
        b.insert(0, 0, 9.0).unwrap();
        b.copy_from(&a).unwrap();

        assert_eq!(b.nnz(), 2);
        assert_eq!(to_dense(&a), to_dense(&b));

        let mut c = SparseMatrix::new(3, 3);
        assert!(c.copy_from(&a).is_err());
    }
}
