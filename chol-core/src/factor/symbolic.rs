//! Symbolic phase: compute the nonzero pattern of the Cholesky factor.
//!
//! Works on the pattern alone. The input matrix is transformed in place
//! into the pattern of `U` with `U'·U = A~`; values become tags (+1.0 for
//! original positions, -1.0 for fill-in), kept as a diagnostic aid for
//! inspecting where elimination created new nonzeros.
//!
//! Row k of `U` is the union of row k of `A~` with every completed row
//! whose *leftmost* off-diagonal column is k. Merging only those rows
//! (instead of every row with a nonzero in column k) gives the same
//! pattern — the leftmost neighbor subsumes the rest transitively — and
//! touches each completed row exactly once.

use crate::error::{Error, Result};
use crate::matrix::SparseMatrix;

/// Tag for an element present in the input pattern.
pub(crate) const TAG_ORIGINAL: f64 = 1.0;
/// Tag for an element created as fill-in (including inserted diagonals).
pub(crate) const TAG_FILL: f64 = -1.0;

/// Replace the pattern of `u` (upper triangle of a permuted symmetric
/// matrix) with the pattern of its Cholesky factor.
///
/// Missing diagonal elements are inserted. Returns the number of elements
/// added (fill-in). Rejects non-square input and any element below the
/// diagonal.
pub(crate) fn factorize(u: &mut SparseMatrix) -> Result<usize> {
    let n = u.m;
    if u.m != u.n {
        return Err(Error::NotSquare { rows: u.m, cols: u.n });
    }

    // Tag the input pattern, checking triangularity along the way.
    let mut has_diag = vec![false; n];
    for i in 0..n {
        let mut cur = u.rows[i];
        while let Some(idx) = cur {
            let e = u.entries[idx];
            cur = e.next_row;
            if e.row > e.col {
                return Err(Error::NotUpperTriangular { row: e.row, col: e.col });
            }
            if e.row == e.col {
                has_diag[i] = true;
            }
            u.entries[idx].val = TAG_ORIGINAL;
        }
    }

    let mut fill = 0usize;
    for i in 0..n {
        if !has_diag[i] {
            u.push_entry(i, i, TAG_FILL);
            fill += 1;
        }
    }

    // head[j] / next[] list completed rows whose leftmost off-diagonal
    // column is j; each completed row lands in exactly one bucket.
    let mut head: Vec<Option<usize>> = vec![None; n];
    let mut next: Vec<Option<usize>> = vec![None; n];
    let mut marked = vec![false; n];

    for k in 0..n {
        for (_, j, _) in u.iter_row(k) {
            marked[j] = true;
        }

        let mut r = head[k];
        while let Some(i) = r {
            r = next[i];
            // columns of row i beyond k become fill in row k
            let mut cur = u.rows[i];
            while let Some(idx) = cur {
                let e = u.entries[idx];
                cur = e.next_row;
                if e.col > k && !marked[e.col] {
                    marked[e.col] = true;
                    u.push_entry(k, e.col, TAG_FILL);
                    fill += 1;
                }
            }
        }

        // unmark and locate row k's own leftmost off-diagonal column
        let mut leftmost: Option<usize> = None;
        for (_, j, _) in u.iter_row(k) {
            marked[j] = false;
            if j > k && leftmost.map_or(true, |l| j < l) {
                leftmost = Some(j);
            }
        }
        if let Some(j) = leftmost {
            next[k] = head[j];
            head[j] = Some(k);
        }
    }

    Ok(fill)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_of(u: &SparseMatrix) -> Vec<(usize, usize, f64)> {
        let mut p: Vec<_> = u.iter().collect();
        p.sort_by_key(|&(i, j, _)| (i, j));
        p
    }

    #[test]
    fn test_tridiagonal_has_no_fill() {
        let mut u = SparseMatrix::new(4, 4);
        for i in 0..4 {
            u.insert(i, i, 4.0).unwrap();
        }
        for i in 0..3 {
            u.insert(i, i + 1, -1.0).unwrap();
        }
        let fill = factorize(&mut u).unwrap();
        assert_eq!(fill, 0);
        assert_eq!(u.nnz(), 7);
        for (_, _, v) in u.iter() {
            assert_eq!(v, TAG_ORIGINAL);
        }
    }

    #[test]
    fn test_arrow_row_creates_fill() {
        // Pattern: diagonal plus (0,1) and (0,2). Eliminating row 0 links
        // columns 1 and 2, so (1,2) must appear as fill.
        let mut u = SparseMatrix::new(3, 3);
        for i in 0..3 {
            u.insert(i, i, 1.0).unwrap();
        }
        u.insert(0, 1, 1.0).unwrap();
        u.insert(0, 2, 1.0).unwrap();

        let fill = factorize(&mut u).unwrap();
        assert_eq!(fill, 1);
        let p = pattern_of(&u);
        assert!(p.contains(&(1, 2, TAG_FILL)));
        assert!(p.contains(&(0, 1, TAG_ORIGINAL)));
    }

    #[test]
    fn test_missing_diagonal_inserted() {
        let mut u = SparseMatrix::new(2, 2);
        u.insert(0, 0, 1.0).unwrap();
        u.insert(0, 1, 1.0).unwrap();
        // row 1 has no diagonal
        let fill = factorize(&mut u).unwrap();
        assert_eq!(fill, 1);
        assert!(pattern_of(&u).contains(&(1, 1, TAG_FILL)));
    }

    #[test]
    fn test_fill_propagates_through_elimination() {
        // Diagonal plus (0,2) and (0,3): row 0's leftmost off-diagonal is
        // column 2, so its structure {3} merges into row 2 as fill.
        let mut u = SparseMatrix::new(4, 4);
        for i in 0..4 {
            u.insert(i, i, 1.0).unwrap();
        }
        u.insert(0, 2, 1.0).unwrap();
        u.insert(0, 3, 1.0).unwrap();

        let fill = factorize(&mut u).unwrap();
        assert_eq!(fill, 1);
        assert!(pattern_of(&u).contains(&(2, 3, TAG_FILL)));
    }

    #[test]
    fn test_rejects_subdiagonal_entry() {
        let mut u = SparseMatrix::new(3, 3);
        u.insert(2, 0, 1.0).unwrap();
        assert!(matches!(
            factorize(&mut u),
            Err(Error::NotUpperTriangular { row: 2, col: 0 })
        ));
    }

    #[test]
    fn test_rejects_non_square() {
        let mut u = SparseMatrix::new(2, 3);
        assert!(matches!(factorize(&mut u), Err(Error::NotSquare { .. })));
    }
}
