//! Numeric phase: compute the values of the Cholesky factor over a
//! pattern established by the symbolic phase.
//!
//! Row k is accumulated in a dense scratch vector. The scratch is only
//! ever written at positions inside row k's pattern: whenever `u[i,k]` and
//! `u[i,j]` are both nonzero with `j > k`, the symbolic phase guarantees
//! `(k, j)` is in the pattern, so stale scratch positions from earlier
//! rows are never read and never need wholesale clearing.
//!
//! Ill-conditioning is handled by pivot perturbation rather than failure:
//! a diagonal that comes out non-positive or negligible relative to the
//! largest diagonal of the input is replaced by a huge sentinel, which
//! drives the corresponding solution components toward zero. The caller
//! gets a count of perturbed pivots and decides what to make of it.

use crate::error::{Error, Result};
use crate::matrix::SparseMatrix;

/// Sentinel installed in place of a negligible pivot, well inside the
/// finite range so the subsequent square root and divisions stay finite.
const HUGE_PIVOT: f64 = 0.1 * f64::MAX;

/// Fill in the values of `u` so that `U'·U = A~`, where `u` carries the
/// factor pattern (from the symbolic phase) and `a` the values of the
/// permuted matrix `A~` (upper triangle; its pattern must be a subset of
/// `u`'s).
///
/// Returns the number of pivots that were perturbed; zero means the
/// matrix was numerically positive definite throughout.
pub(crate) fn factorize(u: &mut SparseMatrix, a: &SparseMatrix) -> Result<usize> {
    let n = u.m;
    if u.m != u.n {
        return Err(Error::NotSquare { rows: u.m, cols: u.n });
    }
    if a.m != n || a.n != n {
        return Err(Error::DimensionMismatch { expected: n, actual: a.m });
    }

    // The row-wise elimination below consumes each row's elements in
    // ascending column order.
    u.sort();

    // Ill-conditioning reference: largest diagonal magnitude of the input.
    let mut big = 0.0f64;
    for (i, j, v) in a.iter() {
        if i == j {
            big = big.max(v.abs());
        }
    }
    if big == 0.0 {
        big = 1.0;
    }
    let tol = f64::EPSILON * f64::EPSILON * big;

    // head[i]: first element of completed row i with column >= the row
    // currently being computed; advances monotonically.
    let mut head: Vec<Option<usize>> = u.rows.clone();
    let mut work = vec![0.0; n];
    let mut singular = 0usize;

    for k in 0..n {
        // scratch := row k of A~ over row k's factor pattern
        for (_, j, _) in u.iter_row(k) {
            work[j] = 0.0;
        }
        for (_, j, v) in a.iter_row(k) {
            work[j] += v;
        }

        // Subtract the contribution of every completed row with a nonzero
        // in column k. head[i] points exactly at that (i, k) element.
        let mut cur = u.cols[k];
        while let Some(idx) = cur {
            let e = u.entries[idx];
            cur = e.next_col;
            let i = e.row;
            if i >= k {
                continue;
            }
            let start = head[i];
            debug_assert_eq!(start.map(|s| u.entries[s].col), Some(k));
            let uik = e.val;
            let mut p = start;
            while let Some(pidx) = p {
                let pe = u.entries[pidx];
                work[pe.col] -= uik * pe.val;
                p = pe.next_row;
            }
            head[i] = start.and_then(|s| u.entries[s].next_row);
        }

        let ukk = work[k];
        let pivot = if ukk < tol {
            singular += 1;
            HUGE_PIVOT
        } else {
            ukk
        };
        let root = pivot.sqrt();

        // Write row k back: the sorted row starts at its diagonal.
        let diag = u.rows[k];
        debug_assert_eq!(diag.map(|d| u.entries[d].col), Some(k));
        if let Some(didx) = diag {
            u.entries[didx].val = root;
            let mut cur = u.entries[didx].next_row;
            head[k] = cur;
            while let Some(idx) = cur {
                let j = u.entries[idx].col;
                u.entries[idx].val = work[j] / root;
                cur = u.entries[idx].next_row;
            }
        }
    }

    Ok(singular)
}

#[cfg(test)]
mod tests {
    use super::super::symbolic;
    use super::*;

    fn upper(n: usize, elems: &[(usize, usize, f64)]) -> SparseMatrix {
        let mut a = SparseMatrix::new(n, n);
        for &(i, j, v) in elems {
            a.insert(i, j, v).unwrap();
        }
        a
    }

    fn to_dense(a: &SparseMatrix) -> Vec<Vec<f64>> {
        let mut d = vec![vec![0.0; a.cols()]; a.rows()];
        for (i, j, v) in a.iter() {
            d[i][j] += v;
        }
        d
    }

    #[test]
    fn test_two_by_two_exact() {
        // A = [[4, 2], [2, 5]] => U = [[2, 1], [0, 2]]
        let a = upper(2, &[(0, 0, 4.0), (0, 1, 2.0), (1, 1, 5.0)]);
        let mut u = SparseMatrix::new(2, 2);
        u.copy_from(&a).unwrap();
        symbolic::factorize(&mut u).unwrap();

        let sing = factorize(&mut u, &a).unwrap();
        assert_eq!(sing, 0);
        let d = to_dense(&u);
        assert!((d[0][0] - 2.0).abs() < 1e-15);
        assert!((d[0][1] - 1.0).abs() < 1e-15);
        assert!((d[1][1] - 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_reconstructs_original() {
        // A = [[4,-1,-1,0],[-1,4,0,-1],[-1,0,4,-1],[0,-1,-1,4]]
        let a = upper(
            4,
            &[
                (0, 0, 4.0),
                (1, 1, 4.0),
                (2, 2, 4.0),
                (3, 3, 4.0),
                (0, 1, -1.0),
                (0, 2, -1.0),
                (1, 3, -1.0),
                (2, 3, -1.0),
            ],
        );
        let mut u = SparseMatrix::new(4, 4);
        u.copy_from(&a).unwrap();
        symbolic::factorize(&mut u).unwrap();
        let sing = factorize(&mut u, &a).unwrap();
        assert_eq!(sing, 0);

        // U'U must reproduce the full symmetric A.
        let ud = to_dense(&u);
        let ad = to_dense(&a);
        for i in 0..4 {
            for j in i..4 {
                let mut s = 0.0;
                for k in 0..4 {
                    s += ud[k][i] * ud[k][j];
                }
                assert!((s - ad[i][j]).abs() < 1e-12, "mismatch at ({}, {})", i, j);
            }
        }
    }

    #[test]
    fn test_rank_deficient_perturbs_not_fails() {
        // [[1, 1], [1, 1]] is singular: the second pivot cancels exactly.
        let a = upper(2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 1, 1.0)]);
        let mut u = SparseMatrix::new(2, 2);
        u.copy_from(&a).unwrap();
        symbolic::factorize(&mut u).unwrap();

        let sing = factorize(&mut u, &a).unwrap();
        assert_eq!(sing, 1);
        for (_, _, v) in u.iter() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_refactorize_with_new_values() {
        let a1 = upper(2, &[(0, 0, 4.0), (0, 1, 2.0), (1, 1, 5.0)]);
        let a2 = upper(2, &[(0, 0, 9.0), (0, 1, 3.0), (1, 1, 2.0)]);
        let mut u = SparseMatrix::new(2, 2);
        u.copy_from(&a1).unwrap();
        symbolic::factorize(&mut u).unwrap();

        assert_eq!(factorize(&mut u, &a1).unwrap(), 0);
        assert_eq!(factorize(&mut u, &a2).unwrap(), 0);
        // U for a2 = [[3, 1], [0, 1]]
        let d = to_dense(&u);
        assert!((d[0][0] - 3.0).abs() < 1e-15);
        assert!((d[0][1] - 1.0).abs() < 1e-15);
        assert!((d[1][1] - 1.0).abs() < 1e-15);
    }
}
