//! Forward and backward substitution against sparse triangular matrices.
//!
//! All four plain routines solve in place: `x` holds the right-hand side
//! on entry and the solution on exit. Each runs in O(nnz). While the
//! already-processed prefix (or suffix, for the backward sweeps) of `x`
//! is still exactly zero, whole positions are skipped: with all earlier
//! components zero and a zero right-hand side, the component is zero
//! regardless of the pivot, which pays off when `b` is sparse.
//!
//! A zero or absent diagonal is a hard [`Error::Singular`]: these solvers
//! run against a factor whose diagonal is nonzero by construction, so a
//! zero pivot here means the factor is broken, not that the system is
//! merely ill-conditioned.
//!
//! The implicit variants solve against `U = P·V·Q` given only `V` and the
//! two permutations, translating every index on the fly instead of ever
//! materializing the permuted matrix.

use crate::error::{Error, Result};
use crate::matrix::{Permutation, SparseMatrix};

fn check_system(a: &SparseMatrix, x: &[f64]) -> Result<usize> {
    if a.m != a.n {
        return Err(Error::NotSquare { rows: a.m, cols: a.n });
    }
    if x.len() != a.n {
        return Err(Error::DimensionMismatch { expected: a.n, actual: x.len() });
    }
    Ok(a.n)
}

/// Solve `L·x = b` in place for lower triangular `L`.
pub fn solve_lower(l: &SparseMatrix, x: &mut [f64]) -> Result<()> {
    let n = check_system(l, x)?;
    let mut leading_zeros = true;
    for i in 0..n {
        if leading_zeros {
            if x[i] == 0.0 {
                continue;
            }
            leading_zeros = false;
        }
        let mut sum = x[i];
        let mut diag = None;
        for (_, j, v) in l.iter_row(i) {
            if j == i {
                diag = Some(v);
            } else if j < i {
                sum -= v * x[j];
            } else {
                return Err(Error::NotLowerTriangular { row: i, col: j });
            }
        }
        match diag {
            Some(d) if d != 0.0 => x[i] = sum / d,
            _ => return Err(Error::Singular { index: i }),
        }
    }
    Ok(())
}

/// Solve `L'·x = b` in place for lower triangular `L`.
pub fn solve_lower_transpose(l: &SparseMatrix, x: &mut [f64]) -> Result<()> {
    let n = check_system(l, x)?;
    let mut trailing_zeros = true;
    for i in (0..n).rev() {
        if trailing_zeros {
            if x[i] == 0.0 {
                continue;
            }
            trailing_zeros = false;
        }
        // row i of L' is column i of L
        let mut sum = x[i];
        let mut diag = None;
        for (j, _, v) in l.iter_col(i) {
            if j == i {
                diag = Some(v);
            } else if j > i {
                sum -= v * x[j];
            } else {
                return Err(Error::NotLowerTriangular { row: j, col: i });
            }
        }
        match diag {
            Some(d) if d != 0.0 => x[i] = sum / d,
            _ => return Err(Error::Singular { index: i }),
        }
    }
    Ok(())
}

/// Solve `U·x = b` in place for upper triangular `U`.
pub fn solve_upper(u: &SparseMatrix, x: &mut [f64]) -> Result<()> {
    let n = check_system(u, x)?;
    let mut trailing_zeros = true;
    for i in (0..n).rev() {
        if trailing_zeros {
            if x[i] == 0.0 {
                continue;
            }
            trailing_zeros = false;
        }
        let mut sum = x[i];
        let mut diag = None;
        for (_, j, v) in u.iter_row(i) {
            if j == i {
                diag = Some(v);
            } else if j > i {
                sum -= v * x[j];
            } else {
                return Err(Error::NotUpperTriangular { row: i, col: j });
            }
        }
        match diag {
            Some(d) if d != 0.0 => x[i] = sum / d,
            _ => return Err(Error::Singular { index: i }),
        }
    }
    Ok(())
}

/// Solve `U'·x = b` in place for upper triangular `U`.
pub fn solve_upper_transpose(u: &SparseMatrix, x: &mut [f64]) -> Result<()> {
    let n = check_system(u, x)?;
    let mut leading_zeros = true;
    for i in 0..n {
        if leading_zeros {
            if x[i] == 0.0 {
                continue;
            }
            leading_zeros = false;
        }
        // row i of U' is column i of U
        let mut sum = x[i];
        let mut diag = None;
        for (j, _, v) in u.iter_col(i) {
            if j == i {
                diag = Some(v);
            } else if j < i {
                sum -= v * x[j];
            } else {
                return Err(Error::NotUpperTriangular { row: j, col: i });
            }
        }
        match diag {
            Some(d) if d != 0.0 => x[i] = sum / d,
            _ => return Err(Error::Singular { index: i }),
        }
    }
    Ok(())
}

/// Solve `U·x = b` in place where `U = P·V·Q` is upper triangular but
/// only `v` and the two permutations are stored.
///
/// Element `(r, c)` of `v` lives at logical position
/// `(p.preimage(r), q.image(c))`.
pub fn solve_implicit_upper(
    p: &Permutation,
    v: &SparseMatrix,
    q: &Permutation,
    x: &mut [f64],
) -> Result<()> {
    let n = check_system(v, x)?;
    if p.order() != n || q.order() != n {
        return Err(Error::DimensionMismatch { expected: n, actual: p.order().min(q.order()) });
    }
    for k in (0..n).rev() {
        // logical row k of U is row p.image(k) of v
        let mut sum = x[k];
        let mut diag = None;
        for (_, c, val) in v.iter_row(p.image(k)) {
            let j = q.image(c);
            if j == k {
                diag = Some(val);
            } else if j > k {
                sum -= val * x[j];
            } else {
                return Err(Error::NotUpperTriangular { row: k, col: j });
            }
        }
        match diag {
            Some(d) if d != 0.0 => x[k] = sum / d,
            _ => return Err(Error::Singular { index: k }),
        }
    }
    Ok(())
}

/// Solve `U'·x = b` in place for the same implicit representation as
/// [`solve_implicit_upper`].
pub fn solve_implicit_upper_transpose(
    p: &Permutation,
    v: &SparseMatrix,
    q: &Permutation,
    x: &mut [f64],
) -> Result<()> {
    let n = check_system(v, x)?;
    if p.order() != n || q.order() != n {
        return Err(Error::DimensionMismatch { expected: n, actual: p.order().min(q.order()) });
    }
    for k in 0..n {
        // logical column k of U is column q.preimage(k) of v
        let mut sum = x[k];
        let mut diag = None;
        for (r, _, val) in v.iter_col(q.preimage(k)) {
            let i = p.preimage(r);
            if i == k {
                diag = Some(val);
            } else if i < k {
                sum -= val * x[i];
            } else {
                return Err(Error::NotUpperTriangular { row: i, col: k });
            }
        }
        match diag {
            Some(d) if d != 0.0 => x[k] = sum / d,
            _ => return Err(Error::Singular { index: k }),
        }
    }
    Ok(())
}
