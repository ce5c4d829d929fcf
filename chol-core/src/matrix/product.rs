//! Matrix–vector products and the A·D·A' product used by normal-equations
//! factorization.
//!
//! The A·D·A' product is split into a symbolic phase (pattern of S only)
//! and a numeric phase (values over a known pattern), mirroring the
//! symbolic/numeric split of the factorization itself: an interior-point
//! caller computes the pattern once and refreshes values every iteration
//! with a new diagonal D.

use super::SparseMatrix;
use crate::error::{Error, Result};

impl SparseMatrix {
    /// y := A·x.
    pub fn mat_vec(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        if x.len() != self.n {
            return Err(Error::DimensionMismatch { expected: self.n, actual: x.len() });
        }
        if y.len() != self.m {
            return Err(Error::DimensionMismatch { expected: self.m, actual: y.len() });
        }
        y.fill(0.0);
        for (j, &t) in x.iter().enumerate() {
            if t != 0.0 {
                for (i, _, v) in self.iter_col(j) {
                    y[i] += v * t;
                }
            }
        }
        Ok(())
    }

    /// y := A'·x.
    pub fn tmat_vec(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        if x.len() != self.m {
            return Err(Error::DimensionMismatch { expected: self.m, actual: x.len() });
        }
        if y.len() != self.n {
            return Err(Error::DimensionMismatch { expected: self.n, actual: y.len() });
        }
        y.fill(0.0);
        for (i, &t) in x.iter().enumerate() {
            if t != 0.0 {
                for (_, j, v) in self.iter_row(i) {
                    y[j] += v * t;
                }
            }
        }
        Ok(())
    }

    /// y := A·x for a symmetric matrix stored upper-triangle-only.
    ///
    /// Rejects matrices that are not square or carry sub-diagonal entries.
    pub fn sym_vec(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        if self.m != self.n {
            return Err(Error::NotSquare { rows: self.m, cols: self.n });
        }
        if x.len() != self.n {
            return Err(Error::DimensionMismatch { expected: self.n, actual: x.len() });
        }
        if y.len() != self.m {
            return Err(Error::DimensionMismatch { expected: self.m, actual: y.len() });
        }
        y.fill(0.0);
        for (j, &t) in x.iter().enumerate() {
            if t == 0.0 {
                continue;
            }
            for (i, jj, v) in self.iter_col(j) {
                if i > jj {
                    return Err(Error::NotUpperTriangular { row: i, col: jj });
                }
                y[i] += v * t;
            }
            // mirror of the strict upper triangle
            for (i, jj, v) in self.iter_row(j) {
                if i != jj {
                    y[jj] += v * t;
                }
            }
        }
        Ok(())
    }
}

/// Symbolic phase of S := A·A': compute the nonzero pattern of S.
///
/// Values of `a` are ignored (every stored element counts as a nonzero).
/// Only the upper triangle of the symmetric result is stored; pattern
/// entries get value 1.0. `s` must be square of order `a.rows()` and must
/// not be `a` itself (enforced by the borrow checker).
pub fn adat_symbolic(s: &mut SparseMatrix, a: &SparseMatrix) -> Result<()> {
    if s.m != s.n {
        return Err(Error::NotSquare { rows: s.m, cols: s.n });
    }
    if s.m != a.m {
        return Err(Error::DimensionMismatch { expected: a.m, actual: s.m });
    }
    s.clear();
    let mut marked = vec![false; s.n];
    for i in 0..s.m {
        // a[i,k] != 0 and a[j,k] != 0 imply s[i,j] != 0
        for (_, k, _) in a.iter_row(i) {
            for (j, _, _) in a.iter_col(k) {
                if j < i {
                    continue; // keep the upper triangle only
                }
                if !marked[j] {
                    s.push_entry(i, j, 1.0);
                    marked[j] = true;
                }
            }
        }
        for (_, j, _) in s.iter_row(i) {
            marked[j] = false;
        }
    }
    Ok(())
}

/// Numeric phase of S := A·D·A' over the pattern already present in `s`.
///
/// `d` holds the diagonal of D (`None` means the identity). The pattern of
/// `s` is left untouched; only element values are rewritten, so some may
/// come out as explicit zeros through cancellation.
pub fn adat_numeric(s: &mut SparseMatrix, a: &SparseMatrix, d: Option<&[f64]>) -> Result<()> {
    if s.m != s.n {
        return Err(Error::NotSquare { rows: s.m, cols: s.n });
    }
    if s.m != a.m {
        return Err(Error::DimensionMismatch { expected: a.m, actual: s.m });
    }
    if let Some(d) = d {
        if d.len() != a.n {
            return Err(Error::DimensionMismatch { expected: a.n, actual: d.len() });
        }
    }
    let mut work = vec![0.0; a.n];
    for i in 0..s.m {
        // work := i-th row of A
        for (_, k, v) in a.iter_row(i) {
            work[k] = v;
        }
        // s[i,j] = a[i,*] · D · a[j,*]
        let mut cur = s.rows[i];
        while let Some(idx) = cur {
            let j = s.entries[idx].col;
            let mut sum = 0.0;
            match d {
                None => {
                    for (_, k, v) in a.iter_row(j) {
                        sum += work[k] * v;
                    }
                }
                Some(d) => {
                    for (_, k, v) in a.iter_row(j) {
                        sum += work[k] * d[k] * v;
                    }
                }
            }
            s.entries[idx].val = sum;
            cur = s.entries[idx].next_row;
        }
        // clear the scratch row
        for (_, k, _) in a.iter_row(i) {
            work[k] = 0.0;
        }
    }
    Ok(())
}
