//! Cholesky factorization of sparse symmetric positive-definite systems.
//!
//! [`CholFactor`] carries the full lifecycle: creation runs the
//! minimum-degree ordering and the symbolic phase (pattern only), after
//! which [`CholFactor::decompose`] can run the numeric phase repeatedly
//! against matrices sharing that pattern, as an interior-point caller
//! does once per iteration. [`AdatFactor`] wraps the same lifecycle for
//! the normal-equations matrix `S = A·D·A'`, recomputing `S`'s values
//! from a fresh diagonal `D` before each decomposition.
//!
//! Storage is released when the factorization object is dropped, like any
//! other value.

mod numeric;
mod symbolic;
mod triangular;

pub use triangular::{
    solve_implicit_upper, solve_implicit_upper_transpose, solve_lower, solve_lower_transpose,
    solve_upper, solve_upper_transpose,
};

use crate::error::{Error, Result};
use crate::matrix::{adat_numeric, adat_symbolic, Permutation, SparseMatrix};
use crate::ordering::minimum_degree;

/// Cholesky factorization `U'·U = P·A·P'` of a sparse symmetric
/// positive-definite matrix given by its upper triangle.
///
/// The matrix passed to [`decompose`](Self::decompose) must have the same
/// nonzero pattern as the one the factorization was created from; only
/// its values may differ between calls.
pub struct CholFactor {
    n: usize,
    perm: Permutation,
    /// Upper triangular factor; pattern fixed at creation, values
    /// rewritten by each decomposition.
    factor: SparseMatrix,
    /// Permuted copy of the caller's matrix, reused across decompositions.
    scratch: SparseMatrix,
    fill_in: usize,
    /// `None` until the first numeric decomposition.
    singular_pivots: Option<usize>,
}

impl CholFactor {
    /// Symbolic phase: order, permute, and compute the factor pattern of
    /// `a` (square, upper triangle only, free of duplicate positions).
    ///
    /// The caller's matrix is read, never modified.
    pub fn new(a: &SparseMatrix) -> Result<Self> {
        let n = a.rows();
        if a.rows() != a.cols() {
            return Err(Error::NotSquare { rows: a.rows(), cols: a.cols() });
        }
        for (i, j, _) in a.iter() {
            if i > j {
                return Err(Error::NotUpperTriangular { row: i, col: j });
            }
        }

        let (perm, _) = minimum_degree(a);
        let mut scratch = SparseMatrix::new(n, n);
        scratch.copy_from(a)?;
        perm.apply_symmetric(&mut scratch)?;

        let mut factor = SparseMatrix::new(n, n);
        factor.copy_from(&scratch)?;
        let fill_in = symbolic::factorize(&mut factor)?;

        Ok(Self {
            n,
            perm,
            factor,
            scratch,
            fill_in,
            singular_pivots: None,
        })
    }

    /// Numeric phase: compute the factor values from the values of `a`.
    ///
    /// Returns the number of pivots perturbed by the ill-conditioning
    /// fallback; zero means `a` was numerically positive definite. May be
    /// called repeatedly with updated values over the original pattern.
    pub fn decompose(&mut self, a: &SparseMatrix) -> Result<usize> {
        self.scratch.copy_from(a)?;
        self.perm.apply_symmetric(&mut self.scratch)?;
        let count = numeric::factorize(&mut self.factor, &self.scratch)?;
        self.singular_pivots = Some(count);
        Ok(count)
    }

    /// Solve `A·x = b` in place: `x` holds `b` on entry and the solution
    /// on exit.
    ///
    /// Runs `x = P'·U⁻¹·U'⁻¹·P·b`. Requires a prior
    /// [`decompose`](Self::decompose).
    pub fn solve_in_place(&self, x: &mut [f64]) -> Result<()> {
        if self.singular_pivots.is_none() {
            return Err(Error::NotFactored);
        }
        if x.len() != self.n {
            return Err(Error::DimensionMismatch { expected: self.n, actual: x.len() });
        }
        let mut y = vec![0.0; self.n];
        self.perm.apply(x, &mut y)?;
        solve_upper_transpose(&self.factor, &mut y)?;
        solve_upper(&self.factor, &mut y)?;
        self.perm.apply_inverse(&y, x)?;
        Ok(())
    }

    /// Solve `A·x = b`, returning a fresh solution vector.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>> {
        let mut x = b.to_vec();
        self.solve_in_place(&mut x)?;
        Ok(x)
    }

    /// Order of the factored matrix.
    pub fn order(&self) -> usize {
        self.n
    }

    /// Number of pattern entries added by the symbolic phase.
    pub fn fill_in(&self) -> usize {
        self.fill_in
    }

    /// Perturbed-pivot count of the most recent decomposition, `None`
    /// while only the symbolic phase has run.
    pub fn singular_pivots(&self) -> Option<usize> {
        self.singular_pivots
    }

    /// Whether a numeric decomposition has run.
    pub fn is_factored(&self) -> bool {
        self.singular_pivots.is_some()
    }

    /// The upper triangular factor `U`.
    pub fn factor(&self) -> &SparseMatrix {
        &self.factor
    }

    /// The fill-reducing permutation `P`.
    pub fn permutation(&self) -> &Permutation {
        &self.perm
    }
}

/// Factorization of the normal-equations matrix `S = A·D·A'` for a
/// rectangular `A` and diagonal `D`.
///
/// The pattern of `S` is computed once from `A` alone; each
/// [`decompose`](Self::decompose) refreshes `S`'s values from a new `D`
/// and re-runs the numeric Cholesky phase. Dense columns of `A` are not
/// special-cased: they make `S` nearly dense, which shows up as cost, not
/// as an error.
pub struct AdatFactor {
    chol: CholFactor,
    s: SparseMatrix,
}

impl AdatFactor {
    /// Symbolic phase: compute the pattern of `S = A·A'` and of its
    /// Cholesky factor.
    pub fn new(a: &SparseMatrix) -> Result<Self> {
        let m = a.rows();
        let mut s = SparseMatrix::new(m, m);
        adat_symbolic(&mut s, a)?;
        let chol = CholFactor::new(&s)?;
        Ok(Self { chol, s })
    }

    /// Numeric phase with diagonal weights `d` (`None` for the identity).
    ///
    /// `a` must have the same pattern as at creation. Returns the
    /// perturbed-pivot count.
    pub fn decompose(&mut self, a: &SparseMatrix, d: Option<&[f64]>) -> Result<usize> {
        adat_numeric(&mut self.s, a, d)?;
        self.chol.decompose(&self.s)
    }

    /// Solve `(A·D·A')·x = b` in place.
    pub fn solve_in_place(&self, x: &mut [f64]) -> Result<()> {
        self.chol.solve_in_place(x)
    }

    /// Solve `(A·D·A')·x = b`, returning a fresh solution vector.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>> {
        self.chol.solve(b)
    }

    /// The wrapped Cholesky factorization.
    pub fn chol(&self) -> &CholFactor {
        &self.chol
    }

    /// The normal-equations matrix `S` as of the latest decomposition.
    pub fn product(&self) -> &SparseMatrix {
        &self.s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order4() -> SparseMatrix {
        // A = [[4,-1,-1,0],[-1,4,0,-1],[-1,0,4,-1],[0,-1,-1,4]]
        let mut a = SparseMatrix::new(4, 4);
        for i in 0..4 {
            a.insert(i, i, 4.0).unwrap();
        }
        a.insert(0, 1, -1.0).unwrap();
        a.insert(0, 2, -1.0).unwrap();
        a.insert(1, 3, -1.0).unwrap();
        a.insert(2, 3, -1.0).unwrap();
        a
    }

    fn sym_residual(a: &SparseMatrix, x: &[f64], b: &[f64]) -> f64 {
        let mut ax = vec![0.0; b.len()];
        a.sym_vec(x, &mut ax).unwrap();
        let mut norm = 0.0f64;
        let mut bnorm = 0.0f64;
        for i in 0..b.len() {
            norm += (ax[i] - b[i]) * (ax[i] - b[i]);
            bnorm += b[i] * b[i];
        }
        norm.sqrt() / (1.0 + bnorm.sqrt())
    }

    #[test]
    fn test_order4_scenario() {
        let a = order4();
        let mut chol = CholFactor::new(&a).unwrap();
        assert!(!chol.is_factored());
        assert_eq!(chol.order(), 4);

        let sing = chol.decompose(&a).unwrap();
        assert_eq!(sing, 0);
        assert_eq!(chol.singular_pivots(), Some(0));

        let b = vec![1.0, 2.0, 3.0, 4.0];
        let x = chol.solve(&b).unwrap();
        assert!(sym_residual(&a, &x, &b) < 1e-9);
    }

    #[test]
    fn test_solve_before_decompose_fails() {
        let a = order4();
        let chol = CholFactor::new(&a).unwrap();
        let mut x = vec![1.0; 4];
        assert!(matches!(chol.solve_in_place(&mut x), Err(Error::NotFactored)));
    }

    #[test]
    fn test_rejects_lower_triangle_input() {
        let mut a = SparseMatrix::new(2, 2);
        a.insert(0, 0, 1.0).unwrap();
        a.insert(1, 0, 1.0).unwrap();
        a.insert(1, 1, 1.0).unwrap();
        assert!(matches!(
            CholFactor::new(&a),
            Err(Error::NotUpperTriangular { row: 1, col: 0 })
        ));
    }

    #[test]
    fn test_caller_matrix_untouched() {
        let a = order4();
        let before: Vec<_> = {
            let mut v: Vec<_> = a.iter().collect();
            v.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
            v
        };
        let mut chol = CholFactor::new(&a).unwrap();
        chol.decompose(&a).unwrap();
        let after: Vec<_> = {
            let mut v: Vec<_> = a.iter().collect();
            v.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
            v
        };
        assert_eq!(before, after);
    }

    #[test]
    fn test_rank_deficient_reports_count() {
        // Two identical rows: rank 1.
        let mut a = SparseMatrix::new(2, 2);
        a.insert(0, 0, 1.0).unwrap();
        a.insert(0, 1, 1.0).unwrap();
        a.insert(1, 1, 1.0).unwrap();

        let mut chol = CholFactor::new(&a).unwrap();
        let sing = chol.decompose(&a).unwrap();
        assert!(sing > 0);
        for (_, _, v) in chol.factor().iter() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_adat_lifecycle_with_changing_weights() {
        // A = [[1, 1, 0], [0, 1, 1]]
        let mut a = SparseMatrix::new(2, 3);
        a.insert(0, 0, 1.0).unwrap();
        a.insert(0, 1, 1.0).unwrap();
        a.insert(1, 1, 1.0).unwrap();
        a.insert(1, 2, 1.0).unwrap();

        let mut adat = AdatFactor::new(&a).unwrap();
        assert_eq!(adat.chol().order(), 2);

        // D = I: S = [[2, 1], [1, 2]]; solve S·x = [3, 3] => x = [1, 1]
        let sing = adat.decompose(&a, None).unwrap();
        assert_eq!(sing, 0);
        let x = adat.solve(&[3.0, 3.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 1.0).abs() < 1e-12);

        // D = diag(1, 2, 1): S = [[3, 2], [2, 3]]; S·[1,1] = [5, 5]
        let sing = adat.decompose(&a, Some(&[1.0, 2.0, 1.0])).unwrap();
        assert_eq!(sing, 0);
        let x = adat.solve(&[5.0, 5.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 1.0).abs() < 1e-12);
    }
}
