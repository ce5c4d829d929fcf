//! Sparse Cholesky factorization for symmetric positive-definite systems.
//!
//! The crate solves `A·x = b` for a sparse symmetric positive-definite
//! `A` supplied as its upper triangle, and the normal-equations variant
//! `(A·D·A')·x = b` that interior-point methods solve once per iteration
//! with fresh diagonal weights `D`.
//!
//! The pipeline:
//!
//! - **Ordering** ([`ordering`]): a quotient-graph minimum-degree
//!   heuristic picks a permutation `P` that keeps the factor sparse.
//! - **Symbolic factorization**: from the pattern of `P·A·P'` alone,
//!   the pattern of the upper triangular `U` with `U'·U = P·A·P'` is
//!   derived once, so repeated numeric factorizations allocate nothing.
//! - **Numeric factorization**: row-wise elimination over the fixed
//!   pattern. Negligible pivots are replaced by a huge sentinel and
//!   counted instead of aborting, so a caller mid-iteration can keep
//!   going through an occasional ill-conditioned system.
//! - **Triangular solves** ([`factor`]): forward/backward substitution
//!   against `U` and `U'`, including implicit variants for a factor
//!   stored only up to row/column permutations.
//!
//! [`CholFactor`] and [`AdatFactor`] package the lifecycle: create once
//! from the pattern, decompose per value update, solve as often as
//! needed.
//!
//! ```
//! use chol_core::{CholFactor, SparseMatrix};
//!
//! // A = [[4, -1], [-1, 4]], upper triangle only
//! let mut a = SparseMatrix::new(2, 2);
//! a.insert(0, 0, 4.0)?;
//! a.insert(1, 1, 4.0)?;
//! a.insert(0, 1, -1.0)?;
//!
//! let mut chol = CholFactor::new(&a)?;
//! let singular = chol.decompose(&a)?;
//! assert_eq!(singular, 0);
//!
//! let x = chol.solve(&[3.0, 3.0])?;
//! assert!((x[0] - 1.0).abs() < 1e-12);
//! assert!((x[1] - 1.0).abs() < 1e-12);
//! # Ok::<(), chol_core::Error>(())
//! ```
//!
//! # References
//!
//! - A. George, J. W. H. Liu, "Computer Solution of Large Sparse
//!   Positive Definite Systems", Prentice-Hall, 1981.
//! - S. J. Wright, "Primal-Dual Interior-Point Methods", SIAM, 1997
//!   (the perturbed-pivot fallback of the numeric phase).

pub mod error;
pub mod factor;
pub mod matrix;
pub mod ordering;

pub use error::{Error, Result};
pub use factor::{
    solve_implicit_upper, solve_implicit_upper_transpose, solve_lower, solve_lower_transpose,
    solve_upper, solve_upper_transpose, AdatFactor, CholFactor,
};
pub use matrix::{adat_numeric, adat_symbolic, Permutation, SparseMatrix};
pub use ordering::{minimum_degree, OrderingStats};
