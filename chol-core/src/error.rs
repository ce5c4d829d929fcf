//! Error types for the factorization core.
//!
//! Two failure taxonomies are kept strictly apart:
//!
//! - **Precondition violations** (wrong dimensions, out-of-range indices,
//!   non-triangular input, solving before factorizing) are typed errors in
//!   this enum. They are never recovered from silently.
//! - **Numeric ill-conditioning** during factorization is *not* an error.
//!   Negligible pivots are replaced by a large sentinel and reported upward
//!   as a count; the caller decides whether a nonzero count is acceptable.
//!
//! The one numeric condition that *is* fatal is a zero diagonal in a plain
//! triangular solve ([`Error::Singular`]): that path is only reached with an
//! already-computed factor, whose diagonal is nonzero by construction, so a
//! zero pivot there means the factor itself is broken.

use thiserror::Error;

/// Errors raised by matrix, permutation, and factorization operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Row or column index outside the matrix dimensions.
    #[error("index ({row}, {col}) out of range for {rows}x{cols} matrix")]
    IndexOutOfRange {
        /// Offending row index
        row: usize,
        /// Offending column index
        col: usize,
        /// Number of rows in the matrix
        rows: usize,
        /// Number of columns in the matrix
        cols: usize,
    },

    /// Operand dimensions do not agree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// A square matrix was required.
    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare {
        /// Number of rows
        rows: usize,
        /// Number of columns
        cols: usize,
    },

    /// An upper triangular matrix was required but an entry lies below the
    /// diagonal.
    #[error("matrix is not upper triangular: entry at ({row}, {col})")]
    NotUpperTriangular {
        /// Row of the offending entry
        row: usize,
        /// Column of the offending entry
        col: usize,
    },

    /// A lower triangular matrix was required but an entry lies above the
    /// diagonal.
    #[error("matrix is not lower triangular: entry at ({row}, {col})")]
    NotLowerTriangular {
        /// Row of the offending entry
        row: usize,
        /// Column of the offending entry
        col: usize,
    },

    /// Invalid row or column range passed to a submatrix extraction.
    #[error("invalid range {start}..{end} (limit {limit})")]
    InvalidRange {
        /// Range start
        start: usize,
        /// Range end (exclusive)
        end: usize,
        /// Dimension being sliced
        limit: usize,
    },

    /// Zero diagonal pivot in a plain triangular solve.
    #[error("zero pivot at position {index}: triangular matrix is singular")]
    Singular {
        /// Position of the zero pivot
        index: usize,
    },

    /// A solve was requested before any numeric factorization has run.
    #[error("numeric factorization has not been run")]
    NotFactored,

    /// The forward/backward arrays of a permutation are not mutually
    /// inverse bijections.
    #[error("invalid permutation: {reason}")]
    InvalidPermutation {
        /// What the validity check found
        reason: &'static str,
    },

    /// The dual-linked representation failed its consistency check.
    #[error("matrix representation is corrupted: {reason}")]
    Corrupted {
        /// What the consistency check found
        reason: &'static str,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
