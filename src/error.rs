use std::error::Error;
use std::fmt;

/// Errors raised when constructing or initialising a factorization engine.
///
/// All of these are input-validation failures: they are reported once,
/// synchronously, and the caller has to fix its inputs. The running engines
/// never produce them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VbError {
    /// R and the indicator matrix M have different shapes.
    ShapeMismatch {
        r: (usize, usize),
        m: (usize, usize),
    },
    /// A prior (or initialisation override) matrix has the wrong shape for
    /// the factor it belongs to. `name` is the conventional matrix name,
    /// e.g. "lambdaU" or "tauF".
    PriorShape {
        name: &'static str,
        got: (usize, usize),
        expected: (usize, usize),
    },
    /// A row of M contains no observed entry at all.
    UnobservedRow(usize),
    /// A column of M contains no observed entry at all.
    UnobservedColumn(usize),
    /// An exponential rate parameter is zero or negative.
    NonPositiveRate { row: usize, col: usize },
}

impl fmt::Display for VbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VbError::ShapeMismatch { r, m } => write!(
                f,
                "Input matrix R is not of the same size as the indicator matrix M: ({}, {}) and ({}, {}) respectively.",
                r.0, r.1, m.0, m.1
            ),
            VbError::PriorShape {
                name,
                got,
                expected,
            } => write!(
                f,
                "Prior matrix {} has the wrong shape: ({}, {}) instead of ({}, {}).",
                name, got.0, got.1, expected.0, expected.1
            ),
            VbError::UnobservedRow(i) => write!(f, "Fully unobserved row in R, row {}.", i),
            VbError::UnobservedColumn(j) => {
                write!(f, "Fully unobserved column in R, column {}.", j)
            }
            VbError::NonPositiveRate { row, col } => write!(
                f,
                "Exponential rate at ({}, {}) is not positive.",
                row, col
            ),
        }
    }
}

impl Error for VbError {}
