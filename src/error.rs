//! Error types for gpsca.

use thiserror::Error;

/// Error type for gpsca operations.
#[derive(Debug, Error)]
pub enum GpError {
    /// Terms or constraint sides with incompatible physical dimensions were combined.
    #[error("Unit mismatch: expected {expected}, got {got}")]
    UnitMismatch { expected: String, got: String },

    /// No positive assignment satisfies the constraints.
    #[error("Problem is infeasible: {0}")]
    Infeasible(String),

    /// The objective can be driven to zero or infinity.
    #[error("Problem is unbounded: {0}")]
    Unbounded(String),

    /// The convex solver failed or returned a non-optimal status.
    #[error("Solver error: {0}")]
    SolverError(String),

    /// Invalid problem specification.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Numerical error.
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// A curve-fit table is malformed or fails its accuracy check.
    #[error("Fit error: {0}")]
    FitError(String),

    /// A unit string could not be parsed.
    #[error("Cannot parse unit '{0}'")]
    UnitParse(String),

    /// Fit table deserialization failed.
    #[error("Fit table parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Fit table could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GpError {
    /// Check if this error reports an infeasible problem.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, GpError::Infeasible(_))
    }

    /// Check if this error reports an unbounded problem.
    pub fn is_unbounded(&self) -> bool {
        matches!(self, GpError::Unbounded(_))
    }
}

/// Result type for gpsca operations.
pub type Result<T> = std::result::Result<T, GpError>;
