//! Solver interface for gpsca.
//!
//! This module provides:
//! - Matrix stuffing to convert canonicalized GPs to solver format
//! - Clarabel solver integration and solution recovery

pub mod clarabel;
pub mod stuffing;

pub use self::clarabel::{solve, RawSolution, Settings, Solution, SolveStatus};
pub use stuffing::{stuff_problem, ConeDims, RowInfo, StuffedProblem, VariableMap};
