//! Signomial programming by successive convex approximation.
//!
//! - `linearize` - local monomial approximation of signomial constraints
//! - `driver` - the iteration state machine behind `Problem::localsolve`

pub mod driver;
pub mod linearize;

pub use driver::{
    max_relative_change, IterationRecord, LocalSolution, ScaConfig, ScaDriver, ScaState,
    ScaStatus,
};
pub use linearize::{linearize, linearize_all};
