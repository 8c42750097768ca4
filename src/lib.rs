//! # gpsca
//!
//! Geometric and signomial programming over positive, unit-carrying design
//! variables, solved with the Clarabel conic solver.
//!
//! Geometric programs (GPs) are convex after the change of variables `y = ln x` and
//! are solved to global optimality. Signomial programs (SPs), which allow
//! subtracted terms, are solved locally by successive convex approximation: each
//! signomial constraint is replaced by a GP-compatible approximation around the
//! current point, the GP is solved, and the loop repeats until the design stops
//! moving.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gpsca::prelude::*;
//!
//! # fn main() -> gpsca::Result<()> {
//! let x = variable("x", "m")?;
//! let y = variable("y", "m")?;
//! let area = Monomial::with_unit(1.0, Unit::parse("m**2")?);
//!
//! // minimize x subject to x*y >= 1 m^2, y <= 2 m
//! let solution = Problem::minimize(&x)
//!     .subject_to([
//!         (&x * &y).geq(area)?,
//!         y.leq(Monomial::with_unit(2.0, Unit::parse("m")?))?,
//!     ])
//!     .solve()?;
//!
//! println!("x = {} m", solution[&x]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Problem classes
//!
//! - **Objective**: minimize a posynomial, or maximize a positive monomial
//! - **GP constraints**: `posynomial <= monomial`, `monomial == monomial`
//! - **Signomial constraints**: anything else; requires `localsolve`
//!
//! ## Architecture
//!
//! - **Expressions** (`expr`): monomials and signomials with runtime units
//! - **Classification** (`constraints`): routes each constraint to the GP or SP path
//! - **Canonicalization** (`canon`): log-space affine rows and exponential cones
//! - **Solver** (`solver`): matrix stuffing, Clarabel, sensitivities from duals
//! - **Local solve** (`sp`): linearization and the iteration driver
//! - **Fits, models and sweeps** (`fit`, `model`, `sweep`)

pub mod canon;
pub mod constraints;
pub mod error;
pub mod expr;
pub mod fit;
pub mod model;
pub mod problem;
pub mod solver;
pub mod sp;
pub mod sparse;
pub mod sweep;
pub mod units;

/// Prelude module for convenient imports.
///
/// ```
/// use gpsca::prelude::*;
/// ```
pub mod prelude {
    // Expression types
    pub use crate::expr::{
        parameter, scalar_var, te_exp_minus1, variable, Monomial, Posynomial, Sign, Signomial,
        Values, Variable, VariableBuilder,
    };
    pub use crate::units::Unit;

    // Constraints
    pub use crate::constraints::{Constraint, ConstraintExt};

    // Problem
    pub use crate::problem::{Objective, Problem, ProblemBuilder};

    // Solver
    pub use crate::solver::{Settings, Solution, SolveStatus};
    pub use crate::sp::{LocalSolution, ScaConfig, ScaStatus};

    // Fits, models, sweeps
    pub use crate::fit::{FitKind, FitTable};
    pub use crate::model::{flatten, Submodel, VarFactory};
    pub use crate::sweep::{sweep, SweepPoint};

    // Errors
    pub use crate::error::{GpError, Result};
}

// Re-export main types at crate root
pub use error::{GpError, Result};
pub use problem::Problem;
pub use solver::{Solution, SolveStatus};
